/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! CSV reports and human readable summaries.
//!
//! Only the coordinator writes reports. Each harness result type implements [`Record`],
//! which fixes its CSV header, the format of its rows and the columns of its summary.

use std::{io::Write, path::Path};

use anyhow::Context;
use serde::Serialize;

use crate::{
    timing::TimingRecord,
    utils::fmt::{Banner, Table},
    verify::Verification,
};

pub const TIMING_HEADER: &str = "num_ranks,m0,n0,gflops";
pub const VERIFICATION_HEADER: &str = "num_ranks,m0,n0,result";

/// One row of a report.
pub trait Record: Serialize {
    /// The CSV header line, without a trailing newline.
    const HEADER: &'static str;

    /// The heading of the summary table.
    const TITLE: &'static str;

    /// The columns of the summary table.
    const SUMMARY_COLUMNS: &'static [&'static str];

    /// Write this record as one CSV line.
    fn write_row(&self, out: &mut dyn Write) -> std::io::Result<()>;

    /// The cells of this record's summary row.
    fn summary_row(&self) -> Vec<String>;
}

impl Record for TimingRecord {
    const HEADER: &'static str = TIMING_HEADER;
    const TITLE: &'static str = "Timing";
    const SUMMARY_COLUMNS: &'static [&'static str] = &[
        "ranks", "m0", "n0", "trials", "min", "max", "mean", "median", "gflops",
    ];

    fn write_row(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            out,
            "{},{},{},{:.2}",
            self.num_ranks, self.m0, self.n0, self.gflops
        )
    }

    fn summary_row(&self) -> Vec<String> {
        let summary = self.trials.summary();
        vec![
            self.num_ranks.to_string(),
            self.m0.to_string(),
            self.n0.to_string(),
            self.trials.len().to_string(),
            summary.min.to_string(),
            summary.max.to_string(),
            format!("{:.1}ns", summary.mean),
            format!("{:.1}ns", summary.median),
            format!("{:.2}", self.gflops),
        ]
    }
}

impl Record for Verification {
    const HEADER: &'static str = VERIFICATION_HEADER;
    const TITLE: &'static str = "Verification";
    const SUMMARY_COLUMNS: &'static [&'static str] =
        &["ranks", "m0", "n0", "max difference", "result"];

    fn write_row(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            out,
            "{},{},{},{}",
            self.num_ranks, self.m0, self.n0, self.verdict
        )
    }

    fn summary_row(&self) -> Vec<String> {
        vec![
            self.num_ranks.to_string(),
            self.m0.to_string(),
            self.n0.to_string(),
            format!("{:e}", self.max_difference),
            self.verdict.to_string(),
        ]
    }
}

/// Write the CSV header for `T`.
pub fn write_header<T: Record>(out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "{}", T::HEADER)
}

/// Write a header followed by one row per record.
pub fn write_csv<T: Record>(out: &mut dyn Write, records: &[T]) -> std::io::Result<()> {
    write_header::<T>(out)?;
    for record in records {
        record.write_row(out)?;
    }
    Ok(())
}

/// Tabulate `records` for human consumption.
pub fn summarize<T: Record>(records: &[T]) -> Table {
    let mut table = Table::new(T::SUMMARY_COLUMNS);
    for record in records {
        table.push(record.summary_row());
    }
    table
}

/// Write a framed title and the summary table of `records`.
pub fn write_summary<T: Record>(
    out: &mut dyn Write,
    label: &str,
    records: &[T],
) -> std::io::Result<()> {
    writeln!(out)?;
    write!(out, "{}", Banner::new(&format!("{}: {}", T::TITLE, label)))?;
    write!(out, "{}", summarize(records))
}

/// Save `records` as pretty-printed JSON.
pub fn save_json<T: Record>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("could not create {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)
        .with_context(|| format!("could not serialize results to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

///////////
// Tests //
///////////
