/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::Context;

/// Return the default [`Output`]: reports to `stdout` and progress bars to `stderr`.
pub fn default() -> DefaultOutput {
    DefaultOutput::new()
}

/// The destination for benchmark reports.
///
/// Reports are written to the `sink`. Progress bars are drawn to the `draw_target`, which
/// must never be the same stream as the sink so that reports stay machine readable.
pub trait Output {
    fn sink(&mut self) -> &mut dyn Write;
    fn draw_target(&self) -> indicatif::ProgressDrawTarget;
}

/// Allows `&mut dyn Output` to be used with the `write!` family of macros.
impl Write for &mut dyn Output {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.sink().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.sink().flush()
    }
}

/// Reports to `stdout`, progress bars to `stderr`.
#[derive(Debug)]
pub struct DefaultOutput(std::io::Stdout);

impl DefaultOutput {
    pub fn new() -> Self {
        Self(std::io::stdout())
    }
}

impl Default for DefaultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for DefaultOutput {
    fn sink(&mut self) -> &mut dyn Write {
        &mut self.0
    }

    fn draw_target(&self) -> indicatif::ProgressDrawTarget {
        indicatif::ProgressDrawTarget::stderr()
    }
}

/// Reports to a file, progress bars to `stderr`.
#[derive(Debug)]
pub struct FileOutput(BufWriter<File>);

impl FileOutput {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("could not create the report file {}", path.display()))?;
        Ok(Self(BufWriter::new(file)))
    }
}

impl Output for FileOutput {
    fn sink(&mut self) -> &mut dyn Write {
        &mut self.0
    }

    fn draw_target(&self) -> indicatif::ProgressDrawTarget {
        indicatif::ProgressDrawTarget::stderr()
    }
}

/// Captures reports in memory. Progress bars are hidden.
#[derive(Debug, Default)]
pub struct Memory(Vec<u8>);

impl Memory {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Consume `self`, returning everything written so far.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Output for Memory {
    fn sink(&mut self) -> &mut dyn Write {
        &mut self.0
    }

    fn draw_target(&self) -> indicatif::ProgressDrawTarget {
        indicatif::ProgressDrawTarget::hidden()
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory() {
        let mut buf = Memory::new();
        {
            let mut output: &mut dyn Output = &mut buf;
            writeln!(output, "num_ranks,m0,n0,gflops").unwrap();
            writeln!(output, "{},{},{},{:.2}", 2, 48, 48, 1.5).unwrap();
            output.flush().unwrap();
            assert!(output.draw_target().is_hidden());
        }

        let bytes = buf.into_inner();
        let message = std::str::from_utf8(&bytes).unwrap();
        let lines: Vec<_> = message.lines().collect();
        assert_eq!(lines, ["num_ranks,m0,n0,gflops", "2,48,48,1.50"]);
    }

    #[test]
    fn test_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        {
            let mut file = FileOutput::create(&path).unwrap();
            let mut output = &mut file as &mut dyn Output;
            writeln!(output, "num_ranks,m0,n0,result").unwrap();
            output.flush().unwrap();
        }
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "num_ranks,m0,n0,result\n"
        );

        let missing = dir.path().join("no-such-dir").join("report.csv");
        let err = FileOutput::create(&missing).unwrap_err();
        assert!(err.to_string().contains("could not create the report file"));
    }
}
