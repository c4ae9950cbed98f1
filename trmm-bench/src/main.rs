/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

mod backend;

use std::process::ExitCode;

use trmm_bench_runner::{self as runner, sweep::SweepError};

/// Exit status for malformed arguments, matching the status `clap` uses.
const USAGE_ERROR: u8 = 2;

fn main() -> ExitCode {
    runner::logging::init_subscriber();

    let cli = Cli::parse();
    let mut output = runner::output::default();
    match cli.run(&mut output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:?}", err);
            if err.downcast_ref::<SweepError>().is_some() {
                ExitCode::from(USAGE_ERROR)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// The top-level CLI for the benchmark binary.
#[derive(Debug, clap::Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    app: runner::App,
}

impl Cli {
    fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    fn run(&self, output: &mut dyn runner::Output) -> anyhow::Result<()> {
        let mut variants = runner::Variants::new();
        backend::register_variants(&mut variants)?;
        self.app.run(&variants, output)
    }

    #[cfg(test)]
    fn from_commands(commands: runner::app::Commands) -> Self {
        Self {
            app: runner::App::from_commands(commands),
        }
    }
}

///////////
// Tests //
///////////
