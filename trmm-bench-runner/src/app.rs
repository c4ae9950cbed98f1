/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{io::Write, num::NonZeroUsize, path::PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rand::{rngs::StdRng, SeedableRng};
use trmm_comm::{Context, LocalGroup};
use trmm_kernels::ProblemSize;

use crate::{
    output::{FileOutput, Output},
    registry::Variants,
    report::{self, Record},
    sweep::{Plan, USAGE},
    timing::{self, TimingConfig, DEFAULT_FLUSH_BYTES, DEFAULT_RUNS, DEFAULT_TRIALS},
    verify,
};

/// The seed of the input generator when none is given.
pub const DEFAULT_SEED: u64 = 1;

/// Options shared by every command that runs a sweep.
#[derive(Debug, Clone, Args)]
pub struct SweepArgs {
    /// The number of ranks in the in-process group.
    #[arg(long, default_value_t = NonZeroUsize::MIN)]
    pub ranks: NonZeroUsize,

    /// Seed for the coordinator's input generator.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Print a human readable summary after the CSV report.
    #[arg(long, action)]
    pub summary: bool,

    /// Read the sweep from a JSON file instead of the positional arguments.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also save the full results as JSON.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Run under an MPI launcher. The process count comes from the launcher.
    #[cfg(feature = "mpi")]
    #[arg(long, action, conflicts_with = "ranks")]
    pub mpi: bool,

    /// The sweep: no values for the default sweep, or all five bounds and an optional
    /// report path.
    #[arg(value_name = USAGE, allow_negative_numbers = true)]
    pub positional: Vec<String>,
}

impl Default for SweepArgs {
    fn default() -> Self {
        Self {
            ranks: NonZeroUsize::MIN,
            seed: DEFAULT_SEED,
            summary: false,
            config: None,
            json: None,
            #[cfg(feature = "mpi")]
            mpi: false,
            positional: Vec::new(),
        }
    }
}

/// Parsed command line options.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the registered variants.
    Variants,
    /// Measure the throughput of a variant over a sweep of problem sizes.
    Time {
        /// The variant to measure.
        #[arg(long)]
        variant: String,
        /// The number of measured trials per size.
        #[arg(long, default_value_t = DEFAULT_TRIALS)]
        trials: NonZeroUsize,
        /// Invocations of the kernel per trial.
        #[arg(long, default_value_t = DEFAULT_RUNS)]
        runs: NonZeroUsize,
        #[command(flatten)]
        sweep: SweepArgs,
    },
    /// Compare a variant against a reference over a sweep of problem sizes.
    Verify {
        /// The variant to check.
        #[arg(long)]
        variant: String,
        /// The variant whose output is taken as correct.
        #[arg(long, default_value = "baseline")]
        reference: String,
        #[command(flatten)]
        sweep: SweepArgs,
    },
}

/// The CLI used to drive the benchmarks.
#[derive(Debug, Parser)]
pub struct App {
    #[command(subcommand)]
    command: Commands,
}

impl App {
    /// Construct [`Self`] by parsing commandline arguments from [`std::env::args]`.
    ///
    /// This simply redirects to [`clap::Parser::parse`] and is provided to allow parsing
    /// without the [`clap::Parser`] trait in scope.
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Construct [`Self`] by parsing command line arguments from the iterator.
    pub fn try_parse_from<I, T>(itr: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(<Self as clap::Parser>::try_parse_from(itr)?)
    }

    /// Construct [`Self`] directly from a [`Commands`] enum.
    pub fn from_commands(command: Commands) -> Self {
        Self { command }
    }

    /// Run the application with the registered `variants`.
    ///
    /// Reports are written to `output` unless the sweep names a report file.
    pub fn run(&self, variants: &Variants, mut output: &mut dyn Output) -> anyhow::Result<()> {
        match &self.command {
            Commands::Variants => {
                writeln!(output, "Registered variants:")?;
                for variant in variants.iter() {
                    writeln!(
                        output,
                        "    {} ({}): {}",
                        variant.name(),
                        variant.strategy(),
                        variant.description()
                    )?;
                }
            }
            Commands::Time {
                variant,
                trials,
                runs,
                sweep,
            } => {
                let variant = variants.lookup(variant)?;
                let config = TimingConfig {
                    trials: *trials,
                    runs: *runs,
                    flush_bytes: DEFAULT_FLUSH_BYTES,
                };
                sweep.execute(output, variant.name(), |ctx, size, rng| {
                    timing::run_timing(ctx, variant, size, &config, rng)
                })?;
            }
            Commands::Verify {
                variant,
                reference,
                sweep,
            } => {
                let candidate = variants.lookup(variant)?;
                let reference = variants.lookup(reference)?;
                sweep.execute(output, candidate.name(), |ctx, size, rng| {
                    verify::verify(ctx, reference, candidate, size, rng)
                })?;
            }
        }
        Ok(())
    }
}

/// Where the ranks of a sweep run.
enum Backend {
    Local(LocalGroup),
    #[cfg(feature = "mpi")]
    Mpi(trmm_comm::mpi::MpiWorld),
}

impl Backend {
    /// Return `true` if the coordinator rank lives in this process.
    fn hosts_coordinator(&self) -> bool {
        match self {
            Self::Local(_) => true,
            #[cfg(feature = "mpi")]
            Self::Mpi(world) => trmm_comm::Communicator::rank(world) == 0,
        }
    }

    /// Run `f` on every rank hosted by this process and return the coordinator's result.
    fn run<F, T>(&self, f: F) -> anyhow::Result<Option<T>>
    where
        F: Fn(Context<'_>) -> anyhow::Result<Option<T>> + Sync,
        T: Send,
    {
        match self {
            Self::Local(group) => {
                let results = group.run(f)?;
                Ok(results.into_iter().next().flatten())
            }
            #[cfg(feature = "mpi")]
            Self::Mpi(world) => {
                use trmm_comm::Communicator;

                let ctx = Context::new(world);
                match f(ctx) {
                    Ok(result) => Ok(result),
                    Err(err) => {
                        tracing::error!(rank = ctx.rank(), "{:?}", err);
                        world.abort(1)
                    }
                }
            }
        }
    }
}

fn make_progress_bar(
    label: &str,
    count: usize,
    draw_target: ProgressDrawTarget,
) -> anyhow::Result<ProgressBar> {
    let progress = ProgressBar::with_draw_target(Some(count as u64), draw_target);
    progress.set_style(ProgressStyle::with_template(&format!(
        "{} [{{elapsed_precise}}] {{wide_bar}} {{pos}}/{{len}}",
        label
    ))?);
    Ok(progress)
}

impl SweepArgs {
    fn backend(&self) -> anyhow::Result<Backend> {
        #[cfg(feature = "mpi")]
        if self.mpi {
            return Ok(Backend::Mpi(trmm_comm::mpi::MpiWorld::initialize()?));
        }
        Ok(Backend::Local(LocalGroup::new(self.ranks)))
    }

    /// Run `job` for every size of the sweep on every rank and report the coordinator's
    /// records.
    fn execute<F, T>(&self, output: &mut dyn Output, label: &str, job: F) -> anyhow::Result<()>
    where
        F: Fn(Context<'_>, ProblemSize, &mut StdRng) -> anyhow::Result<Option<T>> + Sync,
        T: Record + Send,
    {
        // Bad arguments are reported before any rank starts.
        let plan = Plan::resolve(&self.positional, self.config.as_deref())?;
        let sizes = plan.sweep.sizes()?;

        let backend = self.backend()?;
        let draw_target = if backend.hosts_coordinator() {
            output.draw_target()
        } else {
            ProgressDrawTarget::hidden()
        };
        let progress = make_progress_bar(label, sizes.len(), draw_target)?;

        let records = backend.run(|ctx| {
            let mut rng = StdRng::seed_from_u64(self.seed);
            let mut records = ctx.is_root().then(|| Vec::with_capacity(sizes.len()));
            for &size in &sizes {
                if ctx.is_root() {
                    tracing::info!(variant = label, %size, ranks = ctx.num_ranks(), "running");
                }
                let record = job(ctx, size, &mut rng)
                    .with_context(|| format!("{} failed on a {} problem", label, size))?;
                if let (Some(records), Some(record)) = (records.as_mut(), record) {
                    records.push(record);
                    progress.inc(1);
                }
            }
            Ok(records)
        })?;
        progress.finish_and_clear();

        let Some(records) = records else {
            return Ok(());
        };

        let mut file;
        let output: &mut dyn Output = match &plan.output {
            Some(path) => {
                file = FileOutput::create(path)?;
                &mut file
            }
            None => output,
        };

        report::write_csv(output.sink(), &records)?;
        if self.summary {
            report::write_summary(output.sink(), label, &records)?;
        }
        output.sink().flush()?;

        if let Some(path) = &self.json {
            report::save_json(path, &records)?;
        }
        Ok(())
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use trmm_kernels::{Baseline, RowSharded};

    use super::*;
    use crate::{output::Memory, sweep::SweepError};

    fn variants() -> Variants {
        let mut variants = Variants::new();
        variants.register(Baseline).unwrap();
        variants.register(RowSharded).unwrap();
        variants
    }

    fn run(app: &App) -> anyhow::Result<String> {
        let mut buffer = Memory::new();
        app.run(&variants(), &mut buffer)?;
        Ok(String::from_utf8(buffer.into_inner()).unwrap())
    }

    #[test]
    fn test_parse() {
        let app = App::try_parse_from([
            "trmm-bench",
            "time",
            "--variant",
            "baseline",
            "--trials",
            "3",
            "--ranks",
            "4",
            "1",
            "2",
            "1",
            "2",
            "-5",
        ])
        .unwrap();

        let Commands::Time {
            variant,
            trials,
            runs,
            sweep,
        } = &app.command
        else {
            panic!("expected a time command, got {:?}", app.command);
        };
        assert_eq!(variant, "baseline");
        assert_eq!(trials.get(), 3);
        assert_eq!(*runs, DEFAULT_RUNS);
        assert_eq!(sweep.ranks.get(), 4);
        assert_eq!(sweep.seed, DEFAULT_SEED);
        assert_eq!(sweep.positional, ["1", "2", "1", "2", "-5"]);

        assert!(App::try_parse_from(["trmm-bench", "time"]).is_err());
        assert!(App::try_parse_from(["trmm-bench", "verify", "--variant", "x", "--ranks", "0"])
            .is_err());
    }

    #[test]
    fn test_variants() {
        let message = run(&App::from_commands(Commands::Variants)).unwrap();
        let expected = "Registered variants:\n    \
                        baseline (coordinator-only): triple loop over i, j and k <= i on \
                        the coordinator\n";
        assert!(message.starts_with(expected), "{}", message);
        assert!(message.contains("    row-sharded (row-sharded): "), "{}", message);
    }

    #[test]
    fn test_time() {
        let app = App::from_commands(Commands::Time {
            variant: "row-sharded".into(),
            trials: NonZeroUsize::new(2).unwrap(),
            runs: NonZeroUsize::MIN,
            sweep: SweepArgs {
                ranks: NonZeroUsize::new(3).unwrap(),
                positional: ["1", "3", "1", "4", "-2"].map(String::from).to_vec(),
                ..SweepArgs::default()
            },
        });
        let report = run(&app).unwrap();
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(lines.len(), 4, "{}", report);
        assert_eq!(lines[0], "num_ranks,m0,n0,gflops");
        for (line, m0) in std::iter::zip(&lines[1..], [4, 8, 12]) {
            let prefix = format!("3,{},2,", m0);
            assert!(line.starts_with(&prefix), "{}", line);
            let gflops = &line[prefix.len()..];
            assert_eq!(gflops.split('.').nth(1).map(str::len), Some(2), "{}", line);
        }
    }

    #[test]
    fn test_verify_with_summary() {
        let app = App::from_commands(Commands::Verify {
            variant: "row-sharded".into(),
            reference: "baseline".into(),
            sweep: SweepArgs {
                ranks: NonZeroUsize::new(2).unwrap(),
                summary: true,
                positional: ["2", "4", "2", "3", "1"].map(String::from).to_vec(),
                ..SweepArgs::default()
            },
        });
        let report = run(&app).unwrap();
        let expected = "num_ranks,m0,n0,result\n2,6,2,PASS\n2,12,4,PASS\n";
        assert!(report.starts_with(expected), "{}", report);
        assert!(report.contains("# Verification: row-sharded #"), "{}", report);
    }

    #[test]
    fn test_argument_count_is_rejected() {
        let app = App::from_commands(Commands::Verify {
            variant: "baseline".into(),
            reference: "baseline".into(),
            sweep: SweepArgs {
                positional: ["1", "2", "3"].map(String::from).to_vec(),
                ..SweepArgs::default()
            },
        });

        let mut buffer = Memory::new();
        let err = app.run(&variants(), &mut buffer).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SweepError>(),
            Some(SweepError::ArgumentCount(3))
        ));
        // Nothing is reported.
        assert!(buffer.into_inner().is_empty());
    }

    #[test]
    fn test_unknown_variant() {
        let app = App::from_commands(Commands::Time {
            variant: "gemm".into(),
            trials: DEFAULT_TRIALS,
            runs: DEFAULT_RUNS,
            sweep: SweepArgs::default(),
        });
        let err = run(&app).unwrap_err();
        assert!(err.to_string().contains("no variant named \"gemm\""), "{}", err);
    }

    #[test]
    fn test_report_file_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("report.csv");
        let json = dir.path().join("report.json");

        let app = App::from_commands(Commands::Verify {
            variant: "baseline".into(),
            reference: "baseline".into(),
            sweep: SweepArgs {
                json: Some(json.clone()),
                positional: vec![
                    "1".into(),
                    "1".into(),
                    "1".into(),
                    "-5".into(),
                    "-5".into(),
                    csv.display().to_string(),
                ],
                ..SweepArgs::default()
            },
        });

        // The default output receives nothing.
        assert_eq!(run(&app).unwrap(), "");
        assert_eq!(
            std::fs::read_to_string(&csv).unwrap(),
            "num_ranks,m0,n0,result\n1,5,5,PASS\n"
        );

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(value[0]["verdict"], "PASS");
        assert_eq!(value[0]["max_difference"], 0.0);
    }
}
