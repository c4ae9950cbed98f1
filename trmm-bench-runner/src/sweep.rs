/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The sequence of problem sizes a run visits.
//!
//! A sweep walks a step counter from `min` to `max` (inclusive) in increments of `step`.
//! Each problem dimension is derived from the counter by [`scale_steps`]: a non-negative
//! dimension is a multiplier of the counter and a negative dimension is a fixed size.
//! For example, `m0 = 3, n0 = -16` visits `(3 * s) x 16` for every counter value `s`.

use std::{
    num::ParseIntError,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trmm_kernels::ProblemSize;

/// The positional argument layout.
pub const USAGE: &str = "min max step m0 n0 [output]";

/// The sweep used when no positional arguments are given.
pub const DEFAULT_SWEEP: Sweep = Sweep {
    min: 16,
    max: 1024,
    step: 16,
    m0: 3,
    n0: 3,
};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("expected 0, 5 or 6 positional arguments ({USAGE}) but got {0}")]
    ArgumentCount(usize),
    #[error("could not parse {name} from \"{value}\"")]
    Parse {
        name: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("the step must be positive but is {0}")]
    NonPositiveStep(i64),
    #[error("{name} = {dim} at step {step} is out of range")]
    Overflow { name: &'static str, step: i64, dim: i64 },
    #[error("{name} at step {step} is negative ({value})")]
    NegativeDimension {
        name: &'static str,
        step: i64,
        value: i64,
    },
    #[error("positional sweep arguments cannot be combined with a configuration file")]
    Conflict,
    #[error("could not read the sweep configuration {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sweep configuration {}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Derive a problem dimension from the step counter.
///
/// Returns `dim * step` if `dim` is non-negative and `-dim` otherwise, or `None` on
/// overflow.
pub fn scale_steps(step: i64, dim: i64) -> Option<i64> {
    if dim < 0 {
        dim.checked_neg()
    } else {
        dim.checked_mul(step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sweep {
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub m0: i64,
    pub n0: i64,
}

impl Sweep {
    /// Return the problem sizes visited by this sweep in order.
    ///
    /// An empty sweep (`min > max`) is valid and yields no sizes.
    pub fn sizes(&self) -> Result<Vec<ProblemSize>, SweepError> {
        if self.step <= 0 {
            return Err(SweepError::NonPositiveStep(self.step));
        }

        let mut sizes = Vec::new();
        let mut step = self.min;
        while step <= self.max {
            let m0 = scale("m0", step, self.m0)?;
            let n0 = scale("n0", step, self.n0)?;
            sizes.push(ProblemSize::new(m0, n0));
            step = match step.checked_add(self.step) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(sizes)
    }
}

impl Default for Sweep {
    fn default() -> Self {
        DEFAULT_SWEEP
    }
}

fn scale(name: &'static str, step: i64, dim: i64) -> Result<usize, SweepError> {
    let value = scale_steps(step, dim).ok_or(SweepError::Overflow { name, step, dim })?;
    usize::try_from(value).map_err(|_| SweepError::NegativeDimension { name, step, value })
}

/// A sweep and the destination of its report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub sweep: Sweep,
    /// Write the report here instead of the default output.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Plan {
    /// Build a plan from positional `min max step m0 n0 [output]` arguments.
    ///
    /// No arguments selects [`DEFAULT_SWEEP`]. Any count other than 0, 5 or 6 is an error.
    pub fn from_positional<S>(args: &[S]) -> Result<Self, SweepError>
    where
        S: AsRef<str>,
    {
        const NAMES: [&str; 5] = ["min", "max", "step", "m0", "n0"];

        match args.len() {
            0 => Ok(Self::default()),
            5 | 6 => {
                let mut values = [0i64; 5];
                for ((value, name), arg) in values.iter_mut().zip(NAMES).zip(args) {
                    let arg = arg.as_ref();
                    *value = arg.trim().parse().map_err(|source| SweepError::Parse {
                        name,
                        value: arg.to_string(),
                        source,
                    })?;
                }
                let [min, max, step, m0, n0] = values;
                Ok(Self {
                    sweep: Sweep {
                        min,
                        max,
                        step,
                        m0,
                        n0,
                    },
                    output: args.get(5).map(|p| PathBuf::from(p.as_ref())),
                })
            }
            n => Err(SweepError::ArgumentCount(n)),
        }
    }

    /// Load a plan from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SweepError::Read {
            path: path.into(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SweepError::Json {
            path: path.into(),
            source,
        })
    }

    /// Build a plan from either positional arguments or a configuration file.
    pub fn resolve<S>(positional: &[S], config: Option<&Path>) -> Result<Self, SweepError>
    where
        S: AsRef<str>,
    {
        match config {
            Some(_) if !positional.is_empty() => Err(SweepError::Conflict),
            Some(path) => Self::load(path),
            None => Self::from_positional(positional),
        }
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_scale_steps() {
        assert_eq!(scale_steps(16, 3), Some(48));
        assert_eq!(scale_steps(16, 0), Some(0));
        assert_eq!(scale_steps(16, -7), Some(7));
        assert_eq!(scale_steps(-2, 3), Some(-6));
        assert_eq!(scale_steps(2, i64::MAX), None);
        assert_eq!(scale_steps(2, i64::MIN), None);
    }

    #[test]
    fn test_default_sweep() {
        let plan = Plan::from_positional::<&str>(&[]).unwrap();
        assert_eq!(plan.sweep, DEFAULT_SWEEP);
        assert_eq!(plan.output, None);

        let sizes = plan.sweep.sizes().unwrap();
        assert_eq!(sizes.len(), 64);
        assert_eq!(sizes[0], ProblemSize::new(48, 48));
        assert_eq!(sizes[63], ProblemSize::new(3072, 3072));
    }

    #[test]
    fn test_positional() {
        let plan = Plan::from_positional(&["1", "3", "1", "2", "-5"]).unwrap();
        assert_eq!(
            plan.sweep.sizes().unwrap(),
            vec![
                ProblemSize::new(2, 5),
                ProblemSize::new(4, 5),
                ProblemSize::new(6, 5)
            ]
        );
        assert_eq!(plan.output, None);

        let plan = Plan::from_positional(&["4", "4", "4", "1", "1", "out.csv"]).unwrap();
        assert_eq!(plan.output, Some(PathBuf::from("out.csv")));
        assert_eq!(plan.sweep.sizes().unwrap(), vec![ProblemSize::new(4, 4)]);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(4)]
    #[case(7)]
    fn test_argument_count(#[case] count: usize) {
        let args = vec!["1"; count];
        let err = Plan::from_positional(&args).unwrap_err();
        assert!(matches!(err, SweepError::ArgumentCount(n) if n == count));
    }

    #[test]
    fn test_parse_error() {
        let err = Plan::from_positional(&["1", "two", "1", "1", "1"]).unwrap_err();
        assert!(matches!(err, SweepError::Parse { name: "max", .. }));
        assert_eq!(err.to_string(), "could not parse max from \"two\"");
    }

    #[test]
    fn test_invalid_sweeps() {
        let sweep = Sweep {
            step: 0,
            ..DEFAULT_SWEEP
        };
        assert!(matches!(
            sweep.sizes().unwrap_err(),
            SweepError::NonPositiveStep(0)
        ));

        // A negative counter with a multiplier gives a negative dimension.
        let sweep = Sweep {
            min: -2,
            max: 2,
            step: 2,
            m0: 1,
            n0: -3,
        };
        assert!(matches!(
            sweep.sizes().unwrap_err(),
            SweepError::NegativeDimension {
                name: "m0",
                step: -2,
                value: -2
            }
        ));

        // Empty sweeps are fine.
        let sweep = Sweep {
            min: 10,
            max: 1,
            ..DEFAULT_SWEEP
        };
        assert!(sweep.sizes().unwrap().is_empty());
    }

    #[test]
    fn test_sweep_ends_at_overflow() {
        let sweep = Sweep {
            min: i64::MAX - 1,
            max: i64::MAX,
            step: 4,
            m0: -1,
            n0: -1,
        };
        assert_eq!(sweep.sizes().unwrap(), vec![ProblemSize::new(1, 1)]);
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.json");
        std::fs::write(
            &path,
            r#"{
                "sweep": { "min": 8, "max": 16, "step": 8, "m0": 2, "n0": -4 },
                "output": "timings.csv"
            }"#,
        )
        .unwrap();

        let plan = Plan::resolve::<&str>(&[], Some(&path)).unwrap();
        assert_eq!(
            plan.sweep.sizes().unwrap(),
            vec![ProblemSize::new(16, 4), ProblemSize::new(32, 4)]
        );
        assert_eq!(plan.output, Some(PathBuf::from("timings.csv")));

        let err = Plan::resolve(&["1", "1", "1", "1", "1"], Some(&path)).unwrap_err();
        assert!(matches!(err, SweepError::Conflict));

        std::fs::write(&path, r#"{ "sweep": { "min": 8 } }"#).unwrap();
        let err = Plan::resolve::<&str>(&[], Some(&path)).unwrap_err();
        assert!(matches!(err, SweepError::Json { .. }));

        let missing = dir.path().join("missing.json");
        let err = Plan::resolve::<&str>(&[], Some(&missing)).unwrap_err();
        assert!(matches!(err, SweepError::Read { .. }));
    }
}
