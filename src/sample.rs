//! Sampling of a function and its derivatives on evenly spaced points.
//!
//! Points at which an expression has no finite value, for example at a pole,
//! are left out of the sampled sequences. No error is reported for them:
//! the only trace of a skipped point is its absence from the output.
//!
//! ```
//! use symsample::{derivative::Derivatives, sample::Sampler, state::Symbol};
//!
//! let d = Derivatives::parse("x^2", "x").unwrap();
//! let record = Sampler::default().sample_derivatives(&d, Symbol::new("x"), 1., 0.1);
//! assert_eq!(record.function.len(), 10);
//! ```

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    atom::Atom,
    derivative::Derivatives,
    evaluate::EvaluationError,
    range::LinearRange,
    state::Symbol,
};

/// Why a sample point was left out.
pub type SkipReason = EvaluationError;

/// The result of evaluating an expression at a single point.
#[derive(Clone, Debug, PartialEq)]
pub enum PointOutcome {
    Value(f64),
    Skipped(SkipReason),
}

impl PointOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            PointOutcome::Value(v) => Some(*v),
            PointOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PointOutcome::Skipped(_))
    }
}

/// Evaluate `expr` with `x` set to `value`.
pub fn evaluate_point(expr: &Atom, x: Symbol, value: f64) -> PointOutcome {
    match expr.evaluate_at(x, value) {
        Ok(v) => PointOutcome::Value(v),
        Err(e) => PointOutcome::Skipped(e),
    }
}

/// Evaluate `expr` on `count` evenly spaced points in `[start, end)` and
/// return the outcome for every point.
pub fn evaluate_outcomes(
    expr: &Atom,
    x: Symbol,
    start: f64,
    end: f64,
    count: usize,
) -> Vec<(f64, PointOutcome)> {
    LinearRange::new(start, end, count)
        .map(|p| (p, evaluate_point(expr, x, p)))
        .collect()
}

/// Evaluate `expr` on `count` evenly spaced points in `[start, end)`, keeping
/// only the points with a finite value, in ascending order of generation.
pub fn evaluate_points(
    expr: &Atom,
    x: Symbol,
    start: f64,
    end: f64,
    count: usize,
) -> Vec<(f64, f64)> {
    LinearRange::new(start, end, count)
        .filter_map(|p| evaluate_point(expr, x, p).value().map(|v| (p, v)))
        .collect()
}

/// Settings of the [Sampler].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    /// The lower bound of the sampled interval.
    pub start: f64,
    /// The number of sample points.
    pub count: usize,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        SamplingSettings {
            start: 0.,
            count: 10,
        }
    }
}

/// A function, its gradient and its laplacian sampled on the same points,
/// together with a value `h_value` that is passed through unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub h_value: f64,
    pub function: Vec<(f64, f64)>,
    pub gradient: Vec<(f64, f64)>,
    pub laplacian: Vec<(f64, f64)>,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("could not access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sample record: {0}")]
    Json(#[from] serde_json::Error),
}

/// A record that was computed, but could not be written.
#[derive(Debug, Error)]
#[error("sample record could not be written: {source}")]
pub struct PersistError {
    record: SampleRecord,
    #[source]
    source: RecordError,
}

impl PersistError {
    /// The record that failed to persist.
    pub fn record(&self) -> &SampleRecord {
        &self.record
    }

    pub fn into_record(self) -> SampleRecord {
        self.record
    }

    pub fn error(&self) -> &RecordError {
        &self.source
    }
}

impl SampleRecord {
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<SampleRecord, RecordError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the record as JSON to `path`, replacing any existing content.
    pub fn write_to(&self, path: &Path) -> Result<(), RecordError> {
        let io_error = |source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(io_error)?;

        debug!("Wrote sample record to {}", path.display());
        Ok(())
    }

    /// Read a record that was written with [SampleRecord::write_to].
    pub fn read_from(path: &Path) -> Result<SampleRecord, RecordError> {
        let file = File::open(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write the record to `destination`, if there is one. The record is
    /// returned on success and is part of the error on failure.
    pub fn persist(self, destination: Option<&Path>) -> Result<SampleRecord, PersistError> {
        if let Some(path) = destination {
            if let Err(source) = self.write_to(path) {
                return Err(PersistError {
                    record: self,
                    source,
                });
            }
        }

        Ok(self)
    }
}

/// Samples a function and its derivatives on the points set by [SamplingSettings].
#[derive(Clone, Debug, Default)]
pub struct Sampler {
    settings: SamplingSettings,
}

impl Sampler {
    pub fn new(settings: SamplingSettings) -> Sampler {
        Sampler { settings }
    }

    pub fn settings(&self) -> &SamplingSettings {
        &self.settings
    }

    /// The sample points in `[start, end)`.
    pub fn points(&self, end: f64) -> LinearRange {
        LinearRange::new(self.settings.start, end, self.settings.count)
    }

    /// Sample `func`, `grad` and `lapl` in the variable `x` on `[start, end)`.
    #[instrument(level = "debug", skip_all, fields(%x, end, h))]
    pub fn sample(
        &self,
        func: &Atom,
        grad: &Atom,
        lapl: &Atom,
        x: Symbol,
        end: f64,
        h: f64,
    ) -> SampleRecord {
        let SamplingSettings { start, count } = self.settings;

        let record = SampleRecord {
            h_value: h,
            function: evaluate_points(func, x, start, end, count),
            gradient: evaluate_points(grad, x, start, end, count),
            laplacian: evaluate_points(lapl, x, start, end, count),
        };

        debug!(
            "Sampled {} points: {} function, {} gradient and {} laplacian values",
            count,
            record.function.len(),
            record.gradient.len(),
            record.laplacian.len()
        );

        record
    }

    /// Sample the output of the derivative engine.
    pub fn sample_derivatives(&self, d: &Derivatives, x: Symbol, end: f64, h: f64) -> SampleRecord {
        self.sample(&d.function, &d.gradient, &d.laplacian, x, end, h)
    }

    /// Sample the derivatives and write the record to `destination`, if there is one.
    pub fn sample_to(
        &self,
        d: &Derivatives,
        x: Symbol,
        end: f64,
        h: f64,
        destination: Option<&Path>,
    ) -> Result<SampleRecord, PersistError> {
        self.sample_derivatives(d, x, end, h).persist(destination)
    }
}

/// Sample `func`, `grad` and `lapl` on 10 points in `[0, end)` with the
/// default settings and write the record to `destination`, if there is one.
pub fn sample(
    func: &Atom,
    grad: &Atom,
    lapl: &Atom,
    x: Symbol,
    end: f64,
    h: f64,
    destination: Option<&Path>,
) -> Result<SampleRecord, PersistError> {
    Sampler::default()
        .sample(func, grad, lapl, x, end, h)
        .persist(destination)
}

#[cfg(test)]
mod test {
    use crate::{atom::Atom, evaluate::EvaluationError, state::Symbol};

    use super::{
        evaluate_outcomes, evaluate_point, evaluate_points, PointOutcome, SampleRecord, Sampler,
        SamplingSettings,
    };

    #[test]
    fn outcome() {
        let x = Symbol::new("x");
        let a = Atom::parse("1/x").unwrap();
        assert_eq!(evaluate_point(&a, x, 2.), PointOutcome::Value(0.5));
        assert_eq!(
            evaluate_point(&a, x, 0.),
            PointOutcome::Skipped(EvaluationError::NonFinite(f64::INFINITY))
        );
    }

    #[test]
    fn pole_is_skipped() {
        let x = Symbol::new("x");
        let a = Atom::parse("1/x").unwrap();

        let points = evaluate_points(&a, x, 0., 10., 10);
        assert_eq!(points.len(), 9);
        assert_eq!(points[0], (1., 1.));
        assert!(points.iter().all(|(p, _)| *p != 0.));

        let outcomes = evaluate_outcomes(&a, x, 0., 10., 10);
        assert_eq!(outcomes.len(), 10);
        assert!(outcomes[0].1.is_skipped());
    }

    #[test]
    fn ascending_order() {
        let x = Symbol::new("x");
        let a = Atom::parse("sin(x)").unwrap();
        let points = evaluate_points(&a, x, -1., 1., 8);
        assert_eq!(points.len(), 8);
        assert!(points.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn missing_variable_skips_everything() {
        let x = Symbol::new("x");
        let a = Atom::parse("x*y").unwrap();
        assert!(evaluate_points(&a, x, 0., 1., 10).is_empty());
    }

    #[test]
    fn settings() {
        let s: SamplingSettings = serde_json::from_str(r#"{"count": 4}"#).unwrap();
        assert_eq!(
            s,
            SamplingSettings {
                start: 0.,
                count: 4
            }
        );

        let x = Symbol::new("x");
        let a = Atom::parse("x").unwrap();
        let sampler = Sampler::new(SamplingSettings {
            start: 1.,
            count: 2,
        });
        assert_eq!(sampler.settings().count, 2);
        assert_eq!(sampler.points(2.).collect::<Vec<_>>(), vec![1., 1.5]);

        let r = sampler.sample(&a, &a, &a, x, 2., 3.);
        assert_eq!(r.function, vec![(1., 1.), (1.5, 1.5)]);
        assert_eq!(r.h_value, 3.);
    }

    #[test]
    fn json_layout() {
        let r = SampleRecord {
            h_value: 0.5,
            function: vec![(0., 1.)],
            gradient: vec![],
            laplacian: vec![(0.25, -2.)],
        };

        assert_eq!(
            r.to_json().unwrap(),
            r#"{"h_value":0.5,"function":[[0.0,1.0]],"gradient":[],"laplacian":[[0.25,-2.0]]}"#
        );
        assert_eq!(SampleRecord::from_json(&r.to_json().unwrap()).unwrap(), r);
    }
}
