use thiserror::Error;

/// Errors detected while building an operator or dispatcher.
///
/// These are never recoverable: an operator only exists once its
/// configuration passed validation.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("model switching needs at least two models, found {found}")]
    TooFewModels { found: usize },
    #[error("parameter {position} is tagged with model {index}, but only {model_count} models exist")]
    ModelIndexOutOfRange {
        position: usize,
        index: usize,
        model_count: usize,
    },
    #[error("invalid scale factor {value} at position {position}")]
    InvalidScaleFactor { position: usize, value: f64 },
    #[error("invalid gamma proposal with shape {shape} and scale {scale}")]
    InvalidDensity { shape: f64, scale: f64 },
    #[error("at least one model is required")]
    EmptyModelSet,
    #[error("model indicator value {value} is outside of [0, {model_count})")]
    IndicatorOutOfRange { value: usize, model_count: usize },
}

/// Invariant violations raised while executing a single chain step.
///
/// The chain driver is expected to abort the step when it sees one of these.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StepError {
    #[error("model indicator value {value} is outside of [0, {model_count})")]
    IndicatorOutOfRange { value: usize, model_count: usize },
    #[error("model {model} has no parameters to propose a move for")]
    EmptyBucket { model: usize },
    #[error("parameter {name} has value {value}, a multiplicative move needs a positive finite value")]
    NonPositiveValue { name: String, value: f64 },
    #[error("log density of sub model {model} returned an unrecoverable error")]
    SubModelFailure {
        model: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, StepError>;
