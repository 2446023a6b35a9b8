use thiserror::Error;

/// Structural input errors. Degenerate data (no prior games, unconverged search) is not an
/// error anywhere in the pipeline; only inputs that make an operation meaningless are.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid search range: low {low} must be finite and below high {high}")]
    InvalidSearchRange { low: f64, high: f64 },

    #[error("invalid step {step}: must be positive and smaller than the range width {width}")]
    InvalidStep { step: f64, width: f64 },

    #[error("probability {0} must be finite and within [0, 1]")]
    InvalidProbability(f64),

    #[error("invalid optimizer settings: {0}")]
    InvalidOptimizer(String),

    #[error("unknown feature column: {0}")]
    UnknownColumn(String),

    #[error("not enough rows: need more than {needed}, have {have}")]
    NotEnoughRows { needed: usize, have: usize },

    #[error("regression failed: {0}")]
    Regression(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
