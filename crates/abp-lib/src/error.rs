use thiserror::Error;

/// Failure kinds raised by the analysis pipeline. Each stage returns exactly one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Record or required channel could not be obtained.
    #[error("acquisition failed: {0}")]
    Acquisition(String),

    /// Invalid value-range bounds, or nothing left inside them.
    #[error("range filter rejected input: {0}")]
    Range(String),

    /// Filter parameters are invalid or unsupported.
    #[error("invalid filter configuration: {0}")]
    FilterConfig(String),

    /// The filter could not be applied to this signal.
    #[error("filter execution failed: {0}")]
    FilterExecution(String),

    /// Threshold or distance parameters are invalid.
    #[error("peak detection failed: {0}")]
    PeakDetection(String),

    /// A metric derivation produced a non-finite value.
    #[error("metrics derivation failed: {0}")]
    Metrics(String),
}

impl AnalysisError {
    /// Short stable name of the error kind, used for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Acquisition(_) => "acquisition",
            AnalysisError::Range(_) => "range",
            AnalysisError::FilterConfig(_) => "filter_config",
            AnalysisError::FilterExecution(_) => "filter_execution",
            AnalysisError::PeakDetection(_) => "peak_detection",
            AnalysisError::Metrics(_) => "metrics",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
