//! Domain error types.

/// Top-level error type for the analyzer.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("insufficient data for {context}: have {have} observations, need {need}")]
    InsufficientData {
        context: String,
        have: usize,
        need: usize,
    },

    #[error("misaligned data: {reason}")]
    MisalignedData { reason: String },

    #[error("optimization failed: {reason}")]
    Optimization {
        reason: String,
        /// Last feasible weights the solver reached, if it got that far.
        best_weights: Option<Vec<f64>>,
    },

    #[error("no price data for {}", tickers.join(", "))]
    MissingTicker { tickers: Vec<String> },

    #[error("invalid weights: {reason}")]
    InvalidWeights { reason: String },

    #[error("portfolio not found: {name}")]
    PortfolioNotFound { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("portfolio store error: {reason}")]
    Store { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    pub fn insufficient(context: impl Into<String>, have: usize, need: usize) -> Self {
        AnalyzerError::InsufficientData {
            context: context.into(),
            have,
            need,
        }
    }

    /// Weights the optimizer reached before giving up, when it has any.
    pub fn fallback_weights(&self) -> Option<&[f64]> {
        match self {
            AnalyzerError::Optimization {
                best_weights: Some(w),
                ..
            } => Some(w),
            _ => None,
        }
    }
}

impl From<&AnalyzerError> for std::process::ExitCode {
    fn from(err: &AnalyzerError) -> Self {
        let code: u8 = match err {
            AnalyzerError::Io(_) => 1,
            AnalyzerError::ConfigParse { .. }
            | AnalyzerError::ConfigMissing { .. }
            | AnalyzerError::ConfigInvalid { .. } => 2,
            AnalyzerError::DataSource { .. }
            | AnalyzerError::Store { .. }
            | AnalyzerError::PortfolioNotFound { .. } => 3,
            AnalyzerError::InvalidWeights { .. } | AnalyzerError::Optimization { .. } => 4,
            AnalyzerError::InsufficientData { .. }
            | AnalyzerError::MisalignedData { .. }
            | AnalyzerError::MissingTicker { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
