use thiserror::Error;

/// Application error types.
///
/// Indicator math never produces errors: insufficient input yields a neutral
/// fallback. Errors only originate at collaborator boundaries.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Market data provider error: {0}")]
    DataProvider(String),

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
