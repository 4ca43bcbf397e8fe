use thiserror::Error;

#[derive(Error, Debug)]
pub enum InversionError {
    #[error("Invalid grid specification: {0}")]
    InvalidGridSpec(String),

    #[error("Setpoint count {setpoints} does not match data length {data}")]
    SetpointMismatch { setpoints: usize, data: usize },

    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Singular system: {0}")]
    SingularSystem(String),

    #[error("No convergence after {iterations} iterations (relative change {change:.3e})")]
    NonConvergence { iterations: usize, change: f64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type InversionResult<T> = Result<T, InversionError>;

/// Fail with `DimensionMismatch` unless `found == expected`.
pub fn ensure_len(context: &str, expected: usize, found: usize) -> InversionResult<()> {
    if expected != found {
        return Err(InversionError::DimensionMismatch {
            context: context.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}
