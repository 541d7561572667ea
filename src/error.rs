#[cfg(feature = "python")]
use pyo3::exceptions::{PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TradeError {
    #[error("Load failed: {0}")]
    Load(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid group key: {0}")]
    InvalidGroupKey(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TradeError {
    /// True for failures raised while reading the source table.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::Load(_) | Self::MissingColumn(_) | Self::Polars(_) | Self::Io(_)
        )
    }
}

#[cfg(feature = "python")]
impl From<TradeError> for PyErr {
    fn from(err: TradeError) -> PyErr {
        match err {
            TradeError::InvalidGroupKey(_) => PyValueError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}
