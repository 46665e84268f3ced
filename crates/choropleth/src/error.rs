use runtime::PublishError;

/// Misuse of the chart API. Fatal to the current call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("no data controller attached")]
    NoDataController,
    #[error("invalid option `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },
    #[error("invalid configuration JSON: {0}")]
    Json(String),
}

/// A feature accessor failed or produced something other than a primitive.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{accessor} accessor failed for feature {index}: {reason}")]
pub struct DataShapeError {
    pub index: usize,
    pub accessor: &'static str,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    DataShape(#[from] DataShapeError),
    #[error("event dispatch failed")]
    Publish(#[from] PublishError),
}
