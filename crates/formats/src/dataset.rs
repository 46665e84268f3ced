use data::DataPoint;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected an array of records")]
    NotAnArray,
    #[error("invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

/// Parses `[{ "location", "label", "group"?, "value" }, ...]`.
pub fn parse_dataset_str(payload: &str) -> Result<Vec<DataPoint>, DatasetError> {
    let value: Value = serde_json::from_str(payload)?;
    parse_dataset_value(value)
}

pub fn parse_dataset_value(value: Value) -> Result<Vec<DataPoint>, DatasetError> {
    let Value::Array(records) = value else {
        return Err(DatasetError::NotAnArray);
    };
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let point: DataPoint =
                serde_json::from_value(record).map_err(|e| DatasetError::InvalidRecord {
                    index,
                    reason: e.to_string(),
                })?;
            if point.location.is_empty() {
                return Err(DatasetError::InvalidRecord {
                    index,
                    reason: "empty location".to_string(),
                });
            }
            Ok(point)
        })
        .collect()
}
