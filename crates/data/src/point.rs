use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// One (location, label, group, value) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub location: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub value: f64,
}

impl DataPoint {
    pub fn new(
        location: impl Into<String>,
        label: impl Into<String>,
        group: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            location: location.into(),
            label: label.into(),
            group: Some(group.into()),
            value,
        }
    }

    /// Point without an explicit group; its label doubles as the group.
    pub fn ungrouped(location: impl Into<String>, label: impl Into<String>, value: f64) -> Self {
        Self {
            location: location.into(),
            label: label.into(),
            group: None,
            value,
        }
    }

    /// The group this point is aggregated under: `group`, else `label`.
    pub fn group_key(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.label)
    }
}

/// Distinct locations in first-appearance order.
pub fn locations(points: &[DataPoint]) -> Vec<String> {
    distinct(points.iter().map(|p| p.location.as_str()))
}

/// Distinct labels in first-appearance order.
pub fn labels(points: &[DataPoint]) -> Vec<String> {
    distinct(points.iter().map(|p| p.label.as_str()))
}

/// Distinct group keys in first-appearance order.
pub fn groups(points: &[DataPoint]) -> Vec<String> {
    distinct(points.iter().map(DataPoint::group_key))
}

fn distinct<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<String> {
    let set: IndexSet<&str> = keys.collect();
    set.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::{DataPoint, groups, labels, locations};
    use pretty_assertions::assert_eq;

    #[test]
    fn group_key_falls_back_to_label() {
        assert_eq!(DataPoint::new("A", "x", "g1", 1.0).group_key(), "g1");
        assert_eq!(DataPoint::ungrouped("A", "x", 1.0).group_key(), "x");
    }

    #[test]
    fn distinct_keys_keep_first_appearance_order() {
        let points = vec![
            DataPoint::new("B", "y", "g2", 1.0),
            DataPoint::new("A", "x", "g1", 1.0),
            DataPoint::new("B", "x", "g2", 1.0),
            DataPoint::ungrouped("C", "z", 1.0),
        ];
        assert_eq!(locations(&points), vec!["B", "A", "C"]);
        assert_eq!(labels(&points), vec!["y", "x", "z"]);
        assert_eq!(groups(&points), vec!["g2", "g1", "z"]);
    }

    #[test]
    fn deserializes_without_group() {
        let p: DataPoint =
            serde_json::from_str(r#"{"location":"A","label":"x","value":2}"#).unwrap();
        assert_eq!(p, DataPoint::ungrouped("A", "x", 2.0));
    }
}
