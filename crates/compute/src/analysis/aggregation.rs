use std::collections::BTreeMap;

use data::DataPoint;
use data::point;
use serde::Serialize;
use tracing::debug;

use super::statistics::Statistics;

/// location → key → sum
pub type NestedSums = BTreeMap<String, BTreeMap<String, f64>>;

/// Aggregated, read-only view of a dataset for one selected group.
///
/// Recomputed for every render pass and never mutated afterwards. The maps are
/// ordered by key, so iteration does not depend on the dataset's record order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataView {
    pub locations: Vec<String>,
    pub labels: Vec<String>,
    pub groups: Vec<String>,
    /// `None` only for an empty dataset.
    pub selected_group: Option<String>,
    pub selected_group_data: Vec<DataPoint>,
    pub by_location_label: NestedSums,
    pub by_location_group: NestedSums,
    pub location_to_sum: BTreeMap<String, f64>,
    /// `None` means "no data"; never divide by it.
    pub max_location: Option<f64>,
    pub max_label: Option<f64>,
    pub max_group: Option<f64>,
}

impl DataView {
    /// Sum of all location totals.
    pub fn total(&self) -> f64 {
        Statistics::sum(self.location_to_sum.values().copied())
    }

    pub fn location_sum(&self, location: &str) -> Option<f64> {
        self.location_to_sum.get(location).copied()
    }

    pub fn label_sums(&self, location: &str) -> Option<&BTreeMap<String, f64>> {
        self.by_location_label.get(location)
    }

    pub fn has_data(&self) -> bool {
        !self.location_to_sum.is_empty()
    }
}

/// Resolves the group to present.
///
/// Keeps `previous` if the dataset still contains it, otherwise falls back to
/// the first group key in first-appearance order.
pub fn resolve_group(groups: &[String], previous: Option<&str>) -> Option<String> {
    if let Some(prev) = previous {
        if groups.iter().any(|g| g == prev) {
            return Some(prev.to_string());
        }
        debug!(previous = prev, "selected group no longer present; using first group");
    }
    groups.first().cloned()
}

/// Builds the data view for `dataset`, presenting `previous_group` if possible.
pub fn compute_data_view(dataset: &[DataPoint], previous_group: Option<&str>) -> DataView {
    let locations = point::locations(dataset);
    let labels = point::labels(dataset);
    let groups = point::groups(dataset);
    let selected_group = resolve_group(&groups, previous_group);

    let selected_group_data: Vec<DataPoint> = match &selected_group {
        Some(group) => dataset
            .iter()
            .filter(|d| d.group_key() == group)
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    // One pass fills all three tables. Zero values still create their keys.
    let mut by_location_label = NestedSums::new();
    let mut by_location_group = NestedSums::new();
    let mut location_to_sum = BTreeMap::new();
    for d in &selected_group_data {
        *by_location_label
            .entry(d.location.clone())
            .or_default()
            .entry(d.label.clone())
            .or_insert(0.0) += d.value;
        *by_location_group
            .entry(d.location.clone())
            .or_default()
            .entry(d.group_key().to_string())
            .or_insert(0.0) += d.value;
        *location_to_sum.entry(d.location.clone()).or_insert(0.0) += d.value;
    }

    let max_location = Statistics::max(location_to_sum.values().copied());
    let max_label = nested_max(&by_location_label);
    let max_group = nested_max(&by_location_group);

    DataView {
        locations,
        labels,
        groups,
        selected_group,
        selected_group_data,
        by_location_label,
        by_location_group,
        location_to_sum,
        max_location,
        max_label,
        max_group,
    }
}

fn nested_max(table: &NestedSums) -> Option<f64> {
    Statistics::max(table.values().flat_map(|inner| inner.values().copied()))
}

#[cfg(test)]
mod tests {
    use super::{compute_data_view, resolve_group};
    use data::DataPoint;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<DataPoint> {
        vec![
            DataPoint::new("A", "x", "g1", 5.0),
            DataPoint::new("A", "y", "g1", 3.0),
            DataPoint::new("B", "x", "g1", 2.0),
            DataPoint::new("B", "x", "g2", 11.0),
            DataPoint::new("C", "z", "g2", 4.0),
        ]
    }

    #[test]
    fn sums_per_location_and_label() {
        let dv = compute_data_view(&sample()[..2], Some("g1"));
        assert_eq!(dv.selected_group.as_deref(), Some("g1"));
        assert_eq!(dv.location_sum("A"), Some(8.0));
        assert_eq!(dv.by_location_label["A"]["x"], 5.0);
        assert_eq!(dv.by_location_label["A"]["y"], 3.0);
        assert_eq!(dv.by_location_group["A"]["g1"], 8.0);
    }

    #[test]
    fn stale_group_falls_back_to_first() {
        let dv = compute_data_view(&sample(), Some("nonexistent"));
        assert_eq!(dv.selected_group.as_deref(), Some("g1"));
        assert_eq!(dv.groups, vec!["g1", "g2"]);
    }

    #[test]
    fn no_previous_group_uses_first() {
        let groups = vec!["g2".to_string(), "g1".to_string()];
        assert_eq!(resolve_group(&groups, None).as_deref(), Some("g2"));
        assert_eq!(resolve_group(&groups, Some("g1")).as_deref(), Some("g1"));
        assert_eq!(resolve_group(&[], Some("g1")), None);
    }

    #[test]
    fn only_selected_group_is_aggregated() {
        let dv = compute_data_view(&sample(), Some("g2"));
        assert_eq!(dv.selected_group_data.len(), 2);
        assert_eq!(dv.location_sum("A"), None);
        assert_eq!(dv.location_sum("B"), Some(11.0));
        assert_eq!(dv.max_location, Some(11.0));
        assert_eq!(dv.max_label, Some(11.0));
        assert_eq!(dv.max_group, Some(11.0));
    }

    #[test]
    fn totals_are_conserved() {
        for group in ["g1", "g2"] {
            let dv = compute_data_view(&sample(), Some(group));
            let raw: f64 = dv.selected_group_data.iter().map(|d| d.value).sum();
            assert_eq!(dv.total(), raw);
        }
    }

    #[test]
    fn record_order_does_not_matter() {
        let forward = sample();
        let mut reversed = sample();
        reversed.reverse();
        let mut rotated = sample();
        rotated.rotate_left(2);

        let a = compute_data_view(&forward, Some("g1"));
        for other in [reversed, rotated] {
            let b = compute_data_view(&other, Some("g1"));
            assert_eq!(a.location_to_sum, b.location_to_sum);
            assert_eq!(a.by_location_label, b.by_location_label);
            assert_eq!(a.by_location_group, b.by_location_group);
        }
    }

    #[test]
    fn zero_values_are_kept_as_keys() {
        let data = vec![
            DataPoint::new("A", "x", "g1", 0.0),
            DataPoint::new("B", "x", "g1", 1.0),
        ];
        let dv = compute_data_view(&data, None);
        assert_eq!(dv.location_sum("A"), Some(0.0));
        assert_eq!(dv.location_sum("C"), None);
    }

    #[test]
    fn empty_dataset_has_no_maxima() {
        let dv = compute_data_view(&[], Some("g1"));
        assert_eq!(dv.selected_group, None);
        assert!(!dv.has_data());
        assert_eq!(dv.max_location, None);
        assert_eq!(dv.max_label, None);
        assert_eq!(dv.max_group, None);
    }

    #[test]
    fn labels_double_as_groups_when_group_missing() {
        let data = vec![
            DataPoint::ungrouped("A", "x", 2.0),
            DataPoint::ungrouped("A", "y", 3.0),
        ];
        let dv = compute_data_view(&data, Some("y"));
        assert_eq!(dv.selected_group.as_deref(), Some("y"));
        assert_eq!(dv.location_sum("A"), Some(3.0));
        assert_eq!(dv.by_location_group["A"]["y"], 3.0);
    }
}
