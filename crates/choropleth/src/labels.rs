use compute::DataView;
use compute::analysis::statistics::Statistics;
use formats::GeoPoint;
use serde::Serialize;

use crate::prepare::{PreparedFeature, WorkingGeometry};

/// Text placed at a feature's center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureLabel {
    pub feature_id: String,
    pub position: GeoPoint,
    pub text: String,
}

/// Label text for one feature: its formatted total.
///
/// `None` for excluded ids, locations without data and zero totals.
pub fn label_text(
    feature: &PreparedFeature,
    view: &DataView,
    labels_exclude: &[String],
    format: &dyn Fn(f64) -> String,
) -> Option<String> {
    if labels_exclude.iter().any(|id| *id == feature.feature_id) {
        return None;
    }
    let sums = view.label_sums(&feature.feature_id)?;
    let total = Statistics::sum(sums.values().copied());
    if total == 0.0 {
        return None;
    }
    Some(format(total))
}

/// Labels for every feature that has a center and a non-empty text.
pub fn feature_labels(
    working: &WorkingGeometry,
    view: &DataView,
    labels_exclude: &[String],
    format: &dyn Fn(f64) -> String,
) -> Vec<FeatureLabel> {
    working
        .features
        .iter()
        .filter_map(|f| {
            let position = f.center?;
            let text = label_text(f, view, labels_exclude, format)?;
            Some(FeatureLabel {
                feature_id: f.feature_id.clone(),
                position,
                text,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use compute::compute_data_view;
    use data::DataPoint;
    use formats::{Feature, FeatureCollection, GeoPoint, Geometry};
    use pretty_assertions::assert_eq;

    use super::feature_labels;
    use crate::accessors::{auto_id_accessor, auto_name_accessor};
    use crate::format::format_grouped;
    use crate::prepare::prepare;

    fn working() -> crate::prepare::WorkingGeometry {
        let features = ["A", "B", "C", "D"]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                Feature::new(Geometry::Point(GeoPoint::new(i as f64, 0.0))).with_id(*id)
            })
            .collect();
        prepare(
            &FeatureCollection::new(features),
            &[],
            &[],
            auto_id_accessor(),
            auto_name_accessor(),
        )
        .unwrap()
    }

    #[test]
    fn labels_skip_zero_missing_and_excluded() {
        let data = vec![
            DataPoint::new("A", "x", "g1", 1200.0),
            DataPoint::new("A", "y", "g1", 34.0),
            DataPoint::new("B", "x", "g1", 0.0),
            DataPoint::new("C", "x", "g1", 9.0),
        ];
        let view = compute_data_view(&data, None);
        let labels = feature_labels(&working(), &view, &["C".to_string()], &format_grouped);

        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].feature_id, "A");
        assert_eq!(labels[0].text, "1,234");
        assert_eq!(labels[0].position, GeoPoint::new(0.0, 0.0));
    }
}
