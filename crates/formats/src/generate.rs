use serde_json::Value;
use tracing::debug;

use crate::geojson::{Feature, FeatureCollection, GeoPoint, Geometry};

/// Side length of a generated cell, in degrees.
pub const GENERATED_CELL_DEG: f64 = 1.0;

/// Builds a placeholder collection for data without geometry.
///
/// Every location becomes one square cell, laid out row by row in a grid that
/// is as close to square as possible. The feature id, `id` and `name`
/// properties are the location string.
pub fn generate_for_locations(locations: &[String]) -> FeatureCollection {
    let columns = (locations.len() as f64).sqrt().ceil().max(1.0) as usize;
    debug!(count = locations.len(), columns, "generating placeholder geometry");

    let features = locations
        .iter()
        .enumerate()
        .map(|(i, location)| {
            let x = (i % columns) as f64 * GENERATED_CELL_DEG;
            let y = -((i / columns) as f64) * GENERATED_CELL_DEG;
            Feature::new(cell(x, y))
                .with_id(Value::String(location.clone()))
                .with_property("id", location.as_str())
                .with_property("name", location.as_str())
        })
        .collect();

    FeatureCollection::new(features)
}

fn cell(x: f64, y: f64) -> Geometry {
    let d = GENERATED_CELL_DEG;
    Geometry::Polygon(vec![vec![
        GeoPoint::new(x, y),
        GeoPoint::new(x + d, y),
        GeoPoint::new(x + d, y - d),
        GeoPoint::new(x, y - d),
        GeoPoint::new(x, y),
    ]])
}

#[cfg(test)]
mod tests {
    use super::generate_for_locations;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn one_cell_per_location() {
        let locations: Vec<String> = ["A", "B", "C", "D", "E"].map(String::from).to_vec();
        let fc = generate_for_locations(&locations);
        assert_eq!(fc.len(), 5);
        assert_eq!(fc.features[4].id, Some(json!("E")));
        assert_eq!(fc.features[4].property("name"), Some(&json!("E")));
        assert!(fc.features.iter().all(|f| f.geometry.as_ref().unwrap().is_areal()));
    }

    #[test]
    fn empty_locations_give_empty_collection() {
        assert!(generate_for_locations(&[]).is_empty());
    }
}
