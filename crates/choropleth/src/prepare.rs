use std::collections::HashSet;
use std::rc::Rc;

use formats::{Feature, FeatureCollection, GeoPoint, Geometry};
use foundation::Aabb2;
use tracing::debug;

use crate::accessors::{FeatureAccessor, primitive_key};
use crate::error::DataShapeError;
use crate::geometry::{GeoKernel, GeometryLibrary};

/// A feature annotated for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFeature {
    pub feature: Feature,
    /// Stable identity, matched against exclude/include lists and data locations.
    pub feature_id: String,
    pub name: String,
    pub center: Option<GeoPoint>,
    pub bounds: Option<Aabb2>,
}

impl PreparedFeature {
    pub fn geometry(&self) -> Option<&Geometry> {
        self.feature.geometry.as_ref()
    }
}

/// The filtered, annotated working copy of a feature collection.
///
/// Never aliases the collection it was prepared from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingGeometry {
    pub features: Vec<PreparedFeature>,
    /// Union of all feature outlines. `None` when no areal feature remains.
    pub border: Option<Geometry>,
    pub bounds: Option<Aabb2>,
}

impl WorkingGeometry {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.features.iter().map(|f| f.feature_id.as_str())
    }

    pub fn get(&self, feature_id: &str) -> Option<&PreparedFeature> {
        self.features.iter().find(|f| f.feature_id == feature_id)
    }

    pub fn contains(&self, feature_id: &str) -> bool {
        self.get(feature_id).is_some()
    }

    /// Features whose id is in `ids`, in collection order.
    pub fn select<'a>(&'a self, ids: &[String]) -> Vec<&'a PreparedFeature> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.features
            .iter()
            .filter(|f| wanted.contains(f.feature_id.as_str()))
            .collect()
    }
}

/// Turns raw feature collections into [`WorkingGeometry`].
#[derive(Clone)]
pub struct GeometryPreprocessor {
    pub id_accessor: FeatureAccessor,
    pub name_accessor: FeatureAccessor,
    pub library: Rc<dyn GeometryLibrary>,
}

impl GeometryPreprocessor {
    pub fn new(id_accessor: FeatureAccessor, name_accessor: FeatureAccessor) -> Self {
        Self {
            id_accessor,
            name_accessor,
            library: Rc::new(GeoKernel),
        }
    }

    pub fn with_library(mut self, library: Rc<dyn GeometryLibrary>) -> Self {
        self.library = library;
        self
    }

    /// Prepares `raw`, removing `exclude`d ids first and then keeping only
    /// `include`d ids. Empty lists skip their step, so an id listed in both
    /// ends up absent.
    pub fn prepare(
        &self,
        raw: &FeatureCollection,
        exclude: &[String],
        include: &[String],
    ) -> Result<WorkingGeometry, DataShapeError> {
        let mut identified = Vec::with_capacity(raw.len());
        for (index, feature) in raw.features.iter().enumerate() {
            let feature_id = primitive_key((self.id_accessor)(feature))
                .and_then(|id| id.ok_or_else(|| "no identity".to_string()))
                .map_err(|reason| DataShapeError {
                    index,
                    accessor: "id",
                    reason,
                })?;
            let name = primitive_key((self.name_accessor)(feature))
                .map_err(|reason| DataShapeError {
                    index,
                    accessor: "name",
                    reason,
                })?
                .unwrap_or_else(|| feature_id.clone());
            identified.push((feature, feature_id, name));
        }

        if !exclude.is_empty() {
            let excluded: HashSet<&str> = exclude.iter().map(String::as_str).collect();
            identified.retain(|(_, id, _)| !excluded.contains(id.as_str()));
        }
        if !include.is_empty() {
            let included: HashSet<&str> = include.iter().map(String::as_str).collect();
            identified.retain(|(_, id, _)| included.contains(id.as_str()));
        }

        let features: Vec<PreparedFeature> = identified
            .into_iter()
            .map(|(feature, feature_id, name)| {
                let geometry = feature.geometry.as_ref();
                PreparedFeature {
                    center: geometry.and_then(|g| self.library.centroid(g)),
                    bounds: geometry.and_then(|g| self.library.bounds(g)),
                    feature: feature.clone(),
                    feature_id,
                    name,
                }
            })
            .collect();

        if features.is_empty() {
            debug!(
                total = raw.len(),
                excluded = exclude.len(),
                included = include.len(),
                "no features remain after exclude/include"
            );
            return Ok(WorkingGeometry::default());
        }

        let border = self.merge(features.iter());
        if border.is_none() {
            debug!("no borders to render");
        }
        let bounds = features
            .iter()
            .filter_map(|f| f.bounds)
            .reduce(|a, b| a.union(&b));

        Ok(WorkingGeometry {
            features,
            border,
            bounds,
        })
    }

    /// Outline of the given features, through the geometry library.
    pub fn merge<'a>(
        &self,
        features: impl IntoIterator<Item = &'a PreparedFeature>,
    ) -> Option<Geometry> {
        let geometries: Vec<&Geometry> = features
            .into_iter()
            .filter_map(PreparedFeature::geometry)
            .collect();
        if geometries.is_empty() {
            return None;
        }
        self.library.merge(&geometries)
    }
}

/// [`GeometryPreprocessor::prepare`] with the default geometry library.
pub fn prepare(
    raw: &FeatureCollection,
    exclude: &[String],
    include: &[String],
    id_accessor: FeatureAccessor,
    name_accessor: FeatureAccessor,
) -> Result<WorkingGeometry, DataShapeError> {
    GeometryPreprocessor::new(id_accessor, name_accessor).prepare(raw, exclude, include)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::rc::Rc;

    use formats::{Feature, FeatureCollection, GeoPoint, Geometry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{GeometryPreprocessor, prepare};
    use crate::accessors::{auto_id_accessor, auto_name_accessor, property_accessor};

    fn square(x: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            GeoPoint::new(x, 0.0),
            GeoPoint::new(x + 1.0, 0.0),
            GeoPoint::new(x + 1.0, 1.0),
            GeoPoint::new(x, 1.0),
            GeoPoint::new(x, 0.0),
        ]])
    }

    fn abc() -> FeatureCollection {
        FeatureCollection::new(
            ["A", "B", "C"]
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    Feature::new(square(i as f64))
                        .with_id(*id)
                        .with_property("name", format!("Area {id}"))
                })
                .collect(),
        )
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn run(exclude: &[&str], include: &[&str]) -> BTreeSet<String> {
        prepare(
            &abc(),
            &strings(exclude),
            &strings(include),
            auto_id_accessor(),
            auto_name_accessor(),
        )
        .unwrap()
        .ids()
        .map(String::from)
        .collect()
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exclude_then_include() {
        assert_eq!(run(&["A"], &["A", "B"]), set(&["B"]));
        assert_eq!(run(&["A"], &[]), set(&["B", "C"]));
        assert_eq!(run(&[], &["C"]), set(&["C"]));
        assert_eq!(run(&[], &[]), set(&["A", "B", "C"]));
        assert_eq!(run(&["Z"], &["Y"]), set(&[]));
    }

    #[test]
    fn annotates_ids_names_and_centers() {
        let wg = prepare(&abc(), &[], &[], auto_id_accessor(), auto_name_accessor()).unwrap();
        let b = wg.get("B").unwrap();
        assert_eq!(b.name, "Area B");
        let c = b.center.unwrap();
        assert!((c.lon_deg - 1.5).abs() < 1e-9);
        assert!((c.lat_deg - 0.5).abs() < 1e-9);
        assert!(wg.border.is_some());
        let bounds = wg.bounds.unwrap();
        assert_eq!(bounds.min, [0.0, 0.0]);
        assert_eq!(bounds.max, [3.0, 1.0]);
    }

    #[test]
    fn input_is_left_untouched_and_output_is_stable() {
        let raw = abc();
        let before = raw.clone();
        let p = GeometryPreprocessor::new(auto_id_accessor(), auto_name_accessor());
        let first = p.prepare(&raw, &strings(&["A"]), &[]).unwrap();
        let second = p.prepare(&raw, &strings(&["A"]), &[]).unwrap();
        assert_eq!(raw, before);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_result_has_no_border() {
        let wg = prepare(
            &abc(),
            &strings(&["A", "B", "C"]),
            &[],
            auto_id_accessor(),
            auto_name_accessor(),
        )
        .unwrap();
        assert!(wg.is_empty());
        assert_eq!(wg.border, None);
        assert_eq!(wg.bounds, None);
    }

    #[test]
    fn missing_or_non_primitive_ids_fail() {
        let mut raw = abc();
        raw.features[1].id = None;
        let err = prepare(&raw, &[], &[], auto_id_accessor(), auto_name_accessor()).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.accessor, "id");

        let raw = FeatureCollection::new(vec![
            Feature::new(square(0.0)).with_property("key", json!({"nested": true})),
        ]);
        let err = prepare(&raw, &[], &[], property_accessor("key"), auto_name_accessor())
            .unwrap_err();
        assert_eq!(err.index, 0);
    }

    #[test]
    fn non_primitive_names_fail_and_missing_names_fall_back_to_id() {
        let raw = FeatureCollection::new(vec![Feature::new(square(0.0)).with_id("A")]);
        let wg = prepare(&raw, &[], &[], auto_id_accessor(), auto_name_accessor()).unwrap();
        assert_eq!(wg.features[0].name, "A");

        let bad_name = Rc::new(|_: &Feature| Some(json!(["x"])));
        let err = prepare(&raw, &[], &[], auto_id_accessor(), bad_name).unwrap_err();
        assert_eq!(err.accessor, "name");
    }

    #[test]
    fn numeric_ids_become_strings() {
        let raw = FeatureCollection::new(vec![Feature::new(square(0.0)).with_id(42)]);
        let wg = prepare(&raw, &strings(&["7"]), &[], auto_id_accessor(), auto_name_accessor())
            .unwrap();
        assert!(wg.contains("42"));
    }

    #[test]
    fn select_keeps_collection_order() {
        let wg = prepare(&abc(), &[], &[], auto_id_accessor(), auto_name_accessor()).unwrap();
        let picked: Vec<&str> = wg
            .select(&strings(&["C", "A"]))
            .iter()
            .map(|f| f.feature_id.as_str())
            .collect();
        assert_eq!(picked, vec!["A", "C"]);
    }
}
