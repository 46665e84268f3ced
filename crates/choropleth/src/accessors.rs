use std::rc::Rc;

use formats::Feature;
use serde_json::Value;

/// Reads an identity or display name from a feature.
///
/// The result must be a JSON primitive (string, number or bool). `None` (or
/// `null`) means the feature does not carry the value.
pub type FeatureAccessor = Rc<dyn Fn(&Feature) -> Option<Value>>;

const ID_PROPERTIES: [&str; 5] = ["id", "ID", "code", "RS", "AGS"];
const NAME_PROPERTIES: [&str; 5] = ["name", "NAME", "GEN", "nom", "title"];

/// Feature `id` member, else the first present of `id`, `ID`, `code`, `RS`,
/// `AGS` properties.
pub fn auto_id_accessor() -> FeatureAccessor {
    Rc::new(|f: &Feature| {
        f.id.clone()
            .or_else(|| first_property(f, &ID_PROPERTIES))
    })
}

/// First present of `name`, `NAME`, `GEN`, `nom`, `title` properties.
pub fn auto_name_accessor() -> FeatureAccessor {
    Rc::new(|f: &Feature| first_property(f, &NAME_PROPERTIES))
}

/// Accessor reading a single property.
pub fn property_accessor(key: impl Into<String>) -> FeatureAccessor {
    let key = key.into();
    Rc::new(move |f: &Feature| f.property(&key).cloned())
}

fn first_property(f: &Feature, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .filter_map(|k| f.property(k))
        .find(|v| !v.is_null())
        .cloned()
}

/// Converts an accessor result into a key string.
///
/// `Ok(None)` for a missing value, `Err` for a non-primitive.
pub(crate) fn primitive_key(value: Option<Value>) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Array(_)) => Err("expected a primitive, got an array".to_string()),
        Some(Value::Object(_)) => Err("expected a primitive, got an object".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{auto_id_accessor, auto_name_accessor, primitive_key, property_accessor};
    use formats::{Feature, GeoPoint, Geometry};
    use serde_json::json;

    fn feature() -> Feature {
        Feature::new(Geometry::Point(GeoPoint::new(0.0, 0.0)))
    }

    #[test]
    fn auto_id_prefers_feature_id() {
        let f = feature().with_id(12).with_property("code", "X");
        assert_eq!(auto_id_accessor()(&f), Some(json!(12)));
        let f = feature().with_property("code", "X");
        assert_eq!(auto_id_accessor()(&f), Some(json!("X")));
        assert_eq!(auto_id_accessor()(&feature()), None);
    }

    #[test]
    fn auto_name_skips_null_properties() {
        let f = feature()
            .with_property("name", json!(null))
            .with_property("GEN", "Berlin");
        assert_eq!(auto_name_accessor()(&f), Some(json!("Berlin")));
    }

    #[test]
    fn property_accessor_reads_one_key() {
        let f = feature().with_property("iso", "DE");
        assert_eq!(property_accessor("iso")(&f), Some(json!("DE")));
        assert_eq!(property_accessor("missing")(&f), None);
    }

    #[test]
    fn primitive_keys() {
        assert_eq!(primitive_key(Some(json!("A"))), Ok(Some("A".to_string())));
        assert_eq!(primitive_key(Some(json!(7))), Ok(Some("7".to_string())));
        assert_eq!(primitive_key(Some(json!(null))), Ok(None));
        assert!(primitive_key(Some(json!({"a": 1}))).is_err());
        assert!(primitive_key(Some(json!([1]))).is_err());
    }
}
