use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

impl Serialize for GeoPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.lon_deg, self.lat_deg].serialize(serializer)
    }
}

pub type Ring = Vec<GeoPoint>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Every vertex, in document order.
    pub fn points(&self) -> Box<dyn Iterator<Item = GeoPoint> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(*p)),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => Box::new(ps.iter().copied()),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                Box::new(lines.iter().flatten().copied())
            }
            Geometry::MultiPolygon(polys) => Box::new(polys.iter().flatten().flatten().copied()),
        }
    }

    pub fn is_areal(&self) -> bool {
        matches!(self, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
    }

    pub fn to_geojson_value(&self) -> Value {
        let coordinates = match self {
            Geometry::Point(p) => json!(p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => json!(ps),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => json!(lines),
            Geometry::MultiPolygon(polys) => json!(polys),
        };
        json!({ "type": self.type_name(), "coordinates": coordinates })
    }
}

impl Serialize for Geometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_geojson_value().serialize(serializer)
    }
}

/// One GeoJSON feature. `id` keeps the raw member (string or number).
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<Value>,
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            properties: Map::new(),
            geometry: Some(geometry),
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn to_geojson_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("Feature"));
        if let Some(id) = &self.id {
            obj.insert("id".to_string(), id.clone());
        }
        obj.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        obj.insert(
            "geometry".to_string(),
            self.geometry
                .as_ref()
                .map_or(Value::Null, Geometry::to_geojson_value),
        );
        Value::Object(obj)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, thiserror::Error)]
pub enum GeoJsonError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value.as_object().ok_or(GeoJsonError::NotAFeatureCollection)?;
        if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(GeoJsonError::NotAFeatureCollection);
        }
        let raw_features = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        let features = raw_features
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                parse_feature(raw).map_err(|reason| GeoJsonError::InvalidFeature { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { features })
    }

    /// Emits a GeoJSON FeatureCollection. Property order may differ from the input.
    pub fn to_geojson_value(&self) -> Value {
        let features: Vec<Value> = self.features.iter().map(Feature::to_geojson_value).collect();
        json!({ "type": "FeatureCollection", "features": features })
    }

    pub fn to_geojson_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_geojson_value())
    }
}

fn parse_feature(value: &Value) -> Result<Feature, String> {
    let obj = value.as_object().ok_or("feature must be an object")?;
    match obj.get("type").and_then(Value::as_str) {
        Some("Feature") => {}
        Some(other) => return Err(format!("unexpected feature type: {other}")),
        None => return Err("feature missing type".to_string()),
    }

    let id = match obj.get("id") {
        Some(v @ (Value::String(_) | Value::Number(_))) => Some(v.clone()),
        _ => None,
    };
    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    // GeoJSON allows unlocated features (`"geometry": null`).
    let geometry = match obj.get("geometry") {
        None => return Err("feature missing geometry".to_string()),
        Some(Value::Null) => None,
        Some(g) => Some(parse_geometry(g)?),
    };

    Ok(Feature {
        id,
        properties,
        geometry,
    })
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value.as_object().ok_or("geometry must be an object")?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type")?;
    let coords = obj.get("coordinates").ok_or("geometry missing coordinates")?;

    Ok(match ty {
        "Point" => Geometry::Point(parse_point(coords)?),
        "MultiPoint" => Geometry::MultiPoint(parse_list(coords, parse_point)?),
        "LineString" => Geometry::LineString(parse_list(coords, parse_point)?),
        "MultiLineString" => Geometry::MultiLineString(parse_list(coords, parse_ring)?),
        "Polygon" => Geometry::Polygon(parse_list(coords, parse_ring)?),
        "MultiPolygon" => {
            Geometry::MultiPolygon(parse_list(coords, |p| parse_list(p, parse_ring))?)
        }
        other => return Err(format!("unsupported geometry type: {other}")),
    })
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    match coords.as_array().map(Vec::as_slice) {
        Some([lon, lat, ..]) => {
            let lon = lon.as_f64().ok_or("longitude must be a number")?;
            let lat = lat.as_f64().ok_or("latitude must be a number")?;
            Ok(GeoPoint::new(lon, lat))
        }
        _ => Err("position must be an array of [lon, lat]".to_string()),
    }
}

fn parse_ring(coords: &Value) -> Result<Ring, String> {
    parse_list(coords, parse_point)
}

fn parse_list<T>(
    coords: &Value,
    item: impl Fn(&Value) -> Result<T, String>,
) -> Result<Vec<T>, String> {
    coords
        .as_array()
        .ok_or("coordinates must be an array")?
        .iter()
        .map(item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Feature, FeatureCollection, GeoJsonError, GeoPoint, Geometry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn square(x: f64, y: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            GeoPoint::new(x, y),
            GeoPoint::new(x + 1.0, y),
            GeoPoint::new(x + 1.0, y + 1.0),
            GeoPoint::new(x, y + 1.0),
            GeoPoint::new(x, y),
        ]])
    }

    #[test]
    fn parses_mixed_collection() {
        let payload = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "id": 7, "properties": { "name": "Seven" },
                  "geometry": { "type": "Point", "coordinates": [1.0, 2.0] } },
                { "type": "Feature", "properties": null, "geometry": null },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "MultiPolygon",
                                "coordinates": [[[[0,0],[1,0],[1,1],[0,0]]]] } }
            ]
        });
        let fc = FeatureCollection::from_geojson_value(&payload).unwrap();
        assert_eq!(fc.len(), 3);
        assert_eq!(fc.features[0].id, Some(json!(7)));
        assert_eq!(fc.features[0].property("name"), Some(&json!("Seven")));
        assert_eq!(fc.features[1].geometry, None);
        assert!(fc.features[2].geometry.as_ref().unwrap().is_areal());
    }

    #[test]
    fn rejects_non_collections_and_bad_features() {
        let err = FeatureCollection::from_geojson_str(r#"{"type":"Feature"}"#).unwrap_err();
        assert!(matches!(err, GeoJsonError::NotAFeatureCollection));

        let payload = json!({
            "type": "FeatureCollection",
            "features": [{ "type": "Feature", "geometry": { "type": "Circle", "coordinates": [] } }]
        });
        let err = FeatureCollection::from_geojson_value(&payload).unwrap_err();
        assert!(matches!(err, GeoJsonError::InvalidFeature { index: 0, .. }));

        assert!(matches!(
            FeatureCollection::from_geojson_str("{"),
            Err(GeoJsonError::Json(_))
        ));
    }

    #[test]
    fn export_parses_back_to_the_same_collection() {
        let fc = FeatureCollection::new(vec![
            Feature::new(square(0.0, 0.0))
                .with_id("A")
                .with_property("name", "Alpha"),
        ]);
        let back = FeatureCollection::from_geojson_value(&fc.to_geojson_value()).unwrap();
        assert_eq!(back, fc);
    }

    #[test]
    fn points_walks_every_vertex() {
        assert_eq!(square(0.0, 0.0).points().count(), 5);
    }
}
