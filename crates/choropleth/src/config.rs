use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::accessors::{FeatureAccessor, auto_id_accessor, auto_name_accessor};
use crate::error::ConfigurationError;
use crate::format::{NumberFormat, default_number_format};

/// Plain, serializable chart options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Chart id; a unique `map-<n>` id is generated when absent.
    pub id: Option<String>,
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    /// Disabled charts ignore feature clicks.
    pub enabled: bool,
    pub labels: bool,
    /// Feature ids that never get a label.
    pub labels_exclude: Vec<String>,
    pub legend: bool,
    pub legend_panel: bool,
    pub tooltip: bool,
    /// Feature ids removed from the geometry.
    pub exclude: Vec<String>,
    /// When non-empty, the only feature ids kept (applied after `exclude`).
    pub include: Vec<String>,
    // Passed through to the rendering surface untouched.
    pub color_scale: Option<String>,
    pub color_scheme: Option<String>,
    pub radius: f64,
    /// Initially presented group.
    pub group: Option<String>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            id: None,
            width: 1000.0,
            height: 1000.0,
            margin_left: 0.0,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            enabled: true,
            labels: false,
            labels_exclude: Vec::new(),
            legend: true,
            legend_panel: true,
            tooltip: true,
            exclude: Vec::new(),
            include: Vec::new(),
            color_scale: None,
            color_scheme: None,
            radius: 5.0,
            group: None,
        }
    }
}

impl MapOptions {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(payload).map_err(|e| ConfigurationError::Json(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        positive("width", self.width)?;
        positive("height", self.height)?;
        for (option, value) in [
            ("margin_left", self.margin_left),
            ("margin_top", self.margin_top),
            ("margin_right", self.margin_right),
            ("margin_bottom", self.margin_bottom),
            ("radius", self.radius),
        ] {
            non_negative(option, value)?;
        }
        if self.margin_left + self.margin_right >= self.width {
            return Err(invalid("margin_left", "horizontal margins exceed the width"));
        }
        if self.margin_top + self.margin_bottom >= self.height {
            return Err(invalid("margin_top", "vertical margins exceed the height"));
        }
        for (option, ids) in [
            ("exclude", &self.exclude),
            ("include", &self.include),
            ("labels_exclude", &self.labels_exclude),
        ] {
            if ids.iter().any(String::is_empty) {
                return Err(invalid(option, "feature ids must not be empty"));
            }
        }
        if self.id.as_deref() == Some("") {
            return Err(invalid("id", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(option: &'static str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidOption {
        option,
        reason: reason.to_string(),
    }
}

fn positive(option: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(option, "must be a positive number"))
    }
}

fn non_negative(option: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(option, "must be a non-negative number"))
    }
}

/// Immutable chart configuration: options plus the function-valued fields.
///
/// Built once and shared; changing any setting means building a new config.
#[derive(Clone)]
pub struct MapConfig {
    pub options: MapOptions,
    pub id_accessor: FeatureAccessor,
    pub name_accessor: FeatureAccessor,
    pub number_format: NumberFormat,
}

impl MapConfig {
    /// Validates `options` and pairs them with the default accessors.
    pub fn new(options: MapOptions) -> Result<Self, ConfigurationError> {
        options.validate()?;
        Ok(Self {
            options,
            id_accessor: auto_id_accessor(),
            name_accessor: auto_name_accessor(),
            number_format: default_number_format(),
        })
    }

    pub fn with_id_accessor(mut self, accessor: FeatureAccessor) -> Self {
        self.id_accessor = accessor;
        self
    }

    pub fn with_name_accessor(mut self, accessor: FeatureAccessor) -> Self {
        self.name_accessor = accessor;
        self
    }

    pub fn with_number_format(mut self, format: impl Fn(f64) -> String + 'static) -> Self {
        self.number_format = Rc::new(format);
        self
    }

    pub fn format(&self, value: f64) -> String {
        (self.number_format)(value)
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            options: MapOptions::default(),
            id_accessor: auto_id_accessor(),
            name_accessor: auto_name_accessor(),
            number_format: default_number_format(),
        }
    }
}

impl std::fmt::Debug for MapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapConfig")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{MapConfig, MapOptions};
    use crate::error::ConfigurationError;
    use pretty_assertions::assert_eq;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let opts = MapOptions::from_json_str(r#"{"width": 640, "exclude": ["A"], "labels": true}"#)
            .unwrap();
        assert_eq!(opts.width, 640.0);
        assert_eq!(opts.height, 1000.0);
        assert_eq!(opts.exclude, vec!["A"]);
        assert!(opts.labels);
        assert!(opts.legend);
    }

    #[test]
    fn rejects_bad_geometry_options() {
        let opts = MapOptions {
            width: 0.0,
            ..MapOptions::default()
        };
        assert!(matches!(
            MapConfig::new(opts),
            Err(ConfigurationError::InvalidOption { option: "width", .. })
        ));

        let opts = MapOptions {
            margin_left: 600.0,
            margin_right: 600.0,
            ..MapOptions::default()
        };
        assert!(opts.validate().is_err());

        let opts = MapOptions {
            include: vec![String::new()],
            ..MapOptions::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(ConfigurationError::InvalidOption { option: "include", .. })
        ));
    }

    #[test]
    fn custom_number_format_is_used() {
        let config = MapConfig::new(MapOptions::default())
            .unwrap()
            .with_number_format(|v| format!("{v:.1} t"));
        assert_eq!(config.format(2.0), "2.0 t");
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        assert!(matches!(
            MapOptions::from_json_str("{\"width\": \"wide\"}"),
            Err(ConfigurationError::Json(_))
        ));
    }
}
