use serde::Serialize;

/// How a feature (or legend swatch) is filled. Colors are the surface's job.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "intensity", rename_all = "snake_case")]
pub enum Fill {
    /// The location has no aggregate.
    NoData,
    /// The location's aggregate is exactly zero.
    Zero,
    /// Fraction of the maximum aggregate, in `[0, 1]`.
    Scaled(f64),
}

impl Fill {
    pub fn for_value(value: Option<f64>, max: Option<f64>) -> Fill {
        let Some(value) = value else {
            return Fill::NoData;
        };
        if value == 0.0 {
            return Fill::Zero;
        }
        match max {
            Some(max) if max > 0.0 => Fill::Scaled((value / max).clamp(0.0, 1.0)),
            _ => Fill::Zero,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendStop {
    pub label: String,
    pub fill: Fill,
}

/// Legend for the presented group: "No Data", "0", "> 0", then ¼, ½, ¾ and
/// the full maximum.
pub fn legend_stops(max: Option<f64>, format: &dyn Fn(f64) -> String) -> Vec<LegendStop> {
    let max = max.unwrap_or(0.0);
    let mut stops = vec![
        LegendStop {
            label: "No Data".to_string(),
            fill: Fill::NoData,
        },
        LegendStop {
            label: "0".to_string(),
            fill: Fill::Zero,
        },
        LegendStop {
            label: "> 0".to_string(),
            fill: Fill::Scaled(0.0),
        },
    ];
    for fraction in [0.25, 0.5, 0.75, 1.0] {
        stops.push(LegendStop {
            label: format(fraction * max),
            fill: Fill::Scaled(fraction),
        });
    }
    stops
}

#[cfg(test)]
mod tests {
    use super::{Fill, legend_stops};
    use crate::format::format_grouped;

    #[test]
    fn fill_distinguishes_zero_from_missing() {
        assert_eq!(Fill::for_value(None, Some(10.0)), Fill::NoData);
        assert_eq!(Fill::for_value(Some(0.0), Some(10.0)), Fill::Zero);
        assert_eq!(Fill::for_value(Some(5.0), Some(10.0)), Fill::Scaled(0.5));
        assert_eq!(Fill::for_value(Some(5.0), None), Fill::Zero);
    }

    #[test]
    fn legend_has_fixed_stops() {
        let stops = legend_stops(Some(1000.0), &format_grouped);
        let labels: Vec<&str> = stops.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["No Data", "0", "> 0", "250", "500", "750", "1,000"]);
        assert_eq!(stops[6].fill, Fill::Scaled(1.0));
    }

    #[test]
    fn legend_without_data_still_renders() {
        let stops = legend_stops(None, &format_grouped);
        assert_eq!(stops.len(), 7);
        assert_eq!(stops[3].label, "0");
    }
}
