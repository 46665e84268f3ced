use std::collections::BTreeMap;

use compute::DataView;
use serde::Serialize;

use crate::prepare::PreparedFeature;

/// Number of features listed by name before the rest is summarized as "(+n)".
pub const TOOLTIP_MAX_LISTED: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipRow {
    pub label: String,
    pub value: String,
}

/// Hover detail for one feature or the current selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipSummary {
    /// `IDs: A, B, C (+2)`
    pub ids: String,
    /// `Names: Alpha, Beta, Gamma (+2)`
    pub names: String,
    /// Per-label totals. Labels whose total is zero are left out.
    pub rows: Vec<TooltipRow>,
    /// Formatted total, `None` when no feature has data ("No Data").
    pub sum: Option<String>,
}

impl TooltipSummary {
    pub fn has_data(&self) -> bool {
        self.sum.is_some()
    }

    /// Plain-text rendering, one line per entry.
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![self.ids.clone(), self.names.clone()];
        match &self.sum {
            None => out.push("No Data".to_string()),
            Some(sum) => {
                out.extend(self.rows.iter().map(|r| format!("{}: {}", r.label, r.value)));
                out.push(format!("Sum: {sum}"));
            }
        }
        out
    }
}

pub fn summarize(
    features: &[&PreparedFeature],
    view: &DataView,
    format: &dyn Fn(f64) -> String,
) -> TooltipSummary {
    let ids = listed(features.iter().map(|f| f.feature_id.as_str()));
    let names = listed(features.iter().map(|f| f.name.as_str()));

    let mut combined: BTreeMap<&str, f64> = BTreeMap::new();
    for f in features {
        let Some(sums) = view.label_sums(&f.feature_id) else {
            continue;
        };
        for (label, value) in sums {
            *combined.entry(label.as_str()).or_insert(0.0) += value;
        }
    }

    if combined.is_empty() {
        return TooltipSummary {
            ids: format!("IDs: {ids}"),
            names: format!("Names: {names}"),
            rows: Vec::new(),
            sum: None,
        };
    }

    let mut total = 0.0;
    let mut rows = Vec::with_capacity(combined.len());
    for (label, value) in combined {
        if value == 0.0 {
            continue;
        }
        total += value;
        rows.push(TooltipRow {
            label: label.to_string(),
            value: format(value),
        });
    }

    TooltipSummary {
        ids: format!("IDs: {ids}"),
        names: format!("Names: {names}"),
        rows,
        sum: Some(format(total)),
    }
}

fn listed<'a>(items: impl ExactSizeIterator<Item = &'a str>) -> String {
    let count = items.len();
    let shown: Vec<&str> = items.take(TOOLTIP_MAX_LISTED).collect();
    let joined = shown.join(", ");
    if count > TOOLTIP_MAX_LISTED {
        format!("{joined} (+{})", count - TOOLTIP_MAX_LISTED)
    } else {
        joined
    }
}
