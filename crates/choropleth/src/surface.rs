use std::cell::RefCell;
use std::rc::Rc;

use formats::{GeoPoint, Geometry};
use foundation::Aabb2;
use serde::Serialize;

use crate::labels::FeatureLabel;
use crate::symbology::{Fill, LegendStop};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureFrame {
    pub feature_id: String,
    pub name: String,
    pub value: Option<f64>,
    pub fill: Fill,
    pub selected: bool,
    pub center: Option<GeoPoint>,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendFrame {
    pub title: String,
    pub stops: Vec<LegendStop>,
}

/// Radio-style group switcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendPanelFrame {
    pub groups: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionFrame {
    pub selected_ids: Vec<String>,
    /// Outline of the selected features; `None` clears any previous outline.
    pub border: Option<Geometry>,
}

/// Everything a surface needs to draw one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFrame {
    pub chart_id: String,
    pub width: f64,
    pub height: f64,
    pub selected_group: Option<String>,
    pub features: Vec<FeatureFrame>,
    pub exterior_border: Option<Geometry>,
    pub bounds: Option<Aabb2>,
    pub labels: Vec<FeatureLabel>,
    pub legend: Option<LegendFrame>,
    pub legend_panel: Option<LegendPanelFrame>,
    pub selection: SelectionFrame,
    pub tooltip: bool,
    pub color_scale: Option<String>,
    pub color_scheme: Option<String>,
}

/// Drawing backend a chart renders into.
///
/// Implementations must not call back into the chart while rendering.
pub trait RenderSurface {
    fn render(&mut self, frame: &MapFrame);

    /// Redraws only the selection overlay.
    fn render_selection(&mut self, selection: &SelectionFrame);
}

#[derive(Debug, Default)]
struct Recording {
    frames: Vec<MapFrame>,
    selections: Vec<SelectionFrame>,
}

/// Surface that keeps every frame it receives. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Rc<RefCell<Recording>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<MapFrame> {
        self.log.borrow().frames.clone()
    }

    pub fn last_frame(&self) -> Option<MapFrame> {
        self.log.borrow().frames.last().cloned()
    }

    pub fn frame_count(&self) -> usize {
        self.log.borrow().frames.len()
    }

    pub fn selections(&self) -> Vec<SelectionFrame> {
        self.log.borrow().selections.clone()
    }

    pub fn last_selection(&self) -> Option<SelectionFrame> {
        self.log.borrow().selections.last().cloned()
    }
}

impl RenderSurface for RecordingSurface {
    fn render(&mut self, frame: &MapFrame) {
        let mut log = self.log.borrow_mut();
        log.frames.push(frame.clone());
        log.selections.push(frame.selection.clone());
    }

    fn render_selection(&mut self, selection: &SelectionFrame) {
        self.log.borrow_mut().selections.push(selection.clone());
    }
}
