//! Choropleth chart instance and selection coordination.
//!
//! Every chart subscribes to the bus under its own namespace when it is
//! created and unsubscribes when it is dropped. Charts sharing one
//! [`DataController`] stay in sync through three events:
//!
//! - `map-selection-will-change` / `map-selection-did-change` when a chart
//!   switches the presented group (payload: the new group),
//! - `locations-filter-did-change` when a feature is (de)selected,
//! - `data-did-change` when the controller's dataset is replaced.
//!
//! A chart receiving an event it sent itself does nothing: it already applied
//! the change before publishing.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use compute::{DataView, compute_data_view};
use data::{DATA_DID_CHANGE, DataController, Dimension};
use formats::{FeatureCollection, generate_for_locations};
use foundation::ids::{OriginToken, unique_id};
use runtime::{Event, EventBus, HandlerError, Payload};
use tracing::{debug, warn};

use crate::config::MapConfig;
use crate::error::{ConfigurationError, MapError};
use crate::format::cut;
use crate::geometry::GeometryLibrary;
use crate::labels::feature_labels;
use crate::prepare::{GeometryPreprocessor, PreparedFeature, WorkingGeometry};
use crate::surface::{
    FeatureFrame, LegendFrame, LegendPanelFrame, MapFrame, RenderSurface, SelectionFrame,
};
use crate::symbology::{Fill, legend_stops};
use crate::tooltip::{TooltipSummary, summarize};

pub const MAP_SELECTION_WILL_CHANGE: &str = "map-selection-will-change";
pub const MAP_SELECTION_DID_CHANGE: &str = "map-selection-did-change";

/// Longest legend title, in characters.
const LEGEND_TITLE_MAX: usize = 20;

struct MapState {
    config: Rc<MapConfig>,
    preprocessor: GeometryPreprocessor,
    controller: Option<Rc<DataController>>,
    geojson: Option<Rc<FeatureCollection>>,
    working: Option<Rc<WorkingGeometry>>,
    selected_group: Option<String>,
}

struct ChartInner {
    id: String,
    token: OriginToken,
    namespace: String,
    bus: EventBus,
    state: RefCell<MapState>,
    surface: RefCell<Box<dyn RenderSurface>>,
}

/// One map widget.
///
/// Not `Clone`: the chart owns its bus subscriptions and drops them with
/// itself.
pub struct MapChart {
    inner: Rc<ChartInner>,
}

impl MapChart {
    /// Creates a chart on the process-wide bus.
    pub fn new(
        config: MapConfig,
        surface: impl RenderSurface + 'static,
    ) -> Result<Self, ConfigurationError> {
        Self::with_bus(config, EventBus::global(), surface)
    }

    /// Creates a chart on `bus`. Fails if `config.options` do not validate.
    pub fn with_bus(
        config: MapConfig,
        bus: EventBus,
        surface: impl RenderSurface + 'static,
    ) -> Result<Self, ConfigurationError> {
        config.options.validate()?;
        let id = config
            .options
            .id
            .clone()
            .unwrap_or_else(|| unique_id("map"));
        let token = OriginToken::new(id.clone());
        let namespace = token.to_string();
        let preprocessor = GeometryPreprocessor::new(
            Rc::clone(&config.id_accessor),
            Rc::clone(&config.name_accessor),
        );
        let state = MapState {
            selected_group: config.options.group.clone(),
            config: Rc::new(config),
            preprocessor,
            controller: None,
            geojson: None,
            working: None,
        };
        let inner = Rc::new(ChartInner {
            id,
            token,
            namespace,
            bus,
            state: RefCell::new(state),
            surface: RefCell::new(Box::new(surface)),
        });
        subscribe(&inner);
        debug!(chart = %inner.id, namespace = %inner.namespace, "map chart created");
        Ok(Self { inner })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn token(&self) -> &OriginToken {
        &self.inner.token
    }

    /// Namespace of this chart's bus subscriptions.
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn config(&self) -> Rc<MapConfig> {
        Rc::clone(&self.inner.state.borrow().config)
    }

    /// Replaces the configuration and rebuilds the working geometry.
    ///
    /// On error the previous configuration and geometry stay in place.
    pub fn reconfigure(&self, config: MapConfig) -> Result<(), MapError> {
        config.options.validate()?;
        let (preprocessor, source) = {
            let state = self.inner.state.borrow();
            let preprocessor = GeometryPreprocessor::new(
                Rc::clone(&config.id_accessor),
                Rc::clone(&config.name_accessor),
            )
            .with_library(Rc::clone(&state.preprocessor.library));
            (preprocessor, state.geojson.clone())
        };
        self.inner.replace_geometry(Rc::new(config), preprocessor, source)
    }

    /// Swaps the geometry library used for centroids and outlines.
    pub fn set_geometry_library(&self, library: Rc<dyn GeometryLibrary>) -> Result<(), MapError> {
        let (config, preprocessor, source) = {
            let state = self.inner.state.borrow();
            (
                Rc::clone(&state.config),
                state.preprocessor.clone().with_library(library),
                state.geojson.clone(),
            )
        };
        self.inner.replace_geometry(config, preprocessor, source)
    }

    pub fn set_data_controller(&self, controller: Rc<DataController>) {
        if !controller.bus().same_bus(&self.inner.bus) {
            warn!(chart = %self.inner.id, "data controller publishes on a different bus");
        }
        self.inner.state.borrow_mut().controller = Some(controller);
    }

    pub fn data_controller(&self) -> Option<Rc<DataController>> {
        self.inner.state.borrow().controller.clone()
    }

    /// Sets the source geometry and prepares its working copy.
    ///
    /// Attaches an empty data controller if none is set yet.
    pub fn set_geojson(&self, geojson: FeatureCollection) -> Result<(), MapError> {
        self.inner.set_geojson(geojson)
    }

    pub fn geojson(&self) -> Option<Rc<FeatureCollection>> {
        self.inner.state.borrow().geojson.clone()
    }

    pub fn working_geometry(&self) -> Option<Rc<WorkingGeometry>> {
        self.inner.state.borrow().working.clone()
    }

    pub fn selected_group(&self) -> Option<String> {
        self.inner.state.borrow().selected_group.clone()
    }

    pub fn data_view(&self) -> Result<DataView, MapError> {
        self.inner.data_view()
    }

    /// Computes the data view and renders a full frame.
    pub fn run(&self) -> Result<(), MapError> {
        self.inner.run()
    }

    /// Feature click: toggles the feature's location filter.
    ///
    /// Returns `false` if the chart is disabled or the feature is unknown.
    pub fn click_feature(&self, feature_id: &str) -> Result<bool, MapError> {
        if !self.config().options.enabled {
            return Ok(false);
        }
        let known = self
            .working_geometry()
            .is_some_and(|w| w.contains(feature_id));
        if !known {
            debug!(chart = %self.inner.id, feature_id, "click on unknown feature ignored");
            return Ok(false);
        }
        let controller = self.inner.controller()?;
        controller.toggle_filter(Dimension::Locations, feature_id, &self.inner.token)?;
        self.inner.render_selection()?;
        Ok(true)
    }

    /// Pointer leaving a feature. With the primary button held this is a
    /// drag across features and counts as a click.
    pub fn pointer_out(&self, feature_id: &str, primary_pressed: bool) -> Result<bool, MapError> {
        if !primary_pressed {
            return Ok(false);
        }
        self.click_feature(feature_id)
    }

    /// Background click: clears the location selection.
    pub fn click_background(&self) -> Result<(), MapError> {
        let controller = self.inner.controller()?;
        controller.clear(Dimension::Locations, &self.inner.token)?;
        self.inner.render_selection()
    }

    /// Switches the presented group, announcing it to sibling charts.
    ///
    /// Returns `false` if `group` is already presented.
    pub fn select_group(&self, group: &str) -> Result<bool, MapError> {
        if self.selected_group().as_deref() == Some(group) {
            return Ok(false);
        }
        let token = &self.inner.token;
        self.inner.bus.publish(
            MAP_SELECTION_WILL_CHANGE,
            token,
            Payload::Group(group.to_string()),
        )?;
        self.inner.state.borrow_mut().selected_group = Some(group.to_string());
        self.inner.bus.publish(
            MAP_SELECTION_DID_CHANGE,
            token,
            Payload::Group(group.to_string()),
        )?;
        self.inner.run()?;
        Ok(true)
    }

    /// Tooltip content for hovering `feature_id`.
    ///
    /// Hovering a selected feature summarizes the whole selection. `None` when
    /// tooltips are disabled or the feature is unknown.
    pub fn hover_feature(&self, feature_id: &str) -> Result<Option<TooltipSummary>, MapError> {
        let config = self.config();
        if !config.options.tooltip {
            return Ok(None);
        }
        let Some(working) = self.working_geometry() else {
            return Ok(None);
        };
        let Some(feature) = working.get(feature_id) else {
            return Ok(None);
        };
        let view = self.inner.data_view()?;
        let controller = self.inner.controller()?;

        let format = |v: f64| config.format(v);
        let summary = if controller.is_filter(Dimension::Locations, feature_id) {
            let selected = working.select(&controller.filters(Dimension::Locations));
            summarize(&selected, &view, &format)
        } else {
            summarize(&[feature], &view, &format)
        };
        Ok(Some(summary))
    }

    /// Working features whose location is currently selected.
    pub fn selected_features(&self) -> Vec<PreparedFeature> {
        let (Some(working), Some(controller)) = (self.working_geometry(), self.data_controller())
        else {
            return Vec::new();
        };
        working
            .select(&controller.filters(Dimension::Locations))
            .into_iter()
            .cloned()
            .collect()
    }

    /// Removes this chart's subscriptions. Dropping the chart does the same.
    pub fn destroy(self) {}
}

impl Drop for MapChart {
    fn drop(&mut self) {
        let removed = self.inner.bus.unsubscribe(&self.inner.namespace);
        debug!(chart = %self.inner.id, removed, "map chart dropped");
    }
}

impl std::fmt::Debug for MapChart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapChart")
            .field("id", &self.inner.id)
            .field("token", &self.inner.token)
            .finish_non_exhaustive()
    }
}

fn subscribe(inner: &Rc<ChartInner>) {
    on(inner, MAP_SELECTION_DID_CHANGE, |chart, event| {
        let Payload::Group(group) = &event.payload else {
            warn!(chart = %chart.id, event = %event.name, "unexpected payload");
            return Ok(());
        };
        chart.state.borrow_mut().selected_group = Some(group.clone());
        if !chart.has_controller() {
            debug!(chart = %chart.id, "group adopted; no data controller to render");
            return Ok(());
        }
        chart.run()?;
        Ok(())
    });

    on(inner, &Dimension::Locations.did_change_event(), |chart, _event| {
        chart.render_selection()?;
        Ok(())
    });

    on(inner, DATA_DID_CHANGE, |chart, _event| {
        if chart.has_controller() {
            chart.run()?;
        }
        Ok(())
    });
}

/// Registers `handler` for `event` under the chart's namespace.
///
/// The callback holds the chart weakly and drops events the chart sent.
fn on<F>(inner: &Rc<ChartInner>, event: &str, handler: F)
where
    F: Fn(&ChartInner, &Event) -> Result<(), HandlerError> + 'static,
{
    let weak: Weak<ChartInner> = Rc::downgrade(inner);
    inner.bus.subscribe(event, &inner.namespace, move |e| {
        let Some(chart) = weak.upgrade() else {
            return Ok(());
        };
        if e.is_from(&chart.token) {
            debug!(chart = %chart.id, event = %e.name, "chart is sender; ignoring");
            return Ok(());
        }
        handler(&chart, e)
    });
}

impl ChartInner {
    fn has_controller(&self) -> bool {
        self.state.borrow().controller.is_some()
    }

    fn controller(&self) -> Result<Rc<DataController>, ConfigurationError> {
        self.state
            .borrow()
            .controller
            .clone()
            .ok_or(ConfigurationError::NoDataController)
    }

    fn data_view(&self) -> Result<DataView, MapError> {
        let controller = self.controller()?;
        let previous = self.state.borrow().selected_group.clone();
        let snapshot = controller.snapshot();
        let view = compute_data_view(&snapshot, previous.as_deref());
        self.state.borrow_mut().selected_group = view.selected_group.clone();
        Ok(view)
    }

    fn set_geojson(&self, geojson: FeatureCollection) -> Result<(), MapError> {
        let (config, preprocessor) = {
            let state = self.state.borrow();
            (Rc::clone(&state.config), state.preprocessor.clone())
        };
        self.replace_geometry(config, preprocessor, Some(Rc::new(geojson)))?;
        let mut state = self.state.borrow_mut();
        if state.controller.is_none() {
            state.controller = Some(Rc::new(DataController::with_bus(
                Vec::new(),
                self.bus.clone(),
            )));
        }
        Ok(())
    }

    /// Prepares `source` with `preprocessor` and `config`, then commits all of
    /// them together. Nothing changes if preparation fails.
    fn replace_geometry(
        &self,
        config: Rc<MapConfig>,
        preprocessor: GeometryPreprocessor,
        source: Option<Rc<FeatureCollection>>,
    ) -> Result<(), MapError> {
        let working = match &source {
            Some(source) => {
                let working = preprocessor.prepare(
                    source,
                    &config.options.exclude,
                    &config.options.include,
                )?;
                if working.is_empty() {
                    debug!(chart = %self.id, "working geometry is empty");
                }
                Some(Rc::new(working))
            }
            None => None,
        };
        let mut state = self.state.borrow_mut();
        state.config = config;
        state.preprocessor = preprocessor;
        state.geojson = source;
        state.working = working;
        Ok(())
    }

    fn ensure_working(&self, view: &DataView) -> Result<Rc<WorkingGeometry>, MapError> {
        if let Some(working) = self.state.borrow().working.clone() {
            return Ok(working);
        }
        debug!(chart = %self.id, locations = view.locations.len(), "no geometry; generating");
        self.set_geojson(generate_for_locations(&view.locations))?;
        Ok(self.state.borrow().working.clone().unwrap_or_default())
    }

    fn run(&self) -> Result<(), MapError> {
        let view = self.data_view()?;
        let working = self.ensure_working(&view)?;
        let controller = self.controller()?;
        let frame = self.build_frame(&view, &working, &controller);
        self.surface.borrow_mut().render(&frame);
        debug!(
            chart = %self.id,
            group = ?frame.selected_group,
            features = frame.features.len(),
            "rendered"
        );
        Ok(())
    }

    fn render_selection(&self) -> Result<(), MapError> {
        let working = self.state.borrow().working.clone();
        let (Some(working), Some(controller)) = (working, self.state.borrow().controller.clone())
        else {
            return Ok(());
        };
        let selection = self.selection_frame(&working, &controller);
        self.surface.borrow_mut().render_selection(&selection);
        Ok(())
    }

    fn selection_frame(
        &self,
        working: &WorkingGeometry,
        controller: &DataController,
    ) -> SelectionFrame {
        let selected = working.select(&controller.filters(Dimension::Locations));
        if selected.is_empty() {
            debug!(chart = %self.id, "no features selected");
            return SelectionFrame::default();
        }
        let border = self
            .state
            .borrow()
            .preprocessor
            .merge(selected.iter().copied());
        SelectionFrame {
            selected_ids: selected.iter().map(|f| f.feature_id.clone()).collect(),
            border,
        }
    }

    fn build_frame(
        &self,
        view: &DataView,
        working: &WorkingGeometry,
        controller: &DataController,
    ) -> MapFrame {
        let config = Rc::clone(&self.state.borrow().config);
        let options = &config.options;
        let format = |v: f64| config.format(v);

        let features = working
            .features
            .iter()
            .map(|f| {
                let value = view.location_sum(&f.feature_id);
                FeatureFrame {
                    feature_id: f.feature_id.clone(),
                    name: f.name.clone(),
                    value,
                    fill: Fill::for_value(value, view.max_location),
                    selected: controller.is_filter(Dimension::Locations, &f.feature_id),
                    center: f.center,
                    geometry: f.feature.geometry.clone(),
                }
            })
            .collect();

        let labels = if options.labels {
            feature_labels(working, view, &options.labels_exclude, &format)
        } else {
            Vec::new()
        };

        let legend = options.legend.then(|| LegendFrame {
            title: cut(view.selected_group.as_deref().unwrap_or_default(), LEGEND_TITLE_MAX),
            stops: legend_stops(view.max_location, &format),
        });

        let legend_panel = options.legend_panel.then(|| LegendPanelFrame {
            groups: view.groups.clone(),
            selected: view.selected_group.clone(),
        });

        MapFrame {
            chart_id: self.id.clone(),
            width: options.width,
            height: options.height,
            selected_group: view.selected_group.clone(),
            features,
            exterior_border: working.border.clone(),
            bounds: working.bounds,
            labels,
            legend,
            legend_panel,
            selection: self.selection_frame(working, controller),
            tooltip: options.tooltip,
            color_scale: options.color_scale.clone(),
            color_scheme: options.color_scheme.clone(),
        }
    }
}
