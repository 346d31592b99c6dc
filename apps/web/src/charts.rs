//! Dashboard charts, severity counters and response metrics.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crisis_presenter::dashboard::{
    metrics_for_new_incident, metrics_for_resolution, ChartState, Dashboard, Metric, TypeChart,
    TypeChartPatch, NO_DATA,
};
use crisis_presenter::dto::NewIncident;
use crisis_presenter::format::{format_count, parse_count};
use crisis_presenter::stream::EventSink;
use crisis_presenter::{Result, Severity};
use serde::Serialize;
use serde_json::json;
use wasm_bindgen::JsValue;
use web_sys::Element;

use crate::animation::{counter_frame, counter_steps, COUNTER_HIGHLIGHT_MS, COUNTER_STEP_MS};
use crate::{bridge, dom};

const TYPE_CANVAS: &str = "incidentTypeChart";
const SEVERITY_CANVAS: &str = "severityChart";
const TYPE_DATA: &str = "incident-type-data";
const TYPE_ATTR: &str = "data-incident-types";

fn placeholder_html() -> String {
    format!(
        r#"<div class="alert alert-secondary text-center"><i class="bi bi-info-circle"></i> {NO_DATA}</div>"#
    )
}

fn to_js(config: &serde_json::Value) -> Result<JsValue> {
    config
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|error| crisis_presenter::PresenterError::transport("chart", error.to_string()))
}

fn title(text: &str) -> serde_json::Value {
    json!({
        "display": true,
        "text": text,
        "color": "#ffffff",
        "font": { "size": 16, "weight": "bold" }
    })
}

fn type_chart_config(chart: &TypeChart) -> serde_json::Value {
    json!({
        "type": "doughnut",
        "data": {
            "labels": chart.labels,
            "datasets": [{
                "data": chart.values,
                "backgroundColor": chart.colors,
                "borderWidth": 1
            }]
        },
        "options": {
            "responsive": true,
            "maintainAspectRatio": true,
            "plugins": {
                "legend": {
                    "position": "right",
                    "labels": { "color": "#ffffff", "font": { "size": 12 } }
                },
                "title": title("Incident Types")
            }
        }
    })
}

fn severity_chart_config(counts: [i64; 4]) -> serde_json::Value {
    let axis = json!({
        "ticks": { "color": "#ffffff" },
        "grid": { "color": "rgba(255, 255, 255, 0.1)" }
    });
    json!({
        "type": "bar",
        "data": {
            "labels": Severity::ALL.map(Severity::label),
            "datasets": [{
                "label": "Open Incidents by Severity",
                "data": counts,
                "backgroundColor": Severity::ALL.map(Severity::chart_color),
                "borderWidth": 1
            }]
        },
        "options": {
            "responsive": true,
            "maintainAspectRatio": true,
            "scales": {
                "y": {
                    "beginAtZero": true,
                    "ticks": { "precision": 0, "color": "#ffffff" },
                    "grid": axis["grid"]
                },
                "x": axis
            },
            "plugins": {
                "legend": { "display": false },
                "title": title("Open Incidents by Severity")
            }
        }
    })
}

/// A chart canvas and the container the placeholder is drawn into.
struct ChartSlot {
    canvas_id: &'static str,
    parent: Element,
    chart: Option<JsValue>,
}

impl ChartSlot {
    fn find(canvas_id: &'static str) -> Option<Self> {
        let parent = dom::by_id(canvas_id)?.parent_element()?;
        Some(Self {
            canvas_id,
            parent,
            chart: None,
        })
    }

    fn show_placeholder(&mut self) {
        self.chart = None;
        self.parent.set_inner_html(&placeholder_html());
    }

    fn draw(&mut self, config: &serde_json::Value) -> Result<()> {
        if dom::by_id(self.canvas_id).is_none() {
            self.parent.set_inner_html(&format!(
                r#"<canvas id="{}" height="200"></canvas>"#,
                self.canvas_id
            ));
        }
        let canvas = dom::require(self.canvas_id)?;
        let chart = bridge::create_chart(&canvas, &to_js(config)?).map_err(dom::js_error)?;
        self.chart = Some(chart);
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn chart_value(value: i64) -> f64 {
    value as f64
}

pub struct DashboardView {
    model: Dashboard,
    type_slot: Option<ChartSlot>,
    severity_slot: Option<ChartSlot>,
    metrics: HashMap<Metric, i64>,
    generations: Rc<RefCell<HashMap<Metric, u64>>>,
}

pub type SharedDashboard = Rc<RefCell<DashboardView>>;

impl DashboardView {
    /// Builds the view when the page carries either dashboard chart.
    pub fn mount() -> Option<SharedDashboard> {
        let type_slot = ChartSlot::find(TYPE_CANVAS);
        let severity_slot = ChartSlot::find(SEVERITY_CANVAS);
        if type_slot.is_none() && severity_slot.is_none() {
            return None;
        }

        let type_json = dom::by_id(TYPE_DATA).and_then(|el| el.get_attribute(TYPE_ATTR));
        let severity_counts = Severity::ALL.map(|severity| {
            dom::text_of(&severity.counter_id()).map_or(0, |text| parse_count(&text))
        });
        let model = Dashboard::from_page(type_json.as_deref(), severity_counts);

        let metrics = Metric::ALL
            .into_iter()
            .map(|metric| {
                let value = dom::text_of(metric.element_id()).map_or(0, |text| parse_count(&text));
                (metric, value)
            })
            .collect();

        let mut view = Self {
            model,
            type_slot,
            severity_slot,
            metrics,
            generations: Rc::new(RefCell::new(HashMap::new())),
        };
        view.draw_initial();
        Some(Rc::new(RefCell::new(view)))
    }

    fn draw_initial(&mut self) {
        if let Some(slot) = self.type_slot.as_mut() {
            let drawn = match self.model.type_chart() {
                ChartState::Live(chart) => slot.draw(&type_chart_config(chart)),
                ChartState::Placeholder => {
                    slot.show_placeholder();
                    Ok(())
                }
            };
            if let Err(error) = drawn {
                log::error!("error initializing incident type chart: {error}");
            }
        }

        if let Some(slot) = self.severity_slot.as_mut() {
            let drawn = if self.model.severity_chart().is_live() {
                slot.draw(&severity_chart_config(self.model.severity_counts()))
            } else {
                slot.show_placeholder();
                Ok(())
            };
            if let Err(error) = drawn {
                log::error!("error initializing severity chart: {error}");
            }
        }
    }

    fn apply_type_delta(&mut self, kind: &str, change: i64) -> Result<()> {
        let patch = self.model.apply_incident_delta(kind, change);
        if patch != TypeChartPatch::Unchanged {
            if let Some(data) = dom::by_id(TYPE_DATA) {
                data.set_attribute(TYPE_ATTR, &self.model.type_counts_json())
                    .map_err(dom::js_error)?;
            }
        }

        let Some(slot) = self.type_slot.as_mut() else {
            return Ok(());
        };
        match patch {
            TypeChartPatch::Unchanged => {}
            TypeChartPatch::Updated { index, value } => {
                if let Some(chart) = &slot.chart {
                    bridge::chart_set_value(chart, index, chart_value(value));
                }
            }
            TypeChartPatch::Added {
                label,
                value,
                color,
            } => {
                if let Some(chart) = &slot.chart {
                    bridge::chart_push(chart, &label, chart_value(value), &color);
                }
            }
            TypeChartPatch::Promoted(chart) => slot.draw(&type_chart_config(&chart))?,
        }
        Ok(())
    }

    fn apply_severity_delta(&mut self, severity: &str, change: i64) -> Result<()> {
        let Some(patch) = self.model.apply_severity_delta(severity, change) else {
            return Ok(());
        };
        dom::set_text(&patch.severity.counter_id(), &patch.count.to_string());

        let Some(slot) = self.severity_slot.as_mut() else {
            return Ok(());
        };
        if patch.promoted {
            slot.draw(&severity_chart_config(self.model.severity_counts()))?;
        } else if let Some(chart) = &slot.chart {
            bridge::chart_set_value(chart, patch.severity.index(), chart_value(patch.count));
        }
        Ok(())
    }

    pub fn apply_new_incident(&mut self, incident: &NewIncident) -> Result<()> {
        self.apply_severity_delta(&incident.severity, 1)?;
        if let Some(kind) = incident.kind.as_deref() {
            self.apply_type_delta(kind, 1)?;
        }
        for (metric, delta) in metrics_for_new_incident(incident) {
            self.bump(metric, delta);
        }
        Ok(())
    }

    /// Counter changes for an incident crossing the resolved boundary.
    pub fn apply_resolution(&mut self, resolved: bool, severity: Option<Severity>) -> Result<()> {
        for (metric, delta) in metrics_for_resolution(resolved) {
            self.bump(metric, delta);
        }
        if let Some(severity) = severity {
            self.apply_severity_delta(severity.as_str(), if resolved { -1 } else { 1 })?;
        }
        Ok(())
    }

    fn bump(&mut self, metric: Metric, delta: i64) {
        let Some(element) = dom::by_id(metric.element_id()) else {
            return;
        };
        let start = self.metrics.get(&metric).copied().unwrap_or(0);
        let target = start + delta;
        self.metrics.insert(metric, target);
        animate_counter(&element, metric, start, target, &self.generations);
    }
}

/// Counts `element` from `start` to `target`. A newer animation on the same
/// metric cancels the frames of an older one.
fn animate_counter(
    element: &Element,
    metric: Metric,
    start: i64,
    target: i64,
    generations: &Rc<RefCell<HashMap<Metric, u64>>>,
) {
    let generation = {
        let mut generations = generations.borrow_mut();
        let entry = generations.entry(metric).or_insert(0);
        *entry += 1;
        *entry
    };
    if let Err(error) = element.class_list().add_1("text-primary") {
        log::warn!("unable to highlight {metric:?} counter: {error:?}");
    }

    let done = Rc::new(Cell::new(false));
    for step in 1..=counter_steps() {
        let element = element.clone();
        let generations = Rc::clone(generations);
        let done = Rc::clone(&done);
        dom::set_timeout(step * COUNTER_STEP_MS, move || {
            let current = generations.borrow().get(&metric).copied();
            if current != Some(generation) || done.get() {
                return;
            }
            let value = counter_frame(start, target, step);
            element.set_text_content(Some(&format_count(value)));
            if value == target {
                done.set(true);
                dom::set_timeout(COUNTER_HIGHLIGHT_MS, move || {
                    if let Err(error) = element.class_list().remove_1("text-primary") {
                        log::warn!("unable to clear {metric:?} highlight: {error:?}");
                    }
                });
            }
        });
    }
}

/// Feeds new incidents into the dashboard.
pub struct DashboardSink {
    view: SharedDashboard,
}

impl DashboardSink {
    pub const fn new(view: SharedDashboard) -> Self {
        Self { view }
    }
}

impl EventSink for DashboardSink {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn on_new_incident(&mut self, incident: &NewIncident) -> Result<()> {
        self.view.borrow_mut().apply_new_incident(incident)
    }
}
