//! Dashboard charts: incident types (doughnut) and open incidents by
//! severity (bar), seeded from page data and patched by stream events.

use serde_json::{Map, Value};

use crate::domain::Severity;
use crate::dto::NewIncident;
use crate::format::format_incident_type;
use crate::palette::color_for_index;

pub const NO_DATA: &str = "No incident data available";

/// Either a drawn chart or the "no data" placeholder shown in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartState<T> {
    Placeholder,
    Live(T),
}

impl<T> ChartState<T> {
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeChart {
    /// Raw incident types, parallel to `labels`.
    pub keys: Vec<String>,
    pub labels: Vec<String>,
    pub values: Vec<i64>,
    pub colors: Vec<String>,
}

impl TypeChart {
    fn from_counts(counts: &Map<String, Value>) -> Self {
        let mut chart = Self::default();
        for (key, value) in counts {
            chart.push(key, value.as_i64().unwrap_or(0));
        }
        chart
    }

    fn push(&mut self, key: &str, value: i64) {
        self.colors.push(color_for_index(self.keys.len()));
        self.keys.push(key.to_string());
        self.labels.push(format_incident_type(Some(key)));
        self.values.push(value);
    }

    pub fn value_of(&self, key: &str) -> Option<i64> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|index| self.values[index])
    }
}

/// How the type chart has to change after a delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeChartPatch {
    Unchanged,
    Updated { index: usize, value: i64 },
    Added { label: String, value: i64, color: String },
    /// The placeholder must be replaced by a freshly drawn chart.
    Promoted(TypeChart),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityPatch {
    pub severity: Severity,
    pub count: i64,
    /// True when the bar chart has to be drawn from scratch.
    pub promoted: bool,
}

/// Response metric counters shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    TotalIncidents,
    ActiveIncidents,
    PeopleAffected,
    ActiveAreas,
    ResolvedIncidents,
}

impl Metric {
    pub const ALL: [Self; 5] = [
        Self::TotalIncidents,
        Self::ActiveIncidents,
        Self::PeopleAffected,
        Self::ActiveAreas,
        Self::ResolvedIncidents,
    ];

    pub const fn element_id(self) -> &'static str {
        match self {
            Self::TotalIncidents => "total-incidents-counter",
            Self::ActiveIncidents => "active-incidents-counter",
            Self::PeopleAffected => "people-affected-counter",
            Self::ActiveAreas => "active-areas-counter",
            Self::ResolvedIncidents => "resolved-incidents-counter",
        }
    }
}

/// Counter changes a new incident implies. Active areas are bumped by one
/// per incident since area uniqueness is only known to the server.
pub fn metrics_for_new_incident(incident: &NewIncident) -> Vec<(Metric, i64)> {
    let mut deltas = vec![
        (Metric::TotalIncidents, 1),
        (Metric::ActiveIncidents, 1),
        (Metric::ActiveAreas, 1),
    ];
    if let Some(people) = incident
        .people_affected
        .as_ref()
        .and_then(crate::dto::Numeric::as_i64)
        .filter(|people| *people > 0)
    {
        deltas.push((Metric::PeopleAffected, people));
    }
    deltas
}

/// Counter changes when an incident moves into (`true`) or out of resolved.
pub fn metrics_for_resolution(resolved: bool) -> Vec<(Metric, i64)> {
    if resolved {
        vec![(Metric::ActiveIncidents, -1), (Metric::ResolvedIncidents, 1)]
    } else {
        vec![(Metric::ActiveIncidents, 1), (Metric::ResolvedIncidents, -1)]
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    type_counts: Map<String, Value>,
    type_chart: ChartState<TypeChart>,
    severity_counts: [i64; 4],
    severity_chart: ChartState<()>,
}

impl Dashboard {
    /// Builds the model from the `data-incident-types` attribute and the
    /// four severity counters. Unparseable type data counts as empty.
    pub fn from_page(type_json: Option<&str>, severity_counts: [i64; 4]) -> Self {
        let type_counts = match type_json.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => Map::new(),
            Some(raw) => serde_json::from_str::<Map<String, Value>>(raw).unwrap_or_else(|error| {
                log::warn!("unable to parse incident type data: {error}");
                Map::new()
            }),
        };

        let type_chart = if type_counts.is_empty() {
            ChartState::Placeholder
        } else {
            ChartState::Live(TypeChart::from_counts(&type_counts))
        };

        let severity_chart = if severity_counts.iter().all(|count| *count == 0) {
            ChartState::Placeholder
        } else {
            ChartState::Live(())
        };

        Self {
            type_counts,
            type_chart,
            severity_counts,
            severity_chart,
        }
    }

    pub const fn type_chart(&self) -> &ChartState<TypeChart> {
        &self.type_chart
    }

    pub const fn severity_chart(&self) -> &ChartState<()> {
        &self.severity_chart
    }

    pub const fn severity_counts(&self) -> [i64; 4] {
        self.severity_counts
    }

    pub fn type_count(&self, kind: &str) -> Option<i64> {
        self.type_counts.get(kind).and_then(Value::as_i64)
    }

    /// The mapping serialised back for the page attribute.
    pub fn type_counts_json(&self) -> String {
        Value::Object(self.type_counts.clone()).to_string()
    }

    /// Adds `change` to an incident type. A type seen for the first time
    /// with a positive change gets a new category; categories are never
    /// removed, even at zero.
    pub fn apply_incident_delta(&mut self, kind: &str, change: i64) -> TypeChartPatch {
        let kind = kind.trim();
        if kind.is_empty() || change == 0 {
            return TypeChartPatch::Unchanged;
        }

        let updated = match self.type_counts.get(kind).and_then(Value::as_i64) {
            Some(current) => current + change,
            None if change > 0 => change,
            None => return TypeChartPatch::Unchanged,
        };
        self.type_counts.insert(kind.to_string(), Value::from(updated));

        match &mut self.type_chart {
            ChartState::Placeholder => {
                if change > 0 {
                    let chart = TypeChart::from_counts(&self.type_counts);
                    self.type_chart = ChartState::Live(chart.clone());
                    TypeChartPatch::Promoted(chart)
                } else {
                    TypeChartPatch::Unchanged
                }
            }
            ChartState::Live(chart) => match chart.keys.iter().position(|k| k == kind) {
                Some(index) => {
                    chart.values[index] += change;
                    TypeChartPatch::Updated {
                        index,
                        value: chart.values[index],
                    }
                }
                None if change > 0 => {
                    chart.push(kind, change);
                    let last = chart.keys.len() - 1;
                    TypeChartPatch::Added {
                        label: chart.labels[last].clone(),
                        value: chart.values[last],
                        color: chart.colors[last].clone(),
                    }
                }
                None => TypeChartPatch::Unchanged,
            },
        }
    }

    /// Adds `change` to the open count of a severity; counts never go below
    /// zero. Unknown severities are ignored.
    pub fn apply_severity_delta(&mut self, severity: &str, change: i64) -> Option<SeverityPatch> {
        let severity = Severity::parse(severity)?;
        let slot = &mut self.severity_counts[severity.index()];
        *slot = (*slot + change).max(0);
        let count = *slot;

        let promoted = !self.severity_chart.is_live() && count > 0;
        if promoted {
            self.severity_chart = ChartState::Live(());
        }

        Some(SeverityPatch {
            severity,
            count,
            promoted,
        })
    }
}
