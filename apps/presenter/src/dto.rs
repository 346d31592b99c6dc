use serde::{Deserialize, Deserializer, Serialize};

pub type IncidentId = i64;

/// A number that the backend sends either as a JSON number or as a numeric string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    /// Finite value, `None` for non-numeric text, NaN or infinities.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|value| value.trunc() as i64)
    }
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<IncidentId, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Numeric::deserialize(deserializer)?;
    raw.as_i64()
        .ok_or_else(|| serde::de::Error::custom("incident id is not numeric"))
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MapData {
    #[serde(default)]
    pub incidents: Vec<Incident>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Incident {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: IncidentId,
    pub title: String,
    #[serde(rename = "type", alias = "incident_type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub latitude: Option<Numeric>,
    #[serde(default)]
    pub longitude: Option<Numeric>,
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Resource {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: i64,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub quantity: Option<Numeric>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub latitude: Option<Numeric>,
    #[serde(default)]
    pub longitude: Option<Numeric>,
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Payload of the `new-incident` stream event.
#[derive(Clone, Debug, Deserialize)]
pub struct NewIncident {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub incident_id: IncidentId,
    pub title: String,
    #[serde(rename = "type", alias = "incident_type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub latitude: Option<Numeric>,
    #[serde(default)]
    pub longitude: Option<Numeric>,
    #[serde(default)]
    pub people_affected: Option<Numeric>,
}

impl NewIncident {
    /// The same record shaped like a map-data incident, for marker creation.
    pub fn as_map_incident(&self) -> Incident {
        Incident {
            id: self.incident_id,
            title: self.title.clone(),
            kind: self.kind.clone(),
            severity: self.severity.clone(),
            status: self.status.clone().unwrap_or_else(|| "reported".to_string()),
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            reported_by: None,
            created_at: None,
        }
    }
}

/// Payload of the `incident-update` stream event.
#[derive(Clone, Debug, Deserialize)]
pub struct IncidentUpdate {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub incident_id: IncidentId,
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub update_text: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Payload of the `resource-allocation` stream event.
#[derive(Clone, Debug, Deserialize)]
pub struct ResourceAllocation {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub incident_id: IncidentId,
    pub resource_name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub responder: String,
}

/// Payload of the `status-change` stream event.
#[derive(Clone, Debug, Deserialize)]
pub struct StatusChange {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub incident_id: IncidentId,
    pub new_status: String,
}

/// Payload of the unnamed `message` channel: greetings, keepalives and timeout notices.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StreamNotice {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub keepalive: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamNotice {
    /// True when the server announces it is about to drop the connection.
    pub fn is_timeout(&self) -> bool {
        self.message
            .as_deref()
            .is_some_and(|message| message.contains("timeout") || message.contains("ended"))
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Recommendation {
    pub resource_id: i64,
    pub resource_name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RecommendationReport {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub priority_level: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub resource_gaps: Vec<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub is_new_chat: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}
