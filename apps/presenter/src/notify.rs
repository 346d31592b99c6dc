use crate::format::{format_status, truncate};
use crate::stream::StreamEvent;

/// How long a toast stays up before Bootstrap hides it.
pub const TOAST_DELAY_MS: u32 = 5000;

pub const CONNECTION_LOST: &str = "Connection lost. Please refresh the page.";

/// Kind of a notification; decides its color and sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Critical,
    High,
    Medium,
    Low,
    Info,
    Success,
    Warning,
    Danger,
    Error,
}

impl Tone {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "info" => Some(Self::Info),
            "success" => Some(Self::Success),
            "warning" => Some(Self::Warning),
            "danger" => Some(Self::Danger),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Severity strings and notification kinds share one namespace; anything else is `Info`.
    pub fn from_kind(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::Info)
    }

    pub const fn toast_class(self) -> &'static str {
        match self {
            Self::Critical | Self::Danger | Self::Error => "bg-danger",
            Self::High | Self::Warning => "bg-warning text-dark",
            Self::Medium => "bg-primary",
            Self::Low | Self::Info => "bg-info",
            Self::Success => "bg-success",
        }
    }

    pub const fn sound(self) -> SoundCue {
        match self {
            Self::Critical => SoundCue::Critical,
            Self::High | Self::Warning => SoundCue::Warning,
            Self::Success => SoundCue::Success,
            _ => SoundCue::Notification,
        }
    }
}

/// `<audio>` elements the page template provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Critical,
    Warning,
    Success,
    Notification,
    Update,
    Allocation,
}

impl SoundCue {
    pub const fn element_id(self) -> &'static str {
        match self {
            Self::Critical => "critical-sound",
            Self::Warning => "warning-sound",
            Self::Success => "success-sound",
            Self::Notification => "notification-sound",
            Self::Update => "update-sound",
            Self::Allocation => "allocation-sound",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: String,
    pub title: String,
    pub message: String,
    pub tone: Tone,
    pub delay_ms: u32,
}

impl Toast {
    pub fn class_name(&self) -> String {
        format!("toast {} text-white border-0", self.tone.toast_class())
    }

    pub const fn sound(&self) -> SoundCue {
        self.tone.sound()
    }
}

/// Hands out toasts with page-unique ids.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    issued: u64,
}

impl NotificationCenter {
    pub const fn new() -> Self {
        Self { issued: 0 }
    }

    pub fn notify(&mut self, title: &str, message: &str, kind: &str) -> Toast {
        self.issued += 1;
        Toast {
            id: format!("toast-{}", self.issued),
            title: title.to_string(),
            message: message.to_string(),
            tone: Tone::from_kind(kind),
            delay_ms: TOAST_DELAY_MS,
        }
    }

    pub fn connection_lost(&mut self) -> Toast {
        self.notify("Connection Lost", CONNECTION_LOST, "error")
    }

    /// The toast a stream event announces itself with, if any.
    pub fn announce(&mut self, event: &StreamEvent) -> Option<Toast> {
        let toast = match event {
            StreamEvent::NewIncident(incident) => {
                let message = if incident.location.is_empty() {
                    incident.title.clone()
                } else {
                    format!("{} reported in {}", incident.title, incident.location)
                };
                self.notify("New Incident", &message, &incident.severity)
            }
            StreamEvent::IncidentUpdate(update) => self.notify(
                "Incident Update",
                &format!(
                    "{} updated incident #{}: {}",
                    update.user,
                    update.incident_id,
                    truncate(&update.update_text, 50)
                ),
                "info",
            ),
            StreamEvent::ResourceAllocation(allocation) => self.notify(
                "Resource Allocated",
                &format!(
                    "{} allocated {} {} to incident #{}",
                    allocation.responder,
                    allocation.quantity,
                    allocation.resource_name,
                    allocation.incident_id
                ),
                "success",
            ),
            StreamEvent::StatusChange(change) => self.notify(
                "Status Change",
                &format!(
                    "Incident #{} status changed to {}",
                    change.incident_id,
                    format_status(&change.new_status)
                ),
                "warning",
            ),
            StreamEvent::Notice(_) => return None,
        };
        Some(toast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{NewIncident, StatusChange, StreamNotice};

    #[test]
    fn kinds_map_to_fixed_colors() {
        assert_eq!(Tone::from_kind("critical").toast_class(), "bg-danger");
        assert_eq!(Tone::from_kind("high").toast_class(), "bg-warning text-dark");
        assert_eq!(Tone::from_kind("warning").toast_class(), "bg-warning text-dark");
        assert_eq!(Tone::from_kind("medium").toast_class(), "bg-primary");
        assert_eq!(Tone::from_kind("low").toast_class(), "bg-info");
        assert_eq!(Tone::from_kind("success").toast_class(), "bg-success");
        assert_eq!(Tone::from_kind("mystery").toast_class(), "bg-info");
    }

    #[test]
    fn kinds_map_to_sounds() {
        assert_eq!(Tone::Critical.sound(), SoundCue::Critical);
        assert_eq!(Tone::High.sound(), SoundCue::Warning);
        assert_eq!(Tone::Success.sound(), SoundCue::Success);
        assert_eq!(Tone::Low.sound().element_id(), "notification-sound");
    }

    #[test]
    fn toast_ids_are_unique() {
        let mut center = NotificationCenter::new();
        let first = center.notify("A", "one", "info");
        let second = center.notify("B", "two", "info");
        assert_ne!(first.id, second.id);
        assert_eq!(first.delay_ms, 5000);
    }

    #[test]
    fn stream_events_announce_themselves() {
        let mut center = NotificationCenter::new();
        let incident = StreamEvent::NewIncident(NewIncident {
            incident_id: 3,
            title: "Warehouse fire".into(),
            kind: Some("fire".into()),
            severity: "critical".into(),
            status: None,
            location: "Pier 39".into(),
            timestamp: "just now".into(),
            latitude: None,
            longitude: None,
            people_affected: None,
        });
        let status = StreamEvent::StatusChange(StatusChange {
            incident_id: 3,
            new_status: "in_progress".into(),
        });

        let toast = center.announce(&incident).unwrap();
        assert_eq!(toast.message, "Warehouse fire reported in Pier 39");
        assert_eq!(toast.tone, Tone::Critical);

        let toast = center.announce(&status).unwrap();
        assert_eq!(toast.message, "Incident #3 status changed to In Progress");

        assert!(center
            .announce(&StreamEvent::Notice(StreamNotice::default()))
            .is_none());
    }
}
