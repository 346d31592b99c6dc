use crate::dto::{IncidentId, IncidentUpdate, ResourceAllocation};
use crate::format::escape_html;
use crate::notify::SoundCue;

/// An element to prepend to one of the detail page lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailEntry {
    pub list_id: &'static str,
    pub class_name: &'static str,
    pub html: String,
    pub sound: SoundCue,
}

/// Live additions to the page of a single incident.
#[derive(Debug, Clone, Copy)]
pub struct IncidentDetail {
    incident_id: IncidentId,
}

impl IncidentDetail {
    pub const fn new(incident_id: IncidentId) -> Self {
        Self { incident_id }
    }

    pub const fn incident_id(&self) -> IncidentId {
        self.incident_id
    }

    pub fn update_entry(&self, update: &IncidentUpdate) -> Option<DetailEntry> {
        if update.incident_id != self.incident_id {
            return None;
        }
        let html = format!(
            r#"<div class="card-body py-2 px-3"><div class="d-flex justify-content-between align-items-center"><div><p class="mb-1">{}</p><small class="text-muted">By {}</small></div><small class="text-muted">{}</small></div></div>"#,
            escape_html(&update.update_text),
            escape_html(&update.user),
            escape_html(&update.timestamp)
        );
        Some(DetailEntry {
            list_id: "incident-updates",
            class_name: "card mb-2 border-left-primary animate__animated animate__fadeIn",
            html,
            sound: SoundCue::Update,
        })
    }

    pub fn allocation_entry(&self, allocation: &ResourceAllocation) -> Option<DetailEntry> {
        if allocation.incident_id != self.incident_id {
            return None;
        }
        let html = format!(
            "<strong>{} {}</strong> allocated by {}",
            allocation.quantity,
            escape_html(&allocation.resource_name),
            escape_html(&allocation.responder)
        );
        Some(DetailEntry {
            list_id: "resource-allocations",
            class_name: "alert alert-success animate__animated animate__fadeIn",
            html,
            sound: SoundCue::Allocation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(incident_id: IncidentId, text: &str) -> IncidentUpdate {
        IncidentUpdate {
            incident_id,
            update_id: Some(1),
            update_text: text.into(),
            user: "dispatcher".into(),
            timestamp: "2025-03-14 10:00".into(),
            status: None,
        }
    }

    #[test]
    fn events_for_other_incidents_are_ignored() {
        let detail = IncidentDetail::new(9);
        assert!(detail.update_entry(&update(8, "road closed")).is_none());
        assert!(detail.update_entry(&update(9, "road closed")).is_some());
    }

    #[test]
    fn update_text_is_escaped() {
        let entry = IncidentDetail::new(1)
            .update_entry(&update(1, "<b>evacuate</b>"))
            .unwrap();

        assert!(entry.html.contains("&lt;b&gt;evacuate&lt;/b&gt;"));
        assert_eq!(entry.list_id, "incident-updates");
        assert_eq!(entry.sound.element_id(), "update-sound");
    }

    #[test]
    fn allocation_entry_names_quantity_and_responder() {
        let entry = IncidentDetail::new(2)
            .allocation_entry(&ResourceAllocation {
                incident_id: 2,
                resource_name: "sandbags".into(),
                quantity: 200,
                responder: "Team B".into(),
            })
            .unwrap();

        assert_eq!(entry.html, "<strong>200 sandbags</strong> allocated by Team B");
        assert_eq!(entry.sound, SoundCue::Allocation);
    }
}
