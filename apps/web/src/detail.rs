use crisis_presenter::detail::{DetailEntry, IncidentDetail};
use crisis_presenter::dto::{IncidentId, IncidentUpdate, ResourceAllocation};
use crisis_presenter::stream::EventSink;
use crisis_presenter::Result;

use crate::dom;

/// Prepends live updates and allocations on an incident's own page.
pub struct DetailSink {
    detail: IncidentDetail,
}

impl DetailSink {
    pub fn mount() -> Option<Self> {
        let id = dom::by_id("incident-detail")?
            .get_attribute("data-incident-id")?
            .trim()
            .parse::<IncidentId>()
            .ok()?;
        Some(Self {
            detail: IncidentDetail::new(id),
        })
    }

    fn show(entry: &DetailEntry) -> Result<()> {
        let list = dom::require(entry.list_id)?;
        let element = dom::create("div", entry.class_name)?;
        element.set_inner_html(&entry.html);
        dom::prepend(&list, &element)?;
        dom::play_sound(entry.sound);
        Ok(())
    }
}

impl EventSink for DetailSink {
    fn name(&self) -> &'static str {
        "incident detail"
    }

    fn on_incident_update(&mut self, update: &IncidentUpdate) -> Result<()> {
        match self.detail.update_entry(update) {
            Some(entry) => Self::show(&entry),
            None => Ok(()),
        }
    }

    fn on_resource_allocation(&mut self, allocation: &ResourceAllocation) -> Result<()> {
        match self.detail.allocation_entry(allocation) {
            Some(entry) => Self::show(&entry),
            None => Ok(()),
        }
    }
}
