//! Live incident list on the incidents page and the dashboard.

use crisis_presenter::dto::{IncidentId, IncidentUpdate, NewIncident, StatusChange};
use crisis_presenter::feed::{
    incident_link, Card, FeedChange, IncidentFeed, Overlay, StatusPatch, CARD_CLASS,
    FEED_CAPACITY, LIST_ITEM_CLASS, RESOLVED_OVERLAY_HTML,
};
use crisis_presenter::stream::EventSink;
use crisis_presenter::{IncidentStatus, Result};
use wasm_bindgen::JsCast;
use web_sys::Element;

use crate::charts::SharedDashboard;
use crate::dom;

const ID_ATTR: &str = "data-incident-id";

/// Which of the two list layouts the page uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// `#incidents-list`: one card per incident.
    Cards,
    /// `#recent-incidents-list`: dashboard list group rows.
    Rows,
}

pub struct FeedSink {
    feed: IncidentFeed,
    list: Element,
    layout: Layout,
    dashboard: Option<SharedDashboard>,
}

fn seed_cards(list: &Element) -> Vec<Card> {
    let Ok(nodes) = list.query_selector_all(&format!("[{ID_ATTR}]")) else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|index| nodes.item(index)?.dyn_into::<Element>().ok())
        .filter_map(|element| {
            let id = element.get_attribute(ID_ATTR)?.trim().parse::<IncidentId>().ok()?;
            let status = element
                .get_attribute("data-status")
                .as_deref()
                .and_then(IncidentStatus::parse);
            let mut card = Card::existing(id, status);
            if let Some(severity) = element.get_attribute("data-severity") {
                card.severity = severity;
            }
            Some(card)
        })
        .collect()
}

impl FeedSink {
    /// Attaches to whichever incident list the page renders.
    pub fn mount(dashboard: Option<SharedDashboard>) -> Option<Self> {
        let (list, layout) = dom::by_id("incidents-list")
            .map(|list| (list, Layout::Cards))
            .or_else(|| dom::by_id("recent-incidents-list").map(|list| (list, Layout::Rows)))?;

        let feed = IncidentFeed::with_cards(FEED_CAPACITY, seed_cards(&list));
        drop_unlisted_nodes(&list, &feed);
        log::debug!("incident feed tracking {} listed incidents", feed.len());
        if layout == Layout::Rows {
            dom::listen(&list, "click", |event| {
                if let Some(id) = dom::closest_target(&event, &format!("[{ID_ATTR}]"))
                    .and_then(|row| row.get_attribute(ID_ATTR))
                    .and_then(|raw| raw.trim().parse::<IncidentId>().ok())
                {
                    open_incident(id);
                }
            });
        }
        Some(Self {
            feed,
            list,
            layout,
            dashboard,
        })
    }

    fn node_for(&self, incident_id: IncidentId) -> Option<Element> {
        self.list
            .query_selector(&format!(r#"[{ID_ATTR}="{incident_id}"]"#))
            .ok()
            .flatten()
    }

    fn render(&self, card: &Card) -> Result<Element> {
        let element = match self.layout {
            Layout::Cards => {
                let element = dom::create("div", CARD_CLASS)?;
                element.set_inner_html(&card.card_html());
                element
            }
            Layout::Rows => {
                let element = dom::create("li", LIST_ITEM_CLASS)?;
                element.set_inner_html(&card.list_item_html());
                element
            }
        };
        element
            .set_attribute(ID_ATTR, &card.incident_id.to_string())
            .map_err(dom::js_error)?;
        Ok(element)
    }

    fn apply_status(&mut self, incident_id: IncidentId, raw_status: &str) -> Result<()> {
        let patch = self.feed.change_status(incident_id, raw_status);
        if patch.on_card {
            if let Some(node) = self.node_for(incident_id) {
                patch_node(&node, &patch)?;
            }
        }
        if let (Some(resolved), Some(dashboard)) = (patch.resolution, &self.dashboard) {
            dashboard
                .borrow_mut()
                .apply_resolution(resolved, patch.severity)?;
        }
        Ok(())
    }
}

/// Removes server-rendered entries the feed cut off at capacity.
fn drop_unlisted_nodes(list: &Element, feed: &IncidentFeed) {
    let Ok(nodes) = list.query_selector_all(&format!("[{ID_ATTR}]")) else {
        return;
    };
    for index in 0..nodes.length() {
        let Some(element) = nodes.item(index).and_then(|node| node.dyn_into::<Element>().ok())
        else {
            continue;
        };
        let listed = element
            .get_attribute(ID_ATTR)
            .and_then(|raw| raw.trim().parse::<IncidentId>().ok())
            .is_some_and(|id| feed.card(id).is_some());
        if !listed {
            element.remove();
        }
    }
}

fn open_incident(incident_id: IncidentId) {
    let result = dom::window().and_then(|window| {
        window
            .location()
            .set_href(&incident_link(incident_id))
            .map_err(dom::js_error)
    });
    if let Err(error) = result {
        log::error!("unable to open incident {incident_id}: {error}");
    }
}

fn patch_node(node: &Element, patch: &StatusPatch) -> Result<()> {
    if let Some(badge) = node.query_selector(".status-badge").ok().flatten() {
        badge.set_class_name(&patch.badge_class_name());
        badge.set_text_content(Some(&patch.label));
    } else if let Some(anchor) = node.query_selector(".badge").ok().flatten() {
        anchor
            .insert_adjacent_html("afterend", &patch.badge_html())
            .map_err(dom::js_error)?;
    } else {
        let target = node
            .query_selector(".card-title")
            .ok()
            .flatten()
            .unwrap_or_else(|| node.clone());
        target
            .insert_adjacent_html("beforeend", &patch.badge_html())
            .map_err(dom::js_error)?;
    }

    match patch.overlay {
        Overlay::Keep => {}
        Overlay::Add => {
            let overlay = dom::create("div", "")?;
            overlay.set_inner_html(RESOLVED_OVERLAY_HTML);
            if let Some(inner) = overlay.first_element_child() {
                node.append_child(&inner).map_err(dom::js_error)?;
            }
            node.class_list().add_1("opacity-75").map_err(dom::js_error)?;
        }
        Overlay::Remove => {
            if let Some(overlay) = node.query_selector(".resolved-overlay").ok().flatten() {
                overlay.remove();
            }
            node.class_list().remove_1("opacity-75").map_err(dom::js_error)?;
        }
    }
    Ok(())
}

impl EventSink for FeedSink {
    fn name(&self) -> &'static str {
        "incident feed"
    }

    fn on_new_incident(&mut self, incident: &NewIncident) -> Result<()> {
        let FeedChange::Inserted { card, evicted } = self.feed.push_new(incident) else {
            return Ok(());
        };

        let element = self.render(&card)?;
        dom::prepend(&self.list, &element)?;

        for old in evicted.into_iter().filter_map(|id| self.node_for(id)) {
            old.remove();
        }
        Ok(())
    }

    fn on_incident_update(&mut self, update: &IncidentUpdate) -> Result<()> {
        if let Some(badge) = self.feed.record_update(update.incident_id) {
            if let Some(node) = self.node_for(update.incident_id) {
                match node.query_selector(".update-badge").ok().flatten() {
                    Some(existing) => existing.set_text_content(Some(&badge.label)),
                    None => {
                        let target = node
                            .query_selector(".card-title")
                            .ok()
                            .flatten()
                            .unwrap_or_else(|| node.clone());
                        target
                            .insert_adjacent_html("beforeend", &format!(" {}", badge.html()))
                            .map_err(dom::js_error)?;
                    }
                }
                node.class_list().add_1("border-info").map_err(dom::js_error)?;
            }
        }

        if let Some(status) = update.status.as_deref() {
            self.apply_status(update.incident_id, status)?;
        }
        Ok(())
    }

    fn on_status_change(&mut self, change: &StatusChange) -> Result<()> {
        self.apply_status(change.incident_id, &change.new_status)
    }
}
