//! Live list of recent incident cards.

use std::collections::{HashMap, VecDeque};

use crate::domain::{severity_badge, BadgeClass, IncidentStatus, Severity};
use crate::dto::{IncidentId, NewIncident};
use crate::format::{escape_html, format_status};

/// Most cards the list keeps; older ones fall off the bottom.
pub const FEED_CAPACITY: usize = 10;
/// Most incidents whose status is remembered for counter bookkeeping.
pub const TRACKED_CAPACITY: usize = 500;

pub fn incident_link(incident_id: IncidentId) -> String {
    format!("/incidents/{incident_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub incident_id: IncidentId,
    pub title: String,
    pub location: String,
    pub severity: String,
    pub timestamp: String,
    pub update_count: u32,
    pub status: Option<IncidentStatus>,
    pub resolved: bool,
}

impl Card {
    pub fn from_incident(incident: &NewIncident) -> Self {
        let status = incident.status.as_deref().and_then(IncidentStatus::parse);
        Self {
            incident_id: incident.incident_id,
            title: incident.title.clone(),
            location: incident.location.clone(),
            severity: incident.severity.clone(),
            timestamp: incident.timestamp.clone(),
            update_count: 0,
            status,
            resolved: status.is_some_and(IncidentStatus::is_resolved),
        }
    }

    /// A card already rendered by the server, known only by id and status.
    pub fn existing(incident_id: IncidentId, status: Option<IncidentStatus>) -> Self {
        Self {
            incident_id,
            title: String::new(),
            location: String::new(),
            severity: String::new(),
            timestamp: String::new(),
            update_count: 0,
            status,
            resolved: status.is_some_and(IncidentStatus::is_resolved),
        }
    }

    pub fn severity_badge(&self) -> BadgeClass {
        severity_badge(&self.severity)
    }

    pub fn link(&self) -> String {
        incident_link(self.incident_id)
    }

    /// Inner markup of a card on the incidents page.
    pub fn card_html(&self) -> String {
        format!(
            concat!(
                r#"<div class="card-body"><div class="d-flex justify-content-between align-items-start">"#,
                r#"<div><h5 class="card-title">{title}</h5>"#,
                r#"<h6 class="card-subtitle mb-2 text-muted">{location}</h6></div>"#,
                r#"<span class="badge bg-{class}">{severity}</span></div>"#,
                r#"<div class="card-text mt-2"><small class="text-muted">Reported {timestamp}</small></div>"#,
                r#"<a href="{link}" class="stretched-link"></a></div>"#
            ),
            title = escape_html(&self.title),
            location = escape_html(&self.location),
            class = self.severity_badge().as_str(),
            severity = escape_html(&self.severity.to_uppercase()),
            timestamp = escape_html(&self.timestamp),
            link = self.link(),
        )
    }

    /// Inner markup of a row in the dashboard's recent incidents list.
    pub fn list_item_html(&self) -> String {
        format!(
            concat!(
                r#"<div><span class="badge bg-{class} me-2">{severity}</span>"#,
                r#"<strong>{title}</strong><small class="d-block text-muted">{location}</small></div>"#,
                r#"<span class="text-muted">{timestamp}</span>"#
            ),
            class = self.severity_badge().as_str(),
            severity = escape_html(&self.severity.to_uppercase()),
            title = escape_html(&self.title),
            location = escape_html(&self.location),
            timestamp = escape_html(&self.timestamp),
        )
    }
}

pub const CARD_CLASS: &str = "card mb-3 shadow-sm animate__animated animate__fadeIn";
pub const LIST_ITEM_CLASS: &str =
    "list-group-item list-group-item-action d-flex justify-content-between align-items-center";
pub const RESOLVED_OVERLAY_HTML: &str =
    r#"<div class="position-absolute top-0 end-0 p-2 resolved-overlay"><span class="badge bg-success">RESOLVED</span></div>"#;

pub fn update_label(count: u32) -> String {
    if count == 1 {
        "1 new update".to_string()
    } else {
        format!("{count} new updates")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedChange {
    Inserted {
        card: Card,
        /// Oldest first.
        evicted: Vec<IncidentId>,
    },
    /// The incident is already on the list; nothing changed.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBadge {
    pub incident_id: IncidentId,
    pub count: u32,
    pub label: String,
}

impl UpdateBadge {
    pub fn html(&self) -> String {
        format!(r#"<span class="badge bg-info update-badge">{}</span>"#, self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Add,
    Remove,
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPatch {
    pub incident_id: IncidentId,
    pub label: String,
    pub badge: BadgeClass,
    pub on_card: bool,
    pub overlay: Overlay,
    /// `Some(true)` on a move into resolved, `Some(false)` on a move out.
    pub resolution: Option<bool>,
    pub severity: Option<Severity>,
}

impl StatusPatch {
    pub fn badge_class_name(&self) -> String {
        format!("badge status-badge bg-{}", self.badge.as_str())
    }

    /// Badge markup for a card that has no status badge yet.
    pub fn badge_html(&self) -> String {
        format!(
            r#"<span class="ms-2"><span class="{}">{}</span></span>"#,
            self.badge_class_name(),
            escape_html(&self.label)
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tracked {
    status: Option<IncidentStatus>,
    severity: Option<Severity>,
}

#[derive(Debug, Clone)]
pub struct IncidentFeed {
    cards: VecDeque<Card>,
    capacity: usize,
    tracked: HashMap<IncidentId, Tracked>,
    /// Tracked ids, oldest first; the oldest unlisted ones are forgotten
    /// past [`TRACKED_CAPACITY`].
    tracked_order: VecDeque<IncidentId>,
}

impl Default for IncidentFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

impl IncidentFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            cards: VecDeque::with_capacity(capacity + 1),
            capacity,
            tracked: HashMap::new(),
            tracked_order: VecDeque::new(),
        }
    }

    /// Seeds the feed with server-rendered cards, newest first. Cards past
    /// `capacity` are dropped but their status stays tracked.
    pub fn with_cards(capacity: usize, cards: Vec<Card>) -> Self {
        let mut feed = Self::new(capacity);
        for card in cards {
            feed.track(&card);
            if feed.cards.len() < capacity {
                feed.cards.push_back(card);
            }
        }
        feed
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn card(&self, incident_id: IncidentId) -> Option<&Card> {
        self.cards.iter().find(|card| card.incident_id == incident_id)
    }

    fn card_mut(&mut self, incident_id: IncidentId) -> Option<&mut Card> {
        self.cards
            .iter_mut()
            .find(|card| card.incident_id == incident_id)
    }

    fn tracked_entry(&mut self, incident_id: IncidentId) -> &mut Tracked {
        if !self.tracked.contains_key(&incident_id) {
            self.tracked_order.push_back(incident_id);
            self.forget_oldest();
        }
        self.tracked.entry(incident_id).or_default()
    }

    fn forget_oldest(&mut self) {
        let mut budget = self.tracked_order.len();
        while self.tracked_order.len() > TRACKED_CAPACITY && budget > 0 {
            budget -= 1;
            let Some(oldest) = self.tracked_order.pop_front() else {
                break;
            };
            if self.card(oldest).is_some() {
                self.tracked_order.push_back(oldest);
            } else {
                self.tracked.remove(&oldest);
            }
        }
    }

    pub fn is_tracked(&self, incident_id: IncidentId) -> bool {
        self.tracked.contains_key(&incident_id)
    }

    fn track(&mut self, card: &Card) {
        let entry = self.tracked_entry(card.incident_id);
        if card.status.is_some() {
            entry.status = card.status;
        }
        if let Some(severity) = Severity::parse(&card.severity) {
            entry.severity = Some(severity);
        }
    }

    pub fn push_new(&mut self, incident: &NewIncident) -> FeedChange {
        if self.card(incident.incident_id).is_some() {
            log::debug!("incident {} already listed", incident.incident_id);
            return FeedChange::Duplicate;
        }

        let card = Card::from_incident(incident);
        self.track(&card);
        self.cards.push_front(card.clone());

        let mut evicted = Vec::new();
        while self.cards.len() > self.capacity {
            let Some(old) = self.cards.pop_back() else {
                break;
            };
            evicted.push(old.incident_id);
        }

        FeedChange::Inserted { card, evicted }
    }

    /// Bumps the update badge of a listed card. Cards outside the window
    /// are not tracked for updates.
    pub fn record_update(&mut self, incident_id: IncidentId) -> Option<UpdateBadge> {
        let card = self.card_mut(incident_id)?;
        card.update_count += 1;
        Some(UpdateBadge {
            incident_id,
            count: card.update_count,
            label: update_label(card.update_count),
        })
    }

    /// Applies a status change. Repeating a status is harmless: the
    /// resolution flag is only set when the incident actually crosses the
    /// resolved boundary.
    pub fn change_status(&mut self, incident_id: IncidentId, raw_status: &str) -> StatusPatch {
        let status = IncidentStatus::parse(raw_status);
        let tracked = self.tracked.get(&incident_id).copied().unwrap_or_default();

        let was_resolved = tracked.status.is_some_and(IncidentStatus::is_resolved);
        let now_resolved = status.map_or(was_resolved, IncidentStatus::is_resolved);
        let resolution = (was_resolved != now_resolved).then_some(now_resolved);

        if status.is_some() {
            self.tracked_entry(incident_id).status = status;
        }

        let mut overlay = Overlay::Keep;
        let on_card = match self.card_mut(incident_id) {
            Some(card) => {
                if status.is_some() {
                    card.status = status;
                }
                if now_resolved && !card.resolved {
                    card.resolved = true;
                    overlay = Overlay::Add;
                } else if !now_resolved && card.resolved {
                    card.resolved = false;
                    overlay = Overlay::Remove;
                }
                true
            }
            None => false,
        };

        StatusPatch {
            incident_id,
            label: status.map_or_else(|| format_status(raw_status), |s| s.label().to_string()),
            badge: status.map_or(BadgeClass::Secondary, IncidentStatus::badge_class),
            on_card,
            overlay,
            resolution,
            severity: tracked.severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(id: IncidentId) -> NewIncident {
        NewIncident {
            incident_id: id,
            title: format!("Incident {id}"),
            kind: Some("fire".into()),
            severity: "high".into(),
            status: None,
            location: "Main St".into(),
            timestamp: "2025-03-14 09:00".into(),
            latitude: None,
            longitude: None,
            people_affected: None,
        }
    }

    #[test]
    fn eleventh_push_evicts_the_oldest() {
        let mut feed = IncidentFeed::default();
        for id in 1..=10 {
            feed.push_new(&incident(id));
        }
        assert_eq!(feed.len(), 10);

        let change = feed.push_new(&incident(11));

        let FeedChange::Inserted { evicted, .. } = change else {
            panic!("expected insert");
        };
        assert_eq!(evicted, vec![1]);
        assert_eq!(feed.len(), 10);
        assert_eq!(feed.cards().next().map(|c| c.incident_id), Some(11));
    }

    #[test]
    fn feed_never_exceeds_capacity() {
        let mut feed = IncidentFeed::new(FEED_CAPACITY);
        for id in 0..57 {
            feed.push_new(&incident(id));
            assert!(feed.len() <= FEED_CAPACITY);
        }
    }

    #[test]
    fn oversized_page_list_is_cut_to_capacity() {
        let seeded = (1..=15).rev().map(|id| Card::existing(id, None)).collect();
        let mut feed = IncidentFeed::with_cards(FEED_CAPACITY, seeded);
        assert_eq!(feed.len(), FEED_CAPACITY);
        assert!(feed.card(15).is_some());
        assert!(feed.card(5).is_none());
        assert!(feed.is_tracked(5));

        for id in 16..=18 {
            feed.push_new(&incident(id));
            assert!(feed.len() <= FEED_CAPACITY);
        }
        assert_eq!(feed.cards().next().map(|c| c.incident_id), Some(18));
    }

    #[test]
    fn eviction_drains_every_card_over_capacity() {
        let seeded = (1..=4).rev().map(|id| Card::existing(id, None)).collect();
        let mut feed = IncidentFeed::with_cards(4, seeded);
        feed.capacity = 2;

        let FeedChange::Inserted { evicted, .. } = feed.push_new(&incident(5)) else {
            panic!("expected insert");
        };

        assert_eq!(evicted, vec![1, 2, 3]);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn status_memory_is_bounded_but_keeps_listed_cards() {
        let mut feed = IncidentFeed::default();
        feed.push_new(&incident(0));
        for id in 1..=(TRACKED_CAPACITY as IncidentId + 20) {
            feed.change_status(id, "validated");
        }

        assert!(feed.is_tracked(0));
        assert!(!feed.is_tracked(1));
        assert!(feed.is_tracked(TRACKED_CAPACITY as IncidentId + 20));
        assert!(feed.tracked.len() <= TRACKED_CAPACITY);
    }

    #[test]
    fn incident_reported_resolved_starts_resolved() {
        let mut resolved = incident(9);
        resolved.status = Some("resolved".into());

        let card = Card::from_incident(&resolved);

        assert!(card.resolved);
        assert!(!Card::from_incident(&incident(10)).resolved);
        assert_eq!(card.link(), incident_link(9));
    }

    #[test]
    fn missing_status_badge_markup_is_escaped() {
        let mut feed = IncidentFeed::default();
        feed.push_new(&incident(6));

        let patch = feed.change_status(6, "<b>held</b>");

        assert_eq!(
            patch.badge_html(),
            r#"<span class="ms-2"><span class="badge status-badge bg-secondary">&lt;B&gt;Held&lt;/B&gt;</span></span>"#
        );
        assert_eq!(
            feed.change_status(6, "validated").badge_html(),
            r#"<span class="ms-2"><span class="badge status-badge bg-info">Validated</span></span>"#
        );
    }

    #[test]
    fn repeated_incident_is_not_listed_twice() {
        let mut feed = IncidentFeed::default();
        feed.push_new(&incident(5));
        assert_eq!(feed.push_new(&incident(5)), FeedChange::Duplicate);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn updates_count_up_and_ignore_unlisted_cards() {
        let mut feed = IncidentFeed::default();
        feed.push_new(&incident(2));

        assert_eq!(feed.record_update(2).unwrap().label, "1 new update");
        assert_eq!(feed.record_update(2).unwrap().label, "2 new updates");
        assert!(feed.record_update(99).is_none());
    }

    #[test]
    fn resolving_twice_decrements_once() {
        let mut feed = IncidentFeed::default();
        feed.push_new(&incident(7));

        let first = feed.change_status(7, "resolved");
        assert_eq!(first.resolution, Some(true));
        assert_eq!(first.overlay, Overlay::Add);
        assert_eq!(first.badge, BadgeClass::Success);
        assert_eq!(first.severity, Some(Severity::High));

        let second = feed.change_status(7, "resolved");
        assert_eq!(second.resolution, None);
        assert_eq!(second.overlay, Overlay::Keep);
    }

    #[test]
    fn reopening_a_resolved_incident_counts_back() {
        let mut feed = IncidentFeed::with_cards(
            FEED_CAPACITY,
            vec![Card::existing(3, Some(IncidentStatus::Resolved))],
        );

        let patch = feed.change_status(3, "in_progress");

        assert_eq!(patch.resolution, Some(false));
        assert_eq!(patch.overlay, Overlay::Remove);
        assert_eq!(patch.label, "In Progress");
    }

    #[test]
    fn status_of_unlisted_incidents_is_still_tracked() {
        let mut feed = IncidentFeed::default();

        let patch = feed.change_status(40, "resolved");
        assert!(!patch.on_card);
        assert_eq!(patch.resolution, Some(true));
        assert_eq!(feed.change_status(40, "resolved").resolution, None);
    }

    #[test]
    fn unknown_status_keeps_resolution_and_renders_neutral() {
        let mut feed = IncidentFeed::default();
        feed.push_new(&incident(8));

        let patch = feed.change_status(8, "on_hold");

        assert_eq!(patch.badge, BadgeClass::Secondary);
        assert_eq!(patch.label, "On Hold");
        assert_eq!(patch.resolution, None);
        assert_eq!(patch.badge_class_name(), "badge status-badge bg-secondary");
    }

    #[test]
    fn card_markup_escapes_and_links() {
        let mut record = incident(4);
        record.title = "Gas & smoke".into();

        let card = Card::from_incident(&record);

        let html = card.card_html();
        assert!(html.contains("Gas &amp; smoke"));
        assert!(html.contains(r#"<span class="badge bg-warning">HIGH</span>"#));
        assert!(html.contains(r#"href="/incidents/4""#));
        assert!(card.list_item_html().contains("Main St"));
    }
}
