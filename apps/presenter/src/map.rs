//! Incident and resource markers on the map.
//!
//! [`MapPresenter`] owns the marker bookkeeping and drives a [`MapWidget`],
//! which the wasm shell implements on Google Maps.

use crate::domain::{severity_marker, status_badge, MarkerColor};
use crate::dto::{Incident, MapData, Numeric, Resource};
use crate::error::{PresenterError, Result};
use crate::format::{escape_html, format_created_at, format_incident_type, format_status};

pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 37.7749,
    lng: -122.4194,
};
pub const DEFAULT_ZOOM: f64 = 10.0;
/// Closest zoom after fitting the full map to its markers.
pub const MAX_FIT_ZOOM: f64 = 15.0;
/// Closest zoom on the home page preview.
pub const MAX_PREVIEW_ZOOM: f64 = 12.0;

pub const USER_LOCATION_TITLE: &str = "Your Location";
pub const SELECTED_LOCATION_TITLE: &str = "Selected Location";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Rejects non-finite and out-of-range values.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}

/// Checks that a record has usable coordinates. Zero is a valid coordinate.
pub fn validate_coordinates(
    record: &str,
    latitude: Option<&Numeric>,
    longitude: Option<&Numeric>,
) -> Result<LatLng> {
    let invalid = |reason: &str| PresenterError::InvalidCoordinates {
        record: record.to_string(),
        reason: reason.to_string(),
    };

    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return Err(invalid("missing latitude or longitude"));
    };
    let (Some(lat), Some(lng)) = (latitude.as_f64(), longitude.as_f64()) else {
        return Err(invalid("not a number"));
    };
    LatLng::checked(lat, lng).ok_or_else(|| invalid("out of range"))
}

/// Parses coordinates typed into the report form.
pub fn parse_typed_coordinates(lat: &str, lng: &str) -> Result<LatLng> {
    validate_coordinates(
        "selected location",
        Some(&Numeric::Text(lat.to_string())),
        Some(&Numeric::Text(lng.to_string())),
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub const fn around(point: LatLng) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    pub fn extend(&mut self, point: LatLng) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    pub fn enclosing(points: impl IntoIterator<Item = LatLng>) -> Option<Self> {
        let mut points = points.into_iter();
        let mut bounds = Self::around(points.next()?);
        for point in points {
            bounds.extend(point);
        }
        Some(bounds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerIcon {
    /// The widget's stock pin.
    Default,
    Pin(MarkerColor),
    /// Blue dot for the user's own position.
    UserDot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub title: String,
    pub icon: MarkerIcon,
    /// Info panel content, already escaped.
    pub panel_html: Option<String>,
    pub drop_animation: bool,
}

pub type MarkerId = usize;

/// The map widget the presenter drives.
pub trait MapWidget {
    fn add_marker(&mut self, id: MarkerId, spec: &MarkerSpec);
    fn remove_marker(&mut self, id: MarkerId);
    fn move_marker(&mut self, id: MarkerId, position: LatLng);
    fn open_panel(&mut self, id: MarkerId);
    fn close_panel(&mut self, id: MarkerId);
    fn fit_bounds(&mut self, bounds: Bounds);
    fn zoom(&self) -> Option<f64>;
    fn set_zoom(&mut self, zoom: f64);
    fn set_center(&mut self, position: LatLng);
}

pub fn incident_panel(incident: &Incident) -> String {
    let status = status_badge(&incident.status);
    let severity = crate::domain::severity_badge(&incident.severity);
    format!(
        concat!(
            r#"<div class="p-2"><h5>{title}</h5>"#,
            r#"<p><span class="badge bg-{sev_class}">{severity}</span> "#,
            r#"<span class="badge bg-{status_class}">{status}</span></p>"#,
            r#"<p><strong>Type:</strong> {kind}<br><strong>Reported:</strong> {reported}<br>"#,
            r#"<strong>By:</strong> {by}</p>"#,
            r#"<a href="/incidents/{id}" class="btn btn-sm btn-primary">View Details</a></div>"#
        ),
        title = escape_html(&incident.title),
        sev_class = severity.as_str(),
        severity = escape_html(&incident.severity.to_uppercase()),
        status_class = status.as_str(),
        status = escape_html(&format_status(&incident.status)),
        kind = escape_html(&format_incident_type(incident.kind.as_deref())),
        reported = escape_html(&format_created_at(incident.created_at.as_deref())),
        by = escape_html(incident.reported_by.as_deref().unwrap_or("Unknown")),
        id = incident.id,
    )
}

pub fn resource_panel(resource: &Resource) -> String {
    let quantity = match &resource.quantity {
        Some(Numeric::Number(value)) => value.to_string(),
        Some(Numeric::Text(text)) => text.clone(),
        None => "Unknown".to_string(),
    };
    format!(
        concat!(
            r#"<div class="p-2"><h5>{title}</h5>"#,
            r#"<p><span class="badge bg-success">Resource</span> "#,
            r#"<span class="badge bg-primary">{kind}</span></p>"#,
            r#"<p><strong>Quantity:</strong> {quantity}<br>"#,
            r#"<strong>Contributed:</strong> {contributed}<br>"#,
            r#"<strong>By:</strong> {by}</p></div>"#
        ),
        title = escape_html(&resource.title),
        kind = escape_html(&format_incident_type(resource.kind.as_deref())),
        quantity = escape_html(&quantity),
        contributed = escape_html(&format_created_at(resource.created_at.as_deref())),
        by = escape_html(resource.reported_by.as_deref().unwrap_or("Unknown")),
    )
}

/// Fixed markers shown on the home page preview map.
pub const SAMPLE_LOCATIONS: [(f64, f64, &str, &str); 4] = [
    (37.7749, -122.4194, "high", "Fire Incident"),
    (37.8044, -122.2712, "medium", "Power Outage"),
    (37.7275, -122.1553, "low", "Road Closure"),
    (37.5630, -122.3255, "critical", "Medical Emergency"),
];

#[derive(Debug, Clone, Copy)]
struct Placed {
    id: MarkerId,
    position: LatLng,
}

pub struct MapPresenter<W: MapWidget> {
    widget: W,
    markers: Vec<Placed>,
    next_id: MarkerId,
    open_panel: Option<MarkerId>,
    user_location: Option<LatLng>,
    user_marker: Option<MarkerId>,
    selection: Option<MarkerId>,
    zoom_cap: Option<f64>,
}

impl<W: MapWidget> MapPresenter<W> {
    pub const fn new(widget: W) -> Self {
        Self {
            widget,
            markers: Vec::new(),
            next_id: 0,
            open_panel: None,
            user_location: None,
            user_marker: None,
            selection: None,
            zoom_cap: None,
        }
    }

    pub const fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub const fn user_location(&self) -> Option<LatLng> {
        self.user_location
    }

    fn place(&mut self, spec: &MarkerSpec) -> MarkerId {
        let id = self.next_id;
        self.next_id += 1;
        self.widget.add_marker(id, spec);
        id
    }

    fn place_tracked(&mut self, spec: &MarkerSpec) -> MarkerId {
        let id = self.place(spec);
        self.markers.push(Placed {
            id,
            position: spec.position,
        });
        id
    }

    pub fn clear_markers(&mut self) {
        for placed in self.markers.drain(..) {
            self.widget.remove_marker(placed.id);
        }
        self.open_panel = None;
    }

    /// Replaces every data marker and fits the view to them. Returns how
    /// many markers were placed.
    pub fn load_all(&mut self, data: &MapData) -> usize {
        self.clear_markers();

        for incident in &data.incidents {
            self.add_incident_marker(incident);
        }
        for resource in &data.resources {
            self.add_resource_marker(resource);
        }

        let points = self
            .markers
            .iter()
            .map(|placed| placed.position)
            .chain(self.user_location);
        if !self.markers.is_empty() {
            if let Some(bounds) = Bounds::enclosing(points) {
                self.widget.fit_bounds(bounds);
                self.zoom_cap = Some(MAX_FIT_ZOOM);
                self.enforce_zoom_cap();
            }
        }

        log::info!(
            "placed {} of {} map records",
            self.markers.len(),
            data.incidents.len() + data.resources.len()
        );
        self.markers.len()
    }

    /// Pulls the zoom back to the cap set by the last fit. The shell also
    /// calls this once the widget settles, since fitting can be deferred.
    pub fn enforce_zoom_cap(&mut self) {
        let Some(cap) = self.zoom_cap else {
            return;
        };
        if self.widget.zoom().is_some_and(|zoom| zoom > cap) {
            self.widget.set_zoom(cap);
        }
    }

    pub fn add_incident_marker(&mut self, incident: &Incident) -> Option<MarkerId> {
        let record = format!("incident {}", incident.id);
        let position = validate_coordinates(
            &record,
            incident.latitude.as_ref(),
            incident.longitude.as_ref(),
        )
        .map_err(|error| log::error!("{error}"))
        .ok()?;

        Some(self.place_tracked(&MarkerSpec {
            position,
            title: incident.title.clone(),
            icon: MarkerIcon::Pin(severity_marker(&incident.severity)),
            panel_html: Some(incident_panel(incident)),
            drop_animation: true,
        }))
    }

    pub fn add_resource_marker(&mut self, resource: &Resource) -> Option<MarkerId> {
        let record = format!("resource {}", resource.id);
        let position = validate_coordinates(
            &record,
            resource.latitude.as_ref(),
            resource.longitude.as_ref(),
        )
        .map_err(|error| log::error!("{error}"))
        .ok()?;

        Some(self.place_tracked(&MarkerSpec {
            position,
            title: resource.title.clone(),
            icon: MarkerIcon::Pin(MarkerColor::Green),
            panel_html: Some(resource_panel(resource)),
            drop_animation: true,
        }))
    }

    /// Opens the panel of `id`, closing whichever panel was open before.
    pub fn on_marker_click(&mut self, id: MarkerId) {
        if let Some(previous) = self.open_panel.filter(|previous| *previous != id) {
            self.widget.close_panel(previous);
        }
        self.widget.open_panel(id);
        self.open_panel = Some(id);
    }

    pub fn set_user_location(&mut self, position: LatLng) {
        self.user_location = Some(position);
        self.widget.set_center(position);
        match self.user_marker {
            Some(id) => self.widget.move_marker(id, position),
            None => {
                let id = self.place(&MarkerSpec {
                    position,
                    title: USER_LOCATION_TITLE.to_string(),
                    icon: MarkerIcon::UserDot,
                    panel_html: Some(format!(
                        r#"<div class="p-2"><strong>{USER_LOCATION_TITLE}</strong></div>"#
                    )),
                    drop_animation: false,
                });
                self.user_marker = Some(id);
            }
        }
    }

    /// Places the single report-form marker, or moves it if it exists.
    pub fn select_location(&mut self, position: LatLng) -> MarkerId {
        match self.selection {
            Some(id) => {
                self.widget.move_marker(id, position);
                id
            }
            None => {
                let id = self.place(&MarkerSpec {
                    position,
                    title: SELECTED_LOCATION_TITLE.to_string(),
                    icon: MarkerIcon::Default,
                    panel_html: None,
                    drop_animation: true,
                });
                self.selection = Some(id);
                id
            }
        }
    }

    /// Applies coordinates typed into the report form.
    pub fn update_selected_location(&mut self, lat: &str, lng: &str) -> Result<LatLng> {
        let position = parse_typed_coordinates(lat, lng)?;
        self.widget.set_center(position);
        self.select_location(position);
        Ok(position)
    }

    /// Home page preview: sample markers only, zoom capped at 12.
    pub fn show_preview(&mut self) {
        self.clear_markers();
        for (lat, lng, severity, title) in SAMPLE_LOCATIONS {
            let position = LatLng { lat, lng };
            self.place_tracked(&MarkerSpec {
                position,
                title: title.to_string(),
                icon: MarkerIcon::Pin(severity_marker(severity)),
                panel_html: Some(format!(
                    r#"<div class="p-2"><strong>{title}</strong><br>Severity: {severity}</div>"#
                )),
                drop_animation: true,
            });
        }
        if let Some(bounds) = Bounds::enclosing(self.markers.iter().map(|placed| placed.position)) {
            self.widget.fit_bounds(bounds);
        }
        self.zoom_cap = Some(MAX_PREVIEW_ZOOM);
        self.enforce_zoom_cap();
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;

    /// Widget double that remembers what the presenter asked for.
    #[derive(Default)]
    pub struct RecordingWidget {
        pub markers: BTreeMap<MarkerId, MarkerSpec>,
        pub open: BTreeSet<MarkerId>,
        pub fitted: Vec<Bounds>,
        pub zoom: Option<f64>,
        pub center: Option<LatLng>,
        pub zoom_after_fit: Option<f64>,
    }

    impl MapWidget for RecordingWidget {
        fn add_marker(&mut self, id: MarkerId, spec: &MarkerSpec) {
            self.markers.insert(id, spec.clone());
        }

        fn remove_marker(&mut self, id: MarkerId) {
            self.markers.remove(&id);
            self.open.remove(&id);
        }

        fn move_marker(&mut self, id: MarkerId, position: LatLng) {
            if let Some(spec) = self.markers.get_mut(&id) {
                spec.position = position;
            }
        }

        fn open_panel(&mut self, id: MarkerId) {
            self.open.insert(id);
        }

        fn close_panel(&mut self, id: MarkerId) {
            self.open.remove(&id);
        }

        fn fit_bounds(&mut self, bounds: Bounds) {
            self.fitted.push(bounds);
            self.zoom = self.zoom_after_fit;
        }

        fn zoom(&self) -> Option<f64> {
            self.zoom
        }

        fn set_zoom(&mut self, zoom: f64) {
            self.zoom = Some(zoom);
        }

        fn set_center(&mut self, position: LatLng) {
            self.center = Some(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::RecordingWidget;
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::backend::Backend;

    fn incident(id: i64, lat: Option<Numeric>, lng: Option<Numeric>) -> Incident {
        Incident {
            id,
            title: format!("Incident {id}"),
            kind: Some("fire_hazard".into()),
            severity: "critical".into(),
            status: "in_progress".into(),
            latitude: lat,
            longitude: lng,
            reported_by: None,
            created_at: None,
        }
    }

    fn at(lat: f64, lng: f64) -> (Option<Numeric>, Option<Numeric>) {
        (Some(Numeric::Number(lat)), Some(Numeric::Number(lng)))
    }

    #[test]
    fn invalid_coordinates_leave_the_widget_untouched() {
        let mut map = MapPresenter::new(RecordingWidget::default());

        assert!(map.add_incident_marker(&incident(1, None, None)).is_none());
        let (lat, lng) = at(91.0, 0.0);
        assert!(map.add_incident_marker(&incident(2, lat, lng)).is_none());
        assert!(map
            .add_incident_marker(&incident(
                3,
                Some(Numeric::Text("abc".into())),
                Some(Numeric::Number(1.0))
            ))
            .is_none());

        assert!(map.widget().markers.is_empty());
    }

    #[test]
    fn zero_is_a_valid_coordinate() {
        let mut map = MapPresenter::new(RecordingWidget::default());
        let (lat, lng) = at(0.0, 0.0);
        assert!(map.add_incident_marker(&incident(1, lat, lng)).is_some());
    }

    #[test]
    fn marker_color_follows_severity_and_resources_are_green() {
        let mut map = MapPresenter::new(RecordingWidget::default());
        let (lat, lng) = at(10.0, 10.0);
        let incident_id = map.add_incident_marker(&incident(1, lat.clone(), lng.clone())).unwrap();
        let resource_id = map
            .add_resource_marker(&Resource {
                id: 5,
                title: "Water".into(),
                kind: Some("supplies".into()),
                quantity: Some(Numeric::Number(40.0)),
                location: None,
                latitude: lat,
                longitude: lng,
                reported_by: Some("Ana".into()),
                created_at: None,
            })
            .unwrap();

        let markers = &map.widget().markers;
        assert_eq!(markers[&incident_id].icon, MarkerIcon::Pin(MarkerColor::Red));
        assert_eq!(markers[&resource_id].icon, MarkerIcon::Pin(MarkerColor::Green));
        let panel = markers[&resource_id].panel_html.clone().unwrap();
        assert!(panel.contains("<strong>Quantity:</strong> 40"));
    }

    #[test]
    fn incident_panel_escapes_and_links() {
        let mut record = incident(12, None, None);
        record.title = "<script>alert(1)</script>".into();

        let panel = incident_panel(&record);

        assert!(panel.contains("&lt;script&gt;"));
        assert!(!panel.contains("<script>"));
        assert!(panel.contains(r#"href="/incidents/12""#));
        assert!(panel.contains("Fire Hazard"));
        assert!(panel.contains(r#"badge bg-primary">In Progress"#));
    }

    #[test]
    fn only_one_panel_is_open_at_a_time() {
        let mut map = MapPresenter::new(RecordingWidget::default());
        let (lat, lng) = at(1.0, 1.0);
        let first = map.add_incident_marker(&incident(1, lat.clone(), lng.clone())).unwrap();
        let second = map.add_incident_marker(&incident(2, lat, lng)).unwrap();

        map.on_marker_click(first);
        map.on_marker_click(second);
        map.on_marker_click(second);

        assert_eq!(map.widget().open.iter().copied().collect::<Vec<_>>(), vec![second]);
    }

    #[test]
    fn load_all_fits_markers_and_user_location_with_zoom_cap() {
        let mut map = MapPresenter::new(RecordingWidget {
            zoom_after_fit: Some(18.0),
            ..RecordingWidget::default()
        });
        map.set_user_location(LatLng { lat: 5.0, lng: 5.0 });
        let (lat, lng) = at(1.0, 2.0);
        let data = MapData {
            incidents: vec![incident(1, lat, lng), incident(2, None, None)],
            resources: Vec::new(),
        };

        assert_eq!(map.load_all(&data), 1);

        let bounds = map.widget().fitted[0];
        assert_eq!((bounds.south, bounds.west, bounds.north, bounds.east), (1.0, 2.0, 5.0, 5.0));
        assert_eq!(map.widget().zoom, Some(MAX_FIT_ZOOM));
    }

    #[test]
    fn reload_replaces_markers_and_skips_fit_when_empty() {
        let mut map = MapPresenter::new(RecordingWidget::default());
        let (lat, lng) = at(1.0, 2.0);
        map.load_all(&MapData {
            incidents: vec![incident(1, lat, lng)],
            resources: Vec::new(),
        });

        map.load_all(&MapData::default());

        assert_eq!(map.marker_count(), 0);
        assert!(map.widget().markers.is_empty());
        assert_eq!(map.widget().fitted.len(), 1);
    }

    #[test]
    fn selecting_twice_moves_the_same_marker() {
        let mut map = MapPresenter::new(RecordingWidget::default());

        let first = map.select_location(LatLng { lat: 1.0, lng: 1.0 });
        let second = map.select_location(LatLng { lat: 2.0, lng: 2.0 });

        assert_eq!(first, second);
        assert_eq!(map.widget().markers.len(), 1);
        assert_eq!(map.widget().markers[&first].position, LatLng { lat: 2.0, lng: 2.0 });
    }

    #[test]
    fn typed_coordinates_are_validated() {
        let mut map = MapPresenter::new(RecordingWidget::default());

        assert!(map.update_selected_location("north", "2").is_err());
        assert!(map.update_selected_location("12", "181").is_err());
        assert!(map.widget().markers.is_empty());

        let position = map.update_selected_location(" 12.5", "-3").unwrap();
        assert_eq!(map.widget().center, Some(position));
    }

    #[test]
    fn preview_shows_samples_capped_at_twelve() {
        let mut map = MapPresenter::new(RecordingWidget {
            zoom_after_fit: Some(14.0),
            ..RecordingWidget::default()
        });

        map.show_preview();

        assert_eq!(map.marker_count(), SAMPLE_LOCATIONS.len());
        assert_eq!(map.widget().zoom, Some(MAX_PREVIEW_ZOOM));
    }

    #[tokio::test]
    async fn map_data_from_backend_becomes_markers() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let backend = FakeBackend {
            map_data: Some(
                r#"{"incidents": [{"id": 1, "title": "Flood", "severity": "low",
                                   "latitude": "40.1", "longitude": "-3.2"}],
                    "resources": [{"id": 2, "title": "Blankets", "quantity": 30,
                                   "latitude": 40.2, "longitude": -3.1}]}"#
                    .into(),
            ),
            ..FakeBackend::default()
        };
        let mut map = MapPresenter::new(RecordingWidget::default());

        let data = backend.fetch_map_data().await?;
        let placed = map.load_all(&data);

        assert_eq!(placed, 2);
        Ok(())
    }
}
