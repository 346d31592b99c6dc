//! Google Maps implementation of [`MapWidget`] and the map page wiring.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crisis_presenter::backend::Backend;
use crisis_presenter::config::PageConfig;
use crisis_presenter::dto::NewIncident;
use crisis_presenter::map::{
    Bounds, LatLng, MapPresenter, MapWidget, MarkerIcon, MarkerId, MarkerSpec, DEFAULT_CENTER,
    DEFAULT_ZOOM,
};
use crisis_presenter::stream::EventSink;
use crisis_presenter::Result;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::Element;

use crate::http::HttpBackend;
use crate::{bridge, dom};

pub type SharedMap = Rc<RefCell<Option<MapPresenter<GoogleMapWidget>>>>;

struct Placed {
    marker: JsValue,
    _on_click: Closure<dyn FnMut()>,
}

pub struct GoogleMapWidget {
    map: JsValue,
    markers: HashMap<MarkerId, Placed>,
    shared: Weak<RefCell<Option<MapPresenter<GoogleMapWidget>>>>,
}

impl GoogleMapWidget {
    fn new(element: &Element, shared: &SharedMap) -> Result<Self> {
        let map = bridge::create_map(element, DEFAULT_CENTER.lat, DEFAULT_CENTER.lng, DEFAULT_ZOOM)
            .map_err(dom::js_error)?;
        Ok(Self {
            map,
            markers: HashMap::new(),
            shared: Rc::downgrade(shared),
        })
    }
}

impl MapWidget for GoogleMapWidget {
    fn add_marker(&mut self, id: MarkerId, spec: &MarkerSpec) {
        let shared = self.shared.clone();
        // Fires from the browser event loop, never while the presenter is borrowed.
        let on_click = Closure::wrap(Box::new(move || {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if let Some(presenter) = shared.borrow_mut().as_mut() {
                presenter.on_marker_click(id);
            };
        }) as Box<dyn FnMut()>);

        let (icon_url, user_dot) = match spec.icon {
            MarkerIcon::Default => (String::new(), false),
            MarkerIcon::Pin(color) => (color.icon_url(), false),
            MarkerIcon::UserDot => (String::new(), true),
        };

        match bridge::add_marker(
            &self.map,
            spec.position.lat,
            spec.position.lng,
            &spec.title,
            &icon_url,
            user_dot,
            spec.drop_animation,
            spec.panel_html.as_deref().unwrap_or_default(),
            on_click.as_ref(),
        ) {
            Ok(marker) => {
                self.markers.insert(
                    id,
                    Placed {
                        marker,
                        _on_click: on_click,
                    },
                );
            }
            Err(error) => log::error!("error creating marker {}: {error:?}", spec.title),
        }
    }

    fn remove_marker(&mut self, id: MarkerId) {
        if let Some(placed) = self.markers.remove(&id) {
            bridge::remove_marker(&placed.marker);
        }
    }

    fn move_marker(&mut self, id: MarkerId, position: LatLng) {
        if let Some(placed) = self.markers.get(&id) {
            bridge::move_marker(&placed.marker, position.lat, position.lng);
        }
    }

    fn open_panel(&mut self, id: MarkerId) {
        if let Some(placed) = self.markers.get(&id) {
            bridge::open_panel(&self.map, &placed.marker);
        }
    }

    fn close_panel(&mut self, id: MarkerId) {
        if let Some(placed) = self.markers.get(&id) {
            bridge::close_panel(&placed.marker);
        }
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        bridge::fit_bounds(&self.map, bounds.south, bounds.west, bounds.north, bounds.east);
    }

    fn zoom(&self) -> Option<f64> {
        let zoom = bridge::get_zoom(&self.map);
        zoom.is_finite().then_some(zoom)
    }

    fn set_zoom(&mut self, zoom: f64) {
        bridge::set_zoom(&self.map, zoom);
    }

    fn set_center(&mut self, position: LatLng) {
        bridge::set_center(&self.map, position.lat, position.lng);
    }
}

enum MapPage {
    /// `#map`: live data, geolocation and the report form.
    Full(Element),
    /// `#map-preview` on the home page.
    Preview(Element),
}

/// Loads Google Maps if needed and sets up whichever map the page has.
pub fn mount(config: &PageConfig, backend: Rc<HttpBackend>) -> Option<SharedMap> {
    let page = dom::by_id("map")
        .map(MapPage::Full)
        .or_else(|| dom::by_id("map-preview").map(MapPage::Preview))?;

    let shared: SharedMap = Rc::new(RefCell::new(None));
    let ready = {
        let shared = Rc::clone(&shared);
        move || {
            if let Err(error) = init(&shared, &page, backend) {
                log::error!("error initializing map: {error}");
            }
        }
    };

    if bridge::maps_loaded() {
        ready();
    } else {
        let callback = Closure::once_into_js(ready);
        if bridge::maps_script_present() {
            bridge::set_init_callback(&callback);
        } else if let Some(key) = &config.google_api_key {
            log::info!("loading Google Maps");
            bridge::inject_maps_script(key, &callback);
        } else {
            log::error!("google-api-key meta tag missing, map disabled");
        }
    }
    Some(shared)
}

fn init(shared: &SharedMap, page: &MapPage, backend: Rc<HttpBackend>) -> Result<()> {
    let element = match page {
        MapPage::Full(element) | MapPage::Preview(element) => element,
    };
    let widget = GoogleMapWidget::new(element, shared)?;
    let map = widget.map.clone();
    *shared.borrow_mut() = Some(MapPresenter::new(widget));

    let weak = Rc::downgrade(shared);
    let on_idle = Closure::wrap(Box::new(move || {
        if let Some(shared) = weak.upgrade() {
            if let Some(presenter) = shared.borrow_mut().as_mut() {
                presenter.enforce_zoom_cap();
            }
        }
    }) as Box<dyn FnMut()>);
    bridge::on_map_idle(&map, on_idle.as_ref());
    on_idle.forget();

    match page {
        MapPage::Preview(_) => {
            if let Some(presenter) = shared.borrow_mut().as_mut() {
                presenter.show_preview();
            }
        }
        MapPage::Full(_) => {
            locate_user(shared);
            wire_report_form(shared, &map);
            refresh(shared, backend);
        }
    }
    Ok(())
}

/// Fetches `/api/map-data` and replaces the markers. The presenter is only
/// borrowed after the response arrives.
pub fn refresh(shared: &SharedMap, backend: Rc<HttpBackend>) {
    let weak = Rc::downgrade(shared);
    spawn_local(async move {
        let data = match backend.fetch_map_data().await {
            Ok(data) => data,
            Err(error) => {
                log::error!("error loading map data: {error}");
                return;
            }
        };
        if let Some(shared) = weak.upgrade() {
            if let Some(presenter) = shared.borrow_mut().as_mut() {
                presenter.load_all(&data);
            }
        }
    });
}

fn has_report_form() -> bool {
    dom::input("latitude").is_some() && dom::input("longitude").is_some()
}

fn fill_location_fields(position: LatLng) {
    dom::set_input_value("latitude", &position.lat.to_string());
    dom::set_input_value("longitude", &position.lng.to_string());
    fill_address(position);
}

fn fill_address(position: LatLng) {
    if dom::input("address").is_none() {
        return;
    }
    spawn_local(async move {
        match JsFuture::from(bridge::reverse_geocode(position.lat, position.lng)).await {
            Ok(address) => {
                if let Some(address) = address.as_string() {
                    dom::set_input_value("address", &address);
                }
            }
            Err(error) => log::warn!("reverse geocoding failed: {error:?}"),
        }
    });
}

fn locate_user(shared: &SharedMap) {
    let weak = Rc::downgrade(shared);
    spawn_local(async move {
        let coords = match JsFuture::from(bridge::current_position()).await {
            Ok(coords) => coords,
            Err(error) => {
                log::warn!("geolocation unavailable: {error:?}");
                return;
            }
        };
        let coords = js_sys::Array::from(&coords);
        let (Some(lat), Some(lng)) = (coords.get(0).as_f64(), coords.get(1).as_f64()) else {
            return;
        };
        let Some(position) = LatLng::checked(lat, lng) else {
            return;
        };
        let Some(shared) = weak.upgrade() else {
            return;
        };
        if let Some(presenter) = shared.borrow_mut().as_mut() {
            presenter.set_user_location(position);
        }
        if has_report_form() {
            fill_location_fields(position);
        }
    });
}

fn wire_report_form(shared: &SharedMap, map: &JsValue) {
    if !has_report_form() {
        return;
    }

    let weak = Rc::downgrade(shared);
    let on_click = Closure::wrap(Box::new(move |lat: f64, lng: f64| {
        let Some(position) = LatLng::checked(lat, lng) else {
            return;
        };
        if let Some(shared) = weak.upgrade() {
            if let Some(presenter) = shared.borrow_mut().as_mut() {
                presenter.select_location(position);
            }
        }
        fill_location_fields(position);
    }) as Box<dyn FnMut(f64, f64)>);
    bridge::on_map_click(map, on_click.as_ref());
    on_click.forget();

    for id in ["latitude", "longitude"] {
        let Some(input) = dom::input(id) else {
            continue;
        };
        let weak = Rc::downgrade(shared);
        dom::listen(&input, "change", move |_| {
            let (Some(lat), Some(lng)) = (dom::input("latitude"), dom::input("longitude")) else {
                return;
            };
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let typed = shared
                .borrow_mut()
                .as_mut()
                .map(|presenter| presenter.update_selected_location(&lat.value(), &lng.value()));
            match typed {
                Some(Ok(position)) => fill_address(position),
                Some(Err(error)) => log::warn!("{error}"),
                None => {}
            }
        });
    }
}

/// Drops a marker for each incident reported while the page is open.
pub struct MapSink {
    shared: SharedMap,
}

impl MapSink {
    pub const fn new(shared: SharedMap) -> Self {
        Self { shared }
    }
}

impl EventSink for MapSink {
    fn name(&self) -> &'static str {
        "map"
    }

    fn on_new_incident(&mut self, incident: &NewIncident) -> Result<()> {
        if let Some(presenter) = self.shared.borrow_mut().as_mut() {
            presenter.add_incident_marker(&incident.as_map_incident());
        }
        Ok(())
    }
}
