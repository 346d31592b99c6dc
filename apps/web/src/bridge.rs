//! Thin JavaScript shims over Google Maps, Chart.js and Bootstrap.
//!
//! Widget objects stay opaque `JsValue`s on the Rust side; every call that
//! can throw is bound with `catch`.

use wasm_bindgen::prelude::*;

#[wasm_bindgen(inline_js = "
export function maps_loaded() {
    return !!(window.google && window.google.maps);
}

export function maps_script_present() {
    return !!document.querySelector('script[src*=\"maps.googleapis.com/maps/api/js\"]');
}

export function inject_maps_script(key, on_ready) {
    window.initMap = on_ready;
    const script = document.createElement('script');
    script.src = `https://maps.googleapis.com/maps/api/js?key=${encodeURIComponent(key)}&libraries=places&callback=initMap&loading=async`;
    script.async = true;
    script.defer = true;
    document.head.appendChild(script);
}

export function set_init_callback(on_ready) {
    window.initMap = on_ready;
}

export function create_map(element, lat, lng, zoom) {
    return new google.maps.Map(element, {
        zoom: zoom,
        center: { lat, lng },
        mapTypeId: google.maps.MapTypeId.ROADMAP,
        mapTypeControl: true,
        mapTypeControlOptions: { style: google.maps.MapTypeControlStyle.DROPDOWN_MENU },
        fullscreenControl: true,
        streetViewControl: false,
        zoomControl: true,
    });
}

export function add_marker(map, lat, lng, title, icon_url, user_dot, drop, panel_html, on_click) {
    const options = { position: { lat, lng }, map, title };
    if (user_dot) {
        options.icon = {
            path: google.maps.SymbolPath.CIRCLE,
            scale: 10,
            fillColor: '#4285F4',
            fillOpacity: 1,
            strokeColor: '#FFFFFF',
            strokeWeight: 2,
        };
    } else if (icon_url) {
        options.icon = icon_url;
    }
    if (drop) {
        options.animation = google.maps.Animation.DROP;
    }
    const marker = new google.maps.Marker(options);
    if (panel_html) {
        marker.__panel = new google.maps.InfoWindow({ content: panel_html, maxWidth: 300 });
    }
    marker.addListener('click', on_click);
    return marker;
}

export function remove_marker(marker) {
    if (marker.__panel) marker.__panel.close();
    marker.setMap(null);
}

export function move_marker(marker, lat, lng) {
    marker.setPosition({ lat, lng });
}

export function open_panel(map, marker) {
    if (marker.__panel) marker.__panel.open(map, marker);
}

export function close_panel(marker) {
    if (marker.__panel) marker.__panel.close();
}

export function fit_bounds(map, south, west, north, east) {
    map.fitBounds(new google.maps.LatLngBounds({ lat: south, lng: west }, { lat: north, lng: east }));
}

export function get_zoom(map) {
    const zoom = map.getZoom();
    return typeof zoom === 'number' ? zoom : NaN;
}

export function set_zoom(map, zoom) { map.setZoom(zoom); }

export function set_center(map, lat, lng) { map.setCenter({ lat, lng }); }

export function on_map_click(map, handler) {
    map.addListener('click', (event) => handler(event.latLng.lat(), event.latLng.lng()));
}

export function on_map_idle(map, handler) {
    map.addListener('idle', handler);
}

export function reverse_geocode(lat, lng) {
    return new Promise((resolve) => {
        new google.maps.Geocoder().geocode({ location: { lat, lng } }, (results, status) => {
            resolve(status === 'OK' && results[0] ? results[0].formatted_address : null);
        });
    });
}

export function current_position() {
    return new Promise((resolve, reject) => {
        if (!navigator.geolocation) {
            reject(new Error('geolocation unavailable'));
            return;
        }
        navigator.geolocation.getCurrentPosition(
            (position) => resolve([position.coords.latitude, position.coords.longitude]),
            (error) => reject(error),
        );
    });
}

export function create_chart(canvas, config) {
    return new Chart(canvas, config);
}

export function chart_set_value(chart, index, value) {
    chart.data.datasets[0].data[index] = value;
    chart.update();
}

export function chart_push(chart, label, value, color) {
    chart.data.labels.push(label);
    chart.data.datasets[0].data.push(value);
    chart.data.datasets[0].backgroundColor.push(color);
    chart.update();
}

export function show_toast(element, delay) {
    new bootstrap.Toast(element, { autohide: true, delay }).show();
}

export function show_modal(element) {
    new bootstrap.Modal(element).show();
}
")]
extern "C" {
    pub fn maps_loaded() -> bool;

    pub fn maps_script_present() -> bool;

    pub fn inject_maps_script(key: &str, on_ready: &JsValue);

    pub fn set_init_callback(on_ready: &JsValue);

    #[wasm_bindgen(catch)]
    pub fn create_map(element: &web_sys::Element, lat: f64, lng: f64, zoom: f64)
        -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub fn add_marker(
        map: &JsValue,
        lat: f64,
        lng: f64,
        title: &str,
        icon_url: &str,
        user_dot: bool,
        drop_anim: bool,
        panel_html: &str,
        on_click: &JsValue,
    ) -> Result<JsValue, JsValue>;

    pub fn remove_marker(marker: &JsValue);

    pub fn move_marker(marker: &JsValue, lat: f64, lng: f64);

    pub fn open_panel(map: &JsValue, marker: &JsValue);

    pub fn close_panel(marker: &JsValue);

    pub fn fit_bounds(map: &JsValue, south: f64, west: f64, north: f64, east: f64);

    pub fn get_zoom(map: &JsValue) -> f64;

    pub fn set_zoom(map: &JsValue, zoom: f64);

    pub fn set_center(map: &JsValue, lat: f64, lng: f64);

    pub fn on_map_click(map: &JsValue, handler: &JsValue);

    pub fn on_map_idle(map: &JsValue, handler: &JsValue);

    pub fn reverse_geocode(lat: f64, lng: f64) -> js_sys::Promise;

    pub fn current_position() -> js_sys::Promise;

    #[wasm_bindgen(catch)]
    pub fn create_chart(canvas: &web_sys::Element, config: &JsValue) -> Result<JsValue, JsValue>;

    pub fn chart_set_value(chart: &JsValue, index: usize, value: f64);

    pub fn chart_push(chart: &JsValue, label: &str, value: f64, color: &str);

    #[wasm_bindgen(catch)]
    pub fn show_toast(element: &web_sys::Element, delay: u32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    pub fn show_modal(element: &web_sys::Element) -> Result<(), JsValue>;
}
