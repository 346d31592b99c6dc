mod animation;
mod bridge;
mod charts;
mod chat;
mod detail;
mod dom;
mod feed;
mod filters;
mod http;
mod map;
mod recommend;
mod stream;
mod toast;

use std::rc::Rc;

use crisis_presenter::config::PageConfig;
use crisis_presenter::stream::EventSink;

use crate::charts::{DashboardSink, DashboardView};
use crate::detail::DetailSink;
use crate::dom::DomEnv;
use crate::feed::FeedSink;
use crate::http::HttpBackend;
use crate::map::{MapSink, SharedMap};
use crate::stream::SharedDriver;

/// State that has to outlive `main`; callbacks only hold weak references.
struct Page {
    _stream: SharedDriver,
    _map: Option<SharedMap>,
}

fn main() {
    console_error_panic_hook::set_once();

    let config = PageConfig::from_env(&DomEnv);
    wasm_logger::init(wasm_logger::Config::new(config.log_level));
    log::info!("starting CrisisConnect front end, stream at {}", config.stream_url);

    let backend = Rc::new(HttpBackend::new(config.api_base.clone()));

    let full_map = dom::by_id("map").is_some();
    let map = map::mount(&config, Rc::clone(&backend));
    let dashboard = DashboardView::mount();

    let mut sinks: Vec<Box<dyn EventSink>> = Vec::new();
    if let Some(dashboard) = &dashboard {
        sinks.push(Box::new(DashboardSink::new(Rc::clone(dashboard))));
    }
    if let Some(feed) = FeedSink::mount(dashboard) {
        sinks.push(Box::new(feed));
    }
    if let Some(detail) = DetailSink::mount() {
        sinks.push(Box::new(detail));
    }
    if let Some(map) = map.as_ref().filter(|_| full_map) {
        sinks.push(Box::new(MapSink::new(Rc::clone(map))));
    }
    log::debug!("{} live presenters on this page", sinks.len());

    let stream = stream::start(&config.stream_url, config.reconnect, sinks);

    chat::mount(&backend);
    recommend::mount(&backend);
    filters::mount();

    std::mem::forget(Page {
        _stream: stream,
        _map: map,
    });
}
