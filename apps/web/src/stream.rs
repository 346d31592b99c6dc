//! Owns the `EventSource` and carries out what the reconnect machine decides.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crisis_presenter::notify::NotificationCenter;
use crisis_presenter::stream::{
    dispatch, Directive, EventSink, ReconnectPolicy, StreamClient, StreamEvent, CHANNELS,
};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{EventSource, MessageEvent};

use crate::{dom, toast};

pub struct StreamDriver {
    client: StreamClient,
    source: Option<EventSource>,
    notifications: NotificationCenter,
    sinks: Vec<Box<dyn EventSink>>,
}

pub type SharedDriver = Rc<RefCell<StreamDriver>>;

impl StreamDriver {
    fn close(&mut self) {
        if let Some(source) = self.source.take() {
            source.close();
        }
    }

    fn handle_frame(&mut self, channel: &str, data: &str) -> Vec<Directive> {
        let outcome = self.client.on_frame(channel, data, dom::now_ms());
        if let Some(event) = &outcome.event {
            self.deliver(event);
        }
        outcome.directives
    }

    fn deliver(&mut self, event: &StreamEvent) {
        if let Some(toast) = self.notifications.announce(event) {
            toast::show(&toast);
        }
        let mut sinks: Vec<&mut dyn EventSink> = self
            .sinks
            .iter_mut()
            .map(|sink| &mut **sink as &mut dyn EventSink)
            .collect();
        let failures = dispatch(event, &mut sinks);
        if failures > 0 {
            log::warn!("{failures} presenter(s) failed on {}", event.channel());
        }
    }
}

/// Connects to `url` and feeds every event to `sinks` in order.
pub fn start(url: &str, policy: ReconnectPolicy, sinks: Vec<Box<dyn EventSink>>) -> SharedDriver {
    let driver = Rc::new(RefCell::new(StreamDriver {
        client: StreamClient::new(url, policy),
        source: None,
        notifications: NotificationCenter::new(),
        sinks,
    }));

    let directives = driver.borrow_mut().client.connect(dom::now_ms());
    match directives {
        Ok(directives) => execute(&driver, directives),
        Err(error) => log::error!("unable to start event stream: {error}"),
    }
    driver
}

fn execute(driver: &SharedDriver, directives: Vec<Directive>) {
    for directive in directives {
        match directive {
            Directive::Open => open(driver),
            Directive::Close => driver.borrow_mut().close(),
            Directive::ScheduleResume { delay_ms } => {
                let weak = Rc::downgrade(driver);
                dom::set_timeout(delay_ms, move || {
                    if let Some(driver) = weak.upgrade() {
                        let directives = driver.borrow_mut().client.poll(dom::now_ms());
                        execute(&driver, directives);
                    }
                });
            }
            Directive::GiveUp => {
                let toast = driver.borrow_mut().notifications.connection_lost();
                toast::show(&toast);
            }
        }
    }
}

fn transport_failed(driver: &SharedDriver) {
    let directives = driver.borrow_mut().client.on_transport_error(dom::now_ms());
    execute(driver, directives);
}

fn open(driver: &SharedDriver) {
    let url = driver.borrow().client.url().to_string();
    let source = match EventSource::new(&url) {
        Ok(source) => source,
        Err(error) => {
            log::error!("unable to open event stream {url}: {error:?}");
            transport_failed(driver);
            return;
        }
    };

    for channel in CHANNELS {
        let weak = Rc::downgrade(driver);
        let on_message = Closure::wrap(Box::new(move |event: MessageEvent| {
            let Some(driver) = weak.upgrade() else {
                return;
            };
            let data = event.data().as_string().unwrap_or_default();
            let directives = driver.borrow_mut().handle_frame(channel, &data);
            execute(&driver, directives);
        }) as Box<dyn FnMut(MessageEvent)>);
        if let Err(error) =
            source.add_event_listener_with_callback(channel, on_message.as_ref().unchecked_ref())
        {
            log::error!("unable to subscribe to {channel}: {error:?}");
        }
        on_message.forget();
    }

    let weak: Weak<RefCell<StreamDriver>> = Rc::downgrade(driver);
    let on_error = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        log::error!("event stream error");
        if let Some(driver) = weak.upgrade() {
            transport_failed(&driver);
        }
    }) as Box<dyn FnMut(web_sys::Event)>);
    source.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    on_error.forget();

    driver.borrow_mut().source = Some(source);
}
