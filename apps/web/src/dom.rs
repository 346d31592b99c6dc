use crisis_presenter::config::PageEnv;
use crisis_presenter::notify::SoundCue;
use crisis_presenter::{PresenterError, Result};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    AddEventListenerOptions, Document, Element, HtmlInputElement, HtmlMediaElement, Window,
};

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| PresenterError::MissingElement("window".to_string()))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| PresenterError::MissingElement("document".to_string()))
}

pub fn by_id(id: &str) -> Option<Element> {
    document().ok()?.get_element_by_id(id)
}

pub fn require(id: &str) -> Result<Element> {
    by_id(id).ok_or_else(|| PresenterError::MissingElement(id.to_string()))
}

pub fn input(id: &str) -> Option<HtmlInputElement> {
    by_id(id)?.dyn_into::<HtmlInputElement>().ok()
}

pub fn set_text(id: &str, text: &str) {
    if let Some(element) = by_id(id) {
        element.set_text_content(Some(text));
    }
}

pub fn text_of(id: &str) -> Option<String> {
    by_id(id)?.text_content()
}

pub fn set_input_value(id: &str, value: &str) {
    if let Some(input) = input(id) {
        input.set_value(value);
    }
}

pub fn create(tag: &str, class_name: &str) -> Result<Element> {
    let element = document()?.create_element(tag).map_err(js_error)?;
    element.set_class_name(class_name);
    Ok(element)
}

/// Inserts `child` as the first child of `parent`.
pub fn prepend(parent: &Element, child: &Element) -> Result<()> {
    parent
        .insert_before(child, parent.first_child().as_ref())
        .map(|_| ())
        .map_err(js_error)
}

pub fn js_error(value: JsValue) -> PresenterError {
    PresenterError::transport("dom", format!("{value:?}"))
}

// Date.now() is a non-negative integer well inside u64.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

pub fn set_timeout(delay_ms: u64, callback: impl FnOnce() + 'static) {
    let Ok(window) = window() else {
        return;
    };
    let callback = Closure::once_into_js(callback);
    let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
    if let Err(error) = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay)
    {
        log::error!("unable to schedule timer: {error:?}");
    }
}

/// Listens on `target` for the page lifetime.
pub fn listen(target: &web_sys::EventTarget, event: &str, handler: impl FnMut(web_sys::Event) + 'static) {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
    if let Err(error) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
        log::error!("unable to listen for {event}: {error:?}");
    }
    closure.forget();
}

/// Listens for the first `event` only; the callback is released after it runs.
pub fn listen_once(target: &web_sys::EventTarget, event: &str, handler: impl FnOnce(web_sys::Event) + 'static) {
    let callback = Closure::once_into_js(handler);
    let options = AddEventListenerOptions::new();
    options.set_once(true);
    if let Err(error) = target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        callback.unchecked_ref(),
        &options,
    ) {
        log::error!("unable to listen once for {event}: {error:?}");
    }
}

/// Nearest element matching `selector` at or above the event target.
pub fn closest_target(event: &web_sys::Event, selector: &str) -> Option<Element> {
    event
        .target()?
        .dyn_into::<Element>()
        .ok()?
        .closest(selector)
        .ok()
        .flatten()
}

/// Plays a cue from the page's `<audio>` elements; failures are logged only.
pub fn play_sound(cue: SoundCue) {
    let Some(audio) = by_id(cue.element_id()).and_then(|el| el.dyn_into::<HtmlMediaElement>().ok())
    else {
        return;
    };
    match audio.play() {
        Ok(promise) => {
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(error) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    log::warn!("unable to play {}: {error:?}", cue.element_id());
                }
            });
        }
        Err(error) => log::warn!("unable to play {}: {error:?}", cue.element_id()),
    }
}

/// Page settings read from `<meta>` tags.
pub struct DomEnv;

impl PageEnv for DomEnv {
    fn meta(&self, name: &str) -> Option<String> {
        let selector = format!(r#"meta[name="{name}"]"#);
        document()
            .ok()?
            .query_selector(&selector)
            .ok()
            .flatten()?
            .get_attribute("content")
    }

    fn origin(&self) -> String {
        window()
            .ok()
            .and_then(|window| window.location().origin().ok())
            .unwrap_or_default()
    }
}
