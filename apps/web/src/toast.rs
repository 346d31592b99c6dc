use crisis_presenter::format::escape_html;
use crisis_presenter::notify::Toast;
use crisis_presenter::Result;
use web_sys::Element;

use crate::{bridge, dom};

const CONTAINER_ID: &str = "toast-container";

fn container() -> Result<Element> {
    if let Some(existing) = dom::by_id(CONTAINER_ID) {
        return Ok(existing);
    }
    let container = dom::create("div", "toast-container position-fixed bottom-0 end-0 p-3")?;
    container.set_id(CONTAINER_ID);
    let body = dom::document()?
        .body()
        .ok_or_else(|| crisis_presenter::PresenterError::MissingElement("body".to_string()))?;
    body.append_child(&container).map_err(dom::js_error)?;
    Ok(container)
}

/// Shows `toast` through Bootstrap and plays its sound. The node removes
/// itself once hidden.
pub fn show(toast: &Toast) {
    if let Err(error) = render(toast) {
        log::error!("unable to show notification {}: {error}", toast.id);
    }
    dom::play_sound(toast.sound());
}

fn render(toast: &Toast) -> Result<()> {
    let element = dom::create("div", &toast.class_name())?;
    element.set_id(&toast.id);
    for (name, value) in [("role", "alert"), ("aria-live", "assertive"), ("aria-atomic", "true")] {
        element.set_attribute(name, value).map_err(dom::js_error)?;
    }
    element.set_inner_html(&format!(
        concat!(
            r#"<div class="d-flex"><div class="toast-body"><strong>{}:</strong> {}</div>"#,
            r#"<button type="button" class="btn-close btn-close-white me-2 m-auto" "#,
            r#"data-bs-dismiss="toast" aria-label="Close"></button></div>"#
        ),
        escape_html(&toast.title),
        escape_html(&toast.message)
    ));

    container()?.append_child(&element).map_err(dom::js_error)?;

    let node = element.clone();
    dom::listen_once(&element, "hidden.bs.toast", move |_| node.remove());

    bridge::show_toast(&element, toast.delay_ms).map_err(dom::js_error)
}
