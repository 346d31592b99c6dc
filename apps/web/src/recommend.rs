use std::cell::RefCell;
use std::rc::Rc;

use crisis_presenter::backend::Backend;
use crisis_presenter::dto::IncidentId;
use crisis_presenter::recommend::{AllocationDraft, RecommendationView};
use crisis_presenter::Result;
use wasm_bindgen_futures::spawn_local;

use crate::http::HttpBackend;
use crate::{bridge, dom};

const CONTAINER: &str = "resource-recommendations";
const ALLOCATE_BUTTON: &str = ".allocate-resource-btn";

/// Wires the "recommend resources" button on an incident page.
pub fn mount(backend: &Rc<HttpBackend>) -> Option<()> {
    let button = dom::by_id("recommend-resources")?;
    let incident_id = button
        .get_attribute("data-incident-id")?
        .trim()
        .parse::<IncidentId>()
        .ok()?;

    let current: Rc<RefCell<Option<RecommendationView>>> = Rc::new(RefCell::new(None));
    if let Some(container) = dom::by_id(CONTAINER) {
        let current = Rc::clone(&current);
        dom::listen(&container, "click", move |event| {
            let Some(row) = dom::closest_target(&event, ALLOCATE_BUTTON)
                .and_then(|button| allocate_row(button.get_attribute("data-index").as_deref()))
            else {
                return;
            };
            let draft = current
                .borrow()
                .as_ref()
                .and_then(|view| view.row(row))
                .map(|recommendation| AllocationDraft::new(incident_id, recommendation));
            if let Some(draft) = draft {
                if let Err(error) = open_allocation(&draft) {
                    log::error!("unable to open allocation form: {error}");
                }
            }
        });
    }

    let backend = Rc::clone(backend);
    dom::listen(&button, "click", move |_| {
        let Some(container) = dom::by_id(CONTAINER) else {
            return;
        };
        container.set_inner_html(&RecommendationView::Loading.html());
        current.replace(None);

        let backend = Rc::clone(&backend);
        let current = Rc::clone(&current);
        spawn_local(async move {
            let view = RecommendationView::from_result(
                backend.fetch_recommendations(incident_id).await,
            );
            container.set_inner_html(&view.html());
            current.replace(Some(view));
        });
    });
    Some(())
}

fn allocate_row(raw: Option<&str>) -> Option<usize> {
    raw?.trim().parse().ok()
}

fn open_allocation(draft: &AllocationDraft) -> Result<()> {
    let modal = dom::require("allocate-resource-modal")?;
    dom::set_input_value("resource-id", &draft.resource_id.to_string());
    dom::set_input_value("incident-id", &draft.incident_id.to_string());
    dom::set_input_value("quantity", &draft.quantity.to_string());
    dom::set_text("resource-name-display", &draft.resource_name);
    bridge::show_modal(&modal).map_err(dom::js_error)
}
