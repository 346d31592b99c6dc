use wasm_bindgen::JsCast;
use web_sys::{HtmlFormElement, HtmlSelectElement};

use crate::dom;

fn submit(form: &HtmlFormElement) {
    if let Err(error) = form.submit() {
        log::error!("unable to submit filters: {error:?}");
    }
}

/// Resubmits the incident filter form whenever a select changes.
pub fn mount() -> Option<()> {
    let form = dom::by_id("incident-filter-form")?
        .dyn_into::<HtmlFormElement>()
        .ok()?;
    let nodes = form.query_selector_all("select").ok()?;
    let selects: Vec<HtmlSelectElement> = (0..nodes.length())
        .filter_map(|index| nodes.item(index)?.dyn_into::<HtmlSelectElement>().ok())
        .collect();

    for select in &selects {
        let form = form.clone();
        dom::listen(select, "change", move |_| submit(&form));
    }

    if let Some(clear) = dom::by_id("clear-filters") {
        dom::listen(&clear, "click", move |event| {
            event.prevent_default();
            for select in &selects {
                select.set_value("all");
            }
            submit(&form);
        });
    }
    Some(())
}
