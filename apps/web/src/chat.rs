use std::cell::RefCell;
use std::rc::Rc;

use crisis_presenter::backend::Backend;
use crisis_presenter::chat::{ChatMessage, ChatSession};
use crisis_presenter::Result;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlInputElement, KeyboardEvent};

use crate::dom;
use crate::http::HttpBackend;

struct ChatWidget {
    session: ChatSession,
    input: HtmlInputElement,
    messages: Element,
}

type SharedChat = Rc<RefCell<ChatWidget>>;

fn append(messages: &Element, message: &ChatMessage) -> Result<()> {
    let element = dom::create("div", message.class_name())?;
    element.set_inner_html(&message.html());
    messages.append_child(&element).map_err(dom::js_error)?;
    messages.set_scroll_top(messages.scroll_height());
    Ok(())
}

fn send(chat: &SharedChat, backend: &Rc<HttpBackend>) {
    let request = {
        let mut widget = chat.borrow_mut();
        let text = widget.input.value();
        let Some(request) = widget.session.begin_turn(&text) else {
            return;
        };
        widget.input.set_value("");
        if let Some(message) = widget.session.messages().last() {
            if let Err(error) = append(&widget.messages, message) {
                log::error!("unable to show chat message: {error}");
            }
        }
        request
    };

    let chat = Rc::clone(chat);
    let backend = Rc::clone(backend);
    spawn_local(async move {
        let reply = backend.post_chat(&request).await;
        let mut widget = chat.borrow_mut();
        let widget = &mut *widget;
        let message = widget.session.complete_turn(reply);
        if let Err(error) = append(&widget.messages, message) {
            log::error!("unable to show chat reply: {error}");
        }
    });
}

/// Wires the floating assistant when the page has one.
pub fn mount(backend: &Rc<HttpBackend>) -> Option<()> {
    let input = dom::input("floating-chat-input")?;
    let send_button = dom::by_id("floating-chat-send")?;
    let messages = dom::by_id("floating-chat-messages")?;

    let chat = Rc::new(RefCell::new(ChatWidget {
        session: ChatSession::new(),
        input: input.clone(),
        messages,
    }));

    {
        let chat = Rc::clone(&chat);
        let backend = Rc::clone(backend);
        dom::listen(&send_button, "click", move |_| send(&chat, &backend));
    }
    {
        let chat = Rc::clone(&chat);
        let backend = Rc::clone(backend);
        dom::listen(&input, "keypress", move |event| {
            let is_enter = event
                .dyn_ref::<KeyboardEvent>()
                .is_some_and(|key| key.key() == "Enter");
            if is_enter {
                send(&chat, &backend);
            }
        });
    }
    if let Some(panel) = dom::by_id("floating-chat") {
        dom::listen(&panel, "show.bs.collapse", move |_| {
            let mut widget = chat.borrow_mut();
            let widget = &mut *widget;
            if let Some(welcome) = widget.session.open() {
                if let Err(error) = append(&widget.messages, welcome) {
                    log::error!("unable to show chat welcome: {error}");
                }
            }
        });
    }
    log::debug!("chat widget ready");
    Some(())
}
