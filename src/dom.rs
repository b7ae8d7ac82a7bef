use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

pub const FOCUS_CLASS: &str = "focus-mode";

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

#[inline]
pub fn add_click_listener(
    document: &web::Document,
    element_id: &str,
    mut handler: impl FnMut() + 'static,
) -> bool {
    let Some(el) = document.get_element_by_id(element_id) else {
        log::warn!("missing #{}", element_id);
        return false;
    };
    let closure = Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
    let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
    closure.forget();
    true
}

/// Reflect a boolean scene flag as a class on `<body>` so CSS can react.
#[inline]
pub fn set_body_class(class: &str, on: bool) {
    if let Some(body) = window_document().and_then(|d| d.body()) {
        let _ = body.class_list().toggle_with_force(class, on);
    }
}
