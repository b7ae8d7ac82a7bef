use crate::frame::{self, AudioTicker};
use crate::{dom, SharedStore};
use scene_core::KeyInput;
use wasm_bindgen::JsCast;
use web_sys as web;

#[inline]
pub fn key_input(ev: &web::KeyboardEvent) -> KeyInput {
    KeyInput {
        key: ev.key(),
        code: ev.code(),
        meta: ev.meta_key(),
        ctrl: ev.ctrl_key(),
        alt: ev.alt_key(),
        default_prevented: ev.default_prevented(),
    }
}

fn handle_global_keydown(ev: &web::KeyboardEvent, store: &SharedStore, ticker: &AudioTicker) {
    let (outcome, tasks) = store.borrow_mut().handle_key(&key_input(ev));
    if outcome.prevents_default() {
        ev.prevent_default();
    }
    let focus = store.borrow().focus_mode();
    dom::set_body_class(dom::FOCUS_CLASS, focus);
    frame::after_command(store, ticker, tasks);
}

pub fn wire_global_keydown(store: SharedStore, ticker: AudioTicker) {
    if let Some(window) = web::window() {
        let closure =
            wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::KeyboardEvent| {
                handle_global_keydown(&ev, &store, &ticker);
            }) as Box<dyn FnMut(_)>);
        _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}
