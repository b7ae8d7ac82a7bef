use crate::SharedStore;
use scene_core::AudioTasks;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

type SharedClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn request_frame(tick: &SharedClosure) {
    if let (Some(w), Some(cb)) = (web::window(), tick.borrow().as_ref()) {
        let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}

/// Start the per-frame energy sampling loop if playback is on and no loop is
/// already scheduled. The loop ends by itself within one frame of pausing.
pub fn start_energy_loop(store: &SharedStore) {
    let Some(ticket) = store.borrow_mut().start_energy_loop() else {
        return;
    };
    let tick: SharedClosure = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    let store_tick = store.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if store_tick.borrow_mut().energy_frame(ticket) {
            request_frame(&tick_clone);
        } else {
            // break the self-reference once this callback has returned
            let done = tick_clone.borrow_mut().take();
            spawn_local(async move { drop(done) });
        }
    }) as Box<dyn FnMut()>));
    request_frame(&tick);
    log::debug!("[frame] energy loop started");
}

/// Timer that keeps calling `poll_audio` while fades are settling (pausing
/// faded-out channels, stepping element volumes when there is no graph).
#[derive(Clone)]
pub struct AudioTicker {
    store: SharedStore,
    handle: Rc<Cell<Option<i32>>>,
    callback: SharedClosure,
}

impl AudioTicker {
    pub fn new(store: SharedStore) -> Self {
        let ticker = Self {
            store,
            handle: Rc::new(Cell::new(None)),
            callback: Rc::new(RefCell::new(None)),
        };
        let inner = ticker.clone();
        *ticker.callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            inner.handle.set(None);
            inner.kick();
        }) as Box<dyn FnMut()>));
        ticker
    }

    /// Poll now and reschedule for whenever the graph next needs attention.
    pub fn kick(&self) {
        let next = self.store.borrow_mut().poll_audio();
        self.cancel();
        if let Some(delay_sec) = next {
            self.schedule((delay_sec * 1000.0).ceil() as i32);
        }
    }

    fn schedule(&self, delay_ms: i32) {
        let Some(w) = web::window() else {
            return;
        };
        if let Some(cb) = self.callback.borrow().as_ref() {
            match w.set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                delay_ms.max(0),
            ) {
                Ok(id) => self.handle.set(Some(id)),
                Err(e) => log::error!("setTimeout error: {:?}", e),
            }
        }
    }

    fn cancel(&self) {
        if let (Some(id), Some(w)) = (self.handle.take(), web::window()) {
            w.clear_timeout_with_handle(id);
        }
    }
}

/// Run the async side of a command: await platform outcomes and feed them
/// back into the store.
pub fn detach_tasks(store: &SharedStore, tasks: AudioTasks) {
    if tasks.is_empty() {
        return;
    }
    let store = store.clone();
    spawn_local(async move {
        for outcome in tasks.finish().await {
            store.borrow_mut().settle_task(&outcome);
        }
    });
}

/// Common tail of every user command.
pub fn after_command(store: &SharedStore, ticker: &AudioTicker, tasks: AudioTasks) {
    detach_tasks(store, tasks);
    ticker.kick();
    start_energy_loop(store);
}
