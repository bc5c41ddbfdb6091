//! WebAssembly binding for the cosmetic filter content script
//!
//! Loaded into every page. On start it creates a [`PageSession`] over the
//! live document, announces itself to the extension, and routes
//! `chrome.runtime` messages, mutation records and pump timers into the
//! session.

use std::cell::RefCell;
use std::time::Duration;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use cf_core::{Dispatch, FilterConfig, PageSession};

pub mod dom;
pub mod runtime;

use crate::dom::WebDom;
use crate::runtime::RuntimeSink;

type WebSession = PageSession<WebDom, RuntimeSink>;

thread_local! {
    static SESSION: RefCell<Option<WebSession>> = const { RefCell::new(None) };
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Run `f` against the page session, if there is one and it is not busy.
fn with_session<R>(f: impl FnOnce(&mut WebSession) -> R) -> Option<R> {
    SESSION.with(|cell| match cell.try_borrow_mut() {
        Ok(mut guard) => guard.as_mut().map(f),
        Err(_) => {
            log::warn!("Page session is busy");
            None
        }
    })
}

#[wasm_bindgen(start)]
pub fn main() {
    init_logging();
    if let Err(err) = boot(FilterConfig::default()) {
        log::warn!("Cosmetic filtering disabled: {:?}", err);
    }
}

/// Route panics and `log` records to the browser console.
pub fn init_logging() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
}

fn boot(config: FilterConfig) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
    let host = window.location().host()?;

    let dom = WebDom::new(document, on_insertions);
    let mut session = PageSession::new(dom, RuntimeSink, &host, config).map_err(to_js)?;
    session.start();
    SESSION.with(|cell| *cell.borrow_mut() = Some(session));

    let listener: runtime::MessageListener = Closure::new(on_runtime_message);
    runtime::add_message_listener(listener)
}

fn on_runtime_message(message: JsValue, _sender: JsValue, send_response: JsValue) {
    match dispatch(message) {
        Ok(Dispatch { reply: Some(_), .. }) => runtime::respond(&send_response, &JsValue::NULL),
        Ok(_) => {}
        Err(err) => log::warn!("Failed to handle message: {:?}", err),
    }
}

fn on_insertions(nodes: Vec<web_sys::Node>) {
    with_session(|session| session.on_nodes_added(&nodes));
}

fn on_timer() {
    if let Some(Some(delay)) = with_session(|session| session.on_timer()) {
        if let Err(err) = schedule_wake(delay) {
            log::warn!("Failed to schedule pump: {:?}", err);
        }
    }
}

fn schedule_wake(delay: Duration) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let callback = Closure::once_into_js(on_timer);
    window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        delay.as_millis().min(i32::MAX as u128) as i32,
    )?;
    Ok(())
}

/// JS message value to JSON. Bare strings stay strings.
fn to_json_value(message: &JsValue) -> Result<serde_json::Value, JsValue> {
    if let Some(kind) = message.as_string() {
        return Ok(serde_json::Value::String(kind));
    }
    let text = js_sys::JSON::stringify(message)?
        .as_string()
        .ok_or_else(|| JsValue::from_str("message is not serializable"))?;
    serde_json::from_str(&text).map_err(to_js)
}

fn dispatch(message: JsValue) -> Result<Dispatch, JsValue> {
    let value = to_json_value(&message)?;
    let dispatch = with_session(|session| session.handle_value(value))
        .ok_or_else(|| JsValue::from_str("page session is not running"))?
        .map_err(to_js)?;
    if let Some(delay) = dispatch.wake_after {
        schedule_wake(delay)?;
    }
    Ok(dispatch)
}

/// Deliver a message as if it came from `chrome.runtime.onMessage`.
/// Returns the value passed to `sendResponse`, or `undefined`.
#[wasm_bindgen]
pub fn handle_message(message: JsValue) -> Result<JsValue, JsValue> {
    let dispatch = dispatch(message)?;
    Ok(match dispatch.reply {
        Some(_) => JsValue::NULL,
        None => JsValue::UNDEFINED,
    })
}

#[wasm_bindgen]
pub fn is_running() -> bool {
    SESSION.with(|cell| cell.try_borrow().map(|guard| guard.is_some()).unwrap_or(true))
}

/// Current session statistics as a plain object.
#[wasm_bindgen]
pub fn session_report() -> Result<JsValue, JsValue> {
    let report = with_session(|session| session.report())
        .ok_or_else(|| JsValue::from_str("page session is not running"))?;
    let json = serde_json::to_string(&report).map_err(to_js)?;
    js_sys::JSON::parse(&json)
}

/// Drop the page session and disconnect the mutation observer.
#[wasm_bindgen]
pub fn teardown() -> Result<JsValue, JsValue> {
    let session = SESSION
        .with(|cell| cell.try_borrow_mut().ok().and_then(|mut guard| guard.take()))
        .ok_or_else(|| JsValue::from_str("page session is not running"))?;
    let report = session.teardown();
    let json = serde_json::to_string(&report).map_err(to_js)?;
    js_sys::JSON::parse(&json)
}
