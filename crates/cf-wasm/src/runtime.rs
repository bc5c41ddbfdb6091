//! `chrome.runtime` messaging through reflection.

use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use cf_core::{MessageSink, OutboundMessage};

/// Signature of a `chrome.runtime.onMessage` listener.
pub type MessageListener = Closure<dyn FnMut(JsValue, JsValue, JsValue)>;

fn runtime() -> Result<JsValue, JsValue> {
    let chrome = Reflect::get(&js_sys::global(), &"chrome".into())?;
    if chrome.is_undefined() || chrome.is_null() {
        return Err(JsValue::from_str("chrome is not available"));
    }
    let runtime = Reflect::get(&chrome, &"runtime".into())?;
    if runtime.is_undefined() || runtime.is_null() {
        return Err(JsValue::from_str("chrome.runtime is not available"));
    }
    Ok(runtime)
}

pub fn send_message(message: &JsValue) -> Result<(), JsValue> {
    let runtime = runtime()?;
    let send: Function = Reflect::get(&runtime, &"sendMessage".into())?.dyn_into()?;
    send.call1(&runtime, message)?;
    Ok(())
}

/// Register a `chrome.runtime.onMessage` listener for the page's lifetime.
pub fn add_message_listener(listener: MessageListener) -> Result<(), JsValue> {
    let on_message = Reflect::get(&runtime()?, &"onMessage".into())?;
    let add: Function = Reflect::get(&on_message, &"addListener".into())?.dyn_into()?;
    add.call1(&on_message, listener.as_ref())?;
    listener.forget();
    Ok(())
}

/// Answer a message through its `sendResponse` callback.
pub fn respond(send_response: &JsValue, reply: &JsValue) {
    if let Some(callback) = send_response.dyn_ref::<Function>() {
        if let Err(err) = callback.call1(&JsValue::NULL, reply) {
            log::debug!("sendResponse failed: {:?}", err);
        }
    }
}

/// Sends outbound messages with `chrome.runtime.sendMessage`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeSink;

impl MessageSink for RuntimeSink {
    fn send(&mut self, message: OutboundMessage) {
        let value = match message.to_json() {
            Ok(json) => js_sys::JSON::parse(&json),
            Err(err) => {
                log::warn!("Failed to encode message: {}", err);
                return;
            }
        };
        if let Err(err) = value.and_then(|value| send_message(&value)) {
            log::warn!("Failed to send message: {:?}", err);
        }
    }
}
