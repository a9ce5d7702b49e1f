// Bindings to the browser console. Off the browser the same calls become tracing events.
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    // Use `js_namespace` to bind `console.log(..)` instead of just `log(..)`
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

#[cfg(target_arch = "wasm32")]
pub fn warn(s: &str) {
    web_sys::console::warn_1(&JsValue::from_str(s));
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log(s: &str) {
    tracing::info!(target: "zonegis", "{}", s);
}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(s: &str) {
    tracing::warn!(target: "zonegis", "{}", s);
}

// Note: The console_log macro is defined in lib.rs
