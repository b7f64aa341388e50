//! Runtime capability probing.
//!
//! The tracker only needs one fact about its host: whether the request primitive can deliver
//! typed responses. Probing lives here so the transport selector stays a pure function of
//! [`Capabilities`].

/// Capabilities of the host environment that influence transport selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// The request primitive supports typed (`responseType`) responses.
    pub typed_responses: bool,
}

impl Capabilities {
    pub const fn new(typed_responses: bool) -> Self {
        Self { typed_responses }
    }

    /// Probes the current environment.
    pub fn detect() -> Self {
        Self {
            typed_responses: supports_typed_responses(),
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Returns `true` when `new XMLHttpRequest().responseType` is a string.
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
fn supports_typed_responses() -> bool {
    use wasm_bindgen::JsValue;

    let global = js_sys::global();
    let constructor = match js_sys::Reflect::get(&global, &JsValue::from_str("XMLHttpRequest")) {
        Ok(value) if value.is_function() => value,
        _ => return false,
    };
    let constructor: js_sys::Function = constructor.into();
    let request = match js_sys::Reflect::construct(&constructor, &js_sys::Array::new()) {
        Ok(request) => request,
        Err(_) => return false,
    };
    js_sys::Reflect::get(&request, &JsValue::from_str("responseType"))
        .map(|value| value.is_string())
        .unwrap_or(false)
}

/// Native builds always go through an HTTP client with typed responses.
#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
fn supports_typed_responses() -> bool {
    true
}

/// Returns `true` if the runtime exposes a DOM `window`.
pub fn is_browser() -> bool {
    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    {
        web_sys::window().is_some()
    }

    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    {
        false
    }
}
