//! Script and image hosts that drive real `<script>` and `<img>` elements.
//!
//! The page is single threaded, so handler closures are leaked with `forget` once attached; each
//! element fires a bounded number of events and the one-shot [`Completion`] guard behind
//! [`ScriptLoad`] and [`ImageLoad`] ignores everything after the first signal. Failures to build
//! an element are reported from a spawned task, never from inside `inject` or `load`.
//!
//! [`Completion`]: crate::tracker::transport::Completion

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlImageElement, HtmlScriptElement};

use crate::platform::runtime;
use crate::tracker::constants::JSONP_SCRIPT_ID;
use crate::tracker::transport::{
    ImageDimensions, ImageHost, ImageLoad, ScriptHost, ScriptLoad, ScriptRequest,
};

fn document() -> Option<Document> {
    web_sys::window()?.document()
}

/// Binds JSONP callbacks on `window` and appends `<script id="keen-jsonp">` to `<head>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomScriptHost;

impl DomScriptHost {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptHost for DomScriptHost {
    fn is_bound(&self, name: &str) -> bool {
        let global = js_sys::global();
        js_sys::Reflect::has(&global, &JsValue::from_str(name)).unwrap_or(false)
    }

    fn inject(&self, request: ScriptRequest, load: ScriptLoad) {
        if let Err(err) = inject_script(request, load.clone()) {
            log::debug!("script injection failed: {err:?}");
            runtime::spawn_detached(async move {
                load.error();
            });
        }
    }
}

fn inject_script(request: ScriptRequest, load: ScriptLoad) -> Result<(), JsValue> {
    let document = document().ok_or_else(|| JsValue::from_str("Document not available"))?;
    let global = js_sys::global();
    let name = JsValue::from_str(&request.callback_name);

    let callback_load = load.clone();
    let callback_name = name.clone();
    let callback = Closure::wrap(Box::new(move |response: JsValue| {
        let value = js_sys::JSON::stringify(&response)
            .ok()
            .and_then(|json| json.as_string())
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or(serde_json::Value::Null);
        callback_load.callback(value);
        let _ = js_sys::Reflect::delete_property(&js_sys::global(), &callback_name);
    }) as Box<dyn FnMut(JsValue)>);
    js_sys::Reflect::set(&global, &name, callback.as_ref())?;
    callback.forget();

    let script = document
        .create_element("script")?
        .dyn_into::<HtmlScriptElement>()
        .map_err(|_| JsValue::from_str("Script element has wrong type"))?;
    script.set_id(JSONP_SCRIPT_ID);
    script.set_src(&request.url);

    let error_load = load.clone();
    let onerror = Closure::wrap(Box::new(move || {
        error_load.error();
    }) as Box<dyn FnMut()>);
    script.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    // Older engines report completion only through readyState.
    let state_script = script.clone();
    let onreadystatechange = Closure::wrap(Box::new(move || {
        let state = js_sys::Reflect::get(&state_script, &JsValue::from_str("readyState"))
            .ok()
            .and_then(|state| state.as_string());
        if let Some(state) = state {
            load.ready_state(&state);
        }
    }) as Box<dyn FnMut()>);
    js_sys::Reflect::set(
        &script,
        &JsValue::from_str("onreadystatechange"),
        onreadystatechange.as_ref(),
    )?;
    onreadystatechange.forget();

    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("No <head> element found"))?;
    head.append_child(&script)?;
    Ok(())
}

/// Loads beacons through detached `<img>` elements.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomImageHost;

impl DomImageHost {
    pub fn new() -> Self {
        Self
    }
}

impl ImageHost for DomImageHost {
    fn load(&self, url: String, load: ImageLoad) {
        if let Err(err) = load_image(&url, load.clone()) {
            log::debug!("beacon image creation failed: {err:?}");
            runtime::spawn_detached(async move {
                load.error();
            });
        }
    }
}

fn load_image(url: &str, load: ImageLoad) -> Result<(), JsValue> {
    let image = HtmlImageElement::new()?;

    let loaded_image = image.clone();
    let loaded = load.clone();
    let onload = Closure::wrap(Box::new(move || {
        let has_natural = js_sys::Reflect::has(&loaded_image, &JsValue::from_str("naturalWidth"))
            .unwrap_or(false);
        let natural = has_natural.then(|| {
            (loaded_image.natural_width(), loaded_image.natural_height())
        });
        loaded.loaded(ImageDimensions {
            natural,
            width: loaded_image.width(),
            height: loaded_image.height(),
        });
    }) as Box<dyn FnMut()>);

    let onerror = Closure::wrap(Box::new(move || {
        load.error();
    }) as Box<dyn FnMut()>);

    image.set_onload(Some(onload.as_ref().unchecked_ref()));
    image.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onload.forget();
    onerror.forget();

    image.set_src(url);
    Ok(())
}
