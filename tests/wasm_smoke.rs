#![cfg(all(target_arch = "wasm32", feature = "wasm-web"))]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use keen_rs_sdk::platform::browser::dom::DomScriptHost;
use keen_rs_sdk::platform::environment::{is_browser, Capabilities};
use keen_rs_sdk::tracker::transport::ScriptInjectionTransport;
use keen_rs_sdk::tracker::{
    Callbacks, ClientConfig, EventPayload, Keen, ResolvedTransport, Transport, TransportPreference,
    TransportRequest,
};
use keen_rs_sdk::util;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn browser_exposes_typed_responses() {
    assert!(is_browser());
    assert!(Capabilities::detect().typed_responses);
}

#[wasm_bindgen_test]
fn auto_preference_resolves_to_direct_in_browser() {
    let keen = Keen::new(Some(ClientConfig::new("wasm-project").with_write_key("wk")));
    assert_eq!(keen.resolved_transport(), Some(ResolvedTransport::Direct));

    keen.configure(
        ClientConfig::new("wasm-project").with_transport(TransportPreference::Script),
    );
    assert_eq!(keen.resolved_transport(), Some(ResolvedTransport::Script));
}

#[wasm_bindgen_test]
fn codec_round_trips_in_browser() {
    let text = "caf\u{e9} \u{1F600}";
    assert_eq!(util::decode(&util::encode(text)).unwrap(), text);
}

#[wasm_bindgen_test(async)]
async fn missing_write_key_fails_without_network() {
    let keen = Keen::new(Some(ClientConfig::new("wasm-project")));
    let err = keen
        .add_event_async("pageviews", EventPayload::new())
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "keen/missing-credential");
}

#[wasm_bindgen_test(async)]
async fn failed_script_injection_reports_after_send_returns() {
    let document = web_sys::window().unwrap().document().unwrap();
    let root = document.document_element().unwrap();
    let head = document.head().unwrap();
    head.remove();

    let failed = Arc::new(AtomicBool::new(false));
    let flag = failed.clone();
    let (tx, rx) = oneshot::channel();
    let transport = ScriptInjectionTransport::new(Arc::new(DomScriptHost::new()));
    transport.send(
        TransportRequest {
            destination: "https://api.keen.io/3.0/projects/wasm-project/events/pageviews".into(),
            payload: EventPayload::new(),
            credential: Some("wk".into()),
            timeout: Duration::from_secs(1),
        },
        Callbacks::new().on_failure(move |err| {
            flag.store(true, Ordering::SeqCst);
            let _ = tx.send(err.code_str());
        }),
    );
    let failed_during_send = failed.load(Ordering::SeqCst);

    root.insert_before(&head, root.first_child().as_ref()).unwrap();
    assert!(!failed_during_send);
    assert_eq!(rx.await.unwrap(), "keen/load-signal");
}
