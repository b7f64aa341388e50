#![cfg(not(target_arch = "wasm32"))]

use futures::channel::oneshot;
use futures::executor::block_on;
use httpmock::prelude::*;
use serde_json::{json, Value};

use keen_rs_sdk::platform::environment::Capabilities;
use keen_rs_sdk::tracker::transport::{
    Completion, HttpScriptHost, ScriptHost, ScriptLoad, ScriptRequest,
};
use keen_rs_sdk::tracker::{
    Callbacks, ClientConfig, EventPayload, Keen, ResolvedTransport, TransportPreference,
    TransportSet,
};
use keen_rs_sdk::util;

const ONE_PIXEL_GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff\x00\x00\x00!\xf9\x04\x01\x00\x00\x00\x00,\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02D\x01\x00;";

fn client(server: &MockServer, transport: TransportPreference) -> Keen {
    Keen::with_environment(
        Some(
            ClientConfig::new("p1")
                .with_write_key("wk")
                .with_base_url(server.url("/3.0"))
                .with_transport(transport),
        ),
        Capabilities::new(true),
        TransportSet::platform_default(),
    )
}

fn payload(value: Value) -> EventPayload {
    value.as_object().cloned().unwrap()
}

#[test]
fn direct_request_posts_json_with_write_key() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/3.0/projects/p1/events/purchases")
            .header("Authorization", "wk")
            .header("content-type", "application/json")
            .json_body(json!({ "item": "lamp", "price": 49 }));
        then.status(201)
            .header("content-type", "application/json")
            .body(r#"{"created":true}"#);
    });

    let keen = client(&server, TransportPreference::Direct);
    assert_eq!(keen.resolved_transport(), Some(ResolvedTransport::Direct));
    let response = block_on(keen.add_event_async(
        "purchases",
        payload(json!({ "item": "lamp", "price": 49 })),
    ))
    .unwrap();

    assert_eq!(response, json!({ "created": true }));
    mock.assert();
}

#[test]
fn direct_request_reports_server_errors() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/3.0/projects/p1/events/purchases");
        then.status(500).body("internal error");
    });

    let keen = client(&server, TransportPreference::Direct);
    let err = block_on(keen.add_event_async("purchases", EventPayload::new())).unwrap_err();

    assert_eq!(err.code_str(), "keen/http-status");
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.response_text(), Some("internal error"));
    mock.assert();
}

#[test]
fn direct_request_reports_unparsable_success_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/3.0/projects/p1/events/purchases");
        then.status(200).body("<html>ok</html>");
    });

    let keen = client(&server, TransportPreference::Direct);
    let err = block_on(keen.add_event_async("purchases", EventPayload::new())).unwrap_err();

    assert_eq!(err.code_str(), "keen/body-parse");
    assert_eq!(err.response_text(), Some("<html>ok</html>"));
}

#[test]
fn direct_request_callbacks_fire_once() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/3.0/projects/p1/events/clicks");
        then.status(201).body(r#"{"created":true}"#);
    });

    let keen = client(&server, TransportPreference::Direct);
    let (tx, rx) = oneshot::channel();
    keen.add_event(
        "clicks",
        EventPayload::new(),
        Callbacks::new()
            .on_success(move |value| {
                let _ = tx.send(value);
            })
            .on_failure(|err| panic!("unexpected failure: {err}")),
    );

    assert_eq!(block_on(rx).unwrap(), json!({ "created": true }));
}

#[test]
fn script_injection_sends_encoded_payload() {
    let server = MockServer::start();
    let encoded = util::encode(r#"{"item":"lamp"}"#);
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/3.0/projects/p1/events/purchases")
            .query_param("api_key", "wk")
            .query_param("data", encoded.as_str())
            .query_param_exists("modified")
            .query_param_exists("jsonp");
        then.status(404);
    });

    let keen = client(&server, TransportPreference::Script);
    assert_eq!(keen.resolved_transport(), Some(ResolvedTransport::Script));
    let err = block_on(keen.add_event_async("purchases", payload(json!({ "item": "lamp" }))))
        .unwrap_err();

    assert_eq!(err.code_str(), "keen/load-signal");
    mock.assert();
}

#[test]
fn script_host_evaluates_callback_wrapper() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/jsonp");
        then.status(200)
            .header("content-type", "application/javascript")
            .body(r#"keenJSONPCallback1({"created":true});"#);
    });

    let host = HttpScriptHost::new();
    let (tx, rx) = oneshot::channel();
    let load = ScriptLoad::new(Completion::new(Callbacks::new().on_success(move |value| {
        let _ = tx.send(value);
    })));
    host.inject(
        ScriptRequest {
            url: server.url("/jsonp"),
            callback_name: "keenJSONPCallback1".into(),
        },
        load.clone(),
    );
    assert_eq!(block_on(rx).unwrap(), json!({ "created": true }));
    assert!(load.is_loaded());
}

#[test]
fn pixel_beacon_acknowledges_sized_image() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/3.0/projects/p1/events/clicks")
            .query_param("api_key", "wk")
            .query_param("c", "clv1")
            .query_param_exists("data")
            .query_param_exists("modified");
        then.status(200)
            .header("content-type", "image/gif")
            .body(ONE_PIXEL_GIF);
    });

    let keen = client(&server, TransportPreference::Pixel);
    let response = block_on(keen.add_event_async("clicks", payload(json!({ "href": "/out" }))))
        .unwrap();

    assert_eq!(response, json!({ "created": true }));
    mock.assert();
}

#[test]
fn pixel_beacon_treats_undecodable_body_as_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/3.0/projects/p1/events/clicks");
        then.status(200).body(r#"{"created":true}"#);
    });

    let keen = client(&server, TransportPreference::Pixel);
    let err = block_on(keen.add_event_async("clicks", EventPayload::new())).unwrap_err();
    assert_eq!(err.code_str(), "keen/load-signal");
}

#[test]
fn missing_write_key_never_reaches_the_server() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.any_request();
        then.status(201).body("{}");
    });

    let keen = Keen::with_environment(
        Some(ClientConfig::new("p1").with_base_url(server.url("/3.0"))),
        Capabilities::new(true),
        TransportSet::platform_default(),
    );
    let err = block_on(keen.add_event_async("purchases", EventPayload::new())).unwrap_err();

    assert_eq!(err.code_str(), "keen/missing-credential");
    mock.assert_hits(0);
}

#[test]
fn replayed_events_reach_the_server_in_order() {
    let server = MockServer::start();
    let purchases = server.mock(|when, then| {
        when.method(POST).path("/3.0/projects/p1/events/purchases");
        then.status(201).body(r#"{"created":true}"#);
    });
    let pageviews = server.mock(|when, then| {
        when.method(POST).path("/3.0/projects/p1/events/pageviews");
        then.status(201).body(r#"{"created":true}"#);
    });

    let mut registry = keen_rs_sdk::tracker::PendingCallRegistry::new();
    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();
    registry
        .stand_in("main")
        .configure(
            ClientConfig::new("p1")
                .with_write_key("wk")
                .with_base_url(server.url("/3.0")),
        )
        .add_event(
            "purchases",
            EventPayload::new(),
            Callbacks::new().on_success(move |_| {
                let _ = first_tx.send(());
            }),
        )
        .add_event(
            "pageviews",
            EventPayload::new(),
            Callbacks::new().on_success(move |_| {
                let _ = second_tx.send(());
            }),
        );

    let clients = registry.drain_once(|_| {
        Keen::unconfigured(Capabilities::new(true), TransportSet::platform_default())
    });
    block_on(first_rx).unwrap();
    block_on(second_rx).unwrap();

    assert!(clients["main"].is_configured());
    purchases.assert();
    pageviews.assert();
}
