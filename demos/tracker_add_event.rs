use std::error::Error;

use keen_rs_sdk::logger::{set_log_level, LogLevel};
use keen_rs_sdk::tracker::{ClientConfig, Keen, TransportPreference};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    set_log_level(LogLevel::Debug)?;

    // Replace with the values from your Keen IO project.
    let config = ClientConfig::new("demo-project")
        .with_write_key("demo-write-key")
        .with_transport(TransportPreference::Auto)
        .with_global_properties(|collection| {
            json!({ "source": "demo", "collection": collection })
                .as_object()
                .cloned()
                .unwrap_or_default()
        });
    let keen = Keen::new(Some(config));
    println!("using {:?} transport", keen.resolved_transport());

    let purchase = json!({ "item": "lamp", "price": 49 })
        .as_object()
        .cloned()
        .unwrap_or_default();
    match keen.add_event_async("purchases", purchase).await {
        Ok(response) => println!("event stored: {response}"),
        Err(err) => eprintln!("event failed: {err}"),
    }

    Ok(())
}
