use keen_rs_sdk::tracker::{
    record_pending, replay_pending_calls, Callbacks, ClientConfig, EventPayload,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Calls issued before the tracker is ready are recorded against a stand-in.
    record_pending("main", |client| {
        client
            .add_event("pageviews", EventPayload::new(), Callbacks::none())
            .configure(ClientConfig::new("demo-project").with_write_key("demo-write-key"))
            .on_ready(|keen| println!("ready with {:?}", keen.resolved_transport()));
    })?;

    let clients = replay_pending_calls();
    println!("replayed {} client(s)", clients.len());

    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    Ok(())
}
