// ! # Capture and analyze authorization endpoints
// !
// ! Feeds the URLs given on the command line through a capture store, then
// ! analyzes every captured endpoint and prints the reports as JSON.
// !
// ! ```text
// ! cargo run --example analyze --features full -- \
// !     "https://idp.example/authorize?client_id=x&redirect_uri=https://app.example/cb&state=s1"
// ! ```
// !
// ! Captures persist under the platform data directory; set
// ! `OAUTH_PROBE_STORE=/path/to/capture.json` to use another file.

use std::sync::Arc;

use oauth_probe::prelude::*;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ProbeResult<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        eprintln!("usage: analyze <authorization-url>...");
        return Ok(());
    }

    let backend: Arc<dyn KeyValueStore> = match std::env::var("OAUTH_PROBE_STORE") {
        Ok(path) => Arc::new(JsonFileStore::new(path)),
        Err(_) => Arc::new(JsonFileStore::in_data_dir()?),
    };
    let store = Arc::new(CaptureStore::load(backend, CapturePolicy::default()).await?);
    eprintln!("capture store has {} endpoint(s)", store.snapshot().await.counter);

    // Simulate the interception hook: every URL comes from tab 1
    let (tx, rx) = mpsc::channel(16);
    let feed = tokio::spawn(Arc::clone(&store).consume_feed(rx));
    for url in urls {
        if tx.send(ObservedRequest::from_tab(url, 1)).await.is_err() {
            break;
        }
    }
    drop(tx);
    let added = feed
        .await
        .map_err(|e| ProbeError::internal(format!("capture feed task failed: {e}")))?;

    let snapshot = store.snapshot().await;
    eprintln!(
        "captured {added} new endpoint(s), {} in store",
        snapshot.counter
    );

    let analyzer = Analyzer::new(ProbeConfig::default())?;
    for result in analyzer.analyze_all(&snapshot.endpoints).await {
        match result {
            Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            Err(e) => e.log_error("analyze"),
        }
    }

    Ok(())
}
