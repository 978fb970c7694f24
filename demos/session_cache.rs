//! FlashStore demo: a file-backed local scope and an in-memory session scope.
//!
//! Run it twice: values written to `local` on the first run are still there
//! on the second, `session` starts empty every time, and the short-lived
//! token is swept when the storage is reopened.
//!
//! ```text
//! RUST_LOG=flashstore=debug cargo run --example session_cache
//! ```

use flashstore::{start_expiry_sweeper, Expiry, LogicalKey, Storage};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .init();

    let path = std::env::temp_dir().join("flashstore-demo.json");
    let storage = Arc::new(Storage::open(&path)?);
    info!(path = %path.display(), "Opened storage");

    let local = storage.local();
    let visits = local.get_as::<u64>("visits")?.unwrap_or(0) + 1;
    local.set("visits", &visits, None)?;
    local.update("profile", &json!({"last_visit": visits}), None)?;

    let token = LogicalKey::new("token").in_namespace("auth");
    local.set(&token, "abc123", Some(Expiry::after(Duration::from_millis(500))))?;
    storage.session().set("scratch", &json!({"visit": visits}), None)?;

    info!(
        visits = visits,
        profile = %local.get("profile")?.unwrap_or_default(),
        keys = ?local.keys()?,
        "Local scope"
    );

    let _sweeper = start_expiry_sweeper(Arc::clone(&storage));
    tokio::time::sleep(Duration::from_secs(2)).await;

    info!(
        token_live = local.has(&token)?,
        local_stats = ?local.stats(),
        session_stats = ?storage.session().stats(),
        "Done"
    );

    Ok(())
}
