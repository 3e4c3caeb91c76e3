use std::sync::Arc;

use anyhow::Context;

use modbot::channels::{CliTransport, DeliveryQueue, Transport, spawn_delivery_task};
use modbot::config::RuntimeConfig;
use modbot::moderation::ModerationState;
use modbot::router::EventRouter;
use modbot::store::{self, JsonFileStore, StateStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let runtime = RuntimeConfig::from_env();

    // ── State ────────────────────────────────────────────────────────────
    let json_store = JsonFileStore::from_runtime(&runtime);
    let state_store: Arc<dyn StateStore> = Arc::new(json_store.clone());

    let config = store::load_or_init_config(state_store.as_ref())
        .await
        .with_context(|| format!("loading config from {}", json_store.config_path().display()))?;
    let ledger = state_store
        .load_warnings()
        .await
        .with_context(|| format!("loading warnings from {}", json_store.warnings_path().display()))?;

    eprintln!("🛡️  modbot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Bot: {} ({})", config.bot_name, config.group_name);
    eprintln!("   Owner: {}", config.owner.number());
    eprintln!("   Config: {}", json_store.config_path().display());
    eprintln!("   Warnings: {} ({} members)", json_store.warnings_path().display(), ledger.len());
    eprintln!(
        "   Flood control: {}",
        if config.flood_control.enabled {
            format!(
                "{} msgs / {}s",
                config.flood_control.max_messages_per_window, config.flood_control.window_seconds
            )
        } else {
            "off".to_string()
        }
    );
    eprintln!(
        "   Quiet hours: {}",
        if config.quiet_hours.enabled {
            format!(
                "{:02}:00-{:02}:00 {}",
                config.quiet_hours.start_hour, config.quiet_hours.end_hour, config.quiet_hours.timezone
            )
        } else {
            "off".to_string()
        }
    );
    eprintln!("   Input: <chat> <sender> <text> | /join <chat> <numbers> | /leave <chat> <numbers>\n");

    // ── Transport + delivery ─────────────────────────────────────────────
    let transport: Arc<dyn Transport> = Arc::new(CliTransport::new());
    let events = transport.start().await?;

    let (delivery, rx) = DeliveryQueue::new();
    let delivery_handle = spawn_delivery_task(Arc::clone(&transport), rx);

    // ── Router ───────────────────────────────────────────────────────────
    let router = EventRouter::new(ModerationState::new(config, ledger), state_store, delivery);

    tokio::select! {
        _ = router.run(events) => {
            // Router dropped its queue handle; let pending replies drain.
            delivery_handle.await.ok();
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
