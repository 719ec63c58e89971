//! Minimal embedding example for pfdns-core
//!
//! Drives the engine against an in-memory store, first in dry-run mode and
//! then live, and prints what would be and what was written.

use pfdns_core::config::EngineConfig;
use pfdns_core::record::{Changes, Endpoint};
use pfdns_core::{ApplyOutcome, MemoryRemoteStore, Result, SyncEngine};
use serde_json::json;

async fn run(store: MemoryRemoteStore, dry_run: bool, changes: &Changes) -> Result<()> {
    let config = EngineConfig {
        dry_run,
        ..EngineConfig::default()
    };
    let (engine, mut events) = SyncEngine::new(Box::new(store.clone()), config)?;

    match engine.apply_changes(changes).await? {
        ApplyOutcome::NoChanges => println!("Nothing to apply"),
        ApplyOutcome::DryRun { hosts } => {
            println!("[dry-run] {} host overrides would be written:", hosts.len());
            for host in &hosts {
                println!("  {}.{} -> {}", host.host, host.domain, host.ip);
            }
        }
        ApplyOutcome::Applied { hosts } => {
            println!("[live] wrote {} host overrides", hosts.len());
        }
    }

    while let Ok(event) = events.try_recv() {
        println!("  event: {:?}", event);
    }

    println!("  triggers run: {:?}", store.executed_triggers().await);
    for endpoint in engine.list_endpoints().await? {
        println!(
            "  {} {} {:?}",
            endpoint.name, endpoint.record_type, endpoint.targets
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let store = MemoryRemoteStore::new();
    store
        .set_section(
            "unbound",
            json!({
                "enable": "",
                "hosts": [
                    { "host": "router", "domain": "home.lan", "ip": "10.0.0.1", "descr": "gateway", "aliases": "" }
                ],
                "port": "53"
            }),
        )
        .await;

    let changes = Changes {
        create: vec![
            Endpoint::new("nas.home.lan", "A", ["10.0.0.5"]).with_label("owner", "default"),
            Endpoint::new("printer.home.lan", "A", ["10.0.0.7"]),
        ],
        ..Changes::default()
    };

    println!("=== Dry run ===");
    run(store.clone(), true, &changes).await?;

    println!("=== Live ===");
    run(store.clone(), false, &changes).await?;

    println!("=== Final section ===");
    if let Some(section) = store.section("unbound").await {
        println!("{}", serde_json::to_string_pretty(&section).unwrap_or_default());
    }

    Ok(())
}
