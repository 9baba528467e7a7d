//! Probe: resolve the signed-in administrator's landing page and the guard
//! decision for one module, using the same store the console uses.

use std::sync::Arc;

use anyhow::Context;
use adminpanel_auth::{DASHBOARD, ModuleCatalog, RouteRequirement};
use adminpanel_client::{ClientConfig, FileStorage, HttpProfileFetcher, ProfileStore, Session};
use adminpanel_core::SystemClock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    adminpanel_observability::init();

    let config = ClientConfig::from_env().context("invalid client configuration")?;
    let storage = Arc::new(
        FileStorage::open(&config.storage_path)
            .with_context(|| format!("failed to open storage at {:?}", config.storage_path))?,
    );

    if let Ok(token) = std::env::var("ADMINPANEL_TOKEN") {
        tracing::info!("establishing session from ADMINPANEL_TOKEN");
        Session::new(storage.clone())
            .establish(&token, Some("admin"))
            .context("failed to persist session token")?;
    }

    let module = std::env::args().nth(1).unwrap_or_else(|| DASHBOARD.to_string());
    let action = std::env::args().nth(2).unwrap_or_else(|| "view".to_string());

    let fetcher = HttpProfileFetcher::new(config.api_url.clone());
    let store = ProfileStore::new(fetcher, storage, SystemClock, config.store_options());
    let snapshot = store.ensure_profile().await;

    if let Some(err) = &snapshot.error {
        tracing::warn!("profile unavailable: {err}");
    }

    let catalog = ModuleCatalog::standard();
    let resolver = snapshot.resolver(&catalog);
    match resolver.first_accessible_page() {
        Some(entry) => println!("landing page: {} ({})", entry.path, entry.module),
        None => println!("landing page: none"),
    }

    let requirement = RouteRequirement::new(module.clone()).with_action(action.clone());
    let decision = snapshot.guard(&catalog, &requirement, &format!("/{module}"));
    println!("{}", serde_json::to_string_pretty(&decision)?);
    println!("{}", resolver.explain(&module, &action).message());

    Ok(())
}
