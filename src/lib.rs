//! SHELF application library: the catalog and ranking modules plus the
//! bootstrap shared by the server and CLI binaries.
#![recursion_limit = "256"]

pub mod modules;
pub mod utils;

use anyhow::Context;
use shelf_db::SharedStore;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Registry with the `db` core module and every application module.
pub fn build_registry(settings: &Settings, store: SharedStore) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register_core(shelf_db::create_module(store.clone()));
    modules::register_all(&mut registry, &store, settings);
    registry
}

/// Bring `store`'s schema up to date with every registered module's
/// migrations. Returns how many ran.
pub async fn apply_migrations(registry: &ModuleRegistry, store: &SharedStore) -> anyhow::Result<usize> {
    let applied = store
        .apply_migrations(&registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, "catalog schema up to date");
    Ok(applied)
}

/// Connect the store, migrate it, run module lifecycle, and serve until
/// shutdown.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let store = shelf_db::connect(&settings.database).context("failed to open catalog store")?;
    let registry = build_registry(&settings, store.clone());
    apply_migrations(&registry, &store).await?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = shelf_http::start_server(&registry, &settings).await;
    registry.stop_all().await?;
    served
}
