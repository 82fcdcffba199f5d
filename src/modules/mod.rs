pub mod books;
pub mod ranking;

use shelf_db::SharedStore;
use shelf_kernel::{settings::Settings, ModuleRegistry};

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, store: &SharedStore, settings: &Settings) {
    registry.register_custom(books::create_module(store.clone(), &settings.pagination));
    registry.register_custom(ranking::create_module(store.clone(), &settings.pagination));
}
