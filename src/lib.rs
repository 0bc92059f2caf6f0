pub mod catalog;
pub mod chatbot;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod server;
pub mod session;

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::db::PatientStore;
use crate::error::AppResult;
use crate::server::AppState;

/// Open the store, load the catalog, and serve the portal.
pub async fn run(config: AppConfig) -> AppResult<()> {
    let store = PatientStore::open(&config.db_path)?;
    let created = store.ensure_schema()?;

    let catalog = Catalog::load(config.catalog_path.as_deref())?;

    let state = AppState::new(store, catalog);
    if created {
        // Surfaced as a banner on the first page render.
        state.set_store_notice("Created patients table in the database");
    }

    server::start_server(config.port, state).await
}
