//! Persistence for users and goals.
//!
//! Two backends implement the same [`GoalStore`] and [`UserStore`] traits:
//! [`MemoryStore`] for development and tests, [`PgStore`] for PostgreSQL.

pub mod error;
pub mod memory;
pub mod password;
pub mod postgres;
pub mod traits;

use std::sync::Arc;

use tracing::{info, warn};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use traits::{GoalStore, Store, UserStore};

/// Open the configured backend: PostgreSQL when configured, otherwise an
/// in-memory store whose contents are lost on restart.
pub async fn open_store(
    config: &doordont_core::config::PostgresConfig,
) -> StoreResult<Arc<dyn Store>> {
    if config.is_configured() {
        let store = PgStore::connect(config).await?;
        Ok(Arc::new(store))
    } else {
        warn!("PostgreSQL not configured, using in-memory store (data is not persisted)");
        info!("Storage: in-memory backend");
        Ok(Arc::new(MemoryStore::new()))
    }
}
