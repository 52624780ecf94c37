//! SQLite persistence for the reply routing pipeline.
//!
//! The pipeline reads routing rules (sections, tags, company codes, bounce
//! filters, client config) and appends to the activity and error logs. All
//! rule mutation happens through the admin surface, which shares this schema;
//! from the pipeline's perspective the rule tables are read-only snapshots
//! loaded fresh per event.

pub mod error;
pub mod logs;
pub mod routing;
pub mod rules;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use types::*;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Handle to the backing database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if missing) the database at the given sqlite URL,
    /// e.g. `sqlite://replyhub.db` or `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // Single connection: sqlite serializes writers anyway, and a pool of
        // `:memory:` connections would each see a different database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates all tables and indexes if they do not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        schema::init(&self.pool).await
    }
}

#[cfg(test)]
pub(crate) mod testutils {
    use super::Store;

    pub async fn memory_store() -> Store {
        let store = Store::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        store.init_schema().await.expect("schema");
        store
    }
}
