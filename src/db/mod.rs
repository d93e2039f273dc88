//! Database module: the `schools` table and its pooled access.
//!
//! Layout:
//! - `models.rs`: row struct and insert payload
//! - `schema.rs`: DDL per dialect (SQLite, MySQL)
//! - `store.rs`: parameterized queries over an `sqlx` any-pool

pub mod models;
pub mod schema;
pub mod store;

pub use models::{NewSchool, School};
pub use schema::{Dialect, MYSQL_INIT, SQLITE_INIT};
pub use store::SchoolStore;

use tokio::sync::OnceCell;

use crate::config::CONFIG;
use crate::error::DirectoryError;

static STORE: OnceCell<SchoolStore> = OnceCell::const_new();

/// Process-wide store, connected from `CONFIG` on first use and never torn down.
pub async fn global() -> Result<&'static SchoolStore, DirectoryError> {
    STORE
        .get_or_try_init(|| SchoolStore::from_config(&CONFIG.database))
        .await
}
