//! # dirgate-db
//!
//! SQLite persistence for the directory mirror, issued secrets, SMS
//! templates and the delivery audit.
//!
//! Model methods are generic over [`sqlx::SqliteExecutor`], so the same call
//! works on the pool or inside a transaction:
//!
//! ```rust,ignore
//! use dirgate_db::{run_migrations, DbPool, models::DirectoryUser};
//!
//! let pool = DbPool::connect("sqlite://dirgate.db?mode=rwc").await?;
//! run_migrations(&pool).await?;
//!
//! let mut tx = pool.begin().await?;
//! let user = DirectoryUser::ensure(&mut *tx, "jdoe").await?;
//! tx.commit().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::DbPool;
