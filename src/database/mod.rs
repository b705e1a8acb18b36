//! # Database Operations
//!
//! PostgreSQL access for the queue.
//!
//! - [`connection`] - Pool construction, health checks and migrations
//! - [`job_store`] - The [`JobRepository`] contract and its PostgreSQL implementation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use workout_queue::config::ConfigLoader;
//! use workout_queue::database::{DatabaseConnection, JobRepository, PgJobStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load(None)?;
//! let db = DatabaseConnection::connect(&config.database).await?;
//! let store = PgJobStore::new(db.pool().clone());
//! let pending = store.pending_count().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod job_store;

pub use connection::DatabaseConnection;
pub use job_store::{JobRepository, PgJobStore};
