//! Postgres + pgvector vector store.

pub mod connection;
pub mod migrations;
mod store;

pub use connection::{create_pool, verify_connection, ConnectionError, PoolConfig};
pub use migrations::{Migrator, MigrationError};
pub use store::PgVectorStore;
