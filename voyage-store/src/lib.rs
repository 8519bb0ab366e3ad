pub mod app_config;
pub mod database;
pub mod memory_repo;
pub mod pg_repo;
pub mod events;

pub use database::DbClient;
pub use memory_repo::{InMemoryStore, StoreSeed};
pub use pg_repo::PostgresStore;
pub use events::EventProducer;
