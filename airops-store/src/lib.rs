pub mod app_config;
pub mod database;
pub mod maintenance_repo;
pub mod memory_repo;
pub mod seat_repo;
pub mod user_repo;

pub use database::DbClient;
pub use maintenance_repo::PostgresMaintenanceStore;
pub use memory_repo::{InMemoryCredentialStore, InMemoryMaintenanceStore, InMemorySeatStore};
pub use seat_repo::PostgresSeatStore;
pub use user_repo::PostgresCredentialStore;
