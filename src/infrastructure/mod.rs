//! Infrastructure layer - external concerns

pub mod audit;
pub mod database;

pub use audit::DatabaseAuditLogger;
pub use database::repositories::SeaOrmRepositoryProvider;
pub use database::{init_database, run_migrations, DatabaseConfig};
