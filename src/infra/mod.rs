//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connection and migrations
//! - Repositories over SeaORM entities
//! - Unit of Work for transaction management
//! - The in-memory store used by tests and demos

pub mod db;
pub mod memory;
pub mod repositories;
pub mod unit_of_work;

use std::sync::Arc;

pub use db::{Database, Migrator};
pub use memory::MemoryStore;
pub use repositories::{
    EnrollmentRepository, NotificationRepository, ProfileRepository, RoleRepository, SeaStore,
    Store, SubjectRepository, UserRepository,
};
pub use unit_of_work::{Persistence, Transaction, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{
    MockEnrollmentRepository, MockNotificationRepository, MockProfileRepository,
    MockRoleRepository, MockSubjectRepository, MockUserRepository,
};

use crate::config::Config;
use crate::errors::AppResult;

/// Open the store selected by `DATABASE_URL`, applying pending migrations.
pub async fn connect(config: &Config) -> AppResult<Arc<dyn UnitOfWork>> {
    if config.uses_memory_store() {
        tracing::info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let database = Database::connect(config).await?;
    Ok(Arc::new(Persistence::new(database.get_connection())))
}
