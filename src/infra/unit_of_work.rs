//! Unit of Work pattern implementation.
//!
//! A `UnitOfWork` hands out the pooled `Store` for single-statement reads and
//! writes, and opens a `Transaction` when an operation touches several rows.
//! A transaction that is dropped without `commit` is rolled back.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, IsolationLevel,
    Statement, TransactionTrait,
};

use super::repositories::{SeaStore, Store, UserRepository};
use crate::errors::AppResult;

/// A `Store` whose writes become visible only on `commit`.
#[async_trait]
pub trait Transaction: Store {
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work trait for dependency injection.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Repositories outside any transaction
    fn store(&self) -> &dyn Store;

    /// Shared handle to the user repository
    fn users(&self) -> Arc<dyn UserRepository>;

    /// Begin a read-committed transaction
    async fn begin(&self) -> AppResult<Box<dyn Transaction>>;

    /// Begin a serializable transaction, for check-then-write sequences
    async fn begin_serializable(&self) -> AppResult<Box<dyn Transaction>>;

    /// Check storage connectivity
    async fn ping(&self) -> AppResult<()>;
}

/// Concrete implementation of UnitOfWork over a Postgres pool
pub struct Persistence {
    store: Arc<SeaStore<DatabaseConnection>>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            store: Arc::new(SeaStore::new(db)),
        }
    }

    async fn begin_with(&self, isolation: IsolationLevel) -> AppResult<Box<dyn Transaction>> {
        let txn = self
            .store
            .connection()
            .begin_with_config(Some(isolation), Some(AccessMode::ReadWrite))
            .await?;

        Ok(Box::new(SeaStore::new(txn)))
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    fn users(&self) -> Arc<dyn UserRepository> {
        self.store.clone()
    }

    async fn begin(&self) -> AppResult<Box<dyn Transaction>> {
        self.begin_with(IsolationLevel::ReadCommitted).await
    }

    async fn begin_serializable(&self) -> AppResult<Box<dyn Transaction>> {
        self.begin_with(IsolationLevel::Serializable).await
    }

    async fn ping(&self) -> AppResult<()> {
        let conn = self.store.connection();
        conn.execute(Statement::from_string(
            conn.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Transaction for SeaStore<DatabaseTransaction> {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        (*self).into_inner().commit().await?;
        Ok(())
    }
}
