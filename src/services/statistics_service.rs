//! Statistics service - read-only dashboard rollups.

use async_trait::async_trait;
use std::sync::Arc;

use super::parallel;
use crate::domain::AdminStatistics;
use crate::errors::AppResult;
use crate::infra::{EnrollmentRepository, SubjectRepository, UnitOfWork, UserRepository};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait StatisticsService: Send + Sync {
    async fn admin_statistics(&self) -> AppResult<AdminStatistics>;
}

pub struct StatisticsManager {
    uow: Arc<dyn UnitOfWork>,
}

impl StatisticsManager {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl StatisticsService for StatisticsManager {
    async fn admin_statistics(&self) -> AppResult<AdminStatistics> {
        let store = self.uow.store();
        let (users, subjects, enrollments) = parallel::join3(
            store.list_users(),
            store.list_subjects(),
            store.list_enrollments(),
        )
        .await?;

        tracing::debug!(
            users = users.len(),
            subjects = subjects.len(),
            enrollments = enrollments.len(),
            "Computing admin statistics"
        );
        Ok(AdminStatistics::compute(&users, &subjects, &enrollments))
    }
}
