//! Service Container - Centralized service access with parallel execution support.
//!
//! Depends on service traits, not implementations. Every service shares the
//! same `UnitOfWork`, so handlers and jobs see one store.

use std::future::Future;
use std::sync::Arc;

use super::{
    AccountManager, AccountService, AuthService, Authenticator, EnrollmentManager,
    EnrollmentService, NotificationManager, NotificationService, ReportManager, ReportService,
    StatisticsManager, StatisticsService, SubjectManager, SubjectService,
};
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::UnitOfWork;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn accounts(&self) -> Arc<dyn AccountService>;

    fn subjects(&self) -> Arc<dyn SubjectService>;

    fn enrollments(&self) -> Arc<dyn EnrollmentService>;

    fn notifications(&self) -> Arc<dyn NotificationService>;

    fn statistics(&self) -> Arc<dyn StatisticsService>;

    fn reports(&self) -> Arc<dyn ReportService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    account_service: Arc<dyn AccountService>,
    subject_service: Arc<dyn SubjectService>,
    enrollment_service: Arc<dyn EnrollmentService>,
    notification_service: Arc<dyn NotificationService>,
    statistics_service: Arc<dyn StatisticsService>,
    report_service: Arc<dyn ReportService>,
}

impl Services {
    /// Wire every service over one unit of work. The notification manager
    /// doubles as the sink the mutating services emit into.
    pub fn from_unit_of_work(uow: Arc<dyn UnitOfWork>, config: Config) -> Self {
        let notifications = Arc::new(NotificationManager::new(uow.clone()));

        Self {
            auth_service: Arc::new(Authenticator::new(uow.users(), config)),
            account_service: Arc::new(AccountManager::new(uow.clone(), notifications.clone())),
            subject_service: Arc::new(SubjectManager::new(uow.clone())),
            enrollment_service: Arc::new(EnrollmentManager::new(
                uow.clone(),
                notifications.clone(),
            )),
            statistics_service: Arc::new(StatisticsManager::new(uow.clone())),
            report_service: Arc::new(ReportManager::new(uow)),
            notification_service: notifications,
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn accounts(&self) -> Arc<dyn AccountService> {
        self.account_service.clone()
    }

    fn subjects(&self) -> Arc<dyn SubjectService> {
        self.subject_service.clone()
    }

    fn enrollments(&self) -> Arc<dyn EnrollmentService> {
        self.enrollment_service.clone()
    }

    fn notifications(&self) -> Arc<dyn NotificationService> {
        self.notification_service.clone()
    }

    fn statistics(&self) -> Arc<dyn StatisticsService> {
        self.statistics_service.clone()
    }

    fn reports(&self) -> Arc<dyn ReportService> {
        self.report_service.clone()
    }
}

/// Parallel execution utilities for running independent operations concurrently.
pub mod parallel {
    use super::*;
    use tokio::try_join;

    /// Execute two independent async operations in parallel.
    ///
    /// If either operation fails, the error is returned immediately.
    ///
    /// # Example
    /// ```ignore
    /// let (profile, history) = parallel::join2(
    ///     store.find_student_profile(id),
    ///     store.list_student_enrollments(id),
    /// ).await?;
    /// ```
    pub async fn join2<F1, F2, T1, T2>(f1: F1, f2: F2) -> AppResult<(T1, T2)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
    {
        try_join!(f1, f2)
    }

    /// Execute three independent async operations in parallel.
    pub async fn join3<F1, F2, F3, T1, T2, T3>(
        f1: F1,
        f2: F2,
        f3: F3,
    ) -> AppResult<(T1, T2, T3)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
        F3: Future<Output = AppResult<T3>>,
    {
        try_join!(f1, f2, f3)
    }

    /// Execute a collection of homogeneous async operations in parallel.
    ///
    /// Results are returned in the same order as the input futures.
    pub async fn join_all<F, T>(futures: Vec<F>) -> AppResult<Vec<T>>
    where
        F: Future<Output = AppResult<T>>,
    {
        let results = futures::future::join_all(futures).await;
        results.into_iter().collect()
    }
}
