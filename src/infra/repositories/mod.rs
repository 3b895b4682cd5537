//! Repository layer - Data access abstraction
//!
//! One trait per aggregate. `SeaStore` implements every trait over any
//! SeaORM connection, pooled or transactional, and `Store` is the union
//! the services program against.

pub(crate) mod entities;
mod enrollment_repository;
mod notification_repository;
mod subject_repository;
mod user_repository;

use sea_orm::ConnectionTrait;

pub use enrollment_repository::EnrollmentRepository;
pub use notification_repository::NotificationRepository;
pub use subject_repository::SubjectRepository;
pub use user_repository::{ProfileRepository, RoleRepository, UserRepository};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use enrollment_repository::MockEnrollmentRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use notification_repository::MockNotificationRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use subject_repository::MockSubjectRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::{MockProfileRepository, MockRoleRepository, MockUserRepository};

/// Every repository behind one object.
pub trait Store:
    UserRepository
    + RoleRepository
    + ProfileRepository
    + SubjectRepository
    + EnrollmentRepository
    + NotificationRepository
{
}

impl<T> Store for T where
    T: UserRepository
        + RoleRepository
        + ProfileRepository
        + SubjectRepository
        + EnrollmentRepository
        + NotificationRepository
        + ?Sized
{
}

/// SeaORM-backed store over a pooled connection or an open transaction.
pub struct SeaStore<C> {
    conn: C,
}

impl<C: ConnectionTrait> SeaStore<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Give back the wrapped connection (used to commit a transaction).
    pub fn into_inner(self) -> C {
        self.conn
    }
}
