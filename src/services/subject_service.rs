//! Subject service - catalogue management and instructor assignment.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{check_prerequisites, NewSubject, RoleName, Subject, SubjectChanges};
use crate::errors::{AppError, AppResult};
use crate::infra::{Store, SubjectRepository, Transaction, UnitOfWork, UserRepository};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Subject service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SubjectService: Send + Sync {
    async fn list_subjects(&self) -> AppResult<Vec<Subject>>;

    async fn get_subject(&self, id: Uuid) -> AppResult<Subject>;

    async fn create_subject(&self, subject: NewSubject) -> AppResult<Subject>;

    async fn update_subject(&self, id: Uuid, changes: SubjectChanges) -> AppResult<Subject>;

    async fn delete_subject(&self, id: Uuid) -> AppResult<()>;

    /// Replace the subject's instructor. `NotFound` when the subject is
    /// missing or the user does not hold the instructor role.
    async fn assign_instructor(&self, subject_id: Uuid, instructor_id: Uuid) -> AppResult<Subject>;

    /// Subjects currently assigned to the instructor
    async fn assigned_subjects(&self, instructor_id: Uuid) -> AppResult<Vec<Subject>>;
}

fn check_credits(credits: i32) -> AppResult<()> {
    if credits < 1 {
        return Err(AppError::validation("Credits must be a positive integer"));
    }
    Ok(())
}

async fn check_prerequisites_exist<S>(store: &S, prerequisites: &[Uuid]) -> AppResult<()>
where
    S: Store + ?Sized,
{
    for id in prerequisites {
        if store.find_subject(*id).await?.is_none() {
            return Err(AppError::validation(format!(
                "Prerequisite {} does not exist",
                id
            )));
        }
    }
    Ok(())
}

/// Concrete implementation of SubjectService using Unit of Work.
pub struct SubjectManager {
    uow: Arc<dyn UnitOfWork>,
}

impl SubjectManager {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl SubjectService for SubjectManager {
    async fn list_subjects(&self) -> AppResult<Vec<Subject>> {
        self.uow.store().list_subjects().await
    }

    async fn get_subject(&self, id: Uuid) -> AppResult<Subject> {
        self.uow
            .store()
            .find_subject(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn create_subject(&self, subject: NewSubject) -> AppResult<Subject> {
        check_credits(subject.credits)?;
        check_prerequisites(None, &subject.prerequisites)?;

        let tx = self.uow.begin().await?;
        check_prerequisites_exist(&*tx, &subject.prerequisites).await?;
        let subject = tx.insert_subject(subject).await?;
        tx.commit().await?;

        tracing::info!(subject_id = %subject.id, code = %subject.code, "Subject created");
        Ok(subject)
    }

    async fn update_subject(&self, id: Uuid, changes: SubjectChanges) -> AppResult<Subject> {
        if let Some(credits) = changes.credits {
            check_credits(credits)?;
        }
        if let Some(prerequisites) = &changes.prerequisites {
            check_prerequisites(Some(id), prerequisites)?;
        }

        let tx = self.uow.begin().await?;
        if let Some(prerequisites) = &changes.prerequisites {
            check_prerequisites_exist(&*tx, prerequisites).await?;
        }
        let subject = tx.update_subject(id, changes).await?;
        tx.commit().await?;

        tracing::info!(subject_id = %id, "Subject updated");
        Ok(subject)
    }

    async fn delete_subject(&self, id: Uuid) -> AppResult<()> {
        self.uow.store().delete_subject(id).await?;
        tracing::info!(subject_id = %id, "Subject deleted");
        Ok(())
    }

    async fn assign_instructor(&self, subject_id: Uuid, instructor_id: Uuid) -> AppResult<Subject> {
        let store = self.uow.store();
        if store.find_subject(subject_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let instructor = store
            .find_user(instructor_id)
            .await?
            .filter(|user| user.has_role(RoleName::Instructor))
            .ok_or(AppError::NotFound)?;

        let subject = store
            .set_subject_instructor(subject_id, Some(instructor.id))
            .await?;

        tracing::info!(
            subject_id = %subject_id,
            instructor_id = %instructor_id,
            "Instructor assigned"
        );
        Ok(subject)
    }

    async fn assigned_subjects(&self, instructor_id: Uuid) -> AppResult<Vec<Subject>> {
        self.uow
            .store()
            .list_subjects_for_instructor(instructor_id)
            .await
    }
}
