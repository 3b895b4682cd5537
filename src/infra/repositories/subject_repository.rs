//! Subjects and their prerequisite edges.
//!
//! Edges live in `subject_prerequisites` as `(subject_id, prerequisite_id)`
//! pairs. Self-reference, duplicate and existence checks happen in
//! `SubjectService` before anything reaches this layer.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::{
    subject::{self, Entity as SubjectEntity},
    subject_prerequisite::{self, Entity as PrerequisiteEntity},
};
use super::SeaStore;
use crate::domain::{NewSubject, Subject, SubjectChanges};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Subject repository trait for dependency injection.
///
/// Every returned `Subject` carries its prerequisite ids.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Find subject by ID
    async fn find_subject(&self, id: Uuid) -> AppResult<Option<Subject>>;

    async fn find_subject_by_code(&self, code: &str) -> AppResult<Option<Subject>>;

    /// All subjects ordered by code
    async fn list_subjects(&self) -> AppResult<Vec<Subject>>;

    /// Subjects whose assigned instructor is `instructor_id`
    async fn list_subjects_for_instructor(&self, instructor_id: Uuid) -> AppResult<Vec<Subject>>;

    /// Create a subject with its prerequisite edges.
    ///
    /// New subjects start without an instructor. A duplicate code is a
    /// `Conflict`.
    async fn insert_subject(&self, subject: NewSubject) -> AppResult<Subject>;

    /// Apply the present fields.
    ///
    /// `None` leaves a column untouched. `Some(prerequisites)` replaces the
    /// whole edge set, so `Some(vec![])` clears it.
    async fn update_subject(&self, id: Uuid, changes: SubjectChanges) -> AppResult<Subject>;

    /// Delete the subject; its enrollments and edges cascade
    async fn delete_subject(&self, id: Uuid) -> AppResult<()>;

    /// Set or clear the assigned instructor
    async fn set_subject_instructor(
        &self,
        id: Uuid,
        instructor_id: Option<Uuid>,
    ) -> AppResult<Subject>;
}

/// Load prerequisite edges for the given rows in one query.
async fn with_prerequisites<C: ConnectionTrait>(
    conn: &C,
    models: Vec<subject::Model>,
) -> AppResult<Vec<Subject>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut edges: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for edge in PrerequisiteEntity::find()
        .filter(subject_prerequisite::Column::SubjectId.is_in(ids))
        .order_by_asc(subject_prerequisite::Column::PrerequisiteId)
        .all(conn)
        .await?
    {
        edges
            .entry(edge.subject_id)
            .or_default()
            .push(edge.prerequisite_id);
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let prerequisites = edges.remove(&model.id).unwrap_or_default();
            subject::into_domain(model, prerequisites)
        })
        .collect())
}

/// Drop every edge of `subject_id` and insert `prerequisites` in its place.
async fn replace_prerequisites<C: ConnectionTrait>(
    conn: &C,
    subject_id: Uuid,
    prerequisites: Vec<Uuid>,
) -> AppResult<()> {
    PrerequisiteEntity::delete_many()
        .filter(subject_prerequisite::Column::SubjectId.eq(subject_id))
        .exec(conn)
        .await?;

    if prerequisites.is_empty() {
        return Ok(());
    }

    let edges = prerequisites
        .into_iter()
        .map(|prerequisite_id| subject_prerequisite::ActiveModel {
            subject_id: Set(subject_id),
            prerequisite_id: Set(prerequisite_id),
        });
    PrerequisiteEntity::insert_many(edges).exec(conn).await?;
    Ok(())
}

impl<C> SeaStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn one_subject(&self, model: Option<subject::Model>) -> AppResult<Option<Subject>> {
        match model {
            Some(model) => Ok(with_prerequisites(self.connection(), vec![model])
                .await?
                .pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<C> SubjectRepository for SeaStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn find_subject(&self, id: Uuid) -> AppResult<Option<Subject>> {
        let model = SubjectEntity::find_by_id(id).one(self.connection()).await?;
        self.one_subject(model).await
    }

    async fn find_subject_by_code(&self, code: &str) -> AppResult<Option<Subject>> {
        let model = SubjectEntity::find()
            .filter(subject::Column::Code.eq(code))
            .one(self.connection())
            .await?;
        self.one_subject(model).await
    }

    async fn list_subjects(&self) -> AppResult<Vec<Subject>> {
        let models = SubjectEntity::find()
            .order_by_asc(subject::Column::Code)
            .all(self.connection())
            .await?;
        with_prerequisites(self.connection(), models).await
    }

    async fn list_subjects_for_instructor(&self, instructor_id: Uuid) -> AppResult<Vec<Subject>> {
        let models = SubjectEntity::find()
            .filter(subject::Column::InstructorId.eq(instructor_id))
            .order_by_asc(subject::Column::Code)
            .all(self.connection())
            .await?;
        with_prerequisites(self.connection(), models).await
    }

    async fn insert_subject(&self, new_subject: NewSubject) -> AppResult<Subject> {
        let model = subject::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_subject.name),
            code: Set(new_subject.code),
            credits: Set(new_subject.credits),
            instructor_id: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(self.connection())
        .await
        .map_err(|e| AppError::from_write(e, "Subject"))?;

        replace_prerequisites(self.connection(), model.id, new_subject.prerequisites.clone())
            .await?;
        Ok(subject::into_domain(model, new_subject.prerequisites))
    }

    async fn update_subject(&self, id: Uuid, changes: SubjectChanges) -> AppResult<Subject> {
        let model = SubjectEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: subject::ActiveModel = model.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(code) = changes.code {
            active.code = Set(code);
        }
        if let Some(credits) = changes.credits {
            active.credits = Set(credits);
        }
        let model = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::from_write(e, "Subject"))?;

        if let Some(prerequisites) = changes.prerequisites {
            replace_prerequisites(self.connection(), id, prerequisites).await?;
        }

        self.one_subject(Some(model))
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn delete_subject(&self, id: Uuid) -> AppResult<()> {
        let result = SubjectEntity::delete_by_id(id)
            .exec(self.connection())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn set_subject_instructor(
        &self,
        id: Uuid,
        instructor_id: Option<Uuid>,
    ) -> AppResult<Subject> {
        let model = SubjectEntity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: subject::ActiveModel = model.into();
        active.instructor_id = Set(instructor_id);
        let model = active.update(self.connection()).await?;

        self.one_subject(Some(model))
            .await?
            .ok_or(AppError::NotFound)
    }
}
