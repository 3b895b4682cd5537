//! Subjects and their prerequisite graph.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// A course with a credit weight and prerequisite edges.
///
/// Prerequisites form a DAG by convention; acyclicity is not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    pub id: Uuid,
    #[schema(example = "Programming II")]
    pub name: String,
    #[schema(example = "PRO102")]
    pub code: String,
    #[schema(example = 3)]
    pub credits: i32,
    pub instructor_id: Option<Uuid>,
    pub prerequisites: Vec<Uuid>,
}

impl Subject {
    pub fn is_taught_by(&self, instructor_id: Uuid) -> bool {
        self.instructor_id == Some(instructor_id)
    }
}

/// Input for inserting a subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubject {
    pub name: String,
    pub code: String,
    pub credits: i32,
    pub prerequisites: Vec<Uuid>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub credits: Option<i32>,
    pub prerequisites: Option<Vec<Uuid>>,
}

/// Reject self-references and repeated ids in a prerequisite list.
pub fn check_prerequisites(subject_id: Option<Uuid>, prerequisites: &[Uuid]) -> AppResult<()> {
    if let Some(id) = subject_id {
        if prerequisites.contains(&id) {
            return Err(AppError::validation(
                "A subject cannot be its own prerequisite",
            ));
        }
    }

    let mut seen = std::collections::HashSet::new();
    if !prerequisites.iter().all(|id| seen.insert(*id)) {
        return Err(AppError::validation("Prerequisites must not repeat"));
    }

    Ok(())
}
