//! Enrollments, grades and the grade-driven state machine.
//!
//! `enrolled` moves to `approved` or `failed` when graded, and every graded
//! enrollment of a subject moves to `closed` together. `closed` is terminal.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{MAX_GRADE, MIN_GRADE, PASSING_GRADE_TENTHS};
use crate::errors::{AppError, AppResult};

/// Enrollment lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentState {
    Enrolled,
    Approved,
    Failed,
    Closed,
}

impl EnrollmentState {
    pub const ALL: [EnrollmentState; 4] = [
        EnrollmentState::Enrolled,
        EnrollmentState::Approved,
        EnrollmentState::Failed,
        EnrollmentState::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentState::Enrolled => "enrolled",
            EnrollmentState::Approved => "approved",
            EnrollmentState::Failed => "failed",
            EnrollmentState::Closed => "closed",
        }
    }

    /// States that block another enrollment in the same subject.
    /// A failed subject may be retaken.
    pub fn blocks_reenrollment(&self) -> bool {
        !matches!(self, EnrollmentState::Failed)
    }
}

impl std::fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnrollmentState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrolled" => Ok(EnrollmentState::Enrolled),
            "approved" => Ok(EnrollmentState::Approved),
            "failed" => Ok(EnrollmentState::Failed),
            "closed" => Ok(EnrollmentState::Closed),
            other => Err(AppError::internal(format!(
                "Unknown enrollment state '{}'",
                other
            ))),
        }
    }
}

/// A grade in [0.0, 5.0] held with exactly one fractional digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Grade(Decimal);

impl Grade {
    /// Validate a submitted value and round it to the nearest tenth.
    ///
    /// Values outside the range are rejected with the offending value,
    /// never clamped. Midpoints round to even.
    pub fn from_value(value: f64) -> AppResult<Self> {
        if !(MIN_GRADE..=MAX_GRADE).contains(&value) {
            return Err(AppError::InvalidGrade(value));
        }
        let exact = Decimal::from_f64(value).ok_or(AppError::InvalidGrade(value))?;
        Ok(Self(to_tenths(exact)))
    }

    /// Rebuild a grade read back from storage.
    pub fn from_stored(value: Decimal) -> Self {
        Self(to_tenths(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// State a freshly graded enrollment takes.
    pub fn outcome(&self) -> EnrollmentState {
        if self.0 >= Decimal::new(PASSING_GRADE_TENTHS, 1) {
            EnrollmentState::Approved
        } else {
            EnrollmentState::Failed
        }
    }
}

fn to_tenths(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(1, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(1);
    rounded
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// Arithmetic mean of the given grades, `None` when there are none.
pub fn mean_grade(grades: impl IntoIterator<Item = Grade>) -> Option<Decimal> {
    let (sum, count) = grades
        .into_iter()
        .fold((Decimal::ZERO, 0u32), |(sum, count), grade| {
            (sum + grade.value(), count + 1)
        });

    if count == 0 {
        None
    } else {
        Some(sum / Decimal::from(count))
    }
}

/// Student x Subject row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub state: EnrollmentState,
    #[schema(value_type = Option<f64>, example = 4.5)]
    pub grade: Option<Grade>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }
}

/// Enrollment joined with the subject columns most views need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EnrollmentDetail {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub subject_name: String,
    pub subject_code: String,
    pub credits: i32,
    pub instructor_id: Option<Uuid>,
}

/// GPA over every graded enrollment regardless of state; 0 when none.
pub fn gpa<'a>(enrollments: impl IntoIterator<Item = &'a Enrollment>) -> Decimal {
    mean_grade(enrollments.into_iter().filter_map(|e| e.grade)).unwrap_or(Decimal::ZERO)
}
