//! Report service - CSV exports of student and instructor records.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::parallel;
use crate::domain::{mean_grade, EnrollmentDetail, RoleName, Subject, User};
use crate::errors::{AppError, AppResult};
use crate::infra::{EnrollmentRepository, SubjectRepository, UnitOfWork, UserRepository};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

pub const STUDENT_REPORT_HEADER: [&str; 4] = ["Name", "Subject", "Grade", "State"];
pub const INSTRUCTOR_REPORT_HEADER: [&str; 3] = ["Name", "Subject", "Average"];

/// A rendered CSV document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub filename: String,
    pub content: String,
}

/// Report service trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReportService: Send + Sync {
    /// One row per enrollment of the student. `NotFound` unless the user
    /// holds the student role.
    async fn student_report(&self, student_id: Uuid) -> AppResult<Report>;

    /// One row per subject assigned to the instructor with its average.
    async fn instructor_report(&self, instructor_id: Uuid) -> AppResult<Report>;
}

fn finish(writer: csv::Writer<Vec<u8>>) -> AppResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::internal(format!("Failed to flush report: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::internal(e.to_string()))
}

/// Render a student's enrollments. Ungraded rows leave the grade blank.
pub fn render_student_report(student: &User, rows: &[EnrollmentDetail]) -> AppResult<String> {
    let name = student.display_name();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(STUDENT_REPORT_HEADER)?;

    for row in rows {
        let grade = row
            .enrollment
            .grade
            .map(|g| g.to_string())
            .unwrap_or_default();
        writer.write_record([
            name.as_str(),
            row.subject_name.as_str(),
            grade.as_str(),
            row.enrollment.state.as_str(),
        ])?;
    }

    finish(writer)
}

/// Render per-subject averages at two decimals, blank when a subject has
/// no grades yet.
pub fn render_instructor_report(
    instructor: &User,
    subjects: &[(Subject, Option<Decimal>)],
) -> AppResult<String> {
    let name = instructor.display_name();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(INSTRUCTOR_REPORT_HEADER)?;

    for (subject, average) in subjects {
        let average = average
            .map(|avg| format!("{:.2}", avg))
            .unwrap_or_default();
        writer.write_record([name.as_str(), subject.name.as_str(), average.as_str()])?;
    }

    finish(writer)
}

pub struct ReportManager {
    uow: Arc<dyn UnitOfWork>,
}

impl ReportManager {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    async fn user_with_role(&self, id: Uuid, role: RoleName) -> AppResult<User> {
        self.uow
            .store()
            .find_user(id)
            .await?
            .filter(|user| user.has_role(role))
            .ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl ReportService for ReportManager {
    async fn student_report(&self, student_id: Uuid) -> AppResult<Report> {
        let student = self.user_with_role(student_id, RoleName::Student).await?;
        let rows = self
            .uow
            .store()
            .list_student_enrollments(student_id)
            .await?;

        let content = render_student_report(&student, &rows)?;
        tracing::debug!(student_id = %student_id, rows = rows.len(), "Rendered student report");
        Ok(Report {
            filename: format!("student_report_{}.csv", student.id),
            content,
        })
    }

    async fn instructor_report(&self, instructor_id: Uuid) -> AppResult<Report> {
        let instructor = self
            .user_with_role(instructor_id, RoleName::Instructor)
            .await?;
        let store = self.uow.store();

        let assigned = store.list_subjects_for_instructor(instructor_id).await?;
        let rosters = parallel::join_all(
            assigned
                .iter()
                .map(|subject| store.list_subject_enrollments(subject.id))
                .collect(),
        )
        .await?;

        let subjects: Vec<(Subject, Option<Decimal>)> = assigned
            .into_iter()
            .zip(rosters)
            .map(|(subject, rows)| {
                let average = mean_grade(rows.iter().filter_map(|row| row.enrollment.grade));
                (subject, average)
            })
            .collect();

        let content = render_instructor_report(&instructor, &subjects)?;
        tracing::debug!(
            instructor_id = %instructor_id,
            subjects = subjects.len(),
            "Rendered instructor report"
        );
        Ok(Report {
            filename: format!("instructor_report_{}.csv", instructor.id),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Enrollment, EnrollmentState, Grade};
    use chrono::Utc;

    fn user(first: &str, last: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            password_hash: String::new(),
            role: Some(RoleName::Student),
            created_at: now,
            updated_at: now,
        }
    }

    fn subject(name: &str) -> Subject {
        Subject {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: name.to_uppercase(),
            credits: 4,
            instructor_id: None,
            prerequisites: Vec::new(),
        }
    }

    fn row(subject_name: &str, grade: Option<f64>) -> EnrollmentDetail {
        let now = Utc::now();
        let grade = grade.map(|value| Grade::from_value(value).unwrap());
        EnrollmentDetail {
            enrollment: Enrollment {
                id: Uuid::new_v4(),
                student_id: Uuid::new_v4(),
                subject_id: Uuid::new_v4(),
                state: grade.map(|g| g.outcome()).unwrap_or(EnrollmentState::Enrolled),
                grade,
                created_at: now,
                updated_at: now,
            },
            subject_name: subject_name.to_string(),
            subject_code: subject_name.to_uppercase(),
            credits: 4,
            instructor_id: None,
        }
    }

    #[test]
    fn test_student_report_rows() {
        let csv = render_student_report(
            &user("Ana", "Gomez"),
            &[row("Algebra", Some(4.5)), row("Physics", None)],
        )
        .unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Name,Subject,Grade,State");
        assert_eq!(lines[1], "Ana Gomez,Algebra,4.5,approved");
        assert_eq!(lines[2], "Ana Gomez,Physics,,enrolled");
    }

    #[test]
    fn test_student_report_falls_back_to_username() {
        let csv = render_student_report(&user("", ""), &[row("Algebra", Some(2.0))]).unwrap();
        assert!(csv.contains("jdoe,Algebra,2.0,failed"));
    }

    #[test]
    fn test_instructor_report_averages() {
        let csv = render_instructor_report(
            &user("Luis", "Perez"),
            &[
                (subject("Algebra"), Some(Decimal::new(11, 0) / Decimal::from(3))),
                (subject("Physics"), None),
            ],
        )
        .unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Name,Subject,Average");
        assert_eq!(lines[1], "Luis Perez,Algebra,3.67");
        assert_eq!(lines[2], "Luis Perez,Physics,");
    }

    #[test]
    fn test_names_with_commas_are_quoted() {
        let csv = render_student_report(&user("Ana", "Gomez"), &[row("Art, Modern", None)]).unwrap();
        assert!(csv.contains("\"Art, Modern\""));
    }
}
