//! Administrative rollups over users, subjects and enrollments.

use std::collections::{HashMap, HashSet};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{mean_grade, Enrollment, EnrollmentState, Grade, RoleName, Subject, User};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserStatistics {
    pub total_students: u64,
    pub total_instructors: u64,
    pub total_admins: u64,
    /// Students holding at least one enrollment in any state
    pub active_students: u64,
    pub inactive_students: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SubjectStatistics {
    pub total_subjects: u64,
    pub subjects_with_instructor: u64,
    pub subjects_without_instructor: u64,
    pub avg_subjects_per_instructor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EnrollmentStatistics {
    pub total_enrollments: u64,
    pub enrollments_enrolled: u64,
    pub enrollments_approved: u64,
    pub enrollments_failed: u64,
    pub enrollments_closed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AcademicPerformance {
    /// Share of approved over approved + failed, in percent
    pub approval_rate: f64,
    pub failure_rate: f64,
    pub system_average_grade: f64,
    /// Mean of per-student GPAs
    pub average_student_gpa: f64,
}

/// Counts per grade band; the last band includes 5.0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct GradeDistribution {
    #[serde(rename = "0_1")]
    pub zero_to_one: u64,
    #[serde(rename = "1_2")]
    pub one_to_two: u64,
    #[serde(rename = "2_3")]
    pub two_to_three: u64,
    #[serde(rename = "3_4")]
    pub three_to_four: u64,
    #[serde(rename = "4_5")]
    pub four_to_five: u64,
}

impl GradeDistribution {
    fn record(&mut self, grade: Grade) {
        let value = grade.value();
        let slot = if value < Decimal::ONE {
            &mut self.zero_to_one
        } else if value < Decimal::from(2) {
            &mut self.one_to_two
        } else if value < Decimal::from(3) {
            &mut self.two_to_three
        } else if value < Decimal::from(4) {
            &mut self.three_to_four
        } else {
            &mut self.four_to_five
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AdminStatistics {
    pub users: UserStatistics,
    pub subjects: SubjectStatistics,
    pub enrollments: EnrollmentStatistics,
    pub academic_performance: AcademicPerformance,
    pub grade_distribution: GradeDistribution,
    pub professors_with_assignments: u64,
}

impl AdminStatistics {
    pub fn compute(users: &[User], subjects: &[Subject], enrollments: &[Enrollment]) -> Self {
        let count_role = |role: RoleName| users.iter().filter(|u| u.has_role(role)).count() as u64;
        let count_state =
            |state: EnrollmentState| enrollments.iter().filter(|e| e.state == state).count() as u64;

        let students: HashSet<Uuid> = users
            .iter()
            .filter(|u| u.has_role(RoleName::Student))
            .map(|u| u.id)
            .collect();
        let total_students = students.len() as u64;
        let active_students = enrollments
            .iter()
            .map(|e| e.student_id)
            .filter(|id| students.contains(id))
            .collect::<HashSet<_>>()
            .len() as u64;

        let total_subjects = subjects.len() as u64;
        let subjects_with_instructor =
            subjects.iter().filter(|s| s.instructor_id.is_some()).count() as u64;
        let professors_with_assignments = subjects
            .iter()
            .filter_map(|s| s.instructor_id)
            .collect::<HashSet<_>>()
            .len() as u64;
        let avg_subjects_per_instructor = if professors_with_assignments > 0 {
            round2(total_subjects as f64 / professors_with_assignments as f64)
        } else {
            0.0
        };

        let approved = count_state(EnrollmentState::Approved);
        let failed = count_state(EnrollmentState::Failed);
        let (approval_rate, failure_rate) = match approved + failed {
            0 => (0.0, 0.0),
            decided => (
                round2(approved as f64 / decided as f64 * 100.0),
                round2(failed as f64 / decided as f64 * 100.0),
            ),
        };

        let mut grade_distribution = GradeDistribution::default();
        let mut per_student: HashMap<Uuid, Vec<Grade>> = HashMap::new();
        for enrollment in enrollments {
            if let Some(grade) = enrollment.grade {
                grade_distribution.record(grade);
                if students.contains(&enrollment.student_id) {
                    per_student.entry(enrollment.student_id).or_default().push(grade);
                }
            }
        }

        let system_average_grade = mean_grade(enrollments.iter().filter_map(|e| e.grade))
            .map(decimal_to_f64)
            .unwrap_or(0.0);
        let student_gpas: Vec<f64> = per_student
            .into_values()
            .filter_map(|grades| mean_grade(grades))
            .map(decimal_to_f64)
            .collect();
        let average_student_gpa = if student_gpas.is_empty() {
            0.0
        } else {
            student_gpas.iter().sum::<f64>() / student_gpas.len() as f64
        };

        Self {
            users: UserStatistics {
                total_students,
                total_instructors: count_role(RoleName::Instructor),
                total_admins: count_role(RoleName::Admin),
                active_students,
                inactive_students: total_students - active_students,
            },
            subjects: SubjectStatistics {
                total_subjects,
                subjects_with_instructor,
                subjects_without_instructor: total_subjects - subjects_with_instructor,
                avg_subjects_per_instructor,
            },
            enrollments: EnrollmentStatistics {
                total_enrollments: enrollments.len() as u64,
                enrollments_enrolled: count_state(EnrollmentState::Enrolled),
                enrollments_approved: approved,
                enrollments_failed: failed,
                enrollments_closed: count_state(EnrollmentState::Closed),
            },
            academic_performance: AcademicPerformance {
                approval_rate,
                failure_rate,
                system_average_grade: round2(system_average_grade),
                average_student_gpa: round2(average_student_gpa),
            },
            grade_distribution,
            professors_with_assignments,
        }
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Option<RoleName>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: Uuid::new_v4().to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    fn subject(instructor_id: Option<Uuid>) -> Subject {
        Subject {
            id: Uuid::new_v4(),
            name: "S".to_string(),
            code: Uuid::new_v4().to_string(),
            credits: 3,
            instructor_id,
            prerequisites: vec![],
        }
    }

    fn enrollment(student: &User, state: EnrollmentState, grade: Option<f64>) -> Enrollment {
        let now = Utc::now();
        Enrollment {
            id: Uuid::new_v4(),
            student_id: student.id,
            subject_id: Uuid::new_v4(),
            state,
            grade: grade.map(|g| Grade::from_value(g).unwrap()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_rates_ignore_enrolled_and_closed() {
        let student = user(Some(RoleName::Student));
        let mut rows = Vec::new();
        rows.extend((0..10).map(|_| enrollment(&student, EnrollmentState::Approved, Some(4.0))));
        rows.extend((0..5).map(|_| enrollment(&student, EnrollmentState::Failed, Some(2.0))));
        rows.extend((0..4).map(|_| enrollment(&student, EnrollmentState::Enrolled, None)));
        rows.extend((0..3).map(|_| enrollment(&student, EnrollmentState::Closed, Some(3.5))));

        let stats = AdminStatistics::compute(&[student], &[], &rows);
        assert_eq!(stats.academic_performance.approval_rate, 66.67);
        assert_eq!(stats.academic_performance.failure_rate, 33.33);
        assert_eq!(stats.enrollments.total_enrollments, 22);
        assert_eq!(stats.enrollments.enrollments_closed, 3);
    }

    #[test]
    fn test_empty_system_is_all_zero() {
        let stats = AdminStatistics::compute(&[], &[], &[]);
        assert_eq!(stats.academic_performance.approval_rate, 0.0);
        assert_eq!(stats.academic_performance.system_average_grade, 0.0);
        assert_eq!(stats.academic_performance.average_student_gpa, 0.0);
        assert_eq!(stats.subjects.avg_subjects_per_instructor, 0.0);
        assert_eq!(stats.grade_distribution, GradeDistribution::default());
    }

    #[test]
    fn test_gpa_of_gpas_differs_from_flat_mean() {
        let busy = user(Some(RoleName::Student));
        let light = user(Some(RoleName::Student));
        let rows = vec![
            enrollment(&busy, EnrollmentState::Approved, Some(5.0)),
            enrollment(&busy, EnrollmentState::Approved, Some(5.0)),
            enrollment(&busy, EnrollmentState::Approved, Some(5.0)),
            enrollment(&light, EnrollmentState::Failed, Some(1.0)),
        ];

        let stats = AdminStatistics::compute(&[busy, light], &[], &rows);
        assert_eq!(stats.academic_performance.system_average_grade, 4.0);
        assert_eq!(stats.academic_performance.average_student_gpa, 3.0);
    }

    #[test]
    fn test_grade_buckets_close_last_band() {
        let student = user(Some(RoleName::Student));
        let rows: Vec<_> = [0.0, 0.9, 1.0, 2.5, 3.0, 3.9, 4.0, 5.0]
            .iter()
            .map(|g| enrollment(&student, EnrollmentState::Closed, Some(*g)))
            .collect();

        let stats = AdminStatistics::compute(&[student], &[], &rows);
        assert_eq!(
            stats.grade_distribution,
            GradeDistribution {
                zero_to_one: 2,
                one_to_two: 1,
                two_to_three: 1,
                three_to_four: 2,
                four_to_five: 2,
            }
        );
    }

    #[test]
    fn test_user_and_subject_counts() {
        let active = user(Some(RoleName::Student));
        let idle = user(Some(RoleName::Student));
        let professor = user(Some(RoleName::Instructor));
        let admin = user(Some(RoleName::Admin));
        let unassigned = user(None);
        let subjects = vec![
            subject(Some(professor.id)),
            subject(Some(professor.id)),
            subject(Some(admin.id)),
            subject(None),
        ];
        let rows = vec![enrollment(&active, EnrollmentState::Enrolled, None)];

        let stats =
            AdminStatistics::compute(&[active, idle, professor, admin, unassigned], &subjects, &rows);
        assert_eq!(stats.users.total_students, 2);
        assert_eq!(stats.users.active_students, 1);
        assert_eq!(stats.users.inactive_students, 1);
        assert_eq!(stats.users.total_instructors, 1);
        assert_eq!(stats.users.total_admins, 1);
        assert_eq!(stats.subjects.subjects_with_instructor, 3);
        assert_eq!(stats.subjects.subjects_without_instructor, 1);
        assert_eq!(stats.professors_with_assignments, 2);
        assert_eq!(stats.subjects.avg_subjects_per_instructor, 2.0);
    }

    #[test]
    fn test_distribution_serializes_band_keys() {
        let json = serde_json::to_value(GradeDistribution::default()).unwrap();
        assert!(json.get("0_1").is_some());
        assert!(json.get("4_5").is_some());
    }
}
