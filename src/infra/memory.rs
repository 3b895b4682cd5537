//! In-memory store.
//!
//! Implements every repository trait over plain vectors so the services can
//! run without Postgres (`DATABASE_URL=memory://`). A transaction works on a
//! snapshot and swaps it back on commit. Transactions and pooled writes
//! serialize on one writer lock; reads never wait for it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use super::repositories::{
    EnrollmentRepository, NotificationRepository, ProfileRepository, RoleRepository, Store,
    SubjectRepository, UserRepository,
};
use super::unit_of_work::{Transaction, UnitOfWork};
use crate::domain::{
    Enrollment, EnrollmentDetail, EnrollmentState, Grade, InstructorProfile, NewNotification,
    NewSubject, NewUser, Notification, Role, RoleName, StudentProfile, Subject, SubjectChanges,
    User,
};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
struct MemoryState {
    roles: Vec<Role>,
    users: Vec<User>,
    student_profiles: Vec<StudentProfile>,
    instructor_profiles: Vec<InstructorProfile>,
    subjects: Vec<Subject>,
    enrollments: Vec<Enrollment>,
    notifications: Vec<Notification>,
}

impl Default for MemoryState {
    fn default() -> Self {
        let roles = RoleName::ALL
            .iter()
            .zip(1..)
            .map(|(name, id)| Role {
                id,
                name: *name,
                display_name: name.display_name().to_string(),
                description: name.description().to_string(),
            })
            .collect();

        Self {
            roles,
            users: Vec::new(),
            student_profiles: Vec::new(),
            instructor_profiles: Vec::new(),
            subjects: Vec::new(),
            enrollments: Vec::new(),
            notifications: Vec::new(),
        }
    }
}

impl MemoryState {
    fn detail(&self, enrollment: &Enrollment) -> AppResult<EnrollmentDetail> {
        let subject = self
            .subjects
            .iter()
            .find(|s| s.id == enrollment.subject_id)
            .ok_or_else(|| {
                AppError::internal(format!("Enrollment {} has no subject", enrollment.id))
            })?;

        Ok(EnrollmentDetail {
            enrollment: enrollment.clone(),
            subject_name: subject.name.clone(),
            subject_code: subject.code.clone(),
            credits: subject.credits,
            instructor_id: subject.instructor_id,
        })
    }

    fn details<'a>(
        &self,
        rows: impl Iterator<Item = &'a Enrollment>,
    ) -> AppResult<Vec<EnrollmentDetail>> {
        let mut rows: Vec<&Enrollment> = rows.collect();
        rows.sort_by_key(|e| e.created_at);
        rows.into_iter().map(|e| self.detail(e)).collect()
    }

    fn subject_mut(&mut self, id: Uuid) -> AppResult<&mut Subject> {
        self.subjects
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AppError::NotFound)
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory `UnitOfWork` and `Store`.
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    writer: Arc<AsyncMutex<()>>,
    /// Set on transactions: the state `commit` writes back to
    parent: Option<Arc<Mutex<MemoryState>>>,
    lease: Option<OwnedMutexGuard<()>>,
}

impl MemoryStore {
    /// Empty store with the role catalogue seeded.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            writer: Arc::new(AsyncMutex::new(())),
            parent: None,
            lease: None,
        }
    }

    /// Another handle onto the same state.
    pub fn handle(&self) -> Self {
        Self {
            state: self.state.clone(),
            writer: self.writer.clone(),
            parent: None,
            lease: None,
        }
    }

    fn read<R>(&self, f: impl FnOnce(&MemoryState) -> R) -> R {
        let state = lock(&self.state);
        f(&state)
    }

    async fn write<R>(&self, f: impl FnOnce(&mut MemoryState) -> R + Send) -> R {
        let _writer = match self.lease {
            Some(_) => None,
            None => Some(self.writer.lock().await),
        };
        let mut state = lock(&self.state);
        f(&mut state)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    fn store(&self) -> &dyn Store {
        self
    }

    fn users(&self) -> Arc<dyn UserRepository> {
        Arc::new(self.handle())
    }

    async fn begin(&self) -> AppResult<Box<dyn Transaction>> {
        let lease = self.writer.clone().lock_owned().await;
        let snapshot = self.read(MemoryState::clone);

        Ok(Box::new(MemoryStore {
            state: Arc::new(Mutex::new(snapshot)),
            writer: self.writer.clone(),
            parent: Some(self.state.clone()),
            lease: Some(lease),
        }))
    }

    async fn begin_serializable(&self) -> AppResult<Box<dyn Transaction>> {
        self.begin().await
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl Transaction for MemoryStore {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        if let Some(parent) = &self.parent {
            let working = self.read(MemoryState::clone);
            *lock(parent) = working;
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.read(|s| s.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.read(|s| s.users.iter().find(|u| u.username == username).cloned()))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let mut users = self.read(|s| s.users.clone());
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn list_users_with_role(&self, role: RoleName) -> AppResult<Vec<User>> {
        let mut users = self.list_users().await?;
        users.retain(|u| u.has_role(role));
        Ok(users)
    }

    async fn insert_user(&self, new_user: NewUser) -> AppResult<User> {
        self.write(move |s| {
            let taken = s
                .users
                .iter()
                .any(|u| u.username == new_user.username || u.email == new_user.email);
            if taken {
                return Err(AppError::conflict("User"));
            }

            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                username: new_user.username,
                email: new_user.email,
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                password_hash: new_user.password_hash,
                role: new_user.role,
                created_at: now,
                updated_at: now,
            };
            s.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn update_user_role(&self, id: Uuid, role: RoleName) -> AppResult<User> {
        self.write(move |s| {
            let user = s
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(AppError::NotFound)?;
            user.role = Some(role);
            user.updated_at = Utc::now();
            Ok(user.clone())
        })
        .await
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        self.write(move |s| {
            let before = s.users.len();
            s.users.retain(|u| u.id != id);
            if s.users.len() == before {
                return Err(AppError::NotFound);
            }

            s.student_profiles.retain(|p| p.user_id != id);
            s.instructor_profiles.retain(|p| p.user_id != id);
            s.enrollments.retain(|e| e.student_id != id);
            s.notifications.retain(|n| n.user_id != id);
            for subject in s.subjects.iter_mut().filter(|subject| subject.is_taught_by(id)) {
                subject.instructor_id = None;
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.read(|s| s.roles.clone()))
    }

    async fn find_role(&self, name: RoleName) -> AppResult<Option<Role>> {
        Ok(self.read(|s| s.roles.iter().find(|r| r.name == name).cloned()))
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn find_student_profile(&self, user_id: Uuid) -> AppResult<Option<StudentProfile>> {
        Ok(self.read(|s| {
            s.student_profiles
                .iter()
                .find(|p| p.user_id == user_id)
                .copied()
        }))
    }

    async fn insert_student_profile(&self, profile: StudentProfile) -> AppResult<StudentProfile> {
        self.write(move |s| {
            if s.student_profiles.iter().any(|p| p.user_id == profile.user_id) {
                return Err(AppError::conflict("Student profile"));
            }
            s.student_profiles.push(profile);
            Ok(profile)
        })
        .await
    }

    async fn find_instructor_profile(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<InstructorProfile>> {
        Ok(self.read(|s| {
            s.instructor_profiles
                .iter()
                .find(|p| p.user_id == user_id)
                .copied()
        }))
    }

    async fn insert_instructor_profile(
        &self,
        profile: InstructorProfile,
    ) -> AppResult<InstructorProfile> {
        self.write(move |s| {
            if s.instructor_profiles.iter().any(|p| p.user_id == profile.user_id) {
                return Err(AppError::conflict("Instructor profile"));
            }
            s.instructor_profiles.push(profile);
            Ok(profile)
        })
        .await
    }
}

#[async_trait]
impl SubjectRepository for MemoryStore {
    async fn find_subject(&self, id: Uuid) -> AppResult<Option<Subject>> {
        Ok(self.read(|s| s.subjects.iter().find(|subject| subject.id == id).cloned()))
    }

    async fn find_subject_by_code(&self, code: &str) -> AppResult<Option<Subject>> {
        Ok(self.read(|s| s.subjects.iter().find(|subject| subject.code == code).cloned()))
    }

    async fn list_subjects(&self) -> AppResult<Vec<Subject>> {
        let mut subjects = self.read(|s| s.subjects.clone());
        subjects.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(subjects)
    }

    async fn list_subjects_for_instructor(&self, instructor_id: Uuid) -> AppResult<Vec<Subject>> {
        let mut subjects = self.list_subjects().await?;
        subjects.retain(|s| s.is_taught_by(instructor_id));
        Ok(subjects)
    }

    async fn insert_subject(&self, new_subject: NewSubject) -> AppResult<Subject> {
        self.write(move |s| {
            if s.subjects.iter().any(|subject| subject.code == new_subject.code) {
                return Err(AppError::conflict("Subject"));
            }

            let subject = Subject {
                id: Uuid::new_v4(),
                name: new_subject.name,
                code: new_subject.code,
                credits: new_subject.credits,
                instructor_id: None,
                prerequisites: new_subject.prerequisites,
            };
            s.subjects.push(subject.clone());
            Ok(subject)
        })
        .await
    }

    async fn update_subject(&self, id: Uuid, changes: SubjectChanges) -> AppResult<Subject> {
        self.write(move |s| {
            if let Some(code) = &changes.code {
                if s.subjects.iter().any(|other| other.id != id && &other.code == code) {
                    return Err(AppError::conflict("Subject"));
                }
            }

            let subject = s.subject_mut(id)?;
            if let Some(name) = changes.name {
                subject.name = name;
            }
            if let Some(code) = changes.code {
                subject.code = code;
            }
            if let Some(credits) = changes.credits {
                subject.credits = credits;
            }
            if let Some(prerequisites) = changes.prerequisites {
                subject.prerequisites = prerequisites;
            }
            Ok(subject.clone())
        })
        .await
    }

    async fn delete_subject(&self, id: Uuid) -> AppResult<()> {
        self.write(move |s| {
            let before = s.subjects.len();
            s.subjects.retain(|subject| subject.id != id);
            if s.subjects.len() == before {
                return Err(AppError::NotFound);
            }

            s.enrollments.retain(|e| e.subject_id != id);
            for subject in s.subjects.iter_mut() {
                subject.prerequisites.retain(|p| *p != id);
            }
            Ok(())
        })
        .await
    }

    async fn set_subject_instructor(
        &self,
        id: Uuid,
        instructor_id: Option<Uuid>,
    ) -> AppResult<Subject> {
        self.write(move |s| {
            let subject = s.subject_mut(id)?;
            subject.instructor_id = instructor_id;
            Ok(subject.clone())
        })
        .await
    }
}

#[async_trait]
impl EnrollmentRepository for MemoryStore {
    async fn find_enrollment_for(
        &self,
        student_id: Uuid,
        subject_id: Uuid,
    ) -> AppResult<Option<Enrollment>> {
        Ok(self.read(|s| {
            s.enrollments
                .iter()
                .find(|e| e.student_id == student_id && e.subject_id == subject_id)
                .cloned()
        }))
    }

    async fn find_enrollment_detail(&self, id: Uuid) -> AppResult<Option<EnrollmentDetail>> {
        self.read(|s| {
            s.enrollments
                .iter()
                .find(|e| e.id == id)
                .map(|e| s.detail(e))
                .transpose()
        })
    }

    async fn insert_enrollment(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Enrollment> {
        self.write(move |s| {
            let exists = s
                .enrollments
                .iter()
                .any(|e| e.student_id == student_id && e.subject_id == subject_id);
            if exists {
                return Err(AppError::conflict("Enrollment"));
            }
            if !s.subjects.iter().any(|subject| subject.id == subject_id) {
                return Err(AppError::NotFound);
            }

            let now = Utc::now();
            let enrollment = Enrollment {
                id: Uuid::new_v4(),
                student_id,
                subject_id,
                state: EnrollmentState::Enrolled,
                grade: None,
                created_at: now,
                updated_at: now,
            };
            s.enrollments.push(enrollment.clone());
            Ok(enrollment)
        })
        .await
    }

    async fn list_student_enrollments(
        &self,
        student_id: Uuid,
    ) -> AppResult<Vec<EnrollmentDetail>> {
        self.read(|s| s.details(s.enrollments.iter().filter(|e| e.student_id == student_id)))
    }

    async fn list_subject_enrollments(
        &self,
        subject_id: Uuid,
    ) -> AppResult<Vec<EnrollmentDetail>> {
        self.read(|s| s.details(s.enrollments.iter().filter(|e| e.subject_id == subject_id)))
    }

    async fn list_enrollments(&self) -> AppResult<Vec<Enrollment>> {
        let mut rows = self.read(|s| s.enrollments.clone());
        rows.sort_by_key(|e| e.created_at);
        Ok(rows)
    }

    async fn record_grade(
        &self,
        id: Uuid,
        grade: Grade,
        state: EnrollmentState,
    ) -> AppResult<Enrollment> {
        self.write(move |s| {
            let enrollment = s
                .enrollments
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(AppError::NotFound)?;
            enrollment.grade = Some(grade);
            enrollment.state = state;
            enrollment.updated_at = Utc::now();
            Ok(enrollment.clone())
        })
        .await
    }

    async fn close_subject_enrollments(&self, subject_id: Uuid) -> AppResult<u64> {
        self.write(move |s| {
            let now = Utc::now();
            let mut closed = 0;
            for enrollment in s.enrollments.iter_mut().filter(|e| e.subject_id == subject_id) {
                enrollment.state = EnrollmentState::Closed;
                enrollment.updated_at = now;
                closed += 1;
            }
            Ok(closed)
        })
        .await
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert_notification(&self, new: NewNotification) -> AppResult<Notification> {
        self.write(move |s| {
            if !s.users.iter().any(|u| u.id == new.user_id) {
                return Err(AppError::NotFound);
            }

            let notification = Notification {
                id: Uuid::new_v4(),
                user_id: new.user_id,
                kind: new.kind,
                message: new.message,
                read: false,
                created_at: Utc::now(),
            };
            s.notifications.push(notification.clone());
            Ok(notification)
        })
        .await
    }

    async fn list_notifications(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let mut rows: Vec<Notification> = self.read(|s| {
            s.notifications
                .iter()
                .rev()
                .filter(|n| n.user_id == user_id)
                .cloned()
                .collect()
        });
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> AppResult<Notification> {
        self.write(move |s| {
            let notification = s
                .notifications
                .iter_mut()
                .find(|n| n.id == id && n.user_id == user_id)
                .ok_or(AppError::NotFound)?;
            notification.read = true;
            Ok(notification.clone())
        })
        .await
    }

    async fn purge_notifications(&self, read_before: DateTime<Utc>) -> AppResult<u64> {
        self.write(move |s| {
            let before = s.notifications.len();
            s.notifications
                .retain(|n| !(n.read && n.created_at < read_before));
            Ok((before - s.notifications.len()) as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, role: Option<RoleName>) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            role,
        }
    }

    #[tokio::test]
    async fn test_roles_are_seeded() {
        let store = MemoryStore::new();
        let roles = store.list_roles().await.unwrap();
        let names: Vec<RoleName> = roles.iter().map(|r| r.name).collect();
        assert_eq!(names, RoleName::ALL.to_vec());
        assert_eq!(roles[0].id, 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(new_user("ana", None)).await.unwrap();

        let err = store.insert_user(new_user("ana", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_dropped_transaction_is_rolled_back() {
        let store = MemoryStore::new();
        {
            let tx = store.begin().await.unwrap();
            tx.insert_user(new_user("ghost", None)).await.unwrap();
        }
        assert!(store.find_user_by_username("ghost").await.unwrap().is_none());

        let tx = store.begin().await.unwrap();
        tx.insert_user(new_user("kept", None)).await.unwrap();
        tx.commit().await.unwrap();
        assert!(store.find_user_by_username("kept").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() {
        let store = MemoryStore::new();
        let student = store
            .insert_user(new_user("ana", Some(RoleName::Student)))
            .await
            .unwrap();
        store
            .insert_student_profile(StudentProfile::with_defaults(student.id))
            .await
            .unwrap();
        let subject = store
            .insert_subject(NewSubject {
                name: "Algebra".to_string(),
                code: "ALG".to_string(),
                credits: 3,
                prerequisites: vec![],
            })
            .await
            .unwrap();
        store.insert_enrollment(student.id, subject.id).await.unwrap();

        store.delete_user(student.id).await.unwrap();

        assert!(store.find_student_profile(student.id).await.unwrap().is_none());
        assert!(store.list_enrollments().await.unwrap().is_empty());
    }
}
