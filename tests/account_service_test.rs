//! Accounts, role assignment, notifications and jobs over the in-memory store.

use std::sync::Arc;

use academic_records::domain::{NewSubject, RoleName};
use academic_records::errors::AppError;
use academic_records::infra::{MemoryStore, ProfileRepository, UnitOfWork};
use academic_records::jobs::{PurgeNotificationsJob, WeeklySummaryJob};
use academic_records::services::{
    AccountManager, AccountService, NewAccount, NotificationManager, NotificationService,
    ServiceContainer, Services,
};
use academic_records::Config;

fn test_config() -> Config {
    Config::new("memory://", "test-secret-key-for-testing-only-32chars").unwrap()
}

fn account(username: &str, role: Option<RoleName>) -> NewAccount {
    NewAccount {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: "password123".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        role,
    }
}

fn manager(store: &MemoryStore) -> AccountManager {
    let uow: Arc<dyn UnitOfWork> = Arc::new(store.handle());
    AccountManager::new(uow.clone(), Arc::new(NotificationManager::new(uow)))
}

#[tokio::test]
async fn test_create_user_with_role_provisions_profile_and_welcomes() {
    let store = MemoryStore::new();
    let accounts = manager(&store);

    let user = accounts
        .create_user(account("ana", Some(RoleName::Student)))
        .await
        .unwrap();

    assert_eq!(user.role, Some(RoleName::Student));
    assert_ne!(user.password_hash, "password123");
    let profile = store.find_student_profile(user.id).await.unwrap().unwrap();
    assert_eq!(profile.max_credits_per_term, 16);

    let notifications = NotificationManager::new(Arc::new(store.handle()))
        .list_for_user(user.id)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, "welcome");
    assert!(!notifications[0].read);
}

#[tokio::test]
async fn test_create_user_without_role_sends_nothing() {
    let store = MemoryStore::new();
    let user = manager(&store)
        .create_user(account("plain", None))
        .await
        .unwrap();

    assert!(store.find_student_profile(user.id).await.unwrap().is_none());
    let notifications = NotificationManager::new(Arc::new(store.handle()))
        .list_for_user(user.id)
        .await
        .unwrap();
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let store = MemoryStore::new();
    let accounts = manager(&store);
    accounts.create_user(account("ana", None)).await.unwrap();

    let result = accounts.create_user(account("ana", None)).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_short_password_is_rejected() {
    let store = MemoryStore::new();
    let mut new_account = account("ana", None);
    new_account.password = "short".to_string();

    let result = manager(&store).create_user(new_account).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_role_change_keeps_previous_profile() {
    let store = MemoryStore::new();
    let accounts = manager(&store);
    let user = accounts
        .create_user(account("ana", Some(RoleName::Student)))
        .await
        .unwrap();

    let updated = accounts.assign_role(user.id, "instructor").await.unwrap();

    assert_eq!(updated.role, Some(RoleName::Instructor));
    assert!(store.find_instructor_profile(user.id).await.unwrap().is_some());
    assert!(store.find_student_profile(user.id).await.unwrap().is_some());

    // Assigning the same role again is a no-op on profiles.
    accounts.assign_role(user.id, "instructor").await.unwrap();
}

#[tokio::test]
async fn test_assign_unknown_role_or_user_is_not_found() {
    let store = MemoryStore::new();
    let accounts = manager(&store);
    let user = accounts.create_user(account("ana", None)).await.unwrap();

    let result = accounts.assign_role(user.id, "janitor").await;
    assert!(matches!(result, Err(AppError::NotFound)));

    let result = accounts.assign_role(uuid::Uuid::new_v4(), "student").await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_roles_catalogue_is_seeded() {
    let store = MemoryStore::new();
    let roles = manager(&store).list_roles().await.unwrap();

    let mut names: Vec<String> = roles.iter().map(|r| r.name.to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["admin", "instructor", "student"]);
}

#[tokio::test]
async fn test_mark_read_only_touches_own_notifications() {
    let services = Services::from_unit_of_work(Arc::new(MemoryStore::new()), test_config());
    let ana = services
        .accounts()
        .create_user(account("ana", Some(RoleName::Student)))
        .await
        .unwrap();
    let bob = services
        .accounts()
        .create_user(account("bob", Some(RoleName::Student)))
        .await
        .unwrap();
    let notifications = services.notifications();
    let welcome = notifications.list_for_user(ana.id).await.unwrap()[0].id;

    let result = notifications.mark_read(bob.id, welcome).await;
    assert!(matches!(result, Err(AppError::NotFound)));

    let read = notifications.mark_read(ana.id, welcome).await.unwrap();
    assert!(read.read);
}

#[tokio::test]
async fn test_purge_job_removes_only_read_notifications() {
    let services = Services::from_unit_of_work(Arc::new(MemoryStore::new()), test_config());
    let ana = services
        .accounts()
        .create_user(account("ana", Some(RoleName::Student)))
        .await
        .unwrap();
    let bob = services
        .accounts()
        .create_user(account("bob", Some(RoleName::Student)))
        .await
        .unwrap();
    let notifications = services.notifications();
    let welcome = notifications.list_for_user(ana.id).await.unwrap()[0].id;
    notifications.mark_read(ana.id, welcome).await.unwrap();

    // Nothing is old enough under the default window.
    let purged = PurgeNotificationsJob::default()
        .run(notifications.as_ref())
        .await
        .unwrap();
    assert_eq!(purged, 0);

    let purged = PurgeNotificationsJob::new(0)
        .run(notifications.as_ref())
        .await
        .unwrap();
    assert_eq!(purged, 1);
    assert!(notifications.list_for_user(ana.id).await.unwrap().is_empty());
    assert_eq!(notifications.list_for_user(bob.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_weekly_summary_reports_no_data() {
    let services = Services::from_unit_of_work(Arc::new(MemoryStore::new()), test_config());
    let prof = services
        .accounts()
        .create_user(account("prof", Some(RoleName::Instructor)))
        .await
        .unwrap();
    let idle = services
        .accounts()
        .create_user(account("idle", Some(RoleName::Instructor)))
        .await
        .unwrap();
    let subject = services
        .subjects()
        .create_subject(NewSubject {
            name: "Algebra".to_string(),
            code: "ALG".to_string(),
            credits: 4,
            prerequisites: vec![],
        })
        .await
        .unwrap();
    services
        .subjects()
        .assign_instructor(subject.id, prof.id)
        .await
        .unwrap();

    let sent = WeeklySummaryJob::default()
        .run(services.notifications().as_ref())
        .await
        .unwrap();
    assert_eq!(sent, 2);

    let latest = |items: Vec<academic_records::domain::Notification>| {
        items
            .into_iter()
            .find(|n| n.kind == "weekly_summary")
            .map(|n| n.message)
    };
    let prof_inbox = services.notifications().list_for_user(prof.id).await.unwrap();
    assert_eq!(latest(prof_inbox).as_deref(), Some("Algebra: no data"));
    let idle_inbox = services.notifications().list_for_user(idle.id).await.unwrap();
    assert_eq!(latest(idle_inbox).as_deref(), Some("no data"));
}
