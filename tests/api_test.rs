//! HTTP routing, authentication and role gating.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use academic_records::api::create_router;
use academic_records::domain::{NewSubject, RoleName, Subject, User};
use academic_records::infra::MemoryStore;
use academic_records::services::NewAccount;
use academic_records::{AppState, Config};

const PASSWORD: &str = "password123";

struct TestApp {
    state: AppState,
    router: Router,
}

async fn spawn_app() -> TestApp {
    let config = Config::new("memory://", "test-secret-key-for-testing-only-32chars").unwrap();
    let state = AppState::from_config(Arc::new(MemoryStore::new()), config);
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

impl TestApp {
    async fn user(&self, username: &str, role: RoleName) -> User {
        self.state
            .services
            .accounts()
            .create_user(NewAccount {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: PASSWORD.to_string(),
                first_name: username.to_string(),
                last_name: "Tester".to_string(),
                role: Some(role),
            })
            .await
            .unwrap()
    }

    async fn subject(&self, code: &str, instructor: &User) -> Subject {
        let subjects = self.state.services.subjects();
        let subject = subjects
            .create_subject(NewSubject {
                name: format!("Subject {}", code),
                code: code.to_string(),
                credits: 4,
                prerequisites: vec![],
            })
            .await
            .unwrap();
        subjects
            .assign_instructor(subject.id, instructor.id)
            .await
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<(String, String)>, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes.to_vec())
    }

    async fn login(&self, username: &str) -> String {
        let (status, _, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[tokio::test]
async fn test_health_and_root() {
    let app = spawn_app().await;

    let (status, _, body) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Academic Records API");

    let (status, _, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["services"]["database"]["status"], "healthy");
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let app = spawn_app().await;
    app.user("ana", RoleName::Student).await;

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "ana", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = spawn_app().await;

    let (status, _, _) = app.send(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app
        .send(Method::GET, "/api/users/me", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_current_user_profile() {
    let app = spawn_app().await;
    let ana = app.user("ana", RoleName::Student).await;
    let token = app.login("ana").await;

    let (status, _, body) = app
        .send(Method::GET, "/api/users/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["id"], ana.id.to_string());
    assert_eq!(body["role"], "student");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_role_gates() {
    let app = spawn_app().await;
    app.user("ana", RoleName::Student).await;
    app.user("root", RoleName::Admin).await;
    let student = app.login("ana").await;
    let admin = app.login("root").await;

    let (status, _, _) = app
        .send(Method::GET, "/api/admin/statistics", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app
        .send(Method::GET, "/api/instructors/subjects", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app
        .send(Method::GET, "/api/students/history", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app
        .send(Method::GET, "/api/admin/statistics", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["users"]["total_students"], 1);
}

#[tokio::test]
async fn test_admin_creates_subject_with_validation() {
    let app = spawn_app().await;
    app.user("root", RoleName::Admin).await;
    let admin = app.login("root").await;

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/admin/subjects",
            Some(&admin),
            Some(json!({ "name": "Algebra", "code": "ALG", "credits": 4, "prerequisites": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(created["code"], "ALG");

    let (status, _, _) = app
        .send(
            Method::POST,
            "/api/admin/subjects",
            Some(&admin),
            Some(json!({ "name": "Algebra II", "code": "ALG", "credits": 4, "prerequisites": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = app
        .send(
            Method::POST,
            "/api/admin/subjects",
            Some(&admin),
            Some(json!({ "name": "Broken", "code": "BRK", "credits": 0, "prerequisites": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_enroll_then_denied_with_detail() {
    let app = spawn_app().await;
    let prof = app.user("prof", RoleName::Instructor).await;
    app.user("ana", RoleName::Student).await;
    let subject = app.subject("ALG", &prof).await;
    let token = app.login("ana").await;

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/students/enroll",
            Some(&token),
            Some(json!({ "subject_id": subject.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["id"].as_str().and_then(|id| id.parse::<Uuid>().ok()).is_some());

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/students/enroll",
            Some(&token),
            Some(json!({ "subject_id": subject.id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["detail"], "already taken or enrolled");

    let (status, _, body) = app
        .send(
            Method::GET,
            &format!("/api/students/eligibility/{}", subject.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["allowed"], false);
}

#[tokio::test]
async fn test_grading_over_http() {
    let app = spawn_app().await;
    let prof = app.user("prof", RoleName::Instructor).await;
    let ana = app.user("ana", RoleName::Student).await;
    let subject = app.subject("ALG", &prof).await;
    let enrollment = app
        .state
        .services
        .enrollments()
        .enroll(ana.id, subject.id)
        .await
        .unwrap();
    let token = app.login("prof").await;

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/instructors/grade",
            Some(&token),
            Some(json!({ "enrollment_id": enrollment.id, "value": 7.5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["code"], "INVALID_RANGE");

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/instructors/grade",
            Some(&token),
            Some(json!({ "enrollment_id": enrollment.id, "value": 3.2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["state"], "approved");

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/instructors/close",
            Some(&token),
            Some(json!({ "subject_id": subject.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["closed"], true);
}

#[tokio::test]
async fn test_student_report_is_csv_for_self_only() {
    let app = spawn_app().await;
    let prof = app.user("prof", RoleName::Instructor).await;
    let ana = app.user("ana", RoleName::Student).await;
    let bob = app.user("bob", RoleName::Student).await;
    let subject = app.subject("ALG", &prof).await;
    app.state
        .services
        .enrollments()
        .enroll(ana.id, subject.id)
        .await
        .unwrap();
    let token = app.login("ana").await;

    let (status, headers, body) = app
        .send(
            Method::GET,
            &format!("/api/reports/student/{}", ana.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(header_value(&headers, "content-type")
        .unwrap()
        .starts_with("text/csv"));
    assert!(header_value(&headers, "content-disposition")
        .unwrap()
        .contains(&format!("student_report_{}.csv", ana.id)));
    let csv = String::from_utf8(body).unwrap();
    assert!(csv.starts_with("Name,Subject,Grade,State"));
    assert!(csv.contains("Subject ALG,,enrolled"));

    let (status, _, _) = app
        .send(
            Method::GET,
            &format!("/api/reports/student/{}", bob.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_notifications_are_listed_and_marked_read() {
    let app = spawn_app().await;
    app.user("ana", RoleName::Student).await;
    let token = app.login("ana").await;

    let (status, _, body) = app
        .send(Method::GET, "/api/notifications", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    let id = items[0]["id"].as_str().unwrap().to_string();

    let (status, _, body) = app
        .send(
            Method::POST,
            &format!("/api/notifications/{}/read", id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["read"], true);
}

#[tokio::test]
async fn test_demoted_admin_loses_admin_routes() {
    let app = spawn_app().await;
    let root = app.user("root", RoleName::Admin).await;
    let token = app.login("root").await;

    let (status, _, _) = app
        .send(Method::GET, "/api/admin/statistics", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    app.state
        .services
        .accounts()
        .assign_role(root.id, "student")
        .await
        .unwrap();

    let (status, _, _) = app
        .send(Method::GET, "/api/admin/statistics", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_user_token_is_unauthorized() {
    let app = spawn_app().await;
    let root = app.user("root", RoleName::Admin).await;
    let token = app.login("root").await;

    app.state.services.accounts().delete_user(root.id).await.unwrap();

    let (status, _, _) = app
        .send(Method::GET, "/api/admin/statistics", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_new_role_applies_without_new_login() {
    let app = spawn_app().await;
    let accounts = app.state.services.accounts();
    let ana = accounts
        .create_user(NewAccount {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password: PASSWORD.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Tester".to_string(),
            role: None,
        })
        .await
        .unwrap();
    let token = app.login("ana").await;

    let (status, _, _) = app
        .send(Method::GET, "/api/students/history", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    accounts.assign_role(ana.id, "student").await.unwrap();

    let (status, _, body) = app
        .send(Method::GET, "/api/students/history", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body.as_array().unwrap().is_empty());
}
