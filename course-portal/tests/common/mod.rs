//! Shared fixtures for the portal integration tests.
//!
//! Every test gets its own wiremock server mounted at `{uri}/api` and an
//! in-memory session store it can inspect directly.

#![allow(dead_code)]

use course_portal::config::{ApiSettings, Settings};
use course_portal::services::session_store::{MemorySessionStore, SessionKey, SessionStore};
use course_portal::startup::build_portal_with_store;
use course_portal::PortalState;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

pub struct TestPortal {
    pub server: MockServer,
    pub store: Arc<MemorySessionStore>,
    pub state: PortalState,
}

impl TestPortal {
    pub fn stored(&self, key: SessionKey) -> Option<String> {
        self.store.get(key)
    }
}

/// Portal with an empty session.
pub async fn setup() -> TestPortal {
    setup_with_store(MemorySessionStore::new()).await
}

/// Portal whose store already holds a logged-in session.
pub async fn setup_logged_in(access: &str, refresh: Option<&str>, user: Value) -> TestPortal {
    let store = MemorySessionStore::new();
    store
        .set(SessionKey::AccessToken, access)
        .expect("Failed to seed access token");
    if let Some(refresh) = refresh {
        store
            .set(SessionKey::RefreshToken, refresh)
            .expect("Failed to seed refresh token");
    }
    store
        .set(SessionKey::User, &user.to_string())
        .expect("Failed to seed user");
    setup_with_store(store).await
}

pub async fn setup_with_store(store: MemorySessionStore) -> TestPortal {
    let server = MockServer::start().await;
    let store = Arc::new(store);
    let state = build_state(&format!("{}/api", server.uri()), store.clone());
    TestPortal {
        server,
        store,
        state,
    }
}

pub fn build_state(base_url: &str, store: Arc<MemorySessionStore>) -> PortalState {
    let settings = Settings {
        api: ApiSettings::new(base_url),
        ..Settings::default()
    };
    build_portal_with_store(&settings, store).expect("Failed to build portal")
}

pub fn user_json(id: i64, username: &str, role: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{}@example.com", username),
        "role": role,
        "first_name": null,
        "last_name": null
    })
}

pub fn course_json(id: i64, name: &str, code: &str, max_capacity: u32, enrolled: u32) -> Value {
    json!({
        "id": id,
        "name": name,
        "code": code,
        "description": "",
        "max_capacity": max_capacity,
        "teacher": 7,
        "enrolled_count": enrolled
    })
}

pub fn enrollment_json(id: i64, student: i64, course: i64, status: &str) -> Value {
    json!({
        "id": id,
        "student": student,
        "course": course,
        "status": status,
        "created_at": "2024-09-01T10:00:00Z",
        "updated_at": "2024-09-01T10:00:00Z",
        "is_waitlisted": false,
        "student_detail": { "id": student, "username": format!("student{}", student) }
    })
}
