pub mod api_client;
pub mod auth_session;
pub mod course_client;
pub mod enrollment_client;
pub mod session_store;
pub mod user_client;
