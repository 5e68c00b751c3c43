//! # Routes
//!
//! REST surface. Handlers are routing/validation glue: they resolve the
//! caller, load documents, hand the seat arithmetic to [`crate::booking`],
//! and write the results back.

use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    routing::{get, post, put},
};
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{database::Db, error::AppError, state::AppState};

pub mod bookings;
pub mod college;
pub mod public;
pub mod test_center;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/college/register", post(college::register))
        .route("/college/login", post(college::login))
        .route("/college/profile", get(college::profile))
        .route("/college/update", put(college::update))
        .route("/college/bookings", get(college::bookings))
        .route("/test-center/register", post(test_center::register))
        .route("/test-center/login", post(test_center::login))
        .route("/test-center/profile", get(test_center::profile))
        .route("/test-center/update", put(test_center::update))
        .route("/test-center/availability", get(test_center::availability))
        .route("/test-center/bookings", get(test_center::bookings))
        .route("/bookings", post(bookings::create))
        .route("/bookings/{id}", put(bookings::update))
        .route(
            "/colleges",
            get(public::list_colleges).post(public::create_college),
        )
        .route(
            "/test-centers",
            get(public::list_test_centers).post(public::create_test_center),
        )
        .with_state(state)
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Reference resolution for display responses, mirroring a document-store
/// populate: a test-center id becomes `{_id, TestCenterName, Location}`.
/// Missing references resolve to null rather than failing the read.
pub(crate) async fn center_summary(
    db: &Db,
    cache: &mut HashMap<String, Value>,
    id: &str,
) -> Result<Value, AppError> {
    if let Some(cached) = cache.get(id) {
        return Ok(cached.clone());
    }

    let summary = match db.test_centers.find_one(doc! { "_id": id }).await? {
        Some(center) => json!({
            "_id": center.id,
            "TestCenterName": center.test_center_name,
            "Location": center.location,
        }),
        None => Value::Null,
    };

    cache.insert(id.to_string(), summary.clone());
    Ok(summary)
}

/// College counterpart of [`center_summary`].
pub(crate) async fn college_summary(
    db: &Db,
    cache: &mut HashMap<String, Value>,
    id: &str,
) -> Result<Value, AppError> {
    if let Some(cached) = cache.get(id) {
        return Ok(cached.clone());
    }

    let summary = match db.colleges.find_one(doc! { "_id": id }).await? {
        Some(college) => json!({
            "_id": college.id,
            "CollegeName": college.college_name,
            "CollegeConductingExamName": college.college_conducting_exam_name,
        }),
        None => Value::Null,
    };

    cache.insert(id.to_string(), summary.clone());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        auth::{Role, issue_token},
        config::Config,
    };

    const SECRET: &str = "test-secret";

    // The mongodb client connects lazily, so a router over an unreachable
    // store is fine as long as a test never gets past the auth gate.
    async fn test_state() -> Arc<AppState> {
        AppState::with_config(Config {
            port: 0,
            mongo_url: "mongodb://localhost:27017".into(),
            mongo_db: "seatbook_test".into(),
            jwt_secret: SECRET.into(),
            token_ttl_minutes: 60,
        })
        .await
    }

    fn bearer(role: Role) -> String {
        format!(
            "Bearer {}",
            issue_token("identity-1", role, SECRET, 60).unwrap()
        )
    }

    #[tokio::test]
    async fn profile_without_token_is_unauthorized() {
        let app = router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/college/profile")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Access denied: No token provided");
    }

    #[tokio::test]
    async fn profile_with_garbage_token_is_forbidden() {
        let app = router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/college/profile")
                    .header(AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn college_profile_rejects_test_center_role() {
        let app = router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/college/profile")
                    .header(AUTHORIZATION, bearer(Role::TestCenter))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Role mismatch must never leak profile data.
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn availability_rejects_college_role() {
        let app = router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test-center/availability")
                    .header(AUTHORIZATION, bearer(Role::College))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn booking_create_requires_a_token() {
        let app = router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/bookings")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"TestCenters": []}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
