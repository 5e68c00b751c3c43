use std::{collections::HashMap, sync::Arc};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use mongodb::bson::{doc, to_document};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{LoginRequest, college_summary};
use crate::{
    auth::{AuthUser, Role, hash_password, issue_token, verify_password},
    booking::seed_availability,
    error::AppError,
    models::{TestCenter, TestCenterData, TestCenterManager, new_id},
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub test_center_data: TestCenterData,
}

/// Registration seeds the availability ledger as the full
/// dates × slots cross product, every slot at `NormalVacancy`, and
/// derives `TotalVacancy` from the same product.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let data = payload.test_center_data;
    let (total, available) = seed_availability(
        data.normal_vacancy,
        &data.available_dates,
        &data.available_slots,
    );

    let center = TestCenter {
        id: new_id(),
        test_center_name: data.test_center_name,
        location: data.location,
        normal_vacancy: data.normal_vacancy,
        total_vacancy: total,
        booking_available_seats: available,
        booking_history: Vec::new(),
    };
    state.db.test_centers.insert_one(&center).await?;

    let hashed = hash_password(&payload.password)?;
    let manager = TestCenterManager {
        id: new_id(),
        email: payload.email,
        password: hashed,
        test_center_id: center.id.clone(),
    };
    state.db.test_center_managers.insert_one(&manager).await?;

    info!("Registered test center {}", center.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Test Center registered successfully",
            "testCenter": center,
        })),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let manager = state
        .db
        .test_center_managers
        .find_one(doc! { "email": &payload.email })
        .await?;

    let Some(manager) = manager else {
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(&payload.password, &manager.password)? {
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(
        &manager.id,
        Role::TestCenter,
        &state.config.jwt_secret,
        state.config.token_ttl_minutes,
    )?;

    Ok(Json(json!({
        "token": token,
        "testCenterId": manager.test_center_id,
    })))
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<TestCenter>, AppError> {
    user.require(Role::TestCenter)?;

    let manager = state.db.test_center_manager(&user.id).await?;
    let center = state.db.test_center(&manager.test_center_id).await?;

    Ok(Json(center))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<Value>,
) -> Result<Json<TestCenter>, AppError> {
    user.require(Role::TestCenter)?;

    let manager = state.db.test_center_manager(&user.id).await?;

    let mut fields = to_document(&payload)
        .map_err(|e| AppError::BadRequest(format!("Malformed update payload: {e}")))?;
    fields.remove("_id");

    if !fields.is_empty() {
        state
            .db
            .test_centers
            .update_one(
                doc! { "_id": &manager.test_center_id },
                doc! { "$set": fields },
            )
            .await?;
    }

    let center = state.db.test_center(&manager.test_center_id).await?;
    Ok(Json(center))
}

/// Snapshot of the seat ledger: the running total plus the per-date,
/// per-slot remainders.
pub async fn availability(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    user.require(Role::TestCenter)?;

    let manager = state.db.test_center_manager(&user.id).await?;
    let center = state.db.test_center(&manager.test_center_id).await?;

    Ok(Json(json!({
        "TotalVacancy": center.total_vacancy,
        "BookingAvailableSeats": center.booking_available_seats,
    })))
}

/// Booking history with each college reference resolved to
/// `{_id, CollegeName, CollegeConductingExamName}`.
pub async fn bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    user.require(Role::TestCenter)?;

    let manager = state.db.test_center_manager(&user.id).await?;
    let center = state.db.test_center(&manager.test_center_id).await?;

    let mut cache = HashMap::new();
    let mut out = Vec::with_capacity(center.booking_history.len());

    for entry in &center.booking_history {
        let mut value = serde_json::to_value(entry)?;
        let summary = college_summary(&state.db, &mut cache, &entry.college_id).await?;
        if let Some(object) = value.as_object_mut() {
            object.insert("CollegeId".into(), summary);
        }
        out.push(value);
    }

    Ok(Json(Value::Array(out)))
}
