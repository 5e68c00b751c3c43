use std::{collections::HashMap, sync::Arc};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use futures::TryStreamExt;
use mongodb::bson::{doc, to_document};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{LoginRequest, center_summary};
use crate::{
    auth::{AuthUser, Role, hash_password, issue_token, verify_password},
    error::AppError,
    models::{Booking, College, CollegeAuthority, new_id},
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub college_data: College,
}

/// Two independent writes, profile first. A failure between them leaves
/// a college with no login, which matches the source system's behavior.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let hashed = hash_password(&payload.password)?;

    let college = payload.college_data;
    state.db.colleges.insert_one(&college).await?;

    let authority = CollegeAuthority {
        id: new_id(),
        email: payload.email,
        password: hashed,
        college_id: college.id.clone(),
    };
    state.db.college_authorities.insert_one(&authority).await?;

    info!("Registered college {}", college.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "College registered successfully" })),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let authority = state
        .db
        .college_authorities
        .find_one(doc! { "email": &payload.email })
        .await?;

    // Uniform failure: do not reveal whether the email exists.
    let Some(authority) = authority else {
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(&payload.password, &authority.password)? {
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(
        &authority.id,
        Role::College,
        &state.config.jwt_secret,
        state.config.token_ttl_minutes,
    )?;

    Ok(Json(json!({
        "token": token,
        "collegeId": authority.college_id,
    })))
}

/// Profile with every booked slot's test-center reference resolved to
/// `{_id, TestCenterName, Location}`.
pub async fn profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    user.require(Role::College)?;

    let authority = state.db.college_authority(&user.id).await?;
    let college = state.db.college(&authority.college_id).await?;

    let mut value = serde_json::to_value(&college)?;
    let mut cache = HashMap::new();

    if let Some(dates) = value.get_mut("BookedDates").and_then(Value::as_array_mut) {
        for date in dates {
            let Some(slots) = date.get_mut("Slots").and_then(Value::as_array_mut) else {
                continue;
            };
            for slot in slots {
                let Some(center_id) = slot
                    .get("TestCenterId")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                else {
                    continue;
                };
                let summary = center_summary(&state.db, &mut cache, &center_id).await?;
                if let Some(entry) = slot.as_object_mut() {
                    entry.insert("TestCenterId".into(), summary);
                }
            }
        }
    }

    Ok(Json(value))
}

/// Partial update: whatever fields the caller sends are `$set` on the
/// profile document, id excluded. Returns the updated document.
pub async fn update(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<Value>,
) -> Result<Json<College>, AppError> {
    user.require(Role::College)?;

    let authority = state.db.college_authority(&user.id).await?;

    let mut fields = to_document(&payload)
        .map_err(|e| AppError::BadRequest(format!("Malformed update payload: {e}")))?;
    fields.remove("_id");

    if !fields.is_empty() {
        state
            .db
            .colleges
            .update_one(doc! { "_id": &authority.college_id }, doc! { "$set": fields })
            .await?;
    }

    let college = state.db.college(&authority.college_id).await?;
    Ok(Json(college))
}

/// The college's own booking documents, test-center references resolved.
pub async fn bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    user.require(Role::College)?;

    let authority = state.db.college_authority(&user.id).await?;
    let bookings: Vec<Booking> = state
        .db
        .bookings
        .find(doc! { "College": &authority.college_id })
        .await?
        .try_collect()
        .await?;

    let mut cache = HashMap::new();
    let mut out = Vec::with_capacity(bookings.len());

    for booking in &bookings {
        let mut value = serde_json::to_value(booking)?;
        if let Some(centers) = value.get_mut("TestCenters").and_then(Value::as_array_mut) {
            for center in centers {
                let Some(center_id) = center
                    .get("TestCenterId")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                else {
                    continue;
                };
                let summary = center_summary(&state.db, &mut cache, &center_id).await?;
                if let Some(entry) = center.as_object_mut() {
                    entry.insert("TestCenterId".into(), summary);
                }
            }
        }
        out.push(value);
    }

    Ok(Json(Value::Array(out)))
}
