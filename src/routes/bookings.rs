//! Booking create/update handlers. The seat arithmetic lives in
//! [`crate::booking`]; these handlers load the documents, run the whole
//! request against in-memory copies, and persist only once every tuple
//! has been validated and applied. The writes themselves are still one
//! document at a time, there is no cross-document transaction.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{AuthUser, Role},
    booking::{apply_booking, apply_update},
    error::AppError,
    models::{Booking, BookingCenter, TestCenter, new_id},
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BookingRequest {
    pub test_centers: Vec<BookingCenter>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<BookingRequest>,
) -> Result<Json<Value>, AppError> {
    user.require(Role::College)?;

    let authority = state.db.college_authority(&user.id).await?;

    // Hold the booking lock across read-modify-write so two requests
    // cannot both pass the availability check on the same seats.
    let _guard = state.booking_lock.lock().await;

    let mut college = state.db.college(&authority.college_id).await?;

    // Load each referenced center once; an unknown reference fails the
    // request before anything is written.
    let mut centers: Vec<TestCenter> = Vec::new();
    for request in &payload.test_centers {
        if !centers.iter().any(|c| c.id == request.test_center_id) {
            centers.push(state.db.test_center(&request.test_center_id).await?);
        }
    }

    let booking = Booking {
        id: new_id(),
        college: college.id.clone(),
        test_centers: payload.test_centers.clone(),
    };
    let now = Utc::now();

    for request in &payload.test_centers {
        let center = centers
            .iter_mut()
            .find(|c| c.id == request.test_center_id)
            .ok_or_else(|| AppError::NotFound(format!("Test Center {}", request.test_center_id)))?;
        apply_booking(center, &mut college, &booking.id, request, now)?;
    }

    for center in &centers {
        state.db.save_test_center(center).await?;
    }
    state.db.save_college(&college).await?;
    state.db.bookings.insert_one(&booking).await?;

    info!(
        "College {} booked seats across {} test center(s)",
        college.id,
        centers.len()
    );

    Ok(Json(json!({
        "message": "Booking successful",
        "booking": booking,
    })))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    // Any authenticated caller may update; role is not narrowed here.
    _user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<BookingRequest>,
) -> Result<Json<Value>, AppError> {
    let _guard = state.booking_lock.lock().await;

    let mut booking = state.db.booking(&id).await?;
    let mut college = state.db.college(&booking.college).await?;

    let mut centers: Vec<TestCenter> = Vec::new();
    for request in &payload.test_centers {
        if !centers.iter().any(|c| c.id == request.test_center_id) {
            centers.push(state.db.test_center(&request.test_center_id).await?);
        }
    }

    for request in &payload.test_centers {
        let old = booking
            .test_centers
            .iter()
            .find(|c| c.test_center_id == request.test_center_id)
            .ok_or_else(|| {
                AppError::InvalidState(format!(
                    "Test Center {} was never part of the original booking",
                    request.test_center_id
                ))
            })?;
        let center = centers
            .iter_mut()
            .find(|c| c.id == request.test_center_id)
            .ok_or_else(|| AppError::NotFound(format!("Test Center {}", request.test_center_id)))?;
        apply_update(center, &mut college, old, request)?;
    }

    booking.test_centers = payload.test_centers;

    for center in &centers {
        state.db.save_test_center(center).await?;
    }
    state.db.save_college(&college).await?;
    state.db.save_booking(&booking).await?;

    info!("Booking {} updated", booking.id);

    Ok(Json(json!({
        "message": "Booking updated successfully",
        "booking": booking,
    })))
}
