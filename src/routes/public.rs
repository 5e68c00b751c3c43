//! Unauthenticated CRUD passthrough kept for the administrative client.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use futures::TryStreamExt;
use mongodb::bson::doc;

use crate::{
    booking::seed_availability,
    error::AppError,
    models::{College, TestCenter, TestCenterData, new_id},
    state::AppState,
};

pub async fn list_colleges(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<College>>, AppError> {
    let colleges = state
        .db
        .colleges
        .find(doc! {})
        .await?
        .try_collect()
        .await?;

    Ok(Json(colleges))
}

pub async fn list_test_centers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TestCenter>>, AppError> {
    let centers = state
        .db
        .test_centers
        .find(doc! {})
        .await?
        .try_collect()
        .await?;

    Ok(Json(centers))
}

pub async fn create_college(
    State(state): State<Arc<AppState>>,
    Json(college): Json<College>,
) -> Result<impl IntoResponse, AppError> {
    state.db.colleges.insert_one(&college).await?;

    Ok((StatusCode::CREATED, Json(college)))
}

/// Same vacancy derivation and ledger seeding as authenticated
/// registration, minus the manager identity.
pub async fn create_test_center(
    State(state): State<Arc<AppState>>,
    Json(data): Json<TestCenterData>,
) -> Result<impl IntoResponse, AppError> {
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

    Ok((StatusCode::CREATED, Json(center)))
}
