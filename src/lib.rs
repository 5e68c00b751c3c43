//! # Seatbook
//!
//! Seat-booking coordination service between exam-conducting colleges
//! and physical test centers. Colleges register exam offerings, test
//! centers register per-date/per-slot seat capacity, and colleges book
//! seats against test-center availability.
//!
//!
//!
//! # General Infrastructure
//! - Axum JSON API behind a bearer-token auth gate
//! - MongoDB holds the five collections; each handler does
//!   read-modify-write on whole documents
//! - One booking touches three documents: the test center's
//!   availability ledger, the test center's history ledger, and the
//!   college's booked-dates ledger
//! - Booking create/update is serialized by an in-process mutex so the
//!   availability check and the write cannot interleave between requests
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run locally (MongoDB on the default port).
//! ```sh
//! JWT_SECRET=dev-secret cargo run
//! ```
use std::time::Duration;

use axum::http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod booking;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;

use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let app = routes::router(state.clone()).layer(cors);

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
