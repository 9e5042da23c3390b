//! Defines routes for the upload service.
//!
//! ## Structure
//! - `GET  /`                  — usage: allowed types and size limit
//! - `POST /uploads/{filename}` — submit a file (body) as the `x-caller-id` caller
//! - `GET  /media/{name}`       — fetch a stored file by generated name
//! - `GET  /healthz`, `GET /readyz`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        media_handlers::get_media,
        upload_handlers::{upload_file, usage},
    },
    services::intake_service::Intake,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the router. Every handler shares the `Intake` state.
pub fn routes() -> Router<Intake> {
    Router::new()
        .route("/", get(usage))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/uploads/{filename}", post(upload_file))
        .route("/media/{name}", get(get_media))
}
