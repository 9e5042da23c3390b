//! HTTP handlers for submitting uploads.
//! The request body is streamed into the intake; nothing here validates content.

use crate::{errors::AppError, models::caller::CallerId, services::intake_service::Intake};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::io;
use tracing::warn;

/// Header carrying the submitting caller's numeric identity.
pub const CALLER_HEADER: &str = "x-caller-id";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub name: String,
    pub original_name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub upload: &'static str,
    pub allowed_extensions: Vec<String>,
    pub max_file_size_mb: f64,
}

/// `POST /uploads/{filename}`
pub async fn upload_file(
    State(intake): State<Intake>,
    Path(filename): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let caller = caller_from_headers(&headers)?;

    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));

    let done = intake.submit_stream(caller, &filename, stream).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: done.reference.to_string(),
            name: done.object.generated_name,
            original_name: filename,
            size_bytes: done.object.size_bytes,
            created_at: done.object.created_at,
        }),
    ))
}

/// `GET /` — how to use the service.
pub async fn usage(State(intake): State<Intake>) -> Json<UsageResponse> {
    let config = intake.ingestor().config();
    Json(UsageResponse {
        upload: "POST /uploads/{filename} with the file as body and an x-caller-id header",
        allowed_extensions: config.allowed_extensions.iter().map(str::to_string).collect(),
        max_file_size_mb: config.max_size_mb(),
    })
}

fn caller_from_headers(headers: &HeaderMap) -> Result<CallerId, AppError> {
    let raw = headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("upload without caller identity");
            AppError::unauthorized("missing x-caller-id header")
        })?;

    raw.parse::<CallerId>().map_err(|_| {
        warn!(value = %raw, "upload with malformed caller identity");
        AppError::unauthorized("malformed x-caller-id header")
    })
}
