//! Serves stored files back by generated name so public references resolve
//! when this service is also the public host.

use crate::{errors::AppError, services::intake_service::Intake};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use std::io;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// `GET /media/{name}` as a streaming response.
pub async fn get_media(
    State(intake): State<Intake>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    if !is_plain_name(&name) {
        return Err(AppError::bad_request("invalid file name"));
    }

    let path = intake.ingestor().config().storage_root.join(&name);
    let file = File::open(&path).await.map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            AppError::not_found(format!("`{}` not found", name))
        } else {
            AppError::internal(err.to_string())
        }
    })?;
    let len = file
        .metadata()
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
        .len();

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&name)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

    Ok(response)
}

/// A single path component that cannot escape the storage root or hit a
/// temp/hidden file.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && !name
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\')
}

fn content_type_for(name: &str) -> &'static str {
    match crate::services::ingest_service::extension_of(name).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names() {
        assert!(is_plain_name("20260101_120000_abcdef12.png"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name(".tmp-123"));
        assert!(!is_plain_name("../etc/passwd"));
        assert!(!is_plain_name("a/b.png"));
        assert!(!is_plain_name("a\\b.png"));
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("x.JPG"), "image/jpeg");
        assert_eq!(content_type_for("x.pdf"), "application/pdf");
        assert_eq!(content_type_for("x"), "application/octet-stream");
    }
}
