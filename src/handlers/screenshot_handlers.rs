//! HTTP handlers for screenshot upload, listing, and download operations.
//! Parses requests and shapes responses; every storage concern is delegated
//! to `StorageService`.

use crate::{
    errors::AppError,
    models::screenshot::{SessionListing, UploadAck, UploadRequest},
    services::storage_service::{ImagePayload, StorageService},
};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use tokio_util::io::ReaderStream;

/// POST `/s3/upload` — store one screenshot under `date/session/fileName`.
///
/// The body carries the image as base64 in `fileBuffer`; a malformed
/// encoding is a 400 before any storage call happens.
pub async fn upload_screenshot(
    State(service): State<StorageService>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadAck>, AppError> {
    let data = general_purpose::STANDARD
        .decode(&req.file_buffer)
        .map_err(|err| AppError::bad_request(format!("fileBuffer is not valid base64: {}", err)))?;

    let ack = service
        .upload_screenshot(&req.date, &req.session, &req.file_name, data)
        .await?;

    Ok(Json(ack))
}

/// GET `/s3/download-folder/{folderName}` — bundle a folder into a zip.
///
/// Success returns the archive as an attachment named `<folderName>.zip`.
/// Any failure, including an empty or missing folder, is reported as
/// HTTP 500 with a `{message, error}` body.
pub async fn download_folder(
    State(service): State<StorageService>,
    Path(folder_name): Path<String>,
) -> Response {
    match service.download_folder(&folder_name).await {
        Ok(zip_buffer) => zip_attachment_response(&folder_name, zip_buffer),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "message": "Error downloading folder",
                "error": err.to_string()
            })),
        )
            .into_response(),
    }
}

/// GET `/s3/download/session/{date}/{session}` — list a session's objects.
pub async fn list_session_images(
    State(service): State<StorageService>,
    Path((date, session)): Path<(String, String)>,
) -> Result<Json<SessionListing>, AppError> {
    let listing = service.list_session(&date, &session).await?;
    Ok(Json(listing))
}

/// GET `/s3/download/image/{date}/{session}/{fileName}` — stream one image.
pub async fn download_image(
    State(service): State<StorageService>,
    Path((date, session, file_name)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let payload = service.get_image(&date, &session, &file_name).await?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    set_image_headers(response.headers_mut(), &payload);

    let stream = ReaderStream::new(payload.body.into_async_read());
    *response.body_mut() = Body::from_stream(stream);

    Ok(response)
}

/// Build the `application/zip` attachment response for a bundled folder.
fn zip_attachment_response(folder_name: &str, zip_buffer: Vec<u8>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/zip"),
    );
    let disposition = format!("attachment; filename=\"{}.zip\"", folder_name);
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&zip_buffer.len().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    let mut response = Response::new(Body::from(zip_buffer));
    *response.status_mut() = StatusCode::OK;
    *response.headers_mut() = headers;
    response
}

fn set_image_headers(headers: &mut HeaderMap, payload: &ImagePayload) {
    let content_type = payload
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".into());
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    if let Some(length) = payload.content_length {
        headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from_str(&length.max(0).to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("0")),
        );
    }

    if let Some(etag) = payload.etag.as_ref() {
        if let Ok(value) = HeaderValue::from_str(etag) {
            headers.insert(header::ETAG, value);
        }
    }

    if let Some(last_modified) = payload.last_modified.as_ref() {
        if let Ok(value) = HeaderValue::from_str(&last_modified.to_rfc2822()) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_response_sets_download_headers() {
        let response = zip_attachment_response("F", vec![0u8; 42]);
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"F.zip\""
        );
        assert_eq!(headers[header::CONTENT_LENGTH], "42");
    }
}
