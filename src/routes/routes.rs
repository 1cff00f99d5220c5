//! Defines routes for all screenshot storage operations.
//!
//! ## Structure
//! - **Screenshot endpoints** (mounted under `/s3`)
//!   - `POST /s3/upload` — upload one screenshot (JSON body with base64 content)
//!   - `GET  /s3/download-folder/{folderName}` — bundle a folder prefix into a zip
//!   - `GET  /s3/download/session/{date}/{session}` — list a session's objects
//!   - `GET  /s3/download/image/{date}/{session}/{fileName}` — fetch one image
//!
//! - **Health endpoints** (mounted at root)
//!   - `GET /healthz` — liveness
//!   - `GET /readyz`  — readiness (bucket reachability)

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        screenshot_handlers::{
            download_folder, download_image, list_session_images, upload_screenshot,
        },
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all screenshot-store routes.
///
/// The router carries shared state (`StorageService`) to all handlers.
pub fn routes() -> Router<StorageService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // screenshot endpoints
        .route("/s3/upload", post(upload_screenshot))
        .route("/s3/download-folder/{folder_name}", get(download_folder))
        .route(
            "/s3/download/session/{date}/{session}",
            get(list_session_images),
        )
        .route(
            "/s3/download/image/{date}/{session}/{file_name}",
            get(download_image),
        )
}
