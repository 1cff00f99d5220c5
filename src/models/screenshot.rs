//! Wire types for the screenshot endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /s3/upload`.
///
/// Field names follow the client contract
/// (`date`, `session`, `fileName`, `fileBuffer`).
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Calendar date bucket, e.g. "2025-08-25".
    pub date: String,

    /// Session identifier grouping screenshots within a date.
    pub session: String,

    /// File name of the screenshot, unique within its session.
    pub file_name: String,

    /// Base64-encoded image bytes.
    pub file_buffer: String,
}

/// Acknowledgment returned after a successful upload.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UploadAck {
    /// Bucket the object was written to.
    pub bucket: String,

    /// Full object key (`date/session/fileName`).
    pub key: String,

    /// ETag reported by the storage backend, when available.
    pub etag: Option<String>,

    /// Public URL of the stored object.
    pub location: String,
}

/// One object entry in a listing response.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ObjectSummary {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// ETag reported by the backend, when available.
    pub etag: Option<String>,

    /// Timestamp when the object was last modified.
    pub last_modified: Option<DateTime<Utc>>,

    /// Storage class (e.g. STANDARD).
    pub storage_class: String,
}

/// Response of `GET /s3/download/session/{date}/{session}`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SessionListing {
    /// Prefix the listing was taken under (`date/session/`).
    pub prefix: String,

    /// Number of objects returned (single page).
    pub key_count: usize,

    /// The listed objects.
    pub objects: Vec<ObjectSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_request_uses_camel_case_field_names() {
        let json = r#"{
            "date": "2025-08-25",
            "session": "s1",
            "fileName": "shot.png",
            "fileBuffer": "aGVsbG8="
        }"#;
        let req: UploadRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.date, "2025-08-25");
        assert_eq!(req.session, "s1");
        assert_eq!(req.file_name, "shot.png");
        assert_eq!(req.file_buffer, "aGVsbG8=");

        let back = serde_json::to_value(&req).unwrap();
        assert!(back.get("fileName").is_some());
        assert!(back.get("fileBuffer").is_some());
    }
}
