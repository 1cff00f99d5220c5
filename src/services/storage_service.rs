//! src/services/storage_service.rs
//!
//! StorageService — screenshot storage operations backed by an S3 bucket.
//! All durable state lives in the external object store; this service owns
//! no database or cache. Objects are keyed `date/session/fileName` and a
//! "folder" is nothing more than a key prefix. Folder downloads assemble a
//! request-scoped zip archive in memory and discard it once sent.

use crate::config::AppConfig;
use crate::models::screenshot::{ObjectSummary, SessionListing, UploadAck};
use aws_config::BehaviorVersion;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use std::io::{self, Write};
use thiserror::Error;
use tracing::debug;

/// Fixed content type for uploaded screenshots.
const SCREENSHOT_CONTENT_TYPE: &str = "image/png";

/// Upper bound on simultaneous in-flight GetObject calls during folder
/// bundling. Keeps large folders from exhausting connections or memory.
const MAX_BUNDLE_CONCURRENCY: usize = 16;

/// DEFLATE level used when serializing folder archives.
const ZIP_COMPRESSION_LEVEL: i32 = 6;

const MAX_SEGMENT_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("folder `{0}` is empty or does not exist")]
    EmptyFolder(String),
    #[error("object `{key}` not found")]
    ObjectNotFound { key: String },
    #[error("invalid {field}: {reason}")]
    InvalidSegment { field: &'static str, reason: String },
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("listing failed: {0}")]
    ListFailed(String),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A fetched image payload: response metadata plus the unread body stream.
pub struct ImagePayload {
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub body: ByteStream,
}

/// Build the S3 client once at startup from immutable configuration.
///
/// Credentials are resolved through the standard AWS environment/credential
/// chain. A custom endpoint (MinIO, DigitalOcean Spaces, ...) switches the
/// client to path-style addressing.
pub async fn build_s3_client(cfg: &AppConfig) -> Client {
    let region_provider =
        RegionProviderChain::first_try(aws_config::Region::new(cfg.region.clone()));
    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;

    if let Some(endpoint) = &cfg.endpoint_url {
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();
        Client::from_conf(s3_config)
    } else {
        Client::new(&shared)
    }
}

/// StorageService provides the screenshot operations:
/// - Upload a screenshot (PutObject under `date/session/fileName`)
/// - List a session (single-page ListObjectsV2 under `date/session/`)
/// - Fetch a single image (GetObject)
/// - Bundle a folder prefix into a zip archive (bounded parallel GetObject)
///
/// The client is constructed in `main` and injected here; the service keeps
/// no other state. Backend errors propagate to the caller — there is no
/// retry, partial-success reporting, or pagination handling.
#[derive(Clone)]
pub struct StorageService {
    /// Injected S3 client, shared across handlers.
    pub client: Client,

    /// Bucket holding every screenshot object.
    pub bucket: String,

    /// Region identifier, used when composing public object URLs.
    pub region: String,

    /// Custom endpoint for S3-compatible providers, if any.
    pub endpoint_url: Option<String>,
}

impl StorageService {
    /// Create a new StorageService around an already-constructed client.
    pub fn new(
        client: Client,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> Self {
        Self {
            client,
            bucket,
            region,
            endpoint_url,
        }
    }

    /// Public URL for an object key.
    ///
    /// Standard AWS virtual-hosted format, or path-style under a custom
    /// endpoint.
    fn object_url(&self, key: &str) -> String {
        if let Some(endpoint) = &self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    /// Upload one screenshot under `date/session/fileName`.
    ///
    /// Content type is fixed to `image/png`. Identical keys overwrite
    /// (last-write-wins, as the backend provides). No local retry.
    pub async fn upload_screenshot(
        &self,
        date: &str,
        session: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> StorageResult<UploadAck> {
        let key = compose_key(date, session, file_name)?;
        let size_bytes = data.len() as u64;
        let start = std::time::Instant::now();

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(Bytes::from(data)))
            .content_type(SCREENSHOT_CONTENT_TYPE)
            .send()
            .await
            .map_err(|err| {
                tracing::error!(
                    error = %err,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes,
                    "screenshot upload failed"
                );
                StorageError::UploadFailed(err.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "screenshot upload successful"
        );

        Ok(UploadAck {
            bucket: self.bucket.clone(),
            key: key.clone(),
            etag: output.e_tag().map(str::to_string),
            location: self.object_url(&key),
        })
    }

    /// List all objects under `date/session/`.
    ///
    /// Single page only — callers needing more than one page must page
    /// externally.
    pub async fn list_session(&self, date: &str, session: &str) -> StorageResult<SessionListing> {
        ensure_segment_safe("date", date)?;
        ensure_segment_safe("session", session)?;
        let prefix = format!("{}/{}/", date, session);

        let objects = self.list_prefix(&prefix).await?;
        debug!(
            bucket = %self.bucket,
            prefix = %prefix,
            key_count = objects.len(),
            "listed session"
        );

        Ok(SessionListing {
            prefix,
            key_count: objects.len(),
            objects,
        })
    }

    /// Fetch the object at `date/session/fileName` for streaming out.
    ///
    /// Returns metadata plus the unread body stream. NoSuchKey maps to
    /// ObjectNotFound; every other backend error propagates as-is.
    pub async fn get_image(
        &self,
        date: &str,
        session: &str,
        file_name: &str,
    ) -> StorageResult<ImagePayload> {
        let key = compose_key(date, session, file_name)?;

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| map_get_object_error(err, &key))?;

        Ok(ImagePayload {
            content_type: output.content_type().map(str::to_string),
            content_length: output.content_length(),
            etag: output.e_tag().map(str::to_string),
            last_modified: output.last_modified().and_then(to_chrono),
            body: output.body,
        })
    }

    /// Bundle every object under `folder` into a single in-memory zip.
    ///
    /// Lists the prefix (failing when nothing matches), fetches each
    /// object's bytes through a bounded parallel fan-out, and packs the
    /// buffers into a zip keyed by the prefix-stripped path. All-or-nothing:
    /// the first fetch failure aborts the whole bundle.
    pub async fn download_folder(&self, folder: &str) -> StorageResult<Vec<u8>> {
        ensure_segment_safe("folderName", folder)?;
        let start = std::time::Instant::now();

        let objects = self.list_prefix(folder).await?;
        if objects.is_empty() {
            return Err(StorageError::EmptyFolder(folder.to_string()));
        }

        let entries: Vec<(String, Vec<u8>)> = stream::iter(objects)
            .map(|object| {
                let service = self.clone();
                let folder = folder.to_string();
                async move {
                    let data = service.fetch_object_bytes(&object.key).await?;
                    let name = strip_folder_prefix(&object.key, &folder);
                    Ok::<_, StorageError>((name, data))
                }
            })
            .buffer_unordered(MAX_BUNDLE_CONCURRENCY)
            .try_collect()
            .await?;

        let entry_count = entries.len();
        let archive = build_zip(entries)?;

        tracing::info!(
            bucket = %self.bucket,
            folder = %folder,
            entry_count,
            archive_bytes = archive.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "folder bundled"
        );

        Ok(archive)
    }

    /// Single-page ListObjectsV2 under a prefix.
    async fn list_prefix(&self, prefix: &str) -> StorageResult<Vec<ObjectSummary>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|err| {
                tracing::error!(
                    error = %err,
                    bucket = %self.bucket,
                    prefix = %prefix,
                    "listing failed"
                );
                StorageError::ListFailed(err.to_string())
            })?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?.to_string();
                Some(ObjectSummary {
                    key,
                    size_bytes: object.size().unwrap_or_default(),
                    etag: object.e_tag().map(str::to_string),
                    last_modified: object.last_modified().and_then(to_chrono),
                    storage_class: object
                        .storage_class()
                        .map(|class| class.as_str().to_string())
                        .unwrap_or_else(|| "STANDARD".into()),
                })
            })
            .collect();

        Ok(objects)
    }

    /// Fetch and fully buffer one object's bytes.
    async fn fetch_object_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| map_get_object_error(err, key))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|err| StorageError::DownloadFailed(err.to_string()))?;

        Ok(data.into_bytes().to_vec())
    }
}

/// Compose the canonical object key `date/session/fileName`, validating
/// each segment first.
pub fn compose_key(date: &str, session: &str, file_name: &str) -> StorageResult<String> {
    ensure_segment_safe("date", date)?;
    ensure_segment_safe("session", session)?;
    ensure_segment_safe("fileName", file_name)?;
    Ok(format!("{}/{}/{}", date, session, file_name))
}

/// Basic segment validation to avoid trivial path traversal vectors.
///
/// Rejects empty segments, embedded separators, `..`, control characters,
/// and overlong values. Segments arrive from URL paths and request bodies,
/// so this is the only sanitation between the caller and the object key.
fn ensure_segment_safe(field: &'static str, value: &str) -> StorageResult<()> {
    let reject = |reason: &str| {
        Err(StorageError::InvalidSegment {
            field,
            reason: reason.to_string(),
        })
    };
    if value.is_empty() {
        return reject("must not be empty");
    }
    if value.len() > MAX_SEGMENT_LEN {
        return reject("too long");
    }
    if value.contains('/') || value.contains('\\') {
        return reject("must not contain path separators");
    }
    if value.contains("..") {
        return reject("must not contain `..`");
    }
    if value.bytes().any(|b| b.is_ascii_control()) {
        return reject("must not contain control characters");
    }
    Ok(())
}

/// Strip `folder/` from the front of a key to recover the archive entry
/// name, preserving any remaining sub-path. Keys not under the folder are
/// left untouched.
fn strip_folder_prefix(key: &str, folder: &str) -> String {
    let prefix = format!("{}/", folder);
    key.strip_prefix(&prefix).unwrap_or(key).to_string()
}

/// Serialize `(name, content)` entries into a zip buffer using DEFLATE at
/// the fixed compression level.
fn build_zip(entries: Vec<(String, Vec<u8>)>) -> StorageResult<Vec<u8>> {
    use zip::CompressionMethod;
    use zip::write::{FileOptions, ZipWriter};

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(ZIP_COMPRESSION_LEVEL))
            .unix_permissions(0o644);

        for (name, data) in entries {
            zip.start_file(&name, options)?;
            zip.write_all(&data)?;
        }

        zip.finish()?;
    }

    Ok(buffer)
}

/// Map a GetObject SDK error, distinguishing NoSuchKey from everything else.
fn map_get_object_error(err: SdkError<GetObjectError>, key: &str) -> StorageError {
    match &err {
        SdkError::ServiceError(service_err) => match service_err.err() {
            GetObjectError::NoSuchKey(_) => StorageError::ObjectNotFound {
                key: key.to_string(),
            },
            _ => {
                tracing::error!(error = %err, key = %key, "object download failed");
                StorageError::DownloadFailed(err.to_string())
            }
        },
        _ => {
            tracing::error!(error = %err, key = %key, "object download failed");
            StorageError::DownloadFailed(err.to_string())
        }
    }
}

/// Convert an SDK timestamp into a chrono UTC timestamp.
fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn compose_key_joins_segments() {
        assert_eq!(
            compose_key("2025-08-25", "session-1", "shot.png").unwrap(),
            "2025-08-25/session-1/shot.png"
        );
    }

    #[test]
    fn compose_key_rejects_bad_segments() {
        assert!(compose_key("", "s", "f.png").is_err());
        assert!(compose_key("d", "a/b", "f.png").is_err());
        assert!(compose_key("d", "s", "../etc/passwd").is_err());
        assert!(compose_key("d", "s", "f\x00.png").is_err());
        assert!(compose_key("d", "s", &"x".repeat(300)).is_err());
    }

    #[test]
    fn segment_validation_reports_field_name() {
        let err = compose_key("d", "bad/session", "f.png").unwrap_err();
        match err {
            StorageError::InvalidSegment { field, .. } => assert_eq!(field, "session"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn strip_folder_prefix_preserves_subpaths() {
        assert_eq!(strip_folder_prefix("F/a.png", "F"), "a.png");
        assert_eq!(strip_folder_prefix("F/sub/b.png", "F"), "sub/b.png");
        // Keys outside the folder are left as-is.
        assert_eq!(strip_folder_prefix("G/a.png", "F"), "G/a.png");
    }

    #[test]
    fn build_zip_preserves_entries() {
        let entries = vec![
            ("a.png".to_string(), b"alpha".to_vec()),
            ("sub/b.png".to_string(), b"bravo".to_vec()),
        ];
        let buffer = build_zip(entries).unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(buffer)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = Vec::new();
        archive
            .by_name("a.png")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"alpha");

        content.clear();
        archive
            .by_name("sub/b.png")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"bravo");
    }

    #[test]
    fn build_zip_with_no_entries_yields_empty_archive() {
        let buffer = build_zip(Vec::new()).unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(buffer)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn empty_folder_error_names_the_folder() {
        let err = StorageError::EmptyFolder("F".into());
        assert_eq!(err.to_string(), "folder `F` is empty or does not exist");
    }
}
