//! Blob storage for uploaded files.
//!
//! Uploads are addressed by a key such as
//! `course_materials/12/3f2a..._slides.pdf`. The database stores only the
//! key; [`BlobStore::url`] turns it into something a client can fetch.

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};
use url::Url;

use crate::config::{StorageBackend, StorageConfig};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Object store rejected {method} {key}: status {status}")]
    Rejected {
        method: &'static str,
        key: String,
        status: u16,
    },

    #[error("Storage misconfigured: {0}")]
    Config(String),
}

/// What an upload belongs to; decides the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    CourseThumbnail,
    CourseMaterial,
    CourseVideo,
    ProfilePicture,
}

impl BlobKind {
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::CourseThumbnail => "course_thumbnails",
            Self::CourseMaterial => "course_materials",
            Self::CourseVideo => "course_videos",
            Self::ProfilePicture => "profile_pics",
        }
    }
}

/// A file received from a client, before it is stored.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// Builds a fresh key: `{prefix}/{owner_id}/{uuid}_{sanitized name}`.
#[must_use]
pub fn blob_key(kind: BlobKind, owner_id: i32, filename: &str) -> String {
    format!(
        "{}/{}/{}_{}",
        kind.prefix(),
        owner_id,
        uuid::Uuid::new_v4().simple(),
        sanitize_filename(filename)
    )
}

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
/// Directory parts are dropped.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('.');

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

    if safe {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Removing a key that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    fn url(&self, key: &str) -> String;
}

fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Files under a media root on the local filesystem.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, &bytes).await?;
        debug!(key = %key, size = bytes.len(), "Stored blob");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        match fs::remove_file(self.root.join(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }
}

/// Object store speaking plain `PUT`/`DELETE` on `{endpoint}/{key}`.
pub struct HttpBlobStore {
    client: Client,
    endpoint: Url,
    token: Option<String>,
    public_base_url: String,
}

impl HttpBlobStore {
    pub fn new(
        endpoint: &str,
        token: Option<String>,
        public_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StorageError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        let client = Client::builder()
            .user_agent("Campus/1.0")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token,
            public_base_url: public_base_url.into(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        join_url(self.endpoint.as_str(), key)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        validate_key(key)?;
        let content_type = mime_guess::from_path(key).first_or_octet_stream();

        let response = self
            .authorized(self.client.put(self.object_url(key)))
            .header(reqwest::header::CONTENT_TYPE, content_type.as_ref())
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Rejected {
                method: "PUT",
                key: key.to_string(),
                status: response.status().as_u16(),
            });
        }

        debug!(key = %key, "Uploaded blob");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let response = self
            .authorized(self.client.delete(self.object_url(key)))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(StorageError::Rejected {
                method: "DELETE",
                key: key.to_string(),
                status: status.as_u16(),
            })
        }
    }

    fn url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }
}

/// Builds the configured backend.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, StorageError> {
    match config.backend {
        StorageBackend::Local => {
            info!(root = %config.media_root, "Using local media storage");
            Ok(Arc::new(LocalBlobStore::new(
                &config.media_root,
                &config.public_base_url,
            )))
        }
        StorageBackend::Http => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| StorageError::Config("storage.endpoint is not set".to_string()))?;
            info!(endpoint = %endpoint, "Using HTTP object storage");
            Ok(Arc::new(HttpBlobStore::new(
                endpoint,
                config.token.clone(),
                &config.public_base_url,
                Duration::from_secs(config.request_timeout_seconds),
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\tmp\\My Slides (v2).pdf"), "My_Slides__v2_.pdf");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn keys_carry_kind_and_owner() {
        let key = blob_key(BlobKind::CourseMaterial, 12, "notes.pdf");
        assert!(key.starts_with("course_materials/12/"));
        assert!(key.ends_with("_notes.pdf"));
        assert_ne!(key, blob_key(BlobKind::CourseMaterial, 12, "notes.pdf"));

        assert!(blob_key(BlobKind::ProfilePicture, 3, "me.png").starts_with("profile_pics/3/"));
    }

    #[test]
    fn traversal_keys_are_rejected() {
        assert!(validate_key("course_videos/1/a.mp4").is_ok());
        assert!(validate_key("../secret").is_err());
        assert!(validate_key("/abs/path").is_err());
        assert!(validate_key("").is_err());
    }

    #[tokio::test]
    async fn local_store_round_trip() {
        let root = std::env::temp_dir().join(format!("campus-blobs-{}", uuid::Uuid::new_v4()));
        let store = LocalBlobStore::new(&root, "/media/");

        let key = "course_thumbnails/1/abc_cover.png";
        store.put(key, b"png".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(root.join(key)).unwrap(), b"png");
        assert_eq!(store.url(key), "/media/course_thumbnails/1/abc_cover.png");

        store.delete(key).await.unwrap();
        assert!(!root.join(key).exists());
        store.delete(key).await.unwrap();

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn http_store_rejects_bad_endpoint() {
        let err = HttpBlobStore::new("nope", None, "/media", Duration::from_secs(1));
        assert!(matches!(err, Err(StorageError::Config(_))));
    }
}
