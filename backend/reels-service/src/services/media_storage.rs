/// Media storage and upload policy
///
/// Uploads are checked against the MIME allow-list and the per-kind size
/// ceiling before any byte reaches disk.
use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::{AppError, Result};

/// Accepted upload families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
        }
    }
}

/// MIME allow-list plus size ceilings
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_video_bytes: usize,
    pub max_image_bytes: usize,
}

impl UploadPolicy {
    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            max_video_bytes: config.max_video_bytes,
            max_image_bytes: config.max_image_bytes,
        }
    }

    /// Only `video/*` and `image/*` are accepted
    pub fn classify(&self, mime: &Mime) -> Result<MediaKind> {
        match mime.type_() {
            mime::VIDEO => Ok(MediaKind::Video),
            mime::IMAGE => Ok(MediaKind::Image),
            _ => Err(AppError::Validation(format!(
                "Unsupported media type {}: only video/* and image/* are accepted",
                mime.essence_str()
            ))),
        }
    }

    pub fn limit_for(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Video => self.max_video_bytes,
            MediaKind::Image => self.max_image_bytes,
        }
    }

    /// Fails once `size` exceeds the ceiling for `kind`
    pub fn check_size(&self, kind: MediaKind, size: usize) -> Result<()> {
        let limit = self.limit_for(kind);
        if size > limit {
            return Err(AppError::PayloadTooLarge(format!(
                "{} exceeds the {} MB limit",
                kind.as_str(),
                limit / (1024 * 1024)
            )));
        }
        Ok(())
    }
}

/// A persisted media object
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    pub filename: String,
    pub url: String,
    pub path: PathBuf,
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Persist bytes under a fresh name with the given extension
    async fn put(&self, bytes: Bytes, extension: &str) -> Result<StoredMedia>;

    /// Reserve a fresh location for a derived output (e.g. processed video)
    fn allocate(&self, extension: &str) -> StoredMedia;

    /// Map a public URL produced by this storage back to its file
    fn resolve(&self, url: &str) -> Option<StoredMedia>;

    fn is_local_url(&self, url: &str) -> bool {
        self.resolve(url).is_some()
    }
}

/// Files on the local filesystem, served under `public_base_url`
pub struct LocalMediaStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaStorage {
    pub async fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn locate(&self, filename: String) -> StoredMedia {
        StoredMedia {
            url: format!("{}/{}", self.public_base_url, filename),
            path: self.root.join(&filename),
            filename,
        }
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn put(&self, bytes: Bytes, extension: &str) -> Result<StoredMedia> {
        let media = self.allocate(extension);
        tokio::fs::write(&media.path, &bytes).await?;
        debug!(filename = %media.filename, size = bytes.len(), "Stored media");
        Ok(media)
    }

    fn allocate(&self, extension: &str) -> StoredMedia {
        self.locate(format!("{}.{}", Uuid::new_v4(), extension))
    }

    fn resolve(&self, url: &str) -> Option<StoredMedia> {
        let filename = url
            .strip_prefix(&self.public_base_url)?
            .strip_prefix('/')?;
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return None;
        }
        let media = self.locate(filename.to_string());
        media.path.is_file().then_some(media)
    }
}

/// File extension for an accepted MIME type
pub fn extension_for(mime: &Mime) -> String {
    let known = match mime.essence_str() {
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/webm" => Some("webm"),
        "video/x-matroska" => Some("mkv"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    };
    known
        .map(str::to_string)
        .or_else(|| {
            mime_guess::get_mime_extensions(mime)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| "bin".to_string())
}

/// Declared content type, falling back to a guess from the file name
pub fn effective_mime(declared: Option<&Mime>, filename: Option<&str>) -> Option<Mime> {
    match declared {
        Some(mime) if *mime != mime::APPLICATION_OCTET_STREAM => Some(mime.clone()),
        _ => filename.and_then(|name| mime_guess::from_path(name).first()),
    }
}
