//! Local disk storage for uploaded and generated files.
//!
//! Every file lives in one of the typed folders under the configured upload root
//! and is referenced from the database by its bare file name.

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Public URL prefix the upload root is served under
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UploadFolder {
    Images,
    Videos,
    Invoices,
    Mou,
    Payments,
    Receipts,
    Reports,
    Profiles,
}

impl UploadFolder {
    /// Lowercase extensions accepted for client uploads into this folder
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            UploadFolder::Images => &["jpg", "jpeg", "png", "webp", "gif"],
            UploadFolder::Videos => &["mp4", "mov", "webm", "mkv"],
            UploadFolder::Invoices | UploadFolder::Mou | UploadFolder::Receipts => &["pdf"],
            UploadFolder::Payments => &["jpg", "jpeg", "png", "webp", "pdf"],
            UploadFolder::Reports => &["xlsx"],
            UploadFolder::Profiles => &["jpg", "jpeg", "png", "webp"],
        }
    }
}

/// Reference to a file written by the store
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredFile {
    pub folder: UploadFolder,
    pub filename: String,
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    max_bytes: usize,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Creates the upload root and every typed folder
    pub async fn init(&self) -> Result<(), ServiceError> {
        for folder in UploadFolder::iter() {
            tokio::fs::create_dir_all(self.root.join(folder.as_ref())).await?;
        }
        info!(root = %self.root.display(), "Upload folders ready");
        Ok(())
    }

    /// Stores a client upload after checking its size and extension.
    pub async fn save(
        &self,
        folder: UploadFolder,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::ValidationError("Uploaded file is empty".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(ServiceError::ValidationError(format!(
                "File exceeds the maximum size of {} bytes",
                self.max_bytes
            )));
        }

        let (stem, extension) = split_name(original_name);
        let extension = extension.ok_or_else(|| {
            ServiceError::ValidationError("Uploaded file has no extension".into())
        })?;
        if !folder.allowed_extensions().contains(&extension.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "File type .{} is not allowed in {} (allowed: {})",
                extension,
                folder,
                folder.allowed_extensions().join(", ")
            )));
        }

        self.write(folder, &timestamped_name(&stem, &extension), bytes)
            .await
    }

    /// Stores a server-generated document or report. Extension checks do not apply.
    pub async fn write_generated(
        &self,
        folder: UploadFolder,
        prefix: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, ServiceError> {
        self.write(folder, &timestamped_name(prefix, extension), bytes)
            .await
    }

    async fn write(
        &self,
        folder: UploadFolder,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, ServiceError> {
        let dir = self.root.join(folder.as_ref());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(filename), bytes).await?;
        debug!(folder = %folder, filename, size = bytes.len(), "Stored file");

        Ok(StoredFile {
            folder,
            filename: filename.to_string(),
            url: public_url(folder, filename),
            size: bytes.len(),
            content_type: content_type_for(filename).to_string(),
        })
    }

    pub async fn read(&self, folder: UploadFolder, filename: &str) -> Result<Vec<u8>, ServiceError> {
        let path = self.path_of(folder, filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::NotFound(
                format!("File {}/{} not found", folder, filename),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a file; returns false when it did not exist.
    pub async fn delete(&self, folder: UploadFolder, filename: &str) -> Result<bool, ServiceError> {
        let path = self.path_of(folder, filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of a superseded or orphaned file
    pub async fn remove_quietly(&self, folder: UploadFolder, filename: Option<&str>) {
        if let Some(name) = filename {
            if let Err(e) = self.delete(folder, name).await {
                warn!(folder = %folder, filename = name, error = %e, "Failed to remove file");
            }
        }
    }

    fn path_of(&self, folder: UploadFolder, filename: &str) -> Result<PathBuf, ServiceError> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(ServiceError::BadRequest("Invalid file name".into()));
        }
        Ok(self.root.join(folder.as_ref()).join(filename))
    }
}

pub fn public_url(folder: UploadFolder, filename: &str) -> String {
    format!("{}/{}/{}", PUBLIC_PREFIX, folder, filename)
}

pub fn content_type_for(filename: &str) -> &'static str {
    match split_name(filename).1.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("pdf") => "application/pdf",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("html") => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Lowercase extension of a client file name, if any.
pub fn extension_of(name: &str) -> Option<String> {
    split_name(name).1
}

/// Splits a client file name into a sanitized stem and a lowercase extension.
fn split_name(name: &str) -> (String, Option<String>) {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (base, None),
    };
    (sanitize_stem(stem), extension)
}

fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let trimmed: String = cleaned
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(40)
        .collect();
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed
    }
}

fn timestamped_name(stem: &str, extension: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_ascii_lowercase();
    format!(
        "{}-{}-{}.{}",
        sanitize_stem(stem),
        Utc::now().format("%Y%m%d%H%M%S%3f"),
        suffix,
        extension
    )
}
