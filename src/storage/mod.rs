//! Filesystem storage for request attachments.
//!
//! Database rows hold metadata only; bytes live on disk under a
//! collision-proof name. Validation runs before any byte is written so a
//! bad file never leaves a partial batch behind.

use std::path::PathBuf;

use rand::Rng;

use crate::errors::AppError;

pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx"];
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Lowercased extension of a file name, if it has one.
pub fn extension_of(file_name: &str) -> Option<String> {
    file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Reject disallowed types and oversized payloads. A file without an
/// extension fails the type check.
pub fn validate_file(file_name: &str, size: usize) -> Result<(), AppError> {
    match extension_of(file_name) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => return Err(AppError::Validation(format!("file type not allowed: {file_name}"))),
    }
    if size > MAX_FILE_SIZE {
        return Err(AppError::Validation(format!("file exceeds 10 MB limit: {file_name}")));
    }
    Ok(())
}

/// Strip path components and oddball characters from a client-supplied
/// file name. The result is only ever used as the tail of a stored name.
fn sanitize(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug)]
pub struct StoredFile {
    pub stored_name: String,
    pub path: String,
    pub size: i64,
}

/// Root directory for uploads. Cheap to clone; handlers receive it via
/// app data.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn init(&self) -> Result<(), std::io::Error> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Persist one file under a random-prefixed name derived from the
    /// original.
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<StoredFile, AppError> {
        let mut rng = rand::rng();
        let prefix: [u8; 8] = rng.random();
        let stored_name = format!("{}_{}", hex::encode(prefix), sanitize(file_name));
        let path = self.root.join(&stored_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Dependency(format!("failed to store file {file_name}: {e}")))?;
        Ok(StoredFile {
            stored_name,
            path: path.to_string_lossy().into_owned(),
            size: bytes.len() as i64,
        })
    }

    /// Best-effort removal. Returns false when the file could not be
    /// removed; callers log and move on.
    pub async fn remove(&self, stored_name: &str) -> bool {
        tokio::fs::remove_file(self.root.join(stored_name)).await.is_ok()
    }

    pub fn path_of(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }
}
