//! UploadDir - アップロードされた素材（画像 / 動画）の置き場所
//!
//! ファイル名は `upload-<ULID>.<ext>` で、そのまま file_id として返す。
//! resolve は file_id をパースし直すので、`../` などのパスは入り込めない。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{UploadError, UploadId, UploadKind};
use crate::ports::IdGenerator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredUpload {
    pub file_id: String,
    pub file_path: PathBuf,
    pub file_type: UploadKind,
}

pub struct UploadDir {
    dir: PathBuf,
    ids: Arc<dyn IdGenerator>,
}

impl UploadDir {
    pub fn new(dir: impl Into<PathBuf>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            dir: dir.into(),
            ids,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_err(path: &Path, source: std::io::Error) -> UploadError {
        UploadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Store `bytes` under a fresh id. `original_name` only contributes its
    /// extension, which must be allowed for `kind`.
    pub async fn save(
        &self,
        kind: UploadKind,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        let ext = kind
            .accept(original_name)
            .ok_or_else(|| UploadError::DisallowedExtension {
                kind,
                allowed: kind.allowed_extensions().join(", "),
            })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::io_err(&self.dir, e))?;

        let file_id = format!("{}.{ext}", self.ids.generate_upload_id());
        let file_path = self.dir.join(&file_id);
        tokio::fs::write(&file_path, bytes)
            .await
            .map_err(|e| Self::io_err(&file_path, e))?;

        tracing::info!(file_id = %file_id, kind = %kind, bytes = bytes.len(), "upload stored");
        Ok(StoredUpload {
            file_id,
            file_path,
            file_type: kind,
        })
    }

    /// Path of a previously saved upload of `kind`.
    ///
    /// Only validates the id; whether the file still exists is for the reader
    /// to find out.
    pub fn resolve(&self, kind: UploadKind, file_id: &str) -> Result<PathBuf, UploadError> {
        let invalid = || UploadError::InvalidId(file_id.to_string());
        let (stem, ext) = file_id.rsplit_once('.').ok_or_else(invalid)?;
        stem.parse::<UploadId>().map_err(|_| invalid())?;
        if !kind.allowed_extensions().contains(&ext) {
            return Err(invalid());
        }
        Ok(self.dir.join(file_id))
    }
}
