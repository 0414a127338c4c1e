//! HttpArtifactStore - 生成された動画を HTTP で取得してディスクに保存する
//!
//! 書き込みは `<name>.part` に流し込んでから rename する。
//! 途中で失敗しても最終パスに壊れたファイルは残らない。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::domain::{ArtifactError, RemoteError, TaskId};
use crate::impls::http;
use crate::ports::{ArtifactStore, StoredArtifact};

pub struct HttpArtifactStore {
    client: reqwest::Client,
    dir: PathBuf,
    timeout: Duration,
}

/// Pick the file extension from the content type, then the URL path.
pub fn classify_extension(content_type: Option<&str>, url: &str) -> &'static str {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.contains("webm") {
        return "webm";
    }
    if content_type.contains("mp4") {
        return "mp4";
    }

    let path = url.split(['?', '#']).next().unwrap_or_default().to_ascii_lowercase();
    if path.ends_with(".webm") {
        "webm"
    } else {
        "mp4"
    }
}

/// Move a finished `.part` file into place. The part file is removed when the
/// rename fails.
async fn promote_part(part: &Path, final_path: &Path) -> Result<(), ArtifactError> {
    if let Err(source) = tokio::fs::rename(part, final_path).await {
        let _ = tokio::fs::remove_file(part).await;
        return Err(ArtifactError::Io {
            path: final_path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

pub fn artifact_filename(task_id: TaskId, extension: &str) -> String {
    format!("video_{task_id}.{extension}")
}

impl HttpArtifactStore {
    pub fn new(client: reqwest::Client, dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            client,
            dir: dir.into(),
            timeout,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_err(path: &Path, source: std::io::Error) -> ArtifactError {
        ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    async fn write_stream(
        &self,
        response: reqwest::Response,
        part: &Path,
    ) -> Result<u64, ArtifactError> {
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| Self::io_err(part, e))?;
        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(RemoteError::from)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Self::io_err(part, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| Self::io_err(part, e))?;
        Ok(written)
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn fetch(&self, task_id: TaskId, url: &str) -> Result<StoredArtifact, ArtifactError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::io_err(&self.dir, e))?;

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(RemoteError::from)?;
        let response = http::ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let filename = artifact_filename(task_id, classify_extension(content_type, url));
        let final_path = self.dir.join(&filename);
        let part = self.dir.join(format!("{filename}.part"));

        let written = match self.write_stream(response, &part).await {
            Ok(written) => written,
            Err(err) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(err);
            }
        };
        promote_part(&part, &final_path).await?;

        tracing::info!(task_id = %task_id, path = %final_path.display(), bytes = written, "video saved");
        Ok(StoredArtifact {
            local_path: final_path,
            filename,
        })
    }
}
