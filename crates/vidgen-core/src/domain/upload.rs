//! Upload kinds and their allowed file extensions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
pub const ALLOWED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Image,
    Video,
}

impl UploadKind {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Image => ALLOWED_IMAGE_EXTENSIONS,
            UploadKind::Video => ALLOWED_VIDEO_EXTENSIONS,
        }
    }

    /// Lowercased extension of `filename` if this kind accepts it.
    pub fn accept(self, filename: &str) -> Option<String> {
        let (_, ext) = filename.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        self.allowed_extensions()
            .contains(&ext.as_str())
            .then_some(ext)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UploadKind::Image => "image",
            UploadKind::Video => "video",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown upload type {0:?} (expected image or video)")]
pub struct UnknownUploadKind(pub String);

impl FromStr for UploadKind {
    type Err = UnknownUploadKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(UploadKind::Image),
            "video" => Ok(UploadKind::Video),
            other => Err(UnknownUploadKind(other.to_string())),
        }
    }
}
