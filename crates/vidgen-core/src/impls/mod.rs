//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **JsonFileTaskStore**: メモリ上の map + history.json
//! - **ArkVideoBackend**: Ark の動画生成タスク API
//! - **ArkPromptEnhancer**: Ark の chat/completions によるプロンプト強化
//! - **HttpArtifactStore**: 生成動画のダウンロードと保存
//! - **UploadDir**: アップロード素材の保存と file_id の解決

pub mod ark_chat;
pub mod ark_video;
pub mod http;
pub mod http_artifact;
pub mod json_store;
pub mod upload_dir;

pub use self::ark_chat::ArkPromptEnhancer;
pub use self::ark_video::ArkVideoBackend;
pub use self::http_artifact::HttpArtifactStore;
pub use self::json_store::JsonFileTaskStore;
pub use self::upload_dir::{StoredUpload, UploadDir};
