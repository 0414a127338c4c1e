//! PromptEnhancer port - LLM によるプロンプト強化
//!
//! 失敗しても task は止めない（runner 側で元のプロンプトに戻す）。

use async_trait::async_trait;

use crate::domain::RemoteError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhanceRequest {
    pub prompt: String,
    /// cinematic, anime, realistic, ...
    pub style: String,
    /// Language the enhanced prompt is written in.
    pub language: String,
}

#[async_trait]
pub trait PromptEnhancer: Send + Sync {
    /// Turn a short description into a detailed video prompt.
    async fn enhance(&self, request: &EnhanceRequest) -> Result<String, RemoteError>;

    /// Describe how a still image should move. `description` is optional
    /// context about the image.
    async fn motion_prompt(
        &self,
        description: Option<&str>,
        motion_type: &str,
    ) -> Result<String, RemoteError>;
}
