//! ArkPromptEnhancer - OpenAI 互換の chat/completions でプロンプトを書き直す

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::RemoteError;
use crate::impls::http;
use crate::ports::{EnhanceRequest, PromptEnhancer};

const TEMPERATURE: f32 = 0.7;
const ENHANCE_MAX_TOKENS: u32 = 200;
const MOTION_MAX_TOKENS: u32 = 100;

const MOTION_SYSTEM_PROMPT: &str = "\
You write motion prompts for image-to-video models: describe how the elements \
of a still image should move so the result looks natural.

Guidelines:
1. Prefer subtle, realistic movement that respects physics
2. Mention camera movement when it helps
3. Keep it to 20-50 words

Reply with the motion prompt only.";

pub struct ArkPromptEnhancer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

fn enhance_system_prompt(style: &str, language: &str) -> String {
    format!(
        "You write prompts for AI video generation models. Turn the user's short \
description into a detailed, effective video prompt.

Guidelines:
1. Be specific about camera movement (pan, zoom, tracking, static)
2. Describe the lighting
3. Describe how subjects move: speed and direction
4. Use a {style} visual style
5. Add quality keywords such as 4K or high resolution
6. Stay concise, ideally 50-100 words

Reply with the enhanced prompt only, written in {language}."
    )
}

fn enhance_user_prompt(prompt: &str) -> String {
    format!(
        "Rewrite this as a video generation prompt:\n\n\"{prompt}\"\n\n\
Focus on visual detail, camera work and motion. Reply with the prompt only."
    )
}

fn motion_user_prompt(description: Option<&str>, motion_type: &str) -> String {
    match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) => format!(
            "Write a {motion_type} motion prompt for this image:\n\n\"{description}\"\n\n\
Describe how its elements move and any camera motion."
        ),
        None => format!(
            "Write a {motion_type} motion prompt for animating a still image. \
Describe general, natural movement that suits most images."
        ),
    }
}

/// First choice's message, trimmed, with one pair of surrounding quotes removed.
pub(crate) fn completion_text(body: &Value) -> Result<String, RemoteError> {
    let text = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::Decode(format!("no completion text in response: {body}")))?
        .trim();

    let text = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
        .trim();

    if text.is_empty() {
        return Err(RemoteError::Decode("empty completion".to_string()));
    }
    Ok(text.to_string())
}

impl ArkPromptEnhancer {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, RemoteError> {
        let body = ChatBody {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens,
        };
        let builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        let response = http::authorize(builder, self.api_key.as_deref())
            .send()
            .await?;
        let answer = http::json_body(response).await?;
        if let Some(id) = answer.get("id").and_then(Value::as_str) {
            tracing::debug!(request_id = id, "chat completion finished");
        }
        completion_text(&answer)
    }
}

#[async_trait]
impl PromptEnhancer for ArkPromptEnhancer {
    async fn enhance(&self, request: &EnhanceRequest) -> Result<String, RemoteError> {
        self.complete(
            &enhance_system_prompt(&request.style, &request.language),
            &enhance_user_prompt(&request.prompt),
            ENHANCE_MAX_TOKENS,
        )
        .await
    }

    async fn motion_prompt(
        &self,
        description: Option<&str>,
        motion_type: &str,
    ) -> Result<String, RemoteError> {
        self.complete(
            MOTION_SYSTEM_PROMPT,
            &motion_user_prompt(description, motion_type),
            MOTION_MAX_TOKENS,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn answer(content: &str) -> Value {
        json!({"id": "req-1", "choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[rstest]
    #[case("  A slow dolly shot.  ", "A slow dolly shot.")]
    #[case("\"A slow dolly shot.\"", "A slow dolly shot.")]
    #[case("\"quoted\" start only", "\"quoted\" start only")]
    fn completion_is_trimmed_and_unquoted(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(completion_text(&answer(raw)).unwrap(), expected);
    }

    #[test]
    fn missing_or_empty_completion_is_decode_error() {
        assert!(matches!(
            completion_text(&json!({"choices": []})),
            Err(RemoteError::Decode(_))
        ));
        assert!(matches!(
            completion_text(&answer("  \"\"  ")),
            Err(RemoteError::Decode(_))
        ));
    }

    #[test]
    fn system_prompt_names_style_and_language() {
        let prompt = enhance_system_prompt("anime", "Japanese");
        assert!(prompt.contains("anime visual style"));
        assert!(prompt.contains("written in Japanese"));
    }

    #[test]
    fn motion_prompt_uses_description_when_present() {
        assert!(motion_user_prompt(Some("a lake"), "subtle").contains("\"a lake\""));
        let generic = motion_user_prompt(Some("  "), "natural");
        assert!(generic.contains("natural motion prompt for animating a still image"));
    }

    #[test]
    fn chat_body_shape() {
        let body = ChatBody {
            model: "llm",
            messages: [
                Message { role: "system", content: "s" },
                Message { role: "user", content: "u" },
            ],
            temperature: TEMPERATURE,
            max_tokens: ENHANCE_MAX_TOKENS,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["messages"][1], json!({"role": "user", "content": "u"}));
        assert_eq!(v["max_tokens"], 200);
    }
}
