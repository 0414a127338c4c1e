//! Shared reqwest helpers for the Ark adapters.

use crate::domain::RemoteError;

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

/// Build the client shared by every Ark adapter.
pub fn client(user_agent: &str) -> Result<reqwest::Client, RemoteError> {
    reqwest::Client::builder()
        .user_agent(user_agent.to_string())
        .build()
        .map_err(RemoteError::from)
}

/// Return the response unchanged on 2xx, otherwise an `Api` error carrying
/// the status and the body text.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(RemoteError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

pub async fn json_body(response: reqwest::Response) -> Result<serde_json::Value, RemoteError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
}

/// Attach the bearer token when one is configured.
pub fn authorize(builder: reqwest::RequestBuilder, api_key: Option<&str>) -> reqwest::RequestBuilder {
    match api_key {
        Some(key) => builder.bearer_auth(key),
        None => builder,
    }
}
