//! Generation settings loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
pub const DEFAULT_VIDEO_MODEL: &str = "ep-20260206152338-7vwzw";
pub const DEFAULT_LLM_MODEL: &str = "ep-20260128152923-4g56t";
pub const DEFAULT_RATIO: &str = "16:9";
pub const DEFAULT_DURATION: u32 = 5;
pub const DEFAULT_WATERMARK: bool = false;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{var}={value:?} is invalid: {reason}")]
pub struct SettingsError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Everything the generation core needs to know about its environment.
///
/// | Env Var                        | Default                                    |
/// |--------------------------------|--------------------------------------------|
/// | `ARK_API_KEY`                  | unset                                      |
/// | `ARK_BASE_URL`                 | `https://ark.cn-beijing.volces.com/api/v3` |
/// | `VIDEO_ENDPOINT`               | `ep-20260206152338-7vwzw`                  |
/// | `LLM_ENDPOINT`                 | `ep-20260128152923-4g56t`                  |
/// | `VIDGEN_OUTPUT_DIR`            | `output`                                   |
/// | `VIDGEN_POLL_INTERVAL_SECS`    | `5`                                        |
/// | `VIDGEN_MAX_POLL_SECS`         | `600`                                      |
/// | `VIDGEN_DOWNLOAD_TIMEOUT_SECS` | `60`                                       |
/// | `VIDGEN_WORKERS`               | `4`                                        |
/// | `VIDGEN_QUEUE_CAPACITY`        | `64`                                       |
/// | `VIDGEN_PROMPT_STYLE`          | `cinematic`                                |
/// | `VIDGEN_PROMPT_LANGUAGE`       | `English`                                  |
/// | `VIDGEN_AUTO_MOTION_PROMPT`    | `false`                                    |
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub video_model: String,
    pub llm_model: String,
    pub output_dir: PathBuf,
    pub poll_interval: Duration,
    pub max_poll_time: Duration,
    pub download_timeout: Duration,
    pub workers: usize,
    pub queue_capacity: usize,
    pub prompt_style: String,
    pub prompt_language: String,
    /// Ask the LLM for a motion prompt when image2video has no text.
    pub auto_motion_prompt: bool,
}

impl Settings {
    /// Read from the process environment (after `dotenvy::dotenv()`).
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup function (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let workers: usize = parse_or(&lookup, "VIDGEN_WORKERS", 4)?;
        if workers == 0 {
            return Err(SettingsError {
                var: "VIDGEN_WORKERS",
                value: "0".to_string(),
                reason: "at least one worker is required".to_string(),
            });
        }
        let queue_capacity: usize = parse_or(&lookup, "VIDGEN_QUEUE_CAPACITY", 64)?;
        if queue_capacity == 0 {
            return Err(SettingsError {
                var: "VIDGEN_QUEUE_CAPACITY",
                value: "0".to_string(),
                reason: "queue capacity must be positive".to_string(),
            });
        }

        Ok(Self {
            api_key: lookup("ARK_API_KEY").filter(|k| !k.trim().is_empty()),
            base_url: string("ARK_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            video_model: string("VIDEO_ENDPOINT", DEFAULT_VIDEO_MODEL),
            llm_model: string("LLM_ENDPOINT", DEFAULT_LLM_MODEL),
            output_dir: PathBuf::from(string("VIDGEN_OUTPUT_DIR", "output")),
            poll_interval: Duration::from_secs(parse_or(&lookup, "VIDGEN_POLL_INTERVAL_SECS", 5)?),
            max_poll_time: Duration::from_secs(parse_or(&lookup, "VIDGEN_MAX_POLL_SECS", 600)?),
            download_timeout: Duration::from_secs(parse_or(
                &lookup,
                "VIDGEN_DOWNLOAD_TIMEOUT_SECS",
                60,
            )?),
            workers,
            queue_capacity,
            prompt_style: string("VIDGEN_PROMPT_STYLE", "cinematic"),
            prompt_language: string("VIDGEN_PROMPT_LANGUAGE", "English"),
            auto_motion_prompt: parse_or(&lookup, "VIDGEN_AUTO_MOTION_PROMPT", false)?,
        })
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.output_dir.join("videos")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.output_dir.join("uploads")
    }

    pub fn history_file(&self) -> PathBuf {
        self.output_dir.join("history.json")
    }
}

fn parse_or<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| SettingsError {
            var,
            reason: e.to_string(),
            value: v,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_match_documented_values() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.api_key, None);
        assert_eq!(s.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.poll_interval, Duration::from_secs(5));
        assert_eq!(s.max_poll_time, Duration::from_secs(600));
        assert_eq!(s.download_timeout, Duration::from_secs(60));
        assert_eq!(s.workers, 4);
        assert_eq!(s.prompt_style, "cinematic");
        assert!(!s.auto_motion_prompt);
        assert_eq!(s.history_file(), PathBuf::from("output/history.json"));
        assert_eq!(s.videos_dir(), PathBuf::from("output/videos"));
    }

    #[test]
    fn overrides_are_applied() {
        let s = settings(&[
            ("ARK_API_KEY", "secret"),
            ("ARK_BASE_URL", "http://localhost:9000/api/"),
            ("VIDGEN_MAX_POLL_SECS", "30"),
            ("VIDGEN_AUTO_MOTION_PROMPT", "true"),
            ("VIDGEN_OUTPUT_DIR", "/var/lib/vidgen"),
        ])
        .unwrap();
        assert_eq!(s.api_key.as_deref(), Some("secret"));
        assert_eq!(s.base_url, "http://localhost:9000/api");
        assert_eq!(s.max_poll_time, Duration::from_secs(30));
        assert!(s.auto_motion_prompt);
        assert_eq!(s.uploads_dir(), PathBuf::from("/var/lib/vidgen/uploads"));
    }

    #[test]
    fn malformed_number_is_reported() {
        let err = settings(&[("VIDGEN_POLL_INTERVAL_SECS", "soon")]).unwrap_err();
        assert_eq!(err.var, "VIDGEN_POLL_INTERVAL_SECS");
        assert_eq!(err.value, "soon");
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = settings(&[("VIDGEN_WORKERS", "0")]).unwrap_err();
        assert_eq!(err.var, "VIDGEN_WORKERS");
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let s = settings(&[("ARK_API_KEY", "   ")]).unwrap();
        assert_eq!(s.api_key, None);
    }
}
