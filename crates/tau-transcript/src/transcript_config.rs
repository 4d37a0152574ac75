//! Transcript settings resolved from defaults and environment overrides.
use std::num::ParseIntError;

use thiserror::Error;

use crate::{transcript_hooks::TRANSCRIPT_HOOK_PRIORITY, DEFAULT_TRANSCRIPT_FILE_NAME};

pub const TRANSCRIPT_ENABLED_ENV: &str = "TAU_TRANSCRIPT_ENABLED";
pub const TRANSCRIPT_FILE_ENV: &str = "TAU_TRANSCRIPT_FILE";
pub const TRANSCRIPT_HOOK_PRIORITY_ENV: &str = "TAU_TRANSCRIPT_HOOK_PRIORITY";

/// Enumerates supported `TranscriptConfigError` values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptConfigError {
    #[error("unsupported {key} value '{value}' (expected 1|true|yes|on|0|false|no|off)")]
    InvalidFlag { key: &'static str, value: String },
    #[error("invalid TAU_TRANSCRIPT_HOOK_PRIORITY value '{value}': {source}")]
    InvalidPriority {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("transcript file name '{0}' must be a plain file name")]
    InvalidFileName(String),
}

/// Public struct `TranscriptConfig` used across Tau components.
///
/// # Examples
///
/// ```
/// use tau_transcript::TranscriptConfig;
///
/// let config = TranscriptConfig::from_lookup(|key| match key {
///     "TAU_TRANSCRIPT_FILE" => Some("history.jsonl".to_string()),
///     _ => None,
/// })
/// .expect("config");
///
/// assert!(config.enabled);
/// assert_eq!(config.file_name, "history.jsonl");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptConfig {
    pub enabled: bool,
    pub file_name: String,
    pub hook_priority: i32,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: DEFAULT_TRANSCRIPT_FILE_NAME.to_string(),
            hook_priority: TRANSCRIPT_HOOK_PRIORITY,
        }
    }
}

impl TranscriptConfig {
    /// Resolves the config from process environment variables.
    pub fn from_env() -> Result<Self, TranscriptConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the config from an arbitrary key lookup; blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TranscriptConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(raw) = read(TRANSCRIPT_ENABLED_ENV) {
            config.enabled = parse_flag(TRANSCRIPT_ENABLED_ENV, &raw)?;
        }
        if let Some(raw) = read(TRANSCRIPT_FILE_ENV) {
            validate_transcript_file_name(&raw)?;
            config.file_name = raw;
        }
        if let Some(raw) = read(TRANSCRIPT_HOOK_PRIORITY_ENV) {
            config.hook_priority = raw
                .parse::<i32>()
                .map_err(|source| TranscriptConfigError::InvalidPriority {
                    value: raw.clone(),
                    source,
                })?;
        }
        Ok(config)
    }
}

/// Rejects names that would place the transcript outside its session directory.
pub fn validate_transcript_file_name(name: &str) -> Result<(), TranscriptConfigError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(TranscriptConfigError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, TranscriptConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TranscriptConfigError::InvalidFlag {
            key,
            value: raw.to_string(),
        }),
    }
}
