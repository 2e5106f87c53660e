use thiserror::Error;

use crate::quiz::parser::{ParserConfig, DEFAULT_CORRECT_LABEL};

const CORRECT_LABEL_VAR: &str = "QUIZ_CORRECT_LABEL";
const FILE_EXTENSION_VAR: &str = "QUIZ_FILE_EXTENSION";
const MAX_FILE_BYTES_VAR: &str = "QUIZ_MAX_FILE_BYTES";

const DEFAULT_FILE_EXTENSION: &str = ".txt";
const DEFAULT_MAX_FILE_BYTES: u32 = 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Bot settings taken from the environment (and `.env`, if present).
///
/// The Telegram token itself is read by `Bot::from_env` from `TELOXIDE_TOKEN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub parser: ParserConfig,
    /// Uploads whose name does not end with this are rejected.
    pub file_extension: String,
    pub max_file_bytes: u32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let correct_label = non_empty(CORRECT_LABEL_VAR, lookup(CORRECT_LABEL_VAR))?
            .unwrap_or_else(|| DEFAULT_CORRECT_LABEL.to_string());
        let file_extension = non_empty(FILE_EXTENSION_VAR, lookup(FILE_EXTENSION_VAR))?
            .unwrap_or_else(|| DEFAULT_FILE_EXTENSION.to_string());

        let max_file_bytes = match lookup(MAX_FILE_BYTES_VAR) {
            None => DEFAULT_MAX_FILE_BYTES,
            Some(value) => match value.trim().parse::<u32>() {
                Ok(bytes) if bytes > 0 => bytes,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: MAX_FILE_BYTES_VAR,
                        value,
                    })
                }
            },
        };

        Ok(Self {
            parser: ParserConfig { correct_label },
            file_extension,
            max_file_bytes,
        })
    }

    pub fn accepts_file_name(&self, file_name: &str) -> bool {
        file_name
            .to_lowercase()
            .ends_with(&self.file_extension.to_lowercase())
    }
}

fn non_empty(var: &'static str, value: Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigError::Empty(var)),
        other => Ok(other),
    }
}
