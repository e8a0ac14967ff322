use thiserror::Error;

pub type MpParseResult<T> = Result<T, MpParseError>;

/// Failures that can leave the pipeline.
///
/// Malformed markup is not one of them: the parser degrades locally and
/// records a [`crate::Recovery`] instead. A cache miss is an `Option::None`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MpParseError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("YAML error: {0}")]
    YamlError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Navigation target is empty")]
    EmptyNavigationTarget,

    #[error("Host callback failed for <{tag}>: {message}")]
    HostCallbackFailure { tag: String, message: String },

    #[error("Unsupported source language '{0}'")]
    UnsupportedLanguage(String),
}

impl From<serde_yaml::Error> for MpParseError {
    fn from(err: serde_yaml::Error) -> Self {
        MpParseError::YamlError(err.to_string())
    }
}

impl From<std::io::Error> for MpParseError {
    fn from(err: std::io::Error) -> Self {
        MpParseError::Io(err.to_string())
    }
}
