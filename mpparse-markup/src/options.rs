use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::MpParseResult;

/// Inline image (emoji) table: `[name]` in text resolves to `base_url + tokens[name]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmojiTable {
    pub base_url: String,
    pub tokens: HashMap<String, String>,
}

impl EmojiTable {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            tokens: HashMap::new(),
        }
    }

    /// Builder-style token registration.
    pub fn with_token(mut self, name: impl Into<String>, file: impl Into<String>) -> Self {
        self.tokens.insert(name.into(), file.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }
}

/// Parser settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseOptions {
    pub emoji: EmojiTable,
    /// Scheme prefixed to protocol-relative image sources (`//cdn/x.png`).
    pub protocol_relative_scheme: String,
    /// Drop whitespace-only text between tags.
    pub drop_whitespace_text: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            emoji: EmojiTable::default(),
            protocol_relative_scheme: "https:".to_string(),
            drop_whitespace_text: true,
        }
    }
}

impl ParseOptions {
    pub fn from_yaml(yaml: &str) -> MpParseResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> MpParseResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Resolve a protocol-relative URL; other URLs are returned as-is.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("//") {
            format!("{}{}", self.protocol_relative_scheme, url)
        } else {
            url.to_string()
        }
    }
}
