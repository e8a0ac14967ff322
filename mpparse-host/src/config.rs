use mpparse_markup::{MpParseError, MpParseResult, ParseOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Host platform flag reported alongside the viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Mini-program style host: screens are pushed by route, outbound URLs open in a webview page.
    #[default]
    MiniProgram,
    /// Browser host with a native top-level location.
    Web,
}

/// Current viewport metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f64,
    pub platform: Platform,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 375.0,
            platform: Platform::MiniProgram,
        }
    }
}

/// Host viewport query.
pub trait ViewportSource {
    fn viewport(&self) -> Viewport;
}

impl ViewportSource for Viewport {
    fn viewport(&self) -> Viewport {
        *self
    }
}

/// Source language of a rich-text instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Html,
    Markdown,
}

impl FromStr for Language {
    type Err = MpParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "" => Ok(Language::Html),
            "markdown" | "md" => Ok(Language::Markdown),
            other => Err(MpParseError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl Language {
    /// `markdown` and `md` select Markdown; anything else is HTML.
    pub fn from_flag(flag: &str) -> Language {
        flag.parse().unwrap_or_else(|e| {
            log::debug!("{}, using html", e);
            Language::Html
        })
    }
}

/// Host runtime configuration. Every field has a default, so an empty YAML document is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostConfig {
    pub viewport: Viewport,
    pub parse: ParseOptions,
    /// Link prefixes handed to outbound navigation; everything else is an in-host path.
    pub external_schemes: Vec<String>,
    /// Webview page used to open outbound URLs on mini-program hosts.
    pub outside_route: String,
    pub default_language: Language,
    /// Language used by the highlighter for unsupported or missing language tags.
    pub highlight_fallback: String,
    /// Fraction of the viewport width images may occupy.
    pub image_max_width_ratio: f64,
    pub class_prefix: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            parse: ParseOptions::default(),
            external_schemes: vec!["http://".to_string(), "https://".to_string()],
            outside_route: "/pages/webview/outside".to_string(),
            default_language: Language::Html,
            highlight_fallback: "javascript".to_string(),
            image_max_width_ratio: 1.0,
            class_prefix: "mp".to_string(),
        }
    }
}

impl HostConfig {
    pub fn from_yaml(yaml: &str) -> MpParseResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> MpParseResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// True when `href` starts with one of the configured external schemes.
    pub fn is_external(&self, href: &str) -> bool {
        has_external_scheme(href, &self.external_schemes)
    }
}

/// Case-insensitive prefix match of `href` against `schemes`.
pub fn has_external_scheme(href: &str, schemes: &[String]) -> bool {
    let href = href.trim_start();
    schemes.iter().any(|scheme| {
        href.len() >= scheme.len()
            && href.is_char_boundary(scheme.len())
            && href[..scheme.len()].eq_ignore_ascii_case(scheme)
    })
}
