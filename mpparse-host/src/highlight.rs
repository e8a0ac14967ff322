//! Code-block highlighting for Markdown input.

use std::sync::OnceLock;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Languages accepted as-is. Anything else is highlighted as the fallback language.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "javascript",
    "css",
    "xml",
    "sql",
    "typescript",
    "markdown",
    "c++",
    "c",
];

/// Turns source code into a markup fragment shaped `<code class="lang">…</code>`,
/// with line breaks as `<br/>` so the fragment survives markup parsing.
pub trait CodeHighlighter: Send + Sync {
    fn highlight(&self, code: &str, language: &str) -> String;
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

/// Map a supported language name to its syntect token.
fn syntect_token(language: &str) -> &str {
    match language {
        "javascript" => "js",
        "typescript" => "ts",
        "markdown" => "md",
        "c++" => "cpp",
        other => other,
    }
}

fn class_style() -> ClassStyle {
    ClassStyle::SpacedPrefixed { prefix: "hl-" }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// syntect-backed highlighter emitting `hl-`-prefixed classes.
#[derive(Debug, Clone)]
pub struct SyntectHighlighter {
    fallback: String,
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new("javascript")
    }
}

impl SyntectHighlighter {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    /// Normalized language name: lower-cased, `js`/`ts`/`md`/`cpp` aliases accepted,
    /// unsupported names replaced by the fallback.
    pub fn resolve_language(&self, language: &str) -> String {
        let lang = language.trim().to_ascii_lowercase();
        let lang = match lang.as_str() {
            "js" => "javascript".to_string(),
            "ts" => "typescript".to_string(),
            "md" => "markdown".to_string(),
            "cpp" => "c++".to_string(),
            "html" => "xml".to_string(),
            _ => lang,
        };
        if SUPPORTED_LANGUAGES.contains(&lang.as_str()) {
            lang
        } else {
            self.fallback.clone()
        }
    }

    fn highlight_body(&self, code: &str, language: &str) -> String {
        let ss = syntax_set();
        let syntax = ss
            .find_syntax_by_token(syntect_token(language))
            .unwrap_or_else(|| ss.find_syntax_plain_text());

        let mut html_gen = ClassedHTMLGenerator::new_with_class_style(syntax, ss, class_style());
        for line in LinesWithEndings::from(code) {
            if html_gen
                .parse_html_for_line_which_includes_newline(line)
                .is_err()
            {
                log::warn!("highlighting failed for {}, emitting plain text", language);
                return escape_html(code);
            }
        }
        html_gen.finalize()
    }
}

impl CodeHighlighter for SyntectHighlighter {
    fn highlight(&self, code: &str, language: &str) -> String {
        let language = self.resolve_language(language);
        let body = self.highlight_body(code, &language);
        let body = body.trim_end_matches('\n').replace('\n', "<br/>");
        format!("<code class=\"{}\">{}</code>", language, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_language() {
        let hl = SyntectHighlighter::default();
        assert_eq!(hl.resolve_language("JS"), "javascript");
        assert_eq!(hl.resolve_language("sql"), "sql");
        assert_eq!(hl.resolve_language("cpp"), "c++");
        assert_eq!(hl.resolve_language("cobol"), "javascript");
        assert_eq!(hl.resolve_language(""), "javascript");
    }

    #[test]
    fn test_output_shape() {
        let out = SyntectHighlighter::default().highlight("let a = 1;\nlet b = 2;\n", "js");
        assert!(out.starts_with("<code class=\"javascript\">"));
        assert!(out.ends_with("</code>"));
        assert!(out.contains("<br/>"));
        assert!(!out.contains('\n'));
    }

    #[test]
    fn test_unsupported_language_falls_back() {
        let out = SyntectHighlighter::new("css").highlight("a {}", "brainfuck");
        assert!(out.starts_with("<code class=\"css\">"));
    }

    #[test]
    fn test_markup_is_escaped() {
        let out = SyntectHighlighter::default().highlight("<b>x</b>", "xml");
        assert!(!out.contains("<b>"));
        assert!(out.contains("&lt;"));
    }
}
