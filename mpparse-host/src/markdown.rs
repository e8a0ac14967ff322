//! Markdown to HTML, run ahead of the markup parser when an instance's language is Markdown.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use std::sync::Arc;

use crate::highlight::{CodeHighlighter, SyntectHighlighter};

pub trait MarkdownConverter: Send + Sync {
    fn to_html(&self, markdown: &str) -> String;
}

/// CommonMark with tables and strikethrough. Fenced code blocks go through the highlighter.
#[derive(Clone)]
pub struct CommonMarkConverter {
    highlighter: Arc<dyn CodeHighlighter>,
}

impl Default for CommonMarkConverter {
    fn default() -> Self {
        Self::new(Arc::new(SyntectHighlighter::default()))
    }
}

impl CommonMarkConverter {
    pub fn new(highlighter: Arc<dyn CodeHighlighter>) -> Self {
        Self { highlighter }
    }
}

impl MarkdownConverter for CommonMarkConverter {
    fn to_html(&self, markdown: &str) -> String {
        let mut opts = Options::empty();
        opts.insert(Options::ENABLE_TABLES);
        opts.insert(Options::ENABLE_STRIKETHROUGH);

        let mut events = Vec::new();
        let mut code: Option<(String, String)> = None;

        for event in Parser::new_ext(markdown, opts) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => {
                            info.split_whitespace().next().unwrap_or("").to_string()
                        }
                        CodeBlockKind::Indented => String::new(),
                    };
                    code = Some((lang, String::new()));
                }
                Event::Text(text) if code.is_some() => {
                    if let Some((_, body)) = code.as_mut() {
                        body.push_str(&text);
                    }
                }
                Event::End(Tag::CodeBlock(_)) => {
                    if let Some((lang, body)) = code.take() {
                        let highlighted = self.highlighter.highlight(&body, &lang);
                        events.push(Event::Html(format!("<pre>{}</pre>", highlighted).into()));
                    }
                }
                other => events.push(other),
            }
        }

        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, events.into_iter());
        html.replace("javascript:", "")
    }
}
