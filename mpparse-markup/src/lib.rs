//! # mpparse markup
//!
//! Error-tolerant parser turning HTML-subset markup into a normalized tree of
//! element and text nodes, ready to be cached per rendering instance and
//! projected onto a host's primitive views.
//!
//! ## Features
//! - Tolerates missing end tags, stray end tags, unknown tags and bare `<`
//! - Void tags (`img`, `br`, `hr`, `video`, ...) never carry children
//! - Single-pass entity decoding (no double decode of `&amp;`)
//! - Text runs split into plain text, inline images (emoji) and escaped-newline boundaries
//! - Every `img` indexed in document order for preview galleries
//!
//! ## Example
//! ```ignore
//! use mpparse_markup::parse;
//!
//! let doc = parse(r#"<p>Hi <img src="/a.png"></p>"#, "page_1_root");
//! assert_eq!(doc.image_urls, vec!["/a.png".to_string()]);
//! ```

pub mod entities;
pub mod error;
pub mod node;
pub mod options;
pub mod parser;
pub mod text;

pub use entities::decode_entities;
pub use error::{MpParseError, MpParseResult};
pub use node::{Attributes, Element, Node, Tag, TagType, TextNode, TextRun};
pub use options::{EmojiTable, ParseOptions};
pub use parser::{ParsedDocument, Parser, Recovery};

/// Parse markup with default options.
pub fn parse(markup: &str, root_key: &str) -> ParsedDocument {
    parser::parse(markup, root_key)
}

/// Parse markup with custom options.
pub fn parse_with_options(markup: &str, root_key: &str, options: ParseOptions) -> ParsedDocument {
    Parser::new(options).parse(markup, root_key)
}
