use serde::{Deserialize, Serialize};

use crate::entities::decode_entities;
use crate::node::*;
use crate::options::ParseOptions;
use crate::text::segment_text;

/// Elements whose raw content is skipped up to the matching end tag.
/// `script` and `style` are dropped entirely; `video` keeps the element but not its content.
const RAW_CONTENT_TAGS: &[&str] = &["script", "style", "video"];

/// `font size="1".."7"` keyword scale.
const FONT_SIZES: &[&str] = &[
    "x-small",
    "small",
    "medium",
    "large",
    "x-large",
    "xx-large",
    "-webkit-xxx-large",
];

/// Output of one parse: the forest plus the metadata cached per instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDocument {
    pub nodes: Vec<Node>,
    /// Resolved `src` of every indexed `img`, in document order.
    pub image_urls: Vec<String>,
    pub view_padding: f64,
    /// Local repairs made while building the tree.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recoveries: Vec<Recovery>,
}

impl ParsedDocument {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in the forest.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        walk(&self.nodes, &mut |_| count += 1);
        count
    }
}

/// A malformed fragment and how it was repaired. Never surfaced as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Recovery {
    /// End tag with no matching open element; ignored.
    StrayEndTag { tag: String, offset: usize },
    /// Element still open when its parent closed or input ended; closed implicitly.
    UnclosedElement { tag: String },
    /// `<` that does not start a tag; kept as text.
    LiteralAngleBracket { offset: usize },
    /// Tag with no closing `>`; the rest of the input became a text node.
    UnterminatedTag { offset: usize },
}

/// Error-tolerant markup parser.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: ParseOptions,
}

impl Parser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse markup into a normalized tree. Images are stamped with `root_key`.
    pub fn parse(&self, markup: &str, root_key: &str) -> ParsedDocument {
        let mut builder = TreeBuilder::new(&self.options, root_key);
        builder.run(markup);
        let doc = builder.finish();
        if !doc.recoveries.is_empty() {
            log::debug!(
                "parsed {} with {} recoveries: {:?}",
                root_key,
                doc.recoveries.len(),
                doc.recoveries
            );
        }
        doc
    }
}

/// Parse with default options.
pub fn parse(markup: &str, root_key: &str) -> ParsedDocument {
    Parser::default().parse(markup, root_key)
}

// ─── Tree construction ──────────────────────────────────────────────────────

struct TreeBuilder<'a> {
    options: &'a ParseOptions,
    root_key: &'a str,
    roots: Vec<Node>,
    stack: Vec<Element>,
    pending_text: String,
    image_urls: Vec<String>,
    recoveries: Vec<Recovery>,
}

impl<'a> TreeBuilder<'a> {
    fn new(options: &'a ParseOptions, root_key: &'a str) -> Self {
        Self {
            options,
            root_key,
            roots: Vec::new(),
            stack: Vec::new(),
            pending_text: String::new(),
            image_urls: Vec::new(),
            recoveries: Vec::new(),
        }
    }

    fn run(&mut self, input: &str) {
        let bytes = input.as_bytes();
        let mut idx = 0_usize;

        while idx < bytes.len() {
            if bytes[idx] != b'<' {
                let next = find_byte(bytes, idx, b'<').unwrap_or(bytes.len());
                self.pending_text.push_str(&input[idx..next]);
                idx = next;
                continue;
            }

            if starts_with(bytes, idx, b"<!--") {
                idx = skip_comment(bytes, idx);
                continue;
            }

            if starts_with(bytes, idx, b"<!") || starts_with(bytes, idx, b"<?") {
                idx = skip_to_gt(bytes, idx.saturating_add(2));
                continue;
            }

            match parse_tag(input, idx) {
                TagScan::Tag(tag, next_idx) => {
                    let inline_gap = !tag.is_end
                        && TagType::classify(&tag.name) == Some(TagType::Inline)
                        && self.last_child_is_inline();
                    self.flush_text_keeping_gap(inline_gap);
                    if tag.is_end {
                        self.close(&tag.name, idx);
                        idx = next_idx;
                    } else if RAW_CONTENT_TAGS.contains(&tag.name.as_str()) {
                        let after = if tag.self_closing {
                            next_idx
                        } else {
                            skip_raw_content(input, next_idx, &tag.name)
                        };
                        if tag.name == "video" {
                            self.open(tag);
                        }
                        idx = after;
                    } else {
                        self.open(tag);
                        idx = next_idx;
                    }
                }
                TagScan::NotATag => {
                    self.recoveries.push(Recovery::LiteralAngleBracket { offset: idx });
                    self.pending_text.push('<');
                    idx = idx.saturating_add(1);
                }
                TagScan::Unterminated => {
                    self.flush_text();
                    self.recoveries.push(Recovery::UnterminatedTag { offset: idx });
                    let raw = &input[idx..];
                    self.append(Node::Text(TextNode {
                        text: raw.to_string(),
                        runs: vec![TextRun::plain(raw)],
                    }));
                    idx = bytes.len();
                }
            }
        }
        self.flush_text();
    }

    fn finish(mut self) -> ParsedDocument {
        while let Some(open) = self.stack.last() {
            self.recoveries.push(Recovery::UnclosedElement {
                tag: open.tag.clone(),
            });
            self.close_top();
        }
        ParsedDocument {
            nodes: self.roots,
            image_urls: self.image_urls,
            view_padding: 0.0,
            recoveries: self.recoveries,
        }
    }

    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn last_child_is_inline(&self) -> bool {
        let siblings = match self.stack.last() {
            Some(parent) => &parent.children,
            None => &self.roots,
        };
        matches!(
            siblings.last(),
            Some(Node::Element(e)) if e.tag_type == Some(TagType::Inline)
        )
    }

    fn close_top(&mut self) {
        if let Some(element) = self.stack.pop() {
            self.append(Node::Element(element));
        }
    }

    fn open(&mut self, tag: ParsedTag) {
        if is_close_self_tag(&tag.name)
            && self.stack.last().map(|e| e.tag.as_str()) == Some(tag.name.as_str())
        {
            self.close_top();
        }

        let void = is_void_tag(&tag.name);
        let self_closing = tag.self_closing;
        let element = self.build_element(tag);
        if void || self_closing {
            self.append(Node::Element(element));
        } else {
            self.stack.push(element);
        }
    }

    fn close(&mut self, name: &str, offset: usize) {
        match self.stack.iter().rposition(|e| e.tag == name) {
            Some(pos) => {
                while self.stack.len() > pos + 1 {
                    if let Some(inner) = self.stack.last() {
                        self.recoveries.push(Recovery::UnclosedElement {
                            tag: inner.tag.clone(),
                        });
                    }
                    self.close_top();
                }
                self.close_top();
            }
            // `</br>`, `</img>`, `</video>` close nothing
            None if is_void_tag(name) => {}
            None => self.recoveries.push(Recovery::StrayEndTag {
                tag: name.to_string(),
                offset,
            }),
        }
    }

    fn flush_text(&mut self) {
        self.flush_text_keeping_gap(false);
    }

    /// With `inline_gap`, whitespace between two inline siblings survives as one space.
    fn flush_text_keeping_gap(&mut self, inline_gap: bool) {
        if self.pending_text.is_empty() {
            return;
        }
        let mut raw = std::mem::take(&mut self.pending_text);
        if self.options.drop_whitespace_text && raw.trim().is_empty() {
            if !inline_gap {
                return;
            }
            raw = " ".to_string();
        }
        let text = decode_entities(&collapse_newlines(&raw));
        let runs = segment_text(&text, &self.options.emoji);
        self.append(Node::Text(TextNode { text, runs }));
    }

    fn build_element(&mut self, tag: ParsedTag) -> Element {
        let mut element = Element::new(tag.name);
        for (name, value) in tag.attributes {
            match name.as_str() {
                "class" => {
                    element.class_list = value.split_whitespace().map(str::to_string).collect();
                }
                "style" => element.style_text = value,
                _ => {
                    element.attributes.entry(name).or_insert(value);
                }
            }
        }

        match element.kind() {
            Tag::Img => self.index_image(&mut element),
            Tag::Other if element.tag == "font" => fold_font_attributes(&mut element),
            _ => {}
        }
        element
    }

    fn index_image(&mut self, element: &mut Element) {
        element.from = Some(self.root_key.to_string());
        let Some(src) = element.attr_opt("src") else {
            return;
        };
        let resolved = self.options.resolve_url(src);
        element.attributes.insert("src".to_string(), resolved.clone());
        element.image_index = Some(self.image_urls.len());
        self.image_urls.push(resolved);
    }
}

fn fold_font_attributes(element: &mut Element) {
    let mut style = String::new();
    if let Some(color) = element.attributes.remove("color") {
        style.push_str(&format!("color:{};", color));
    }
    if let Some(face) = element.attributes.remove("face") {
        style.push_str(&format!("font-family:{};", face));
    }
    if let Some(size) = element.attributes.remove("size") {
        let keyword = size
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| FONT_SIZES.get(i).copied())
            .unwrap_or(size.as_str());
        style.push_str(&format!("font-size:{};", keyword));
    }
    style.push_str(&element.style_text);
    element.style_text = style;
}

/// Newline runs (with surrounding indentation) collapse to a single space.
fn collapse_newlines(text: &str) -> String {
    if !text.contains('\n') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut lines = text.split('\n').peekable();
    let mut first = true;
    while let Some(line) = lines.next() {
        let line = line.trim_end_matches('\r');
        let piece = match (first, lines.peek().is_some()) {
            (true, true) => line.trim_end(),
            (true, false) => line,
            (false, true) => line.trim(),
            (false, false) => line.trim_start(),
        };
        if !first && !out.is_empty() && !piece.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
        out.push_str(piece);
        first = false;
    }
    out
}

// ─── Tag scanning ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedTag {
    name: String,
    is_end: bool,
    self_closing: bool,
    attributes: Vec<(String, String)>,
}

enum TagScan {
    Tag(ParsedTag, usize),
    NotATag,
    Unterminated,
}

fn parse_tag(input: &str, start: usize) -> TagScan {
    let bytes = input.as_bytes();
    let mut idx = start.saturating_add(1);
    let mut is_end = false;
    if bytes.get(idx).copied() == Some(b'/') {
        is_end = true;
        idx = idx.saturating_add(1);
    }

    if !bytes.get(idx).is_some_and(|b| b.is_ascii_alphabetic()) {
        return TagScan::NotATag;
    }

    let name_start = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    let name = input[name_start..idx].to_ascii_lowercase();
    let attrs_start = idx;

    // Quotes only open right after `=`; a `/` inside an unquoted value is not self-closing.
    let mut quote: Option<u8> = None;
    let mut after_eq = false;
    let mut in_bare_value = false;
    let mut self_closing = false;
    while idx < bytes.len() {
        let byte = bytes[idx];
        if let Some(q) = quote {
            if byte == q {
                quote = None;
            }
            idx = idx.saturating_add(1);
            continue;
        }
        match byte {
            b'>' => {
                let attributes = if is_end {
                    Vec::new()
                } else {
                    parse_attributes(&input[attrs_start..idx])
                };
                return TagScan::Tag(
                    ParsedTag {
                        name,
                        is_end,
                        self_closing,
                        attributes,
                    },
                    idx.saturating_add(1),
                );
            }
            b'"' | b'\'' if after_eq => {
                quote = Some(byte);
                after_eq = false;
                self_closing = false;
            }
            b'=' => {
                after_eq = true;
                in_bare_value = false;
                self_closing = false;
            }
            b'/' if !in_bare_value && !after_eq => self_closing = true,
            b if b.is_ascii_whitespace() => in_bare_value = false,
            _ => {
                if after_eq {
                    in_bare_value = true;
                }
                after_eq = false;
                self_closing = false;
            }
        }
        idx = idx.saturating_add(1);
    }

    TagScan::Unterminated
}

fn parse_attributes(source: &str) -> Vec<(String, String)> {
    let bytes = source.as_bytes();
    let mut attrs = Vec::new();
    let mut idx = 0;

    while idx < bytes.len() {
        idx = skip_spaces(bytes, idx);
        if idx >= bytes.len() {
            break;
        }
        if bytes[idx] == b'/' || bytes[idx] == b'=' {
            idx += 1;
            continue;
        }

        let name_start = idx;
        while idx < bytes.len()
            && !bytes[idx].is_ascii_whitespace()
            && !matches!(bytes[idx], b'=' | b'/' | b'"' | b'\'')
        {
            idx += 1;
        }
        if idx == name_start {
            // stray quote
            idx += 1;
            continue;
        }
        let name = source[name_start..idx].to_ascii_lowercase();

        let after_name = skip_spaces(bytes, idx);
        if bytes.get(after_name).copied() != Some(b'=') {
            attrs.push((name, String::new()));
            idx = after_name;
            continue;
        }

        idx = skip_spaces(bytes, after_name + 1);
        let value = match bytes.get(idx).copied() {
            Some(q @ (b'"' | b'\'')) => {
                let value_start = idx + 1;
                let value_end = find_byte(bytes, value_start, q).unwrap_or(bytes.len());
                idx = (value_end + 1).min(bytes.len());
                &source[value_start..value_end]
            }
            _ => {
                let value_start = idx;
                while idx < bytes.len() && !bytes[idx].is_ascii_whitespace() {
                    idx += 1;
                }
                &source[value_start..idx]
            }
        };
        attrs.push((name, decode_entities(value)));
    }

    attrs
}

/// Returns the index just past `</tag_name>`, or the end of input.
fn skip_raw_content(input: &str, start: usize, tag_name: &str) -> usize {
    let bytes = input.as_bytes();
    let tag_bytes = tag_name.as_bytes();
    let mut idx = start;

    while idx < bytes.len() {
        if bytes[idx] == b'<'
            && bytes.get(idx.saturating_add(1)).copied() == Some(b'/')
            && starts_with_ignore_ascii_case(bytes, idx.saturating_add(2), tag_bytes)
            && tag_name_boundary(bytes, idx.saturating_add(2 + tag_bytes.len()))
        {
            return skip_to_gt(bytes, idx);
        }
        idx = idx.saturating_add(1);
    }

    bytes.len()
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    find_subslice(bytes, start.saturating_add(4), b"-->")
        .map(|end| end.saturating_add(3))
        .unwrap_or(bytes.len())
}

fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx.saturating_add(1);
        }
        idx = idx.saturating_add(1);
    }
    bytes.len()
}

fn tag_name_boundary(bytes: &[u8], idx: usize) -> bool {
    match bytes.get(idx).copied() {
        None => true,
        Some(byte) => byte.is_ascii_whitespace() || byte == b'>' || byte == b'/',
    }
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_tag_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && bytes[idx..end] == *pattern
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    if end > bytes.len() {
        return false;
    }
    bytes[idx..end]
        .iter()
        .zip(pattern.iter())
        .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .iter()
        .position(|candidate| *candidate == byte)
        .map(|offset| from + offset)
}
