use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Literal two-character escape for a newline. Splits text runs, never rendered.
pub const ESCAPED_NEWLINE: &str = "\\n";

/// Element attributes, excluding `class` and `style` which get dedicated fields.
pub type Attributes = BTreeMap<String, String>;

/// A unit of the normalized parse tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Node {
    Element(Element),
    Text(TextNode),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(e) => &e.children,
            Node::Text(_) => &[],
        }
    }
}

/// Element node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<TagType>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub class_list: Vec<String>,
    #[serde(default)]
    pub style_text: String,
    #[serde(default)]
    pub children: Vec<Node>,
    /// Position of this image in the owning document's `image_urls`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_index: Option<usize>,
    /// Root key of the instance that produced this image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            tag_type: TagType::classify(&tag),
            tag,
            attributes: Attributes::new(),
            class_list: Vec::new(),
            style_text: String::new(),
            children: Vec::new(),
            image_index: None,
            from: None,
        }
    }

    /// Closed dispatch key for the render rule table.
    pub fn kind(&self) -> Tag {
        Tag::from_name(&self.tag)
    }

    /// Attribute value or the empty string.
    pub fn attr(&self, name: &str) -> &str {
        self.attributes.get(name).map(String::as_str).unwrap_or("")
    }

    /// Attribute value when present and non-empty.
    pub fn attr_opt(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Space-joined class list.
    pub fn class_str(&self) -> String {
        self.class_list.join(" ")
    }
}

/// Text node: ordered runs of plain text and inline images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    /// Decoded text as it appeared in the source.
    pub text: String,
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TextRun {
    Plain {
        value: String,
    },
    #[serde(rename_all = "camelCase")]
    InlineImage {
        base_url: String,
        token: String,
    },
}

impl TextRun {
    pub fn plain(value: impl Into<String>) -> Self {
        TextRun::Plain {
            value: value.into(),
        }
    }

    /// True for the escaped-newline placeholder run.
    pub fn is_escaped_newline(&self) -> bool {
        matches!(self, TextRun::Plain { value } if value == ESCAPED_NEWLINE)
    }

    /// Source URL of an inline image run.
    pub fn image_src(&self) -> Option<String> {
        match self {
            TextRun::InlineImage { base_url, token } => Some(format!("{}{}", base_url, token)),
            TextRun::Plain { .. } => None,
        }
    }
}

/// Display classification used when a tag has no dedicated render rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagType {
    Block,
    Inline,
    CloseSelf,
}

const BLOCK_TAGS: &[&str] = &[
    "br", "a", "code", "address", "article", "applet", "aside", "audio", "blockquote", "button",
    "canvas", "center", "dd", "del", "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure",
    "footer", "form", "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr",
    "iframe", "ins", "isindex", "li", "map", "menu", "noframes", "noscript", "object", "ol",
    "output", "p", "pre", "section", "script", "table", "tbody", "td", "tfoot", "th", "thead",
    "tr", "ul", "video",
];

const INLINE_TAGS: &[&str] = &[
    "abbr", "acronym", "applet", "b", "basefont", "bdo", "big", "button", "cite", "del", "dfn",
    "em", "font", "i", "iframe", "img", "input", "ins", "kbd", "label", "map", "object", "q", "s",
    "samp", "script", "select", "small", "span", "strike", "strong", "sub", "sup", "textarea",
    "tt", "u", "var",
];

const CLOSE_SELF_TAGS: &[&str] = &[
    "colgroup", "dd", "dt", "li", "option", "p", "td", "tfoot", "th", "thead", "tr",
];

const VOID_TAGS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "frame", "hr", "img", "input", "isindex", "link",
    "meta", "param", "embed", "video",
];

impl TagType {
    /// Block wins over inline, inline over close-self. Unlisted tags get none.
    pub fn classify(tag: &str) -> Option<TagType> {
        if BLOCK_TAGS.contains(&tag) {
            Some(TagType::Block)
        } else if INLINE_TAGS.contains(&tag) {
            Some(TagType::Inline)
        } else if CLOSE_SELF_TAGS.contains(&tag) {
            Some(TagType::CloseSelf)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Block => "block",
            TagType::Inline => "inline",
            TagType::CloseSelf => "closeSelf",
        }
    }
}

/// Tags that never carry children.
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Tags implicitly closed when another of the same name opens.
pub fn is_close_self_tag(tag: &str) -> bool {
    CLOSE_SELF_TAGS.contains(&tag)
}

/// Tags with a dedicated render rule. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Button,
    Ol,
    Ul,
    Li,
    Video,
    Img,
    A,
    Table,
    Tr,
    Td,
    Audio,
    Br,
    Hr,
    Other,
}

impl Tag {
    pub fn from_name(name: &str) -> Tag {
        match name {
            "button" => Tag::Button,
            "ol" => Tag::Ol,
            "ul" => Tag::Ul,
            "li" => Tag::Li,
            "video" => Tag::Video,
            "img" => Tag::Img,
            "a" => Tag::A,
            "table" => Tag::Table,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "audio" => Tag::Audio,
            "br" => Tag::Br,
            "hr" => Tag::Hr,
            _ => Tag::Other,
        }
    }
}

/// Pre-order walk over a forest.
pub fn walk<'a>(nodes: &'a [Node], visit: &mut dyn FnMut(&'a Node)) {
    for node in nodes {
        visit(node);
        walk(node.children(), visit);
    }
}
