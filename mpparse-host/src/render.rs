//! Render engine: one recursive pass from cached nodes to host view descriptors.
//!
//! Dispatch goes through the closed [`Tag`] enum; unmapped tags fall back on
//! their `tagType`. Rendering is infallible: missing attributes read as empty
//! strings and an element with nothing to render becomes an empty container.

use mpparse_markup::{Element, Node, Tag, TagType, TextNode, TextRun};
use serde::{Deserialize, Serialize};

use crate::audio::AudioProps;
use crate::cache::NodeCache;
use crate::layout::ImageSizing;

/// Primitive-view shape produced for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum ViewDescriptor {
    Container(ContainerView),
    Text(TextView),
    Image(ImageView),
    Button(ButtonView),
    MediaPlayer(MediaView),
    Audio(AudioProps),
    Divider { class: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerView {
    pub class: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub style: String,
    /// Source tag, kept for styling on generic containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_tap: Option<TapAction>,
    #[serde(default)]
    pub children: Vec<ViewDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextView {
    pub value: String,
    pub selectable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    pub src: String,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub mode: String,
    pub lazy_load: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_tap: Option<TapAction>,
    /// Where the host reports the natural size once the image has loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_load: Option<LoadHook>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonView {
    pub class: String,
    pub children: Vec<ViewDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaView {
    pub src: String,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadHook {
    pub root_key: String,
    pub page_key: String,
    pub index: usize,
}

/// Interaction bound to a tappable view, resolved later by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TapAction {
    OpenLink {
        href: String,
        title: String,
    },
    #[serde(rename_all = "camelCase")]
    ImageTap {
        src: String,
        /// Root key of the instance that produced the image.
        from: Option<String>,
        index: Option<usize>,
        good_url: Option<String>,
    },
}

/// Per-pass render state.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub root_key: &'a str,
    pub page_key: &'a str,
    pub sizing: &'a ImageSizing,
}

/// Renders cached instances. Holds the cache explicitly; there is no ambient registry.
pub struct RenderEngine<'a> {
    cache: &'a NodeCache,
    class_prefix: String,
}

impl<'a> RenderEngine<'a> {
    pub fn new(cache: &'a NodeCache, class_prefix: impl Into<String>) -> Self {
        Self {
            cache,
            class_prefix: class_prefix.into(),
        }
    }

    /// Render the whole instance at `root_key`. `None` once the record is gone.
    pub fn render_instance(&self, root_key: &str, sizing: &ImageSizing) -> Option<ViewDescriptor> {
        let record = self.cache.get(root_key)?;
        let ctx = RenderContext {
            root_key,
            page_key: &record.page_key,
            sizing,
        };
        let children = record.tree.iter().map(|n| self.render(n, &ctx)).collect();
        Some(ViewDescriptor::Container(ContainerView {
            class: self.class("root"),
            children,
            ..ContainerView::default()
        }))
    }

    /// Render one node and its subtree.
    pub fn render(&self, node: &Node, ctx: &RenderContext<'_>) -> ViewDescriptor {
        match node {
            Node::Text(text) => self.render_text(text),
            Node::Element(el) => self.render_element(el, ctx),
        }
    }

    fn render_children(&self, el: &Element, ctx: &RenderContext<'_>) -> Vec<ViewDescriptor> {
        el.children.iter().map(|c| self.render(c, ctx)).collect()
    }

    fn class(&self, name: &str) -> String {
        format!("{}-{}", self.class_prefix, name)
    }

    /// Join prefixed structural classes with the element's own classes.
    fn classes(&self, names: &[&str], el: &Element) -> String {
        names
            .iter()
            .filter(|n| !n.is_empty())
            .map(|n| self.class(n))
            .chain(el.class_list.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn container(&self, class: String, el: &Element, children: Vec<ViewDescriptor>) -> ViewDescriptor {
        ViewDescriptor::Container(ContainerView {
            class,
            style: el.style_text.clone(),
            children,
            ..ContainerView::default()
        })
    }

    fn render_text(&self, text: &TextNode) -> ViewDescriptor {
        let children = text
            .runs
            .iter()
            .filter(|run| !run.is_escaped_newline())
            .map(|run| match run {
                TextRun::Plain { value } => ViewDescriptor::Text(TextView {
                    value: value.clone(),
                    selectable: true,
                }),
                TextRun::InlineImage { .. } => ViewDescriptor::Image(ImageView {
                    src: run.image_src().unwrap_or_default(),
                    class: self.class("emoji"),
                    width: None,
                    height: None,
                    mode: "aspectFit".to_string(),
                    lazy_load: false,
                    on_tap: None,
                    on_load: None,
                }),
            })
            .collect();
        ViewDescriptor::Container(ContainerView {
            class: self.class("inline"),
            children,
            ..ContainerView::default()
        })
    }

    fn render_element(&self, el: &Element, ctx: &RenderContext<'_>) -> ViewDescriptor {
        match el.kind() {
            Tag::Button => ViewDescriptor::Button(ButtonView {
                class: self.classes(&["button"], el),
                children: self.render_children(el, ctx),
            }),
            Tag::Ol => {
                let rows = el
                    .children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| {
                        let label = ViewDescriptor::Text(TextView {
                            value: format!("{}.", i + 1),
                            selectable: false,
                        });
                        ViewDescriptor::Container(ContainerView {
                            class: self.class("ol-row"),
                            children: vec![label, self.render(child, ctx)],
                            ..ContainerView::default()
                        })
                    })
                    .collect();
                self.container(self.classes(&["ol"], el), el, rows)
            }
            Tag::Ul => {
                let rows = el
                    .children
                    .iter()
                    .map(|child| {
                        let bullet = ViewDescriptor::Container(ContainerView {
                            class: self.class("li-circle"),
                            ..ContainerView::default()
                        });
                        ViewDescriptor::Container(ContainerView {
                            class: self.class("ul-row"),
                            children: vec![bullet, self.render(child, ctx)],
                            ..ContainerView::default()
                        })
                    })
                    .collect();
                self.container(self.classes(&["ul"], el), el, rows)
            }
            Tag::Li => self.container(self.classes(&["li"], el), el, self.render_children(el, ctx)),
            Tag::Video => {
                let player = ViewDescriptor::MediaPlayer(MediaView {
                    src: el.attr("src").to_string(),
                    class: self.classes(&["video-video"], el),
                });
                self.container(self.classes(&["video"], el), el, vec![player])
            }
            Tag::Img => self.render_image(el, ctx),
            Tag::A => ViewDescriptor::Container(ContainerView {
                class: self.classes(&["a"], el),
                style: el.style_text.clone(),
                on_tap: Some(TapAction::OpenLink {
                    href: el.attr("href").to_string(),
                    title: el.attr("title").to_string(),
                }),
                children: self.render_children(el, ctx),
                ..ContainerView::default()
            }),
            Tag::Table => {
                self.container(self.classes(&["table"], el), el, self.render_children(el, ctx))
            }
            Tag::Tr | Tag::Td => {
                let wrapper = format!("{}-container", el.tag);
                let cells = el
                    .children
                    .iter()
                    .map(|child| {
                        let (class, style) = match child {
                            Node::Element(c) => (self.classes(&[wrapper.as_str()], c), c.style_text.clone()),
                            Node::Text(_) => (self.class(wrapper.as_str()), String::new()),
                        };
                        ViewDescriptor::Container(ContainerView {
                            class,
                            style,
                            children: vec![self.render(child, ctx)],
                            ..ContainerView::default()
                        })
                    })
                    .collect();
                self.container(self.classes(&[el.tag.as_str()], el), el, cells)
            }
            Tag::Audio => {
                let audio = ViewDescriptor::Audio(AudioProps::from_element(el));
                self.container(self.classes(&["audio"], el), el, vec![audio])
            }
            Tag::Br => ViewDescriptor::Text(TextView {
                value: "\n".to_string(),
                selectable: false,
            }),
            Tag::Hr => ViewDescriptor::Divider {
                class: self.classes(&["hr"], el),
            },
            Tag::Other => self.render_fallback(el, ctx),
        }
    }

    fn render_image(&self, el: &Element, ctx: &RenderContext<'_>) -> ViewDescriptor {
        let auto = el.image_index.and_then(|i| ctx.sizing.get(i));
        let width = explicit_dimension(el, "width").or(auto.map(|s| s.width));
        let height = explicit_dimension(el, "height").or(auto.map(|s| s.height));

        let src = el.attr("src").to_string();
        let on_tap = TapAction::ImageTap {
            src: src.clone(),
            from: el.from.clone(),
            index: el.image_index,
            good_url: el.attr_opt("goodurl").map(str::to_string),
        };
        let on_load = el.image_index.map(|index| LoadHook {
            root_key: el.from.clone().unwrap_or_else(|| ctx.root_key.to_string()),
            page_key: ctx.page_key.to_string(),
            index,
        });

        ViewDescriptor::Image(ImageView {
            src,
            class: self.classes(&["img"], el),
            width,
            height,
            mode: "widthFix".to_string(),
            lazy_load: true,
            on_tap: Some(on_tap),
            on_load,
        })
    }

    fn render_fallback(&self, el: &Element, ctx: &RenderContext<'_>) -> ViewDescriptor {
        if el.tag.is_empty() {
            return ViewDescriptor::Container(ContainerView {
                class: self.class("empty"),
                ..ContainerView::default()
            });
        }
        let children = self.render_children(el, ctx);
        match el.tag_type {
            Some(TagType::Block) => {
                self.container(self.classes(&["block", el.tag.as_str()], el), el, children)
            }
            tag_type => {
                let type_name = tag_type.map(|t| t.as_str()).unwrap_or("");
                ViewDescriptor::Container(ContainerView {
                    class: self.classes(&[el.tag.as_str(), type_name], el),
                    style: el.style_text.clone(),
                    tag: Some(el.tag.clone()),
                    tag_type: tag_type.map(|t| t.as_str().to_string()),
                    on_tap: None,
                    children,
                })
            }
        }
    }
}

/// Explicit `width`/`height` attribute in px; anything unparsable is ignored.
fn explicit_dimension(el: &Element, name: &str) -> Option<f64> {
    let raw = el.attr_opt(name)?.trim();
    let raw = raw.strip_suffix("px").unwrap_or(raw).trim();
    raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InstanceRecord;
    use crate::layout::DisplaySize;
    use mpparse_markup::parse;
    use pretty_assertions::assert_eq;

    fn render_markup(markup: &str, sizing: &ImageSizing) -> ViewDescriptor {
        let cache = NodeCache::new();
        let doc = parse(markup, "root");
        cache.register(InstanceRecord::from_document("root", "page", doc));
        RenderEngine::new(&cache, "mp")
            .render_instance("root", sizing)
            .unwrap()
    }

    fn children(view: &ViewDescriptor) -> &[ViewDescriptor] {
        match view {
            ViewDescriptor::Container(c) => &c.children,
            ViewDescriptor::Button(b) => &b.children,
            other => panic!("Expected container, got {:?}", other),
        }
    }

    fn first(view: &ViewDescriptor) -> &ViewDescriptor {
        &children(view)[0]
    }

    #[test]
    fn test_evicted_instance_renders_nothing() {
        let cache = NodeCache::new();
        let engine = RenderEngine::new(&cache, "mp");
        assert!(engine.render_instance("gone", &ImageSizing::new()).is_none());
    }

    #[test]
    fn test_escaped_newline_renders_nothing() {
        let root = render_markup("<p>a\\nb</p>", &ImageSizing::new());
        let p = first(&root);
        let inline = first(p);
        let values: Vec<&str> = children(inline)
            .iter()
            .map(|v| match v {
                ViewDescriptor::Text(t) => t.value.as_str(),
                other => panic!("Expected text, got {:?}", other),
            })
            .collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_button_wraps_children() {
        let root = render_markup("<button>Go</button>", &ImageSizing::new());
        assert!(matches!(first(&root), ViewDescriptor::Button(b) if b.children.len() == 1));
    }

    #[test]
    fn test_br_and_hr() {
        let root = render_markup("<p>a<br>b</p><hr>", &ImageSizing::new());
        assert_eq!(
            children(first(&root))[1],
            ViewDescriptor::Text(TextView {
                value: "\n".to_string(),
                selectable: false
            })
        );
        assert!(matches!(children(&root)[1], ViewDescriptor::Divider { .. }));
    }

    #[test]
    fn test_video_media_player() {
        let root = render_markup(r#"<video src="/v.mp4"></video>"#, &ImageSizing::new());
        match first(first(&root)) {
            ViewDescriptor::MediaPlayer(m) => assert_eq!(m.src, "/v.mp4"),
            other => panic!("Expected media player, got {:?}", other),
        }
    }

    #[test]
    fn test_audio_props_passed() {
        let root = render_markup(
            r#"<audio src="/a.mp3" title="T" desc="D"></audio>"#,
            &ImageSizing::new(),
        );
        assert_eq!(
            first(first(&root)),
            &ViewDescriptor::Audio(AudioProps {
                src: "/a.mp3".to_string(),
                title: "T".to_string(),
                desc: "D".to_string()
            })
        );
    }

    #[test]
    fn test_link_carries_href_and_title() {
        let root = render_markup(r#"<a href="/x" title="X">go</a>"#, &ImageSizing::new());
        match first(&root) {
            ViewDescriptor::Container(c) => assert_eq!(
                c.on_tap,
                Some(TapAction::OpenLink {
                    href: "/x".to_string(),
                    title: "X".to_string()
                })
            ),
            other => panic!("Expected container, got {:?}", other),
        }
    }

    #[test]
    fn test_tr_cells_wrapped_individually() {
        let root = render_markup(
            r#"<table><tr><td class="c" style="color:red">1</td><td>2</td></tr></table>"#,
            &ImageSizing::new(),
        );
        let tr = first(first(&root));
        let cells = children(tr);
        assert_eq!(cells.len(), 2);
        match &cells[0] {
            ViewDescriptor::Container(c) => {
                assert_eq!(c.class, "mp-tr-container c");
                assert_eq!(c.style, "color:red");
            }
            other => panic!("Expected container, got {:?}", other),
        }
    }

    #[test]
    fn test_image_explicit_size_wins() {
        let mut sizing = ImageSizing::new();
        sizing.record(0, DisplaySize { width: 10.0, height: 20.0 });
        let root = render_markup(r#"<img src="/a.png" width="100px">"#, &sizing);
        match first(&root) {
            ViewDescriptor::Image(img) => {
                assert_eq!(img.width, Some(100.0));
                assert_eq!(img.height, Some(20.0));
                assert_eq!(
                    img.on_load,
                    Some(LoadHook {
                        root_key: "root".to_string(),
                        page_key: "page".to_string(),
                        index: 0
                    })
                );
            }
            other => panic!("Expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_block_fallback_and_inline_fallback() {
        let root = render_markup("<p>x</p><span>y</span>", &ImageSizing::new());
        match &children(&root)[0] {
            ViewDescriptor::Container(c) => {
                assert_eq!(c.class, "mp-block mp-p");
                assert_eq!(c.tag, None);
            }
            other => panic!("Expected container, got {:?}", other),
        }
        match &children(&root)[1] {
            ViewDescriptor::Container(c) => {
                assert_eq!(c.tag.as_deref(), Some("span"));
                assert_eq!(c.tag_type.as_deref(), Some("inline"));
                assert_eq!(c.class, "mp-span mp-inline");
            }
            other => panic!("Expected container, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_tag_renders_empty_container() {
        let engine_cache = NodeCache::new();
        let engine = RenderEngine::new(&engine_cache, "mp");
        let sizing = ImageSizing::new();
        let ctx = RenderContext {
            root_key: "r",
            page_key: "p",
            sizing: &sizing,
        };
        let mut el = Element::new("");
        el.children.push(Node::Element(Element::new("span")));
        let view = engine.render(&Node::Element(el), &ctx);
        assert_eq!(children(&view).len(), 0);
    }

    #[test]
    fn test_descriptor_serializes_with_view_tag() {
        let root = render_markup("<hr>", &ImageSizing::new());
        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["view"], "container");
        assert_eq!(json["children"][0]["view"], "divider");
    }
}
