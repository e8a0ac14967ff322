//! # mpparse host
//!
//! Host-side runtime for parsed rich text: a per-page instance cache, the
//! recursive render engine projecting nodes onto primitive view descriptors,
//! image auto-layout, and tap dispatch to host navigation.
//!
//! ## Example
//! ```ignore
//! use std::sync::Arc;
//! use mpparse_host::{HostConfig, Language, NodeCache, PageScope};
//!
//! let page = PageScope::new("home", Arc::new(NodeCache::new()), Arc::new(HostConfig::default()));
//! let mut instance = page.mount();
//! instance.set_source("<ul><li>a</li></ul>", Language::Html);
//! let view = instance.render();
//! page.teardown();
//! ```

pub mod audio;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod highlight;
pub mod layout;
pub mod markdown;
pub mod page;
pub mod render;

pub use audio::{format_playback_time, AudioProps};
pub use cache::{InstanceRecord, NodeCache};
pub use config::{HostConfig, Language, Platform, Viewport, ViewportSource};
pub use dispatch::{
    DispatchOutcome, HostNavigator, InteractionDispatcher, LinkTapHandler, NavigationMode,
    OutboundNavigator, WebviewOutbound,
};
pub use highlight::{CodeHighlighter, SyntectHighlighter};
pub use layout::{available_width, compute_display_size, DisplaySize, ImageSizing};
pub use markdown::{CommonMarkConverter, MarkdownConverter};
pub use page::{PageScope, RichTextInstance};
pub use render::{RenderContext, RenderEngine, TapAction, ViewDescriptor};
