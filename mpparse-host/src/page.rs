//! Page and instance lifecycle.
//!
//! A [`PageScope`] owns its page key and evicts every instance it mounted on
//! [`PageScope::teardown`]. A [`RichTextInstance`] is one mounted piece of
//! markup: it parses into the shared cache, renders from it, and stops
//! rendering once its record has been evicted.

use mpparse_markup::{MpParseError, Parser};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{InstanceRecord, NodeCache};
use crate::config::{HostConfig, Language, ViewportSource};
use crate::dispatch::{
    DispatchOutcome, HostNavigator, InteractionDispatcher, LinkTapHandler, OutboundNavigator,
};
use crate::highlight::SyntectHighlighter;
use crate::layout::{available_width, compute_display_size, DisplaySize, ImageSizing};
use crate::markdown::{CommonMarkConverter, MarkdownConverter};
use crate::render::{RenderEngine, TapAction, ViewDescriptor};

/// Page key for a host page id.
pub fn page_key_for(page_id: &str) -> String {
    format!("mpparse_{}", page_id)
}

pub struct PageScope {
    page_key: String,
    cache: Arc<NodeCache>,
    config: Arc<HostConfig>,
    link_handler: Option<Arc<dyn LinkTapHandler>>,
    markdown: Arc<dyn MarkdownConverter>,
    torn_down: Arc<AtomicBool>,
}

impl PageScope {
    pub fn new(page_id: &str, cache: Arc<NodeCache>, config: Arc<HostConfig>) -> Self {
        let highlighter = Arc::new(SyntectHighlighter::new(config.highlight_fallback.clone()));
        Self {
            page_key: page_key_for(page_id),
            cache,
            config,
            link_handler: None,
            markdown: Arc::new(CommonMarkConverter::new(highlighter)),
            torn_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register the page's own link-tap override.
    pub fn with_link_handler(mut self, handler: Arc<dyn LinkTapHandler>) -> Self {
        self.link_handler = Some(handler);
        self
    }

    pub fn with_markdown_converter(mut self, converter: Arc<dyn MarkdownConverter>) -> Self {
        self.markdown = converter;
        self
    }

    pub fn page_key(&self) -> &str {
        &self.page_key
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Create an instance with a fresh root key under this page.
    pub fn mount(&self) -> RichTextInstance {
        let root_key = format!("{}_{}", self.page_key, Uuid::new_v4().simple());
        RichTextInstance {
            root_key,
            explicit_root_key: None,
            page_key: self.page_key.clone(),
            cache: Arc::clone(&self.cache),
            config: Arc::clone(&self.config),
            link_handler: self.link_handler.clone(),
            markdown: Arc::clone(&self.markdown),
            parser: Parser::new(self.config.parse.clone()),
            sizing: ImageSizing::new(),
            source: None,
            torn_down: Arc::clone(&self.torn_down),
        }
    }

    /// Like [`mount`](Self::mount), with an explicit root key used to resolve image galleries
    /// for images that carry no owner marker.
    pub fn mount_with_root_key(&self, root_key: impl Into<String>) -> RichTextInstance {
        let mut instance = self.mount();
        instance.explicit_root_key = Some(root_key.into());
        instance
    }

    /// Evict every instance mounted under this page. Returns the number of records removed.
    /// Instances outliving the page can no longer register.
    pub fn teardown(self) -> usize {
        self.torn_down.store(true, Ordering::SeqCst);
        self.cache.evict_page(&self.page_key)
    }
}

/// One mounted rich-text view.
pub struct RichTextInstance {
    root_key: String,
    explicit_root_key: Option<String>,
    page_key: String,
    cache: Arc<NodeCache>,
    config: Arc<HostConfig>,
    link_handler: Option<Arc<dyn LinkTapHandler>>,
    markdown: Arc<dyn MarkdownConverter>,
    parser: Parser,
    sizing: ImageSizing,
    source: Option<(String, Language)>,
    torn_down: Arc<AtomicBool>,
}

impl RichTextInstance {
    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    pub fn page_key(&self) -> &str {
        &self.page_key
    }

    /// Still registered in the cache.
    pub fn is_mounted(&self) -> bool {
        self.cache.contains(&self.root_key)
    }

    /// Parse `source` and replace this instance's record. Returns false when the
    /// source and language are unchanged, or when the owning page has been torn down.
    pub fn set_source(&mut self, source: &str, language: Language) -> bool {
        if self.torn_down.load(Ordering::SeqCst) {
            log::debug!("{}: page {} torn down, source ignored", self.root_key, self.page_key);
            return false;
        }
        if let Some((prev, prev_lang)) = &self.source {
            if prev == source && *prev_lang == language && self.is_mounted() {
                return false;
            }
        }

        let html = match language {
            Language::Markdown => self.markdown.to_html(source),
            Language::Html => source.to_string(),
        };
        let doc = self.parser.parse(&html, &self.root_key);
        log::debug!(
            "{}: {} nodes, {} images",
            self.root_key,
            doc.node_count(),
            doc.image_urls.len()
        );
        self.cache.register(InstanceRecord::from_document(
            self.root_key.clone(),
            self.page_key.clone(),
            doc,
        ));
        self.sizing.clear();
        self.source = Some((source.to_string(), language));
        true
    }

    /// Parse in the configured default language.
    pub fn set_markup(&mut self, source: &str) -> bool {
        let language = self.config.default_language;
        self.set_source(source, language)
    }

    /// Current view tree. `None` once the page has evicted this instance.
    pub fn render(&self) -> Option<ViewDescriptor> {
        RenderEngine::new(&self.cache, self.config.class_prefix.clone())
            .render_instance(&self.root_key, &self.sizing)
    }

    /// Host reported an image's natural size. Stores the display size for the
    /// next render pass; `None` when the instance is no longer mounted.
    pub fn on_image_load(
        &mut self,
        index: usize,
        natural_width: f64,
        natural_height: f64,
        viewport: &dyn ViewportSource,
    ) -> Option<DisplaySize> {
        let record = self.cache.get(&self.root_key)?;
        let width = available_width(
            &viewport.viewport(),
            self.config.image_max_width_ratio,
            record.view_padding,
        );
        let size = compute_display_size(natural_width, natural_height, width);
        self.sizing.record(index, size);
        Some(size)
    }

    pub fn on_image_error(&self, src: &str, message: &str) {
        self.report_host_failure("img", src, message);
    }

    /// Media (video or audio) failed to load or play.
    pub fn on_media_error(&self, tag: &str, src: &str, message: &str) {
        self.report_host_failure(tag, src, message);
    }

    fn report_host_failure(&self, tag: &str, src: &str, message: &str) {
        let err = MpParseError::HostCallbackFailure {
            tag: tag.to_string(),
            message: format!("{} ({})", message, src),
        };
        log::warn!("{}: {}", self.root_key, err);
    }

    pub fn image_sizing(&self) -> &ImageSizing {
        &self.sizing
    }

    fn dispatcher<'a>(
        &'a self,
        host: &'a dyn HostNavigator,
        outbound: &'a dyn OutboundNavigator,
    ) -> InteractionDispatcher<'a> {
        InteractionDispatcher::new(&self.cache, host, outbound, &self.config.external_schemes)
            .with_page_handler(self.link_handler.as_deref())
    }

    /// Dispatch a tap bound on one of this instance's views.
    pub fn tap(
        &self,
        action: &TapAction,
        host: &dyn HostNavigator,
        outbound: &dyn OutboundNavigator,
    ) -> DispatchOutcome {
        self.dispatcher(host, outbound).dispatch(
            action,
            self.explicit_root_key.as_deref(),
            &self.root_key,
        )
    }

    pub fn tap_image(
        &self,
        src: &str,
        from: Option<&str>,
        good_url: Option<&str>,
        host: &dyn HostNavigator,
        outbound: &dyn OutboundNavigator,
    ) -> DispatchOutcome {
        self.dispatcher(host, outbound).on_image_tap(
            src,
            from,
            self.explicit_root_key.as_deref(),
            &self.root_key,
            good_url,
        )
    }

    pub fn tap_link(
        &self,
        href: &str,
        title: &str,
        host: &dyn HostNavigator,
        outbound: &dyn OutboundNavigator,
    ) -> DispatchOutcome {
        self.dispatcher(host, outbound).on_link_tap(href, title)
    }
}
