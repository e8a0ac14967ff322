//! Interaction dispatch for image and link taps.

use mpparse_markup::{MpParseError, MpParseResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::NodeCache;
use crate::config::{has_external_scheme, HostConfig, Platform};
use crate::render::TapAction;

/// Push a new screen or replace the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationMode {
    Push,
    Replace,
}

/// Host navigation primitives.
pub trait HostNavigator: Send + Sync {
    fn navigate(&self, url: &str, mode: NavigationMode);
    fn preview_images(&self, current: &str, urls: &[String]);
    /// Top-level location change, only meaningful on hosts with a browser location.
    fn set_location(&self, url: &str);
}

/// Opens URLs that leave the host's own pages.
pub trait OutboundNavigator: Send + Sync {
    fn open(&self, url: &str, mode: NavigationMode) -> MpParseResult<()>;
}

/// Page-level override for link taps.
pub trait LinkTapHandler: Send + Sync {
    fn handle_link_tap(&self, href: &str, title: &str);
}

/// Default outbound navigation: a webview route on mini-program hosts, the
/// top-level location on web hosts.
pub struct WebviewOutbound {
    host: Arc<dyn HostNavigator>,
    platform: Platform,
    route: String,
}

impl WebviewOutbound {
    pub fn new(host: Arc<dyn HostNavigator>, platform: Platform, route: impl Into<String>) -> Self {
        Self {
            host,
            platform,
            route: route.into(),
        }
    }

    pub fn from_config(host: Arc<dyn HostNavigator>, config: &HostConfig) -> Self {
        Self::new(host, config.viewport.platform, config.outside_route.clone())
    }

    /// Webview page URL carrying `url` as a form-encoded query parameter.
    pub fn webview_url(&self, url: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
        format!("{}?url={}", self.route, encoded)
    }
}

impl OutboundNavigator for WebviewOutbound {
    fn open(&self, url: &str, mode: NavigationMode) -> MpParseResult<()> {
        if url.trim().is_empty() {
            return Err(MpParseError::EmptyNavigationTarget);
        }
        match self.platform {
            Platform::Web => self.host.set_location(url),
            Platform::MiniProgram => self.host.navigate(&self.webview_url(url), mode),
        }
        Ok(())
    }
}

/// What a tap resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DispatchOutcome {
    CommerceNavigation { url: String },
    Preview { current: String, urls: Vec<String> },
    PageHandler { href: String },
    InHostNavigation { url: String },
    Outbound { url: String },
    /// Invalid input; logged and nothing happened.
    Skipped,
}

/// Routes taps to the host. Built per page from explicit collaborators.
pub struct InteractionDispatcher<'a> {
    cache: &'a NodeCache,
    host: &'a dyn HostNavigator,
    outbound: &'a dyn OutboundNavigator,
    page_handler: Option<&'a dyn LinkTapHandler>,
    external_schemes: &'a [String],
}

impl<'a> InteractionDispatcher<'a> {
    pub fn new(
        cache: &'a NodeCache,
        host: &'a dyn HostNavigator,
        outbound: &'a dyn OutboundNavigator,
        external_schemes: &'a [String],
    ) -> Self {
        Self {
            cache,
            host,
            outbound,
            page_handler: None,
            external_schemes,
        }
    }

    pub fn with_page_handler(mut self, handler: Option<&'a dyn LinkTapHandler>) -> Self {
        self.page_handler = handler;
        self
    }

    /// Image tap. The owning instance is the image's `from` key, else `root_key`,
    /// else `current_root`. A commerce target wins over the gallery.
    pub fn on_image_tap(
        &self,
        src: &str,
        from: Option<&str>,
        root_key: Option<&str>,
        current_root: &str,
        good_url: Option<&str>,
    ) -> DispatchOutcome {
        if let Some(url) = good_url.filter(|u| !u.trim().is_empty()) {
            self.host.navigate(url, NavigationMode::Push);
            return DispatchOutcome::CommerceNavigation {
                url: url.to_string(),
            };
        }

        let key = from
            .filter(|k| !k.is_empty())
            .or(root_key.filter(|k| !k.is_empty()))
            .unwrap_or(current_root);
        let mut urls = match self.cache.get(key) {
            Some(record) => record.image_urls.clone(),
            None => {
                log::debug!("no record for {} on image tap", key);
                Vec::new()
            }
        };
        if urls.is_empty() && !src.is_empty() {
            urls.push(src.to_string());
        }
        self.host.preview_images(src, &urls);
        DispatchOutcome::Preview {
            current: src.to_string(),
            urls,
        }
    }

    /// Link tap. A page handler wins; otherwise in-host paths navigate
    /// internally and external schemes go outbound.
    pub fn on_link_tap(&self, href: &str, title: &str) -> DispatchOutcome {
        if let Some(handler) = self.page_handler {
            handler.handle_link_tap(href, title);
            return DispatchOutcome::PageHandler {
                href: href.to_string(),
            };
        }

        if href.trim().is_empty() {
            log::error!("link tap with empty href ignored");
            return DispatchOutcome::Skipped;
        }

        if !self.is_external(href) {
            self.host.navigate(href, NavigationMode::Push);
            return DispatchOutcome::InHostNavigation {
                url: href.to_string(),
            };
        }

        match self.outbound.open(href, NavigationMode::Push) {
            Ok(()) => DispatchOutcome::Outbound {
                url: href.to_string(),
            },
            Err(e) => {
                log::error!("outbound navigation to {:?} failed: {}", href, e);
                DispatchOutcome::Skipped
            }
        }
    }

    /// Dispatch a tap action bound by the render engine.
    pub fn dispatch(&self, action: &TapAction, root_key: Option<&str>, current_root: &str) -> DispatchOutcome {
        match action {
            TapAction::OpenLink { href, title } => self.on_link_tap(href, title),
            TapAction::ImageTap {
                src, from, good_url, ..
            } => self.on_image_tap(
                src,
                from.as_deref(),
                root_key,
                current_root,
                good_url.as_deref(),
            ),
        }
    }

    fn is_external(&self, href: &str) -> bool {
        has_external_scheme(href, self.external_schemes)
    }
}
