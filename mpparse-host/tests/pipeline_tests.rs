use mpparse_host::{
    DispatchOutcome, HostConfig, HostNavigator, Language, LinkTapHandler, NavigationMode,
    NodeCache, PageScope, Platform, RichTextInstance, TapAction, ViewDescriptor, Viewport,
    WebviewOutbound,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingHost {
    calls: Mutex<Vec<String>>,
}

impl RecordingHost {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl HostNavigator for RecordingHost {
    fn navigate(&self, url: &str, mode: NavigationMode) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("navigate:{:?}:{}", mode, url));
    }

    fn preview_images(&self, current: &str, urls: &[String]) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("preview:{}:{}", current, urls.join(",")));
    }

    fn set_location(&self, url: &str) {
        self.calls.lock().unwrap().push(format!("location:{}", url));
    }
}

fn page(id: &str) -> PageScope {
    PageScope::new(id, Arc::new(NodeCache::new()), Arc::new(HostConfig::default()))
}

fn rendered(instance: &RichTextInstance) -> ViewDescriptor {
    instance.render().expect("instance should be mounted")
}

fn children(view: &ViewDescriptor) -> &[ViewDescriptor] {
    match view {
        ViewDescriptor::Container(c) => &c.children,
        ViewDescriptor::Button(b) => &b.children,
        other => panic!("Expected container, got {:?}", other),
    }
}

fn class_of(view: &ViewDescriptor) -> &str {
    match view {
        ViewDescriptor::Container(c) => &c.class,
        other => panic!("Expected container, got {:?}", other),
    }
}

/// All text leaves under `view`, in order.
fn texts(view: &ViewDescriptor) -> Vec<String> {
    let mut out = Vec::new();
    collect_texts(view, &mut out);
    out
}

fn collect_texts(view: &ViewDescriptor, out: &mut Vec<String>) {
    match view {
        ViewDescriptor::Text(t) => out.push(t.value.clone()),
        ViewDescriptor::Container(c) => c.children.iter().for_each(|v| collect_texts(v, out)),
        ViewDescriptor::Button(b) => b.children.iter().for_each(|v| collect_texts(v, out)),
        _ => {}
    }
}

fn first_image_tap(view: &ViewDescriptor) -> Option<TapAction> {
    match view {
        ViewDescriptor::Image(img) => img.on_tap.clone(),
        ViewDescriptor::Container(c) => c.children.iter().find_map(first_image_tap),
        _ => None,
    }
}

// Ordering
#[test]
fn test_render_preserves_document_order() {
    let page = page("order");
    let mut instance = page.mount();
    instance.set_source(
        "<div><p>one</p><section><span>two</span><b>three</b></section><p>four</p></div>",
        Language::Html,
    );
    assert_eq!(texts(&rendered(&instance)), vec!["one", "two", "three", "four"]);
}

// Lists
#[test]
fn test_unordered_list_rows_with_bullets() {
    let page = page("ul");
    let mut instance = page.mount();
    instance.set_source("<ul><li>a</li><li>b</li></ul>", Language::Html);

    let root = rendered(&instance);
    let ul = &children(&root)[0];
    let rows = children(ul);
    assert_eq!(rows.len(), 2);
    for (row, expected) in rows.iter().zip(["a", "b"]) {
        let parts = children(row);
        assert_eq!(class_of(&parts[0]), "mp-li-circle");
        assert_eq!(texts(&parts[1]), vec![expected.to_string()]);
    }
}

#[test]
fn test_ordered_list_labels() {
    let page = page("ol");
    let mut instance = page.mount();
    instance.set_source("<ol><li>x</li><li>y</li></ol>", Language::Html);

    let root = rendered(&instance);
    let rows = children(&children(&root)[0]);
    let rendered_rows: Vec<Vec<String>> = rows.iter().map(texts).collect();
    assert_eq!(
        rendered_rows,
        vec![
            vec!["1.".to_string(), "x".to_string()],
            vec!["2.".to_string(), "y".to_string()],
        ]
    );
}

// Unknown tags
#[test]
fn test_unknown_tag_generic_container() {
    let page = page("foo");
    let mut instance = page.mount();
    instance.set_source("<foo>bar</foo>", Language::Html);

    let root = rendered(&instance);
    match &children(&root)[0] {
        ViewDescriptor::Container(c) => {
            assert_eq!(c.tag.as_deref(), Some("foo"));
            assert_eq!(c.tag_type, None);
            assert_eq!(texts(&children(&root)[0]), vec!["bar".to_string()]);
        }
        other => panic!("Expected container, got {:?}", other),
    }
}

// Images
#[test]
fn test_auto_layout_scales_to_viewport() {
    let page = page("img");
    let mut instance = page.mount();
    instance.set_source(r#"<p><img src="/wide.png"></p>"#, Language::Html);

    let viewport = Viewport {
        width: 375.0,
        platform: Platform::MiniProgram,
    };
    let size = instance.on_image_load(0, 1500.0, 1000.0, &viewport).unwrap();
    assert_eq!(size.width, 375.0);
    assert!((size.width / size.height - 1.5).abs() < 1e-6);

    let root = rendered(&instance);
    let img = &children(&children(&root)[0])[0];
    match img {
        ViewDescriptor::Image(img) => {
            assert_eq!(img.width, Some(375.0));
            assert_eq!(img.height, Some(250.0));
        }
        other => panic!("Expected image, got {:?}", other),
    }
}

#[test]
fn test_small_image_keeps_natural_size() {
    let page = page("small");
    let mut instance = page.mount();
    instance.set_source(r#"<img src="/small.png">"#, Language::Html);
    let size = instance
        .on_image_load(0, 100.0, 50.0, &Viewport::default())
        .unwrap();
    assert_eq!((size.width, size.height), (100.0, 50.0));
}

#[test]
fn test_commerce_image_navigates_without_preview() {
    let page = page("goods");
    let mut instance = page.mount();
    instance.set_source(
        r#"<img src="/p.png" goodUrl="/detail/42"><img src="/q.png">"#,
        Language::Html,
    );
    let host = Arc::new(RecordingHost::default());
    let outbound = WebviewOutbound::from_config(host.clone(), page.config());

    let action = first_image_tap(&rendered(&instance)).unwrap();
    let outcome = instance.tap(&action, &*host, &outbound);
    assert_eq!(
        outcome,
        DispatchOutcome::CommerceNavigation {
            url: "/detail/42".to_string()
        }
    );
    assert_eq!(host.calls(), vec!["navigate:Push:/detail/42".to_string()]);
}

#[test]
fn test_image_tap_opens_gallery_of_instance() {
    let page = page("gallery");
    let mut instance = page.mount();
    instance.set_source(r#"<img src="/a.png"><p><img src="/b.png"></p>"#, Language::Html);
    let host = Arc::new(RecordingHost::default());
    let outbound = WebviewOutbound::from_config(host.clone(), page.config());

    let action = first_image_tap(&rendered(&instance)).unwrap();
    instance.tap(&action, &*host, &outbound);
    assert_eq!(host.calls(), vec!["preview:/a.png:/a.png,/b.png".to_string()]);
}

// Links
#[test]
fn test_inner_link_navigates_in_host() {
    let page = page("links");
    let instance = page.mount();
    let host = Arc::new(RecordingHost::default());
    let outbound = WebviewOutbound::from_config(host.clone(), page.config());

    let outcome = instance.tap_link("/inner/page", "", &*host, &outbound);
    assert_eq!(
        outcome,
        DispatchOutcome::InHostNavigation {
            url: "/inner/page".to_string()
        }
    );
    assert_eq!(host.calls(), vec!["navigate:Push:/inner/page".to_string()]);
}

#[test]
fn test_external_link_goes_outbound() {
    let page = page("links");
    let mut instance = page.mount();
    instance.set_source(r#"<a href="https://example.com">out</a>"#, Language::Html);
    let host = Arc::new(RecordingHost::default());
    let outbound = WebviewOutbound::from_config(host.clone(), page.config());

    let action = match &children(&rendered(&instance))[0] {
        ViewDescriptor::Container(c) => c.on_tap.clone().unwrap(),
        other => panic!("Expected container, got {:?}", other),
    };
    let outcome = instance.tap(&action, &*host, &outbound);
    assert_eq!(
        outcome,
        DispatchOutcome::Outbound {
            url: "https://example.com".to_string()
        }
    );
    assert_eq!(
        host.calls(),
        vec!["navigate:Push:/pages/webview/outside?url=https%3A%2F%2Fexample.com".to_string()]
    );
}

#[test]
fn test_page_link_handler_overrides_routing() {
    struct Recorder(Mutex<Vec<(String, String)>>);
    impl LinkTapHandler for Recorder {
        fn handle_link_tap(&self, href: &str, title: &str) {
            self.0
                .lock()
                .unwrap()
                .push((href.to_string(), title.to_string()));
        }
    }

    let handler = Arc::new(Recorder(Mutex::new(Vec::new())));
    let page = page("handled").with_link_handler(handler.clone());
    let instance = page.mount();
    let host = Arc::new(RecordingHost::default());
    let outbound = WebviewOutbound::from_config(host.clone(), page.config());

    instance.tap_link("/inner/page", "Inner", &*host, &outbound);
    assert!(host.calls().is_empty());
    assert_eq!(
        *handler.0.lock().unwrap(),
        vec![("/inner/page".to_string(), "Inner".to_string())]
    );
}

// Lifecycle
#[test]
fn test_teardown_evicts_all_instances_once() {
    let cache = Arc::new(NodeCache::new());
    let page = PageScope::new("life", Arc::clone(&cache), Arc::new(HostConfig::default()));
    let other = PageScope::new("other", Arc::clone(&cache), Arc::new(HostConfig::default()));

    let mut a = page.mount();
    let mut b = page.mount();
    let mut c = other.mount();
    a.set_source("<p>a</p>", Language::Html);
    b.set_source("<p>b</p>", Language::Html);
    c.set_source("<p>c</p>", Language::Html);
    let keys = vec![a.root_key().to_string(), b.root_key().to_string()];

    assert_eq!(page.teardown(), 2);
    for key in &keys {
        assert!(cache.get(key).is_none());
    }
    assert_eq!(cache.evict_page("mpparse_life"), 0);
    assert!(c.render().is_some());
}

#[test]
fn test_reparse_replaces_record_and_sizing() {
    let page = page("reparse");
    let mut instance = page.mount();
    instance.set_source(r#"<img src="/a.png">"#, Language::Html);
    instance.on_image_load(0, 2000.0, 1000.0, &Viewport::default());
    assert_eq!(instance.image_sizing().len(), 1);

    instance.set_source(r#"<img src="/b.png"><img src="/c.png">"#, Language::Html);
    assert!(instance.image_sizing().is_empty());
    let host = Arc::new(RecordingHost::default());
    let outbound = WebviewOutbound::from_config(host.clone(), page.config());
    instance.tap_image("/b.png", None, None, &*host, &outbound);
    assert_eq!(host.calls(), vec!["preview:/b.png:/b.png,/c.png".to_string()]);
}

#[test]
fn test_markdown_code_block_renders() {
    let page = page("md");
    let mut instance = page.mount();
    instance.set_source("Intro\n\n```sql\nSELECT 1;\nSELECT 2;\n```\n", Language::Markdown);
    let json = serde_json::to_value(rendered(&instance)).unwrap();
    let text = json.to_string();
    assert!(text.contains("Intro"));
    assert!(text.contains("mp-code sql"));
    assert!(text.contains("SELECT"));
}
