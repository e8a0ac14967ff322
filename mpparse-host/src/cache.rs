//! Process-wide instance registry.
//!
//! Records are keyed by root key and grouped per page so a page can evict
//! everything it mounted in one call. Last writer wins per key.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mpparse_markup::{Node, ParsedDocument};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cached tree and metadata for one rendered markup instance. Never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub root_key: String,
    pub page_key: String,
    pub tree: Vec<Node>,
    pub image_urls: Vec<String>,
    pub view_padding: f64,
}

impl InstanceRecord {
    pub fn from_document(
        root_key: impl Into<String>,
        page_key: impl Into<String>,
        doc: ParsedDocument,
    ) -> Self {
        Self {
            root_key: root_key.into(),
            page_key: page_key.into(),
            tree: doc.nodes,
            image_urls: doc.image_urls,
            view_padding: doc.view_padding,
        }
    }
}

/// Keyed store of instance records plus the page → root keys index.
///
/// Lock order is always page index before records, so `evict_page` can hold
/// the page entry for the whole bulk removal.
#[derive(Debug, Default)]
pub struct NodeCache {
    records: DashMap<String, Arc<InstanceRecord>>,
    pages: DashMap<String, Vec<String>>,
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record at `key`.
    pub fn put(&self, key: &str, record: InstanceRecord) {
        self.records.insert(key.to_string(), Arc::new(record));
    }

    pub fn get(&self, key: &str) -> Option<Arc<InstanceRecord>> {
        self.records.get(key).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Record that `root_key` belongs to `page_key`. Re-registering a key is a no-op.
    pub fn append_to_page_index(&self, page_key: &str, root_key: &str) {
        self.pages
            .entry(page_key.to_string())
            .and_modify(|keys| {
                if !keys.iter().any(|k| k == root_key) {
                    keys.push(root_key.to_string());
                }
            })
            .or_insert_with(|| vec![root_key.to_string()]);
    }

    /// `put` under the record's root key, then index it under its page.
    pub fn register(&self, record: InstanceRecord) {
        let root_key = record.root_key.clone();
        let page_key = record.page_key.clone();
        self.put(&root_key, record);
        self.append_to_page_index(&page_key, &root_key);
        log::debug!("registered {} under {}", root_key, page_key);
    }

    /// Remove every record indexed under `page_key`, then the index entry.
    /// Returns how many records were removed; absent pages remove nothing.
    pub fn evict_page(&self, page_key: &str) -> usize {
        match self.pages.entry(page_key.to_string()) {
            Entry::Occupied(entry) => {
                let removed = entry
                    .get()
                    .iter()
                    .filter(|key| self.records.remove(key.as_str()).is_some())
                    .count();
                entry.remove();
                log::debug!("evicted {} records for {}", removed, page_key);
                removed
            }
            Entry::Vacant(_) => 0,
        }
    }

    /// Root keys currently indexed under `page_key`.
    pub fn page_roots(&self, page_key: &str) -> Vec<String> {
        self.pages
            .get(page_key)
            .map(|keys| keys.value().clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
