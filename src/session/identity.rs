//! Identity map
//!
//! Maps (model, primary key) to the live document for that key. Entries hold
//! weak references: the map never keeps a document alive, and an entry whose
//! document was dropped reads as absent until it is swept.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::model::Document;

/// Shared handle to a tracked document.
pub type DocumentRef = Rc<RefCell<Document>>;

/// Identity of one logical document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    model: String,
    key: String,
}

impl IdentityKey {
    /// Keys compare by the compact JSON of the primary key, so `1` and `"1"`
    /// are different documents.
    pub fn new(model: &str, key: &Value) -> Self {
        Self {
            model: model.to_string(),
            key: key.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Compact JSON of the primary key
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Weak (model, key) -> document map.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: HashMap<IdentityKey, Weak<RefCell<Document>>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live document for `key`, if it is still referenced elsewhere.
    pub fn get(&self, key: &IdentityKey) -> Option<DocumentRef> {
        self.entries.get(key).and_then(Weak::upgrade)
    }

    /// Records `doc` under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: IdentityKey, doc: &DocumentRef) {
        self.entries.insert(key, Rc::downgrade(doc));
    }

    pub fn remove(&mut self, key: &IdentityKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drops every entry pointing at `doc`, whatever key it is under.
    pub fn remove_instance(&mut self, doc: &DocumentRef) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, weak| !std::ptr::eq(weak.as_ptr(), Rc::as_ptr(doc)));
        before - self.entries.len()
    }

    /// Drops entries whose document is gone; returns how many.
    pub fn evict_stale(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        before - self.entries.len()
    }

    /// Number of entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
