//! Unit of work
//!
//! A `Session` collects pending inserts and deletes and applies them to the
//! store in one batch on `commit`. Lookups go through a weak identity map so
//! that a logical document is represented by one live instance per session.
//!
//! # Commit
//!
//! 1. Every pending document is externalized. A failure here leaves both
//!    queues untouched.
//! 2. The batch is handed to `DocumentStore::batch_write`. A store error is
//!    returned unchanged and leaves both queues untouched.
//! 3. On success both queues are cleared, every inserted document is the
//!    identity map entry for the key it was written under, and deleted keys
//!    leave the identity map.
//!
//! # Identity
//!
//! An entry only counts while its document still carries the key it is filed
//! under. An entry whose document's primary key was changed is evicted on
//! the next read of that key. Two distinct live instances never share a key:
//! tracking or committing a second one fails with `DuplicateIdentity`.

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use super::errors::{SessionError, SessionResult};
use super::identity::{DocumentRef, IdentityKey, IdentityMap};
use super::store::{DocumentStore, WriteBatch};
use crate::config::AstrologyConfig;
use crate::model::{Document, ModelRegistry, Table};
use crate::observability::{log_event, log_event_with_fields, Event, MetricsRegistry};
use crate::schema::SchemaError;

/// Unit of work over one database of a `DocumentStore`.
pub struct Session<S: DocumentStore> {
    store: S,
    database: String,
    pending_inserts: Vec<DocumentRef>,
    pending_deletes: Vec<DocumentRef>,
    identity_map: IdentityMap,
    metrics: MetricsRegistry,
}

impl<S: DocumentStore> Session<S> {
    /// Session over `database`; nothing is sent to the store.
    pub fn new(store: S, database: impl Into<String>) -> Self {
        Self {
            store,
            database: database.into(),
            pending_inserts: Vec::new(),
            pending_deletes: Vec::new(),
            identity_map: IdentityMap::new(),
            metrics: MetricsRegistry::new(),
        }
    }

    /// Session over the configured database, ensuring it exists when
    /// `ensure_on_open` is set.
    pub fn open(mut store: S, config: &AstrologyConfig) -> SessionResult<Self> {
        if config.ensure_on_open {
            store.ensure_database(&config.database)?;
        }
        log_event_with_fields(Event::SessionOpened, &[("database", config.database.as_str())]);
        Ok(Self::new(store, config.database.clone()))
    }

    /// Ensures a table exists for every model in `registry`.
    pub fn ensure_tables(&mut self, registry: &ModelRegistry) -> SessionResult<()> {
        for table in registry.tables() {
            self.store.ensure_table(&self.database, table.name())?;
            log_event_with_fields(
                Event::TableEnsured,
                &[("database", self.database.as_str()), ("table", table.name())],
            );
        }
        Ok(())
    }

    /// Wraps `doc` in a shared handle and queues it for insert.
    pub fn add(&mut self, doc: Document) -> SessionResult<DocumentRef> {
        let doc = Rc::new(RefCell::new(doc));
        self.track_for_insert(&doc)?;
        Ok(doc)
    }

    /// Queues `doc` for insert.
    ///
    /// A document with a primary key becomes the identity map entry for that
    /// key.
    ///
    /// # Errors
    ///
    /// `DuplicateIdentity` if another live instance holds the key; nothing is
    /// queued.
    pub fn track_for_insert(&mut self, doc: &DocumentRef) -> SessionResult<()> {
        if let Some(key) = identity_of(doc)? {
            match self.live(&key)? {
                Some(holder) if !Rc::ptr_eq(&holder, doc) => return Err(duplicate(&key)),
                Some(_) => {}
                None => {
                    self.identity_map.remove_instance(doc);
                    self.identity_map.insert(key, doc);
                }
            }
        }
        self.pending_inserts.push(Rc::clone(doc));
        self.metrics.increment_inserts_tracked();
        Ok(())
    }

    /// Queues `doc` for delete.
    pub fn track_for_delete(&mut self, doc: &DocumentRef) {
        self.pending_deletes.push(Rc::clone(doc));
        self.metrics.increment_deletes_tracked();
    }

    /// The document of `table` stored under `key`.
    ///
    /// A live instance from the identity map is returned as is; otherwise the
    /// store is asked and the result becomes the identity map entry.
    ///
    /// # Errors
    ///
    /// `DocumentInUse` if the mapped instance is mutably borrowed; store
    /// errors unchanged.
    pub fn lookup(&mut self, table: &Arc<Table>, key: &Value) -> SessionResult<Option<DocumentRef>> {
        let identity = IdentityKey::new(table.model(), key);
        if let Some(doc) = self.live(&identity)? {
            self.metrics.increment_identity_hits();
            log_event_with_fields(Event::IdentityHit, &[("model", table.model())]);
            return Ok(Some(doc));
        }

        self.metrics.increment_identity_misses();
        log_event_with_fields(Event::IdentityMiss, &[("model", table.model())]);
        let Some(state) = self.store.fetch(&self.database, table.name(), key)? else {
            return Ok(None);
        };
        let doc = Rc::new(RefCell::new(Document::from_external(Arc::clone(table), state)));
        self.identity_map.insert(identity, &doc);
        Ok(Some(doc))
    }

    /// Applies all pending work in one batch.
    ///
    /// # Errors
    ///
    /// Externalization and store errors; in both cases nothing is cleared and
    /// the commit can be retried.
    pub fn commit(&mut self) -> SessionResult<()> {
        let inserts = self.pending_inserts.len().to_string();
        let deletes = self.pending_deletes.len().to_string();
        log_event_with_fields(
            Event::CommitBegin,
            &[("inserts", inserts.as_str()), ("deletes", deletes.as_str())],
        );

        let prepared = match self.prepare() {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = self.store.batch_write(&self.database, &prepared.batch) {
            return Err(self.fail(e.into()));
        }

        for (key, doc) in &prepared.inserted {
            self.identity_map.remove_instance(doc);
            self.identity_map.insert(key.clone(), doc);
        }
        for key in &prepared.deleted {
            self.identity_map.remove(key);
        }
        self.pending_inserts.clear();
        self.pending_deletes.clear();
        self.metrics.record_commit(prepared.batch.len() as u64);
        let written = prepared.batch.len().to_string();
        log_event_with_fields(Event::CommitComplete, &[("documents", written.as_str())]);
        Ok(())
    }

    fn prepare(&self) -> SessionResult<Prepared> {
        let mut batch = WriteBatch::new();
        let mut inserted: Vec<(IdentityKey, DocumentRef)> =
            Vec::with_capacity(self.pending_inserts.len());
        for handle in &self.pending_inserts {
            let doc = borrow(handle)?;
            let external = doc.to_external()?;
            let key = primary_key(&doc)?;
            let identity = IdentityKey::new(doc.model(), &key);

            let queued_twice = inserted
                .iter()
                .any(|(other_key, other)| *other_key == identity && !Rc::ptr_eq(other, handle));
            if queued_twice {
                return Err(duplicate(&identity));
            }
            if let Some(holder) = self.identity_map.get(&identity) {
                if !Rc::ptr_eq(&holder, handle) && holds(&holder, &identity)? {
                    return Err(duplicate(&identity));
                }
            }

            batch.insert(doc.table().name(), key, external);
            inserted.push((identity, Rc::clone(handle)));
        }

        let mut deleted = Vec::with_capacity(self.pending_deletes.len());
        for doc in &self.pending_deletes {
            let doc = borrow(doc)?;
            let key = primary_key(&doc)?;
            deleted.push(IdentityKey::new(doc.model(), &key));
            batch.delete(doc.table().name(), key);
        }
        Ok(Prepared {
            batch,
            inserted,
            deleted,
        })
    }

    /// The entry for `key` if its document still carries that key. An entry
    /// whose document moved to another key is evicted.
    fn live(&mut self, key: &IdentityKey) -> SessionResult<Option<DocumentRef>> {
        let Some(doc) = self.identity_map.get(key) else {
            return Ok(None);
        };
        if holds(&doc, key)? {
            return Ok(Some(doc));
        }
        self.identity_map.remove(key);
        self.metrics.add_identity_evictions(1);
        log_event_with_fields(Event::IdentityEvicted, &[("count", "1")]);
        Ok(None)
    }

    fn fail(&self, err: SessionError) -> SessionError {
        self.metrics.increment_commit_failures();
        let reason = err.to_string();
        log_event_with_fields(Event::CommitFailed, &[("reason", reason.as_str())]);
        err
    }

    /// Discards both queues. The identity map is kept.
    pub fn rollback(&mut self) {
        self.pending_inserts.clear();
        self.pending_deletes.clear();
        log_event(Event::Rollback);
    }

    /// Sweeps identity map entries whose document is gone.
    pub fn evict_stale(&mut self) -> usize {
        let evicted = self.identity_map.evict_stale();
        if evicted > 0 {
            self.metrics.add_identity_evictions(evicted as u64);
            let count = evicted.to_string();
            log_event_with_fields(Event::IdentityEvicted, &[("count", count.as_str())]);
        }
        evicted
    }

    pub fn pending_inserts(&self) -> usize {
        self.pending_inserts.len()
    }

    pub fn pending_deletes(&self) -> usize {
        self.pending_deletes.len()
    }

    /// Identity map entries, stale ones included
    pub fn identity_map_len(&self) -> usize {
        self.identity_map.len()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Consumes the session, returning the store. Pending work is dropped.
    pub fn into_store(self) -> S {
        self.store
    }
}

/// Validated batch plus the identity changes to apply once it is written
struct Prepared {
    batch: WriteBatch,
    inserted: Vec<(IdentityKey, DocumentRef)>,
    deleted: Vec<IdentityKey>,
}

fn borrow(doc: &DocumentRef) -> SessionResult<Ref<'_, Document>> {
    doc.try_borrow().map_err(|_| SessionError::DocumentInUse)
}

fn identity_of(doc: &DocumentRef) -> SessionResult<Option<IdentityKey>> {
    let doc = borrow(doc)?;
    let key = doc.primary_key().map(|pk| IdentityKey::new(doc.model(), pk));
    Ok(key)
}

/// Whether `doc` currently carries `key`
fn holds(doc: &DocumentRef, key: &IdentityKey) -> SessionResult<bool> {
    Ok(identity_of(doc)?.as_ref() == Some(key))
}

fn duplicate(key: &IdentityKey) -> SessionError {
    SessionError::DuplicateIdentity {
        model: key.model().to_string(),
        key: key.key().to_string(),
    }
}

fn primary_key(doc: &Document) -> SessionResult<Value> {
    doc.primary_key()
        .cloned()
        .ok_or_else(|| SchemaError::field_not_set(doc.table().primary_key_name()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, ModelDef};
    use crate::schema::{PrimitiveKind, Spec};
    use crate::session::{MemoryStore, StoreError, StoreResult};
    use serde_json::{json, Map};

    fn heroes(registry: &ModelRegistry) -> Arc<Table> {
        registry
            .register(
                ModelDef::new("Hero")
                    .table("heroes")
                    .field("hero_name", Field::new(PrimitiveKind::String).primary_key())
                    .field("superpower", Field::new(Spec::set(["flight", "strength"])))
                    .field("sidekick", Field::new(Spec::nullable(PrimitiveKind::String))),
            )
            .unwrap()
    }

    fn open(registry: &ModelRegistry) -> Session<MemoryStore> {
        let mut session = Session::open(MemoryStore::new(), &AstrologyConfig::new("astro")).unwrap();
        session.ensure_tables(registry).unwrap();
        session
    }

    fn hero(table: &Arc<Table>, name: &str) -> Document {
        Document::with_values(Arc::clone(table), [("hero_name", json!(name)), ("superpower", json!("flight"))])
            .unwrap()
    }

    /// Store whose writes fail while `failing` is set
    struct FlakyStore {
        inner: MemoryStore,
        failing: bool,
    }

    impl DocumentStore for FlakyStore {
        fn ensure_database(&mut self, name: &str) -> StoreResult<()> {
            self.inner.ensure_database(name)
        }

        fn ensure_table(&mut self, database: &str, table: &str) -> StoreResult<()> {
            self.inner.ensure_table(database, table)
        }

        fn batch_write(&mut self, database: &str, batch: &WriteBatch) -> StoreResult<()> {
            if self.failing {
                return Err(StoreError::Rejected("connection lost".into()));
            }
            self.inner.batch_write(database, batch)
        }

        fn fetch(&self, database: &str, table: &str, key: &Value) -> StoreResult<Option<Map<String, Value>>> {
            self.inner.fetch(database, table, key)
        }
    }

    #[test]
    fn test_open_ensures_database() {
        let session = Session::open(MemoryStore::new(), &AstrologyConfig::new("astro")).unwrap();
        assert!(session.store().has_database("astro"));
        assert_eq!(session.database(), "astro");
    }

    #[test]
    fn test_open_without_ensure() {
        let mut config = AstrologyConfig::new("astro");
        config.ensure_on_open = false;
        let session = Session::open(MemoryStore::new(), &config).unwrap();
        assert!(!session.store().has_database("astro"));
    }

    #[test]
    fn test_commit_writes_and_clears() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);

        session.add(hero(&table, "hulk")).unwrap();
        assert_eq!(session.pending_inserts(), 1);
        session.commit().unwrap();

        assert_eq!(session.pending_inserts(), 0);
        assert_eq!(session.store().document_count("astro", "heroes"), 1);
        let stored = session.store().fetch("astro", "heroes", &json!("hulk")).unwrap().unwrap();
        assert_eq!(Value::Object(stored), json!({"hero_name": "hulk", "superpower": "flight"}));
        assert_eq!(session.metrics().snapshot().commits, 1);
        assert_eq!(session.metrics().snapshot().documents_written, 1);
    }

    #[test]
    fn test_lookup_returns_tracked_instance() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);

        let doc = session.add(hero(&table, "hulk")).unwrap();
        let found = session.lookup(&table, &json!("hulk")).unwrap().unwrap();
        assert!(Rc::ptr_eq(&doc, &found));
        assert_eq!(session.metrics().snapshot().identity_hits, 1);
    }

    #[test]
    fn test_lookup_loads_from_store_once() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        session.add(hero(&table, "thor")).unwrap();
        session.commit().unwrap();

        // Only the pending queue held the instance.
        assert_eq!(session.evict_stale(), 1);

        let first = session.lookup(&table, &json!("thor")).unwrap().unwrap();
        let second = session.lookup(&table, &json!("thor")).unwrap().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.borrow().get("superpower").unwrap(), &json!("flight"));

        let snapshot = session.metrics().snapshot();
        assert_eq!(snapshot.identity_misses, 1);
        assert_eq!(snapshot.identity_hits, 1);
        assert_eq!(snapshot.identity_evictions, 1);
    }

    #[test]
    fn test_lookup_missing_document() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        assert!(session.lookup(&table, &json!("nobody")).unwrap().is_none());
    }

    #[test]
    fn test_delete_removes_from_store_and_identity_map() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        let doc = session.add(hero(&table, "hulk")).unwrap();
        session.commit().unwrap();

        session.track_for_delete(&doc);
        assert_eq!(session.pending_deletes(), 1);
        session.commit().unwrap();

        assert_eq!(session.store().document_count("astro", "heroes"), 0);
        assert_eq!(session.identity_map_len(), 0);
        assert!(session.lookup(&table, &json!("hulk")).unwrap().is_none());
    }

    #[test]
    fn test_store_failure_keeps_queues() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let store = FlakyStore {
            inner: MemoryStore::new(),
            failing: true,
        };
        let mut session = Session::open(store, &AstrologyConfig::new("astro")).unwrap();
        session.ensure_tables(&registry).unwrap();
        session.add(hero(&table, "hulk")).unwrap();

        let err = session.commit().unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::Rejected(_))));
        assert_eq!(session.pending_inserts(), 1);
        assert_eq!(session.metrics().snapshot().commit_failures, 1);

        session.store_mut().failing = false;
        session.commit().unwrap();
        assert_eq!(session.pending_inserts(), 0);
        assert_eq!(session.store().inner.document_count("astro", "heroes"), 1);
    }

    #[test]
    fn test_missing_primary_key_fails_commit() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        session
            .add(Document::with_values(Arc::clone(&table), [("superpower", "flight")]).unwrap())
            .unwrap();

        let err = session.commit().unwrap_err();
        match err {
            SessionError::Schema(e) => assert_eq!(e.code().code(), "ASTRO_FIELD_NOT_SET"),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(session.pending_inserts(), 1);
        assert_eq!(session.store().document_count("astro", "heroes"), 0);
    }

    #[test]
    fn test_borrowed_document_fails_commit() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        let doc = session.add(hero(&table, "hulk")).unwrap();

        let _guard = doc.borrow_mut();
        assert!(matches!(session.commit().unwrap_err(), SessionError::DocumentInUse));
        assert_eq!(session.pending_inserts(), 1);
    }

    #[test]
    fn test_rollback_discards_pending_work() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        let doc = session.add(hero(&table, "hulk")).unwrap();
        session.track_for_delete(&doc);

        session.rollback();
        assert_eq!(session.pending_inserts(), 0);
        assert_eq!(session.pending_deletes(), 0);
        session.commit().unwrap();
        assert_eq!(session.store().document_count("astro", "heroes"), 0);
    }

    #[test]
    fn test_second_live_instance_rejected() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        let first = session.add(hero(&table, "hulk")).unwrap();

        let err = session.add(hero(&table, "hulk")).unwrap_err();
        assert!(matches!(err, SessionError::DuplicateIdentity { ref model, .. } if model == "Hero"));
        assert_eq!(session.pending_inserts(), 1);

        // Tracking the same instance again is not a conflict.
        session.track_for_insert(&first).unwrap();
        let found = session.lookup(&table, &json!("hulk")).unwrap().unwrap();
        assert!(Rc::ptr_eq(&found, &first));
    }

    #[test]
    fn test_released_instance_can_be_replaced() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        session.add(hero(&table, "hulk")).unwrap();
        session.rollback();

        let replacement = session.add(hero(&table, "hulk")).unwrap();
        let found = session.lookup(&table, &json!("hulk")).unwrap().unwrap();
        assert!(Rc::ptr_eq(&found, &replacement));
    }

    #[test]
    fn test_changed_key_is_rekeyed_on_commit() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        let doc = session.add(hero(&table, "hulk")).unwrap();
        doc.borrow_mut().set("hero_name", "thor").unwrap();

        // The old entry no longer describes its document.
        assert!(session.lookup(&table, &json!("hulk")).unwrap().is_none());
        assert_eq!(session.metrics().snapshot().identity_evictions, 1);

        session.commit().unwrap();
        assert!(session.store().fetch("astro", "heroes", &json!("hulk")).unwrap().is_none());
        let found = session.lookup(&table, &json!("thor")).unwrap().unwrap();
        assert!(Rc::ptr_eq(&found, &doc));
        assert_eq!(session.identity_map_len(), 1);
    }

    #[test]
    fn test_key_collision_fails_commit() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        let _hulk = session.add(hero(&table, "hulk")).unwrap();
        let thor = session.add(hero(&table, "thor")).unwrap();
        thor.borrow_mut().set("hero_name", "hulk").unwrap();

        let err = session.commit().unwrap_err();
        assert!(matches!(err, SessionError::DuplicateIdentity { .. }));
        assert_eq!(session.pending_inserts(), 2);
        assert_eq!(session.store().document_count("astro", "heroes"), 0);
        assert_eq!(session.metrics().snapshot().commit_failures, 1);
    }

    #[test]
    fn test_changed_key_of_loaded_document() {
        let registry = ModelRegistry::new();
        let table = heroes(&registry);
        let mut session = open(&registry);
        session.add(hero(&table, "hulk")).unwrap();
        session.commit().unwrap();

        let loaded = session.lookup(&table, &json!("hulk")).unwrap().unwrap();
        loaded.borrow_mut().set("hero_name", "banner").unwrap();

        let fresh = session.lookup(&table, &json!("hulk")).unwrap().unwrap();
        assert!(!Rc::ptr_eq(&fresh, &loaded));
        assert_eq!(fresh.borrow().get("hero_name").unwrap(), &json!("hulk"));
    }
}
