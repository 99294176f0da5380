use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde_json::{Map, Value, json};
use strata_store::{BatchOp, Store, StoreError};

use crate::bridge::Bridge;
use crate::encoding;
use crate::error::DbError;
use crate::format;
use crate::indexes::{self, IndexDefinition, IndexDefinitions, index_sublevel};
use crate::schema::{Collection, Schema};
use crate::status::{Status, StatusCallback};

/// The sublevel holding primary records and generated config records.
pub const ROOT_SUBLEVEL: &str = "~";

/// Union-template discriminator key inside a document payload.
pub const TEMPLATE_KEY: &str = "_template";

pub(crate) const GENERATED_FOLDER: &str = ".tina/__generated__";
pub(crate) const GRAPHQL_CONFIG: &str = ".tina/__generated__/_graphql.json";
pub(crate) const SCHEMA_CONFIG: &str = ".tina/__generated__/_schema.json";
pub(crate) const LOOKUP_CONFIG: &str = ".tina/__generated__/_lookup.json";

/// Incremental reindex flushes the pending op buffer at this size
/// (checked at document boundaries so one document's ops never split
/// across batches).
const BATCH_THRESHOLD: usize = 25;

pub(crate) fn is_config_path(path: &str) -> bool {
    path.starts_with(GENERATED_FOLDER)
}

/// Forward slashes only, no leading `./` or `/`.
pub(crate) fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

#[derive(Default)]
struct Caches {
    schema: Option<Arc<Schema>>,
    lookup: Option<Arc<Value>>,
    index_definitions: Option<Arc<IndexDefinitions>>,
}

/// The engine facade: a primary record store plus schema-derived
/// secondary indexes, fed from and mirrored to a [`Bridge`].
///
/// Single-writer, many-reader: mutators serialize on an internal writer
/// mutex; readers take no locks. Within one mutating call the primary
/// record and all its index entries change in a single atomic batch.
pub struct Database<S: Store, B: Bridge> {
    pub(crate) store: S,
    pub(crate) bridge: B,
    status_callback: Option<StatusCallback>,
    writer: Mutex<()>,
    caches: RwLock<Caches>,
}

impl<S: Store, B: Bridge> Database<S, B> {
    pub fn new(store: S, bridge: B) -> Self {
        Self {
            store,
            bridge,
            status_callback: None,
            writer: Mutex::new(()),
            caches: RwLock::new(Caches::default()),
        }
    }

    /// Register a callback for long-running-operation status events.
    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.status_callback = Some(callback);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Drop the cached schema, lookup map, and index definitions; they
    /// rebuild lazily on next use.
    pub fn clear_cache(&self) {
        *self.caches.write().unwrap() = Caches::default();
    }

    fn writer_guard(&self) -> Result<MutexGuard<'_, ()>, DbError> {
        self.writer
            .lock()
            .map_err(|e| DbError::Store(StoreError::Storage(format!("writer lock poisoned: {e}"))))
    }

    fn emit(&self, status: Status) {
        if let Some(callback) = &self.status_callback {
            callback(&status);
        }
    }

    // ── Derived state ───────────────────────────────────────────

    /// The schema, read once from the `_schema.json` config record.
    pub fn schema(&self) -> Result<Arc<Schema>, DbError> {
        if let Some(schema) = self.caches.read().unwrap().schema.clone() {
            return Ok(schema);
        }
        let bytes = self
            .store
            .get(ROOT_SUBLEVEL, SCHEMA_CONFIG.as_bytes())
            .map_err(|e| {
                if e.is_not_found() {
                    DbError::Schema("schema record missing; run a full reindex first".to_string())
                } else {
                    DbError::Store(e)
                }
            })?;
        let schema: Schema =
            serde_json::from_slice(&bytes).map_err(|e| DbError::Schema(e.to_string()))?;
        let schema = Arc::new(schema);
        self.caches.write().unwrap().schema = Some(Arc::clone(&schema));
        Ok(schema)
    }

    /// The generated lookup map, read once from `_lookup.json`.
    pub fn lookup(&self) -> Result<Arc<Value>, DbError> {
        if let Some(lookup) = self.caches.read().unwrap().lookup.clone() {
            return Ok(lookup);
        }
        let bytes = self
            .store
            .get(ROOT_SUBLEVEL, LOOKUP_CONFIG.as_bytes())
            .map_err(|e| {
                if e.is_not_found() {
                    DbError::Schema("lookup record missing; run a full reindex first".to_string())
                } else {
                    DbError::Store(e)
                }
            })?;
        let lookup: Value =
            serde_json::from_slice(&bytes).map_err(|e| DbError::Schema(e.to_string()))?;
        let lookup = Arc::new(lookup);
        self.caches.write().unwrap().lookup = Some(Arc::clone(&lookup));
        Ok(lookup)
    }

    pub fn index_definitions(&self) -> Result<Arc<IndexDefinitions>, DbError> {
        if let Some(defs) = self.caches.read().unwrap().index_definitions.clone() {
            return Ok(defs);
        }
        let schema = self.schema()?;
        let defs = Arc::new(indexes::build_index_definitions(&schema));
        self.caches.write().unwrap().index_definitions = Some(Arc::clone(&defs));
        Ok(defs)
    }

    // ── Readers ─────────────────────────────────────────────────

    /// Fetch a document, reshape its body field, and annotate it with
    /// `_collection`, `_template`, `_relativePath`, and `_id`.
    pub fn get(&self, path: &str) -> Result<Value, DbError> {
        let path = normalize_path(path);
        let stored = self.get_raw(&path)?;
        if is_config_path(&path) {
            return Ok(Value::Object(stored));
        }

        let schema = self.schema()?;
        let Some(collection) = schema.collection_for_path(&path) else {
            return Ok(Value::Object(stored));
        };

        let body_field = collection
            .format
            .is_markdown_like()
            .then(|| collection.body_field())
            .flatten()
            .map(|f| f.name.clone());
        let mut doc = format::reshape_body(stored, body_field.as_deref());

        if collection.has_templates() {
            let declared = doc
                .get(TEMPLATE_KEY)
                .and_then(Value::as_str)
                .ok_or_else(|| DbError::Template(path.clone()))?;
            let template = collection
                .templates
                .iter()
                .find(|t| t.name == declared || t.short_name() == declared)
                .ok_or_else(|| DbError::Template(path.clone()))?;
            doc.insert(
                TEMPLATE_KEY.to_string(),
                Value::String(template.short_name().to_string()),
            );
        }

        let relative = path
            .strip_prefix(&format!("{}/", collection.path))
            .unwrap_or(&path)
            .to_string();
        doc.insert("_collection".to_string(), Value::String(collection.name.clone()));
        doc.insert("_relativePath".to_string(), Value::String(relative));
        doc.insert("_id".to_string(), Value::String(path));
        Ok(Value::Object(doc))
    }

    /// Fetch the stored payload without reshaping or annotation. Used by
    /// the query engine's residual lookups.
    pub(crate) fn get_raw(&self, path: &str) -> Result<Map<String, Value>, DbError> {
        let bytes = match self.store.get(ROOT_SUBLEVEL, path.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Err(DbError::NotFound(path.to_string())),
            Err(e) => return Err(e.into()),
        };
        format::as_object(serde_json::from_slice(&bytes)?)
    }

    // ── Mutators ────────────────────────────────────────────────

    /// Write a document: stringify to file form, mirror to the bridge,
    /// then apply one atomic batch replacing the primary record and
    /// every index entry (stale entries deleted via read-before-write).
    ///
    /// With `collection: None` the collection is resolved from the path;
    /// paths outside every collection root are system files and bypass
    /// indexing.
    pub fn put(&self, path: &str, data: Value, collection: Option<&str>) -> Result<(), DbError> {
        let path = normalize_path(path);
        let schema = self.schema()?;
        let collection = match collection {
            Some(name) => Some(
                schema
                    .collection(name)
                    .ok_or_else(|| DbError::MissingIndex(name.to_string()))?,
            ),
            None => schema.collection_for_path(&path),
        };
        let collection_name = collection.map(|c| c.name.clone()).unwrap_or_default();
        self.put_document(&path, data, collection)
            .map_err(|e| wrap_fetch(e, &path, &collection_name))
    }

    /// Identical write path to [`put`](Database::put) with the
    /// collection resolved from the path.
    pub fn add_pending_document(&self, path: &str, data: Value) -> Result<(), DbError> {
        self.put(path, data, None)
    }

    fn put_document(
        &self,
        path: &str,
        data: Value,
        collection: Option<&Collection>,
    ) -> Result<(), DbError> {
        let _writer = self.writer_guard()?;
        let data = format::as_object(data)?;

        let Some(collection) = collection else {
            let contents = serde_json::to_string_pretty(&Value::Object(data.clone()))?;
            self.bridge.put(path, &contents)?;
            self.store
                .put(ROOT_SUBLEVEL, path.as_bytes(), &serde_json::to_vec(&data)?)?;
            return Ok(());
        };

        if collection.has_templates()
            && !data.get(TEMPLATE_KEY).is_some_and(Value::is_string)
        {
            return Err(DbError::Template(path.to_string()));
        }

        let body_field = collection
            .format
            .is_markdown_like()
            .then(|| collection.body_field())
            .flatten()
            .map(|f| f.name.clone());

        let contents = format::stringify_file(collection.format, &data, body_field.as_deref())?;
        self.bridge.put(path, &contents)?;

        let stored = format::to_stored(data, body_field.as_deref());
        let defs = self.index_definitions()?;
        let defs = defs
            .get(&collection.name)
            .ok_or_else(|| DbError::MissingIndex(collection.name.clone()))?;
        let ops = self.document_ops(&collection.name, defs, path, Some(&stored))?;
        self.store.batch(ops)?;
        tracing::debug!(path, collection = %collection.name, "document indexed");
        Ok(())
    }

    /// Remove a document: one atomic batch deleting the primary record
    /// and every index entry, then the file via the bridge.
    pub fn delete(&self, path: &str) -> Result<(), DbError> {
        let path = normalize_path(path);
        let schema = self.schema()?;
        let collection = schema.collection_for_path(&path);
        let collection_name = collection.map(|c| c.name.clone()).unwrap_or_default();
        self.delete_document(&path, collection)
            .map_err(|e| wrap_fetch(e, &path, &collection_name))
    }

    fn delete_document(&self, path: &str, collection: Option<&Collection>) -> Result<(), DbError> {
        let _writer = self.writer_guard()?;
        match collection {
            Some(collection) => {
                let defs = self.index_definitions()?;
                let defs = defs
                    .get(&collection.name)
                    .ok_or_else(|| DbError::MissingIndex(collection.name.clone()))?;
                let ops = self.document_ops(&collection.name, defs, path, None)?;
                self.store.batch(ops)?;
            }
            None => self.store.del(ROOT_SUBLEVEL, path.as_bytes())?,
        }
        self.bridge.delete(path)?;
        Ok(())
    }

    /// Compute the batch for one logical document change: del-ops for
    /// the existing record's entries in every index (read-before-write),
    /// then put-ops for the new entries and the primary write — or the
    /// primary del when `new_payload` is `None`.
    fn document_ops(
        &self,
        collection_name: &str,
        defs: &HashMap<String, IndexDefinition>,
        path: &str,
        new_payload: Option<&Map<String, Value>>,
    ) -> Result<Vec<BatchOp>, DbError> {
        let mut ops = Vec::new();

        match self.store.get(ROOT_SUBLEVEL, path.as_bytes()) {
            Ok(bytes) => {
                if let Ok(Value::Object(old)) = serde_json::from_slice(&bytes) {
                    for (sort_key, def) in defs {
                        // An old payload the codec now refuses cannot have
                        // a matching live entry; skip its del.
                        if let Ok(key) = encoding::encode_index_key(def, path, &old) {
                            ops.push(BatchOp::del(index_sublevel(collection_name, sort_key), key));
                        }
                    }
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        match new_payload {
            Some(payload) => {
                for (sort_key, def) in defs {
                    let key = encoding::encode_index_key(def, path, payload)?;
                    ops.push(BatchOp::put(
                        index_sublevel(collection_name, sort_key),
                        key,
                        Vec::new(),
                    ));
                }
                ops.push(BatchOp::put(
                    ROOT_SUBLEVEL,
                    path.as_bytes().to_vec(),
                    serde_json::to_vec(payload)?,
                ));
            }
            None => ops.push(BatchOp::del(ROOT_SUBLEVEL, path.as_bytes().to_vec())),
        }
        Ok(ops)
    }

    // ── Reindex ─────────────────────────────────────────────────

    /// Full reindex: wipe the store, write the three generated config
    /// records, then replay every collection from the bridge.
    pub fn index_content(&self, graphql: &Value, schema: &Schema) -> Result<(), DbError> {
        self.with_status("full reindex", || self.index_content_inner(graphql, schema))
    }

    /// Incremental reindex of the given paths. Overwrites re-index via
    /// read-before-write; paths outside every collection are skipped.
    pub fn index_content_by_paths(&self, paths: &[String]) -> Result<(), DbError> {
        self.with_status("partial reindex", || self.index_by_paths_inner(paths))
    }

    /// Bulk removal of the given paths from the store. The bridge is
    /// not touched: this variant runs after files were removed upstream.
    pub fn delete_content_by_paths(&self, paths: &[String]) -> Result<(), DbError> {
        self.with_status("bulk delete", || self.delete_by_paths_inner(paths))
    }

    fn with_status(
        &self,
        operation: &str,
        run: impl FnOnce() -> Result<(), DbError>,
    ) -> Result<(), DbError> {
        self.emit(Status::InProgress);
        match run() {
            Ok(()) => {
                self.emit(Status::Complete);
                Ok(())
            }
            Err(e) => {
                tracing::error!(operation, error = %e, "operation failed");
                self.emit(Status::Failed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn index_content_inner(&self, graphql: &Value, schema: &Schema) -> Result<(), DbError> {
        let _writer = self.writer_guard()?;
        self.store.clear()?;
        self.clear_cache();

        let schema_json = serde_json::to_value(schema)?;
        let lookup = build_lookup(schema);
        for (path, value) in [
            (GRAPHQL_CONFIG, graphql),
            (SCHEMA_CONFIG, &schema_json),
            (LOOKUP_CONFIG, &lookup),
        ] {
            self.store
                .put(ROOT_SUBLEVEL, path.as_bytes(), &serde_json::to_vec(value)?)?;
            if self.bridge.supports_building() {
                self.bridge
                    .put_config(path, &serde_json::to_string_pretty(value)?)?;
            }
        }

        let defs = indexes::build_index_definitions(schema);
        let mut ops: Vec<BatchOp> = Vec::new();
        for collection in &schema.collections {
            let paths = self
                .bridge
                .glob(&collection.path, collection.format.extension())?;
            tracing::info!(collection = %collection.name, files = paths.len(), "indexing collection");
            let coll_defs = &defs[&collection.name];
            for path in paths {
                let path = normalize_path(&path);
                let contents = self.bridge.get(&path)?;
                let payload = format::parse_file(collection.format, &contents)
                    .map_err(|e| wrap_fetch(e, &path, &collection.name))?;
                // The store was just cleared: no stale entries to read.
                for (sort_key, def) in coll_defs {
                    let key = encoding::encode_index_key(def, &path, &payload)
                        .map_err(|e| wrap_fetch(e, &path, &collection.name))?;
                    ops.push(BatchOp::put(
                        index_sublevel(&collection.name, sort_key),
                        key,
                        Vec::new(),
                    ));
                }
                ops.push(BatchOp::put(
                    ROOT_SUBLEVEL,
                    path.as_bytes().to_vec(),
                    serde_json::to_vec(&payload)?,
                ));
                if ops.len() >= BATCH_THRESHOLD {
                    self.store.batch(std::mem::take(&mut ops))?;
                }
            }
        }
        if !ops.is_empty() {
            self.store.batch(ops)?;
        }
        Ok(())
    }

    fn index_by_paths_inner(&self, paths: &[String]) -> Result<(), DbError> {
        let _writer = self.writer_guard()?;
        let schema = self.schema()?;
        let defs = self.index_definitions()?;

        let mut ops: Vec<BatchOp> = Vec::new();
        for path in paths {
            let path = normalize_path(path);
            let Some(collection) = schema.collection_for_path(&path) else {
                tracing::debug!(path = %path, "skipping uncollectioned path");
                continue;
            };
            let coll_defs = defs
                .get(&collection.name)
                .ok_or_else(|| DbError::MissingIndex(collection.name.clone()))?;
            let contents = self
                .bridge
                .get(&path)
                .map_err(|e| wrap_fetch(e, &path, &collection.name))?;
            let payload = format::parse_file(collection.format, &contents)
                .map_err(|e| wrap_fetch(e, &path, &collection.name))?;
            let doc_ops = self
                .document_ops(&collection.name, coll_defs, &path, Some(&payload))
                .map_err(|e| wrap_fetch(e, &path, &collection.name))?;
            ops.extend(doc_ops);
            if ops.len() >= BATCH_THRESHOLD {
                self.store.batch(std::mem::take(&mut ops))?;
            }
        }
        if !ops.is_empty() {
            self.store.batch(ops)?;
        }
        Ok(())
    }

    fn delete_by_paths_inner(&self, paths: &[String]) -> Result<(), DbError> {
        let _writer = self.writer_guard()?;
        let schema = self.schema()?;
        let defs = self.index_definitions()?;

        let mut ops: Vec<BatchOp> = Vec::new();
        for path in paths {
            let path = normalize_path(path);
            match schema.collection_for_path(&path) {
                Some(collection) => {
                    let coll_defs = defs
                        .get(&collection.name)
                        .ok_or_else(|| DbError::MissingIndex(collection.name.clone()))?;
                    let doc_ops = self
                        .document_ops(&collection.name, coll_defs, &path, None)
                        .map_err(|e| wrap_fetch(e, &path, &collection.name))?;
                    ops.extend(doc_ops);
                }
                None => ops.push(BatchOp::del(ROOT_SUBLEVEL, path.as_bytes().to_vec())),
            }
            if ops.len() >= BATCH_THRESHOLD {
                self.store.batch(std::mem::take(&mut ops))?;
            }
        }
        if !ops.is_empty() {
            self.store.batch(ops)?;
        }
        Ok(())
    }
}

fn wrap_fetch(source: DbError, path: &str, collection: &str) -> DbError {
    // Don't double-wrap: inner helpers may already have annotated.
    if matches!(source, DbError::Fetch { .. }) {
        return source;
    }
    DbError::Fetch {
        path: path.to_string(),
        collection: collection.to_string(),
        source: Box::new(source),
    }
}

/// The generated lookup map: collection name → resolver metadata.
fn build_lookup(schema: &Schema) -> Value {
    let mut lookup = Map::new();
    for collection in &schema.collections {
        lookup.insert(
            collection.name.clone(),
            json!({
                "collection": collection.name,
                "path": collection.path,
                "format": collection.format.extension(),
                "templates": collection
                    .templates
                    .iter()
                    .map(|t| t.name.clone())
                    .collect::<Vec<_>>(),
            }),
        );
    }
    Value::Object(lookup)
}
