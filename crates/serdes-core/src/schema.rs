//! Cached schema entries.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::loader::{SchemaLoader, SchemaObject};

/// One cached schema: registry id, optional subject name, type tag,
/// definition bytes and the bridge-loaded codec object.
///
/// Entries are immutable once resolved; only the last-used timestamp
/// changes, under its own lock. Dropping an entry hands the codec object
/// back to the loader that produced it.
pub struct Schema {
    id: i32,
    name: Option<String>,
    schema_type: String,
    definition: Bytes,
    object: Option<SchemaObject>,
    last_used: Mutex<Instant>,
    loader: Arc<dyn SchemaLoader>,
}

impl Schema {
    pub(crate) fn new(
        id: i32,
        name: Option<String>,
        schema_type: String,
        definition: Bytes,
        object: Option<SchemaObject>,
        loader: Arc<dyn SchemaLoader>,
    ) -> Self {
        Self {
            id,
            name,
            schema_type,
            definition,
            object,
            last_used: Mutex::new(Instant::now()),
            loader,
        }
    }

    /// Registry id of the schema.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Subject name, if known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Type tag, e.g. `"AVRO"`.
    pub fn schema_type(&self) -> &str {
        &self.schema_type
    }

    /// The schema definition as stored (left-trimmed, possibly wrapped).
    pub fn definition(&self) -> &[u8] {
        &self.definition
    }

    /// The object produced by the bridge's load callback, if any.
    pub fn object(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.object.as_deref()
    }

    /// Only valid before the entry is linked into the cache.
    pub(crate) fn assign_id(&mut self, id: i32) {
        self.id = id;
    }

    pub(crate) fn definition_bytes(&self) -> Bytes {
        self.definition.clone()
    }

    pub(crate) fn mark_used(&self) {
        *self.last_used.lock() = Instant::now();
    }

    pub(crate) fn last_used(&self) -> Instant {
        *self.last_used.lock()
    }
}

impl Drop for Schema {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            self.loader.unload(object);
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("schema_type", &self.schema_type)
            .field("definition_len", &self.definition.len())
            .field("has_object", &self.object.is_some())
            .finish()
    }
}
