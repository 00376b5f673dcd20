//! Schema cache: lookup, registry fetch and registration.
//!
//! The cache is a pair of indices over the same owned entries: the primary
//! index keyed by registry id and an auxiliary index keyed by
//! `(type, definition bytes)`. Definition equality is raw byte equality of
//! the stored (canonicalized) bytes; two semantically identical but
//! differently formatted definitions are distinct entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{SerdesError, SerdesResult};
use crate::handle::Serdes;
use crate::schema::Schema;

/// Type tag assumed when the registry reply carries no `schemaType`.
pub const DEFAULT_SCHEMA_TYPE: &str = "AVRO";

/// Sentinel for "no id assigned yet".
const UNASSIGNED_ID: i32 = -1;

#[derive(Default)]
pub(crate) struct SchemaCache {
    by_id: HashMap<i32, Arc<Schema>>,
    by_definition: HashMap<(String, Bytes), i32>,
}

impl SchemaCache {
    fn find_by_id(&self, id: i32) -> Option<Arc<Schema>> {
        self.by_id.get(&id).cloned()
    }

    fn find_by_definition(&self, schema_type: &str, definition: &Bytes) -> Option<Arc<Schema>> {
        let key = (schema_type.to_string(), definition.clone());
        let id = self.by_definition.get(&key)?;
        self.by_id.get(id).cloned()
    }

    /// Link a resolved entry into both indices. If an entry with the same
    /// id is already linked, that one is returned and `entry` is dropped:
    /// the registry guarantees one definition per id.
    fn link(&mut self, entry: Schema) -> Arc<Schema> {
        if let Some(existing) = self.by_id.get(&entry.id()) {
            return existing.clone();
        }
        let entry = Arc::new(entry);
        self.by_id.insert(entry.id(), entry.clone());
        self.by_definition.insert(
            (entry.schema_type().to_string(), entry.definition_bytes()),
            entry.id(),
        );
        entry
    }

    fn unlink(&mut self, id: i32) -> Option<Arc<Schema>> {
        let entry = self.by_id.remove(&id)?;
        self.by_definition
            .remove(&(entry.schema_type().to_string(), entry.definition_bytes()));
        Some(entry)
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }
}

#[derive(Serialize)]
struct RegisterSchemaRequest<'a> {
    schema: &'a str,
    #[serde(rename = "schemaType", skip_serializing_if = "Option::is_none")]
    schema_type: Option<&'a str>,
}

#[derive(Deserialize)]
struct RegisterSchemaResponse {
    id: i32,
}

#[derive(Deserialize)]
struct SchemaEnvelope {
    #[serde(default)]
    id: Option<i32>,
    schema: String,
    #[serde(rename = "schemaType", default)]
    schema_type: Option<String>,
}

/// Left-trim the definition and wrap a bare JSON string literal as an
/// object-based schema (string-based schemas are rejected by some record
/// parsers, notably avro-c's). Idempotent, so re-adding an already stored
/// definition dedups correctly.
fn canonicalize_definition(definition: &[u8]) -> Bytes {
    let mut def = definition;
    while let Some((first, rest)) = def.split_first() {
        if first.is_ascii_whitespace() {
            def = rest;
        } else {
            break;
        }
    }

    if def.first() == Some(&b'"') {
        let mut wrapped = Vec::with_capacity(def.len() + 13);
        wrapped.extend_from_slice(b"{ \"type\": ");
        wrapped.extend_from_slice(def);
        wrapped.extend_from_slice(b" }");
        Bytes::from(wrapped)
    } else {
        Bytes::copy_from_slice(def)
    }
}

impl Serdes {
    /// Get and load a schema from the local cache or the remote registry.
    ///
    /// The schema may be looked up by subject `name` or by registry `id`;
    /// at least one must be given. The returned entry is fully loaded and
    /// immediately usable.
    pub fn schema_get(
        &self,
        name: Option<&str>,
        id: Option<i32>,
    ) -> SerdesResult<Arc<Schema>> {
        let id = id.filter(|&id| id != UNASSIGNED_ID);
        if name.is_none() && id.is_none() {
            return Err(SerdesError::SchemaRequired(
                "Schema name or id required".to_string(),
            ));
        }

        let mut cache = self.cache.lock();
        if let Some(id) = id {
            if let Some(entry) = cache.find_by_id(id) {
                drop(cache);
                entry.mark_used();
                return Ok(entry);
            }
        }

        let entry = self.schema_fetch(name, id)?;
        let entry = cache.link(entry);
        drop(cache);
        entry.mark_used();
        Ok(entry)
    }

    /// Add a schema to the local cache, registering it with the remote
    /// registry when it has no id yet.
    ///
    /// With a `definition`, an identical cached `(definition, type)` pair
    /// is returned as-is; otherwise the definition is loaded through the
    /// bridge and, if `id` is `None`, posted to
    /// `/subjects/{name}/versions` to obtain one. Without a `definition`
    /// the schema is fetched from the registry instead.
    ///
    /// `schema_type` defaults to `"AVRO"`; the tag is upper-cased.
    pub fn schema_add(
        &self,
        name: &str,
        id: Option<i32>,
        schema_type: Option<&str>,
        definition: Option<&[u8]>,
    ) -> SerdesResult<Arc<Schema>> {
        let id = id.filter(|&id| id != UNASSIGNED_ID);
        let schema_type = schema_type.unwrap_or(DEFAULT_SCHEMA_TYPE).to_uppercase();

        let mut cache = self.cache.lock();
        let entry = match definition {
            Some(definition) => {
                let definition = canonicalize_definition(definition);
                if let Some(existing) = cache.find_by_definition(&schema_type, &definition) {
                    existing
                } else {
                    let mut entry = self.schema_load(
                        Some(name),
                        id.unwrap_or(UNASSIGNED_ID),
                        schema_type,
                        &definition,
                    )?;
                    if entry.id() == UNASSIGNED_ID {
                        let assigned =
                            self.schema_store(name, entry.schema_type(), entry.definition())?;
                        entry.assign_id(assigned);
                    }
                    cache.link(entry)
                }
            }
            None => {
                let entry = self.schema_fetch(Some(name), id)?;
                cache.link(entry)
            }
        };
        drop(cache);
        entry.mark_used();
        Ok(entry)
    }

    /// Remove a schema from the cache.
    ///
    /// The entry's codec object is handed back to the bridge once the last
    /// reference to the entry is gone. Returns whether the schema was
    /// cached.
    pub fn schema_remove(&self, schema: &Schema) -> bool {
        self.cache.lock().unlink(schema.id()).is_some()
    }

    /// Purge schemas that have not been used for `max_age`.
    ///
    /// Returns the number of schemas removed.
    pub fn schemas_purge(&self, max_age: Duration) -> usize {
        let Some(expiry) = Instant::now().checked_sub(max_age) else {
            return 0;
        };

        let mut cache = self.cache.lock();
        let expired: Vec<i32> = cache
            .by_id
            .values()
            .filter(|entry| entry.last_used() < expiry)
            .map(|entry| entry.id())
            .collect();
        for id in &expired {
            cache.unlink(*id);
        }
        expired.len()
    }

    /// Number of schemas currently cached.
    pub fn schema_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// Fetch a schema definition from the registry and load it.
    fn schema_fetch(&self, name: Option<&str>, id: Option<i32>) -> SerdesResult<Schema> {
        if !self.rest.has_urls() {
            return Err(SerdesError::SchemaLoad(format!(
                "Unable to load schema {} from registry: no \"schema.registry.url\" configured",
                describe(name, id)
            )));
        }

        let response = match (id, name) {
            (Some(id), _) => self.rest.get(&format!("/schemas/ids/{}", id)),
            (None, Some(name)) => self.rest.get(&format!(
                "/subjects/{}/versions/latest",
                urlencoding::encode(name)
            )),
            (None, None) => {
                return Err(SerdesError::SchemaRequired(
                    "Schema name or id required".to_string(),
                ))
            }
        };

        if response.failed() {
            return Err(SerdesError::SchemaLoad(response.error_string()));
        }

        let envelope: SchemaEnvelope = serde_json::from_slice(&response.body).map_err(|e| {
            SerdesError::SchemaLoad(format!("Failed to read schema envelope: {}", e))
        })?;

        let id = match (id, envelope.id) {
            (Some(id), _) => id,
            (None, Some(id)) => id,
            (None, None) => {
                return Err(SerdesError::SchemaLoad(format!(
                    "No \"id\" int field in subject \"{}\" envelope",
                    name.unwrap_or("")
                )))
            }
        };

        let schema_type = envelope
            .schema_type
            .map(|t| t.to_uppercase())
            .unwrap_or_else(|| DEFAULT_SCHEMA_TYPE.to_string());

        let entry = self.schema_load(name, id, schema_type, envelope.schema.as_bytes())?;

        self.dbg("SCHEMA_FETCH", || {
            format!(
                "Successfully fetched schema {} id {}",
                name.unwrap_or("(unknown-name)"),
                id
            )
        });

        Ok(entry)
    }

    /// Canonicalize and bridge-load a definition into an unlinked entry.
    fn schema_load(
        &self,
        name: Option<&str>,
        id: i32,
        schema_type: String,
        definition: &[u8],
    ) -> SerdesResult<Schema> {
        let definition = canonicalize_definition(definition);

        self.dbg("SCHEMA_LOAD", || {
            format!(
                "Received schema {} ({}) definition: {}",
                name.unwrap_or("(unknown-name)"),
                id,
                String::from_utf8_lossy(&definition)
            )
        });

        let object = self
            .loader
            .load(&schema_type, &definition)
            .map_err(|e| {
                self.dbg("SCHEMA_LOAD", || {
                    format!("Schema load of {} failed: {}", name.unwrap_or("(unknown-name)"), e)
                });
                SerdesError::SchemaLoad(e)
            })?;

        Ok(Schema::new(
            id,
            name.map(str::to_string),
            schema_type,
            definition,
            object,
            self.loader.clone(),
        ))
    }

    /// Store a schema definition at the registry; returns the assigned id.
    fn schema_store(&self, name: &str, schema_type: &str, definition: &[u8]) -> SerdesResult<i32> {
        if !self.rest.has_urls() {
            return Err(SerdesError::SchemaLoad(format!(
                "Unable to store schema \"{}\" at registry: no \"schema.registry.url\" configured",
                name
            )));
        }

        let schema = std::str::from_utf8(definition).map_err(|e| {
            SerdesError::SchemaLoad(format!("Schema definition is not valid UTF-8: {}", e))
        })?;

        // The registry assumes AVRO when the type is omitted.
        let request = RegisterSchemaRequest {
            schema,
            schema_type: (schema_type != DEFAULT_SCHEMA_TYPE).then_some(schema_type),
        };
        let body = serde_json::to_vec(&request).map_err(|e| {
            SerdesError::SchemaLoad(format!("Failed to encode schema envelope: {}", e))
        })?;

        let response = self.rest.post(
            &format!("/subjects/{}/versions", urlencoding::encode(name)),
            &body,
        );
        if response.failed() {
            return Err(SerdesError::SchemaLoad(response.error_string()));
        }

        let reply: RegisterSchemaResponse =
            serde_json::from_slice(&response.body).map_err(|e| {
                SerdesError::SchemaLoad(format!("Failed to read schema id: {}", e))
            })?;

        self.dbg("SCHEMA_STORE", || {
            format!("Registered schema \"{}\" as id {}", name, reply.id)
        });

        Ok(reply.id)
    }
}

fn describe(name: Option<&str>, id: Option<i32>) -> String {
    match (name, id) {
        (Some(name), Some(id)) => format!("\"{}\" ({})", name, id),
        (Some(name), None) => format!("\"{}\"", name),
        (None, Some(id)) => id.to_string(),
        (None, None) => "(unspecified)".to_string(),
    }
}
