//! # serdes-avro
//!
//! Avro serializer/deserializer over the `serdes-core` schema-registry
//! client. Serialization validates the value against the entry's Avro
//! schema and prepends the configured framing; deserialization strips the
//! framing, resolves the schema by id through the registry cache and
//! decodes the body with it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use serdes_avro::AvroSerdes;
//! use serdes_core::SerdesConfig;
//! use apache_avro::types::Value;
//!
//! let mut conf = SerdesConfig::new();
//! conf.set("schema.registry.url", "http://localhost:8081")?;
//!
//! let serdes = AvroSerdes::new(conf)?;
//! let schema = serdes.handle().schema_add("users-value", None, None, Some(definition))?;
//!
//! let payload = serdes.serialize(&schema, &value)?;
//! let (decoded, schema) = serdes.deserialize(&payload)?;
//! ```

use std::sync::Arc;

use apache_avro::types::Value;
use apache_avro::{from_avro_datum, to_avro_datum, Schema as AvroSchema};

use serdes_core::{
    Schema, SchemaLoader, SchemaObject, Serdes, SerdesConfig, SerdesError, SerdesResult,
    DEFAULT_SCHEMA_TYPE,
};

/// Default codec bridge: parses `AVRO` definitions with `apache-avro`.
///
/// Entries with any other type tag get no in-memory object; they can still
/// be cached and inspected, but not encoded or decoded by [`AvroSerdes`].
pub struct AvroLoader;

impl SchemaLoader for AvroLoader {
    fn load(&self, schema_type: &str, definition: &[u8]) -> Result<Option<SchemaObject>, String> {
        if schema_type != DEFAULT_SCHEMA_TYPE {
            return Ok(None);
        }

        let definition = std::str::from_utf8(definition)
            .map_err(|e| format!("Schema definition is not valid UTF-8: {}", e))?;

        match AvroSchema::parse_str(definition) {
            Ok(schema) => Ok(Some(Box::new(schema))),
            Err(e) => {
                tracing::debug!(error = %e, "Avro schema parse failed");
                Err(e.to_string())
            }
        }
    }
}

/// The Avro schema object attached to a cache entry, if the entry was
/// loaded by [`AvroLoader`].
pub fn avro_schema(schema: &Schema) -> Option<&AvroSchema> {
    schema.object()?.downcast_ref::<AvroSchema>()
}

/// Avro serializer/deserializer handle.
pub struct AvroSerdes {
    serdes: Serdes,
}

impl AvroSerdes {
    /// Create a handle, consuming `conf`. Installs [`AvroLoader`] when the
    /// configuration carries no schema loader of its own.
    pub fn new(mut conf: SerdesConfig) -> SerdesResult<Self> {
        if conf.schema_loader().is_none() {
            conf.set_schema_loader(Arc::new(AvroLoader));
        }
        Ok(Self {
            serdes: Serdes::new(conf)?,
        })
    }

    /// The underlying generic handle (schema cache, registry access).
    pub fn handle(&self) -> &Serdes {
        &self.serdes
    }

    /// Serialize `value` with `schema`, prepending the configured framing.
    ///
    /// The value is validated against the schema; a value that does not
    /// match fails with schema-mismatch.
    pub fn serialize(&self, schema: &Arc<Schema>, value: &Value) -> SerdesResult<Vec<u8>> {
        let body = self.encode_body(schema, value)?;
        let framing_size = self.serdes.serializer_framing_size();

        let mut payload = vec![0u8; framing_size];
        self.serdes.framing_write(schema, &mut payload)?;
        payload.extend_from_slice(&body);

        Ok(payload)
    }

    /// Serialize into a caller-provided buffer; returns the bytes written.
    ///
    /// Fails with buffer-size when `payload` cannot hold the framing plus
    /// the encoded body, writing nothing.
    pub fn serialize_into(
        &self,
        schema: &Arc<Schema>,
        value: &Value,
        payload: &mut [u8],
    ) -> SerdesResult<usize> {
        let body = self.encode_body(schema, value)?;
        let framing_size = self.serdes.serializer_framing_size();
        let needed = framing_size + body.len();

        if payload.len() < needed {
            return Err(SerdesError::BufferSize(format!(
                "Provided buffer size {} < required buffer size {}",
                payload.len(),
                needed
            )));
        }

        self.serdes.framing_write(schema, payload)?;
        payload[framing_size..needed].copy_from_slice(&body);

        Ok(needed)
    }

    /// Deserialize a framed payload, resolving its schema by id.
    ///
    /// Requires `deserializer.framing`: without framing there is no schema
    /// id to look up, and the caller must use
    /// [`deserialize_with_schema`](Self::deserialize_with_schema) instead.
    pub fn deserialize(&self, payload: &[u8]) -> SerdesResult<(Value, Arc<Schema>)> {
        let mut body = payload;
        let (_, schema) = self.serdes.framing_read(&mut body)?;

        let Some(schema) = schema else {
            return Err(SerdesError::SchemaRequired(
                "\"deserializer.framing\" not configured".to_string(),
            ));
        };

        let value = self.decode_body(&schema, body)?;
        Ok((value, schema))
    }

    /// Deserialize an unframed `payload` against a known `schema`.
    pub fn deserialize_with_schema(
        &self,
        schema: &Arc<Schema>,
        payload: &[u8],
    ) -> SerdesResult<Value> {
        self.decode_body(schema, payload)
    }

    fn entry_schema<'a>(&self, schema: &'a Schema) -> SerdesResult<&'a AvroSchema> {
        avro_schema(schema).ok_or_else(|| {
            SerdesError::Serializer(format!(
                "Schema {} carries no Avro schema object (type {})",
                schema.id(),
                schema.schema_type()
            ))
        })
    }

    fn encode_body(&self, schema: &Schema, value: &Value) -> SerdesResult<Vec<u8>> {
        let avro = self.entry_schema(schema)?;
        let resolved = value
            .clone()
            .resolve(avro)
            .map_err(|e| SerdesError::SchemaMismatch(e.to_string()))?;
        to_avro_datum(avro, resolved).map_err(|e| SerdesError::Serializer(e.to_string()))
    }

    fn decode_body(&self, schema: &Schema, mut body: &[u8]) -> SerdesResult<Value> {
        let avro = self.entry_schema(schema)?;
        from_avro_datum(avro, &mut body, None)
            .map_err(|e| SerdesError::PayloadInvalid(e.to_string()))
    }
}
