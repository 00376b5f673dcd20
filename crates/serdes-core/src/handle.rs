//! The serializer/deserializer handle.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::SchemaCache;
use crate::config::{Framing, SerdesConfig, LOG_DEBUG};
use crate::error::{SerdesError, SerdesResult};
use crate::framing;
use crate::framing::CP1_FRAMING_SIZE;
use crate::loader::SchemaLoader;
use crate::rest::RestClient;
use crate::schema::Schema;

/// Top-level serdes handle: owns the schema cache, a URL ring copy and the
/// codec bridge.
///
/// A handle is created from a [`SerdesConfig`] and owns every schema it
/// caches; dropping the handle destroys them all. Handles are `Send +
/// Sync`; cache mutation is serialized by an internal lock.
pub struct Serdes {
    pub(crate) conf: SerdesConfig,
    pub(crate) loader: Arc<dyn SchemaLoader>,
    pub(crate) cache: Mutex<SchemaCache>,
    pub(crate) rest: RestClient,
}

impl std::fmt::Debug for Serdes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serdes").field("conf", &self.conf).finish_non_exhaustive()
    }
}

impl Serdes {
    /// Create a new handle, consuming `conf`.
    ///
    /// Fails when no schema loader is configured: the core does not parse
    /// any record format itself. Format crates such as `serdes-avro`
    /// install a default loader.
    pub fn new(conf: SerdesConfig) -> SerdesResult<Self> {
        let loader = conf.loader.clone().ok_or_else(|| {
            SerdesError::ConfInvalid(
                "No schema loader configured and no default available".to_string(),
            )
        })?;
        let rest = RestClient::new(conf.registry_urls.clone());

        Ok(Self {
            conf,
            loader,
            cache: Mutex::new(SchemaCache::default()),
            rest,
        })
    }

    /// The handle's configuration copy.
    pub fn config(&self) -> &SerdesConfig {
        &self.conf
    }

    /// Extra bytes the configured serializer framing needs.
    pub fn serializer_framing_size(&self) -> usize {
        self.conf.serializer_framing.size()
    }

    /// Extra bytes the configured deserializer framing needs.
    pub fn deserializer_framing_size(&self) -> usize {
        self.conf.deserializer_framing.size()
    }

    /// Write serializer framing for `schema` into the head of `payload`.
    ///
    /// Returns the number of bytes written (0 with framing `none`).
    pub fn framing_write(&self, schema: &Schema, payload: &mut [u8]) -> SerdesResult<usize> {
        match self.conf.serializer_framing {
            Framing::None => Ok(0),
            Framing::Cp1 => framing::cp1_write(schema.id(), payload),
        }
    }

    /// Read deserializer framing from `payload` and resolve the schema it
    /// names, fetching it from the registry when not cached.
    ///
    /// On success the slice is advanced past the framing and the byte
    /// count is returned together with the schema. With framing `none`
    /// the payload is left untouched and `(0, None)` is returned: the
    /// caller must already know the schema.
    pub fn framing_read<'a>(
        &self,
        payload: &mut &'a [u8],
    ) -> SerdesResult<(usize, Option<Arc<Schema>>)> {
        match self.conf.deserializer_framing {
            Framing::None => Ok((0, None)),
            Framing::Cp1 => {
                let id = framing::cp1_read(payload)?;
                let schema = self.schema_get(None, Some(id))?;
                Ok((CP1_FRAMING_SIZE, Some(schema)))
            }
        }
    }

    /// Emit a log line through the configured sink, or `tracing` when no
    /// sink is installed.
    pub(crate) fn log(&self, level: i32, facility: &str, line: &str) {
        match &self.conf.log_cb {
            Some(log_cb) => log_cb(level, facility, line),
            None => tracing::debug!(target: "serdes", facility, "{}", line),
        }
    }

    /// Debug-gated logging; the line is only formatted when enabled.
    pub(crate) fn dbg(&self, facility: &str, line: impl FnOnce() -> String) {
        if self.conf.debug {
            self.log(LOG_DEBUG, facility, &line());
        }
    }
}
