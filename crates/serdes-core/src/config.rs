//! Handle configuration.
//!
//! A [`SerdesConfig`] is built incrementally through [`SerdesConfig::set`]
//! and the typed setters, then consumed by [`Serdes::new`](crate::Serdes::new).
//! The handle keeps its own copy; the object is logically frozen from that
//! point on.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{SerdesError, SerdesResult};
use crate::framing::CP1_FRAMING_SIZE;
use crate::loader::SchemaLoader;
use crate::urls::UrlRing;

/// Payload framing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// No framing; the application must know the schema out of band.
    None,
    /// Confluent Platform framing: one magic byte plus the 32-bit
    /// big-endian schema id.
    #[default]
    Cp1,
}

impl Framing {
    /// Extra bytes this framing adds to a payload.
    pub fn size(self) -> usize {
        match self {
            Framing::None => 0,
            Framing::Cp1 => CP1_FRAMING_SIZE,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Framing::None),
            "cp1" => Some(Framing::Cp1),
            _ => None,
        }
    }
}

/// Log sink: receives a syslog-style level, a facility tag and a
/// pre-formatted line.
pub type LogCallback = dyn Fn(i32, &str, &str) + Send + Sync;

/// Level passed to the log sink for debug lines.
pub const LOG_DEBUG: i32 = 7;

/// Configuration consumed by a serdes handle.
#[derive(Clone, Default)]
pub struct SerdesConfig {
    pub(crate) registry_urls: Option<UrlRing>,
    pub(crate) serializer_framing: Framing,
    pub(crate) deserializer_framing: Framing,
    pub(crate) debug: bool,
    pub(crate) loader: Option<Arc<dyn SchemaLoader>>,
    pub(crate) log_cb: Option<Arc<LogCallback>>,
    pub(crate) opaque: Option<Arc<dyn Any + Send + Sync>>,
}

impl SerdesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `(name, value)` pairs, applying each
    /// through [`set`](Self::set).
    pub fn with_settings<'a, I>(settings: I) -> SerdesResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut conf = Self::default();
        for (name, value) in settings {
            conf.set(name, value)?;
        }
        Ok(conf)
    }

    /// Set a single configuration property.
    ///
    /// Recognized keys: `schema.registry.url` (CSV of base URLs),
    /// `serializer.framing` / `deserializer.framing` (`cp1`, `none`),
    /// `debug` (`all`, `none`, ``).
    pub fn set(&mut self, name: &str, value: &str) -> SerdesResult<()> {
        match name {
            "schema.registry.url" => {
                self.registry_urls = Some(UrlRing::parse(value)?);
            }
            "serializer.framing" | "deserializer.framing" => {
                let framing = Framing::parse(value).ok_or_else(|| {
                    SerdesError::ConfInvalid(format!(
                        "Invalid value \"{}\" for {}, allowed values: cp1, none",
                        value, name
                    ))
                })?;
                if name == "serializer.framing" {
                    self.serializer_framing = framing;
                } else {
                    self.deserializer_framing = framing;
                }
            }
            "debug" => {
                self.debug = match value {
                    "all" => true,
                    "" | "none" => false,
                    _ => {
                        return Err(SerdesError::ConfInvalid(format!(
                            "Invalid value \"{}\" for debug, allowed values: all, none",
                            value
                        )))
                    }
                };
            }
            _ => {
                return Err(SerdesError::ConfUnknown(format!(
                    "Unknown configuration property \"{}\"",
                    name
                )))
            }
        }
        Ok(())
    }

    /// Install the log sink used for serdes-originated log lines.
    ///
    /// Without one, debug lines go to `tracing` at debug level.
    pub fn set_log_callback(&mut self, log_cb: Arc<LogCallback>) {
        self.log_cb = Some(log_cb);
    }

    /// Install the schema load/unload bridge.
    pub fn set_schema_loader(&mut self, loader: Arc<dyn SchemaLoader>) {
        self.loader = Some(loader);
    }

    pub fn schema_loader(&self) -> Option<&Arc<dyn SchemaLoader>> {
        self.loader.as_ref()
    }

    /// Attach an application value made available to callbacks via
    /// [`opaque`](Self::opaque).
    pub fn set_opaque(&mut self, opaque: Arc<dyn Any + Send + Sync>) {
        self.opaque = Some(opaque);
    }

    pub fn opaque(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.opaque.as_ref()
    }

    pub fn serializer_framing(&self) -> Framing {
        self.serializer_framing
    }

    pub fn deserializer_framing(&self) -> Framing {
        self.deserializer_framing
    }
}

impl fmt::Debug for SerdesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdesConfig")
            .field("registry_urls", &self.registry_urls)
            .field("serializer_framing", &self.serializer_framing)
            .field("deserializer_framing", &self.deserializer_framing)
            .field("debug", &self.debug)
            .field("has_loader", &self.loader.is_some())
            .field("has_log_cb", &self.log_cb.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KNOWN_KEYS: [&str; 4] = [
        "schema.registry.url",
        "serializer.framing",
        "deserializer.framing",
        "debug",
    ];

    #[test]
    fn test_defaults() {
        let conf = SerdesConfig::new();
        assert_eq!(conf.serializer_framing(), Framing::Cp1);
        assert_eq!(conf.deserializer_framing(), Framing::Cp1);
        assert!(!conf.debug);
        assert!(conf.registry_urls.is_none());
    }

    #[test]
    fn test_set_framing() {
        let mut conf = SerdesConfig::new();
        conf.set("serializer.framing", "none").unwrap();
        assert_eq!(conf.serializer_framing(), Framing::None);
        assert_eq!(conf.deserializer_framing(), Framing::Cp1);

        conf.set("deserializer.framing", "none").unwrap();
        assert_eq!(conf.deserializer_framing(), Framing::None);

        let err = conf.set("serializer.framing", "cp2").unwrap_err();
        assert_eq!(err.code(), "conf-invalid");
    }

    #[test]
    fn test_set_debug() {
        let mut conf = SerdesConfig::new();
        conf.set("debug", "all").unwrap();
        assert!(conf.debug);
        conf.set("debug", "").unwrap();
        assert!(!conf.debug);
        conf.set("debug", "all").unwrap();
        conf.set("debug", "none").unwrap();
        assert!(!conf.debug);
        assert_eq!(conf.set("debug", "some").unwrap_err().code(), "conf-invalid");
    }

    #[test]
    fn test_set_registry_url() {
        let mut conf = SerdesConfig::new();
        conf.set("schema.registry.url", "http://a:8081,http://b:8081")
            .unwrap();
        assert_eq!(conf.registry_urls.as_ref().unwrap().len(), 2);
        assert_eq!(
            conf.set("schema.registry.url", "").unwrap_err().code(),
            "conf-invalid"
        );
    }

    #[test]
    fn test_with_settings() {
        let conf = SerdesConfig::with_settings([
            ("schema.registry.url", "http://localhost:8081"),
            ("serializer.framing", "none"),
        ])
        .unwrap();
        assert_eq!(conf.serializer_framing(), Framing::None);
        assert_eq!(conf.registry_urls.as_ref().unwrap().len(), 1);

        let err = SerdesConfig::with_settings([("debug", "verbose")]).unwrap_err();
        assert_eq!(err.code(), "conf-invalid");
    }

    #[test]
    fn test_unknown_key() {
        let mut conf = SerdesConfig::new();
        let err = conf.set("compression.codec", "snappy").unwrap_err();
        assert_eq!(err.code(), "conf-unknown");
    }

    #[test]
    fn test_framing_sizes() {
        assert_eq!(Framing::None.size(), 0);
        assert_eq!(Framing::Cp1.size(), 5);
    }

    proptest! {
        /// `set` reports conf-unknown exactly for keys outside the
        /// enumerated set, regardless of the value.
        #[test]
        fn test_conf_unknown_iff_unknown_key(key in "[a-z.]{0,30}", value in "[a-z0-9:,/]{0,20}") {
            let mut conf = SerdesConfig::new();
            let unknown = matches!(conf.set(&key, &value), Err(SerdesError::ConfUnknown(_)));
            prop_assert_eq!(unknown, !KNOWN_KEYS.contains(&key.as_str()));
        }
    }
}
