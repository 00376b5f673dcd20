//! # serdes-core
//!
//! Client core for producing and consuming records whose payloads carry an
//! explicit schema identity. Writers register a schema with a central
//! schema-registry service, cache the assigned id and prepend a short
//! magic-plus-id header to each payload; readers strip the header, resolve
//! the schema through the same cache and decode the body against it.
//!
//! This crate is format-agnostic: record-level encode/decode is injected
//! through the [`SchemaLoader`] bridge. Use `serdes-avro` for the Avro
//! binding.
//!
//! ## Wire format
//!
//! With CP1 framing (the default), every payload starts with a 5-byte
//! header:
//!
//! ```text
//! [0x00][schema_id: 4 bytes big-endian][record body]
//! ```
//!
//! ## Registry protocol
//!
//! The client speaks the Confluent-compatible subset it needs:
//!
//! - `GET /schemas/ids/{id}`
//! - `GET /subjects/{name}/versions/latest`
//! - `POST /subjects/{name}/versions`
//!
//! `schema.registry.url` accepts a comma-separated list of base URLs;
//! transport-level failures rotate to the next endpoint, server-reported
//! errors do not. Every call is a synchronous blocking HTTP exchange; the
//! library spawns no threads of its own.
//!
//! ## Example
//!
//! ```rust,ignore
//! use serdes_core::{Serdes, SerdesConfig};
//!
//! let mut conf = SerdesConfig::new();
//! conf.set("schema.registry.url", "http://localhost:8081")?;
//! conf.set_schema_loader(my_loader);
//!
//! let serdes = Serdes::new(conf)?;
//! let schema = serdes.schema_get(Some("users-value"), None)?;
//! ```

mod cache;
pub mod config;
pub mod error;
pub mod framing;
pub mod handle;
pub mod loader;
pub mod rest;
pub mod schema;
pub mod urls;

pub use cache::DEFAULT_SCHEMA_TYPE;
pub use config::{Framing, LogCallback, SerdesConfig, LOG_DEBUG};
pub use error::{SerdesError, SerdesResult};
pub use framing::{cp1_read, cp1_write, CP1_FRAMING_SIZE};
pub use handle::Serdes;
pub use loader::{SchemaLoader, SchemaObject};
pub use rest::{RestClient, RestResponse, SCHEMA_REGISTRY_V1_JSON};
pub use schema::Schema;
pub use urls::UrlRing;
