//! Pluggable codec bridge.
//!
//! The core never parses schema definitions itself. A [`SchemaLoader`]
//! turns an on-wire definition into whatever in-memory representation the
//! record-level codec needs; the cache stores that object opaquely on the
//! entry and hands it back for unloading when the entry is destroyed.
//! `serdes-avro` supplies the default binding.

use std::any::Any;

/// Opaque in-memory schema object produced by [`SchemaLoader::load`].
pub type SchemaObject = Box<dyn Any + Send + Sync>;

/// Load/unload capability pair injected through the configuration.
///
/// Implementations must be thread-compatible: callbacks run on whichever
/// caller thread triggered the cache operation.
pub trait SchemaLoader: Send + Sync {
    /// Parse `definition` into the format's in-memory schema object.
    ///
    /// `Ok(None)` means the format needs no in-memory representation for
    /// this type tag. Failure is signalled by returning the one-line error
    /// message; implementations must not panic across this boundary.
    fn load(&self, schema_type: &str, definition: &[u8])
        -> Result<Option<SchemaObject>, String>;

    /// Release an object previously returned by [`load`](Self::load).
    ///
    /// Invoked exactly once per entry destruction. The default just drops
    /// the object.
    fn unload(&self, object: SchemaObject) {
        drop(object);
    }
}
