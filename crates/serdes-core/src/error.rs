//! Serdes error types

use thiserror::Error;

/// Errors reported by the serdes client.
///
/// Every failing operation returns one of these variants with a one-line
/// human-readable message attached. [`SerdesError::code`] exposes the
/// stable short name of each code.
#[derive(Debug, Error)]
pub enum SerdesError {
    #[error("Unknown configuration property: {0}")]
    ConfUnknown(String),

    #[error("Invalid configuration property value: {0}")]
    ConfInvalid(String),

    #[error("Invalid payload framing: {0}")]
    FramingInvalid(String),

    #[error("Schema load failed: {0}")]
    SchemaLoad(String),

    #[error("Invalid payload: {0}")]
    PayloadInvalid(String),

    #[error("Object does not match schema: {0}")]
    SchemaMismatch(String),

    #[error("Schema required to perform operation: {0}")]
    SchemaRequired(String),

    #[error("Serializer failed: {0}")]
    Serializer(String),

    #[error("Inadequate buffer size: {0}")]
    BufferSize(String),
}

impl SerdesError {
    /// Stable short name of the error code.
    pub fn code(&self) -> &'static str {
        match self {
            SerdesError::ConfUnknown(_) => "conf-unknown",
            SerdesError::ConfInvalid(_) => "conf-invalid",
            SerdesError::FramingInvalid(_) => "framing-invalid",
            SerdesError::SchemaLoad(_) => "schema-load",
            SerdesError::PayloadInvalid(_) => "payload-invalid",
            SerdesError::SchemaMismatch(_) => "schema-mismatch",
            SerdesError::SchemaRequired(_) => "schema-required",
            SerdesError::Serializer(_) => "serializer",
            SerdesError::BufferSize(_) => "buffer-size",
        }
    }
}

/// Result type for serdes operations
pub type SerdesResult<T> = Result<T, SerdesError>;
