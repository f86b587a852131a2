//! Migration crate: sub-modules.

pub mod types;
pub mod config;
pub mod varint;
pub mod base32;
pub mod field;
pub mod payload;

// Re-export top-level items for convenience.
pub use config::CodecOptions;
pub use payload::{
    decode, decode_or_empty, decode_payload, encode, encode_payload, is_migration_uri,
    MigrationCodec,
};
pub use types::*;
