//! Decode limits for untrusted migration URIs.

use serde::{Deserialize, Serialize};

/// Default cap on the URI length. A version-40 QR code holds at most 4296
/// alphanumeric characters, so this leaves room for any scannable payload.
pub const DEFAULT_MAX_URI_LEN: usize = 8192;
/// Default cap on submessages per payload.
pub const DEFAULT_MAX_RECORDS: usize = 512;

/// Limits applied before and while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodecOptions {
    /// Maximum accepted URI length in bytes (after trimming).
    pub max_uri_len: usize,
    /// Maximum number of OTP parameter submessages in one payload.
    pub max_records: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_uri_len: DEFAULT_MAX_URI_LEN,
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

impl CodecOptions {
    pub fn with_max_uri_len(mut self, len: usize) -> Self {
        self.max_uri_len = len;
        self
    }

    pub fn with_max_records(mut self, count: usize) -> Self {
        self.max_records = count;
        self
    }
}
