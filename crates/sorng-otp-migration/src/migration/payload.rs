//! `otpauth-migration://offline?data=…` payloads.
//!
//! The `data` parameter is percent-encoded standard base64 of a protobuf
//! message. The outer message repeats field 1 (one OTP parameter
//! submessage per credential) and carries batch metadata in fields 2–5:
//!   2: version (varint)
//!   3: batch size (varint)
//!   4: batch index (varint)
//!   5: batch id (varint)
//!
//! Decoding is strict about structure and lenient about content: unknown
//! fields are skipped, but any framing error fails the whole payload so a
//! corrupt scan never yields a partial list.

use base64::Engine;
use rand::RngCore;

use crate::migration::config::CodecOptions;
use crate::migration::field::{FieldReader, FieldWriter};
use crate::migration::types::*;

pub const MIGRATION_SCHEME: &str = "otpauth-migration";
pub const MIGRATION_HOST: &str = "offline";
pub const DATA_PARAM: &str = "data";

// Outer message.
const FIELD_OTP_PARAMETERS: u32 = 1;
const FIELD_VERSION: u32 = 2;
const FIELD_BATCH_SIZE: u32 = 3;
const FIELD_BATCH_INDEX: u32 = 4;
const FIELD_BATCH_ID: u32 = 5;

// OTP parameter submessage.
const FIELD_SECRET: u32 = 1;
const FIELD_NAME: u32 = 2;
const FIELD_ISSUER: u32 = 3;
const FIELD_ALGORITHM: u32 = 4;
const FIELD_DIGITS: u32 = 5;
const FIELD_TYPE: u32 = 6;
const FIELD_COUNTER: u32 = 7;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Codec
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Migration codec with configurable decode limits.
#[derive(Debug, Clone, Default)]
pub struct MigrationCodec {
    pub options: CodecOptions,
}

impl MigrationCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    /// Encode records into a migration URI.
    ///
    /// The batch id is drawn from `rng`; everything else is deterministic.
    pub fn encode<R: RngCore + ?Sized>(
        &self,
        records: &[CredentialRecord],
        rng: &mut R,
    ) -> Result<String, MigrationError> {
        if records.is_empty() {
            return Err(MigrationError::new(
                MigrationErrorKind::EmptyResult,
                "No records to export",
            ));
        }
        if records.len() > self.options.max_records {
            return Err(MigrationError::new(
                MigrationErrorKind::InputTooLarge,
                format!("Cannot export more than {} records", self.options.max_records),
            )
            .with_detail(format!("{} requested", records.len())));
        }

        let payload = MigrationPayload::from_records(records, rng.next_u32())?;
        let uri = payload_to_uri(&encode_payload(&payload));

        if uri.len() > self.options.max_uri_len {
            return Err(MigrationError::new(
                MigrationErrorKind::InputTooLarge,
                "Export does not fit in one migration URI",
            )
            .with_detail(format!("{} bytes, limit {}", uri.len(), self.options.max_uri_len)));
        }
        log::debug!("Encoded {} records into migration URI", records.len());
        Ok(uri)
    }

    /// Decode a migration URI into records with fresh ids.
    ///
    /// Fails with `EmptyResult` when the payload is well-formed but holds no
    /// usable record.
    pub fn decode(&self, uri: &str) -> Result<Vec<CredentialRecord>, MigrationError> {
        let result = self
            .uri_to_payload_bytes(uri)
            .and_then(|bytes| self.decode_payload(&bytes))
            .and_then(|payload| {
                let records = payload.to_records();
                if records.is_empty() {
                    Err(MigrationError::new(
                        MigrationErrorKind::EmptyResult,
                        "Migration payload contains no usable records",
                    )
                    .with_detail(format!("{} entries found", payload.otp_parameters.len())))
                } else {
                    Ok(records)
                }
            });
        match &result {
            Ok(records) => log::debug!("Decoded {} records from migration URI", records.len()),
            Err(e) => log::debug!("Rejected migration URI: {:?}", e.kind),
        }
        result
    }

    /// Like [`decode`](Self::decode), collapsing every failure to an empty
    /// list.
    pub fn decode_or_empty(&self, uri: &str) -> Vec<CredentialRecord> {
        self.decode(uri).unwrap_or_default()
    }

    /// Extract and base64-decode the `data` parameter.
    pub fn uri_to_payload_bytes(&self, uri: &str) -> Result<Vec<u8>, MigrationError> {
        let trimmed = uri.trim();
        if trimmed.len() > self.options.max_uri_len {
            return Err(MigrationError::new(
                MigrationErrorKind::InputTooLarge,
                "Migration URI is too long",
            )
            .with_detail(format!("{} bytes, limit {}", trimmed.len(), self.options.max_uri_len)));
        }

        let url = url::Url::parse(trimmed).map_err(|e| {
            MigrationError::new(MigrationErrorKind::MalformedUri, format!("Invalid URI: {}", e))
        })?;

        if url.scheme() != MIGRATION_SCHEME {
            return Err(MigrationError::new(
                MigrationErrorKind::MalformedUri,
                format!("Expected scheme '{}', got '{}'", MIGRATION_SCHEME, url.scheme()),
            ));
        }
        if !url
            .host_str()
            .is_some_and(|h| h.eq_ignore_ascii_case(MIGRATION_HOST))
        {
            return Err(MigrationError::new(
                MigrationErrorKind::MalformedUri,
                format!("Expected host '{}', got {:?}", MIGRATION_HOST, url.host_str()),
            ));
        }

        let data = url
            .query_pairs()
            .find(|(k, _)| k == DATA_PARAM)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                MigrationError::new(
                    MigrationErrorKind::MissingDataParameter,
                    "No 'data=' parameter found",
                )
            })?;

        // Base64 has no spaces, so any here were an unescaped '+'.
        base64_decode(&data.replace(' ', "+"))
    }

    /// Parse the binary payload.
    pub fn decode_payload(&self, data: &[u8]) -> Result<MigrationPayload, MigrationError> {
        let mut payload = MigrationPayload {
            otp_parameters: Vec::new(),
            version: 0,
            batch_size: 0,
            batch_index: 0,
            batch_id: 0,
        };

        for field in FieldReader::new(data) {
            let field = field?;
            // Metadata fields are int32 on the wire; keep the low 32 bits.
            match (field.field_number, field.value) {
                (FIELD_OTP_PARAMETERS, WireValue::Bytes(body)) => {
                    if payload.otp_parameters.len() >= self.options.max_records {
                        return Err(MigrationError::new(
                            MigrationErrorKind::InputTooLarge,
                            format!("More than {} entries in payload", self.options.max_records),
                        ));
                    }
                    payload.otp_parameters.push(decode_otp_parameters(body)?);
                }
                (FIELD_VERSION, WireValue::Varint(v)) => payload.version = v as u32,
                (FIELD_BATCH_SIZE, WireValue::Varint(v)) => payload.batch_size = v as u32,
                (FIELD_BATCH_INDEX, WireValue::Varint(v)) => payload.batch_index = v as u32,
                (FIELD_BATCH_ID, WireValue::Varint(v)) => payload.batch_id = v as u32,
                (n, value) => {
                    log::debug!("Skipping migration field {} ({})", n, value.wire_type())
                }
            }
        }

        Ok(payload)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Default-options API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Encode records into a migration URI with default limits.
pub fn encode<R: RngCore + ?Sized>(
    records: &[CredentialRecord],
    rng: &mut R,
) -> Result<String, MigrationError> {
    MigrationCodec::default().encode(records, rng)
}

/// Decode a migration URI with default limits.
pub fn decode(uri: &str) -> Result<Vec<CredentialRecord>, MigrationError> {
    MigrationCodec::default().decode(uri)
}

/// Decode a migration URI, returning an empty list on any failure.
pub fn decode_or_empty(uri: &str) -> Vec<CredentialRecord> {
    MigrationCodec::default().decode_or_empty(uri)
}

/// Parse a binary payload with default limits.
pub fn decode_payload(data: &[u8]) -> Result<MigrationPayload, MigrationError> {
    MigrationCodec::default().decode_payload(data)
}

/// `true` if `data` looks like a migration URI rather than a single
/// `otpauth://` key URI.
pub fn is_migration_uri(data: &str) -> bool {
    data.trim().starts_with("otpauth-migration://")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Wire encoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Serialise a payload to protobuf bytes.
///
/// Field 7 (counter) is only written when non-zero.
pub fn encode_payload(payload: &MigrationPayload) -> Vec<u8> {
    let mut outer = FieldWriter::new();
    for params in &payload.otp_parameters {
        let mut inner = FieldWriter::new();
        inner
            .bytes(FIELD_SECRET, &params.secret)
            .string(FIELD_NAME, &params.name)
            .string(FIELD_ISSUER, &params.issuer)
            .varint(FIELD_ALGORITHM, params.algorithm.to_wire())
            .varint(FIELD_DIGITS, params.digits.to_wire())
            .varint(FIELD_TYPE, params.kind.to_wire());
        if params.counter != 0 {
            inner.varint(FIELD_COUNTER, params.counter);
        }
        outer.message(FIELD_OTP_PARAMETERS, &inner);
    }
    outer
        .varint(FIELD_VERSION, payload.version as u64)
        .varint(FIELD_BATCH_SIZE, payload.batch_size as u64)
        .varint(FIELD_BATCH_INDEX, payload.batch_index as u64)
        .varint(FIELD_BATCH_ID, payload.batch_id as u64);
    outer.into_bytes()
}

/// Wrap payload bytes as `otpauth-migration://offline?data=…`.
pub fn payload_to_uri(bytes: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    let escaped: String = url::form_urlencoded::byte_serialize(b64.as_bytes()).collect();
    format!(
        "{}://{}?{}={}",
        MIGRATION_SCHEME, MIGRATION_HOST, DATA_PARAM, escaped
    )
}

fn decode_otp_parameters(data: &[u8]) -> Result<OtpParameters, MigrationError> {
    let mut params = OtpParameters {
        algorithm: OtpAlgorithm::Unspecified,
        digits: DigitCount::Unspecified,
        kind: OtpKind::Unspecified,
        ..Default::default()
    };

    for field in FieldReader::new(data) {
        let field = field?;
        match (field.field_number, field.value) {
            (FIELD_SECRET, WireValue::Bytes(b)) => params.secret = b.to_vec(),
            (FIELD_NAME, WireValue::Bytes(_)) => {
                params.name = field.as_str()?.unwrap_or_default().to_owned()
            }
            (FIELD_ISSUER, WireValue::Bytes(_)) => {
                params.issuer = field.as_str()?.unwrap_or_default().to_owned()
            }
            (FIELD_ALGORITHM, WireValue::Varint(v)) => params.algorithm = OtpAlgorithm::from_wire(v),
            (FIELD_DIGITS, WireValue::Varint(v)) => params.digits = DigitCount::from_wire(v),
            (FIELD_TYPE, WireValue::Varint(v)) => params.kind = OtpKind::from_wire(v),
            (FIELD_COUNTER, WireValue::Varint(v)) => params.counter = v,
            (n, value) => {
                log::debug!("Skipping OTP parameter field {} ({})", n, value.wire_type())
            }
        }
    }

    Ok(params)
}

fn base64_decode(data: &str) -> Result<Vec<u8>, MigrationError> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
    let data = data.trim();
    // Try standard, then the unpadded and URL-safe variants some exporters use
    STANDARD
        .decode(data)
        .or_else(|_| STANDARD_NO_PAD.decode(data))
        .or_else(|_| URL_SAFE.decode(data))
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
        .map_err(|e| {
            MigrationError::new(MigrationErrorKind::MalformedBase64, "Base64 decode error")
                .with_detail(e.to_string())
        })
}
