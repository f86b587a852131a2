//! Core types for the migration codec.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issuer assigned to imported entries whose payload carries none.
pub const UNKNOWN_ISSUER: &str = "Unknown";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Credential record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single credential as exchanged with the UI and storage layers.
///
/// The `id` is a local handle only; it is never written to the migration
/// payload, so decoding always mints fresh ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Unique identifier.
    pub id: String,
    /// Issuer (e.g. "GitHub").
    pub issuer: String,
    /// Account label (e.g. "user@example.com").
    pub account: String,
    /// Base-32 encoded secret key.
    pub secret: String,
}

impl CredentialRecord {
    /// Create a record with a fresh id.
    pub fn new(
        issuer: impl Into<String>,
        account: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            issuer: issuer.into(),
            account: account.into(),
            secret: secret.into(),
        }
    }

    /// `true` if both records describe the same credential, ignoring ids.
    pub fn same_credential(&self, other: &CredentialRecord) -> bool {
        self.issuer == other.issuer && self.account == other.account && self.secret == other.secret
    }

    /// Display name: "Issuer (account)".
    pub fn display_name(&self) -> String {
        if self.issuer.is_empty() {
            self.account.clone()
        } else {
            format!("{} ({})", self.issuer, self.account)
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Wire primitives
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Framing of a field's payload. Only the two types the migration payload
/// uses are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Varint,
    LengthDelimited,
}

impl WireType {
    /// Low three bits of a field tag.
    pub fn tag_bits(self) -> u64 {
        match self {
            Self::Varint => 0,
            Self::LengthDelimited => 2,
        }
    }

    /// Map tag bits back to a wire type.
    pub fn from_tag_bits(bits: u64) -> Option<Self> {
        match bits {
            0 => Some(Self::Varint),
            2 => Some(Self::LengthDelimited),
            _ => None,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Varint => write!(f, "varint"),
            Self::LengthDelimited => write!(f, "length-delimited"),
        }
    }
}

/// A field payload, borrowed from the buffer being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireValue<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
}

impl WireValue<'_> {
    pub fn wire_type(&self) -> WireType {
        match self {
            Self::Varint(_) => WireType::Varint,
            Self::Bytes(_) => WireType::LengthDelimited,
        }
    }
}

/// One tagged field read from a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireField<'a> {
    /// Always `>= 1`.
    pub field_number: u32,
    pub value: WireValue<'a>,
}

impl<'a> WireField<'a> {
    pub fn wire_type(&self) -> WireType {
        self.value.wire_type()
    }

    pub fn as_varint(&self) -> Option<u64> {
        match self.value {
            WireValue::Varint(v) => Some(v),
            WireValue::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self.value {
            WireValue::Bytes(b) => Some(b),
            WireValue::Varint(_) => None,
        }
    }

    /// Interpret a length-delimited payload as UTF-8.
    ///
    /// Returns `Ok(None)` for varint fields and `InvalidUtf8` for bytes that
    /// are not valid UTF-8.
    pub fn as_str(&self) -> Result<Option<&'a str>, MigrationError> {
        match self.value {
            WireValue::Varint(_) => Ok(None),
            WireValue::Bytes(b) => std::str::from_utf8(b).map(Some).map_err(|e| {
                MigrationError::new(
                    MigrationErrorKind::InvalidUtf8,
                    format!("Field {} is not valid UTF-8", self.field_number),
                )
                .with_detail(e.to_string())
            }),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP parameter enums (wire values)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm as numbered in the migration payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpAlgorithm {
    Unspecified,
    Sha1,
    Sha256,
    Sha512,
    Md5,
}

impl Default for OtpAlgorithm {
    fn default() -> Self {
        Self::Sha1
    }
}

impl OtpAlgorithm {
    pub fn to_wire(self) -> u64 {
        match self {
            Self::Unspecified => 0,
            Self::Sha1 => 1,
            Self::Sha256 => 2,
            Self::Sha512 => 3,
            Self::Md5 => 4,
        }
    }

    /// Unknown numbers decode as `Unspecified`.
    pub fn from_wire(v: u64) -> Self {
        match v {
            1 => Self::Sha1,
            2 => Self::Sha256,
            3 => Self::Sha512,
            4 => Self::Md5,
            _ => Self::Unspecified,
        }
    }
}

/// Code length as numbered in the migration payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitCount {
    Unspecified,
    Six,
    Eight,
}

impl Default for DigitCount {
    fn default() -> Self {
        Self::Six
    }
}

impl DigitCount {
    pub fn to_wire(self) -> u64 {
        match self {
            Self::Unspecified => 0,
            Self::Six => 1,
            Self::Eight => 2,
        }
    }

    pub fn from_wire(v: u64) -> Self {
        match v {
            1 => Self::Six,
            2 => Self::Eight,
            _ => Self::Unspecified,
        }
    }

    /// Number of digits, if specified.
    pub fn digits(self) -> Option<u8> {
        match self {
            Self::Unspecified => None,
            Self::Six => Some(6),
            Self::Eight => Some(8),
        }
    }
}

/// Whether a credential is counter- or time-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpKind {
    Unspecified,
    Hotp,
    Totp,
}

impl Default for OtpKind {
    fn default() -> Self {
        Self::Totp
    }
}

impl OtpKind {
    pub fn to_wire(self) -> u64 {
        match self {
            Self::Unspecified => 0,
            Self::Hotp => 1,
            Self::Totp => 2,
        }
    }

    pub fn from_wire(v: u64) -> Self {
        match v {
            1 => Self::Hotp,
            2 => Self::Totp,
            _ => Self::Unspecified,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Payload model
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One embedded OTP parameter submessage.
///   1: secret (bytes)
///   2: name (string)
///   3: issuer (string)
///   4: algorithm (varint)
///   5: digits (varint)
///   6: type (varint)
///   7: counter (varint)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OtpParameters {
    pub secret: Vec<u8>,
    pub name: String,
    pub issuer: String,
    pub algorithm: OtpAlgorithm,
    pub digits: DigitCount,
    pub kind: OtpKind,
    pub counter: u64,
}

impl OtpParameters {
    /// Build the submessage for an exported record.
    ///
    /// Every export is SHA1, six digits, time-based.
    pub fn from_record(record: &CredentialRecord) -> Result<Self, MigrationError> {
        if record.account.is_empty() {
            return Err(MigrationError::new(
                MigrationErrorKind::InvalidRecord,
                "Account name must not be empty",
            )
            .with_detail(format!("record '{}'", record.display_name())));
        }
        let secret = crate::migration::base32::decode_strict(&record.secret).map_err(|e| {
            // Name the record without echoing the secret.
            e.with_detail(format!("record '{}'", record.display_name()))
        })?;
        Ok(Self {
            secret,
            name: record.account.clone(),
            issuer: record.issuer.clone(),
            algorithm: OtpAlgorithm::Sha1,
            digits: DigitCount::Six,
            kind: OtpKind::Totp,
            counter: 0,
        })
    }

    /// Convert to a record with a fresh id.
    ///
    /// Returns `None` when the secret or the account name is empty.
    pub fn to_record(&self) -> Option<CredentialRecord> {
        if self.secret.is_empty() || self.name.is_empty() {
            return None;
        }
        let issuer = if self.issuer.is_empty() {
            UNKNOWN_ISSUER
        } else {
            self.issuer.as_str()
        };
        Some(CredentialRecord::new(
            issuer,
            self.name.clone(),
            crate::migration::base32::encode(&self.secret),
        ))
    }
}

/// The outer migration message.
///
/// Batch metadata is written on export and reported on import, but batches
/// spanning several QR codes are not reassembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPayload {
    pub otp_parameters: Vec<OtpParameters>,
    /// Field 2.
    pub version: u32,
    /// Field 3.
    pub batch_size: u32,
    /// Field 4.
    pub batch_index: u32,
    /// Field 5.
    pub batch_id: u32,
}

impl Default for MigrationPayload {
    fn default() -> Self {
        Self {
            otp_parameters: Vec::new(),
            version: PAYLOAD_VERSION,
            batch_size: 1,
            batch_index: 0,
            batch_id: 0,
        }
    }
}

/// Version written to field 2 of every export.
pub const PAYLOAD_VERSION: u32 = 1;

impl MigrationPayload {
    /// Single-QR payload for the given records.
    pub fn from_records(
        records: &[CredentialRecord],
        batch_id: u32,
    ) -> Result<Self, MigrationError> {
        let otp_parameters = records
            .iter()
            .map(OtpParameters::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            otp_parameters,
            batch_id,
            ..Default::default()
        })
    }

    /// Records for every usable submessage, in payload order.
    pub fn to_records(&self) -> Vec<CredentialRecord> {
        self.otp_parameters
            .iter()
            .filter_map(|p| {
                let record = p.to_record();
                if record.is_none() {
                    log::warn!("Dropping migration entry with empty secret or account name");
                }
                record
            })
            .collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationErrorKind {
    MalformedUri,
    MissingDataParameter,
    MalformedBase64,
    TruncatedVarint,
    TruncatedField,
    UnsupportedWireType,
    InvalidFieldNumber,
    InvalidUtf8,
    InvalidSecret,
    /// Exported record that an importer would drop.
    InvalidRecord,
    InputTooLarge,
    /// Well-formed container without a single usable record.
    EmptyResult,
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationError {
    pub kind: MigrationErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for MigrationError {}

impl MigrationError {
    pub fn new(kind: MigrationErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<MigrationError> for String {
    fn from(e: MigrationError) -> String {
        e.to_string()
    }
}
