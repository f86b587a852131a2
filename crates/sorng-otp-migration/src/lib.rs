//! # SortOfRemote NG – Authenticator Migration Codec
//!
//! Moves many OTP credentials between authenticator apps through a single
//! `otpauth-migration://offline?data=…` URI (the payload carried by a
//! Google Authenticator "transfer accounts" QR code):
//!
//! - **Varints** – unsigned base-128 integers with a bounded reader
//! - **Base32** – RFC 4648 secrets, lenient on import and strict on export
//! - **Wire fields** – the varint / length-delimited protobuf subset, read
//!   with a cursor over borrowed, bounds-checked slices
//! - **Migration payloads** – credential records ↔ URI, skipping unknown
//!   fields and never yielding a partial record list
//!
//! QR pixels and storage live elsewhere; this crate only turns strings into
//! records and back.

pub mod migration;
