//! # SKIFF Cipher
//!
//! Symmetric cipher layer for the SKIFF packet transport.
//!
//! This crate provides:
//! - An immutable registry of cipher descriptors, looked up by name or by
//!   legacy protocol number
//! - Per-session cipher contexts bound to one descriptor and one direction
//! - One unified packet transform covering CBC block ciphers, software CTR,
//!   GCM, ChaCha20-Poly1305 with sequence-number nonces, the legacy RC4
//!   stream cipher, and a chunked length-hiding encrypt-then-authenticate
//!   mode
//! - Packet-length extraction, including the modes that keep the length
//!   field encrypted
//! - Export/import of the minimal IV/counter/engine state needed to resume
//!   a session across the privilege boundary
//!
//! The transport framing above this layer never branches on cipher
//! identity: it selects a descriptor, opens a context per direction, and
//! drives [`context::CipherCtx::packet_length`] and
//! [`context::CipherCtx::crypt`] with monotonically increasing sequence
//! numbers. Key material is zeroized whenever a context or session is
//! dropped, including on failed initialization.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

mod block;
mod ctr;
mod gcm;
mod stream;

pub mod chachapoly;
pub mod chunked;
pub mod context;
pub mod error;
pub mod kdf;
pub mod registry;

pub use context::{CipherCtx, Direction};
pub use error::CipherError;
pub use registry::{ChunkFamily, CipherDescriptor, ModeSpec, ProtocolClass};
