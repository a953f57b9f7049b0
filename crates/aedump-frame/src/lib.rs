//! Streaming reassembly of AE wire traffic.
//!
//! AE endpoints interleave two framings on one TCP stream:
//! - Newline-terminated ASCII command/response lines
//! - Binary frames: a 1-byte type tag followed by a declared-length field
//!   and exactly that many payload bytes
//!
//! TCP delivers an undifferentiated byte stream, so one `recv` rarely maps to
//! one application message. [`Reassembler`] consumes arbitrary chunks and
//! incrementally emits complete messages, carrying partial state across calls.
//! No partial reads, no buffer management in user code.

pub mod config;
pub mod message;
pub mod reassembler;

pub use config::{LengthField, TagSet, WireConfig};
pub use message::{AsciiMessage, BinaryMessage, Decoded};
pub use reassembler::Reassembler;
