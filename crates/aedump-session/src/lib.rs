//! Bounded capture sessions against AE endpoints.
//!
//! A [`CaptureSession`] owns one connection and one
//! [`Reassembler`](aedump_frame::Reassembler), drives the receive loop under
//! a timeout/limit policy, issues the authentication and drain commands, and
//! hands each raw chunk plus its decoded messages to a [`CaptureSink`].
//!
//! Lifecycle: connect, optionally authenticate, read until the configured
//! read count is reached or the peer closes, drain, flush. Read timeouts are
//! retried silently; peer close is a normal outcome, not an error.

pub mod config;
pub mod error;
pub mod session;

pub use config::CaptureConfig;
pub use error::{Result, SessionError};
pub use session::{CaptureEnding, CaptureOutcome, CaptureSession, CaptureSink};
