use std::mem;

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::config::WireConfig;
use crate::message::{AsciiMessage, BinaryMessage, Decoded};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

const LINE_TERMINATOR: u8 = b'\n';

/// Parser position within the stream.
#[derive(Debug)]
enum ParseState {
    /// Scanning for the next ASCII line or binary frame header.
    Idle,
    /// Mid-frame: collecting payload bytes toward `declared_len`.
    Collecting {
        header: u8,
        declared_len: usize,
        payload: BytesMut,
    },
}

/// Stateful, streaming decoder for interleaved ASCII/binary AE traffic.
///
/// Consumes arbitrary byte chunks and incrementally emits fully-formed
/// messages, retaining partial state across calls. Every fed byte is
/// consumed exactly once and in order; reassembly is invariant under how
/// the stream is split into chunks.
///
/// One reassembler serves exactly one connection; state is never shared.
pub struct Reassembler {
    buf: BytesMut,
    state: ParseState,
    config: WireConfig,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// Create a reassembler with default wire constants.
    pub fn new() -> Self {
        Self::with_config(WireConfig::default())
    }

    /// Create a reassembler for a specific deployment's wire constants.
    pub fn with_config(config: WireConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            state: ParseState::Idle,
            config,
        }
    }

    /// Feed one raw chunk and extract every message it completes.
    ///
    /// Bytes that do not yet form a complete message are retained for the
    /// next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Decoded {
        self.buf.extend_from_slice(chunk);
        self.extract()
    }

    /// Final extraction once no more input will arrive.
    ///
    /// A partially collected binary frame is emitted with `truncated = true`
    /// and `received_len` equal to the bytes actually captured (possibly
    /// zero). Idle-mode leftovers — an unterminated line or a partial frame
    /// header — are discarded; an ASCII message requires an explicit
    /// terminator. A second `flush` yields empty results.
    pub fn flush(&mut self) -> Decoded {
        let mut out = Decoded::default();

        if let ParseState::Collecting {
            header,
            declared_len,
            payload,
        } = mem::replace(&mut self.state, ParseState::Idle)
        {
            let payload = payload.freeze();
            debug!(
                header,
                declared_len,
                received_len = payload.len(),
                "flushing incomplete binary frame"
            );
            out.binary.push(BinaryMessage {
                header,
                declared_len,
                received_len: payload.len(),
                truncated: true,
                payload,
            });
        }

        if !self.buf.is_empty() {
            debug!(discarded = self.buf.len(), "discarding unterminated bytes");
            self.buf.clear();
        }

        out
    }

    fn extract(&mut self) -> Decoded {
        let mut out = Decoded::default();

        loop {
            match mem::replace(&mut self.state, ParseState::Idle) {
                ParseState::Idle => {
                    let Some(&first) = self.buf.first() else {
                        break;
                    };

                    if self.config.tags.matches(first) {
                        let header_len = 1 + self.config.length.width();
                        if self.buf.len() < header_len {
                            // Partial frame header; wait for more bytes.
                            break;
                        }
                        let declared_len = self.config.length.decode(&self.buf[1..header_len]);
                        self.buf.advance(header_len);
                        trace!(header = first, declared_len, "binary frame header");
                        self.state = ParseState::Collecting {
                            header: first,
                            declared_len,
                            payload: BytesMut::with_capacity(declared_len),
                        };
                    } else {
                        let Some(pos) = self.buf.iter().position(|&b| b == LINE_TERMINATOR)
                        else {
                            // Unterminated line; retain everything.
                            break;
                        };
                        let line = self.buf.split_to(pos + 1);
                        out.ascii.push(AsciiMessage {
                            payload: String::from_utf8_lossy(&line[..pos]).into_owned(),
                        });
                    }
                }
                ParseState::Collecting {
                    header,
                    declared_len,
                    mut payload,
                } => {
                    let take = (declared_len - payload.len()).min(self.buf.len());
                    payload.extend_from_slice(&self.buf.split_to(take));

                    if payload.len() == declared_len {
                        let payload = payload.freeze();
                        out.binary.push(BinaryMessage {
                            header,
                            declared_len,
                            received_len: payload.len(),
                            truncated: false,
                            payload,
                        });
                    } else {
                        self.state = ParseState::Collecting {
                            header,
                            declared_len,
                            payload,
                        };
                        break;
                    }
                }
            }
        }

        out
    }
}
