use bytes::Bytes;

/// One complete newline-terminated ASCII line, terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiMessage {
    /// The line content, lossy-decoded to UTF-8.
    pub payload: String,
}

/// One binary frame: tag byte, declared length, and captured payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMessage {
    /// The frame's type tag byte.
    pub header: u8,
    /// Payload length promised by the frame header.
    pub declared_len: usize,
    /// Payload bytes actually captured; always `payload.len()`.
    pub received_len: usize,
    /// True when the stream ended or was flushed before the frame completed.
    pub truncated: bool,
    /// The captured payload.
    pub payload: Bytes,
}

/// Messages extracted by one `feed` or `flush` call, in stream order.
///
/// ASCII and binary messages come back in two separate ordered lists; their
/// relative interleaving in the original stream is not reconstructible from
/// the lists alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub ascii: Vec<AsciiMessage>,
    pub binary: Vec<BinaryMessage>,
}

impl Decoded {
    /// Whether this call extracted no messages at all.
    pub fn is_empty(&self) -> bool {
        self.ascii.is_empty() && self.binary.is_empty()
    }
}
