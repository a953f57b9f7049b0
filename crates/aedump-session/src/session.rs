use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use aedump_frame::{Decoded, Reassembler};
use tracing::{debug, info, trace, warn};

use crate::config::CaptureConfig;
use crate::error::{Result, SessionError};

/// Consumer of capture output.
///
/// Invoked once per counted raw read and once for the final flush. Sinks
/// observe state; they never mutate it.
pub trait CaptureSink {
    /// One counted read: its 1-based index, the raw chunk, and the messages
    /// that chunk completed.
    fn on_read(&mut self, index: usize, chunk: &[u8], decoded: &Decoded);

    /// Residual messages extracted when the session flushed its reassembler.
    fn on_flush(&mut self, decoded: &Decoded);
}

/// How the receive phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEnding {
    /// The configured read count was reached.
    LimitReached,
    /// The peer closed the connection first. Normal, not an error.
    PeerClosed,
}

/// Summary of a completed capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// Number of counted (data-bearing) reads performed.
    pub reads: usize,
    /// How the receive phase ended.
    pub ending: CaptureEnding,
    /// Whether the drain command was actually delivered.
    pub drain_sent: bool,
}

/// One bounded capture against one connection.
///
/// Generic over the stream so the receive loop can be exercised against
/// scripted streams in tests; production use goes through
/// [`CaptureSession::connect`].
pub struct CaptureSession<S> {
    stream: S,
    reassembler: Reassembler,
    config: CaptureConfig,
}

impl CaptureSession<TcpStream> {
    /// Connect to `host:port` with the configured timeout.
    ///
    /// The read timeout is applied to the stream; during the receive loop a
    /// timed-out read is retried, never surfaced.
    pub fn connect(host: &str, port: u16, config: CaptureConfig) -> Result<Self> {
        let target = format!("{host}:{port}");
        let addr = target
            .to_socket_addrs()
            .map_err(|source| SessionError::Resolve {
                addr: target.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| SessionError::Resolve {
                addr: target.clone(),
                source: std::io::Error::new(ErrorKind::NotFound, "no addresses resolved"),
            })?;

        let stream = TcpStream::connect_timeout(&addr, config.read_timeout).map_err(|source| {
            SessionError::Connect {
                addr: target.clone(),
                source,
            }
        })?;
        stream.set_read_timeout(Some(config.read_timeout))?;

        info!(addr = %target, "connected");
        Ok(Self::from_stream(stream, config))
    }
}

impl<S: Read + Write> CaptureSession<S> {
    /// Build a session over an already established stream.
    pub fn from_stream(stream: S, config: CaptureConfig) -> Self {
        let reassembler = Reassembler::with_config(config.wire.clone());
        Self {
            stream,
            reassembler,
            config,
        }
    }

    /// Drive the capture to completion.
    ///
    /// Counts one tick per data-bearing read (not per decoded message) and
    /// feeds every received byte to the reassembler exactly once, in order.
    /// When the limit is reached the drain command is sent; a drain failure
    /// is reported and ignored since captured data has already been
    /// delivered. The reassembler is flushed exactly once on the way out.
    pub fn run(&mut self, sink: &mut dyn CaptureSink) -> Result<CaptureOutcome> {
        if let Some(token) = &self.config.auth_token {
            let line = format!("AUTH {token}\n");
            self.stream.write_all(line.as_bytes())?;
            debug!("sent auth command");
        }

        let mut reads = 0usize;
        let mut chunk = vec![0u8; self.config.read_size];
        let ending = loop {
            if reads >= self.config.limit {
                break CaptureEnding::LimitReached;
            }

            let n = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    trace!("read timed out, retrying");
                    continue;
                }
                Err(err) => return Err(SessionError::Io(err)),
            };

            if n == 0 {
                info!(reads, "peer closed before limit");
                break CaptureEnding::PeerClosed;
            }

            reads += 1;
            let decoded = self.reassembler.feed(&chunk[..n]);
            sink.on_read(reads, &chunk[..n], &decoded);
        };

        let mut drain_sent = false;
        if ending == CaptureEnding::LimitReached {
            match self
                .stream
                .write_all(&self.config.drain_cmd)
                .and_then(|()| self.stream.flush())
            {
                Ok(()) => {
                    debug!(bytes = self.config.drain_cmd.len(), "sent drain command");
                    drain_sent = true;
                }
                Err(err) => {
                    // Captured data has already been delivered; only the
                    // server-side cleanup is skipped.
                    warn!(%err, "failed to send drain command");
                }
            }
        }

        let flushed = self.reassembler.flush();
        sink.on_flush(&flushed);

        Ok(CaptureOutcome {
            reads,
            ending,
            drain_sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    enum Step {
        Data(Vec<u8>),
        Timeout,
        Fail(ErrorKind),
        Eof,
    }

    struct ScriptedStream {
        steps: VecDeque<Step>,
        written: Vec<u8>,
        fail_writes: bool,
    }

    impl ScriptedStream {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
                written: Vec::new(),
                fail_writes: false,
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.steps.pop_front() {
                Some(Step::Data(bytes)) => {
                    assert!(bytes.len() <= buf.len(), "scripted chunk exceeds read size");
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Step::Timeout) => Err(std::io::Error::from(ErrorKind::WouldBlock)),
                Some(Step::Fail(kind)) => Err(std::io::Error::from(kind)),
                Some(Step::Eof) | None => Ok(0),
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.fail_writes {
                return Err(std::io::Error::from(ErrorKind::BrokenPipe));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        reads: Vec<(usize, Vec<u8>, Decoded)>,
        flushed: Option<Decoded>,
    }

    impl CaptureSink for RecordingSink {
        fn on_read(&mut self, index: usize, chunk: &[u8], decoded: &Decoded) {
            self.reads.push((index, chunk.to_vec(), decoded.clone()));
        }

        fn on_flush(&mut self, decoded: &Decoded) {
            assert!(self.flushed.is_none(), "flush delivered more than once");
            self.flushed = Some(decoded.clone());
        }
    }

    fn session_over(stream: ScriptedStream, config: CaptureConfig) -> CaptureSession<ScriptedStream> {
        CaptureSession::from_stream(stream, config)
    }

    #[test]
    fn stops_at_limit_and_drains() {
        let steps = (0..5).map(|i| Step::Data(vec![b'0' + i])).collect();
        let config = CaptureConfig {
            limit: 3,
            ..CaptureConfig::default()
        };
        let mut session = session_over(ScriptedStream::new(steps), config);
        let mut sink = RecordingSink::default();

        let outcome = session.run(&mut sink).expect("capture should complete");

        assert_eq!(outcome.reads, 3);
        assert_eq!(outcome.ending, CaptureEnding::LimitReached);
        assert!(outcome.drain_sent);
        assert_eq!(sink.reads.len(), 3);
        assert_eq!(session.stream.written, b"STATUS\n");
    }

    #[test]
    fn peer_close_before_limit_skips_drain() {
        let steps = vec![
            Step::Data(b"a\n".to_vec()),
            Step::Data(b"b\n".to_vec()),
            Step::Eof,
        ];
        let config = CaptureConfig {
            limit: 5,
            ..CaptureConfig::default()
        };
        let mut session = session_over(ScriptedStream::new(steps), config);
        let mut sink = RecordingSink::default();

        let outcome = session.run(&mut sink).expect("peer close is not an error");

        assert_eq!(outcome.reads, 2);
        assert_eq!(outcome.ending, CaptureEnding::PeerClosed);
        assert!(!outcome.drain_sent);
        assert!(session.stream.written.is_empty());
    }

    #[test]
    fn timeouts_retry_without_counting() {
        let steps = vec![
            Step::Timeout,
            Step::Data(b"x\n".to_vec()),
            Step::Timeout,
            Step::Timeout,
            Step::Data(b"y\n".to_vec()),
        ];
        let config = CaptureConfig {
            limit: 2,
            ..CaptureConfig::default()
        };
        let mut session = session_over(ScriptedStream::new(steps), config);
        let mut sink = RecordingSink::default();

        let outcome = session.run(&mut sink).expect("timeouts are retryable");

        assert_eq!(outcome.reads, 2);
        assert_eq!(sink.reads[0].0, 1);
        assert_eq!(sink.reads[1].0, 2);
    }

    #[test]
    fn counts_raw_reads_not_decoded_messages() {
        let steps = vec![Step::Data(b"one\ntwo\nthree\n".to_vec())];
        let mut session = session_over(ScriptedStream::new(steps), CaptureConfig::default());
        let mut sink = RecordingSink::default();

        let outcome = session.run(&mut sink).expect("capture should complete");

        assert_eq!(outcome.reads, 1);
        assert_eq!(sink.reads.len(), 1);
        assert_eq!(sink.reads[0].2.ascii.len(), 3);
    }

    #[test]
    fn auth_command_sent_before_reading() {
        let steps = vec![Step::Data(b"hello\n".to_vec())];
        let config = CaptureConfig {
            auth_token: Some("secret".to_string()),
            ..CaptureConfig::default()
        };
        let mut session = session_over(ScriptedStream::new(steps), config);
        let mut sink = RecordingSink::default();

        session.run(&mut sink).expect("capture should complete");

        assert!(session.stream.written.starts_with(b"AUTH secret\n"));
        assert!(session.stream.written.ends_with(b"STATUS\n"));
    }

    #[test]
    fn drain_failure_is_reported_not_fatal() {
        let steps = vec![Step::Data(b"ok\n".to_vec())];
        let mut stream = ScriptedStream::new(steps);
        stream.fail_writes = true;
        let mut session = session_over(stream, CaptureConfig::default());
        let mut sink = RecordingSink::default();

        let outcome = session.run(&mut sink).expect("drain failure is non-fatal");

        assert_eq!(outcome.reads, 1);
        assert_eq!(outcome.ending, CaptureEnding::LimitReached);
        assert!(!outcome.drain_sent);
    }

    #[test]
    fn custom_drain_command() {
        let steps = vec![Step::Data(b"ok\n".to_vec())];
        let config = CaptureConfig {
            drain_cmd: b"FLUSHQ\n".to_vec(),
            ..CaptureConfig::default()
        };
        let mut session = session_over(ScriptedStream::new(steps), config);
        let mut sink = RecordingSink::default();

        session.run(&mut sink).expect("capture should complete");

        assert_eq!(session.stream.written, b"FLUSHQ\n");
    }

    #[test]
    fn fatal_io_error_propagates() {
        let steps = vec![Step::Fail(ErrorKind::ConnectionReset)];
        let mut session = session_over(ScriptedStream::new(steps), CaptureConfig::default());
        let mut sink = RecordingSink::default();

        let err = session.run(&mut sink).expect_err("reset should be fatal");

        assert!(matches!(err, SessionError::Io(e) if e.kind() == ErrorKind::ConnectionReset));
        assert!(sink.flushed.is_none());
        assert!(session.stream.written.is_empty());
    }

    #[test]
    fn flush_delivers_residual_truncated_frame() {
        // 0x81 frame promising 16 bytes, only 2 ever arrive.
        let steps = vec![
            Step::Data(vec![0x81, 0x00, 0x10, b'x', b'y']),
            Step::Eof,
        ];
        let config = CaptureConfig {
            limit: 5,
            ..CaptureConfig::default()
        };
        let mut session = session_over(ScriptedStream::new(steps), config);
        let mut sink = RecordingSink::default();

        session.run(&mut sink).expect("capture should complete");

        let flushed = sink.flushed.expect("flush should be delivered");
        assert_eq!(flushed.binary.len(), 1);
        assert!(flushed.binary[0].truncated);
        assert_eq!(flushed.binary[0].received_len, 2);
        assert_eq!(flushed.binary[0].declared_len, 16);
    }

    #[test]
    fn zero_limit_reads_nothing_and_drains() {
        let steps = vec![Step::Data(b"never read\n".to_vec())];
        let config = CaptureConfig {
            limit: 0,
            ..CaptureConfig::default()
        };
        let mut session = session_over(ScriptedStream::new(steps), config);
        let mut sink = RecordingSink::default();

        let outcome = session.run(&mut sink).expect("capture should complete");

        assert_eq!(outcome.reads, 0);
        assert!(outcome.drain_sent);
        assert!(sink.reads.is_empty());
    }
}
