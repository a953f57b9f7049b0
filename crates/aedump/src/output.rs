use std::io::{IsTerminal, Write};

use aedump_frame::{AsciiMessage, BinaryMessage, Decoded};
use aedump_session::{CaptureEnding, CaptureOutcome, CaptureSink};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Text
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReadRecord<'a> {
    event: &'static str,
    index: usize,
    bytes: usize,
    hex: String,
    ascii: Vec<&'a str>,
    binary: Vec<BinaryRecord>,
}

#[derive(Serialize)]
struct FlushRecord<'a> {
    event: &'static str,
    ascii: Vec<&'a str>,
    binary: Vec<BinaryRecord>,
}

#[derive(Serialize)]
struct CompletedRecord {
    event: &'static str,
    reads: usize,
    ending: &'static str,
    drain_sent: bool,
}

#[derive(Serialize)]
struct BinaryRecord {
    header: String,
    declared_len: usize,
    received_len: usize,
    truncated: bool,
    payload_hex: String,
}

impl BinaryRecord {
    fn from_message(msg: &BinaryMessage) -> Self {
        Self {
            header: format!("0x{:02X}", msg.header),
            declared_len: msg.declared_len,
            received_len: msg.received_len,
            truncated: msg.truncated,
            payload_hex: hex_string(&msg.payload),
        }
    }
}

/// Renders capture output to stdout.
///
/// Pure consumer: observes chunks and decoded messages, mutates nothing
/// upstream, prints nothing for empty message lists.
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn completed(&self, outcome: &CaptureOutcome) {
        match self.format {
            OutputFormat::Json => {
                let record = CompletedRecord {
                    event: "completed",
                    reads: outcome.reads,
                    ending: match outcome.ending {
                        CaptureEnding::LimitReached => "limit-reached",
                        CaptureEnding::PeerClosed => "peer-closed",
                    },
                    drain_sent: outcome.drain_sent,
                };
                print_json(&record);
            }
            OutputFormat::Text | OutputFormat::Table => match outcome.ending {
                CaptureEnding::LimitReached => {
                    println!("\n[+] completed ({} reads)", outcome.reads);
                }
                CaptureEnding::PeerClosed => {
                    println!("\n[+] completed, peer closed after {} reads", outcome.reads);
                }
            },
        }
    }
}

impl CaptureSink for Reporter {
    fn on_read(&mut self, index: usize, chunk: &[u8], decoded: &Decoded) {
        match self.format {
            OutputFormat::Json => {
                let record = ReadRecord {
                    event: "read",
                    index,
                    bytes: chunk.len(),
                    hex: hex_string(chunk),
                    ascii: ascii_payloads(&decoded.ascii),
                    binary: binary_records(&decoded.binary),
                };
                print_json(&record);
            }
            OutputFormat::Text => {
                println!("\n[# {index}] {} bytes", chunk.len());
                println!("hex: {}", hex_string(chunk));
                print_raw_line(chunk);
                print_ascii_block(&decoded.ascii);
                print_binary_block(&decoded.binary);
            }
            OutputFormat::Table => {
                println!("\n[# {index}] {} bytes", chunk.len());
                print_message_table(decoded);
            }
        }
    }

    fn on_flush(&mut self, decoded: &Decoded) {
        if decoded.is_empty() {
            return;
        }
        match self.format {
            OutputFormat::Json => {
                let record = FlushRecord {
                    event: "flush",
                    ascii: ascii_payloads(&decoded.ascii),
                    binary: binary_records(&decoded.binary),
                };
                print_json(&record);
            }
            OutputFormat::Text => {
                println!("\n[flush] remaining buffered data");
                print_ascii_block(&decoded.ascii);
                print_binary_block(&decoded.binary);
            }
            OutputFormat::Table => {
                println!("\n[flush] remaining buffered data");
                print_message_table(decoded);
            }
        }
    }
}

pub fn hex_string(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

fn ascii_payloads(msgs: &[AsciiMessage]) -> Vec<&str> {
    msgs.iter().map(|m| m.payload.as_str()).collect()
}

fn binary_records(msgs: &[BinaryMessage]) -> Vec<BinaryRecord> {
    msgs.iter().map(BinaryRecord::from_message).collect()
}

fn print_json(record: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Raw bytes go out binary-safe, bypassing any string conversion.
fn print_raw_line(chunk: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(b"raw: ");
    let _ = out.write_all(chunk);
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

fn print_ascii_block(msgs: &[AsciiMessage]) {
    if msgs.is_empty() {
        return;
    }
    println!("ascii messages:");
    for (idx, msg) in msgs.iter().enumerate() {
        println!("  {}. {}", idx + 1, msg.payload);
    }
}

fn print_binary_block(msgs: &[BinaryMessage]) {
    if msgs.is_empty() {
        return;
    }
    println!("binary messages:");
    for (idx, msg) in msgs.iter().enumerate() {
        let mut info = format!(
            "header=0x{:02X} declared={} received={}",
            msg.header, msg.declared_len, msg.received_len
        );
        if msg.truncated {
            info.push_str(" (truncated)");
        }
        println!("  {}. {info}", idx + 1);
        println!("     payload hex: {}", hex_string(&msg.payload));
    }
}

fn print_message_table(decoded: &Decoded) {
    if decoded.is_empty() {
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "KIND",
            "HEADER",
            "DECLARED",
            "RECEIVED",
            "TRUNCATED",
            "PAYLOAD",
        ]);
    for msg in &decoded.ascii {
        table.add_row(vec![
            "ascii".to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            msg.payload.clone(),
        ]);
    }
    for msg in &decoded.binary {
        table.add_row(vec![
            "binary".to_string(),
            format!("0x{:02X}", msg.header),
            msg.declared_len.to_string(),
            msg.received_len.to_string(),
            msg.truncated.to_string(),
            hex_string(&msg.payload),
        ]);
    }
    println!("{table}");
}
