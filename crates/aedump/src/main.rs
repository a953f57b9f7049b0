mod exit;
mod logging;
mod output;

use std::time::Duration;

use aedump_frame::{LengthField, TagSet, WireConfig};
use aedump_session::{CaptureConfig, CaptureSession};
use clap::{Parser, ValueEnum};

use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::{OutputFormat, Reporter};

#[derive(Parser, Debug)]
#[command(name = "aedump", version, about = "Dump raw AE socket messages")]
struct Cli {
    /// AE host.
    #[arg(long)]
    host: String,

    /// AE port.
    #[arg(long)]
    port: u16,

    /// Credential for the AUTH command.
    #[arg(long, env = "AEDUMP_TOKEN")]
    token: Option<String>,

    /// Number of raw reads to capture.
    #[arg(long, default_value = "1")]
    limit: usize,

    /// Connect and per-read timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    timeout: String,

    /// Bytes per read call.
    #[arg(long, default_value = "8192")]
    read_size: usize,

    /// Command sent to clear pending messages once the limit is reached.
    /// A trailing newline is added if missing.
    #[arg(long, default_value = "STATUS")]
    drain_cmd: String,

    /// Binary frame tag byte (hex like 0x02, or decimal). May repeat.
    /// Default: any byte with the high bit set.
    #[arg(long = "binary-tag", value_name = "BYTE")]
    binary_tags: Vec<String>,

    /// Declared-length field encoding for binary frames.
    #[arg(long, value_name = "ENC", default_value = "u16-be")]
    length_field: LengthFieldArg,

    /// Output format.
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LengthFieldArg {
    U8,
    U16Be,
    U16Le,
    U32Be,
    U32Le,
}

impl From<LengthFieldArg> for LengthField {
    fn from(arg: LengthFieldArg) -> Self {
        match arg {
            LengthFieldArg::U8 => LengthField::U8,
            LengthFieldArg::U16Be => LengthField::U16Be,
            LengthFieldArg::U16Le => LengthField::U16Le,
            LengthFieldArg::U32Be => LengthField::U32Be,
            LengthFieldArg::U32Le => LengthField::U32Le,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match run(cli, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

fn run(cli: Cli, format: OutputFormat) -> CliResult<i32> {
    let read_timeout = parse_duration(&cli.timeout)?;
    let wire = WireConfig {
        tags: parse_tag_set(&cli.binary_tags)?,
        length: cli.length_field.into(),
    };

    let mut drain_cmd = cli.drain_cmd.into_bytes();
    if !drain_cmd.ends_with(b"\n") {
        drain_cmd.push(b'\n');
    }

    let config = CaptureConfig {
        auth_token: cli.token,
        limit: cli.limit,
        read_timeout,
        read_size: cli.read_size,
        drain_cmd,
        wire,
    };

    let mut session = CaptureSession::connect(&cli.host, cli.port, config)
        .map_err(|err| exit::session_error("connect failed", err))?;

    let mut reporter = Reporter::new(format);
    let outcome = session
        .run(&mut reporter)
        .map_err(|err| exit::session_error("capture failed", err))?;
    reporter.completed(&outcome);

    Ok(SUCCESS)
}

fn parse_tag_set(args: &[String]) -> CliResult<TagSet> {
    if args.is_empty() {
        return Ok(TagSet::default());
    }
    let mut tags = Vec::with_capacity(args.len());
    for arg in args {
        tags.push(parse_tag_byte(arg)?);
    }
    Ok(TagSet::Explicit(tags))
}

fn parse_tag_byte(input: &str) -> CliResult<u8> {
    let input = input.trim();
    let parsed = if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else {
        input.parse()
    };
    parsed.map_err(|_| CliError::new(USAGE, format!("invalid tag byte: {input}")))
}

/// Accepts `5s`, `500ms`, or a bare number of seconds.
fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (digits, to_duration): (&str, fn(u64) -> Duration) =
        if let Some(num) = input.strip_suffix("ms") {
            (num, Duration::from_millis)
        } else if let Some(num) = input.strip_suffix('s') {
            (num, Duration::from_secs)
        } else {
            (input, Duration::from_secs)
        };

    let value: u64 = digits
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(to_duration(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::try_parse_from(["aedump", "--host", "ae.example", "--port", "7020"])
            .expect("minimal args should parse");

        assert_eq!(cli.host, "ae.example");
        assert_eq!(cli.port, 7020);
        assert_eq!(cli.limit, 1);
        assert_eq!(cli.read_size, 8192);
        assert_eq!(cli.drain_cmd, "STATUS");
        assert!(cli.token.is_none());
    }

    #[test]
    fn rejects_missing_host() {
        let err = Cli::try_parse_from(["aedump", "--port", "7020"])
            .expect_err("missing host should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }

    #[test]
    fn parse_tag_byte_accepts_hex_and_decimal() {
        assert_eq!(parse_tag_byte("0x02").unwrap(), 0x02);
        assert_eq!(parse_tag_byte("0XAB").unwrap(), 0xAB);
        assert_eq!(parse_tag_byte("129").unwrap(), 129);
        assert!(parse_tag_byte("0x1FF").is_err());
        assert!(parse_tag_byte("nope").is_err());
    }

    #[test]
    fn empty_tag_list_keeps_high_bit_default() {
        assert_eq!(parse_tag_set(&[]).unwrap(), TagSet::HighBit);
        assert_eq!(
            parse_tag_set(&["0x02".to_string(), "5".to_string()]).unwrap(),
            TagSet::Explicit(vec![0x02, 5])
        );
    }
}
