use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use plclink_frame::{Frame, FrameConfig};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the wire bytes of one frame.
    Encode(EncodeArgs),
    /// Reassemble captured bytes and print the dispatched messages.
    Decode(DecodeArgs),
    /// Connect to a serial bridge and print received messages.
    Listen(ListenArgs),
    /// Send one frame to a serial bridge.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub format: OutputFormat,
    pub payload_len: usize,
    pub timeout: Duration,
}

impl Context {
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            payload_len: self.payload_len,
            receive_timeout: self.timeout,
        }
    }
}

pub fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, ctx),
        Command::Decode(args) => decode::run(args, ctx),
        Command::Listen(args) => listen::run(args, ctx),
        Command::Send(args) => send::run(args, ctx),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FrameKind {
    Ack,
    Nak,
    Data,
}

/// Frame contents given on the command line.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Frame to build.
    #[arg(value_enum)]
    pub kind: FrameKind,
    /// Message type byte: a single character, 0x-prefixed hex, or decimal.
    #[arg(long = "type", value_name = "BYTE")]
    pub msg_type: Option<String>,
    /// Payload text.
    #[arg(long)]
    pub payload: Option<String>,
    /// NAK error code, recorded locally only.
    #[arg(long, value_name = "BYTE")]
    pub code: Option<String>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Received chunks as hex (e.g. 02314142 or "02 31 41"). Each argument is one chunk.
    #[arg(value_name = "HEX", required_unless_present = "file")]
    pub hex: Vec<String>,
    /// Read one raw chunk from a capture file instead.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial bridge socket path.
    pub path: PathBuf,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Reply ACK to every valid data frame.
    #[arg(long)]
    pub ack: bool,
    /// Print an error message each time the receive window expires.
    #[arg(long)]
    pub report_timeouts: bool,
    /// Print the fault register on exit.
    #[arg(long)]
    pub faults: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial bridge socket path.
    pub path: PathBuf,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Wait for one reply and print it.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

impl FrameArgs {
    /// Build the frame these arguments describe.
    pub fn to_frame(&self) -> CliResult<Frame> {
        match self.kind {
            FrameKind::Ack => Ok(Frame::Ack),
            FrameKind::Nak => {
                let code = self.code.as_deref().map(parse_byte).transpose()?;
                Ok(Frame::nak(code))
            }
            FrameKind::Data => {
                let msg_type = self
                    .msg_type
                    .as_deref()
                    .ok_or_else(|| CliError::usage("data frames need --type"))
                    .and_then(parse_byte)?;
                let payload = self.payload.clone().unwrap_or_default();
                Ok(Frame::data(msg_type, payload.into_bytes()))
            }
        }
    }
}

/// Parse a byte given as a single character, `0x` hex or decimal.
///
/// A single character is taken literally, so `1` is 0x31.
pub fn parse_byte(input: &str) -> CliResult<u8> {
    let input = input.trim();
    if let [single] = input.as_bytes() {
        return Ok(*single);
    }
    if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        return u8::from_str_radix(hex, 16)
            .map_err(|_| CliError::usage(format!("invalid hex byte: {input}")));
    }
    input.parse::<u8>().map_err(|_| {
        CliError::usage(format!(
            "expected one character, 0xNN or a decimal byte: {input}"
        ))
    })
}

/// Parse hex digits, ignoring whitespace.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::usage(format!("odd number of hex digits: {input}")));
    }

    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|text| u8::from_str_radix(text, 16).ok())
                .ok_or_else(|| CliError::usage(format!("invalid hex: {input}")))
        })
        .collect()
}

/// Parse `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_args(kind: FrameKind, msg_type: Option<&str>, payload: Option<&str>) -> FrameArgs {
        FrameArgs {
            kind,
            msg_type: msg_type.map(str::to_string),
            payload: payload.map(str::to_string),
            code: None,
        }
    }

    #[test]
    fn parse_byte_forms() {
        assert_eq!(parse_byte("1").unwrap(), b'1');
        assert_eq!(parse_byte("A").unwrap(), b'A');
        assert_eq!(parse_byte("49").unwrap(), 49);
        assert_eq!(parse_byte("0x31").unwrap(), 0x31);
        assert_eq!(parse_byte("255").unwrap(), 255);
        assert!(parse_byte("256").is_err());
        assert!(parse_byte("ab").is_err());
        assert!(parse_byte("0xZZ").is_err());
    }

    #[test]
    fn parse_hex_ignores_whitespace() {
        assert_eq!(parse_hex("02 31 41").unwrap(), vec![0x02, 0x31, 0x41]);
        assert_eq!(parse_hex("0d").unwrap(), vec![0x0D]);
        assert!(parse_hex("023").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }

    #[test]
    fn data_frame_needs_type() {
        let err = frame_args(FrameKind::Data, None, Some("x"))
            .to_frame()
            .unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);

        let frame = frame_args(FrameKind::Data, Some("0x31"), Some("ABC"))
            .to_frame()
            .unwrap();
        assert_eq!(frame, Frame::data(0x31, &b"ABC"[..]));
    }
}
