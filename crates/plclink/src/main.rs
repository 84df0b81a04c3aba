mod cmd;
mod exit;
mod logging;
mod output;

use std::time::Duration;

use clap::Parser;

use crate::cmd::{parse_duration, Command, Context};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "plclink", version, about = "PLC serial link tool")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Data frame payload length.
    #[arg(long, value_name = "BYTES", default_value_t = plclink_frame::DEFAULT_PAYLOAD_LEN, global = true)]
    payload_len: usize,

    /// Time allowed for one complete frame (e.g. 1s, 500ms).
    #[arg(long, value_name = "DURATION", default_value = "1s", value_parser = parse_duration, global = true)]
    timeout: Duration,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let ctx = Context {
        format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
        payload_len: cli.payload_len,
        timeout: cli.timeout,
    };

    match cmd::run(cli.command, &ctx) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from([
            "plclink",
            "encode",
            "data",
            "--type",
            "1",
            "--payload",
            "ABCDEFG",
        ])
        .expect("encode args should parse");

        assert!(matches!(cli.command, Command::Encode(_)));
        assert_eq!(cli.payload_len, 7);
        assert_eq!(cli.timeout, Duration::from_secs(1));
    }

    #[test]
    fn parses_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "plclink",
            "decode",
            "06",
            "--payload-len",
            "3",
            "--timeout",
            "250ms",
        ])
        .expect("decode args should parse");

        assert_eq!(cli.payload_len, 3);
        assert_eq!(cli.timeout, Duration::from_millis(250));
    }

    #[test]
    fn rejects_hex_together_with_file() {
        let err = Cli::try_parse_from(["plclink", "decode", "06", "--file", "/tmp/capture.bin"])
            .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = Cli::try_parse_from(["plclink", "--timeout", "0s", "version"])
            .expect_err("zero timeout should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
