use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use plclink_fault::codes::is_link_fault;
use plclink_fault::{fault_name, FaultBits};
use plclink_frame::{control::control_name, Frame};
use plclink_link::Inbound;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct WireOutput<'a> {
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
    size: usize,
    hex: String,
    ascii: String,
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    link: &'a str,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    timestamp: String,
}

#[derive(Serialize)]
struct FaultOutput<'a> {
    code: u8,
    name: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
struct FaultPollOutput<'a> {
    channel: usize,
    bits: String,
    faults: Vec<FaultOutput<'a>>,
}

/// Print a formatted outgoing frame.
pub fn print_wire(frame: &Frame, wire: &[u8], format: OutputFormat) {
    let (msg_type, checksum) = match frame {
        Frame::Data { msg_type, .. } => {
            let digits = &wire[wire.len().saturating_sub(2)..];
            (Some(*msg_type), Some(escape(digits)))
        }
        Frame::Ack | Frame::Nak { .. } => (None, None),
    };

    match format {
        OutputFormat::Json => {
            let out = WireOutput {
                kind: frame.kind(),
                msg_type,
                checksum,
                size: wire.len(),
                hex: hex_string(wire),
                ascii: escape(wire),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["KIND", "SIZE", "HEX", "ASCII"]);
            table.add_row(vec![
                frame.kind().to_string(),
                wire.len().to_string(),
                hex_string(wire),
                escape(wire),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} ({} bytes): {}", frame.kind(), wire.len(), symbolic(wire));
        }
    }
}

/// Print one dispatched message.
pub fn print_inbound(message: &Inbound, link: &str, format: OutputFormat) {
    let (msg_type, code, payload) = match message {
        Inbound::Data(msg) => (Some(msg.msg_type), None, Some(escape(&msg.payload))),
        Inbound::Nak { code } => (None, *code, None),
        Inbound::Ack | Inbound::Error => (None, None, None),
    };

    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                link,
                kind: message.kind(),
                msg_type,
                code,
                payload,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["LINK", "KIND", "TYPE", "CODE", "PAYLOAD"]);
            table.add_row(vec![
                link.to_string(),
                message.kind().to_string(),
                msg_type.map(type_label).unwrap_or_default(),
                code.map(type_label).unwrap_or_default(),
                payload.unwrap_or_default(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = format!("link={link} kind={}", message.kind());
            if let Some(msg_type) = msg_type {
                line.push_str(&format!(" type={}", type_label(msg_type)));
            }
            if let Some(code) = code {
                line.push_str(&format!(" code={}", type_label(code)));
            }
            if let Some(payload) = payload {
                line.push_str(&format!(" payload={payload}"));
            }
            println!("{line}");
        }
    }
}

/// Print the result of a fault register poll.
pub fn print_faults(channel: usize, bits: FaultBits, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FaultPollOutput {
                channel,
                bits: bits.to_string(),
                faults: bits
                    .codes()
                    .map(|code| FaultOutput {
                        code,
                        name: fault_name(code),
                        source: fault_source(code),
                    })
                    .collect(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["CODE", "FAULT", "SOURCE"]);
            for code in bits.codes() {
                table.add_row(vec![
                    code.to_string(),
                    fault_name(code).to_string(),
                    fault_source(code).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let names: Vec<_> = bits
                .codes()
                .map(|code| format!("{code}:{}", fault_name(code)))
                .collect();
            if names.is_empty() {
                println!("faults={bits} (none)");
            } else {
                println!("faults={bits} {}", names.join(" "));
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Space separated uppercase hex.
pub fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Control bytes by name, printable ASCII quoted, the rest as hex.
pub fn symbolic(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&byte| match control_name(byte) {
            Some(name) => name.to_string(),
            None if byte.is_ascii_graphic() => format!("'{}'", char::from(byte)),
            None => format!("{byte:02X}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn fault_source(code: u8) -> &'static str {
    if is_link_fault(code) {
        "link"
    } else {
        "system"
    }
}

/// Printable ASCII as-is, everything else as `\xNN`.
pub fn escape(bytes: &[u8]) -> String {
    bytes
        .iter()
        .flat_map(|&byte| std::ascii::escape_default(byte))
        .map(char::from)
        .collect()
}

fn type_label(byte: u8) -> String {
    if byte.is_ascii_graphic() {
        format!("0x{byte:02X} '{}'", char::from(byte))
    } else {
        format!("0x{byte:02X}")
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
