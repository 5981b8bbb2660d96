use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gkl_frame::{command_name, Frame, FrameError, HexBytes};
use gkl_poll::{ChannelId, ChannelStats, FaultKind, PollError};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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
struct FrameOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    station: u8,
    command: String,
    command_name: &'static str,
    payload: String,
    text: String,
    timestamp: String,
}

impl FrameOutput {
    fn new(channel: Option<ChannelId>, frame: &Frame) -> Self {
        Self {
            channel: channel.map(|id| id.to_string()),
            station: frame.address,
            command: char::from(frame.command).to_string(),
            command_name: command_name(frame.command),
            payload: HexBytes(&frame.payload).to_string(),
            text: payload_text(&frame.payload),
            timestamp: now_unix_seconds(),
        }
    }
}

#[derive(Serialize)]
struct FaultOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    fault: FaultKind,
    message: String,
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    station: u8,
    command: String,
    command_name: &'static str,
    size: usize,
    bytes: String,
    #[serde(skip)]
    raw: &'a [u8],
}

#[derive(Serialize)]
struct StatsOutput {
    channel: String,
    #[serde(flatten)]
    stats: ChannelStats,
}

pub fn print_frame(channel: Option<ChannelId>, frame: &Frame, format: OutputFormat) {
    let out = FrameOutput::new(channel, frame);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table();
            table
                .set_header(vec!["CHANNEL", "STATION", "COMMAND", "PAYLOAD", "TEXT"])
                .add_row(vec![
                    out.channel.unwrap_or_else(|| "-".to_string()),
                    out.station.to_string(),
                    format!("{} ({})", out.command, out.command_name),
                    out.payload,
                    out.text,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "channel={} station={} command={} ({}) payload=[{}] text={:?}",
                out.channel.as_deref().unwrap_or("-"),
                out.station,
                out.command,
                out.command_name,
                out.payload,
                out.text
            );
        }
        OutputFormat::Raw => {
            let mut buf = [0u8; gkl_frame::FRAME_OVERHEAD + gkl_frame::MAX_PAYLOAD];
            if let Ok(len) = frame.encode(&mut buf) {
                print_raw(&buf[..len]);
            }
        }
    }
}

pub fn print_fault(channel: Option<ChannelId>, err: &FrameError, format: OutputFormat) {
    let out = FaultOutput {
        channel: channel.map(|id| id.to_string()),
        fault: PollError::from(err.clone()).kind(),
        message: err.to_string(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "channel={} fault: {}",
                out.channel.as_deref().unwrap_or("-"),
                out.message
            );
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_encoded(station: u8, command: u8, bytes: &[u8], format: OutputFormat) {
    let out = EncodedOutput {
        station,
        command: char::from(command).to_string(),
        command_name: command_name(command),
        size: bytes.len(),
        bytes: HexBytes(bytes).to_string(),
        raw: bytes,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table();
            table
                .set_header(vec!["STATION", "COMMAND", "SIZE", "BYTES"])
                .add_row(vec![
                    out.station.to_string(),
                    format!("{} ({})", out.command, out.command_name),
                    out.size.to_string(),
                    out.bytes,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.bytes),
        OutputFormat::Raw => print_raw(out.raw),
    }
}

pub fn print_stats(stats: &[(ChannelId, ChannelStats)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<StatsOutput> = stats
                .iter()
                .map(|(id, stats)| StatsOutput {
                    channel: id.to_string(),
                    stats: *stats,
                })
                .collect();
            print_json(&out);
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut table = new_table();
            table.set_header(vec![
                "CHANNEL", "POLLS", "COMMANDS", "FRAMES", "CHECKSUM", "OVERFLOW", "TIMEOUT",
                "SEND ERR", "RECV ERR", "STALE",
            ]);
            for (id, s) in stats {
                table.add_row(vec![
                    id.to_string(),
                    s.polls_sent.to_string(),
                    s.commands_sent.to_string(),
                    s.frames_received.to_string(),
                    s.checksum_errors.to_string(),
                    s.overflows.to_string(),
                    s.timeouts.to_string(),
                    s.send_failures.to_string(),
                    s.receive_failures.to_string(),
                    s.stale_resets.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Printable ASCII as-is, everything else as `.`.
fn payload_text(payload: &[u8]) -> String {
    payload
        .iter()
        .map(|b| {
            if b.is_ascii_graphic() || *b == b' ' {
                char::from(*b)
            } else {
                '.'
            }
        })
        .collect()
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_json_shape() {
        let frame = Frame::new(2, b'S', b"10").unwrap();
        let json = serde_json::to_value(FrameOutput::new(Some(ChannelId::Two), &frame)).unwrap();

        assert_eq!(json["channel"], "TRK-2");
        assert_eq!(json["station"], 2);
        assert_eq!(json["command"], "S");
        assert_eq!(json["command_name"], "STATUS");
        assert_eq!(json["payload"], "31 30");
        assert_eq!(json["text"], "10");
    }

    #[test]
    fn channel_omitted_when_unknown() {
        let frame = Frame::new(1, b'B', &[]).unwrap();
        let json = serde_json::to_value(FrameOutput::new(None, &frame)).unwrap();
        assert!(json.get("channel").is_none());
        assert_eq!(json["payload"], "");
    }

    #[test]
    fn stats_are_flattened() {
        let stats = ChannelStats {
            polls_sent: 3,
            timeouts: 1,
            ..ChannelStats::default()
        };
        let json = serde_json::to_value(StatsOutput {
            channel: ChannelId::One.to_string(),
            stats,
        })
        .unwrap();
        assert_eq!(json["channel"], "TRK-1");
        assert_eq!(json["polls_sent"], 3);
        assert_eq!(json["timeouts"], 1);
    }

    #[test]
    fn fault_kind_is_snake_case() {
        let out = FaultOutput {
            channel: None,
            fault: FaultKind::ChecksumMismatch,
            message: String::new(),
        };
        let json = serde_json::to_value(out).unwrap();
        assert_eq!(json["fault"], "checksum_mismatch");
    }

    #[test]
    fn non_printable_payload_bytes_are_dotted() {
        assert_eq!(payload_text(&[0x31, 0x00, 0x7F, b' ', b'A']), "1.. A");
    }
}
