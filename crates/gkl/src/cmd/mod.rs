use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use gkl_frame::{MAX_STATION, MIN_STATION};
use gkl_transport::{SerialConfig, SerialLink};

use crate::exit::{transport_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod poll;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll stations on both channels and print every reply.
    Poll(PollArgs),
    /// Send one ad-hoc command frame.
    Send(SendArgs),
    /// Print the wire bytes of a frame.
    Encode(EncodeArgs),
    /// Parse hex bytes and print every frame and error found.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Poll(args) => poll::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PollArgs {
    /// Serial port wired to channel one (odd stations).
    #[arg(long, env = "GKL_PORT_ONE")]
    pub port_one: String,
    /// Serial port wired to channel two (even stations).
    #[arg(long, env = "GKL_PORT_TWO")]
    pub port_two: String,
    /// Controller configuration (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Station polled on channel one.
    #[arg(long, value_parser = station_parser())]
    pub station_one: Option<u8>,
    /// Station polled on channel two.
    #[arg(long, value_parser = station_parser())]
    pub station_two: Option<u8>,
    /// Poll interval for both channels (e.g. 200ms).
    #[arg(long)]
    pub poll_interval: Option<String>,
    /// Reply timeout for both channels (e.g. 80ms).
    #[arg(long)]
    pub reply_timeout: Option<String>,
    /// Drop a partial frame after this much silence (e.g. 10ms), or `off`.
    #[arg(long)]
    pub interbyte_gap: Option<String>,
    /// Stop after this long (e.g. 10s, 500ms). Default: until Ctrl-C.
    #[arg(long)]
    pub duration: Option<String>,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Baud rate of both ports.
    #[arg(long, default_value_t = SerialConfig::DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial port to write to.
    pub port: String,
    /// Destination station.
    #[arg(long, short = 's', value_parser = station_parser())]
    pub station: u8,
    /// Send a status request ('S').
    #[arg(long, conflicts_with_all = ["stop", "command"])]
    pub status: bool,
    /// Send a stop command ('B').
    #[arg(long, conflicts_with_all = ["status", "command"])]
    pub stop: bool,
    /// Command character.
    #[arg(long, short = 'c', conflicts_with_all = ["status", "stop"])]
    pub command: Option<char>,
    /// Payload bytes in hex (e.g. "31 30").
    #[arg(long)]
    pub data: Option<String>,
    /// Wait this long for one reply and print it (e.g. 500ms).
    #[arg(long)]
    pub wait: Option<String>,
    /// Baud rate.
    #[arg(long, default_value_t = SerialConfig::DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Destination station.
    #[arg(long, short = 's', value_parser = station_parser())]
    pub station: u8,
    /// Command character.
    #[arg(long, short = 'c', default_value = "S")]
    pub command: char,
    /// Payload bytes in hex (e.g. "31 30").
    #[arg(long)]
    pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Bytes in hex, e.g. `02 00 02 53 31 30 50`.
    #[arg(required = true, num_args = 1..)]
    pub hex: Vec<String>,
    /// Decode host-to-station requests (no payload on any command).
    #[arg(long)]
    pub requests: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn station_parser() -> clap::builder::RangedI64ValueParser<u8> {
    clap::value_parser!(u8).range(i64::from(MIN_STATION)..=i64::from(MAX_STATION))
}

pub(crate) fn open_port(path: &str, baud_rate: u32) -> CliResult<SerialLink> {
    let config = SerialConfig {
        baud_rate,
        ..SerialConfig::new(path)
    };
    SerialLink::open(&config).map_err(|err| transport_error("open failed", err))
}

pub(crate) fn parse_command(command: char) -> CliResult<u8> {
    if command.is_ascii_graphic() {
        Ok(command as u8)
    } else {
        Err(CliError::usage(format!(
            "command must be a printable ASCII character, got {command:?}"
        )))
    }
}

/// Parse hex bytes. Whitespace, `:` and `,` between bytes are ignored.
pub(crate) fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b',')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::usage(format!(
            "odd number of hex digits in {input:?}"
        )));
    }

    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|text| u8::from_str_radix(text, 16).ok())
                .ok_or_else(|| CliError::usage(format!("invalid hex byte in {input:?}")))
        })
        .collect()
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
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
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
