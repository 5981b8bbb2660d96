use std::thread;
use std::time::{Duration, Instant};

use gkl_frame::{
    build_frame, Frame, FrameParser, HexBytes, FRAME_OVERHEAD, MAX_PAYLOAD, STATUS, STOP,
};
use gkl_transport::{ByteSink, ByteSource};
use tracing::info;

use crate::cmd::{open_port, parse_command, parse_duration, parse_hex, SendArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_frame, OutputFormat};

const READ_POLL: Duration = Duration::from_millis(1);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let command = resolve_command(&args)?;
    let payload = match args.data.as_deref() {
        Some(hex) => parse_hex(hex)?,
        None => Vec::new(),
    };
    let wait = args.wait.as_deref().map(parse_duration).transpose()?;

    let mut buf = [0u8; FRAME_OVERHEAD + MAX_PAYLOAD];
    let len = build_frame(args.station, command, &payload, &mut buf)
        .map_err(|err| frame_error("encode failed", err))?;

    let mut link = open_port(&args.port, args.baud)?;
    link.clear().map_err(|err| transport_error("clear failed", err))?;
    link.send(&buf[..len]).map_err(|err| transport_error("send failed", err))?;
    info!(
        port = %args.port,
        station = args.station,
        bytes = %HexBytes(&buf[..len]),
        "command sent"
    );

    if let Some(timeout) = wait {
        let frame = wait_for_reply(&mut link, timeout)?;
        print_frame(None, &frame, format);
    }

    Ok(SUCCESS)
}

fn resolve_command(args: &SendArgs) -> CliResult<u8> {
    match (args.status, args.stop, args.command) {
        (true, _, _) => Ok(STATUS),
        (_, true, _) => Ok(STOP),
        (_, _, Some(command)) => parse_command(command),
        _ => Err(CliError::new(
            USAGE,
            "one of --status, --stop or --command is required",
        )),
    }
}

/// Read until one frame completes or `timeout` passes.
///
/// A frame that fails its checksum or overflows the parser ends the wait.
fn wait_for_reply<R: ByteSource>(source: &mut R, timeout: Duration) -> CliResult<Frame> {
    let started = Instant::now();
    let mut parser = FrameParser::new();
    let mut chunk = [0u8; 64];

    loop {
        let read = source
            .read_available(&mut chunk)
            .map_err(|err| transport_error("receive failed", err))?;
        for byte in &chunk[..read] {
            if let Some(frame) = parser
                .push(*byte)
                .map_err(|err| frame_error("invalid reply", err))?
            {
                return Ok(frame);
            }
        }
        if started.elapsed() >= timeout {
            return Err(CliError::new(
                TIMEOUT,
                format!("no reply within {} ms", timeout.as_millis()),
            ));
        }
        if read == 0 {
            thread::sleep(READ_POLL);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::exit::DATA_INVALID;

    #[derive(Default)]
    struct QueuedSource {
        chunks: VecDeque<Vec<u8>>,
    }

    impl ByteSource for QueuedSource {
        fn read_available(&mut self, buf: &mut [u8]) -> gkl_transport::Result<usize> {
            let Some(chunk) = self.chunks.pop_front() else {
                return Ok(0);
            };
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    fn send_args(extra: &[&str]) -> SendArgs {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            args: SendArgs,
        }

        let mut argv = vec!["gkl", "/dev/ttyUSB0", "--station", "2"];
        argv.extend_from_slice(extra);
        Harness::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn reply_split_across_reads() {
        let mut source = QueuedSource::default();
        source.chunks.push_back(vec![0xFF, 0x02, 0x00]);
        source.chunks.push_back(vec![]);
        source.chunks.push_back(vec![0x02, 0x53, 0x31, 0x30, 0x50]);

        let frame = wait_for_reply(&mut source, Duration::from_secs(1)).unwrap();
        assert_eq!(frame.address, 2);
        assert_eq!(frame.command, b'S');
        assert_eq!(frame.payload.as_slice(), b"10");
    }

    #[test]
    fn silence_times_out() {
        let mut source = QueuedSource::default();
        let err = wait_for_reply(&mut source, Duration::from_millis(5)).unwrap_err();
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn corrupt_reply_is_data_error() {
        let mut source = QueuedSource::default();
        source
            .chunks
            .push_back(vec![0x02, 0x00, 0x02, 0x53, 0x31, 0x30, 0x51]);

        let err = wait_for_reply(&mut source, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn command_flags() {
        assert_eq!(resolve_command(&send_args(&["--status"])).unwrap(), b'S');
        assert_eq!(resolve_command(&send_args(&["--stop"])).unwrap(), b'B');
        assert_eq!(
            resolve_command(&send_args(&["--command", "L"])).unwrap(),
            b'L'
        );
        assert_eq!(resolve_command(&send_args(&[])).unwrap_err().code, USAGE);
    }
}
