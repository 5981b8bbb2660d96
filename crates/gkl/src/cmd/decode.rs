use gkl_frame::{Frame, FrameError, FrameParser};
use tracing::warn;

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_fault, print_frame, OutputFormat};

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Frame(Frame),
    Fault(FrameError),
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex.join(" "))?;
    let mut parser = if args.requests {
        FrameParser::for_requests()
    } else {
        FrameParser::new()
    };

    let (outcomes, trailing) = decode_all(&mut parser, &bytes);
    let mut faulted = false;
    for outcome in &outcomes {
        match outcome {
            Outcome::Frame(frame) => print_frame(None, frame, format),
            Outcome::Fault(err) => {
                faulted = true;
                print_fault(None, err, format);
            }
        }
    }
    if trailing > 0 {
        warn!(buffered = trailing, "input ends inside a frame");
    }

    Ok(if faulted { DATA_INVALID } else { SUCCESS })
}

/// Run every byte through `parser`. Returns each terminal outcome and how
/// many bytes of an unfinished frame were left buffered.
fn decode_all<const N: usize>(
    parser: &mut FrameParser<N>,
    bytes: &[u8],
) -> (Vec<Outcome>, usize) {
    let mut outcomes = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let (result, consumed) = parser.push_slice(rest);
        rest = &rest[consumed..];
        match result {
            Ok(Some(frame)) => outcomes.push(Outcome::Frame(frame)),
            Ok(None) => {}
            Err(err) => outcomes.push(Outcome::Fault(err)),
        }
    }
    (outcomes, parser.buffered())
}
