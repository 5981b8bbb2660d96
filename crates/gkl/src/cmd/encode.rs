use gkl_frame::{build_frame, FRAME_OVERHEAD, MAX_PAYLOAD};

use crate::cmd::{parse_command, parse_hex, EncodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let command = parse_command(args.command)?;
    let payload = match args.data.as_deref() {
        Some(hex) => parse_hex(hex)?,
        None => Vec::new(),
    };

    let mut buf = [0u8; FRAME_OVERHEAD + MAX_PAYLOAD];
    let len = build_frame(args.station, command, &payload, &mut buf)
        .map_err(|err| frame_error("encode failed", err))?;

    print_encoded(args.station, command, &buf[..len], format);
    Ok(SUCCESS)
}
