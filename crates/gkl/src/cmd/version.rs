use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("gkl {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: gkl");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", option_env!("GKL_BUILD_TARGET").unwrap_or("unknown"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "protocol: GKL, {} baud 8N1, stations {}..={}",
        gkl_transport::SerialConfig::DEFAULT_BAUD_RATE,
        gkl_frame::MIN_STATION,
        gkl_frame::MAX_STATION
    );

    Ok(SUCCESS)
}
