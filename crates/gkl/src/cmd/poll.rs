use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gkl_frame::Frame;
use gkl_poll::{ChannelId, ChannelObserver, Clock, Controller, ControllerConfig, MonotonicClock};
use tracing::info;

use crate::cmd::{duration_ms, open_port, parse_duration, PollArgs};
use crate::exit::{io_error, poll_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS};
use crate::output::{print_frame, print_stats, OutputFormat};

const LOOP_SLEEP: Duration = Duration::from_millis(1);

pub fn run(args: PollArgs, format: OutputFormat) -> CliResult<i32> {
    let config = resolve_config(&args)?;
    let stop_after = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(duration_ms);

    let one = open_port(&args.port_one, args.baud)?;
    let two = open_port(&args.port_two, args.baud)?;
    let mut controller =
        Controller::new(config, one, two).map_err(|err| poll_error("invalid configuration", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let clock = MonotonicClock::new();
    let mut printer = FramePrinter {
        format,
        received: 0,
    };
    info!(
        port_one = %args.port_one,
        port_two = %args.port_two,
        "polling started"
    );

    while running.load(Ordering::SeqCst) {
        let now = clock.now_ms();
        if stop_after.is_some_and(|end| now >= end) {
            break;
        }
        controller.service(now, &mut printer);
        if args.count.is_some_and(|count| printer.received >= count) {
            break;
        }
        thread::sleep(LOOP_SLEEP);
    }

    let stats = ChannelId::ALL.map(|id| (id, controller.channel(id).stats()));
    info!(frames = printer.received, "polling stopped");
    print_stats(&stats, format);
    Ok(SUCCESS)
}

/// Prints each frame as it arrives. Faults are already logged by the
/// schedulers.
struct FramePrinter {
    format: OutputFormat,
    received: usize,
}

impl ChannelObserver for FramePrinter {
    fn frame_received(&mut self, channel: ChannelId, frame: &Frame) {
        print_frame(Some(channel), frame, self.format);
        self.received = self.received.saturating_add(1);
    }
}

fn resolve_config(args: &PollArgs) -> CliResult<ControllerConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ControllerConfig::default(),
    };

    if let Some(station) = args.station_one {
        config.channel_one.station = station;
    }
    if let Some(station) = args.station_two {
        config.channel_two.station = station;
    }
    if let Some(interval) = args.poll_interval.as_deref() {
        let interval = duration_ms(parse_duration(interval)?);
        for id in ChannelId::ALL {
            config.channel_mut(id).poll_interval_ms = interval;
        }
    }
    if let Some(timeout) = args.reply_timeout.as_deref() {
        let timeout = duration_ms(parse_duration(timeout)?);
        for id in ChannelId::ALL {
            config.channel_mut(id).reply_timeout_ms = timeout;
        }
    }
    if let Some(gap) = args.interbyte_gap.as_deref() {
        let gap = if gap.trim().eq_ignore_ascii_case("off") {
            None
        } else {
            Some(duration_ms(parse_duration(gap)?))
        };
        for id in ChannelId::ALL {
            config.channel_mut(id).interbyte_gap_ms = gap;
        }
    }

    config
        .validate()
        .map_err(|err| poll_error("invalid configuration", err))?;
    Ok(config)
}

fn load_config(path: &Path) -> CliResult<ControllerConfig> {
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => {
            CliError::usage(format!("config file {} not found", path.display()))
        }
        _ => io_error(&format!("failed reading {}", path.display()), err),
    })?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::new(
            DATA_INVALID,
            format!("invalid config {}: {err}", path.display()),
        )
    })
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: PollArgs,
    }

    fn args(extra: &[&str]) -> PollArgs {
        let mut argv = vec!["gkl", "--port-one", "/dev/null-one", "--port-two", "/dev/null-two"];
        argv.extend_from_slice(extra);
        Harness::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn defaults_match_deployment() {
        let config = resolve_config(&args(&[])).unwrap();
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn overrides_apply_to_both_channels() {
        let config = resolve_config(&args(&[
            "--station-one",
            "5",
            "--poll-interval",
            "500ms",
            "--reply-timeout",
            "120ms",
        ]))
        .unwrap();

        assert_eq!(config.channel_one.station, 5);
        assert_eq!(config.channel_two.station, 2);
        for id in ChannelId::ALL {
            assert_eq!(config.channel(id).poll_interval_ms, 500);
            assert_eq!(config.channel(id).reply_timeout_ms, 120);
        }
    }

    #[test]
    fn short_reply_timeout_with_matching_gap() {
        let config =
            resolve_config(&args(&["--reply-timeout", "10ms", "--interbyte-gap", "4ms"])).unwrap();
        for id in ChannelId::ALL {
            assert_eq!(config.channel(id).reply_timeout_ms, 10);
            assert_eq!(config.channel(id).interbyte_gap_ms, Some(4));
        }

        let config =
            resolve_config(&args(&["--reply-timeout", "5ms", "--interbyte-gap", "OFF"])).unwrap();
        assert_eq!(config.channel_one.interbyte_gap_ms, None);
        assert_eq!(config.channel_two.interbyte_gap_ms, None);
    }

    #[test]
    fn gap_not_below_timeout_is_usage_error() {
        let err = resolve_config(&args(&["--reply-timeout", "10ms"])).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
        assert!(resolve_config(&args(&["--interbyte-gap", "soon"])).is_err());
    }

    #[test]
    fn missing_config_file_is_usage_error() {
        let path = std::env::temp_dir().join(format!("gkl-missing-{}.json", std::process::id()));
        let path_arg = path.to_string_lossy().into_owned();

        let err = resolve_config(&args(&["--config", &path_arg])).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
        assert!(err.message.contains("not found"));
    }

    #[test]
    fn station_on_wrong_channel_is_usage_error() {
        let err = resolve_config(&args(&["--station-one", "4"])).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }

    #[test]
    fn config_file_is_loaded() {
        let path = std::env::temp_dir().join(format!("gkl-config-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{ "channel_one": { "station": 3 }, "channel_two": { "station": 4 } }"#,
        )
        .unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        let config = resolve_config(&args(&["--config", &path_arg])).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.channel_one.station, 3);
        assert_eq!(config.channel_two.station, 4);
    }

    #[test]
    fn malformed_config_is_data_error() {
        let path = std::env::temp_dir().join(format!("gkl-bad-{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        let err = resolve_config(&args(&["--config", &path_arg])).unwrap_err();
        let _ = fs::remove_file(&path);

        assert_eq!(err.code, DATA_INVALID);
    }
}
