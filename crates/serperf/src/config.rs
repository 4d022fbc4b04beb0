use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Args};
use serperf_frame::MessageType;
use serperf_session::{Role, SessionConfig, StopCondition};
use serperf_transport::{DeviceConfig, TransferMode};

use crate::exit::{session_error, CliError, CliResult, USAGE};

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("role")
        .required(true)
        .args(["server", "client", "loopback"])
))]
pub struct RunArgs {
    /// Run as server: answer requests until interrupted.
    #[arg(short = 's', long)]
    pub server: bool,

    /// Run as client: send requests and check every reply.
    #[arg(short = 'c', long)]
    pub client: bool,

    /// Send and receive on a looped-back device.
    #[arg(short = 'p', long)]
    pub loopback: bool,

    /// Ping-pong payload length in bytes (0..=131072).
    #[arg(short = 'l', long, value_name = "LEN", default_value_t = 1024)]
    pub msg_length: usize,

    /// Message type: 0 = ping-pong, 1 = byte request.
    #[arg(short = 'x', long, value_name = "TYPE", default_value_t = 0, allow_negative_numbers = true)]
    pub msg_type: i32,

    /// Bytes to request from the server (message type 1).
    #[arg(short = 'r', long, value_name = "BYTES")]
    pub req_bytes: Option<u32>,

    /// Stop after this many messages.
    #[arg(short = 'm', long, value_name = "MSGS", conflicts_with = "time")]
    pub messages: Option<u64>,

    /// Stop after this long (e.g. 10, 10s, 1500ms).
    #[arg(short = 't', long, value_name = "DURATION")]
    pub time: Option<String>,

    /// Debug-level logging of every protocol step.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Transfer through driver control requests instead of read/write.
    #[arg(short = 'i', long)]
    pub ioctl: bool,

    /// Wait for the transmit queue to drain on every write (with --ioctl).
    #[arg(short = 'w', long = "wait-4-xmit", requires = "ioctl")]
    pub wait_for_xmit: bool,

    /// How long one read waits before it is retried (e.g. 1s, 250ms).
    #[arg(long, value_name = "DURATION", default_value = "1s")]
    pub read_timeout: String,

    /// Serial character device to test.
    pub device: PathBuf,
}

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub device: PathBuf,
    pub session: SessionConfig,
    pub device_config: DeviceConfig,
}

impl RunConfig {
    pub fn from_args(args: &RunArgs) -> CliResult<Self> {
        let role = if args.server {
            Role::Server
        } else if args.loopback {
            Role::Loopback
        } else {
            Role::Client
        };

        let msg_type = MessageType::try_from(args.msg_type).map_err(|_| {
            CliError::new(
                USAGE,
                format!("{}: not a valid message type (0 or 1)", args.msg_type),
            )
        })?;

        let stop = match (args.messages, &args.time) {
            (Some(limit), _) => StopCondition::Messages(limit),
            (None, Some(time)) => StopCondition::Duration(parse_duration(time)?),
            (None, None) => StopCondition::Unbounded,
        };

        let session = SessionConfig {
            role,
            msg_len: args.msg_length,
            msg_type,
            requested_bytes: args.req_bytes.unwrap_or(0),
            stop,
        };
        session
            .validate()
            .map_err(|err| session_error("invalid arguments", err))?;

        let mode = if args.ioctl {
            TransferMode::Ioctl {
                wait_for_xmit: args.wait_for_xmit,
            }
        } else {
            TransferMode::ReadWrite
        };

        Ok(Self {
            device: args.device.clone(),
            session,
            device_config: DeviceConfig {
                mode,
                read_timeout: parse_duration(&args.read_timeout)?,
            },
        })
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        run: RunArgs,
    }

    fn parse(args: &[&str]) -> Result<RunArgs, clap::Error> {
        TestCli::try_parse_from(std::iter::once("serperf").chain(args.iter().copied()))
            .map(|cli| cli.run)
    }

    #[test]
    fn client_defaults() {
        let args = parse(&["-c", "/dev/serial0"]).unwrap();
        let config = RunConfig::from_args(&args).unwrap();
        assert_eq!(config.session.role, Role::Client);
        assert_eq!(config.session.msg_len, 1024);
        assert_eq!(config.session.msg_type, MessageType::PingPong);
        assert_eq!(config.session.stop, StopCondition::Unbounded);
        assert_eq!(config.device_config.mode, TransferMode::ReadWrite);
        assert_eq!(config.device_config.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn byte_request_with_count_limit() {
        let args = parse(&["-c", "-x", "1", "-r", "500", "-m", "10", "/dev/serial0"]).unwrap();
        let config = RunConfig::from_args(&args).unwrap();
        assert_eq!(config.session.msg_type, MessageType::RequestBytes);
        assert_eq!(config.session.requested_bytes, 500);
        assert_eq!(config.session.stop, StopCondition::Messages(10));
    }

    #[test]
    fn loopback_for_seconds() {
        let args = parse(&["-p", "-t", "2", "/dev/serial0"]).unwrap();
        let config = RunConfig::from_args(&args).unwrap();
        assert_eq!(config.session.role, Role::Loopback);
        assert_eq!(
            config.session.stop,
            StopCondition::Duration(Duration::from_secs(2))
        );
    }

    #[test]
    fn ioctl_with_drain_wait() {
        let args = parse(&["-s", "-i", "-w", "/dev/serial0"]).unwrap();
        let config = RunConfig::from_args(&args).unwrap();
        assert_eq!(
            config.device_config.mode,
            TransferMode::Ioctl {
                wait_for_xmit: true
            }
        );
    }

    #[test]
    fn role_is_required_and_exclusive() {
        let err = parse(&["/dev/serial0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = parse(&["-s", "-c", "/dev/serial0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn stop_conditions_conflict() {
        let err = parse(&["-c", "-m", "5", "-t", "5", "/dev/serial0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn wait_for_xmit_requires_ioctl() {
        let err = parse(&["-c", "-w", "/dev/serial0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn device_is_required() {
        let err = parse(&["-c"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert!(parse(&["-c", "/dev/a", "/dev/b"]).is_err());
    }

    #[test]
    fn invalid_values_are_usage_errors() {
        let args = parse(&["-c", "-l", "131073", "/dev/serial0"]).unwrap();
        assert_eq!(RunConfig::from_args(&args).unwrap_err().code, USAGE);

        let args = parse(&["-c", "-x", "3", "/dev/serial0"]).unwrap();
        assert_eq!(RunConfig::from_args(&args).unwrap_err().code, USAGE);

        let args = parse(&["-c", "-x", "1", "/dev/serial0"]).unwrap();
        assert_eq!(RunConfig::from_args(&args).unwrap_err().code, USAGE);

        let args = parse(&["-c", "-t", "0", "/dev/serial0"]).unwrap();
        assert_eq!(RunConfig::from_args(&args).unwrap_err().code, USAGE);
    }

    #[test]
    fn server_ignores_request_count() {
        let args = parse(&["-s", "-x", "1", "/dev/serial0"]).unwrap();
        assert!(RunConfig::from_args(&args).is_ok());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
