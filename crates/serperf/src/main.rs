mod config;
mod exit;
mod logging;
mod output;
mod run;

use clap::Parser;

use crate::config::{RunArgs, RunConfig};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::ReportFormat;

#[derive(Parser, Debug)]
#[command(
    name = "serperf",
    version,
    about = "Serial device performance tester",
    after_help = "Exit codes: 0 success, 1 failure, 3 transport error, 50 permission denied, \
                  60 invalid data, 64 usage, 124 timeout, 130 interrupted"
)]
struct Cli {
    /// Report format.
    #[arg(long, value_name = "FORMAT")]
    format: Option<ReportFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    #[command(flatten)]
    run: RunArgs,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level.with_verbose(cli.run.verbose));

    let format = cli.format.unwrap_or_else(ReportFormat::default_for_stdout);
    let result = RunConfig::from_args(&cli.run).and_then(|config| run::run(config, format));

    match result {
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
    fn parses_client_invocation() {
        let cli = Cli::try_parse_from([
            "serperf",
            "--format",
            "pretty",
            "-c",
            "-l",
            "64",
            "-m",
            "10",
            "/dev/serial0",
        ])
        .expect("client args should parse");

        assert!(cli.run.client);
        assert_eq!(cli.run.msg_length, 64);
        assert!(matches!(cli.format, Some(ReportFormat::Pretty)));
    }

    #[test]
    fn verbose_flag_parses() {
        let cli = Cli::try_parse_from(["serperf", "-s", "-v", "/dev/serial0"])
            .expect("server args should parse");
        assert!(cli.run.verbose);
        assert!(cli.run.server);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = Cli::try_parse_from(["serperf", "--log-level", "loud", "-c", "/dev/serial0"])
            .expect_err("unknown level should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
