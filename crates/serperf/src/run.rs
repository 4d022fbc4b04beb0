#![cfg_attr(not(target_os = "linux"), allow(unused_imports, dead_code))]

use serperf_frame::MessageType;
use serperf_session::{CancellationToken, Role, SessionStats, StopCondition};
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::exit::{CliError, CliResult, INTERNAL, INTERRUPTED, SUCCESS};
use crate::output::{print_report, ReportFormat, RunReport, RunStatus};

#[cfg(target_os = "linux")]
pub fn run(config: RunConfig, format: ReportFormat) -> CliResult<i32> {
    use serperf_session::run_session;
    use serperf_transport::SerialDevice;

    use crate::exit::{session_error, transport_error};

    let stats = SessionStats::new();
    log_banner(&config);

    let device = SerialDevice::open(&config.device, config.device_config.clone())
        .map_err(|err| transport_error("open failed", err))?;

    let cancel = CancellationToken::new();
    install_ctrlc_handler(cancel.clone())?;

    let result = run_session(&device, &config.session, &stats, cancel);

    let device_name = config.device.display().to_string();
    let mut report = RunReport::new(&device_name, config.session.role, stats.snapshot());
    let code = match result {
        Ok(outcome) => {
            info!(?outcome, "session finished");
            Ok(SUCCESS)
        }
        Err(err) => {
            let cli_err = session_error("session failed", err);
            if cli_err.code == INTERRUPTED {
                warn!("interrupted");
                report.status = RunStatus::Interrupted;
                Ok(INTERRUPTED)
            } else {
                error!(code = cli_err.code, error = %cli_err, "session failed");
                report.status = RunStatus::Failed;
                report.error = Some(cli_err.message.clone());
                Err(cli_err)
            }
        }
    };

    print_report(&report, format);
    code
}

#[cfg(not(target_os = "linux"))]
pub fn run(config: RunConfig, _format: ReportFormat) -> CliResult<i32> {
    log_banner(&config);
    Err(CliError::new(
        crate::exit::FAILURE,
        "serial devices are only supported on Linux",
    ))
}

/// Startup banner: device, role and the settings that role uses.
fn log_banner(config: &RunConfig) {
    let session = &config.session;
    info!(device = %config.device.display(), role = %session.role, "serperf starting");

    if session.role != Role::Server {
        info!("message length = {}", session.request_len());
    }
    if session.role != Role::Loopback {
        info!("message type = {}", session.msg_type);
    }
    if session.msg_type == MessageType::RequestBytes && session.role == Role::Client {
        info!("bytes requested to server = {}", session.requested_bytes);
    }
    if session.stop != StopCondition::Unbounded {
        info!("send {}", session.stop);
    }
}

fn install_ctrlc_handler(cancel: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        cancel.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
