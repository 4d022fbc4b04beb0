use serde::Serialize;
use serperf_transport::SerialTransport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::Client;
use crate::config::{Role, SessionConfig};
use crate::error::{Result, SessionError};
use crate::loopback::{Loopback, LoopbackSummary};
use crate::server::Server;
use crate::stats::SessionStats;

/// How a session that ran to its stop condition ended.
///
/// A server has no stop condition of its own; it only ends with an error,
/// [`SessionError::Cancelled`](crate::SessionError::Cancelled) included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum SessionOutcome {
    Client { exchanges: u64 },
    Loopback(LoopbackSummary),
}

/// Validate `config` and run its role on `transport`.
///
/// Counters are recorded in `stats`, which stays readable whatever the
/// outcome. Cancelling `cancel` stops the session at the next read attempt
/// or loop iteration. Any error that surfaces once `cancel` has fired, such
/// as a write cut short by the interrupt, is reported as
/// [`SessionError::Cancelled`].
pub fn run_session<T: SerialTransport>(
    transport: &T,
    config: &SessionConfig,
    stats: &SessionStats,
    cancel: CancellationToken,
) -> Result<SessionOutcome> {
    config.validate()?;
    info!(
        role = %config.role,
        transport = transport.transport_name(),
        "session starting"
    );

    match run_role(transport, config, stats, cancel.clone()) {
        Err(err) if cancel.is_cancelled() && !err.is_cancelled() => {
            debug!(error = %err, "session stopped after cancellation");
            Err(SessionError::Cancelled)
        }
        result => result,
    }
}

fn run_role<T: SerialTransport>(
    transport: &T,
    config: &SessionConfig,
    stats: &SessionStats,
    cancel: CancellationToken,
) -> Result<SessionOutcome> {
    match config.role {
        Role::Server => {
            let served = Server::new(transport, stats, cancel).run()?;
            match served {}
        }
        Role::Client => {
            let exchanges = Client::new(transport, config, stats, cancel).run()?;
            Ok(SessionOutcome::Client { exchanges })
        }
        Role::Loopback => {
            let summary = Loopback::new(transport, config, stats, cancel).run()?;
            Ok(SessionOutcome::Loopback(summary))
        }
    }
}
