use serperf_frame::{Message, MessageType};
use serperf_transport::SerialTransport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::exchange::Exchange;
use crate::pattern::first_difference;
use crate::stats::SessionStats;
use crate::stop::StopCondition;

/// Sends requests and validates every reply.
pub struct Client<'a, T> {
    exchange: Exchange<'a, T>,
    config: &'a SessionConfig,
    cancel: CancellationToken,
}

impl<'a, T: SerialTransport> Client<'a, T> {
    pub fn new(
        transport: &'a T,
        config: &'a SessionConfig,
        stats: &'a SessionStats,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            exchange: Exchange::new(transport, stats, cancel.clone()),
            config,
            cancel,
        }
    }

    /// Run exchanges until the stop condition is met. Returns the number of
    /// completed exchanges.
    ///
    /// The device receive buffer is cleared first; failing to clear it is fatal.
    pub fn run(&mut self) -> Result<u64> {
        debug!("erasing buffers");
        self.exchange.transport().clear_rx_buffer()?;

        let request = self.config.request_message()?;
        info!(
            kind = %request.kind(),
            bytes = request.len(),
            stop = %self.config.stop,
            "starting client"
        );

        let exchange = &mut self.exchange;
        let config = self.config;
        let completed = run_until(config.stop, &self.cancel, || {
            let reply = exchange.exchange(&request)?;
            check_reply(config, &request, &reply)
        })?;

        finished(config.stop, completed);
        Ok(completed)
    }
}

/// Run `step` until `stop` says otherwise. The condition is evaluated before
/// each step, so a step that started before a deadline always completes.
pub(crate) fn run_until(
    stop: StopCondition,
    cancel: &CancellationToken,
    mut step: impl FnMut() -> Result<()>,
) -> Result<u64> {
    let mut clock = stop.start();
    while clock.should_continue() {
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        step()?;
        clock.record();
    }
    Ok(clock.completed())
}

pub(crate) fn finished(stop: StopCondition, completed: u64) {
    match stop {
        StopCondition::Messages(limit) => info!("finished sending {limit} messages"),
        StopCondition::Duration(limit) => info!(
            completed,
            "finished sending data for {} seconds",
            limit.as_secs_f64()
        ),
        StopCondition::Unbounded => {}
    }
}

/// Validate a reply against the request that produced it.
pub fn check_reply(config: &SessionConfig, request: &Message, reply: &Message) -> Result<()> {
    if reply.kind() != request.kind() {
        return Err(SessionError::ReplyTypeMismatch {
            expected: request.kind(),
            got: reply.kind(),
        });
    }

    match config.msg_type {
        MessageType::RequestBytes => {
            if reply.len() != config.requested_bytes as usize {
                return Err(SessionError::ReplyLengthMismatch {
                    requested: config.requested_bytes,
                    got: reply.len(),
                });
            }
        }
        MessageType::PingPong => {
            if let Some(offset) = first_difference(&request.payload, &reply.payload) {
                return Err(SessionError::ReplyPayloadMismatch { offset });
            }
        }
    }
    Ok(())
}
