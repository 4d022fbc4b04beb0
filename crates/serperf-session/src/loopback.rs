use std::thread;

use serde::Serialize;
use serperf_frame::Message;
use serperf_transport::SerialTransport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{finished, run_until};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::exchange::Exchange;
use crate::stats::SessionStats;

const READER_THREAD: &str = "serperf-reader";

/// Per-direction counts of a finished loopback run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopbackSummary {
    pub sent: u64,
    pub received: u64,
}

/// Sends and receives concurrently on one looped-back transport.
///
/// A writer runs the client send loop without waiting for replies while a
/// reader thread receives and verifies whatever comes back. Once the writer
/// reaches its stop condition the reader is cancelled; frames still in flight
/// at that point are dropped. If the reader fails, the writer is stopped and
/// the reader's error is returned.
pub struct Loopback<'a, T> {
    transport: &'a T,
    config: &'a SessionConfig,
    stats: &'a SessionStats,
    cancel: CancellationToken,
}

impl<'a, T: SerialTransport> Loopback<'a, T> {
    pub fn new(
        transport: &'a T,
        config: &'a SessionConfig,
        stats: &'a SessionStats,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            config,
            stats,
            cancel,
        }
    }

    pub fn run(&self) -> Result<LoopbackSummary> {
        debug!("erasing buffers");
        self.transport.clear_rx_buffer()?;

        let request = self.config.request_message()?;
        info!(
            kind = %request.kind(),
            bytes = request.len(),
            stop = %self.config.stop,
            "starting loopback"
        );

        let reader_token = self.cancel.child_token();
        let writer_token = self.cancel.child_token();

        thread::scope(|s| -> Result<LoopbackSummary> {
            let reader = thread::Builder::new()
                .name(READER_THREAD.to_string())
                .spawn_scoped(s, || {
                    let result = self.read_loop(reader_token.clone());
                    if let Err(err) = &result {
                        warn!(error = %err, "reader stopped, stopping writer");
                        writer_token.cancel();
                    }
                    result
                })
                .map_err(|source| SessionError::Spawn {
                    name: READER_THREAD,
                    source,
                })?;

            let written = self.write_loop(&request, &writer_token);

            debug!("writer finished, cancelling reader");
            reader_token.cancel();
            let received = reader
                .join()
                .map_err(|_| SessionError::WorkerPanicked(READER_THREAD))?;

            let received = received?;
            let sent = written?;
            finished(self.config.stop, sent);
            Ok(LoopbackSummary { sent, received })
        })
    }

    fn write_loop(&self, request: &Message, cancel: &CancellationToken) -> Result<u64> {
        let mut exchange = Exchange::new(self.transport, self.stats, cancel.clone());
        match run_until(self.config.stop, cancel, || exchange.send(request)) {
            // A write cut short by cancellation is the cancellation, not a failure.
            Err(err) if cancel.is_cancelled() => {
                debug!(error = %err, "writer stopped after cancellation");
                Err(SessionError::Cancelled)
            }
            result => result,
        }
    }

    /// Receive until cancelled. Cancellation is the normal way out.
    fn read_loop(&self, cancel: CancellationToken) -> Result<u64> {
        let mut exchange = Exchange::new(self.transport, self.stats, cancel);
        let mut received = 0u64;
        loop {
            match exchange.receive_with_retry() {
                Ok(_) => received += 1,
                Err(SessionError::Cancelled) => {
                    debug!(received, timeouts = exchange.timeouts(), "reader cancelled");
                    return Ok(received);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
