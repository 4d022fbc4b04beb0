//! Client, server and loopback sessions for serial performance probing.
//!
//! This is the layer that drives the protocol. A session runs one role
//! against a [`SerialTransport`](serperf_transport::SerialTransport) and
//! counts every message that crosses it:
//! - [`Server`] answers ping-pong and byte-request messages until stopped
//! - [`Client`] sends requests and checks every reply
//! - [`Loopback`] sends and receives concurrently on one looped-back handle
//!
//! Every protocol or integrity failure is fatal and surfaces as a
//! [`SessionError`]; the caller is expected to report the counters and stop.

pub mod client;
pub mod config;
pub mod error;
pub mod exchange;
pub mod loopback;
pub mod pattern;
pub mod server;
pub mod session;
pub mod stats;
pub mod stop;

pub use client::Client;
pub use config::{Role, SessionConfig};
pub use error::{Result, SessionError};
pub use exchange::Exchange;
pub use loopback::{Loopback, LoopbackSummary};
pub use server::Server;
pub use session::{run_session, SessionOutcome};
pub use stats::{SessionStats, StatsSnapshot};
pub use stop::{StopClock, StopCondition};
pub use tokio_util::sync::CancellationToken;
