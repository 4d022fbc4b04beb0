//! Serial device performance tester.
//!
//! serperf drives a character device with a small framed request/response
//! protocol and measures how many messages cross it, and how fast.
//!
//! # Crate Structure
//!
//! - [`transport`]: the serial device contract and its implementations
//! - [`frame`]: wire codec, CRC-8 and the message reader/writer
//! - [`session`]: server, client and loopback roles with their counters

/// Re-export transport types.
pub mod transport {
    pub use serperf_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serperf_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use serperf_session::*;
}
