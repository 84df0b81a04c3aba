//! One PLC serial channel: frames in, logical messages out.
//!
//! A [`Link`] reads frames through a `FrameReader`, hands each result to
//! a [`Mailbox`] via [`dispatch`], and records every error, drop and
//! skipped send in a shared [`FaultRegister`](plclink_fault::FaultRegister).
//! Delivery is lossy: a full mailbox drops the
//! message and raises `MAILBOX_FULL`; nothing blocks and nothing is retried.

pub mod dispatcher;
pub mod error;
pub mod link;

pub use dispatcher::{dispatch, Delivery, Inbound, Mailbox};
pub use error::{LinkError, Result};
pub use link::{fault_for_error, Link, LinkConfig, LinkStats};
