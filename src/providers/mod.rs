//! Providers Module - External Connections
//!
//! Realtime activity feed and compute inference provider.

pub mod compute;
pub mod realtime;

pub use compute::*;
pub use realtime::*;
