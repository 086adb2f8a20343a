//! Utils Module - Shared Infrastructure
//!
//! Constants, the metadata store and assessment telemetry.

pub mod cache;
pub mod constants;
pub mod telemetry;

pub use cache::*;
pub use constants::*;
pub use telemetry::*;
