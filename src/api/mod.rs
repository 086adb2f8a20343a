//! 0G-Sygna HTTP API Module
//! REST surface over the risk scorer and the metadata store

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use handlers::AppState;
pub use middleware::{start_cleanup_task, RateLimiter};
pub use routes::create_router;
pub use types::*;
