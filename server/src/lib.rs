//! HTTP surface of the configuration service: the axum API, request
//! admission (rate limiting, bearer auth, webhook signatures) and the
//! asynchronous branch-update pipeline behind the webhook endpoint.

pub mod api;
pub mod auth;
pub mod metrics_defs;
pub mod queue;
pub mod rate_limit;
pub mod signature;
pub mod worker;

pub use api::{ApiError, AppState};
pub use queue::{UpdateQueue, UpdateReceiver};
pub use rate_limit::SlidingWindowLimiter;
