//! HTTP surface for the admission service.
//!
//! [`rate_limited_response`] is the boundary adapter route handlers use to
//! turn a denial into a `429`. The router exposes the limiter as a
//! standalone service for callers in other processes.

mod response;
mod server;
mod service;

pub use response::{
    apply_rate_limit_headers, rate_limited_response, DecisionResponse, RATE_LIMIT_LIMIT,
    RATE_LIMIT_REMAINING, RATE_LIMIT_RESET,
};
pub use server::HttpServer;
pub use service::{router, AppState};
