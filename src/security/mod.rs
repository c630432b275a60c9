//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (CORS preflight / origin check)
//!     → rate_limit.rs (per client address and platform, playlist routes only)
//!     → handler
//! Outgoing response:
//!     → headers.rs (nosniff, frame and referrer policy)
//! ```
//!
//! # Design Decisions
//! - Rejections are JSON errors like every other failure
//! - Limiter state is bounded and swept in the background

pub mod headers;
pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiter};
