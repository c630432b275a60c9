//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, per-request span)
//!     → session / rate limit middleware
//!     → api handlers
//!     → response.rs (ApiError → status + JSON body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ApiError, ApiResult};
pub use server::{AppState, HttpServer};
