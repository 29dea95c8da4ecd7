//! HTTP API server

pub mod error;
pub mod routes;
pub mod server;

pub use error::{ApiError, JsonBody};
pub use routes::ApiResponse;
pub use server::*;
