//! WaiEdu - education platform API
//!
//! Accounts with stateless bearer-token sessions, a course catalog with
//! enrollments, and a document-backed catalog of 3D blocks, served over
//! HTTP by axum. The same services are usable directly as a library.

pub mod accounts;
pub mod api;
pub mod auth;
pub mod blocks;
pub mod cli;
pub mod config;
pub mod courses;
pub mod error;
pub mod store;
pub mod validation;

pub use config::Config;
pub use error::Error;
