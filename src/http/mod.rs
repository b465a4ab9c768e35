//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the segment, transcript and download endpoints
//! - JSON error envelope and status mapping
//! - CORS middleware

pub mod handlers;
pub mod routes;

pub use routes::create_router;
