//! HTTP/REST API layer for Prospect.
//!
//! Axum-based REST API at `/api/v1/` with envelope responses, an SSE
//! reply stream per chat, and CORS support.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
