//! Infrastructure layer for Prospect.
//!
//! Contains implementations of the port traits defined in `prospect-core`:
//! SQLite transcript storage, the OpenAI-compatible completion backend, and
//! the outbound reply transports (in-process broadcast and webhook).

pub mod config;
pub mod llm;
pub mod sqlite;
pub mod transport;
