//! Shared domain types for the Prospect sales-training engine.
//!
//! This crate carries no infrastructure dependencies. It defines the
//! conversation model (`chat`), the externalized engine configuration
//! (`config`), and the error types returned by the trait ports defined
//! in `prospect-core` (`error`).

pub mod chat;
pub mod config;
pub mod error;
