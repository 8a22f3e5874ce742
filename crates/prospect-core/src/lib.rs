//! Engine logic and port trait definitions for Prospect.
//!
//! This crate defines the "ports" (backend, transport, and store traits)
//! that the infrastructure layer implements, plus the engine that drives
//! one simulated customer per chat: session state, debounce scheduling,
//! batch dispatch, and the role-consistency correction loop. It depends
//! only on `prospect-types` -- never on `prospect-infra` or any
//! database/IO crate.

pub mod backend;
pub mod engine;
pub mod guard;
pub mod queue;
pub mod reply;
pub mod session;
pub mod store;
pub mod transport;
