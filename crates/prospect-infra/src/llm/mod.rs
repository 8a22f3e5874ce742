//! LLM completion backends.
//!
//! Contains concrete implementations of the [`CompletionBackend`] trait
//! defined in `prospect-core`. The engine only ever sees the trait; which
//! endpoint actually writes the customer's lines is decided here.
//!
//! [`CompletionBackend`]: prospect_core::backend::CompletionBackend

pub mod openai_compat;

pub use openai_compat::{OpenAiCompatBackend, OpenAiCompatConfig};
