//! Observability for Prospect.
//!
//! Structured logging setup (tracing-subscriber) with an optional
//! OpenTelemetry bridge, plus the GenAI semantic convention attributes the
//! engine stamps on completion spans.

pub mod genai_attrs;
pub mod tracing_setup;
