//! OpenTelemetry GenAI Semantic Convention attributes.
//!
//! Every completion span the engine opens carries `gen_ai.*` fields
//! following the OTel GenAI semantic conventions. `tracing` macros require
//! literal field names, so span sites spell the dotted names inline; the
//! name constants here are the contract for exporters and anything querying
//! the traces, and the value constants are what span sites record.
//!
//! Span naming convention: `gen_ai.complete` for customer turns,
//! `gen_ai.greeting` for session-opening lines.

// --- Attribute names ---

/// The name of the operation being performed ("chat", "greeting").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The model ID requested (e.g., "gpt-4o-mini").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The sampling temperature for the request.
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

/// The maximum number of output tokens requested.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

// --- Operation name values ---

/// A customer reply generated from the running conversation history.
pub const OP_CHAT: &str = "chat";

/// A session-opening line generated outside the conversation history.
pub const OP_GREETING: &str = "greeting";
