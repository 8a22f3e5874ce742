//! CompletionBackend trait definition.
//!
//! The backend is the model that writes the customer's lines. The engine
//! only ever hands it a full conversation history and sampling parameters.

use prospect_types::chat::Turn;
use prospect_types::config::GenerationParams;
use prospect_types::error::BackendError;

/// Port to the completion model behind the simulated customer.
///
/// Implementations live in prospect-infra (e.g., `OpenAiCompatBackend`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait CompletionBackend: Send + Sync {
    /// Generate the next customer turn from the full history.
    ///
    /// The history is ordered oldest first and always starts with the
    /// session's system preamble. May fail transiently; the caller decides
    /// whether and how often to retry.
    fn complete(
        &self,
        history: &[Turn],
        params: &GenerationParams,
    ) -> impl std::future::Future<Output = Result<String, BackendError>> + Send;
}
