//! Reply generation with the role-consistency correction loop.
//!
//! `ReplyGenerator` wraps the completion backend. Every candidate reply
//! passes the role guard; one that reads as the salesperson earns a single
//! corrective system instruction and one regeneration, after which the
//! result is accepted either way. The corrective instruction stays in the
//! session history so later turns keep the pressure on.

use std::sync::Arc;

use prospect_observe::genai_attrs;
use prospect_types::chat::Turn;
use prospect_types::config::EngineConfig;
use prospect_types::error::BackendError;
use tracing::{Instrument, info_span, warn};

use crate::backend::CompletionBackend;
use crate::guard::RoleGuard;
use crate::session::Session;

/// System context for the one-off greeting completion.
const GREETING_CONTEXT: &str = "You are a customer. Generate natural greetings.";

/// Produces customer replies for sessions.
pub struct ReplyGenerator<B: CompletionBackend, G: RoleGuard> {
    backend: B,
    guard: G,
    config: Arc<EngineConfig>,
}

impl<B: CompletionBackend, G: RoleGuard> ReplyGenerator<B, G> {
    pub fn new(backend: B, guard: G, config: Arc<EngineConfig>) -> Self {
        Self {
            backend,
            guard,
            config,
        }
    }

    /// Generate the customer reply to one salesperson message.
    ///
    /// The salesperson turn is appended to history before the backend call
    /// and the accepted reply after it, so history order always matches
    /// generation order. On a guard violation, a corrective system turn is
    /// appended and the backend is invoked exactly once more; the second
    /// candidate is accepted unconditionally.
    ///
    /// A backend error (first call or retry) bubbles up for the
    /// dispatcher's fallback handling; the turns appended so far stay in
    /// history.
    pub async fn generate(
        &self,
        session: &Session,
        salesperson_text: &str,
    ) -> Result<String, BackendError> {
        let history = session.push_and_snapshot(Turn::salesperson(salesperson_text));
        let candidate = self.complete(&history, &session.topic, false).await?;

        if !self.guard.violates(&candidate) {
            session.push(Turn::customer(candidate.clone()));
            return Ok(candidate);
        }

        warn!(
            chat_id = %session.chat_id,
            "role leakage detected, regenerating with corrective instruction"
        );
        let corrective = self.config.corrective_for(&session.topic);
        let history = session.push_and_snapshot(Turn::system(corrective));
        let candidate = self.complete(&history, &session.topic, true).await?;

        if self.guard.violates(&candidate) {
            warn!(
                chat_id = %session.chat_id,
                "role leakage persists after retry, accepting reply"
            );
        }
        session.push(Turn::customer(candidate.clone()));
        Ok(candidate)
    }

    /// Ask the backend for an in-character opening line.
    ///
    /// Runs outside any session history and skips the consistency check;
    /// the greeting prompt already pins the role.
    pub async fn greeting(&self, topic: &str) -> Result<String, BackendError> {
        let request = vec![
            Turn::system(GREETING_CONTEXT),
            Turn::salesperson(self.config.greeting_prompt_for(topic)),
        ];
        let span = info_span!(
            "gen_ai.greeting",
            gen_ai.operation.name = genai_attrs::OP_GREETING,
            gen_ai.request.model = %self.config.generation.model,
        );
        self.backend
            .complete(&request, &self.config.generation)
            .instrument(span)
            .await
    }

    async fn complete(
        &self,
        history: &[Turn],
        topic: &str,
        retry: bool,
    ) -> Result<String, BackendError> {
        let span = info_span!(
            "gen_ai.complete",
            gen_ai.operation.name = genai_attrs::OP_CHAT,
            gen_ai.request.model = %self.config.generation.model,
            topic = %topic,
            retry,
        );
        self.backend
            .complete(history, &self.config.generation)
            .instrument(span)
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
