//! The engine: ingestion, debounce scheduling, and batch dispatch.
//!
//! One `Engine` drives every chat in the process. Inbound salesperson
//! messages are persisted, buffered, and answered in batches: each message
//! restarts the chat's quiet-period timer, and when a window finally
//! expires the whole buffer is dispatched in arrival order, one generated
//! reply per message.
//!
//! All per-chat state lives in maps owned by the engine's injected parts
//! (`SessionManager`, `DebounceLedger`), so independent engines can coexist
//! and tests get clean teardown.

use std::sync::Arc;

use prospect_types::chat::{ChatId, MessageId, MessageRecord, Role, SessionInfo, SessionStart, Turn};
use prospect_types::config::EngineConfig;
use tracing::{debug, info, warn};

use crate::backend::CompletionBackend;
use crate::guard::RoleGuard;
use crate::queue::{DebounceLedger, QueueEntry};
use crate::reply::ReplyGenerator;
use crate::session::SessionManager;
use crate::store::TranscriptStore;
use crate::transport::Transport;

struct EngineInner<B: CompletionBackend, G: RoleGuard, T: Transport, S: TranscriptStore> {
    sessions: SessionManager,
    ledger: DebounceLedger,
    replies: ReplyGenerator<B, G>,
    transport: T,
    store: S,
    config: Arc<EngineConfig>,
}

/// The simulated-customer engine.
///
/// Cloning is cheap and produces a shared view; timer tasks hold clones.
pub struct Engine<B: CompletionBackend, G: RoleGuard, T: Transport, S: TranscriptStore> {
    inner: Arc<EngineInner<B, G, T, S>>,
}

impl<B, G, T, S> Clone for Engine<B, G, T, S>
where
    B: CompletionBackend,
    G: RoleGuard,
    T: Transport,
    S: TranscriptStore,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B, G, T, S> Engine<B, G, T, S>
where
    B: CompletionBackend + 'static,
    G: RoleGuard + 'static,
    T: Transport + 'static,
    S: TranscriptStore + 'static,
{
    pub fn new(backend: B, guard: G, transport: T, store: S, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        Self {
            inner: Arc::new(EngineInner {
                sessions: SessionManager::new(Arc::clone(&config)),
                ledger: DebounceLedger::new(),
                replies: ReplyGenerator::new(backend, guard, Arc::clone(&config)),
                transport,
                store,
                config,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Access the transcript store (for the reporting surface).
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Ingest one salesperson message.
    ///
    /// The message is persisted immediately, buffered for the chat, and the
    /// chat's quiet-period timer restarts from now -- a message arriving at
    /// time T always extends the window to T plus the debounce duration.
    /// Returns the correlation id assigned to the message.
    pub async fn handle_incoming(&self, chat_id: ChatId, text: impl Into<String>) -> MessageId {
        let text = text.into();
        let message_id = MessageId::new();
        let session = self.inner.sessions.get_or_create(chat_id);

        let record = MessageRecord::now(session.run_id, chat_id, Role::Salesperson, text.clone());
        self.persist(record).await;

        let generation = self.inner.ledger.push(chat_id, QueueEntry { message_id, text });
        let handle = tokio::spawn({
            let engine = self.clone();
            async move {
                tokio::time::sleep(engine.inner.config.debounce()).await;
                engine.fire(chat_id, generation).await;
            }
        });
        self.inner.ledger.arm(chat_id, generation, handle);

        debug!(
            %chat_id,
            %message_id,
            generation,
            pending = self.inner.ledger.pending_len(chat_id),
            "message buffered, debounce window restarted"
        );
        message_id
    }

    /// Ensure the chat has a session and send an opening customer greeting.
    ///
    /// An existing session is reused as-is: topic, run id, history, buffered
    /// messages, and armed timer all survive, and the greeting lands on top
    /// of the live conversation. Only a chat with no session draws a topic
    /// and run id; wiping state is [`reset`](Self::reset)'s job. The
    /// greeting comes from the backend when possible and from the configured
    /// static line otherwise; either way it is appended to history,
    /// persisted, sent without correlation, and returned together with the
    /// session view.
    pub async fn start_session(&self, chat_id: ChatId) -> SessionStart {
        let session = self.inner.sessions.get_or_create(chat_id);

        let greeting = match self.inner.replies.greeting(&session.topic).await {
            Ok(text) => text,
            Err(e) => {
                warn!(%chat_id, "greeting generation failed, using static greeting: {e}");
                self.inner.config.greeting_fallback_for(&session.topic)
            }
        };

        session.push(Turn::customer(greeting.clone()));
        let record = MessageRecord::now(session.run_id, chat_id, Role::Customer, greeting.clone());
        self.persist(record).await;

        if let Err(e) = self.inner.transport.send(chat_id, &greeting, None).await {
            warn!(%chat_id, "greeting delivery failed: {e}");
        }

        info!(
            %chat_id,
            run_id = %session.run_id,
            topic = %session.topic,
            "greeting sent"
        );
        SessionStart {
            greeting,
            session: session.info(),
        }
    }

    /// Drop the chat's session, buffered messages, and armed timer.
    ///
    /// Returns `true` if a session existed. The chat's recent-topic history
    /// survives, so the next session draws a different product.
    pub fn reset(&self, chat_id: ChatId) -> bool {
        let dropped = self.inner.ledger.abort_chat(chat_id);
        if dropped > 0 {
            debug!(%chat_id, dropped, "discarded buffered messages on reset");
        }
        match self.inner.sessions.remove(chat_id) {
            Some(session) => {
                info!(%chat_id, run_id = %session.run_id, "session reset");
                true
            }
            None => false,
        }
    }

    /// Live view of the chat's session, if one exists.
    pub fn session_info(&self, chat_id: ChatId) -> Option<SessionInfo> {
        self.inner.sessions.get(chat_id).map(|s| s.info())
    }

    /// Number of live sessions.
    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.session_count()
    }

    /// Number of chats with buffered, undispatched messages.
    pub fn pending_chats(&self) -> usize {
        self.inner.ledger.pending_chats()
    }

    /// Abort every armed timer and discard buffered messages.
    ///
    /// Batches that already claimed their buffer finish on their own; only
    /// unfired windows are cancelled.
    pub fn shutdown(&self) {
        let dropped = self.inner.ledger.abort_all();
        if dropped > 0 {
            warn!(dropped, "shutdown discarded buffered messages");
        }
    }

    // --- Dispatch path ---

    /// Timer body: claim the batch if this timer is still current, then
    /// dispatch it.
    async fn fire(&self, chat_id: ChatId, generation: u64) {
        let Some(entries) = self.inner.ledger.claim(chat_id, generation) else {
            // A newer message re-armed the window after this timer woke.
            return;
        };
        if entries.is_empty() {
            return;
        }
        self.run_batch(chat_id, entries).await;
    }

    /// Reply to every buffered message, in arrival order.
    ///
    /// One reply is generated, persisted, and sent per message, with the
    /// configured spacing between sends. A generation failure downgrades
    /// that one reply to the configured fallback; a persist or send failure
    /// is logged and the loop moves on. Once started, the batch always runs
    /// to completion.
    async fn run_batch(&self, chat_id: ChatId, entries: Vec<QueueEntry>) {
        let session = self.inner.sessions.get_or_create(chat_id);
        let count = entries.len();
        info!(%chat_id, run_id = %session.run_id, count, "dispatching batch");

        for (index, entry) in entries.into_iter().enumerate() {
            let reply = match self.inner.replies.generate(&session, &entry.text).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(
                        %chat_id,
                        message_id = %entry.message_id,
                        "generation failed, using fallback reply: {e}"
                    );
                    self.inner.config.fallback_reply.clone()
                }
            };

            let record = MessageRecord::now(session.run_id, chat_id, Role::Customer, reply.clone());
            self.persist(record).await;

            if let Err(e) = self
                .inner
                .transport
                .send(chat_id, &reply, Some(entry.message_id))
                .await
            {
                warn!(
                    %chat_id,
                    message_id = %entry.message_id,
                    "reply delivery failed: {e}"
                );
            }

            if index + 1 < count {
                tokio::time::sleep(self.inner.config.send_spacing()).await;
            }
        }
        debug!(%chat_id, count, "batch complete");
    }

    /// Best-effort transcript write. Failures are logged, never propagated.
    async fn persist(&self, record: MessageRecord) {
        if let Err(e) = self.inner.store.append(&record).await {
            warn!(
                run_id = %record.run_id,
                role = %record.role,
                "transcript append failed: {e}"
            );
        }
    }
}

impl<B, G, T, S> std::fmt::Debug for Engine<B, G, T, S>
where
    B: CompletionBackend,
    G: RoleGuard,
    T: Transport,
    S: TranscriptStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("sessions", &self.inner.sessions.session_count())
            .field("pending_chats", &self.inner.ledger.pending_chats())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::ForbiddenPhrases;
    use prospect_types::error::{BackendError, StoreError, TransportError};
    use uuid::Uuid;

    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    /// Plays back scripted outcomes, then echoes the latest salesperson
    /// turn.
    #[derive(Clone, Default)]
    struct EchoBackend {
        script: Arc<Mutex<VecDeque<Result<String, BackendError>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl EchoBackend {
        fn scripted(outcomes: Vec<Result<String, BackendError>>) -> Self {
            Self {
                script: Arc::new(Mutex::new(outcomes.into())),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CompletionBackend for EchoBackend {
        async fn complete(
            &self,
            history: &[Turn],
            _params: &prospect_types::config::GenerationParams,
        ) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(next) = self.script.lock().unwrap().pop_front() {
                return next;
            }
            let last = history
                .iter()
                .rev()
                .find(|t| t.role == Role::Salesperson)
                .map(|t| t.text.clone())
                .unwrap_or_default();
            Ok(format!("re: {last}"))
        }
    }

    struct SentReply {
        chat_id: ChatId,
        text: String,
        reply_to: Option<MessageId>,
        at: Instant,
    }

    #[derive(Clone, Default)]
    struct RecordingTransport {
        sent: Arc<Mutex<Vec<SentReply>>>,
    }

    impl Transport for RecordingTransport {
        async fn send(
            &self,
            chat_id: ChatId,
            text: &str,
            reply_to: Option<MessageId>,
        ) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(SentReply {
                chat_id,
                text: text.to_string(),
                reply_to,
                at: Instant::now(),
            });
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        records: Arc<Mutex<Vec<MessageRecord>>>,
    }

    impl TranscriptStore for MemoryStore {
        async fn append(&self, record: &MessageRecord) -> Result<(), StoreError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn list_by_run(&self, run_id: &Uuid) -> Result<Vec<MessageRecord>, StoreError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.run_id == *run_id)
                .cloned()
                .collect())
        }

        async fn count_all(&self) -> Result<u64, StoreError> {
            Ok(self.records.lock().unwrap().len() as u64)
        }

        async fn count_runs(&self) -> Result<u64, StoreError> {
            let runs: HashSet<Uuid> = self
                .records
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.run_id)
                .collect();
            Ok(runs.len() as u64)
        }
    }

    type TestEngine = Engine<EchoBackend, ForbiddenPhrases, RecordingTransport, MemoryStore>;

    fn test_engine(
        debounce_ms: u64,
        script: Vec<Result<String, BackendError>>,
    ) -> (TestEngine, EchoBackend, RecordingTransport, MemoryStore) {
        let config = EngineConfig {
            debounce_ms,
            send_spacing_ms: 10,
            topics: vec!["a tent".to_string()],
            ..EngineConfig::default()
        };
        let backend = EchoBackend::scripted(script);
        let guard = ForbiddenPhrases::new(config.forbidden_phrases.clone());
        let transport = RecordingTransport::default();
        let store = MemoryStore::default();
        let engine = Engine::new(
            backend.clone(),
            guard,
            transport.clone(),
            store.clone(),
            config,
        );
        (engine, backend, transport, store)
    }

    fn roles(records: &[MessageRecord], role: Role) -> Vec<String> {
        records
            .iter()
            .filter(|r| r.role == role)
            .map(|r| r.text.clone())
            .collect()
    }

    #[tokio::test]
    async fn burst_dispatches_once_in_order() {
        let (engine, _backend, transport, store) = test_engine(500, Vec::new());
        let chat = ChatId::new(1);

        let id1 = engine.handle_incoming(chat, "Hi").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let id2 = engine.handle_incoming(chat, "Are you there?").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let id3 = engine.handle_incoming(chat, "Hello?").await;

        let info = engine.session_info(chat).unwrap();

        // 600ms after the first message: past the first message's naive
        // deadline but inside the restarted window, so nothing has fired.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(transport.sent.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(800)).await;
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].text, "re: Hi");
        assert_eq!(sent[1].text, "re: Are you there?");
        assert_eq!(sent[2].text, "re: Hello?");
        assert_eq!(sent[0].reply_to, Some(id1));
        assert_eq!(sent[1].reply_to, Some(id2));
        assert_eq!(sent[2].reply_to, Some(id3));
        assert!(sent.iter().all(|s| s.chat_id == chat));

        // Replies are paced at least one spacing interval apart.
        assert!(sent[1].at - sent[0].at >= Duration::from_millis(10));
        assert!(sent[2].at - sent[1].at >= Duration::from_millis(10));
        drop(sent);

        // Both sides of the exchange are persisted, timestamps
        // non-decreasing.
        let records = store.records.lock().unwrap().clone();
        assert_eq!(records.len(), 6);
        assert_eq!(
            roles(&records, Role::Salesperson),
            vec!["Hi", "Are you there?", "Hello?"]
        );
        assert_eq!(
            roles(&records, Role::Customer),
            vec!["re: Hi", "re: Are you there?", "re: Hello?"]
        );
        assert!(records.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));

        // Same session, same topic, all the way through.
        let after = engine.session_info(chat).unwrap();
        assert_eq!(after.run_id, info.run_id);
        assert_eq!(after.topic, info.topic);
        assert_eq!(engine.pending_chats(), 0);
    }

    #[tokio::test]
    async fn separated_messages_dispatch_twice() {
        let (engine, _backend, transport, _store) = test_engine(300, Vec::new());
        let chat = ChatId::new(2);

        let first = engine.handle_incoming(chat, "First").await;
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(transport.sent.lock().unwrap().len(), 1);

        let second = engine.handle_incoming(chat, "Second").await;
        tokio::time::sleep(Duration::from_millis(700)).await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].reply_to, Some(first));
        assert_eq!(sent[1].reply_to, Some(second));
    }

    #[tokio::test]
    async fn rapid_burst_keeps_single_timer() {
        let (engine, _backend, transport, _store) = test_engine(400, Vec::new());
        let chat = ChatId::new(3);

        engine.handle_incoming(chat, "a").await;
        engine.handle_incoming(chat, "b").await;
        engine.handle_incoming(chat, "c").await;

        assert!(engine.inner.ledger.is_armed(chat));
        assert_eq!(engine.inner.ledger.pending_len(chat), 3);
        assert_eq!(engine.pending_chats(), 1);

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(transport.sent.lock().unwrap().len(), 3);
        assert_eq!(engine.pending_chats(), 0);
        assert!(!engine.inner.ledger.is_armed(chat));
    }

    #[tokio::test]
    async fn failed_generation_falls_back_and_batch_continues() {
        let (engine, _backend, transport, store) = test_engine(
            200,
            vec![
                Ok("first reply".to_string()),
                Err(BackendError::Provider {
                    message: "boom".to_string(),
                }),
                Ok("third reply".to_string()),
            ],
        );
        let chat = ChatId::new(4);
        let fallback = engine.config().fallback_reply.clone();

        engine.handle_incoming(chat, "one").await;
        engine.handle_incoming(chat, "two").await;
        engine.handle_incoming(chat, "three").await;
        tokio::time::sleep(Duration::from_millis(700)).await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].text, "first reply");
        assert_eq!(sent[1].text, fallback);
        assert_eq!(sent[2].text, "third reply");
        drop(sent);

        // The fallback is persisted like any reply.
        let records = store.records.lock().unwrap().clone();
        assert_eq!(records.len(), 6);
        assert_eq!(
            roles(&records, Role::Customer),
            vec!["first reply", fallback.as_str(), "third reply"]
        );

        // But it never enters the in-memory history: preamble, three
        // salesperson turns, two generated customer turns.
        assert_eq!(engine.session_info(chat).unwrap().turn_count, 6);
    }

    #[tokio::test]
    async fn violation_regenerates_once_through_engine() {
        let (engine, backend, transport, _store) = test_engine(
            150,
            vec![
                Ok("Welcome to our store! What are you looking for?".to_string()),
                Ok("I'd like a two-person tent.".to_string()),
            ],
        );
        let chat = ChatId::new(5);

        engine.handle_incoming(chat, "Hello!").await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "I'd like a two-person tent.");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn reset_discards_pending_window() {
        let (engine, _backend, transport, store) = test_engine(400, Vec::new());
        let chat = ChatId::new(6);

        engine.handle_incoming(chat, "going once").await;
        assert_eq!(engine.pending_chats(), 1);

        assert!(engine.reset(chat));
        assert_eq!(engine.pending_chats(), 0);
        assert!(engine.session_info(chat).is_none());

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(transport.sent.lock().unwrap().is_empty());
        // Only the inbound message was persisted before the reset.
        assert_eq!(store.records.lock().unwrap().len(), 1);

        assert!(!engine.reset(chat));
    }

    #[tokio::test]
    async fn start_session_greets_and_reports_info() {
        let (engine, _backend, transport, store) =
            test_engine(300, vec![Ok("Hey! I'm after a tent for a weekend trip.".to_string())]);
        let chat = ChatId::new(7);

        let started = engine.start_session(chat).await;
        assert_eq!(started.greeting, "Hey! I'm after a tent for a weekend trip.");
        assert_eq!(started.session.topic, "a tent");
        assert_eq!(started.session.turn_count, 2);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Hey! I'm after a tent for a weekend trip.");
        assert_eq!(sent[0].reply_to, None);
        drop(sent);

        let records = store.records.lock().unwrap().clone();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].role, Role::Customer);
        assert_eq!(records[0].run_id, started.session.run_id);

        // Starting again reuses the live session; only the greeting is new.
        let second = engine.start_session(chat).await;
        assert_eq!(second.session.run_id, started.session.run_id);
        assert_eq!(second.session.topic, started.session.topic);
        assert_eq!(second.session.turn_count, 3);
        assert_eq!(engine.active_sessions(), 1);
    }

    #[tokio::test]
    async fn start_session_reuses_existing_session() {
        let (engine, _backend, transport, store) = test_engine(10_000, Vec::new());
        let chat = ChatId::new(13);

        let started = engine.start_session(chat).await;
        engine.handle_incoming(chat, "Do you ship overnight?").await;
        assert_eq!(engine.pending_chats(), 1);

        // A second start is not a reset: the buffered batch keeps its
        // timer and another greeting lands on the same run.
        let second = engine.start_session(chat).await;
        assert_eq!(second.session.run_id, started.session.run_id);
        assert_eq!(second.session.topic, started.session.topic);
        assert_eq!(engine.pending_chats(), 1);
        assert!(engine.inner.ledger.is_armed(chat));

        // Preamble plus two greetings; the buffered turn joins at dispatch.
        assert_eq!(second.session.turn_count, 3);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|s| s.reply_to.is_none()));
        drop(sent);

        let records = store.records.lock().unwrap().clone();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.run_id == started.session.run_id));

        engine.shutdown();
    }

    #[tokio::test]
    async fn start_session_uses_static_greeting_on_backend_error() {
        let (engine, _backend, transport, _store) =
            test_engine(300, vec![Err(BackendError::Timeout)]);
        let chat = ChatId::new(8);

        let started = engine.start_session(chat).await;
        assert_eq!(
            started.greeting,
            "Hi! I'm interested in buying a tent. Can you help me find the right one?"
        );

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, started.greeting);
    }

    #[tokio::test]
    async fn shutdown_cancels_unfired_windows() {
        let (engine, _backend, transport, _store) = test_engine(400, Vec::new());

        engine.handle_incoming(ChatId::new(9), "a").await;
        engine.handle_incoming(ChatId::new(10), "b").await;
        assert_eq!(engine.pending_chats(), 2);

        engine.shutdown();
        assert_eq!(engine.pending_chats(), 0);

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_counters_track_state() {
        let (engine, _backend, _transport, store) = test_engine(10_000, Vec::new());

        engine.handle_incoming(ChatId::new(11), "x").await;
        engine.handle_incoming(ChatId::new(12), "y").await;

        assert_eq!(engine.active_sessions(), 2);
        assert_eq!(engine.pending_chats(), 2);
        assert_eq!(store.count_all().await.unwrap(), 2);
        assert_eq!(store.count_runs().await.unwrap(), 2);

        engine.shutdown();
    }
}
