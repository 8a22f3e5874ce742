//! Live session state and the per-chat session map.
//!
//! A `Session` is one training conversation: the assigned topic, the run id
//! used for transcript correlation, and the turn history the completion
//! backend sees. `SessionManager` owns the concurrent map of sessions and
//! assigns topics on creation, steering away from products the same chat
//! saw recently.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use prospect_types::chat::{ChatId, SessionInfo, Turn};
use prospect_types::config::EngineConfig;
use rand::seq::SliceRandom;
use tracing::{info, warn};
use uuid::Uuid;

/// Topic used when the configured pool is empty.
const FALLBACK_TOPIC: &str = "a new laptop for work";

/// One live training conversation.
///
/// The assigned topic never changes for the session's lifetime. History is
/// append-only behind a mutex held only for push and snapshot, never across
/// an await point.
#[derive(Debug)]
pub struct Session {
    pub chat_id: ChatId,
    /// Transcript correlation id, fixed at creation (UUID v7).
    pub run_id: Uuid,
    /// The product or service this customer is shopping for.
    pub topic: String,
    pub started_at: DateTime<Utc>,
    history: Mutex<Vec<Turn>>,
}

impl Session {
    fn new(chat_id: ChatId, topic: String, preamble: String) -> Self {
        Self {
            chat_id,
            run_id: Uuid::now_v7(),
            topic,
            started_at: Utc::now(),
            history: Mutex::new(vec![Turn::system(preamble)]),
        }
    }

    /// Append one turn. Append order must match generation order.
    pub fn push(&self, turn: Turn) {
        self.history
            .lock()
            .expect("session history lock poisoned")
            .push(turn);
    }

    /// Append a turn and return a snapshot that includes it, under one lock
    /// acquisition.
    pub fn push_and_snapshot(&self, turn: Turn) -> Vec<Turn> {
        let mut history = self.history.lock().expect("session history lock poisoned");
        history.push(turn);
        history.clone()
    }

    /// Clone the full history, oldest first.
    pub fn history(&self) -> Vec<Turn> {
        self.history
            .lock()
            .expect("session history lock poisoned")
            .clone()
    }

    /// Number of turns, preamble included.
    pub fn turn_count(&self) -> usize {
        self.history
            .lock()
            .expect("session history lock poisoned")
            .len()
    }

    /// Serializable view for the API.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            chat_id: self.chat_id,
            run_id: self.run_id,
            topic: self.topic.clone(),
            started_at: self.started_at,
            turn_count: self.turn_count(),
        }
    }
}

/// Creates sessions on demand and tracks recently assigned topics.
///
/// At most one session exists per chat id; repeated `get_or_create` calls
/// for the same chat return the same session. Session state lives for the
/// process lifetime -- only individual messages are durably persisted.
pub struct SessionManager {
    sessions: DashMap<ChatId, Arc<Session>>,
    /// Topics lately assigned to each chat, oldest first, capped at the
    /// configured window. Survives session removal so back-to-back runs
    /// draw different products.
    recent_topics: DashMap<ChatId, Vec<String>>,
    config: Arc<EngineConfig>,
}

impl SessionManager {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            sessions: DashMap::new(),
            recent_topics: DashMap::new(),
            config,
        }
    }

    /// Get the chat's session, creating it with a freshly sampled topic and
    /// a preamble-seeded history if absent.
    pub fn get_or_create(&self, chat_id: ChatId) -> Arc<Session> {
        if let Some(existing) = self.sessions.get(&chat_id) {
            return Arc::clone(&existing);
        }
        // entry() holds the shard lock, so two racing creators cannot both
        // insert.
        let entry = self.sessions.entry(chat_id).or_insert_with(|| {
            let topic = self.sample_topic(chat_id);
            let preamble = self.config.preamble_for(&topic);
            let session = Session::new(chat_id, topic, preamble);
            info!(
                %chat_id,
                run_id = %session.run_id,
                topic = %session.topic,
                "session created"
            );
            Arc::new(session)
        });
        Arc::clone(&entry)
    }

    /// The chat's session, if one exists.
    pub fn get(&self, chat_id: ChatId) -> Option<Arc<Session>> {
        self.sessions.get(&chat_id).map(|s| Arc::clone(&s))
    }

    /// Drop the chat's session, returning it if present.
    ///
    /// The recent-topic list is kept so the next session avoids repeating
    /// this one's product.
    pub fn remove(&self, chat_id: ChatId) -> Option<Arc<Session>> {
        self.sessions.remove(&chat_id).map(|(_, s)| s)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // --- Topic sampling ---

    /// Sample a topic, excluding the chat's recently assigned ones.
    ///
    /// When every topic is excluded, the recent list is cleared and the
    /// full pool becomes eligible again.
    fn sample_topic(&self, chat_id: ChatId) -> String {
        let window = self.config.recent_topic_window;
        let mut recent = self.recent_topics.entry(chat_id).or_default();

        let available: Vec<&String> = self
            .config
            .topics
            .iter()
            .filter(|t| !recent.iter().any(|r| r == *t))
            .collect();

        let mut rng = rand::thread_rng();
        let topic = match available.choose(&mut rng) {
            Some(t) => (*t).clone(),
            None => {
                recent.clear();
                match self.config.topics.choose(&mut rng) {
                    Some(t) => t.clone(),
                    None => {
                        warn!(%chat_id, "topic pool is empty");
                        FALLBACK_TOPIC.to_string()
                    }
                }
            }
        };

        recent.push(topic.clone());
        if recent.len() > window {
            let excess = recent.len() - window;
            recent.drain(..excess);
        }
        topic
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use prospect_types::chat::Role;

    fn config_with_topics(topics: &[&str], window: usize) -> Arc<EngineConfig> {
        Arc::new(EngineConfig {
            topics: topics.iter().map(|t| t.to_string()).collect(),
            recent_topic_window: window,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn get_or_create_returns_same_session() {
        let manager = SessionManager::new(config_with_topics(&["a tent"], 5));
        let chat = ChatId::new(1);

        let first = manager.get_or_create(chat);
        let second = manager.get_or_create(chat);

        assert_eq!(first.run_id, second.run_id);
        assert_eq!(first.topic, second.topic);
        assert_eq!(manager.session_count(), 1);
    }

    #[test]
    fn history_seeded_with_preamble() {
        let manager = SessionManager::new(config_with_topics(&["a kayak"], 5));
        let session = manager.get_or_create(ChatId::new(2));

        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::System);
        assert!(history[0].text.contains("a kayak"));
        assert!(!history[0].text.contains("{topic}"));
    }

    #[test]
    fn push_and_snapshot_includes_new_turn() {
        let manager = SessionManager::new(config_with_topics(&["a rug"], 5));
        let session = manager.get_or_create(ChatId::new(3));

        let snapshot = session.push_and_snapshot(Turn::salesperson("Hi"));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].text, "Hi");
        assert_eq!(session.turn_count(), 2);
    }

    #[test]
    fn sampling_avoids_recent_topics() {
        let manager = SessionManager::new(config_with_topics(&["t1", "t2", "t3"], 2));
        let chat = ChatId::new(4);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let session = manager.get_or_create(chat);
            seen.push(session.topic.clone());
            manager.remove(chat);
        }

        // With a pool of 3 and a window of 2, three consecutive sessions
        // must all draw different topics.
        assert_ne!(seen[0], seen[1]);
        assert_ne!(seen[1], seen[2]);
        assert_ne!(seen[0], seen[2]);
    }

    #[test]
    fn exhausted_pool_reopens() {
        let manager = SessionManager::new(config_with_topics(&["only"], 5));
        let chat = ChatId::new(5);

        let first = manager.get_or_create(chat);
        assert_eq!(first.topic, "only");
        manager.remove(chat);

        // The single topic sits in the recent window, so the pool is
        // exhausted and reopens.
        let second = manager.get_or_create(chat);
        assert_eq!(second.topic, "only");
    }

    #[test]
    fn empty_pool_uses_fallback_topic() {
        let manager = SessionManager::new(config_with_topics(&[], 5));
        let session = manager.get_or_create(ChatId::new(6));
        assert_eq!(session.topic, FALLBACK_TOPIC);
    }

    #[test]
    fn remove_keeps_recent_topics() {
        let manager = SessionManager::new(config_with_topics(&["a", "b"], 1));
        let chat = ChatId::new(7);

        let first = manager.get_or_create(chat);
        let first_topic = first.topic.clone();
        manager.remove(chat);
        assert_eq!(manager.session_count(), 0);

        let second = manager.get_or_create(chat);
        assert_ne!(second.topic, first_topic);
    }

    #[test]
    fn session_info_reflects_history() {
        let manager = SessionManager::new(config_with_topics(&["a desk"], 5));
        let chat = ChatId::new(8);
        let session = manager.get_or_create(chat);
        session.push(Turn::salesperson("Hello"));

        let info = session.info();
        assert_eq!(info.chat_id, chat);
        assert_eq!(info.run_id, session.run_id);
        assert_eq!(info.topic, "a desk");
        assert_eq!(info.turn_count, 2);
    }

    #[test]
    fn debug_impl() {
        let manager = SessionManager::new(config_with_topics(&["x"], 5));
        manager.get_or_create(ChatId::new(9));
        let debug = format!("{manager:?}");
        assert!(debug.contains("SessionManager"));
        assert!(debug.contains("sessions"));
    }
}
