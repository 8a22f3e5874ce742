//! Conversation types for Prospect.
//!
//! These types model one training conversation: the chat identity assigned
//! by the transport, the in-memory turns the completion backend sees, and
//! the persisted transcript records used for after-session review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Transport-assigned numeric chat identifier.
///
/// One training conversation maps to exactly one chat id; all per-chat
/// state (session, pending queue, debounce timer) is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl ChatId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChatId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Correlation id for one inbound salesperson message, wrapping a UUID v7
/// (time-sortable). Outbound replies reference the message they answer
/// through this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Create a new MessageId using UUID v7 (time-sortable, guaranteed ordering).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a MessageId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Who produced a message.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('system', 'salesperson', 'customer'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Role-definition preamble and corrective instructions.
    System,
    /// The human trainee. The only role accepted on ingestion.
    Salesperson,
    /// The simulated buyer. The only role the engine generates.
    Customer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::Salesperson => write!(f, "salesperson"),
            Role::Customer => write!(f, "customer"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Role::System),
            "salesperson" => Ok(Role::Salesperson),
            "customer" => Ok(Role::Customer),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Salesperson
    }
}

/// One in-memory conversation turn, in the shape the completion backend
/// receives. Timestamps live on the persisted [`MessageRecord`], not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
        }
    }

    pub fn salesperson(text: impl Into<String>) -> Self {
        Self {
            role: Role::Salesperson,
            text: text.into(),
        }
    }

    pub fn customer(text: impl Into<String>) -> Self {
        Self {
            role: Role::Customer,
            text: text.into(),
        }
    }
}

/// A persisted transcript message.
///
/// Records are append-only: once written they are never mutated or removed.
/// Within one run, records are totally ordered by `sent_at`; duplicate
/// timestamps are allowed and keep insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    /// The run (one logical conversation) this record belongs to.
    pub run_id: Uuid,
    pub chat_id: ChatId,
    pub role: Role,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl MessageRecord {
    /// Build a record stamped with the current time.
    pub fn now(run_id: Uuid, chat_id: ChatId, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            run_id,
            chat_id,
            role,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }
}

/// Snapshot of a live session, as reported by the API.
///
/// The session itself (history included) stays in memory; this is the
/// serializable view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub chat_id: ChatId,
    pub run_id: Uuid,
    /// The product or service the simulated customer is shopping for.
    pub topic: String,
    pub started_at: DateTime<Utc>,
    pub turn_count: usize,
}

/// Result of starting a session: the opening customer line plus the
/// session view. The greeting also goes out through the transport; it is
/// returned here so callers without an event subscription still see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStart {
    pub greeting: String,
    pub session: SessionInfo,
}

/// An outbound customer reply, as handed to the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundReply {
    pub chat_id: ChatId,
    pub text: String,
    /// Inbound message this reply answers. Absent for session greetings.
    pub reply_to: Option<MessageId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::System, Role::Salesperson, Role::Customer] {
            let s = role.to_string();
            let parsed: Role = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_role_serde() {
        let role = Role::Customer;
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"customer\"");
        let parsed: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Role::Customer);
    }

    #[test]
    fn test_role_rejects_unknown() {
        assert!("operator".parse::<Role>().is_err());
    }

    #[test]
    fn test_chat_id_roundtrip() {
        let id = ChatId::new(-1001234567890);
        let parsed: ChatId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_message_id_roundtrip() {
        let id = MessageId::new();
        let parsed: MessageId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_turn_constructors() {
        assert_eq!(Turn::system("a").role, Role::System);
        assert_eq!(Turn::salesperson("b").role, Role::Salesperson);
        assert_eq!(Turn::customer("c").role, Role::Customer);
    }

    #[test]
    fn test_message_record_serialize() {
        let record = MessageRecord::now(
            Uuid::now_v7(),
            ChatId::new(42),
            Role::Salesperson,
            "Hi there",
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"role\":\"salesperson\""));
        assert!(json.contains("\"chat_id\":42"));
    }

    #[test]
    fn test_outbound_reply_serialize() {
        let reply = OutboundReply {
            chat_id: ChatId::new(7),
            text: "How much is it?".to_string(),
            reply_to: None,
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"reply_to\":null"));
    }
}
