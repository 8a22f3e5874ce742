//! Role-consistency guard.
//!
//! The completion model sometimes flips roles mid-conversation and answers
//! as the salesperson ("How can I help you today?"). The guard is the
//! detection half of the correction loop in `reply`: a pluggable predicate
//! over candidate replies.

/// Detects candidate replies written in the wrong role's voice.
pub trait RoleGuard: Send + Sync {
    /// True if the candidate reads as the salesperson side of the
    /// conversation.
    fn violates(&self, text: &str) -> bool;
}

/// Phrase-list guard: flags any candidate containing one of the configured
/// phrases, case-insensitively.
#[derive(Debug, Clone)]
pub struct ForbiddenPhrases {
    phrases: Vec<String>,
}

impl ForbiddenPhrases {
    /// Build from a phrase list. Phrases are lowercased once here; empty
    /// entries are dropped.
    pub fn new<I, P>(phrases: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| p.into().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }
}

impl RoleGuard for ForbiddenPhrases {
    fn violates(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}
