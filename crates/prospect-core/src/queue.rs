//! Per-chat message buffering and debounce timer bookkeeping.
//!
//! `DebounceLedger` is the shared state behind the quiet-period scheduler:
//! one pending batch per chat, one armed timer per batch, and a generation
//! counter that decides which timer wakeup is allowed to dispatch. The
//! engine owns the timer tasks themselves; the ledger only sequences them.
//!
//! The protocol per inbound message is push (buffer + supersede), spawn,
//! arm. A timer that wakes calls `claim` with the generation it was armed
//! for: if a later message bumped the generation, the claim fails and the
//! stale timer exits without dispatching. A successful claim removes the
//! whole batch entry, so the snapshot is final and no later re-arm can
//! abort a dispatch that has begun. Generations are never reused; a timer
//! stranded from a claimed or aborted window can never take a batch built
//! after it.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use prospect_types::chat::{ChatId, MessageId};
use tokio::task::JoinHandle;

/// One buffered salesperson message awaiting batch dispatch.
///
/// Created at ingestion, consumed exactly once by the dispatcher.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Correlation id threaded into the eventual reply.
    pub message_id: MessageId,
    pub text: String,
}

/// A chat's buffered messages plus the arm state of its debounce timer.
#[derive(Debug, Default)]
struct PendingBatch {
    entries: Vec<QueueEntry>,
    /// Generation of the latest push, drawn from the ledger-wide counter.
    /// A waking timer may only claim the batch if its generation is still
    /// current.
    generation: u64,
    /// Handle of the armed timer task. At most one timer is live per chat.
    timer: Option<JoinHandle<()>>,
}

/// Pending batches for all chats, keyed by chat id.
pub struct DebounceLedger {
    pending: DashMap<ChatId, PendingBatch>,
    /// Source of generation numbers. Ledger-wide and never reused, so a
    /// generation issued before a batch was claimed or aborted cannot match
    /// a batch built afterwards.
    generations: AtomicU64,
}

impl DebounceLedger {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            generations: AtomicU64::new(0),
        }
    }

    /// Buffer a message and supersede any armed timer for the chat.
    ///
    /// The previous timer is aborted before this returns; even if its abort
    /// races with its wakeup, the fresh generation keeps it from claiming.
    /// Returns the generation the replacement timer must present to
    /// [`claim`](Self::claim).
    pub fn push(&self, chat_id: ChatId, entry: QueueEntry) -> u64 {
        let mut batch = self.pending.entry(chat_id).or_default();
        // Allocated under the entry lock, so per chat the batch generation
        // is strictly increasing.
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        batch.entries.push(entry);
        batch.generation = generation;
        if let Some(old) = batch.timer.take() {
            old.abort();
        }
        generation
    }

    /// Record the timer task armed for `generation`.
    ///
    /// If a later push already bumped the generation, the handle belongs to
    /// a superseded timer and is aborted on the spot.
    pub fn arm(&self, chat_id: ChatId, generation: u64, handle: JoinHandle<()>) {
        match self.pending.get_mut(&chat_id) {
            Some(mut batch) if batch.generation == generation => {
                batch.timer = Some(handle);
            }
            _ => handle.abort(),
        }
    }

    /// Hand the chat's batch to the caller if `generation` is still current.
    ///
    /// On success the whole pending entry is removed: the snapshot is final,
    /// the buffer is empty for the next window, and no later push can reach
    /// the claiming task's handle. Returns `None` when a newer message
    /// superseded the caller.
    pub fn claim(&self, chat_id: ChatId, generation: u64) -> Option<Vec<QueueEntry>> {
        self.pending
            .remove_if(&chat_id, |_, batch| batch.generation == generation)
            .map(|(_, batch)| batch.entries)
    }

    /// Drop a chat's buffered messages and abort its armed timer.
    ///
    /// Returns how many messages were discarded.
    pub fn abort_chat(&self, chat_id: ChatId) -> usize {
        match self.pending.remove(&chat_id) {
            Some((_, mut batch)) => {
                if let Some(timer) = batch.timer.take() {
                    timer.abort();
                }
                batch.entries.len()
            }
            None => 0,
        }
    }

    /// Drop every chat's buffered messages and abort every armed timer.
    ///
    /// Returns how many messages were discarded in total.
    pub fn abort_all(&self) -> usize {
        let chats: Vec<ChatId> = self.pending.iter().map(|e| *e.key()).collect();
        chats.into_iter().map(|c| self.abort_chat(c)).sum()
    }

    /// Buffered message count for a chat (0 when nothing is pending).
    pub fn pending_len(&self, chat_id: ChatId) -> usize {
        self.pending.get(&chat_id).map_or(0, |b| b.entries.len())
    }

    /// Whether the chat currently has an armed timer.
    pub fn is_armed(&self, chat_id: ChatId) -> bool {
        self.pending
            .get(&chat_id)
            .map_or(false, |b| b.timer.is_some())
    }

    /// Number of chats with a pending batch.
    pub fn pending_chats(&self) -> usize {
        self.pending.len()
    }
}

impl Default for DebounceLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DebounceLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceLedger")
            .field("pending_chats", &self.pending.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
