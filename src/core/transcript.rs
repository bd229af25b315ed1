//! The persisted conversation log.
//!
//! Handles are cheap to clone and all point at the same entries. Every
//! mutation is written back to the durable slot and announced on a
//! revision channel, so a front end can re-render reactively without
//! polling. Storage failures are logged and swallowed: a transcript that
//! cannot be persisted still works for the rest of the session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::warn;

use crate::core::constants::TRANSCRIPT_KEY;
use crate::core::message::{ConversationEntry, Role};
use crate::core::storage::KeyValueStore;

#[derive(Clone)]
pub struct TranscriptStore {
    entries: Arc<Mutex<Vec<ConversationEntry>>>,
    storage: Arc<dyn KeyValueStore>,
    revision: Arc<watch::Sender<u64>>,
}

impl TranscriptStore {
    /// Restore the transcript from its durable slot. Corrupt or unreadable
    /// data degrades to an empty transcript with a diagnostic; it never
    /// blocks startup.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let entries = match storage.load(TRANSCRIPT_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("stored transcript is unreadable, starting empty: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("could not read stored transcript: {err}");
                Vec::new()
            }
        };
        let (revision, _) = watch::channel(0u64);
        Self {
            entries: Arc::new(Mutex::new(entries)),
            storage,
            revision: Arc::new(revision),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConversationEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clone of the current entries, in insertion order.
    pub fn snapshot(&self) -> Vec<ConversationEntry> {
        self.lock().clone()
    }

    pub fn append(&self, entry: ConversationEntry) {
        {
            let mut entries = self.lock();
            entries.push(entry);
            self.persist(&entries);
        }
        self.bump();
    }

    /// Wholesale replacement, used when the backend returns an
    /// authoritative post-turn history.
    pub fn replace_all(&self, new_entries: Vec<ConversationEntry>) {
        {
            let mut entries = self.lock();
            *entries = new_entries;
            self.persist(&entries);
        }
        self.bump();
    }

    /// Append an empty assistant entry and return its index. The index is
    /// the turn's streaming sink: it is captured once here and passed to
    /// [`append_content`](Self::append_content) for every chunk.
    pub fn begin_assistant_entry(&self) -> usize {
        let index;
        {
            let mut entries = self.lock();
            entries.push(ConversationEntry::assistant(""));
            index = entries.len() - 1;
            self.persist(&entries);
        }
        self.bump();
        index
    }

    /// Append text to the content of the entry at `index`, provided that
    /// index still resolves to an assistant entry. Anything else means the
    /// transcript was cleared or replaced while a stream was in flight, and
    /// the call is a silent no-op: late chunks are dropped instead of
    /// landing on the wrong entry. Returns whether the append happened.
    pub fn append_content(&self, index: usize, chunk: &str) -> bool {
        let mutated = {
            let mut entries = self.lock();
            match entries.get_mut(index) {
                Some(entry) if entry.role == Role::Assistant => {
                    entry.content.push_str(chunk);
                    self.persist(&entries);
                    true
                }
                _ => false,
            }
        };
        if mutated {
            self.bump();
        }
        mutated
    }

    /// Empty the transcript and delete its durable slot.
    pub fn clear(&self) {
        self.lock().clear();
        if let Err(err) = self.storage.remove(TRANSCRIPT_KEY) {
            warn!("could not remove stored transcript: {err}");
        }
        self.bump();
    }

    /// Revision counter bumped on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn persist(&self, entries: &[ConversationEntry]) {
        match serde_json::to_string(entries) {
            Ok(serialized) => {
                if let Err(err) = self.storage.save(TRANSCRIPT_KEY, &serialized) {
                    warn!("could not persist transcript: {err}");
                }
            }
            Err(err) => warn!("could not serialize transcript: {err}"),
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}
