//! Edit-in-place sessions for history entries
//!
//! Entries have no identity beyond their position, so a session pins the
//! notes it was opened against with a content fingerprint. Commit re-checks
//! the fingerprint against the notes as they are *now* and refuses to write
//! if anything moved underneath, rather than landing an edit on the wrong
//! entry.

use super::{check_content, decode, encode, HistoryEntry};
use crate::error::HistoryEditError;
use chrono::NaiveDate;

/// blake3 digest of a notes text, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of `text`
    #[must_use]
    pub fn of(text: &str) -> Self {
        Self(hex::encode(blake3::hash(text.as_bytes()).as_bytes()))
    }

    /// Short form for logs and messages
    #[inline]
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..16]
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded history pinned to the notes it came from
#[derive(Debug, Clone)]
pub struct HistoryEditSession {
    fingerprint: Fingerprint,
    entries: Vec<HistoryEntry>,
    changed: bool,
}

impl HistoryEditSession {
    /// Decode `notes` and pin its fingerprint
    #[must_use]
    pub fn open(notes: &str, fallback_date: NaiveDate) -> Self {
        Self {
            fingerprint: Fingerprint::of(notes),
            entries: decode(notes, fallback_date),
            changed: false,
        }
    }

    /// Entries in chronological order; the slice index is the edit index
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Fingerprint of the notes the session was opened against
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Whether any edit has been staged
    #[inline]
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.changed
    }

    /// Replace an entry's content and optionally its date
    ///
    /// The entry's stage transition is kept.
    ///
    /// # Errors
    /// Unknown index, content that would leave the entry empty, or content
    /// that would not decode back as this one entry.
    pub fn edit(
        &mut self,
        index: usize,
        content: &str,
        date: Option<NaiveDate>,
    ) -> Result<(), HistoryEditError> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(HistoryEditError::NoSuchEntry { index, len })?;

        let content = content.trim();
        if content.is_empty() && entry.stage_transition.is_none() {
            return Err(HistoryEditError::EmptyContent { index });
        }
        check_content(content, entry.stage_transition.is_some())
            .map_err(|source| HistoryEditError::InvalidContent { index, source })?;

        entry.content = content.to_string();
        if let Some(date) = date {
            entry.date = date;
        }
        self.changed = true;
        Ok(())
    }

    /// Drop an entry
    ///
    /// # Errors
    /// Unknown index.
    pub fn remove(&mut self, index: usize) -> Result<HistoryEntry, HistoryEditError> {
        if index >= self.entries.len() {
            return Err(HistoryEditError::NoSuchEntry {
                index,
                len: self.entries.len(),
            });
        }
        self.changed = true;
        Ok(self.entries.remove(index))
    }

    /// Re-encode against the record's current notes
    ///
    /// # Errors
    /// [`HistoryEditError::Stale`] when `current_notes` no longer matches the
    /// text the session was opened against.
    pub fn commit(self, current_notes: &str) -> Result<String, HistoryEditError> {
        let current = Fingerprint::of(current_notes);
        if current != self.fingerprint {
            tracing::warn!(
                expected = self.fingerprint.short(),
                actual = current.short(),
                "history changed during edit session; refusing to write"
            );
            return Err(HistoryEditError::Stale {
                expected: self.fingerprint.to_string(),
                actual: current.to_string(),
            });
        }
        Ok(encode(&self.entries))
    }
}
