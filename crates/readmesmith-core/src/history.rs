//! Conversation transcript, linear undo/redo over generated artifacts, and
//! named snapshots for browsing past generations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::Extraction;
use crate::variant::{GenerationOptions, Variant};

pub const DEFAULT_UNDO_CAPACITY: usize = 50;
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 100;
const SNAPSHOT_NAME_CHARS: usize = 40;

/// The role of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation. Assistant turns keep the extracted
/// artifact separately from the chat text around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::User,
            text: text.into(),
            code: None,
            created_at: Utc::now(),
        });
    }

    pub fn push_assistant(&mut self, extraction: &Extraction) {
        self.turns.push(Turn {
            role: Role::Assistant,
            text: extraction.chat.clone(),
            code: extraction.code.clone(),
            created_at: Utc::now(),
        });
    }

    /// Record a failure inline, the way the UI shows it.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::Assistant,
            text: format!("Error: {}", message.into()),
            code: None,
            created_at: Utc::now(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn last_code(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find_map(|t| t.code.as_deref())
    }

    /// Drop the trailing user turn if no reply followed it. Returns its text.
    pub fn pop_unanswered(&mut self) -> Option<String> {
        match self.turns.last() {
            Some(turn) if turn.role == Role::User => self.turns.pop().map(|t| t.text),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Linear undo/redo. Pushing after an undo discards the redo tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoStack<T> {
    entries: Vec<T>,
    position: usize,
    #[serde(default = "default_undo_capacity")]
    capacity: usize,
}

fn default_undo_capacity() -> usize {
    DEFAULT_UNDO_CAPACITY
}

impl<T> Default for UndoStack<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_UNDO_CAPACITY)
    }
}

impl<T: Clone + PartialEq> UndoStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new value. Returns false when it equals the current value.
    pub fn push(&mut self, value: T) -> bool {
        if self.current() == Some(&value) {
            return false;
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.position + 1);
        }
        self.entries.push(value);
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
        self.position = self.entries.len() - 1;
        true
    }
}

impl<T> UndoStack<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            position: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn undo(&mut self) -> Option<&T> {
        if self.can_undo() {
            self.position -= 1;
            self.entries.get(self.position)
        } else {
            None
        }
    }

    pub fn redo(&mut self) -> Option<&T> {
        if self.can_redo() {
            self.position += 1;
            self.entries.get(self.position)
        } else {
            None
        }
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.position)
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0 && !self.entries.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.position + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zero-based index of the current entry.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = 0;
    }

    /// Pull the cursor and size back within bounds after deserializing
    /// hand-edited or truncated data.
    pub fn normalize(&mut self) {
        self.capacity = self.capacity.max(1);
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
            self.position = self.position.saturating_sub(excess);
        }
        if self.position >= self.entries.len() {
            self.position = self.entries.len().saturating_sub(1);
        }
    }
}

/// A named generation kept for later browsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: u64,
    pub name: String,
    pub variant: Variant,
    pub prompt: String,
    pub code: String,
    #[serde(default)]
    pub options: GenerationOptions,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLog {
    snapshots: Vec<Snapshot>,
    next_id: u64,
    #[serde(default = "default_snapshot_capacity")]
    capacity: usize,
}

fn default_snapshot_capacity() -> usize {
    DEFAULT_SNAPSHOT_CAPACITY
}

impl Default for SnapshotLog {
    fn default() -> Self {
        Self {
            snapshots: Vec::new(),
            next_id: 1,
            capacity: DEFAULT_SNAPSHOT_CAPACITY,
        }
    }
}

impl SnapshotLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot and return its id. Without a name, one is derived
    /// from the prompt.
    pub fn record(
        &mut self,
        name: Option<&str>,
        variant: Variant,
        prompt: &str,
        code: &str,
        options: GenerationOptions,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => n.to_string(),
            None => auto_name(prompt, id),
        };

        self.snapshots.push(Snapshot {
            id,
            name,
            variant,
            prompt: prompt.to_string(),
            code: code.to_string(),
            options,
            created_at: Utc::now(),
        });

        if self.snapshots.len() > self.capacity {
            let excess = self.snapshots.len() - self.capacity;
            self.snapshots.drain(..excess);
        }
        id
    }

    pub fn get(&self, id: u64) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.id == id)
    }

    pub fn rename(&mut self, id: u64, name: &str) -> bool {
        match self.snapshots.iter_mut().find(|s| s.id == id) {
            Some(snapshot) if !name.trim().is_empty() => {
                snapshot.name = name.trim().to_string();
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, id: u64) -> Option<Snapshot> {
        let idx = self.snapshots.iter().position(|s| s.id == id)?;
        Some(self.snapshots.remove(idx))
    }

    /// Most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter().rev()
    }

    /// Snapshot at `idx` in most-recent-first order.
    pub fn nth_recent(&self, idx: usize) -> Option<&Snapshot> {
        self.iter().nth(idx)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

fn auto_name(prompt: &str, id: u64) -> String {
    let first_line = prompt.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return format!("Snapshot {}", id);
    }
    if first_line.chars().count() <= SNAPSHOT_NAME_CHARS {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(SNAPSHOT_NAME_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionMethod;

    #[test]
    fn test_undo_redo_basic() {
        let mut stack = UndoStack::new();
        assert!(stack.current().is_none());
        assert!(stack.undo().is_none());

        stack.push("a".to_string());
        stack.push("b".to_string());
        stack.push("c".to_string());
        assert_eq!(stack.current().map(String::as_str), Some("c"));

        assert_eq!(stack.undo().map(String::as_str), Some("b"));
        assert_eq!(stack.undo().map(String::as_str), Some("a"));
        assert!(stack.undo().is_none());
        assert_eq!(stack.position(), 0);

        assert_eq!(stack.redo().map(String::as_str), Some("b"));
        assert!(stack.can_redo());
    }

    #[test]
    fn test_push_after_undo_truncates_redo() {
        let mut stack = UndoStack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);
        stack.undo();
        stack.undo();
        stack.push(9);

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.current(), Some(&9));
        assert!(!stack.can_redo());
        assert_eq!(stack.undo(), Some(&1));
    }

    #[test]
    fn test_duplicate_push_ignored() {
        let mut stack = UndoStack::new();
        assert!(stack.push("same"));
        assert!(!stack.push("same"));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut stack = UndoStack::with_capacity(3);
        for i in 0..5 {
            stack.push(i);
        }
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.current(), Some(&4));
        assert_eq!(stack.undo(), Some(&3));
        assert_eq!(stack.undo(), Some(&2));
        assert!(stack.undo().is_none());
    }

    #[test]
    fn test_normalize_clamps_position() {
        let mut stack: UndoStack<i32> =
            serde_json::from_str(r#"{"entries":[1,2],"position":7}"#).unwrap();
        stack.normalize();
        assert_eq!(stack.position(), 1);
        assert_eq!(stack.current(), Some(&2));

        let mut empty: UndoStack<i32> =
            serde_json::from_str(r#"{"entries":[],"position":3,"capacity":0}"#).unwrap();
        empty.normalize();
        assert_eq!(empty.position(), 0);
        assert!(empty.current().is_none());
    }

    #[test]
    fn test_transcript_recent_and_last_code() {
        let mut transcript = Transcript::new();
        transcript.push_user("make a readme");
        transcript.push_assistant(&Extraction {
            chat: "Here".to_string(),
            code: Some("# Me".to_string()),
            method: ExtractionMethod::Tagged,
        });
        transcript.push_user("bluer please");
        transcript.push_error("network down");

        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript.recent(2)[0].text, "bluer please");
        assert_eq!(transcript.recent(10).len(), 4);
        assert_eq!(transcript.last_code(), Some("# Me"));
        assert_eq!(transcript.turns()[3].text, "Error: network down");
    }

    #[test]
    fn test_snapshot_auto_name_and_order() {
        let mut log = SnapshotLog::new();
        let long = "A very long description of a profile readme with many many words in it";
        let first = log.record(None, Variant::ProfileReadme, long, "# A", Default::default());
        let second = log.record(Some("  Mine "), Variant::ProfileReadme, "x", "# B", Default::default());

        assert_eq!(log.get(first).unwrap().name.chars().count(), SNAPSHOT_NAME_CHARS + 1);
        assert_eq!(log.get(second).unwrap().name, "Mine");
        let ids: Vec<u64> = log.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(log.nth_recent(1).map(|s| s.id), Some(first));
    }

    #[test]
    fn test_snapshot_rename_remove() {
        let mut log = SnapshotLog::new();
        let id = log.record(None, Variant::AnimatedSvg, "", "<svg/>", Default::default());
        assert_eq!(log.get(id).unwrap().name, format!("Snapshot {}", id));
        assert!(log.rename(id, "Banner"));
        assert!(!log.rename(id, "   "));
        assert!(!log.rename(999, "Nope"));
        assert_eq!(log.remove(id).map(|s| s.name), Some("Banner".to_string()));
        assert!(log.is_empty());
    }

    #[test]
    fn test_transcript_pop_unanswered() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.pop_unanswered(), None);

        transcript.push_user("make it pink");
        transcript.push_error("timed out");
        assert_eq!(transcript.pop_unanswered(), None);
        assert_eq!(transcript.len(), 2);

        transcript.push_user("try again");
        assert_eq!(transcript.pop_unanswered().as_deref(), Some("try again"));
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_snapshot_capacity_evicts_oldest() {
        let mut log = SnapshotLog::new();
        for i in 0..DEFAULT_SNAPSHOT_CAPACITY + 5 {
            log.record(None, Variant::CodeSnippet, "loop", &format!("v{}", i), Default::default());
        }

        assert_eq!(log.len(), DEFAULT_SNAPSHOT_CAPACITY);
        assert!((1..=5).all(|id| log.get(id).is_none()));
        assert_eq!(log.nth_recent(0).map(|s| s.id), Some(105));
        assert_eq!(log.iter().last().map(|s| s.code.as_str()), Some("v5"));

        // Ids keep counting after eviction
        let id = log.record(Some("next"), Variant::CodeSnippet, "loop", "v105", Default::default());
        assert_eq!(id, 106);
        assert_eq!(log.len(), DEFAULT_SNAPSHOT_CAPACITY);
    }
}
