//! Command history for a local terminal.
//!
//! A bounded list of typed lines with a cursor for up/down navigation.
//! Pushing a line appends it (unless it repeats the newest entry), drops the
//! oldest entry when full and moves the cursor past the end, so the next
//! [`prev`](History::prev) returns the line just entered.
//!
//! ```text
//! entries:  [ "a", "b", "c" ]  cursor = 3 after push
//!   prev -> "c"   prev -> "b"   prev -> "a"   prev -> None (stays on "a")
//!   next -> "b"   next -> "c"   next -> None
//! ```

use std::collections::VecDeque;

/// Entries kept when no capacity is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
    cursor: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// An empty history holding at most `capacity` lines (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// Records `line`.  Blank lines and repeats of the newest entry are not
    /// stored, but still reset the cursor.
    pub fn push(&mut self, line: &str) {
        let line = line.trim();
        if !line.is_empty() && self.entries.back().map(String::as_str) != Some(line) {
            if self.entries.len() == self.capacity {
                self.entries.pop_front();
            }
            self.entries.push_back(line.to_string());
        }
        self.reset();
    }

    /// Moves the cursor one entry back.  `None` once the oldest entry has
    /// been returned.
    pub fn prev(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Moves the cursor one entry forward.  `None` past the newest entry.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&str> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Places the cursor past the newest entry.
    pub fn reset(&mut self) {
        self.cursor = self.entries.len();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Entry `index`, oldest first.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
