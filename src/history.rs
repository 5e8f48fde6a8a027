//! Bidirectional binding between navigation state and a fragment history
//!
//! The browser address bar generalizes to the [`FragmentHistory`] capability:
//! something that can push an entry whose fragment identifier names the
//! active chapter and walk back/forward through past entries. The fragment
//! is the sole piece of navigable state; cache-busting query parameters
//! never appear here.

/// One history entry: fragment identifier plus associated state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Chapter id, shown as `#<id>`
    pub fragment: String,
    /// Catalog index at publish time
    pub index: usize,
}

/// Capability trait for the address-bar/history collaborator.
pub trait FragmentHistory {
    /// Push a new entry without a reload, truncating any forward entries.
    fn push(&mut self, entry: HistoryEntry);
    /// Fragment identifier of the current entry, if any.
    fn current_fragment(&self) -> Option<&str>;
}

/// In-memory history with back/forward traversal, standing in for the
/// browser history stack.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: Vec<HistoryEntry>,
    /// Position within `entries`; `None` until the first push
    cursor: Option<usize>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an initial fragment (the page was opened on `#<id>`).
    pub fn with_fragment(fragment: impl Into<String>, index: usize) -> Self {
        let mut history = Self::default();
        history.push(HistoryEntry {
            fragment: fragment.into(),
            index,
        });
        history
    }

    /// Move back one entry, like the browser back button. Returns the entry
    /// now current.
    pub fn back(&mut self) -> Option<&HistoryEntry> {
        let cursor = self.cursor?;
        if cursor == 0 {
            return None;
        }
        self.cursor = Some(cursor - 1);
        self.entries.get(cursor - 1)
    }

    /// Move forward one entry. Returns the entry now current.
    pub fn forward(&mut self) -> Option<&HistoryEntry> {
        let cursor = self.cursor?;
        if cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor = Some(cursor + 1);
        self.entries.get(cursor + 1)
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor?)
    }
}

impl FragmentHistory for InMemoryHistory {
    fn push(&mut self, entry: HistoryEntry) {
        // Pushing from a back-navigated position drops the forward entries,
        // matching history.pushState semantics.
        if let Some(cursor) = self.cursor {
            self.entries.truncate(cursor + 1);
        }
        self.entries.push(entry);
        self.cursor = Some(self.entries.len() - 1);
    }

    fn current_fragment(&self) -> Option<&str> {
        self.current().map(|e| e.fragment.as_str())
    }
}
