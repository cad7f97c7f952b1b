use shared::domain::{HistoryEntry, HistoryId};

/// Read-through copy of the server-side history, valid for the current panel
/// session. Only ever replaced wholesale or cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryCache {
    entries: Vec<HistoryEntry>,
}

impl HistoryCache {
    pub fn replace_all(&mut self, entries: Vec<HistoryEntry>) {
        self.entries = entries;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn find(&self, id: &HistoryId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Looks an entry up by the textual form of its id, as typed by a user.
    pub fn find_by_display_id(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id.to_string() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
