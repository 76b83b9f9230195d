//! Process-wide string interning (spec §4.B).
//!
//! Ids are assigned densely starting at 0 and are permanent for the lifetime
//! of the sheet: once assigned, an id is never reused or reassigned.

use std::collections::HashMap;

/// Bidirectional `text <-> id` table backing dense-chunk string cells.
#[derive(Debug, Default, Clone)]
pub struct StringInterner {
    text_to_id: HashMap<String, u32>,
    id_to_text: Vec<String>,
    has_unpersisted_changes: bool,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `text`, allocating the next id if this is the
    /// first time `text` has been interned. Raises `has_unpersisted_changes`
    /// only on allocation.
    pub fn id_for(&mut self, text: &str) -> u32 {
        if let Some(&id) = self.text_to_id.get(text) {
            return id;
        }
        let id = self.id_to_text.len() as u32;
        self.id_to_text.push(text.to_string());
        self.text_to_id.insert(text.to_string(), id);
        self.has_unpersisted_changes = true;
        id
    }

    pub fn text_for(&self, id: u32) -> Option<&str> {
        self.id_to_text.get(id as usize).map(String::as_str)
    }

    /// Read-only reverse lookup; used by the codec, which never allocates
    /// new ids (allocation happens eagerly on cell write, spec §4.F).
    pub fn id_of(&self, text: &str) -> Option<u32> {
        self.text_to_id.get(text).copied()
    }

    /// Replaces the interner's contents wholesale (used after loading the
    /// persisted string table) and clears the dirty flag.
    pub fn load_from(&mut self, list: Vec<String>) {
        self.text_to_id = list
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as u32))
            .collect();
        self.id_to_text = list;
        self.has_unpersisted_changes = false;
    }

    pub fn has_unpersisted_changes(&self) -> bool {
        self.has_unpersisted_changes
    }

    pub fn clear_unpersisted_changes(&mut self) {
        self.has_unpersisted_changes = false;
    }

    /// A snapshot of the full string list, suitable for handing to the
    /// persistence pipeline (spec §3 Ownership, §5).
    pub fn snapshot(&self) -> Vec<String> {
        self.id_to_text.clone()
    }

    pub fn len(&self) -> usize {
        self.id_to_text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_id_is_zero_and_stable() {
        let mut interner = StringInterner::new();
        assert_eq!(interner.id_for("hello"), 0);
        assert_eq!(interner.id_for("world"), 1);
        assert_eq!(interner.id_for("hello"), 0);
        assert!(interner.has_unpersisted_changes());
    }

    #[test]
    fn dirty_flag_only_on_first_insertion() {
        let mut interner = StringInterner::new();
        interner.id_for("a");
        interner.clear_unpersisted_changes();
        interner.id_for("a");
        assert!(!interner.has_unpersisted_changes());
        interner.id_for("b");
        assert!(interner.has_unpersisted_changes());
    }

    #[test]
    fn load_from_replaces_and_clears_dirty() {
        let mut interner = StringInterner::new();
        interner.id_for("stale");
        interner.load_from(vec!["a".into(), "b".into()]);
        assert_eq!(interner.text_for(0), Some("a"));
        assert_eq!(interner.text_for(1), Some("b"));
        assert_eq!(interner.id_of("stale"), None);
        assert!(!interner.has_unpersisted_changes());
    }
}
