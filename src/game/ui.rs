//! Per-dungeon view state that is never persisted: the map editor's tool
//! state, which cards are expanded or in edit mode, and log edit drafts.
//!
//! Lives in WASM memory for the lifetime of the worker, keyed by slug.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::game::adventure_log::{self, LogEntry};
use crate::game::editor::GridEditor;
use crate::game::session::SessionId;

#[derive(Debug, Default)]
pub struct SessionView {
    pub editor: GridEditor,
    /// Character slots showing the edit form.
    pub editing_characters: HashSet<usize>,
    /// Encounter indices showing the edit form.
    pub editing_encounters: HashSet<usize>,
    /// Encounter indices expanded past the summary. All start collapsed.
    pub expanded_encounters: HashSet<usize>,
    /// Log entry id → unsaved text.
    pub log_drafts: HashMap<i64, String>,
}

fn toggle(set: &mut HashSet<usize>, index: usize) -> bool {
    if set.remove(&index) {
        false
    } else {
        set.insert(index);
        true
    }
}

impl SessionView {
    pub fn toggle_character_edit(&mut self, slot: usize) -> bool {
        toggle(&mut self.editing_characters, slot)
    }

    pub fn toggle_encounter_edit(&mut self, index: usize) -> bool {
        toggle(&mut self.editing_encounters, index)
    }

    pub fn toggle_encounter_collapsed(&mut self, index: usize) -> bool {
        !toggle(&mut self.expanded_encounters, index)
    }

    /// Open the editor for an entry with its current text as the draft.
    pub fn begin_log_edit(&mut self, log: &[LogEntry], id: i64) -> Result<()> {
        let text = adventure_log::find_entry(log, id)?.text.clone();
        self.log_drafts.insert(id, text);
        Ok(())
    }

    /// Update the draft only; the stored entry is untouched until save.
    pub fn set_log_draft(&mut self, id: i64, text: &str) {
        if let Some(draft) = self.log_drafts.get_mut(&id) {
            *draft = text.to_string();
        }
    }

    /// Commit the draft into `log`. Returns whether there was one.
    pub fn save_log_edit(&mut self, log: &mut [LogEntry], id: i64) -> Result<bool> {
        match self.log_drafts.remove(&id) {
            Some(text) => {
                adventure_log::update_entry(log, id, &text)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn cancel_log_edit(&mut self, id: i64) {
        self.log_drafts.remove(&id);
    }
}

thread_local! {
    static VIEWS: RefCell<HashMap<SessionId, SessionView>> = RefCell::new(HashMap::new());
}

/// Execute a closure with mutable access to the view state of `slug`.
pub fn with_view_mut<F, R>(slug: &SessionId, f: F) -> R
where
    F: FnOnce(&mut SessionView) -> R,
{
    VIEWS.with(|v| f(v.borrow_mut().entry(slug.clone()).or_default()))
}

pub fn reset_views() {
    VIEWS.with(|v| v.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn toggles() {
        let mut view = SessionView::default();
        assert!(view.toggle_character_edit(1));
        assert!(!view.toggle_character_edit(1));
        // Collapsed by default → first toggle expands
        assert!(!view.toggle_encounter_collapsed(0));
        assert!(view.toggle_encounter_collapsed(0));
    }

    #[test]
    fn log_draft_cancel_restores() {
        let mut log = Vec::new();
        let id = adventure_log::add_entry(&mut log, "met a troll", Utc::now()).unwrap();
        let mut view = SessionView::default();
        view.begin_log_edit(&log, id).unwrap();
        view.set_log_draft(id, "met two trolls");
        assert_eq!(log[0].text, "met a troll");
        view.cancel_log_edit(id);
        assert!(!view.save_log_edit(&mut log, id).unwrap());
        assert_eq!(log[0].text, "met a troll");
    }

    #[test]
    fn log_draft_save_commits() {
        let mut log = Vec::new();
        let id = adventure_log::add_entry(&mut log, "met a troll", Utc::now()).unwrap();
        let mut view = SessionView::default();
        view.begin_log_edit(&log, id).unwrap();
        view.set_log_draft(id, "killed the troll");
        assert!(view.save_log_edit(&mut log, id).unwrap());
        assert_eq!(log[0].text, "killed the troll");
        assert!(view.log_drafts.is_empty());
    }

    #[test]
    fn views_are_per_session() {
        reset_views();
        let a = SessionId::parse("a").unwrap();
        let b = SessionId::parse("b").unwrap();
        with_view_mut(&a, |v| v.toggle_character_edit(0));
        assert!(with_view_mut(&a, |v| v.editing_characters.contains(&0)));
        assert!(!with_view_mut(&b, |v| v.editing_characters.contains(&0)));
        reset_views();
    }
}
