use ostinato_domain_score::{NoteId, ScoreDocument};
use serde::{Deserialize, Serialize};

/// The set of notes gestures currently address, plus a representative
/// note for single-note info display. Always a subset of the live
/// document; callers intersect after any mutation that may have removed
/// selected notes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Selection {
    ids: Vec<NoteId>,
    representative: Option<NoteId>,
}

impl Selection {
    pub fn ids(&self) -> &[NoteId] {
        &self.ids
    }

    pub fn representative(&self) -> Option<NoteId> {
        self.representative
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.ids.contains(&id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.representative = None;
    }

    /// Single selection, replacing whatever was selected before.
    pub fn select_one(&mut self, id: NoteId) {
        self.ids.clear();
        self.ids.push(id);
        self.representative = Some(id);
    }

    /// Multi selection; the first id becomes the representative.
    pub fn select_many(&mut self, ids: Vec<NoteId>) {
        self.ids.clear();
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
        self.representative = self.ids.first().copied();
    }

    /// Toggles membership without replacing the rest of the selection.
    /// Removing the representative promotes an arbitrary remaining note.
    pub fn toggle(&mut self, id: NoteId) {
        if let Some(pos) = self.ids.iter().position(|x| *x == id) {
            self.ids.remove(pos);
            if self.representative == Some(id) {
                self.representative = self.ids.first().copied();
            }
        } else {
            self.ids.push(id);
            self.representative = Some(id);
        }
    }

    /// Drops ids no longer present in the document.
    pub fn retain_valid(&mut self, doc: &ScoreDocument) {
        self.ids.retain(|id| doc.contains(*id));
        match self.representative {
            Some(id) if doc.contains(id) && self.ids.contains(&id) => {}
            _ => self.representative = self.ids.first().copied(),
        }
    }
}
