use crate::selection::Selection;
use ostinato_domain_score::{NoteId, ScoreDocument};
use ostinato_ports::types::{Note, Tick};
use serde::{Deserialize, Serialize};

/// One reversible edit. Construction is pure: nothing touches the document
/// until the history log invokes [`EditCommand::apply`], and each variant
/// carries enough prior state to invert itself exactly and to reapply
/// deterministically after an undo.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EditCommand {
    AddNote {
        id: NoteId,
        note: Note,
    },
    DeleteNote {
        id: NoteId,
        note: Note,
    },
    DeleteNotes {
        notes: Vec<(NoteId, Note)>,
    },
    MoveNote {
        id: NoteId,
        old_start: Tick,
        old_pitch: u8,
        new_start: Tick,
        new_pitch: u8,
    },
    ResizeNote {
        id: NoteId,
        old_duration: Tick,
        new_duration: Tick,
    },
    ReplaceRange {
        start_tick: Tick,
        end_tick: Tick,
        removed: Vec<(NoteId, Note)>,
        inserted: Vec<(NoteId, Note)>,
    },
}

impl EditCommand {
    /// Builds a range replacement against the current document: every note
    /// whose start lies in [start, end) goes, `new_notes` come in under
    /// freshly allocated ids. Only id allocation touches the document here;
    /// the note set is untouched until `apply`.
    pub fn replace_range(
        doc: &mut ScoreDocument,
        start_tick: Tick,
        end_tick: Tick,
        new_notes: Vec<Note>,
    ) -> Self {
        let removed: Vec<(NoteId, Note)> = doc
            .notes_starting_in(start_tick, end_tick)
            .into_iter()
            .filter_map(|id| doc.note(id).map(|note| (id, *note)))
            .collect();
        let inserted: Vec<(NoteId, Note)> = new_notes
            .into_iter()
            .map(|note| (doc.allocate_id(), note))
            .collect();
        Self::ReplaceRange {
            start_tick,
            end_tick,
            removed,
            inserted,
        }
    }

    pub fn apply(&self, doc: &mut ScoreDocument, selection: &mut Selection) {
        match self {
            Self::AddNote { id, note } => {
                doc.insert(*id, *note);
                selection.select_one(*id);
            }
            Self::DeleteNote { id, .. } => {
                doc.remove(*id);
                selection.clear();
            }
            Self::DeleteNotes { notes } => {
                for (id, _) in notes {
                    doc.remove(*id);
                }
                selection.clear();
            }
            Self::MoveNote {
                id,
                new_start,
                new_pitch,
                ..
            } => {
                doc.set_position(*id, *new_start, *new_pitch);
            }
            Self::ResizeNote {
                id, new_duration, ..
            } => {
                doc.set_duration(*id, *new_duration);
            }
            Self::ReplaceRange {
                removed, inserted, ..
            } => {
                for (id, _) in removed {
                    doc.remove(*id);
                }
                for (id, note) in inserted {
                    doc.insert(*id, *note);
                }
                selection.select_many(inserted.iter().map(|(id, _)| *id).collect());
            }
        }
    }

    pub fn revert(&self, doc: &mut ScoreDocument, selection: &mut Selection) {
        match self {
            Self::AddNote { id, .. } => {
                doc.remove(*id);
                selection.clear();
            }
            Self::DeleteNote { id, note } => {
                doc.insert(*id, *note);
                selection.select_one(*id);
            }
            Self::DeleteNotes { notes } => {
                for (id, note) in notes {
                    doc.insert(*id, *note);
                }
                selection.select_many(notes.iter().map(|(id, _)| *id).collect());
            }
            Self::MoveNote {
                id,
                old_start,
                old_pitch,
                ..
            } => {
                doc.set_position(*id, *old_start, *old_pitch);
            }
            Self::ResizeNote {
                id, old_duration, ..
            } => {
                doc.set_duration(*id, *old_duration);
            }
            Self::ReplaceRange {
                removed, inserted, ..
            } => {
                for (id, _) in inserted {
                    doc.remove(*id);
                }
                for (id, note) in removed {
                    doc.insert(*id, *note);
                }
                selection.select_many(removed.iter().map(|(id, _)| *id).collect());
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::AddNote { note, .. } => format!("Add Note (pitch {})", note.pitch),
            Self::DeleteNote { note, .. } => format!("Delete Note (pitch {})", note.pitch),
            Self::DeleteNotes { notes } => format!("Delete {} Notes", notes.len()),
            Self::MoveNote {
                old_start,
                old_pitch,
                new_start,
                new_pitch,
                ..
            } => format!(
                "Move Note (pitch {} -> {}, start {} -> {})",
                old_pitch, new_pitch, old_start, new_start
            ),
            Self::ResizeNote {
                old_duration,
                new_duration,
                ..
            } => format!("Resize Note ({} -> {} ticks)", old_duration, new_duration),
            Self::ReplaceRange {
                start_tick,
                end_tick,
                inserted,
                ..
            } => format!(
                "Replace [{}, {}) with {} notes",
                start_tick,
                end_tick,
                inserted.len()
            ),
        }
    }
}
