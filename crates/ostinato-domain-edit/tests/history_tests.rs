use ostinato_domain_edit::{EditCommand, History, Selection};
use ostinato_domain_score::ScoreDocument;
use ostinato_ports::types::Note;
use pretty_assertions::assert_eq;

fn note(pitch: u8, start: i64, duration: i64) -> Note {
    Note::new(pitch, start, duration, 100, 0)
}

fn add(doc: &mut ScoreDocument, n: Note) -> EditCommand {
    EditCommand::AddNote {
        id: doc.allocate_id(),
        note: n,
    }
}

#[test]
fn add_undo_redo_single_note() {
    let mut doc = ScoreDocument::new(480);
    let mut sel = Selection::default();
    let mut history = History::default();

    let n = note(60, 0, 480);
    let cmd = add(&mut doc, n);
    history.record(cmd, &mut doc, &mut sel);
    assert_eq!(doc.len(), 1);
    assert_eq!(sel.len(), 1);

    assert!(history.undo(&mut doc, &mut sel));
    assert_eq!(doc.len(), 0);
    assert!(sel.is_empty());

    assert!(history.redo(&mut doc, &mut sel));
    assert_eq!(doc.notes_by_value(), vec![n]);
}

#[test]
fn n_records_then_n_undos_restore_initial_state() {
    let mut doc = ScoreDocument::new(480);
    let mut sel = Selection::default();
    let mut history = History::default();

    let seeded = doc.add_note(note(48, 0, 960));
    let before = doc.notes_by_value();

    let commands: Vec<EditCommand> = vec![
        add(&mut doc, note(60, 0, 480)),
        add(&mut doc, note(64, 480, 480)),
        EditCommand::MoveNote {
            id: seeded,
            old_start: 0,
            old_pitch: 48,
            new_start: 960,
            new_pitch: 50,
        },
        EditCommand::ResizeNote {
            id: seeded,
            old_duration: 960,
            new_duration: 240,
        },
        EditCommand::DeleteNote {
            id: seeded,
            note: note(50, 960, 240),
        },
    ];
    let count = commands.len();
    for cmd in commands {
        history.record(cmd, &mut doc, &mut sel);
    }
    assert_ne!(doc.notes_by_value(), before);

    for _ in 0..count {
        assert!(history.undo(&mut doc, &mut sel));
    }
    assert_eq!(doc.notes_by_value(), before);
}

#[test]
fn recording_after_undo_clears_redo() {
    let mut doc = ScoreDocument::new(480);
    let mut sel = Selection::default();
    let mut history = History::default();

    history.record(add(&mut doc, note(60, 0, 480)), &mut doc, &mut sel);
    history.record(add(&mut doc, note(64, 480, 480)), &mut doc, &mut sel);

    assert!(history.undo(&mut doc, &mut sel));
    assert!(history.can_redo());

    history.record(add(&mut doc, note(67, 960, 480)), &mut doc, &mut sel);
    assert!(!history.can_redo());
    assert!(!history.redo(&mut doc, &mut sel));
}

#[test]
fn undo_redo_on_empty_stacks_are_noops() {
    let mut doc = ScoreDocument::new(480);
    let mut sel = Selection::default();
    let mut history = History::default();

    assert!(!history.undo(&mut doc, &mut sel));
    assert!(!history.redo(&mut doc, &mut sel));
    assert!(!history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn delete_many_restores_exact_notes_and_reselects() {
    let mut doc = ScoreDocument::new(480);
    let mut sel = Selection::default();
    let mut history = History::default();

    let ids = vec![
        doc.add_note(note(60, 0, 480)),
        doc.add_note(note(64, 960, 480)),
        doc.add_note(note(67, 1440, 480)),
    ];
    let before = doc.notes_by_value();

    let notes = ids
        .iter()
        .map(|id| (*id, *doc.note(*id).expect("present")))
        .collect();
    history.record(EditCommand::DeleteNotes { notes }, &mut doc, &mut sel);
    assert_eq!(doc.len(), 0);
    assert!(sel.is_empty());

    assert!(history.undo(&mut doc, &mut sel));
    assert_eq!(doc.notes_by_value(), before);
    assert_eq!(sel.len(), 3);
    assert_eq!(sel.representative(), Some(ids[0]));

    assert!(history.redo(&mut doc, &mut sel));
    assert_eq!(doc.len(), 0);
}

#[test]
fn replace_range_round_trips_exactly() {
    let mut doc = ScoreDocument::new(480);
    let mut sel = Selection::default();
    let mut history = History::default();

    doc.add_note(note(60, 0, 480));
    doc.add_note(note(62, 480, 480)); // inside the window
    doc.add_note(note(64, 2400, 480));
    let before = doc.notes_by_value();

    let cmd = EditCommand::replace_range(
        &mut doc,
        480,
        1920,
        vec![note(70, 480, 240), note(72, 720, 240)],
    );
    history.record(cmd, &mut doc, &mut sel);
    assert_eq!(doc.len(), 4); // two survivors, two generated
    assert_eq!(sel.len(), 2);

    let after = doc.notes_by_value();
    assert!(history.undo(&mut doc, &mut sel));
    assert_eq!(doc.notes_by_value(), before);

    assert!(history.redo(&mut doc, &mut sel));
    assert_eq!(doc.notes_by_value(), after);
}

#[test]
fn selection_toggle_promotes_new_representative() {
    let mut doc = ScoreDocument::new(480);
    let a = doc.add_note(note(60, 0, 480));
    let b = doc.add_note(note(64, 480, 480));

    let mut sel = Selection::default();
    sel.toggle(a);
    sel.toggle(b);
    assert_eq!(sel.representative(), Some(b));

    sel.toggle(b); // remove the representative
    assert_eq!(sel.representative(), Some(a));

    sel.toggle(a);
    assert!(sel.is_empty());
    assert_eq!(sel.representative(), None);
}
