use ostinato_core::{GestureController, GestureSignal, Modifiers, PointerEvent, ViewMap};
use ostinato_domain_edit::{History, Selection};
use ostinato_domain_score::ScoreDocument;
use ostinato_ports::types::Note;
use pretty_assertions::assert_eq;

// At the default zoom (0.05 px/tick, 12 px rows, ppqn 480) one pixel is
// 20 ticks, pitch 60 occupies y 834..846, and tick 0 starts at x 70.

struct Rig {
    view: ViewMap,
    doc: ScoreDocument,
    sel: Selection,
    history: History,
    gestures: GestureController,
}

impl Rig {
    fn new() -> Self {
        Self {
            view: ViewMap::new(480),
            doc: ScoreDocument::new(480),
            sel: Selection::default(),
            history: History::default(),
            gestures: GestureController::default(),
        }
    }

    fn down(&mut self, x: i32, y: i32, m: Modifiers) -> Vec<GestureSignal> {
        self.gestures
            .on_pointer_down(PointerEvent::new(x, y, m), &self.view, &mut self.doc, &mut self.sel)
    }

    fn drag(&mut self, x: i32, y: i32, m: Modifiers) -> Vec<GestureSignal> {
        self.gestures.on_pointer_move(
            PointerEvent::new(x, y, m),
            &self.view,
            &mut self.doc,
            &mut self.sel,
            &mut self.history,
        )
    }

    fn up(&mut self, x: i32, y: i32, m: Modifiers) -> Vec<GestureSignal> {
        self.gestures.on_pointer_up(
            PointerEvent::new(x, y, m),
            &self.view,
            &mut self.doc,
            &mut self.sel,
            &mut self.history,
        )
    }
}

fn note(pitch: u8, start: i64, duration: i64) -> Note {
    Note::new(pitch, start, duration, 100, 0)
}

#[test]
fn move_commits_snapped_and_undoes() {
    let mut rig = Rig::new();
    let id = rig.doc.add_note(note(60, 0, 480));

    rig.down(82, 840, Modifiers::NONE); // body of the note
    assert!(rig.sel.contains(id));
    rig.drag(112, 840, Modifiers::NONE); // +30 px = +600 ticks, live
    assert_eq!(rig.doc.note(id).unwrap().start_tick, 600);
    rig.up(112, 840, Modifiers::NONE);

    assert_eq!(rig.doc.note(id).unwrap().start_tick, 600); // already grid-aligned
    assert!(rig.history.can_undo());
    assert!(rig.history.undo(&mut rig.doc, &mut rig.sel));
    assert_eq!(rig.doc.note(id).unwrap().start_tick, 0);
}

#[test]
fn noop_drag_creates_no_history_entry() {
    let mut rig = Rig::new();
    let id = rig.doc.add_note(note(60, 0, 480));

    rig.down(82, 840, Modifiers::NONE);
    rig.drag(83, 840, Modifiers::NONE); // +20 ticks, snaps back to 0
    rig.up(83, 840, Modifiers::NONE);

    assert!(!rig.history.can_undo());
    assert_eq!(rig.doc.note(id).unwrap().start_tick, 0);
    assert_eq!(rig.doc.note(id).unwrap().pitch, 60);
}

#[test]
fn resize_from_right_edge_snaps_duration() {
    let mut rig = Rig::new();
    let id = rig.doc.add_note(note(60, 0, 480));

    rig.down(93, 840, Modifiers::NONE); // 1 px left of the right edge at x 94
    rig.drag(106, 840, Modifiers::NONE);
    assert_eq!(rig.doc.note(id).unwrap().duration_ticks, 740); // live, unsnapped
    rig.up(106, 840, Modifiers::NONE);

    assert_eq!(rig.doc.note(id).unwrap().duration_ticks, 720);
    assert!(rig.history.undo(&mut rig.doc, &mut rig.sel));
    assert_eq!(rig.doc.note(id).unwrap().duration_ticks, 480);
}

#[test]
fn marquee_selects_intersecting_notes_only() {
    let mut rig = Rig::new();
    let low = rig.doc.add_note(note(60, 0, 480));
    let mid = rig.doc.add_note(note(64, 960, 480));
    let high = rig.doc.add_note(note(67, 1440, 480));

    rig.down(100, 700, Modifiers::NONE); // empty space
    rig.drag(150, 800, Modifiers::NONE);
    let signals = rig.up(150, 800, Modifiers::NONE);

    assert!(signals.contains(&GestureSignal::SelectionChanged));
    assert_eq!(rig.sel.len(), 2);
    assert!(rig.sel.contains(mid));
    assert!(rig.sel.contains(high));
    assert!(!rig.sel.contains(low));
    assert!(!rig.history.can_undo()); // selection is not an edit
}

#[test]
fn click_on_empty_grid_creates_a_beat_note() {
    let mut rig = Rig::new();

    rig.down(190, 840, Modifiers::NONE);
    rig.up(190, 840, Modifiers::NONE);

    assert_eq!(rig.doc.len(), 1);
    let (id, created) = rig.doc.notes().next().map(|(id, n)| (id, *n)).unwrap();
    assert_eq!(created, note(60, 2400, 480));
    assert!(rig.sel.contains(id));
    assert!(rig.history.can_undo());
    assert!(rig.history.undo(&mut rig.doc, &mut rig.sel));
    assert!(rig.doc.is_empty());
}

#[test]
fn freehand_draw_extends_then_commits_one_note() {
    let mut rig = Rig::new();

    rig.down(70, 834, Modifiers::DRAW);
    assert_eq!(rig.doc.len(), 1); // ephemeral stroke note
    rig.drag(94, 834, Modifiers::DRAW);
    rig.up(94, 834, Modifiers::DRAW);

    assert_eq!(rig.doc.notes_by_value(), vec![note(60, 0, 480)]);
    assert!(rig.history.can_undo());
    assert!(rig.history.undo(&mut rig.doc, &mut rig.sel));
    assert!(rig.doc.is_empty());
}

#[test]
fn freehand_pitch_change_starts_a_second_note() {
    let mut rig = Rig::new();

    rig.down(70, 834, Modifiers::DRAW);
    rig.drag(94, 834, Modifiers::DRAW);
    rig.drag(118, 822, Modifiers::DRAW); // one row up, pitch 61
    rig.up(142, 822, Modifiers::DRAW);

    assert_eq!(rig.doc.len(), 2);
    let pitches: Vec<u8> = rig.doc.notes_by_value().iter().map(|n| n.pitch).collect();
    assert_eq!(pitches, vec![60, 61]);
    // Two strokes, two history entries.
    assert!(rig.history.undo(&mut rig.doc, &mut rig.sel));
    assert_eq!(rig.doc.len(), 1);
    assert!(rig.history.undo(&mut rig.doc, &mut rig.sel));
    assert!(rig.doc.is_empty());
}

#[test]
fn freehand_rollover_stroke_commits_grid_aligned() {
    let mut rig = Rig::new();

    rig.down(70, 834, Modifiers::DRAW);
    rig.drag(94, 834, Modifiers::DRAW);
    rig.drag(117, 822, Modifiers::DRAW); // pitch change at off-grid tick 940
    rig.up(117, 822, Modifiers::DRAW);

    let notes = rig.doc.notes_by_value();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].pitch, 61);
    assert_eq!(notes[1].start_tick, 960); // nearest sixteenth
    assert_eq!(notes[1].start_tick % 120, 0);
}

#[test]
fn extend_modifier_toggles_membership_without_dragging() {
    let mut rig = Rig::new();
    let id = rig.doc.add_note(note(60, 0, 480));

    rig.down(82, 840, Modifiers::EXTEND);
    rig.up(82, 840, Modifiers::EXTEND);
    assert!(rig.sel.contains(id));
    assert!(rig.gestures.is_idle());

    rig.down(82, 840, Modifiers::EXTEND);
    rig.up(82, 840, Modifiers::EXTEND);
    assert!(rig.sel.is_empty());
    assert!(!rig.history.can_undo());
}

#[test]
fn ruler_click_scrubs_to_beat_snapped_tick() {
    let mut rig = Rig::new();
    let signals = rig.down(82, 10, Modifiers::NONE); // tick 240 rounds up a beat
    assert_eq!(signals, vec![GestureSignal::CursorScrubbed(480)]);
}

#[test]
fn ruler_modifiers_place_loop_bounds() {
    let mut rig = Rig::new();

    rig.down(94, 10, Modifiers::EXTEND); // loop start at tick 480
    let range = rig.doc.loop_range().unwrap();
    assert_eq!((range.start_tick, range.end_tick), (480, 480 + 4 * 480));

    rig.down(118, 10, Modifiers::DRAW); // loop end at tick 960
    let range = rig.doc.loop_range().unwrap();
    assert_eq!((range.start_tick, range.end_tick), (480, 960));

    // Both modifiers together are ignored.
    let signals = rig.down(
        142,
        10,
        Modifiers {
            extend: true,
            draw: true,
        },
    );
    assert!(signals.is_empty());
    assert_eq!(rig.doc.loop_range().unwrap().end_tick, 960);
}

#[test]
fn delete_key_removes_selection_reversibly() {
    let mut rig = Rig::new();
    let a = rig.doc.add_note(note(60, 0, 480));
    let b = rig.doc.add_note(note(64, 480, 480));
    rig.sel.select_many(vec![a, b]);

    let signals = rig
        .gestures
        .on_delete_key(&mut rig.doc, &mut rig.sel, &mut rig.history);
    assert!(signals.contains(&GestureSignal::NotesEdited));
    assert!(rig.doc.is_empty());
    assert!(rig.sel.is_empty());

    assert!(rig.history.undo(&mut rig.doc, &mut rig.sel));
    assert_eq!(rig.doc.len(), 2);
    assert_eq!(rig.sel.len(), 2);
}

#[test]
fn keyboard_region_click_clears_selection() {
    let mut rig = Rig::new();
    let id = rig.doc.add_note(note(60, 0, 480));
    rig.sel.select_one(id);

    let signals = rig.down(10, 840, Modifiers::NONE);
    assert_eq!(signals, vec![GestureSignal::SelectionChanged]);
    assert!(rig.sel.is_empty());
}

#[test]
fn cancel_restores_pre_gesture_state() {
    let mut rig = Rig::new();
    let id = rig.doc.add_note(note(60, 0, 480));

    rig.down(82, 840, Modifiers::NONE);
    rig.drag(200, 700, Modifiers::NONE);
    rig.gestures.cancel(&mut rig.doc, &mut rig.sel);

    assert_eq!(*rig.doc.note(id).unwrap(), note(60, 0, 480));
    assert!(!rig.history.can_undo());
    assert!(rig.gestures.is_idle());
}
