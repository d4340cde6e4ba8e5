use crate::view_map::{PixelPoint, PixelRect, Region, ViewMap, RESIZE_HANDLE_PX};
use ostinato_domain_edit::{EditCommand, History, Selection};
use ostinato_domain_score::{NoteId, ScoreDocument};
use ostinato_ports::types::{Note, Tick};

/// Default duration of a click-created note, in quarter notes.
const CREATED_NOTE_QUARTERS: Tick = 1;
const CREATED_NOTE_VELOCITY: u8 = 100;
const CREATED_NOTE_CHANNEL: u8 = 0;

#[derive(Clone, Copy, Debug)]
pub struct GestureConfig {
    /// Grid division applied at gesture commit (16 = sixteenth notes).
    pub snap_division: u16,
    /// Beat-level division used when scrubbing or placing loop markers
    /// from the ruler.
    pub ruler_division: u16,
    /// A marquee no larger than this in either axis is treated as a
    /// click, which creates a note on empty grid space.
    pub marquee_slop_px: i32,
    /// Gates [`GestureController::lock_pitch_axis`]; hosts with a
    /// long-press timer may turn a move into a pitch-only drag.
    pub long_press_pitch_lock: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            snap_division: 16,
            ruler_division: 4,
            marquee_slop_px: 5,
            long_press_pitch_lock: false,
        }
    }
}

/// Modifier keys by role rather than by physical key, so hosts map their
/// own bindings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Toggle membership in the multi-selection; on the ruler, place the
    /// loop start.
    pub extend: bool,
    /// Freehand drawing in the grid; on the ruler, place the loop end.
    pub draw: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        extend: false,
        draw: false,
    };
    pub const EXTEND: Modifiers = Modifiers {
        extend: true,
        draw: false,
    };
    pub const DRAW: Modifiers = Modifiers {
        extend: false,
        draw: true,
    };
}

#[derive(Clone, Copy, Debug)]
pub struct PointerEvent {
    pub pos: PixelPoint,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(x: i32, y: i32, modifiers: Modifiers) -> Self {
        Self {
            pos: PixelPoint::new(x, y),
            modifiers,
        }
    }
}

/// Effects the controller cannot apply itself; the session routes them
/// to the playback controller and observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureSignal {
    CursorScrubbed(Tick),
    LoopChanged,
    SelectionChanged,
    NotesEdited,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Moving {
        id: NoteId,
        origin: Note,
        anchor: PixelPoint,
        pitch_only: bool,
    },
    Resizing {
        id: NoteId,
        origin: Note,
        anchor: PixelPoint,
    },
    MarqueeSelecting {
        anchor: PixelPoint,
        rect: PixelRect,
    },
    FreehandDrawing {
        id: NoteId,
        pitch: u8,
        start_tick: Tick,
        last_tick: Tick,
    },
}

/// Pointer-gesture state machine. Mutates notes in place for the duration
/// of a live gesture; the mutation is rolled back at pointer-up and the
/// final value goes through the history log, which is the only path that
/// durably changes the document.
#[derive(Debug)]
pub struct GestureController {
    config: GestureConfig,
    state: GestureState,
}

impl GestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::Idle,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Current marquee rectangle, for renderers.
    pub fn marquee_rect(&self) -> Option<PixelRect> {
        match &self.state {
            GestureState::MarqueeSelecting { rect, .. } => Some(*rect),
            _ => None,
        }
    }

    pub fn on_pointer_down(
        &mut self,
        ev: PointerEvent,
        view: &ViewMap,
        doc: &mut ScoreDocument,
        selection: &mut Selection,
    ) -> Vec<GestureSignal> {
        let mut signals = Vec::new();
        match view.region(ev.pos) {
            Region::Ruler => self.ruler_down(ev, view, doc, &mut signals),
            Region::Keys => {
                if !selection.is_empty() {
                    selection.clear();
                    signals.push(GestureSignal::SelectionChanged);
                }
            }
            Region::Grid => self.grid_down(ev, view, doc, selection, &mut signals),
            Region::Outside => {}
        }
        signals
    }

    pub fn on_pointer_move(
        &mut self,
        ev: PointerEvent,
        view: &ViewMap,
        doc: &mut ScoreDocument,
        selection: &mut Selection,
        history: &mut History,
    ) -> Vec<GestureSignal> {
        let mut signals = Vec::new();
        // A pitch change or time regression during freehand drawing ends
        // the current stroke and starts a new one; staged here because it
        // re-enters the controller.
        let mut stroke_rollover: Option<(NoteId, u8, Tick)> = None;
        match &mut self.state {
            GestureState::Idle => {}
            GestureState::Moving {
                id,
                origin,
                anchor,
                pitch_only,
            } => {
                let dx = ev.pos.x - anchor.x;
                let dy = ev.pos.y - anchor.y;
                let start = if *pitch_only {
                    origin.start_tick
                } else {
                    view.shift_tick_by_pixels(origin.start_tick, dx)
                };
                let pitch = view.shift_pitch_by_pixels(origin.pitch, dy);
                doc.set_position(*id, start, pitch);
                signals.push(GestureSignal::NotesEdited);
            }
            GestureState::Resizing { id, origin, anchor } => {
                let dx = ev.pos.x - anchor.x;
                let end = view.shift_tick_by_pixels(origin.end_tick(), dx);
                let min_duration = (view.ppqn() as Tick / 16).max(1);
                let duration = (end - origin.start_tick).max(min_duration);
                doc.set_duration(*id, duration);
                signals.push(GestureSignal::NotesEdited);
            }
            GestureState::MarqueeSelecting { anchor, rect } => {
                *rect = PixelRect::from_corners(*anchor, ev.pos);
            }
            GestureState::FreehandDrawing {
                id,
                pitch,
                start_tick,
                last_tick,
            } => {
                let tick_now = view.x_to_tick(ev.pos.x);
                let pitch_now = view.y_to_pitch(ev.pos.y);
                let same_pitch = pitch_now == Some(*pitch);
                if same_pitch && tick_now >= *last_tick {
                    // Extend the current stroke forward in time.
                    doc.set_duration(*id, (tick_now - *start_tick).max(1));
                    *last_tick = tick_now;
                    signals.push(GestureSignal::NotesEdited);
                } else if let Some(new_pitch) = pitch_now {
                    stroke_rollover = Some((*id, new_pitch, tick_now));
                }
            }
        }
        if let Some((id, new_pitch, tick_now)) = stroke_rollover {
            self.commit_freehand_stroke(id, view, doc, selection, history);
            self.begin_freehand_stroke(new_pitch, tick_now, view, doc);
            signals.push(GestureSignal::NotesEdited);
        }
        signals
    }

    /// The release position is not consulted: committed values come from
    /// the live state the last drag event left behind.
    pub fn on_pointer_up(
        &mut self,
        _ev: PointerEvent,
        view: &ViewMap,
        doc: &mut ScoreDocument,
        selection: &mut Selection,
        history: &mut History,
    ) -> Vec<GestureSignal> {
        let mut signals = Vec::new();
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        match state {
            GestureState::Idle => {}
            GestureState::Moving { id, origin, .. } => {
                self.finish_move(id, origin, view, doc, selection, history, &mut signals);
            }
            GestureState::Resizing { id, origin, .. } => {
                self.finish_resize(id, origin, view, doc, selection, history, &mut signals);
            }
            GestureState::MarqueeSelecting { anchor, rect } => {
                if rect.width > self.config.marquee_slop_px
                    || rect.height > self.config.marquee_slop_px
                {
                    let hits: Vec<NoteId> = doc
                        .notes()
                        .filter(|(_, note)| view.note_rect(note).intersects(&rect))
                        .map(|(id, _)| id)
                        .collect();
                    selection.select_many(hits);
                    signals.push(GestureSignal::SelectionChanged);
                } else {
                    // A click on empty grid space creates a one-beat note.
                    self.create_note_at(anchor, view, doc, selection, history, &mut signals);
                }
            }
            GestureState::FreehandDrawing { id, .. } => {
                self.commit_freehand_stroke(id, view, doc, selection, history);
                signals.push(GestureSignal::NotesEdited);
                signals.push(GestureSignal::SelectionChanged);
            }
        }
        signals
    }

    /// Deletes the current selection as one reversible command.
    pub fn on_delete_key(
        &mut self,
        doc: &mut ScoreDocument,
        selection: &mut Selection,
        history: &mut History,
    ) -> Vec<GestureSignal> {
        if selection.is_empty() {
            return Vec::new();
        }
        let notes: Vec<(NoteId, Note)> = selection
            .ids()
            .iter()
            .filter_map(|id| doc.note(*id).map(|note| (*id, *note)))
            .collect();
        let command = match notes.as_slice() {
            [] => return Vec::new(),
            [(id, note)] => EditCommand::DeleteNote {
                id: *id,
                note: *note,
            },
            _ => EditCommand::DeleteNotes { notes },
        };
        history.record(command, doc, selection);
        vec![GestureSignal::NotesEdited, GestureSignal::SelectionChanged]
    }

    /// Turns an active move into a pitch-only drag. Gated by
    /// `GestureConfig::long_press_pitch_lock`; hosts call this from their
    /// long-press timer.
    pub fn lock_pitch_axis(&mut self, doc: &mut ScoreDocument) {
        if !self.config.long_press_pitch_lock {
            return;
        }
        if let GestureState::Moving {
            id,
            origin,
            pitch_only,
            ..
        } = &mut self.state
        {
            *pitch_only = true;
            let pitch = doc.note(*id).map(|n| n.pitch).unwrap_or(origin.pitch);
            doc.set_position(*id, origin.start_tick, pitch);
        }
    }

    /// Abandons any live gesture, restoring pre-gesture state without
    /// recording history.
    pub fn cancel(&mut self, doc: &mut ScoreDocument, selection: &mut Selection) {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        match state {
            GestureState::Moving { id, origin, .. } => {
                doc.set_position(id, origin.start_tick, origin.pitch);
            }
            GestureState::Resizing { id, origin, .. } => {
                doc.set_duration(id, origin.duration_ticks);
            }
            GestureState::FreehandDrawing { id, .. } => {
                doc.remove(id);
                selection.retain_valid(doc);
            }
            GestureState::MarqueeSelecting { .. } | GestureState::Idle => {}
        }
    }

    fn ruler_down(
        &mut self,
        ev: PointerEvent,
        view: &ViewMap,
        doc: &mut ScoreDocument,
        signals: &mut Vec<GestureSignal>,
    ) {
        let tick = view.snap(view.x_to_tick(ev.pos.x), self.config.ruler_division);
        match (ev.modifiers.extend, ev.modifiers.draw) {
            (false, false) => signals.push(GestureSignal::CursorScrubbed(tick)),
            (true, false) => {
                let end = doc
                    .loop_range()
                    .map(|r| r.end_tick)
                    .unwrap_or(tick + view.ppqn() as Tick * 4);
                doc.set_loop_range(tick, end);
                signals.push(GestureSignal::LoopChanged);
            }
            (false, true) => {
                let start = doc.loop_range().map(|r| r.start_tick).unwrap_or(0);
                doc.set_loop_range(start, tick);
                signals.push(GestureSignal::LoopChanged);
            }
            // Both modifiers together mean nothing on the ruler.
            (true, true) => {}
        }
    }

    fn grid_down(
        &mut self,
        ev: PointerEvent,
        view: &ViewMap,
        doc: &mut ScoreDocument,
        selection: &mut Selection,
        signals: &mut Vec<GestureSignal>,
    ) {
        if ev.modifiers.draw {
            if let Some(pitch) = view.y_to_pitch(ev.pos.y) {
                let tick = view.snap(view.x_to_tick(ev.pos.x), self.config.snap_division);
                if !selection.is_empty() {
                    selection.clear();
                    signals.push(GestureSignal::SelectionChanged);
                }
                self.begin_freehand_stroke(pitch, tick, view, doc);
                signals.push(GestureSignal::NotesEdited);
            }
            return;
        }

        let hit = note_at(doc, view, ev.pos);
        if ev.modifiers.extend {
            if let Some((id, _)) = hit {
                selection.toggle(id);
                signals.push(GestureSignal::SelectionChanged);
            }
            return;
        }

        match hit {
            Some((id, note)) => {
                if !selection.contains(id) {
                    selection.select_one(id);
                    signals.push(GestureSignal::SelectionChanged);
                }
                let end_x = view.tick_to_x(note.end_tick());
                self.state = if (ev.pos.x - end_x).abs() < RESIZE_HANDLE_PX {
                    GestureState::Resizing {
                        id,
                        origin: note,
                        anchor: ev.pos,
                    }
                } else {
                    GestureState::Moving {
                        id,
                        origin: note,
                        anchor: ev.pos,
                        pitch_only: false,
                    }
                };
            }
            None => {
                if !selection.is_empty() {
                    selection.clear();
                    signals.push(GestureSignal::SelectionChanged);
                }
                self.state = GestureState::MarqueeSelecting {
                    anchor: ev.pos,
                    rect: PixelRect::from_corners(ev.pos, ev.pos),
                };
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_move(
        &mut self,
        id: NoteId,
        origin: Note,
        view: &ViewMap,
        doc: &mut ScoreDocument,
        selection: &mut Selection,
        history: &mut History,
        signals: &mut Vec<GestureSignal>,
    ) {
        let Some(live) = doc.note(id).copied() else {
            return;
        };
        let new_start = view.snap(live.start_tick, self.config.snap_division).max(0);
        let new_pitch = live.pitch;

        // Roll the live drag back so the command is the sole mutation.
        doc.set_position(id, origin.start_tick, origin.pitch);

        if new_start != origin.start_tick || new_pitch != origin.pitch {
            history.record(
                EditCommand::MoveNote {
                    id,
                    old_start: origin.start_tick,
                    old_pitch: origin.pitch,
                    new_start,
                    new_pitch,
                },
                doc,
                selection,
            );
        }
        doc.ensure_length(new_start + live.duration_ticks);
        signals.push(GestureSignal::NotesEdited);
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_resize(
        &mut self,
        id: NoteId,
        origin: Note,
        view: &ViewMap,
        doc: &mut ScoreDocument,
        selection: &mut Selection,
        history: &mut History,
        signals: &mut Vec<GestureSignal>,
    ) {
        let Some(live) = doc.note(id).copied() else {
            return;
        };
        let min_duration = (view.ppqn() as Tick / 16).max(1);
        let new_duration = view
            .snap(live.duration_ticks, self.config.snap_division)
            .max(min_duration);

        doc.set_duration(id, origin.duration_ticks);

        if new_duration != origin.duration_ticks {
            history.record(
                EditCommand::ResizeNote {
                    id,
                    old_duration: origin.duration_ticks,
                    new_duration,
                },
                doc,
                selection,
            );
        }
        doc.ensure_length(origin.start_tick + new_duration);
        signals.push(GestureSignal::NotesEdited);
    }

    #[allow(clippy::too_many_arguments)]
    fn create_note_at(
        &mut self,
        pos: PixelPoint,
        view: &ViewMap,
        doc: &mut ScoreDocument,
        selection: &mut Selection,
        history: &mut History,
        signals: &mut Vec<GestureSignal>,
    ) {
        let Some(pitch) = view.y_to_pitch(pos.y) else {
            return;
        };
        let start = view.snap(view.x_to_tick(pos.x), self.config.snap_division);
        let note = Note::new(
            pitch,
            start,
            view.ppqn() as Tick * CREATED_NOTE_QUARTERS,
            CREATED_NOTE_VELOCITY,
            CREATED_NOTE_CHANNEL,
        );
        let id = doc.allocate_id();
        history.record(EditCommand::AddNote { id, note }, doc, selection);
        signals.push(GestureSignal::NotesEdited);
        signals.push(GestureSignal::SelectionChanged);
    }

    fn begin_freehand_stroke(
        &mut self,
        pitch: u8,
        tick: Tick,
        view: &ViewMap,
        doc: &mut ScoreDocument,
    ) {
        let duration = view.snap_unit(self.config.snap_division).max(1);
        let id = doc.add_note(Note::new(
            pitch,
            tick,
            duration,
            CREATED_NOTE_VELOCITY,
            CREATED_NOTE_CHANNEL,
        ));
        self.state = GestureState::FreehandDrawing {
            id,
            pitch,
            start_tick: tick,
            last_tick: tick,
        };
    }

    /// Removes the ephemeral stroke note and re-adds it through the
    /// history log with start and duration snapped. Rollover strokes
    /// begin at the raw pointer tick, so start must quantize here too.
    fn commit_freehand_stroke(
        &mut self,
        id: NoteId,
        view: &ViewMap,
        doc: &mut ScoreDocument,
        selection: &mut Selection,
        history: &mut History,
    ) {
        let Some(live) = doc.remove(id) else {
            return;
        };
        let min_duration = (view.ppqn() as Tick / 16).max(1);
        let start = view.snap(live.start_tick, self.config.snap_division).max(0);
        let duration = view
            .snap(live.duration_ticks, self.config.snap_division)
            .max(min_duration);
        let note = Note::new(live.pitch, start, duration, live.velocity, live.channel);
        history.record(EditCommand::AddNote { id, note }, doc, selection);
    }
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

/// Topmost note under the pointer: same pitch row, tick inside the note
/// span.
pub fn note_at(doc: &ScoreDocument, view: &ViewMap, pos: PixelPoint) -> Option<(NoteId, Note)> {
    let pitch = view.y_to_pitch(pos.y)?;
    let tick = view.x_to_tick(pos.x);
    doc.notes()
        .filter(|(_, n)| n.pitch == pitch && tick >= n.start_tick && tick < n.end_tick())
        .last()
        .map(|(id, n)| (id, *n))
}
