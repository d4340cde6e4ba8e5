use ostinato_ports::codec::ScoreData;
use ostinato_ports::types::{LoopRange, Note, Tick, DEFAULT_PPQN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable handle to a note owned by a [`ScoreDocument`]. Ids survive
/// undo/redo: re-inserting a deleted note re-uses its original id, so
/// selections and later commands that reference it stay valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(pub u64);

/// Trailing margin appended whenever the document grows, in quarter notes.
const LENGTH_MARGIN_QUARTERS: Tick = 4;

/// Fresh documents span this many beats so the grid is usable before any
/// notes exist.
const NEW_DOCUMENT_BEATS: Tick = 64;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoreDocument {
    notes: BTreeMap<NoteId, Note>,
    next_id: u64,
    ppqn: u16,
    total_ticks: Tick,
    tempo_bpm: f64,
    loop_range: Option<LoopRange>,
}

impl ScoreDocument {
    pub fn new(ppqn: u16) -> Self {
        let ppqn = ppqn.max(1);
        Self {
            notes: BTreeMap::new(),
            next_id: 1,
            ppqn,
            total_ticks: ppqn as Tick * NEW_DOCUMENT_BEATS,
            tempo_bpm: 120.0,
            loop_range: None,
        }
    }

    /// Replaces the whole document with decoded file contents. Assigns
    /// fresh ids; callers are expected to clear history and selection.
    pub fn reset_from(&mut self, data: ScoreData) {
        self.notes.clear();
        self.next_id = 1;
        self.ppqn = data.ppqn.max(1);
        self.total_ticks = data.total_ticks.max(self.ppqn as Tick * NEW_DOCUMENT_BEATS);
        self.loop_range = None;
        self.set_tempo(data.tempo_bpm);
        for note in data.notes {
            self.add_note(note);
        }
    }

    pub fn ppqn(&self) -> u16 {
        self.ppqn
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn total_ticks(&self) -> Tick {
        self.total_ticks
    }

    pub fn loop_range(&self) -> Option<LoopRange> {
        self.loop_range
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.contains_key(&id)
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }

    pub fn notes(&self) -> impl Iterator<Item = (NoteId, &Note)> {
        self.notes.iter().map(|(id, note)| (*id, note))
    }

    /// Note values sorted by (start, pitch), for value-wise comparison.
    pub fn notes_by_value(&self) -> Vec<Note> {
        let mut out: Vec<Note> = self.notes.values().copied().collect();
        out.sort_by_key(|n| (n.start_tick, n.pitch, n.duration_ticks));
        out
    }

    pub fn allocate_id(&mut self) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Inserts a new note, clamping malformed fields.
    pub fn add_note(&mut self, note: Note) -> NoteId {
        let id = self.allocate_id();
        self.insert(id, note);
        id
    }

    /// Inserts under a known id, preserving identity across undo/redo.
    pub fn insert(&mut self, id: NoteId, note: Note) {
        let note = Note::new(
            note.pitch,
            note.start_tick,
            note.duration_ticks,
            note.velocity,
            note.channel,
        );
        self.next_id = self.next_id.max(id.0 + 1);
        self.notes.insert(id, note);
        self.ensure_length(note.end_tick());
    }

    pub fn remove(&mut self, id: NoteId) -> Option<Note> {
        self.notes.remove(&id)
    }

    pub fn remove_all(&mut self, ids: &[NoteId]) -> Vec<(NoteId, Note)> {
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(note) = self.notes.remove(id) {
                removed.push((*id, note));
            }
        }
        removed
    }

    /// Rewrites start/pitch on the owned instance. Fields are clamped.
    pub fn set_position(&mut self, id: NoteId, start_tick: Tick, pitch: u8) {
        if let Some(note) = self.notes.get_mut(&id) {
            note.start_tick = start_tick.max(0);
            note.pitch = pitch.min(ostinato_ports::MAX_PITCH);
            let end = note.end_tick();
            self.ensure_length(end);
        }
    }

    /// Rewrites duration on the owned instance, keeping it >= 1 tick.
    pub fn set_duration(&mut self, id: NoteId, duration_ticks: Tick) {
        if let Some(note) = self.notes.get_mut(&id) {
            note.duration_ticks = duration_ticks.max(1);
            let end = note.end_tick();
            self.ensure_length(end);
        }
    }

    /// Ids of notes whose start lies in [start, end). This is the window
    /// the generation splice replaces.
    pub fn notes_starting_in(&self, start: Tick, end: Tick) -> Vec<NoteId> {
        self.notes
            .iter()
            .filter(|(_, n)| n.start_tick >= start && n.start_tick < end)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Ids of notes whose [start, end) span overlaps the given window.
    pub fn notes_intersecting(&self, start: Tick, end: Tick) -> Vec<NoteId> {
        self.notes
            .iter()
            .filter(|(_, n)| n.start_tick < end && n.end_tick() > start)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Clamps both bounds to [0, inf), swaps a reversed pair, and enforces
    /// a minimum span of a sixteenth of a measure (ppqn / 4 ticks).
    pub fn set_loop_range(&mut self, a: Tick, b: Tick) {
        let min_span = (self.ppqn as Tick / 4).max(1);
        let mut start = a.min(b).max(0);
        let mut end = a.max(b).max(0);
        if end - start < min_span {
            if start >= min_span {
                start = end - min_span;
            } else {
                end = start + min_span;
            }
        }
        self.loop_range = Some(LoopRange {
            start_tick: start,
            end_tick: end,
        });
    }

    pub fn clear_loop(&mut self) {
        self.loop_range = None;
    }

    /// Non-positive or non-finite tempos are ignored.
    pub fn set_tempo(&mut self, bpm: f64) {
        if bpm.is_finite() && bpm > 0.0 {
            self.tempo_bpm = bpm;
        }
    }

    /// Extends the document so `tick` fits with a margin. Length never
    /// shrinks, so prior layout and scroll state stay valid.
    pub fn ensure_length(&mut self, tick: Tick) {
        if tick > self.total_ticks {
            self.total_ticks = tick + self.ppqn as Tick * LENGTH_MARGIN_QUARTERS;
        }
    }
}

impl Default for ScoreDocument {
    fn default() -> Self {
        Self::new(DEFAULT_PPQN)
    }
}

const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// "C4"-style spelling of a MIDI note number, octave -1 at pitch 0.
pub fn pitch_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", PITCH_NAMES[(pitch % 12) as usize], octave)
}
