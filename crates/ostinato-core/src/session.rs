use crate::gesture::{GestureConfig, GestureController, GestureSignal, Modifiers, PointerEvent};
use crate::playback::{PlaybackController, PlaybackState, PlaybackUpdate};
use crate::view_map::ViewMap;
use ostinato_domain_edit::{EditCommand, History, Selection};
use ostinato_domain_score::{pitch_name, NoteId, ScoreDocument};
use ostinato_ports::codec::{CodecError, ScoreCodecPort};
use ostinato_ports::generate::{GenerationError, GenerationParams, GenerationPort};
use ostinato_ports::sequencer::{SequencerError, SequencerPort};
use ostinato_ports::types::{Note, Tick};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("sequencer error: {0}")]
    Sequencer(#[from] SequencerError),
    #[error("no generation service configured")]
    NoGenerator,
}

/// Notifications for host shells, drained via
/// [`EditorSession::drain_events`] on the UI thread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    DocumentReplaced,
    NotesChanged,
    SelectionChanged { count: usize },
    HistoryChanged { can_undo: bool, can_redo: bool },
    CursorMoved { tick: Tick },
    TransportChanged { playing: bool, tick: Tick },
    LoopChanged,
}

/// Wires document, history, selection, gestures and playback into one
/// editing surface, with codec and generation collaborators injected.
/// All calls are expected on a single UI thread; playback's poller is
/// the only other actor and talks back through `poll_playback`.
pub struct EditorSession {
    document: ScoreDocument,
    selection: Selection,
    history: History,
    gestures: GestureController,
    view: ViewMap,
    playback: PlaybackController,
    codec: Box<dyn ScoreCodecPort>,
    generator: Option<Box<dyn GenerationPort>>,
    events: VecDeque<SessionEvent>,
}

impl EditorSession {
    pub fn new(
        codec: Box<dyn ScoreCodecPort>,
        sequencer: Box<dyn SequencerPort>,
        generator: Option<Box<dyn GenerationPort>>,
    ) -> Self {
        let document = ScoreDocument::default();
        let view = ViewMap::new(document.ppqn());
        Self {
            document,
            selection: Selection::default(),
            history: History::default(),
            gestures: GestureController::new(GestureConfig::default()),
            view,
            playback: PlaybackController::new(sequencer),
            codec,
            generator,
            events: VecDeque::new(),
        }
    }

    pub fn document(&self) -> &ScoreDocument {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn view(&self) -> &ViewMap {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewMap {
        &mut self.view
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn gestures(&self) -> &GestureController {
        &self.gestures
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    // ----- document lifecycle -----

    /// Replaces the document with a fresh empty one. History and
    /// selection are cleared; playback stops.
    pub fn new_document(&mut self) {
        self.playback.stop();
        self.document = ScoreDocument::default();
        self.after_document_replaced();
    }

    /// Decodes a file and replaces the document. A decode failure leaves
    /// document, history and selection untouched.
    pub fn load_file(&mut self, path: &Path) -> Result<(), SessionError> {
        let data = self.codec.load_path(path)?;
        log::info!("loaded {} notes from {}", data.notes.len(), path.display());
        self.playback.stop();
        self.document.reset_from(data);
        self.after_document_replaced();
        Ok(())
    }

    pub fn save_file(&mut self, path: &Path) -> Result<(), SessionError> {
        self.codec.save_path(
            path,
            &self.document.notes_by_value(),
            self.document.ppqn(),
            self.document.tempo_bpm(),
        )?;
        log::info!("saved {} notes to {}", self.document.len(), path.display());
        Ok(())
    }

    fn after_document_replaced(&mut self) {
        self.history.clear();
        self.selection.clear();
        self.view.set_ppqn(self.document.ppqn());
        self.events.push_back(SessionEvent::DocumentReplaced);
        self.push_history_event();
        self.push_selection_event();
    }

    // ----- pointer and keyboard input -----

    pub fn pointer_down(&mut self, x: i32, y: i32, modifiers: Modifiers) {
        let signals = self.gestures.on_pointer_down(
            PointerEvent::new(x, y, modifiers),
            &self.view,
            &mut self.document,
            &mut self.selection,
        );
        self.apply_signals(signals);
    }

    pub fn pointer_move(&mut self, x: i32, y: i32, modifiers: Modifiers) {
        let signals = self.gestures.on_pointer_move(
            PointerEvent::new(x, y, modifiers),
            &self.view,
            &mut self.document,
            &mut self.selection,
            &mut self.history,
        );
        self.apply_signals(signals);
    }

    pub fn pointer_up(&mut self, x: i32, y: i32, modifiers: Modifiers) {
        let signals = self.gestures.on_pointer_up(
            PointerEvent::new(x, y, modifiers),
            &self.view,
            &mut self.document,
            &mut self.selection,
            &mut self.history,
        );
        self.apply_signals(signals);
    }

    pub fn delete_selection(&mut self) {
        let signals =
            self.gestures
                .on_delete_key(&mut self.document, &mut self.selection, &mut self.history);
        self.apply_signals(signals);
    }

    /// Deletes every note as one reversible command.
    pub fn delete_all(&mut self) {
        if self.document.is_empty() {
            return;
        }
        let notes: Vec<(NoteId, Note)> =
            self.document.notes().map(|(id, n)| (id, *n)).collect();
        self.history.record(
            EditCommand::DeleteNotes { notes },
            &mut self.document,
            &mut self.selection,
        );
        self.events.push_back(SessionEvent::NotesChanged);
        self.push_history_event();
        self.push_selection_event();
    }

    /// Selects notes whose start tick lies in `[start, end)`, the window
    /// a regeneration call would replace.
    pub fn select_range(&mut self, start: Tick, end: Tick) {
        let ids = self.document.notes_starting_in(start, end);
        self.selection.select_many(ids);
        self.push_selection_event();
    }

    fn apply_signals(&mut self, signals: Vec<GestureSignal>) {
        for signal in signals {
            match signal {
                GestureSignal::CursorScrubbed(tick) => {
                    self.playback.seek(tick);
                    self.events.push_back(SessionEvent::CursorMoved { tick });
                }
                GestureSignal::LoopChanged => {
                    match self.document.loop_range() {
                        Some(range) => {
                            self.playback.set_loop(range.start_tick, range.end_tick)
                        }
                        None => self.playback.clear_loop(),
                    }
                    self.events.push_back(SessionEvent::LoopChanged);
                }
                GestureSignal::SelectionChanged => self.push_selection_event(),
                GestureSignal::NotesEdited => {
                    self.events.push_back(SessionEvent::NotesChanged);
                    self.push_history_event();
                }
            }
        }
    }

    // ----- history -----

    pub fn undo(&mut self) {
        if self.history.undo(&mut self.document, &mut self.selection) {
            self.events.push_back(SessionEvent::NotesChanged);
            self.push_history_event();
            self.push_selection_event();
        }
    }

    pub fn redo(&mut self) {
        if self.history.redo(&mut self.document, &mut self.selection) {
            self.events.push_back(SessionEvent::NotesChanged);
            self.push_history_event();
            self.push_selection_event();
        }
    }

    // ----- playback -----

    /// Compiles the current document and starts playback. Resuming from
    /// pause keeps the previously compiled stream and cursor.
    pub fn play(&mut self) -> Result<(), SessionError> {
        if self.playback.state() == PlaybackState::Stopped {
            self.playback.load(&self.document)?;
        }
        self.playback.play();
        self.push_transport_event();
        Ok(())
    }

    pub fn pause(&mut self) {
        self.playback.pause();
        self.push_transport_event();
    }

    pub fn stop(&mut self) {
        self.playback.stop();
        self.push_transport_event();
    }

    pub fn toggle_playback(&mut self) -> Result<(), SessionError> {
        if self.playback.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.document.set_tempo(bpm);
        self.playback.set_tempo(self.document.tempo_bpm());
    }

    /// Drains poller hand-offs; call once per UI frame. Emits cursor and
    /// end-of-stream transitions as session events.
    pub fn poll_playback(&mut self) {
        for update in self.playback.drain_updates() {
            match update {
                PlaybackUpdate::Cursor(tick) => {
                    self.events.push_back(SessionEvent::CursorMoved { tick });
                }
                PlaybackUpdate::Finished => self.push_transport_event(),
            }
        }
    }

    pub fn close(&mut self) {
        self.playback.close();
    }

    // ----- generation -----

    /// Sends the window `[start, end)` to the generation service and
    /// splices the returned notes back in as one reversible command.
    /// Any failure leaves the document and history untouched.
    pub fn regenerate_range(
        &mut self,
        start: Tick,
        end: Tick,
        params: &GenerationParams,
    ) -> Result<(), SessionError> {
        let generator = self.generator.as_ref().ok_or(SessionError::NoGenerator)?;

        let window: Vec<Note> = self
            .document
            .notes_starting_in(start, end)
            .iter()
            .filter_map(|id| self.document.note(*id))
            .map(|n| Note {
                start_tick: n.start_tick - start,
                ..*n
            })
            .collect();
        let encoded =
            self.codec
                .encode_bytes(&window, self.document.ppqn(), self.document.tempo_bpm())?;

        let returned = generator.generate(&encoded, params)?;
        let decoded = self.codec.load_bytes(&returned)?;

        // Returned ticks are window-relative; shift back into place.
        let notes: Vec<Note> = decoded
            .notes
            .into_iter()
            .map(|n| Note {
                start_tick: n.start_tick + start,
                ..n
            })
            .collect();
        log::info!(
            "generation replaced window [{start}, {end}) with {} notes",
            notes.len()
        );

        let cmd = EditCommand::replace_range(&mut self.document, start, end, notes);
        self.history
            .record(cmd, &mut self.document, &mut self.selection);
        self.events.push_back(SessionEvent::NotesChanged);
        self.push_history_event();
        self.push_selection_event();
        Ok(())
    }

    // ----- info -----

    /// "C4 vel 100 ch 0 @ 480 x240"-style line for the representative
    /// selected note, if any.
    pub fn representative_info(&self) -> Option<String> {
        let id = self.selection.representative()?;
        let note = self.document.note(id)?;
        Some(format!(
            "{} vel {} ch {} @ {} x{}",
            pitch_name(note.pitch),
            note.velocity,
            note.channel,
            note.start_tick,
            note.duration_ticks
        ))
    }

    fn push_selection_event(&mut self) {
        self.events.push_back(SessionEvent::SelectionChanged {
            count: self.selection.len(),
        });
    }

    fn push_history_event(&mut self) {
        self.events.push_back(SessionEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    fn push_transport_event(&mut self) {
        self.events.push_back(SessionEvent::TransportChanged {
            playing: self.playback.is_playing(),
            tick: self.playback.cursor_tick(),
        });
    }
}
