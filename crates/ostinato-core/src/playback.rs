use ostinato_domain_score::ScoreDocument;
use ostinato_ports::sequencer::{
    SequencedEvent, SequencedEventKind, SequencerError, SequencerPort,
};
use ostinato_ports::types::{LoopRange, Tick};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How often the poller samples the device cursor.
const POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Upper bound on waiting for the poller to wind down; past this the
/// thread is detached rather than blocking shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_millis(250);

const UPDATE_QUEUE_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// Cursor hand-off from the poller thread. Values arrive only through
/// [`PlaybackController::drain_updates`], so observers never see a
/// position read mid-update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackUpdate {
    Cursor(Tick),
    Finished,
}

/// Compiles a document snapshot into the timestamped stream the device
/// consumes. Offs sort before ons at equal ticks so retriggered pitches
/// are released before they restart.
pub fn compile_sequence(doc: &ScoreDocument) -> Vec<SequencedEvent> {
    let mut events = Vec::with_capacity(doc.len() * 2);
    for (_, note) in doc.notes() {
        events.push(SequencedEvent {
            tick: note.start_tick,
            kind: SequencedEventKind::NoteOn {
                pitch: note.pitch,
                velocity: note.velocity,
                channel: note.channel,
            },
        });
        events.push(SequencedEvent {
            tick: note.end_tick(),
            kind: SequencedEventKind::NoteOff {
                pitch: note.pitch,
                channel: note.channel,
            },
        });
    }
    events.sort_by_key(|e| (e.tick, event_rank(&e.kind)));
    events
}

fn event_rank(kind: &SequencedEventKind) -> u8 {
    match kind {
        SequencedEventKind::NoteOff { .. } => 0,
        SequencedEventKind::NoteOn { .. } => 1,
    }
}

/// Drives the timing device and owns all playback state. The compiled
/// stream is a snapshot: edits made after [`PlaybackController::load`]
/// do not affect playback until the next load.
pub struct PlaybackController {
    sequencer: Arc<Mutex<Box<dyn SequencerPort>>>,
    state: PlaybackState,
    cursor_tick: Tick,
    compiled_length: Tick,
    loop_range: Option<LoopRange>,
    tempo_bpm: f64,
    shutdown: Arc<AtomicBool>,
    // The ring buffer can drop hand-offs when the UI stalls; this flag is
    // the durable end-of-stream signal and survives a full queue.
    stream_ended: Arc<AtomicBool>,
    poller: Option<JoinHandle<()>>,
    updates: Option<rtrb::Consumer<PlaybackUpdate>>,
}

impl PlaybackController {
    /// Opens the device; when it is unavailable the controller degrades
    /// to an inert [`NullSequencer`] and reports the condition once.
    pub fn new(mut sequencer: Box<dyn SequencerPort>) -> Self {
        if let Err(err) = sequencer.open() {
            log::warn!("playback device unavailable, running without playback: {err}");
            sequencer = Box::new(NullSequencer::default());
        }
        Self {
            sequencer: Arc::new(Mutex::new(sequencer)),
            state: PlaybackState::Stopped,
            cursor_tick: 0,
            compiled_length: 0,
            loop_range: None,
            tempo_bpm: 120.0,
            shutdown: Arc::new(AtomicBool::new(false)),
            stream_ended: Arc::new(AtomicBool::new(false)),
            poller: None,
            updates: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_looping(&self) -> bool {
        self.loop_range.is_some()
    }

    pub fn cursor_tick(&self) -> Tick {
        self.cursor_tick
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn compiled_length(&self) -> Tick {
        self.compiled_length
    }

    /// Compiles and hands the document snapshot to the device. Tempo and
    /// loop state are refreshed from the document at the same time.
    pub fn load(&mut self, doc: &ScoreDocument) -> Result<(), SequencerError> {
        let events = compile_sequence(doc);
        self.compiled_length = doc.total_ticks();
        self.tempo_bpm = doc.tempo_bpm();
        {
            let mut seq = self.sequencer.lock();
            seq.set_sequence(doc.ppqn(), events)?;
            seq.set_tempo_bpm(self.tempo_bpm);
        }
        match doc.loop_range() {
            Some(range) => self.set_loop(range.start_tick, range.end_tick),
            None => self.clear_loop(),
        }
        Ok(())
    }

    /// Seeks the device to the last-known cursor and starts the poller.
    /// No-op when already playing.
    pub fn play(&mut self) {
        if self.state == PlaybackState::Playing {
            return;
        }
        {
            let mut seq = self.sequencer.lock();
            seq.set_tick_position(self.cursor_tick);
            seq.start();
        }
        self.spawn_poller();
        self.state = PlaybackState::Playing;
    }

    /// Stops the device without moving the cursor. No-op unless playing.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.stop_poller();
        {
            let mut seq = self.sequencer.lock();
            self.cursor_tick = seq.tick_position().max(0);
            seq.stop();
        }
        self.state = PlaybackState::Paused;
    }

    /// Stops the device and resets the cursor to tick 0, unconditionally.
    /// Safe to call repeatedly from any state.
    pub fn stop(&mut self) {
        self.stop_poller();
        {
            let mut seq = self.sequencer.lock();
            seq.stop();
            seq.set_tick_position(0);
        }
        self.cursor_tick = 0;
        self.state = PlaybackState::Stopped;
        // An end-of-stream that raced this stop is already honored.
        self.stream_ended.store(false, Ordering::Release);
    }

    /// Stops playback and releases the device. Idempotent.
    pub fn close(&mut self) {
        self.stop();
        self.sequencer.lock().close();
    }

    /// Moves the cursor; takes effect immediately on a running device.
    pub fn seek(&mut self, tick: Tick) {
        self.cursor_tick = tick.max(0);
        self.sequencer.lock().set_tick_position(self.cursor_tick);
    }

    /// Clamps both bounds into `[0, compiled_length)`. A degenerate
    /// result, or a non-positive compiled length, disables looping.
    pub fn set_loop(&mut self, a: Tick, b: Tick) {
        if self.compiled_length <= 0 {
            self.clear_loop();
            return;
        }
        let start = a.min(b).clamp(0, self.compiled_length - 1);
        let end = a.max(b).clamp(0, self.compiled_length - 1);
        if start >= end {
            self.clear_loop();
            return;
        }
        let range = LoopRange {
            start_tick: start,
            end_tick: end,
        };
        self.loop_range = Some(range);
        self.sequencer.lock().set_loop_points(Some(range));
    }

    pub fn clear_loop(&mut self) {
        self.loop_range = None;
        self.sequencer.lock().set_loop_points(None);
    }

    pub fn loop_range(&self) -> Option<LoopRange> {
        self.loop_range
    }

    /// Wall-clock speed only; tick timestamps in the compiled stream are
    /// unaffected. Non-positive tempos are ignored.
    pub fn set_tempo(&mut self, bpm: f64) {
        if !bpm.is_finite() || bpm <= 0.0 {
            return;
        }
        self.tempo_bpm = bpm;
        self.sequencer.lock().set_tempo_bpm(bpm);
    }

    /// Drains poller hand-offs on the caller's thread and applies them.
    /// A `Finished` update while not looping behaves exactly like
    /// [`PlaybackController::stop`].
    pub fn drain_updates(&mut self) -> Vec<PlaybackUpdate> {
        let mut applied = Vec::new();
        if let Some(consumer) = self.updates.as_mut() {
            while let Ok(update) = consumer.pop() {
                applied.push(update);
            }
        }
        // A full queue drops the poller's Finished push; the flag is
        // authoritative, the queued update merely keeps ordering.
        if self.stream_ended.swap(false, Ordering::AcqRel)
            && !applied.contains(&PlaybackUpdate::Finished)
        {
            applied.push(PlaybackUpdate::Finished);
        }
        for update in &applied {
            match update {
                PlaybackUpdate::Cursor(tick) => self.cursor_tick = (*tick).max(0),
                PlaybackUpdate::Finished => {
                    if self.loop_range.is_none() {
                        self.stop();
                    }
                }
            }
        }
        applied
    }

    fn spawn_poller(&mut self) {
        self.stop_poller();
        let (mut producer, consumer) = rtrb::RingBuffer::new(UPDATE_QUEUE_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let stream_ended = Arc::new(AtomicBool::new(false));
        let sequencer = Arc::clone(&self.sequencer);
        let flag = Arc::clone(&shutdown);
        let ended_flag = Arc::clone(&stream_ended);
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::Acquire) {
                let (tick, ended) = {
                    let mut seq = sequencer.lock();
                    (seq.tick_position(), seq.take_end_of_stream())
                };
                let _ = producer.push(PlaybackUpdate::Cursor(tick));
                if ended {
                    sequencer.lock().stop();
                    // The push is best-effort; the flag must not be.
                    ended_flag.store(true, Ordering::Release);
                    let _ = producer.push(PlaybackUpdate::Finished);
                    break;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        });
        self.shutdown = shutdown;
        self.stream_ended = stream_ended;
        self.poller = Some(handle);
        self.updates = Some(consumer);
    }

    fn stop_poller(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.poller.take() {
            let deadline = Instant::now() + JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(2));
            }
            if handle.is_finished() {
                let _ = handle.join();
            }
            // Past the deadline the thread is detached; the shutdown
            // flag it holds makes it exit on its next wake.
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.close();
    }
}

/// Inert device used when no real sequencer can be opened. Holds a
/// position so seeks still round-trip; never advances, never ends.
#[derive(Debug, Default)]
pub struct NullSequencer {
    tick: Tick,
}

impl SequencerPort for NullSequencer {
    fn open(&mut self) -> Result<(), SequencerError> {
        Ok(())
    }

    fn close(&mut self) {}

    fn set_sequence(
        &mut self,
        _ppqn: u16,
        _events: Vec<SequencedEvent>,
    ) -> Result<(), SequencerError> {
        Ok(())
    }

    fn start(&mut self) {}

    fn stop(&mut self) {}

    fn tick_position(&self) -> Tick {
        self.tick
    }

    fn set_tick_position(&mut self, tick: Tick) {
        self.tick = tick.max(0);
    }

    fn set_loop_points(&mut self, _range: Option<LoopRange>) {}

    fn set_tempo_bpm(&mut self, _bpm: f64) {}

    fn take_end_of_stream(&mut self) -> bool {
        false
    }
}
