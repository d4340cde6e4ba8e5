use crate::types::{LoopRange, Tick};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencedEventKind {
    NoteOn { pitch: u8, velocity: u8, channel: u8 },
    NoteOff { pitch: u8, channel: u8 },
}

/// One entry of a compiled, timestamped event stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub tick: Tick,
    pub kind: SequencedEventKind,
}

#[derive(thiserror::Error, Debug)]
pub enum SequencerError {
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Timing device the playback controller drives. The device owns wall-clock
/// progression; callers deal only in ticks.
pub trait SequencerPort: Send {
    fn open(&mut self) -> Result<(), SequencerError>;
    fn close(&mut self);

    fn set_sequence(&mut self, ppqn: u16, events: Vec<SequencedEvent>) -> Result<(), SequencerError>;

    fn start(&mut self);
    fn stop(&mut self);

    fn tick_position(&self) -> Tick;
    fn set_tick_position(&mut self, tick: Tick);

    fn set_loop_points(&mut self, range: Option<LoopRange>);
    fn set_tempo_bpm(&mut self, bpm: f64);

    /// End-of-stream notification, pollable: true at most once per stream
    /// end since the previous call.
    fn take_end_of_stream(&mut self) -> bool;
}
