use serde::{Deserialize, Serialize};

pub type Tick = i64; // musical time, monotonic in score

pub const DEFAULT_PPQN: u16 = 480;
pub const MAX_PITCH: u8 = 127;
pub const MAX_VELOCITY: u8 = 127;
pub const MAX_CHANNEL: u8 = 15;

/// A single timed note. Value-like: the document owns the authoritative
/// instance, everything else holds handles or snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub start_tick: Tick,
    pub duration_ticks: Tick,
    pub velocity: u8,
    pub channel: u8,
}

impl Note {
    /// Out-of-range fields are clamped, never rejected.
    pub fn new(pitch: u8, start_tick: Tick, duration_ticks: Tick, velocity: u8, channel: u8) -> Self {
        Self {
            pitch: pitch.min(MAX_PITCH),
            start_tick: start_tick.max(0),
            duration_ticks: duration_ticks.max(1),
            velocity: velocity.min(MAX_VELOCITY),
            channel: channel.min(MAX_CHANNEL),
        }
    }

    pub fn end_tick(&self) -> Tick {
        self.start_tick + self.duration_ticks
    }
}

/// Half-open [start_tick, end_tick) window the device repeats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRange {
    pub start_tick: Tick,
    pub end_tick: Tick,
}
