use ostinato_ports::sequencer::{SequencedEvent, SequencerError, SequencerPort};
use ostinato_ports::types::{LoopRange, Tick};
use std::time::Instant;

/// Wall-clock timing device. Advances a tick counter from a monotonic
/// anchor instead of delivering events anywhere; hosts that route sound
/// provide their own device. Position math:
/// `tick = base + elapsed_us * ppqn * bpm / 60e6`.
#[derive(Debug)]
pub struct ClockSequencer {
    ppqn: u16,
    tempo_bpm: f64,
    open: bool,
    running: bool,
    base_tick: Tick,
    anchor: Instant,
    stream_end: Tick,
    loop_range: Option<LoopRange>,
    ended: bool,
}

impl ClockSequencer {
    pub fn new() -> Self {
        Self {
            ppqn: 480,
            tempo_bpm: 120.0,
            open: false,
            running: false,
            base_tick: 0,
            anchor: Instant::now(),
            stream_end: 0,
            loop_range: None,
            ended: false,
        }
    }

    /// Unwrapped position, before loop folding or end clamping.
    fn raw_tick(&self) -> Tick {
        if !self.running {
            return self.base_tick;
        }
        let elapsed_us = self.anchor.elapsed().as_micros() as f64;
        let ticks_per_us = self.ppqn as f64 * self.tempo_bpm / 60_000_000.0;
        self.base_tick + (elapsed_us * ticks_per_us) as Tick
    }

    /// Freezes the current position into the base so rate changes do not
    /// retroactively rescale elapsed time.
    fn reanchor(&mut self) {
        self.base_tick = self.position();
        self.anchor = Instant::now();
    }

    fn position(&self) -> Tick {
        let raw = self.raw_tick();
        if let Some(range) = self.loop_range {
            let span = range.end_tick - range.start_tick;
            if self.running && span > 0 && raw >= range.end_tick {
                return range.start_tick + (raw - range.start_tick) % span;
            }
            return raw;
        }
        raw.min(self.stream_end.max(self.base_tick))
    }
}

impl Default for ClockSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl SequencerPort for ClockSequencer {
    fn open(&mut self) -> Result<(), SequencerError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.stop();
        self.open = false;
    }

    fn set_sequence(
        &mut self,
        ppqn: u16,
        events: Vec<SequencedEvent>,
    ) -> Result<(), SequencerError> {
        if ppqn == 0 {
            return Err(SequencerError::InvalidSequence("ppqn must be positive".into()));
        }
        if events.windows(2).any(|w| w[0].tick > w[1].tick) {
            return Err(SequencerError::InvalidSequence(
                "events out of tick order".into(),
            ));
        }
        self.reanchor();
        self.ppqn = ppqn;
        self.stream_end = events.last().map(|e| e.tick).unwrap_or(0);
        self.ended = false;
        log::debug!(
            "sequence set: {} events, ppqn {ppqn}, end {}",
            events.len(),
            self.stream_end
        );
        Ok(())
    }

    fn start(&mut self) {
        if !self.open || self.running {
            return;
        }
        self.anchor = Instant::now();
        self.running = true;
        self.ended = false;
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.base_tick = self.position();
        self.running = false;
    }

    fn tick_position(&self) -> Tick {
        self.position()
    }

    fn set_tick_position(&mut self, tick: Tick) {
        self.base_tick = tick.max(0);
        self.anchor = Instant::now();
        self.ended = false;
    }

    fn set_loop_points(&mut self, range: Option<LoopRange>) {
        self.reanchor();
        self.loop_range = range.filter(|r| r.end_tick > r.start_tick);
    }

    fn set_tempo_bpm(&mut self, bpm: f64) {
        if !bpm.is_finite() || bpm <= 0.0 {
            return;
        }
        self.reanchor();
        self.tempo_bpm = bpm;
    }

    fn take_end_of_stream(&mut self) -> bool {
        if self.ended || !self.running || self.loop_range.is_some() {
            return false;
        }
        if self.raw_tick() >= self.stream_end {
            self.running = false;
            self.base_tick = self.stream_end;
            self.ended = true;
            return true;
        }
        false
    }
}
