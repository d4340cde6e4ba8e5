use midly::num::{u15, u24, u28, u4, u7};
use midly::{
    Format, Fps, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
};
use ostinato_ports::codec::{CodecError, ScoreCodecPort, ScoreData};
use ostinato_ports::types::{Note, Tick};
use std::collections::{HashMap, VecDeque};
use std::path::Path;

/// Tiny or empty files still yield a usable document span, in quarters.
const MIN_SPAN_QUARTERS: Tick = 16;
const EMPTY_SPAN_QUARTERS: Tick = 32;

const DEFAULT_US_PER_QUARTER: u32 = 500_000;

/// Standard MIDI file codec. All tracks are merged on import; export
/// writes one single-track file with the tempo meta at tick 0.
#[derive(Debug, Default)]
pub struct MidiFileCodec;

impl ScoreCodecPort for MidiFileCodec {
    fn load_path(&self, path: &Path) -> Result<ScoreData, CodecError> {
        let data = std::fs::read(path).map_err(|e| CodecError::Io(e.to_string()))?;
        self.load_bytes(&data)
    }

    fn load_bytes(&self, data: &[u8]) -> Result<ScoreData, CodecError> {
        let smf = Smf::parse(data).map_err(|e| CodecError::Malformed(e.to_string()))?;
        let (ppqn, tempo_override) = match smf.header.timing {
            Timing::Metrical(ticks) => (ticks.as_int().max(1), None),
            Timing::Timecode(fps, ticks_per_frame) => {
                let (ppqn, us_per_quarter) = timecode_ppqn_and_tempo(fps, ticks_per_frame);
                (ppqn, Some(us_per_quarter))
            }
        };

        let mut notes: Vec<Note> = Vec::new();
        // FIFO per (channel, pitch): the earliest unmatched on closes first,
        // which keeps overlapping repeats of one pitch stable.
        let mut pending: HashMap<(u8, u8), VecDeque<(Tick, u8)>> = HashMap::new();
        let mut first_tempo: Option<u32> = None;

        for track in &smf.tracks {
            let mut tick: Tick = 0;
            for event in track {
                tick += event.delta.as_int() as Tick;
                match &event.kind {
                    TrackEventKind::Midi { channel, message } => {
                        let channel = channel.as_int();
                        match message {
                            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                                pending
                                    .entry((channel, key.as_int()))
                                    .or_default()
                                    .push_back((tick, vel.as_int()));
                            }
                            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                                close_note(&mut pending, &mut notes, channel, key.as_int(), tick);
                            }
                            _ => {}
                        }
                    }
                    TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                        // Only the first tempo is honored; the document
                        // carries a single scalar tempo.
                        if first_tempo.is_none() {
                            first_tempo = Some(us_per_quarter.as_int());
                        }
                    }
                    _ => {}
                }
            }
            // Ons a malformed track never closed end one quarter past its
            // last event.
            let orphan_end = tick + ppqn as Tick;
            for ((channel, pitch), opens) in pending.drain() {
                for (start, velocity) in opens {
                    notes.push(Note::new(
                        pitch,
                        start,
                        (orphan_end - start).max(1),
                        velocity,
                        channel,
                    ));
                }
            }
        }

        let us_per_quarter = tempo_override
            .or(first_tempo)
            .unwrap_or(DEFAULT_US_PER_QUARTER)
            .max(1);
        let tempo_bpm = 60_000_000.0 / us_per_quarter as f64;

        let span = notes.iter().map(Note::end_tick).max().unwrap_or(0);
        let total_ticks = if span < ppqn as Tick * MIN_SPAN_QUARTERS {
            ppqn as Tick * EMPTY_SPAN_QUARTERS
        } else {
            span
        };
        log::debug!(
            "decoded {} notes, ppqn {ppqn}, {:.1} bpm, span {span}",
            notes.len(),
            tempo_bpm
        );

        Ok(ScoreData {
            notes,
            ppqn,
            total_ticks,
            tempo_bpm,
        })
    }

    fn save_path(
        &self,
        path: &Path,
        notes: &[Note],
        ppqn: u16,
        tempo_bpm: f64,
    ) -> Result<(), CodecError> {
        let data = self.encode_bytes(notes, ppqn, tempo_bpm)?;
        std::fs::write(path, data).map_err(|e| CodecError::Io(e.to_string()))
    }

    fn encode_bytes(
        &self,
        notes: &[Note],
        ppqn: u16,
        tempo_bpm: f64,
    ) -> Result<Vec<u8>, CodecError> {
        let mut events = Vec::with_capacity(notes.len() * 2 + 1);
        events.push(TimedKind {
            tick: 0,
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(us_per_quarter(tempo_bpm)))),
        });

        for note in notes {
            let channel = u4::new(note.channel.min(15));
            events.push(TimedKind {
                tick: note.start_tick.max(0),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn {
                        key: u7::new(note.pitch.min(127)),
                        // A velocity-0 on reads back as an off, so the
                        // file format cannot carry velocity 0; it is
                        // floored to 1 on encode.
                        vel: u7::new(note.velocity.clamp(1, 127)),
                    },
                },
            });
            events.push(TimedKind {
                tick: note.end_tick().max(1),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff {
                        key: u7::new(note.pitch.min(127)),
                        vel: u7::new(64),
                    },
                },
            });
        }

        events.sort_by_key(|e| (e.tick, event_rank(&e.kind), event_pitch(&e.kind)));

        let mut track = Vec::with_capacity(events.len() + 1);
        let mut last_tick: Tick = 0;
        for event in events {
            let delta = (event.tick - last_tick).max(0) as u32;
            last_tick = event.tick;
            track.push(TrackEvent {
                delta: u28::new(delta),
                kind: event.kind,
            });
        }
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });

        let smf = Smf {
            header: Header {
                format: Format::SingleTrack,
                timing: Timing::Metrical(u15::new(ppqn.min(0x7FFF))),
            },
            tracks: vec![track],
        };

        let mut data = Vec::new();
        smf.write(&mut data)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(data)
    }
}

struct TimedKind {
    tick: Tick,
    kind: TrackEventKind<'static>,
}

fn close_note(
    pending: &mut HashMap<(u8, u8), VecDeque<(Tick, u8)>>,
    notes: &mut Vec<Note>,
    channel: u8,
    pitch: u8,
    tick: Tick,
) {
    // Offs with no matching on are dropped.
    if let Some(opens) = pending.get_mut(&(channel, pitch)) {
        if let Some((start, velocity)) = opens.pop_front() {
            notes.push(Note::new(pitch, start, (tick - start).max(1), velocity, channel));
        }
    }
}

/// Offs sort before ons at equal ticks so retriggered pitches release
/// cleanly; tempo meta leads everything.
fn event_rank(kind: &TrackEventKind<'static>) -> u8 {
    match kind {
        TrackEventKind::Meta(MetaMessage::Tempo(_)) => 0,
        TrackEventKind::Meta(_) => 1,
        TrackEventKind::Midi { message, .. } => match message {
            MidiMessage::NoteOff { .. } => 2,
            MidiMessage::NoteOn { .. } => 3,
            _ => 4,
        },
        _ => 5,
    }
}

fn event_pitch(kind: &TrackEventKind<'static>) -> u8 {
    match kind {
        TrackEventKind::Midi { message, .. } => match message {
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => key.as_int(),
            _ => 0,
        },
        _ => 0,
    }
}

fn us_per_quarter(tempo_bpm: f64) -> u32 {
    if !tempo_bpm.is_finite() || tempo_bpm <= 0.0 {
        return DEFAULT_US_PER_QUARTER;
    }
    let us = (60_000_000.0 / tempo_bpm).round();
    (us as u32).clamp(1, 0xFF_FFFF)
}

fn timecode_ppqn_and_tempo(fps: Fps, ticks_per_frame: u8) -> (u16, u32) {
    let ticks_per_frame = ticks_per_frame.max(1) as u16;
    match fps {
        Fps::Fps24 => (24 * ticks_per_frame, 1_000_000),
        Fps::Fps25 => (25 * ticks_per_frame, 1_000_000),
        Fps::Fps30 => (30 * ticks_per_frame, 1_000_000),
        Fps::Fps29 => (30 * ticks_per_frame, 1_001_000),
    }
}
