use ostinato_infra_sequencer_clock::ClockSequencer;
use ostinato_ports::sequencer::{
    SequencedEvent, SequencedEventKind, SequencerError, SequencerPort,
};
use ostinato_ports::types::LoopRange;
use pretty_assertions::assert_eq;
use std::time::Duration;

fn events_ending_at(tick: i64) -> Vec<SequencedEvent> {
    vec![
        SequencedEvent {
            tick: 0,
            kind: SequencedEventKind::NoteOn {
                pitch: 60,
                velocity: 100,
                channel: 0,
            },
        },
        SequencedEvent {
            tick,
            kind: SequencedEventKind::NoteOff {
                pitch: 60,
                channel: 0,
            },
        },
    ]
}

// Timing assertions are deliberately loose; CI schedulers jitter.

#[test]
fn advances_at_roughly_ppqn_times_bpm() {
    let mut seq = ClockSequencer::new();
    seq.open().unwrap();
    seq.set_sequence(480, events_ending_at(96_000)).unwrap();
    seq.set_tempo_bpm(120.0); // 960 ticks per second

    seq.start();
    std::thread::sleep(Duration::from_millis(100));
    let tick = seq.tick_position();
    assert!((40..=400).contains(&tick), "tick {tick}");

    seq.stop();
    let frozen = seq.tick_position();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(seq.tick_position(), frozen);
}

#[test]
fn loop_folds_the_position_back_into_range() {
    let mut seq = ClockSequencer::new();
    seq.open().unwrap();
    seq.set_sequence(480, events_ending_at(96_000)).unwrap();
    seq.set_tempo_bpm(120.0);
    seq.set_loop_points(Some(LoopRange {
        start_tick: 0,
        end_tick: 48,
    }));

    seq.start();
    std::thread::sleep(Duration::from_millis(200)); // ~192 ticks, several wraps
    let tick = seq.tick_position();
    assert!((0..48).contains(&tick), "tick {tick}");
    assert!(!seq.take_end_of_stream()); // looping devices never end
}

#[test]
fn reports_end_of_stream_once_and_clamps() {
    let mut seq = ClockSequencer::new();
    seq.open().unwrap();
    seq.set_sequence(480, events_ending_at(48)).unwrap();
    seq.set_tempo_bpm(120.0);

    seq.start();
    std::thread::sleep(Duration::from_millis(150)); // well past tick 48
    assert!(seq.take_end_of_stream());
    assert_eq!(seq.tick_position(), 48);
    assert!(!seq.take_end_of_stream()); // reported once
}

#[test]
fn seek_reanchors_while_running() {
    let mut seq = ClockSequencer::new();
    seq.open().unwrap();
    seq.set_sequence(480, events_ending_at(96_000)).unwrap();
    seq.set_tempo_bpm(120.0);

    seq.start();
    std::thread::sleep(Duration::from_millis(50));
    seq.set_tick_position(10_000);
    let tick = seq.tick_position();
    assert!((10_000..10_400).contains(&tick), "tick {tick}");
}

#[test]
fn tempo_change_does_not_rescale_elapsed_time() {
    let mut seq = ClockSequencer::new();
    seq.open().unwrap();
    seq.set_sequence(480, events_ending_at(96_000)).unwrap();
    seq.set_tempo_bpm(120.0);

    seq.start();
    std::thread::sleep(Duration::from_millis(100));
    let before = seq.tick_position();
    seq.set_tempo_bpm(240.0); // doubling the rate must not jump the cursor
    let after = seq.tick_position();
    assert!((after - before).abs() < 100, "before {before} after {after}");
}

#[test]
fn malformed_sequences_are_rejected() {
    let mut seq = ClockSequencer::new();
    seq.open().unwrap();

    let err = seq.set_sequence(0, Vec::new()).unwrap_err();
    assert!(matches!(err, SequencerError::InvalidSequence(_)));

    let unsorted = vec![
        SequencedEvent {
            tick: 480,
            kind: SequencedEventKind::NoteOff {
                pitch: 60,
                channel: 0,
            },
        },
        SequencedEvent {
            tick: 0,
            kind: SequencedEventKind::NoteOn {
                pitch: 60,
                velocity: 100,
                channel: 0,
            },
        },
    ];
    let err = seq.set_sequence(480, unsorted).unwrap_err();
    assert!(matches!(err, SequencerError::InvalidSequence(_)));
}
