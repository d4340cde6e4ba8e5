use ostinato_ports::types::{Note, Tick, MAX_PITCH};

pub const KEY_WIDTH: i32 = 70;
pub const RULER_HEIGHT: i32 = 30;
pub const RESIZE_HANDLE_PX: i32 = 5;

const PITCH_ROWS: i32 = MAX_PITCH as i32 + 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn from_corners(a: PixelPoint, b: PixelPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Geometric overlap, not containment: touching at an edge only does
    /// not count.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// The three input regions pointer events land in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    Keys,
    Ruler,
    Grid,
    Outside,
}

/// Tick/pitch <-> pixel mapping plus grid snapping. Pure; owns no score
/// state beyond the timing parameters it maps with.
#[derive(Clone, Debug)]
pub struct ViewMap {
    pixels_per_tick: f64,
    note_height: i32,
    ppqn: u16,
    beat_unit: u16,
}

impl ViewMap {
    pub fn new(ppqn: u16) -> Self {
        Self {
            pixels_per_tick: 0.05,
            note_height: 12,
            ppqn: ppqn.max(1),
            beat_unit: 4,
        }
    }

    pub fn ppqn(&self) -> u16 {
        self.ppqn
    }

    pub fn set_ppqn(&mut self, ppqn: u16) {
        self.ppqn = ppqn.max(1);
    }

    pub fn pixels_per_tick(&self) -> f64 {
        self.pixels_per_tick
    }

    pub fn note_height(&self) -> i32 {
        self.note_height
    }

    pub fn zoom_in_horizontal(&mut self) {
        self.pixels_per_tick = (self.pixels_per_tick * 1.5).min(2.0);
    }

    pub fn zoom_out_horizontal(&mut self) {
        self.pixels_per_tick = (self.pixels_per_tick / 1.5).max(0.005);
    }

    pub fn zoom_in_vertical(&mut self) {
        self.note_height = (self.note_height + 2).min(30);
    }

    pub fn zoom_out_vertical(&mut self) {
        self.note_height = (self.note_height - 2).max(6);
    }

    pub fn tick_to_x(&self, tick: Tick) -> i32 {
        KEY_WIDTH + (tick as f64 * self.pixels_per_tick) as i32
    }

    pub fn x_to_tick(&self, x: i32) -> Tick {
        if x < KEY_WIDTH {
            return 0;
        }
        (((x - KEY_WIDTH) as f64) / self.pixels_per_tick).max(0.0) as Tick
    }

    pub fn pitch_to_y(&self, pitch: u8) -> i32 {
        RULER_HEIGHT + (MAX_PITCH - pitch.min(MAX_PITCH)) as i32 * self.note_height
    }

    pub fn y_to_pitch(&self, y: i32) -> Option<u8> {
        if y < RULER_HEIGHT || y >= RULER_HEIGHT + PITCH_ROWS * self.note_height {
            return None;
        }
        Some((MAX_PITCH as i32 - (y - RULER_HEIGHT) / self.note_height) as u8)
    }

    /// Tick reached by shifting the pixel projection of `tick` by `dx`.
    /// Keeps drags continuous regardless of zoom.
    pub fn shift_tick_by_pixels(&self, tick: Tick, dx: i32) -> Tick {
        self.x_to_tick(self.tick_to_x(tick) + dx).max(0)
    }

    pub fn shift_pitch_by_pixels(&self, pitch: u8, dy: i32) -> u8 {
        let shifted = pitch as i32 - dy / self.note_height;
        shifted.clamp(0, MAX_PITCH as i32) as u8
    }

    pub fn note_rect(&self, note: &Note) -> PixelRect {
        let width = (note.duration_ticks as f64 * self.pixels_per_tick) as i32;
        PixelRect {
            x: self.tick_to_x(note.start_tick),
            y: self.pitch_to_y(note.pitch),
            width: width.max(1),
            height: self.note_height.max(1),
        }
    }

    pub fn region(&self, p: PixelPoint) -> Region {
        if p.x < 0 || p.y < 0 {
            return Region::Outside;
        }
        if p.y < RULER_HEIGHT {
            return if p.x >= KEY_WIDTH {
                Region::Ruler
            } else {
                Region::Outside
            };
        }
        if p.y >= RULER_HEIGHT + PITCH_ROWS * self.note_height {
            return Region::Outside;
        }
        if p.x < KEY_WIDTH {
            Region::Keys
        } else {
            Region::Grid
        }
    }

    /// Rounds `tick` to the nearest multiple of the grid unit for
    /// `division` (4 = quarter, 8 = eighth, 16 = sixteenth). Degenerate
    /// parameters leave the tick untouched.
    pub fn snap(&self, tick: Tick, division: u16) -> Tick {
        let unit = self.snap_unit(division);
        if unit <= 0 {
            return tick;
        }
        ((tick as f64 / unit as f64).round() as Tick) * unit
    }

    /// Grid unit in ticks for `division`, or 0 when degenerate.
    pub fn snap_unit(&self, division: u16) -> Tick {
        if division == 0 || self.ppqn == 0 || self.beat_unit == 0 {
            return 0;
        }
        let ticks_per_beat = self.ppqn as Tick * 4 / self.beat_unit as Tick;
        let per_beat_divisions = (division / 4).max(1) as Tick;
        ticks_per_beat / per_beat_divisions
    }
}
