//! Shared transport clock values.

use crate::{Error, Result};

/// Frame count type used by the server.
pub type Frames = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    Stopped,
    Rolling,
    Looping,
    Starting,
    /// Not connected, or a state this crate does not know about.
    #[default]
    Unknown,
}

/// Musical position (bar, beat, tick) as carried in the server's position record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbt {
    /// Current bar, starting at 1.
    pub bar: u32,
    /// Current beat within the bar, starting at 1.
    pub beat: u32,
    /// Current tick within the beat, starting at 0.
    pub tick: u32,
    pub bar_start_tick: f64,
    /// Time signature numerator.
    pub beats_per_bar: f32,
    /// Time signature denominator.
    pub beat_type: f32,
    pub ticks_per_beat: f64,
    pub beats_per_minute: f64,
}

impl Default for Bbt {
    fn default() -> Self {
        Self {
            bar: 1,
            beat: 1,
            tick: 0,
            bar_start_tick: 0.0,
            beats_per_bar: 4.0,
            beat_type: 4.0,
            ticks_per_beat: 1920.0,
            beats_per_minute: 120.0,
        }
    }
}

impl Bbt {
    pub fn new(bar: u32, beat: u32, tick: u32) -> Self {
        Self {
            bar,
            beat,
            tick,
            ..Default::default()
        }
    }

    pub fn with_signature(mut self, beats_per_bar: f32, beat_type: f32) -> Self {
        self.beats_per_bar = beats_per_bar;
        self.beat_type = beat_type;
        self
    }

    pub fn with_tempo(mut self, beats_per_minute: f64) -> Self {
        self.beats_per_minute = beats_per_minute;
        self
    }

    /// Reject positions the server would refuse.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidBbt(msg));
        if self.bar < 1 {
            return invalid(format!("bar {} must be >= 1", self.bar));
        }
        if self.beats_per_bar <= 0.0 || self.beat_type <= 0.0 {
            return invalid(format!(
                "time signature {}/{} must be positive",
                self.beats_per_bar, self.beat_type
            ));
        }
        if self.beat < 1 || self.beat as f32 > self.beats_per_bar {
            return invalid(format!(
                "beat {} out of range 1..={}",
                self.beat, self.beats_per_bar
            ));
        }
        if self.ticks_per_beat <= 0.0 || self.tick as f64 >= self.ticks_per_beat {
            return invalid(format!(
                "tick {} out of range 0..{}",
                self.tick, self.ticks_per_beat
            ));
        }
        if self.beats_per_minute <= 0.0 {
            return invalid(format!("tempo {} must be positive", self.beats_per_minute));
        }
        Ok(())
    }
}

/// Snapshot of the shared transport clock.
///
/// `state`, `frame_rate` and `usecs` are filled in by queries and ignored by
/// reposition requests.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportPosition {
    pub state: TransportState,
    pub frame: Frames,
    pub frame_rate: Option<u32>,
    /// Server clock time of the snapshot, in microseconds.
    pub usecs: Option<u64>,
    pub bbt: Option<Bbt>,
}

impl TransportPosition {
    pub fn at_frame(frame: Frames) -> Self {
        Self {
            frame,
            ..Default::default()
        }
    }

    pub fn with_bbt(mut self, bbt: Bbt) -> Self {
        self.bbt = Some(bbt);
        self
    }

    /// Position in seconds, when the frame rate is known.
    pub fn seconds(&self) -> Option<f64> {
        self.frame_rate
            .filter(|&rate| rate > 0)
            .map(|rate| self.frame as f64 / rate as f64)
    }
}
