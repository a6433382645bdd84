//! Transport clock of the loopback server.

use ponte_core::{Bbt, Frames, TransportPosition, TransportState};

#[derive(Debug, Clone)]
pub(crate) struct TransportClock {
    state: TransportState,
    frame: Frames,
    /// Musical position and the frame it was set at.
    bbt: Option<(Bbt, Frames)>,
}

impl Default for TransportClock {
    fn default() -> Self {
        Self {
            state: TransportState::Stopped,
            frame: 0,
            bbt: None,
        }
    }
}

impl TransportClock {
    pub(crate) fn state(&self) -> TransportState {
        self.state
    }

    pub(crate) fn frame(&self) -> Frames {
        self.frame
    }

    pub(crate) fn start(&mut self) {
        if self.state == TransportState::Stopped {
            self.state = TransportState::Starting;
        }
    }

    pub(crate) fn stop(&mut self) {
        self.state = TransportState::Stopped;
    }

    pub(crate) fn reposition(&mut self, position: &TransportPosition) {
        self.frame = position.frame;
        self.bbt = position.bbt.map(|bbt| (bbt, position.frame));
    }

    /// Called at the start of a process cycle.
    pub(crate) fn begin_cycle(&mut self) {
        if self.state == TransportState::Starting {
            self.state = TransportState::Rolling;
        }
    }

    /// Called once a process cycle of `frames` has run.
    pub(crate) fn end_cycle(&mut self, frames: Frames) {
        if self.state == TransportState::Rolling {
            self.frame = self.frame.wrapping_add(frames);
        }
    }

    pub(crate) fn position(&self, sample_rate: u32, usecs: u64) -> TransportPosition {
        TransportPosition {
            state: self.state,
            frame: self.frame,
            frame_rate: Some(sample_rate),
            usecs: Some(usecs),
            bbt: self
                .bbt
                .map(|(bbt, anchor)| advance(bbt, self.frame.wrapping_sub(anchor), sample_rate)),
        }
    }
}

/// Musical position `frames` after `start` at the tempo and signature of `start`.
fn advance(start: Bbt, frames: Frames, sample_rate: u32) -> Bbt {
    if frames == 0 || sample_rate == 0 {
        return start;
    }
    let ticks_per_bar = start.beats_per_bar as f64 * start.ticks_per_beat;
    if ticks_per_bar <= 0.0 {
        return start;
    }
    let elapsed = frames as f64 / sample_rate as f64 * start.beats_per_minute / 60.0
        * start.ticks_per_beat;
    let total = start.bar.saturating_sub(1) as f64 * ticks_per_bar
        + start.beat.saturating_sub(1) as f64 * start.ticks_per_beat
        + start.tick as f64
        + elapsed;

    let bar = (total / ticks_per_bar).floor();
    let in_bar = total - bar * ticks_per_bar;
    let beat = (in_bar / start.ticks_per_beat).floor();
    let tick = (in_bar - beat * start.ticks_per_beat).floor();

    Bbt {
        bar: (bar as u32).saturating_add(1),
        beat: (beat as u32).saturating_add(1),
        tick: tick as u32,
        bar_start_tick: bar * ticks_per_bar,
        ..start
    }
}
