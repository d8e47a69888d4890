//! Passive transport time snapshot.
//!
//! The driver advances this once per block; anyone may read it. No clock
//! synchronization happens here.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::lockfree::AtomicFlag;

/// Shared time-info cell.
#[derive(Debug, Default)]
pub struct TimeInfo {
    playing: AtomicFlag,
    frame: AtomicU64,
    usecs: AtomicU64,
}

/// A point-in-time copy of [`TimeInfo`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeSnapshot {
    pub playing: bool,
    pub frame: u64,
    pub usecs: u64,
}

impl TimeInfo {
    pub fn clear(&self) {
        self.playing.set(false);
        self.frame.store(0, Ordering::Release);
        self.usecs.store(0, Ordering::Release);
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.set(playing);
    }

    /// Advance the frame counter by one block.
    pub fn advance(&self, frames: u64, sample_rate: f64) {
        let frame = self.frame.fetch_add(frames, Ordering::AcqRel) + frames;
        if sample_rate > 0.0 {
            let usecs = (frame as f64 / sample_rate * 1_000_000.0) as u64;
            self.usecs.store(usecs, Ordering::Release);
        }
    }

    pub fn snapshot(&self) -> TimeSnapshot {
        TimeSnapshot {
            playing: self.playing.get(),
            frame: self.frame.load(Ordering::Acquire),
            usecs: self.usecs.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_frames_and_usecs() {
        let time = TimeInfo::default();
        time.set_playing(true);
        time.advance(48_000, 48_000.0);

        let snap = time.snapshot();
        assert!(snap.playing);
        assert_eq!(snap.frame, 48_000);
        assert_eq!(snap.usecs, 1_000_000);

        time.clear();
        assert_eq!(time.snapshot(), TimeSnapshot::default());
    }
}
