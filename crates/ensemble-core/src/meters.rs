//! Per-plugin level metering.
//!
//! The processors capture one [`ChannelLevels`] per channel per block into
//! the plugin table's atomic slots: peaks accumulate with a saturating max
//! until the housekeeping pass consumes them for the control surface, RMS
//! holds the last block. The UI polls everything through
//! [`Engine::meter_snapshot`](crate::engine::Engine::meter_snapshot). Torn
//! reads across channels are fine, the values are advisory.

use crate::consts::MAX_PEAKS;

/// Peak and RMS level of one channel over one block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelLevels {
    pub peak: f32,
    pub rms: f32,
}

/// Measure one channel's block in a single pass.
#[inline]
pub fn block_levels(samples: &[f32]) -> ChannelLevels {
    if samples.is_empty() {
        return ChannelLevels::default();
    }

    let mut peak = 0.0f32;
    let mut sum_sq = 0.0f32;
    for &s in samples {
        let mag = s.abs();
        if mag > peak {
            peak = mag;
        }
        sum_sq += s * s;
    }

    ChannelLevels {
        peak,
        rms: (sum_sq / samples.len() as f32).sqrt(),
    }
}

/// A plugin's metering state: accumulated peaks plus last-block RMS,
/// per input and output channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    pub input_peak: [f32; MAX_PEAKS],
    pub output_peak: [f32; MAX_PEAKS],
    pub input_rms: [f32; MAX_PEAKS],
    pub output_rms: [f32; MAX_PEAKS],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_of_constant_signal() {
        let levels = block_levels(&[0.5; 64]);
        assert_eq!(levels.peak, 0.5);
        assert!((levels.rms - 0.5).abs() < 1e-6);
    }

    #[test]
    fn peak_is_magnitude() {
        let levels = block_levels(&[0.1, -0.8, 0.3]);
        assert_eq!(levels.peak, 0.8);
        assert!(levels.rms > 0.0);
    }

    #[test]
    fn empty_block_is_silent() {
        assert_eq!(block_levels(&[]), ChannelLevels::default());
    }
}
