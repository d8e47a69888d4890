//! Lock-free primitives shared between the audio and control threads.

use atomic_float::{AtomicF32, AtomicF64};
use std::sync::atomic::{AtomicBool, Ordering};

/// Cache-line aligned atomic f32.
///
/// Used for per-slot peak values and plugin parameters read by the UI while
/// the audio thread writes them.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat {
    value: AtomicF32,
}

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicF32::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: f32) -> f32 {
        self.value.swap(value, Ordering::AcqRel)
    }

    /// Keep the stored value if it is already larger.
    /// Peak meters accumulate with this until a reader consumes the slot.
    #[inline]
    pub fn store_max(&self, value: f32) {
        let mut current = self.value.load(Ordering::Relaxed);
        while value > current {
            match self.value.compare_exchange_weak(
                current,
                value,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for AtomicFloat {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic bool.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Cache-line aligned atomic f64. Holds the sample rate.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicDouble {
    value: AtomicF64,
}

impl AtomicDouble {
    pub fn new(value: f64) -> Self {
        Self {
            value: AtomicF64::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for AtomicDouble {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_float_roundtrip() {
        let val = AtomicFloat::new(0.25);
        assert_eq!(val.get(), 0.25);
        val.set(0.5);
        assert_eq!(val.get(), 0.5);
    }

    #[test]
    fn store_max_keeps_larger() {
        let peak = AtomicFloat::new(0.0);
        peak.store_max(0.7);
        peak.store_max(0.3);
        assert_eq!(peak.get(), 0.7);
        peak.store_max(0.9);
        assert_eq!(peak.get(), 0.9);
    }

    #[test]
    fn swap_consumes_the_accumulated_value() {
        let peak = AtomicFloat::new(0.0);
        peak.store_max(0.6);
        assert_eq!(peak.swap(0.0), 0.6);
        assert_eq!(peak.get(), 0.0);
    }

    #[test]
    fn atomic_flag_roundtrip() {
        let flag = AtomicFlag::new(false);
        assert!(!flag.get());
        flag.set(true);
        assert!(flag.get());
    }
}
