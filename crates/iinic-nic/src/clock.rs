//! Device tick / microsecond conversions.
//!
//! The radio timer runs at 1.8432 MHz.

use std::time::Instant;

/// Microseconds per device tick.
pub const US_PER_TICK: f64 = 0.54253472;

/// Device ticks per microsecond.
pub const TICKS_PER_US: f64 = 1.8432;

/// Convert device ticks to microseconds.
pub fn ticks_to_us(ticks: u64) -> f64 {
    ticks as f64 * US_PER_TICK
}

/// Convert microseconds to device ticks, rounding up.
pub fn us_to_ticks(us: u64) -> u64 {
    (us as f64 * TICKS_PER_US).ceil() as u64
}

/// Whole microseconds for a tick count reported by the device, rounding up.
pub(crate) fn ticks_to_whole_us(ticks: u64) -> u64 {
    ticks_to_us(ticks).ceil() as u64
}

/// Host-side approximation of the device clock, anchored at the last reset.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    epoch: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Microseconds since the epoch, rounded up.
    pub fn elapsed_us(&self) -> u64 {
        let nanos = self.epoch.elapsed().as_nanos();
        u64::try_from(nanos.div_ceil(1000)).unwrap_or(u64::MAX)
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}
