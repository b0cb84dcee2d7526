//! Simulation time.

/// Position on the simulation clock.
///
/// Advanced by each tick's `dt`; every timer in the engine compares
/// `SimTime` values instead of reading a wall clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime {
    /// Microseconds since the simulation started
    pub micros: u64,
}

impl SimTime {
    pub const ZERO: SimTime = SimTime { micros: 0 };

    pub const fn from_micros(micros: u64) -> Self {
        Self { micros }
    }

    pub const fn from_millis(ms: u64) -> Self {
        Self { micros: ms * 1000 }
    }

    /// Negative and non-finite inputs map to zero.
    pub fn from_secs(secs: f32) -> Self {
        Self {
            micros: secs_to_micros(secs),
        }
    }

    pub fn as_secs(self) -> f64 {
        self.micros as f64 / 1_000_000.0
    }

    /// Later by `secs` seconds.
    pub fn add_secs(self, secs: f32) -> Self {
        Self {
            micros: self.micros.saturating_add(secs_to_micros(secs)),
        }
    }

    pub const fn add_millis(self, ms: u32) -> Self {
        Self {
            micros: self.micros.saturating_add(ms as u64 * 1000),
        }
    }

    /// Seconds elapsed since `earlier`, or 0.0 if `earlier` is in the future.
    pub fn secs_since(self, earlier: SimTime) -> f32 {
        self.micros.saturating_sub(earlier.micros) as f32 / 1_000_000.0
    }

    /// Convert to a frame position at the given sample rate.
    pub fn to_frames(self, sample_rate: u32) -> u64 {
        (self.micros as u128 * sample_rate as u128 / 1_000_000) as u64
    }
}

fn secs_to_micros(secs: f32) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        libm::round(secs as f64 * 1_000_000.0) as u64
    } else {
        0
    }
}
