//! Throttle samples as delivered by the hardware collaborator.

use crate::SimTime;

/// One calibrated throttle reading.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ThrottleSample {
    pub time: SimTime,
    /// Normalized position in [0, 1]
    pub raw: f32,
}

impl ThrottleSample {
    /// Build a sample, clamping into [0, 1]. Non-finite reads as closed throttle.
    pub fn new(time: SimTime, raw: f32) -> Self {
        Self {
            time,
            raw: clamp_unit(raw),
        }
    }
}

/// Clamp into [0, 1], mapping non-finite values to 0.
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range() {
        assert_eq!(ThrottleSample::new(SimTime::ZERO, 1.7).raw, 1.0);
        assert_eq!(ThrottleSample::new(SimTime::ZERO, -0.2).raw, 0.0);
        assert_eq!(ThrottleSample::new(SimTime::ZERO, f32::NAN).raw, 0.0);
        assert_eq!(ThrottleSample::new(SimTime::ZERO, f32::INFINITY).raw, 0.0);
        assert_eq!(ThrottleSample::new(SimTime::ZERO, f32::NEG_INFINITY).raw, 0.0);
    }
}
