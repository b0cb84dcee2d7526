//! Linear volume ramp used for idle ducking and layer inertia.

/// Target changes smaller than this do not restart the ramp.
pub const RAMP_EPSILON: f32 = 0.01;

/// Runtime state for a volume that chases a target.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeRamp {
    current: f32,
    target: f32,
    /// Volume units per second.
    speed: f32,
    ramping: bool,
    /// Number of times a new target was accepted.
    restarts: u32,
}

impl VolumeRamp {
    /// A ramp resting at `level`.
    pub fn new(level: f32, speed: f32) -> Self {
        let level = level.clamp(0.0, 1.0);
        Self {
            current: level,
            target: level,
            speed: speed.max(0.0),
            ramping: false,
            restarts: 0,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_ramping(&self) -> bool {
        self.ramping
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Aim for `volume`. With `instant` the current value jumps there.
    ///
    /// Returns false when the request was a no-op (same target, not instant).
    pub fn set_target(&mut self, volume: f32, instant: bool) -> bool {
        let volume = volume.clamp(0.0, 1.0);
        if !instant && (volume - self.target).abs() <= RAMP_EPSILON {
            return false;
        }
        self.target = volume;
        self.restarts = self.restarts.wrapping_add(1);
        if instant {
            self.current = volume;
            self.ramping = false;
        } else {
            self.ramping = (self.current - volume).abs() > RAMP_EPSILON;
        }
        true
    }

    /// Jump the current value to the target.
    pub fn snap(&mut self) {
        self.current = self.target;
        self.ramping = false;
    }

    /// Move toward the target by `speed * dt`.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if !self.ramping {
            return self.current;
        }
        let diff = self.target - self.current;
        let step = self.speed * dt.max(0.0);
        if diff.abs() > step {
            self.current += step.copysign(diff);
        }
        if diff.abs() <= step || (self.target - self.current).abs() <= RAMP_EPSILON {
            self.current = self.target;
            self.ramping = false;
        }
        self.current
    }
}
