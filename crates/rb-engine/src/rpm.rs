//! Virtual RPM with decay, rev peaks and an optional automatic gearbox.

use rb_ir::{GearboxConfig, RpmConfig, SimTime, TOP_GEAR};

/// Why a downshift was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Downshift {
    /// Sharp lift while RPM is falling through the threshold
    Immediate,
    /// RPM under the threshold at light throttle
    Natural,
    /// Coming to a stop
    Stopping,
    /// Throttle nearly closed for a while
    Sustained,
}

/// A gear change decided by [`RpmModel::evaluate_shift`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down(Downshift),
}

/// Virtual engine speed.
///
/// `idle <= current <= redline` holds after every mutating call.
#[derive(Clone, Debug)]
pub struct RpmModel {
    config: RpmConfig,
    current: f32,
    gear: Option<u8>,
    last_rev_finish: SimTime,
    last_shift: Option<SimTime>,
}

impl RpmModel {
    pub fn new(config: RpmConfig) -> Self {
        Self {
            config,
            current: config.idle,
            gear: None,
            last_rev_finish: SimTime::ZERO,
            last_shift: None,
        }
    }

    /// Model with a gearbox starting in first gear.
    pub fn with_gearbox(config: RpmConfig) -> Self {
        Self {
            gear: Some(1),
            ..Self::new(config)
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn idle(&self) -> f32 {
        self.config.idle
    }

    pub fn redline(&self) -> f32 {
        self.config.redline
    }

    pub fn gear(&self) -> Option<u8> {
        self.gear
    }

    pub fn last_rev_finish(&self) -> SimTime {
        self.last_rev_finish
    }

    /// Position between idle and redline in [0, 1].
    pub fn factor(&self) -> f32 {
        let span = self.config.redline - self.config.idle;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.current - self.config.idle) / span).clamp(0.0, 1.0)
    }

    /// Decay toward idle while nothing rev-related is sounding.
    pub fn advance(&mut self, now: SimTime, dt: f32, sounding: bool) {
        if sounding {
            return;
        }
        let since = now.secs_since(self.last_rev_finish);
        if since > self.config.reset_after {
            self.current = self.config.idle;
        } else if since > self.config.decay_cooldown && self.current > self.config.idle {
            self.set(self.current - self.config.decay_rate * dt);
        }
    }

    /// A staged rev jumps straight to its peak; it finishes `duration` from now.
    pub fn apply_rev(&mut self, now: SimTime, peak: f32, duration: f32) {
        self.set(peak);
        self.last_rev_finish = now.add_secs(duration);
    }

    /// Back to idle, restarting the decay timers.
    pub fn settle(&mut self, now: SimTime) {
        self.current = self.config.idle;
        self.last_rev_finish = now;
    }

    /// Full reset, including gear and shift timer.
    pub fn reset(&mut self) {
        self.current = self.config.idle;
        self.last_rev_finish = SimTime::ZERO;
        self.last_shift = None;
        if self.gear.is_some() {
            self.gear = Some(1);
        }
    }

    /// Set RPM, clamped into [idle, redline].
    pub fn set(&mut self, rpm: f32) {
        self.current = if rpm.is_finite() {
            rpm.clamp(self.config.idle, self.config.redline)
        } else {
            self.config.idle
        };
    }

    /// Climb under throttle, scaled by the current gear.
    pub fn integrate(&mut self, dt: f32, throttle: f32, gearbox: &GearboxConfig) {
        let mult = self.gear_multiplier(gearbox);
        self.set(self.current + gearbox.accel_base * throttle * mult * dt);
    }

    /// Sharp lift while driving: lift decay plus the gear's engine braking.
    pub fn brake(&mut self, dt: f32, gearbox: &GearboxConfig) {
        let gear = self.gear.unwrap_or(1).clamp(1, TOP_GEAR);
        let rate = gearbox.lift_decay + gearbox.engine_braking[(gear - 1) as usize];
        self.set(self.current - rate * dt);
    }

    /// Linear fall at `rate` RPM per second.
    pub fn coast(&mut self, dt: f32, rate: f32) {
        self.set(self.current - rate * dt);
        if self.current <= self.config.idle && self.gear.is_some() {
            self.gear = Some(1);
        }
    }

    /// Whether enough time passed since the last shift.
    pub fn can_shift(&self, now: SimTime, gearbox: &GearboxConfig) -> bool {
        match self.last_shift {
            Some(at) => now.secs_since(at) >= gearbox.min_shift_interval,
            None => true,
        }
    }

    /// Decide on a gear change. `load` is the per-tick throttle delta.
    pub fn evaluate_shift(
        &self,
        now: SimTime,
        throttle: f32,
        load: f32,
        gearbox: &GearboxConfig,
    ) -> Option<Shift> {
        let gear = self.gear?;
        if !self.can_shift(now, gearbox) {
            return None;
        }
        if gear < TOP_GEAR && self.current >= self.config.redline {
            return Some(Shift::Up);
        }
        if gear <= 1 {
            return None;
        }

        let threshold = gearbox.downshift_rpm[(gear - 1) as usize];
        let rpm = self.current;
        let kind = if load < -0.15 && rpm < threshold * 1.4 {
            Downshift::Immediate
        } else if rpm < threshold && throttle < 0.4 {
            Downshift::Natural
        } else if rpm < 1400.0 && throttle < 0.15 {
            Downshift::Stopping
        } else if throttle < 0.1 && rpm < threshold * 1.3 {
            Downshift::Sustained
        } else {
            return None;
        };
        Some(Shift::Down(kind))
    }

    /// Move the gearbox and set the post-shift RPM.
    pub fn apply_shift(&mut self, now: SimTime, shift: Shift, gearbox: &GearboxConfig) {
        let Some(gear) = self.gear else {
            return;
        };
        match shift {
            Shift::Up => {
                let next = (gear + 1).min(TOP_GEAR);
                self.gear = Some(next);
                self.set(gearbox.upshift_base + next as f32 * gearbox.upshift_per_gear);
            }
            Shift::Down(_) => {
                let next = gear.saturating_sub(1).max(1);
                self.gear = Some(next);
                let blip = self.current + gearbox.rev_match_base + next as f32 * gearbox.rev_match_per_gear;
                self.set(blip.min(self.config.redline * gearbox.rev_match_cap));
            }
        }
        self.last_shift = Some(now);
    }

    fn gear_multiplier(&self, gearbox: &GearboxConfig) -> f32 {
        let gear = self.gear.unwrap_or(1).clamp(1, TOP_GEAR);
        gearbox.gear_multipliers[(gear - 1) as usize]
    }
}
