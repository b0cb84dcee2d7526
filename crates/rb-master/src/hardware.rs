//! Throttle and mode-button collaborators.
//!
//! Sources report raw device readings and may fail; the wrappers here turn
//! failures into safe defaults so nothing propagates into the tick.

use std::fmt;

use rb_ir::SimTime;

use crate::script::ThrottleScript;

#[derive(Debug, Clone, PartialEq)]
pub enum HardwareError {
    /// Device not present or not initialized
    Unavailable(String),
    /// A read was attempted and failed
    Read(String),
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareError::Unavailable(what) => write!(f, "{} unavailable", what),
            HardwareError::Read(msg) => write!(f, "read failed: {}", msg),
        }
    }
}

impl std::error::Error for HardwareError {}

// --- Throttle ---

/// A device producing raw throttle readings.
pub trait ThrottleSource: Send {
    fn read_raw(&mut self, now: SimTime) -> Result<u16, HardwareError>;
}

/// Two-point linear map from device units to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub min: u16,
    pub max: u16,
}

impl Default for Calibration {
    fn default() -> Self {
        Self { min: 15823, max: 65535 }
    }
}

impl Calibration {
    pub fn normalize(&self, raw: u16) -> f32 {
        if self.max <= self.min {
            return 0.0;
        }
        let span = (self.max - self.min) as f32;
        ((raw as f32 - self.min as f32) / span).clamp(0.0, 1.0)
    }

    /// Device reading for a normalized value.
    pub fn to_raw(&self, value: f32) -> u16 {
        let span = self.max.saturating_sub(self.min) as f32;
        (self.min as f32 + value.clamp(0.0, 1.0) * span).round() as u16
    }
}

/// Calibrated throttle that reads 0.0 whenever its source fails.
pub struct ThrottleInput<S> {
    source: S,
    calibration: Calibration,
    failing: bool,
}

impl<S: ThrottleSource> ThrottleInput<S> {
    pub fn new(source: S, calibration: Calibration) -> Self {
        Self {
            source,
            calibration,
            failing: false,
        }
    }

    pub fn read(&mut self, now: SimTime) -> f32 {
        match self.source.read_raw(now) {
            Ok(raw) => {
                if self.failing {
                    log::info!("throttle source recovered");
                    self.failing = false;
                }
                self.calibration.normalize(raw)
            }
            Err(e) => {
                if !self.failing {
                    log::warn!("throttle: {}; reading 0.0", e);
                    self.failing = true;
                }
                0.0
            }
        }
    }

    pub fn is_failing(&self) -> bool {
        self.failing
    }
}

impl<S: ThrottleSource + ?Sized> ThrottleSource for Box<S> {
    fn read_raw(&mut self, now: SimTime) -> Result<u16, HardwareError> {
        (**self).read_raw(now)
    }
}

/// Replays a [`ThrottleScript`] in device units.
pub struct ScriptedThrottle {
    script: ThrottleScript,
    calibration: Calibration,
}

impl ScriptedThrottle {
    pub fn new(script: ThrottleScript, calibration: Calibration) -> Self {
        Self { script, calibration }
    }
}

impl ThrottleSource for ScriptedThrottle {
    fn read_raw(&mut self, now: SimTime) -> Result<u16, HardwareError> {
        let value = self.script.value_at(now.as_secs() as f32);
        Ok(self.calibration.to_raw(value))
    }
}

/// Always the same reading.
pub struct ConstantThrottle(pub u16);

impl ThrottleSource for ConstantThrottle {
    fn read_raw(&mut self, _now: SimTime) -> Result<u16, HardwareError> {
        Ok(self.0)
    }
}

/// A throttle that is not connected.
pub struct Unavailable;

impl ThrottleSource for Unavailable {
    fn read_raw(&mut self, _now: SimTime) -> Result<u16, HardwareError> {
        Err(HardwareError::Unavailable("throttle".into()))
    }
}

// --- Mode button ---

pub trait ButtonSource: Send {
    fn is_pressed(&mut self, now: SimTime) -> Result<bool, HardwareError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonConfig {
    /// Seconds a level must hold before it counts
    pub debounce: f32,
    /// Presses at least this long are long presses
    pub long_press: f32,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            debounce: 0.1,
            long_press: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Switch profile
    Short,
    /// Shut down
    Long,
}

/// Debounced button emitting an event on release.
pub struct ModeButton<S> {
    source: S,
    config: ButtonConfig,
    stable: bool,
    candidate: bool,
    candidate_since: SimTime,
    pressed_at: SimTime,
    failing: bool,
}

impl<S: ButtonSource> ModeButton<S> {
    pub fn new(source: S, config: ButtonConfig) -> Self {
        Self {
            source,
            config,
            stable: false,
            candidate: false,
            candidate_since: SimTime::ZERO,
            pressed_at: SimTime::ZERO,
            failing: false,
        }
    }

    /// Sample the source. A read error counts as "not pressed".
    pub fn poll(&mut self, now: SimTime) -> Option<ButtonEvent> {
        let level = match self.source.is_pressed(now) {
            Ok(level) => {
                self.failing = false;
                level
            }
            Err(e) => {
                if !self.failing {
                    log::warn!("mode button: {}", e);
                    self.failing = true;
                }
                false
            }
        };

        if level != self.candidate {
            self.candidate = level;
            self.candidate_since = now;
        }
        if self.candidate == self.stable || now.secs_since(self.candidate_since) < self.config.debounce {
            return None;
        }

        self.stable = self.candidate;
        if self.stable {
            self.pressed_at = self.candidate_since;
            return None;
        }
        let held = self.candidate_since.secs_since(self.pressed_at);
        if held >= self.config.long_press {
            Some(ButtonEvent::Long)
        } else {
            Some(ButtonEvent::Short)
        }
    }

    pub fn is_down(&self) -> bool {
        self.stable
    }
}

impl<S: ButtonSource + ?Sized> ButtonSource for Box<S> {
    fn is_pressed(&mut self, now: SimTime) -> Result<bool, HardwareError> {
        (**self).is_pressed(now)
    }
}

/// No button fitted.
pub struct NoButton;

impl ButtonSource for NoButton {
    fn is_pressed(&mut self, _now: SimTime) -> Result<bool, HardwareError> {
        Ok(false)
    }
}

/// Pressed during each `(start, hold)` interval, in seconds.
pub struct ScriptedButton {
    presses: Vec<(f32, f32)>,
}

impl ScriptedButton {
    pub fn new(presses: Vec<(f32, f32)>) -> Self {
        Self { presses }
    }
}

impl ButtonSource for ScriptedButton {
    fn is_pressed(&mut self, now: SimTime) -> Result<bool, HardwareError> {
        let t = now.as_secs() as f32;
        Ok(self
            .presses
            .iter()
            .any(|&(start, hold)| t >= start && t < start + hold))
    }
}
