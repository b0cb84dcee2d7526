//! Headless runtime for revbox.
//!
//! Owns the profiles, clips and hardware collaborators behind a single
//! [`Simulator`] that both binaries drive, either against a live audio
//! device ([`Runtime`]) or offline ([`render_offline`]).

pub mod hardware;
mod runtime;
pub mod script;
mod simulator;
pub mod telemetry;

use std::fmt;

use rb_audio::AudioError;
use rb_formats::FormatError;

pub use hardware::{
    ButtonConfig, ButtonEvent, ButtonSource, Calibration, ConstantThrottle, HardwareError, ModeButton,
    NoButton, ScriptedButton, ScriptedThrottle, ThrottleInput, ThrottleSource, Unavailable,
};
pub use runtime::{render_offline, run, Runtime};
pub use script::{ScriptError, ThrottleScript};
pub use simulator::{build_profiles, load_profiles, Simulator};
pub use telemetry::{LogSink, NullSink, RecordingSink, TelemetrySink};

// Re-export common types so callers don't need the lower crates directly.
pub use rb_engine::{profile_assets, EngineProfile, Frame, PROFILE_NAMES};
pub use rb_formats::{frames_to_wav, write_wav};
pub use rb_ir::{ClipBank, EngineState, SimTime, Snapshot};

/// Runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub tick_rate: u32,
    pub sample_rate: u32,
    pub master_gain: f32,
    pub switch_fade_ms: u32,
    pub shutdown_fade_ms: u32,
    /// Profile names in switch order; the first starts active
    pub rotation: Vec<String>,
    pub calibration: Calibration,
    pub button: ButtonConfig,
    /// Audio ring buffer length
    pub latency_ms: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            sample_rate: 44100,
            master_gain: 0.02,
            switch_fade_ms: rb_engine::SWITCH_FADE_MS,
            shutdown_fade_ms: 300,
            rotation: PROFILE_NAMES.iter().map(|s| s.to_string()).collect(),
            calibration: Calibration::default(),
            button: ButtonConfig::default(),
            latency_ms: 50,
        }
    }
}

impl SimConfig {
    /// Rotate so `name` comes first. Returns false if it is not in the rotation.
    pub fn start_with(&mut self, name: &str) -> bool {
        match self.rotation.iter().position(|n| n.eq_ignore_ascii_case(name)) {
            Some(index) => {
                self.rotation.rotate_left(index);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug)]
pub enum SimError {
    /// The rotation is empty
    NoProfiles,
    UnknownProfile(String),
    Format(FormatError),
    Audio(AudioError),
    Hardware(HardwareError),
    Script(ScriptError),
    Io(std::io::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::NoProfiles => write!(f, "no profiles configured"),
            SimError::UnknownProfile(name) => {
                write!(f, "unknown profile '{}' (expected one of {})", name, PROFILE_NAMES.join(", "))
            }
            SimError::Format(e) => write!(f, "asset error: {}", e),
            SimError::Audio(e) => write!(f, "audio error: {}", e),
            SimError::Hardware(e) => write!(f, "hardware error: {}", e),
            SimError::Script(e) => write!(f, "script error: {}", e),
            SimError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Format(e) => Some(e),
            SimError::Audio(e) => Some(e),
            SimError::Hardware(e) => Some(e),
            SimError::Script(e) => Some(e),
            SimError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FormatError> for SimError {
    fn from(e: FormatError) -> Self {
        SimError::Format(e)
    }
}

impl From<AudioError> for SimError {
    fn from(e: AudioError) -> Self {
        SimError::Audio(e)
    }
}

impl From<HardwareError> for SimError {
    fn from(e: HardwareError) -> Self {
        SimError::Hardware(e)
    }
}

impl From<ScriptError> for SimError {
    fn from(e: ScriptError) -> Self {
        SimError::Script(e)
    }
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e)
    }
}
