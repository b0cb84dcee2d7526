//! Read-only telemetry published once per tick.

use arrayvec::ArrayVec;

use crate::{ClipKey, EngineState, SimTime};

/// Upper bound on logical voices per profile.
pub const MAX_VOICES: usize = 12;

/// Playback status of one voice.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VoiceStatus {
    pub busy: bool,
    pub clip: Option<ClipKey>,
    pub volume: f32,
}

/// State of the active profile after a tick.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub time: SimTime,
    pub profile: &'static str,
    pub state: EngineState,
    pub time_in_state: f32,
    pub raw_throttle: f32,
    pub smoothed_throttle: f32,
    pub rpm: f32,
    pub gear: Option<u8>,
    pub idle_volume: f32,
    pub idle_target: f32,
    pub gesture_open: bool,
    pub gesture_peak: f32,
    /// Seconds until another gesture may be recognized
    pub lockout_remaining: f32,
    pub switching: bool,
    pub shutting_down: bool,
    pub voices: ArrayVec<VoiceStatus, MAX_VOICES>,
}

impl Snapshot {
    pub fn busy_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.busy).count()
    }
}
