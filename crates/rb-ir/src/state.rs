//! Engine state labels shared by all profiles.

use core::fmt;

/// Engine state. Each profile uses a subset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EngineState {
    #[default]
    EngineOff,
    Starting,
    Idle,
    /// A staged rev or blip is sounding
    Gesture,
    LaunchHold,
    /// Short grace period before committing to a throttle range
    PreAccel,
    Accelerating,
    Cruising,
    Decelerating,
    /// Continuous drive (layered profiles)
    Driving,
}

impl EngineState {
    pub fn name(self) -> &'static str {
        match self {
            EngineState::EngineOff => "ENGINE_OFF",
            EngineState::Starting => "STARTING",
            EngineState::Idle => "IDLE",
            EngineState::Gesture => "GESTURE",
            EngineState::LaunchHold => "LAUNCH_HOLD",
            EngineState::PreAccel => "PRE_ACCEL",
            EngineState::Accelerating => "ACCELERATING",
            EngineState::Cruising => "CRUISING",
            EngineState::Decelerating => "DECELERATING",
            EngineState::Driving => "DRIVING",
        }
    }

    /// States in which the gesture detector runs.
    pub fn is_idle_class(self) -> bool {
        matches!(self, EngineState::Idle | EngineState::Gesture)
    }

    /// States driven by a long sequence or continuous drive sound.
    pub fn is_driving(self) -> bool {
        matches!(
            self,
            EngineState::PreAccel
                | EngineState::Accelerating
                | EngineState::Cruising
                | EngineState::Decelerating
                | EngineState::Driving
        )
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
