//! Parameter tables shared by every engine profile.
//!
//! Profiles are built from `&'static` instances of these structs; the
//! profile-specific extensions live next to each profile in `rb-engine`.

/// How raw throttle is smoothed before drive-state decisions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Smoothing {
    /// Unweighted mean of the last `window` samples
    Mean { window: usize },
    /// Exponential moving average
    Ema { alpha: f32 },
}

/// Which throttle value feeds the gesture detector and the start trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureInput {
    Smoothed,
    Raw,
}

/// Blip recognition thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureConfig {
    /// Maximum rise-to-fall duration in seconds
    pub window: f32,
    /// Minimum seconds between two recognized gestures
    pub lockout: f32,
    /// Throttle must cross above this to open a window
    pub open_threshold: f32,
    /// ...coming from a sample at or below this
    pub prior_max: f32,
    /// Resolution requires `current < peak * fall_ratio`
    pub fall_ratio: f32,
    /// ...and `current <= near_idle`
    pub near_idle: f32,
    /// Peaks at or below this are discarded as noise
    pub min_peak: f32,
    /// ...and, if set, a falling sample frame-over-frame
    pub require_decreasing: bool,
}

/// Virtual RPM limits and decay behavior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RpmConfig {
    pub idle: f32,
    pub redline: f32,
    /// Linear decay toward idle, RPM per second
    pub decay_rate: f32,
    /// Seconds after the last rev before decay starts
    pub decay_cooldown: f32,
    /// Seconds after the last rev before RPM snaps to idle
    pub reset_after: f32,
}

/// Idle loop volume levels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdleConfig {
    pub normal: f32,
    /// Level while a rev or one-shot plays over the idle
    pub ducked: f32,
    /// Ramp speed in volume units per second
    pub ramp_speed: f32,
}

/// One staged rev clip and the RPM it peaks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RevStage {
    pub clip: &'static str,
    pub peak_rpm: f32,
}

/// Settings every profile carries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommonConfig {
    /// Display name, also used in log lines
    pub name: &'static str,
    /// Asset sub-directory
    pub asset_dir: &'static str,
    pub deadzone: f32,
    /// Start trigger is `deadzone + start_margin`
    pub start_margin: f32,
    pub smoothing: Smoothing,
    pub gesture_input: GestureInput,
    pub gesture: GestureConfig,
    pub rpm: RpmConfig,
    pub idle: IdleConfig,
    pub idle_clip: &'static str,
    pub starter_clip: &'static str,
    /// Ascending by `peak_rpm`; may be empty
    pub rev_stages: &'static [RevStage],
    pub rev_volume: f32,
}

impl CommonConfig {
    pub fn start_threshold(&self) -> f32 {
        self.deadzone + self.start_margin
    }
}

/// Highest gear of the automatic gearbox.
pub const TOP_GEAR: u8 = 5;

/// Automatic transmission parameters for gear-stepped profiles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GearboxConfig {
    /// RPM per second at full throttle before the gear multiplier
    pub accel_base: f32,
    /// Indexed by `gear - 1`
    pub gear_multipliers: [f32; TOP_GEAR as usize],
    /// Decay while coasting in idle, RPM per second
    pub coast_decay: f32,
    /// Decay on a sharp throttle lift while driving, before engine braking
    pub lift_decay: f32,
    /// Extra decay per gear on a lift, indexed by `gear - 1`
    pub engine_braking: [f32; TOP_GEAR as usize],
    /// Downshift RPM threshold, indexed by `gear - 1` (first entry unused)
    pub downshift_rpm: [f32; TOP_GEAR as usize],
    /// Minimum seconds between two shifts
    pub min_shift_interval: f32,
    pub upshift_base: f32,
    pub upshift_per_gear: f32,
    pub rev_match_base: f32,
    pub rev_match_per_gear: f32,
    /// Downshift blips are capped at `redline * rev_match_cap`
    pub rev_match_cap: f32,
}
