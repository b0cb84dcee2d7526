//! Throttle-range drive sounds with a PRE_ACCEL grace period.

use alloc::vec::Vec;

use arrayvec::ArrayVec;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rb_ir::{
    ClipRef, ClipResolver, CommonConfig, EngineState, GestureConfig, GestureInput, IdleConfig,
    RevStage, RpmConfig, SimTime, Smoothing,
};

use crate::engine_core::{EngineCore, Handoff};
use crate::profile::EngineProfile;
use crate::voice_bank::VoiceId;

pub const IDLE: VoiceId = 0;
pub const DRIVE_A: VoiceId = 1;
pub const DRIVE_B: VoiceId = 2;
/// Staged revs and the startup clip
pub const REV: VoiceId = 3;
const VOICES: usize = 4;

const MAX_VARIANTS: usize = 8;

/// Intensity bucket of the smoothed throttle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleRange {
    Idle,
    Light,
    Aggressive,
    Violent,
    Highway,
}

impl ThrottleRange {
    pub fn name(self) -> &'static str {
        match self {
            ThrottleRange::Idle => "idle",
            ThrottleRange::Light => "light",
            ThrottleRange::Aggressive => "aggressive",
            ThrottleRange::Violent => "violent",
            ThrottleRange::Highway => "highway",
        }
    }
}

/// Parameters of a [`RangedProfile`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangedConfig {
    pub common: CommonConfig,
    /// Lower bounds of the ranges
    pub light: f32,
    pub aggressive: f32,
    pub violent: f32,
    pub highway: f32,
    pub pre_accel_delay: f32,
    /// Seconds in ACCELERATING before a finished pull turns into a cruise
    pub cruise_delay: f32,
    /// Plain plays are refused this soon after the previous clip start
    pub overlap_guard: f32,
    /// No drive transition this soon after a rev gesture resolves
    pub rev_exclusion: f32,
    /// Raw at or below this while the smoothed value is above
    /// `lag_smoothed_min` is smoothing lag, not intent
    pub lag_raw_max: f32,
    pub lag_smoothed_min: f32,
    pub crossfade_ms: u32,
    pub light_pulls: &'static [&'static str],
    pub light_cruises: &'static [&'static str],
    pub aggressive_pushes: &'static [&'static str],
    pub violent_pulls: &'static [&'static str],
    pub highway_cruise: &'static str,
    pub seed: u64,
}

impl RangedConfig {
    pub fn range(&self, throttle: f32) -> ThrottleRange {
        if throttle >= self.highway {
            ThrottleRange::Highway
        } else if throttle >= self.violent {
            ThrottleRange::Violent
        } else if throttle >= self.aggressive {
            ThrottleRange::Aggressive
        } else if throttle >= self.light {
            ThrottleRange::Light
        } else {
            ThrottleRange::Idle
        }
    }

    /// Every clip name the profile resolves.
    pub fn clip_names(&self) -> Vec<&'static str> {
        let mut names = Vec::from([self.common.idle_clip, self.common.starter_clip, self.highway_cruise]);
        for pool in [
            self.light_pulls,
            self.light_cruises,
            self.aggressive_pushes,
            self.violent_pulls,
        ] {
            names.extend_from_slice(pool);
        }
        names.extend(self.common.rev_stages.iter().map(|s| s.clip));
        names
    }
}

pub static SUPRA: RangedConfig = RangedConfig {
    common: CommonConfig {
        name: "Supra",
        asset_dir: "supra",
        deadzone: 0.05,
        start_margin: 0.05,
        smoothing: Smoothing::Ema { alpha: 0.3 },
        gesture_input: GestureInput::Raw,
        gesture: GestureConfig {
            window: 0.75,
            lockout: 0.5,
            open_threshold: 0.05,
            prior_max: 0.05,
            fall_ratio: 0.6,
            near_idle: 0.09,
            min_peak: 0.09,
            require_decreasing: true,
        },
        rpm: RpmConfig {
            idle: 900.0,
            redline: 9000.0,
            decay_rate: 1200.0,
            decay_cooldown: 0.1,
            reset_after: 6.0,
        },
        idle: IdleConfig {
            normal: 0.7,
            ducked: 0.2,
            ramp_speed: 2.5,
        },
        idle_clip: "supra_idle_loop",
        starter_clip: "supra_startup",
        rev_stages: &[
            RevStage { clip: "supra_rev_stage1", peak_rpm: 3500.0 },
            RevStage { clip: "supra_rev_stage2", peak_rpm: 5500.0 },
            RevStage { clip: "supra_rev_stage3", peak_rpm: 7500.0 },
            RevStage { clip: "supra_rev_stage4", peak_rpm: 9000.0 },
        ],
        rev_volume: 0.9,
    },
    light: 0.10,
    aggressive: 0.31,
    violent: 0.61,
    highway: 0.90,
    pre_accel_delay: 0.15,
    cruise_delay: 0.75,
    overlap_guard: 0.2,
    rev_exclusion: 0.3,
    lag_raw_max: 0.06,
    lag_smoothed_min: 0.08,
    crossfade_ms: 800,
    light_pulls: &["light_pull_1", "light_pull_2"],
    light_cruises: &["light_cruise_1", "light_cruise_2", "light_cruise_3"],
    aggressive_pushes: &[
        "aggressive_push_1",
        "aggressive_push_2",
        "aggressive_push_3",
        "aggressive_push_4",
        "aggressive_push_5",
        "aggressive_push_6",
    ],
    violent_pulls: &["violent_pull_1", "violent_pull_2", "violent_pull_3"],
    highway_cruise: "highway_cruise_loop",
    seed: 0x5afe_cafe,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DriveKind {
    Pull,
    Cruise,
}

type Variants = ArrayVec<ClipRef, MAX_VARIANTS>;

fn resolve_pool(resolver: &mut dyn ClipResolver, dir: &str, names: &[&str]) -> Variants {
    names
        .iter()
        .take(MAX_VARIANTS)
        .map(|name| resolver.resolve(dir, name))
        .filter(|clip| !clip.is_null())
        .collect()
}

/// Drive sounds picked by throttle range, cruising loops once a pull has
/// run its course, and staged revs from idle.
pub struct RangedProfile {
    core: EngineCore,
    config: &'static RangedConfig,
    light_pulls: Variants,
    light_cruises: Variants,
    aggressive_pushes: Variants,
    violent_pulls: Variants,
    highway_cruise: ClipRef,
    rng: SmallRng,
    current_range: Option<ThrottleRange>,
    /// One-slot memory of a range change seen while a pull was playing
    queued: Option<ThrottleRange>,
    last_clip_start: Option<SimTime>,
}

impl RangedProfile {
    pub fn new(config: &'static RangedConfig, resolver: &mut dyn ClipResolver) -> Self {
        let dir = config.common.asset_dir;
        let core = EngineCore::new(&config.common, resolver, VOICES, IDLE).with_long_pair(
            DRIVE_A,
            DRIVE_B,
            config.crossfade_ms,
        );
        Self {
            core,
            config,
            light_pulls: resolve_pool(resolver, dir, config.light_pulls),
            light_cruises: resolve_pool(resolver, dir, config.light_cruises),
            aggressive_pushes: resolve_pool(resolver, dir, config.aggressive_pushes),
            violent_pulls: resolve_pool(resolver, dir, config.violent_pulls),
            highway_cruise: resolver.resolve(dir, config.highway_cruise),
            rng: SmallRng::seed_from_u64(config.seed),
            current_range: None,
            queued: None,
            last_clip_start: None,
        }
    }

    /// Range of the drive clip currently playing.
    pub fn current_range(&self) -> Option<ThrottleRange> {
        self.current_range
    }

    pub fn queued_range(&self) -> Option<ThrottleRange> {
        self.queued
    }

    fn range(&self) -> ThrottleRange {
        self.config.range(self.core.conditioner.smoothed())
    }

    fn pick(&mut self, range: ThrottleRange, kind: DriveKind) -> ClipRef {
        let pool = match (kind, range) {
            (DriveKind::Cruise, ThrottleRange::Highway) => return self.highway_cruise,
            (DriveKind::Cruise, _) => &self.light_cruises,
            (DriveKind::Pull, ThrottleRange::Light) => &self.light_pulls,
            (DriveKind::Pull, ThrottleRange::Aggressive) => &self.aggressive_pushes,
            (DriveKind::Pull, ThrottleRange::Violent | ThrottleRange::Highway) => &self.violent_pulls,
            (DriveKind::Pull, ThrottleRange::Idle) => return ClipRef::NULL,
        };
        if pool.is_empty() {
            return ClipRef::NULL;
        }
        pool[self.rng.gen_range(0..pool.len())]
    }

    /// Start a drive clip for the current range. Without `crossfade` the
    /// request is refused while the pair is busy or a clip started too
    /// recently.
    fn play_drive(&mut self, kind: DriveKind, crossfade: bool) -> bool {
        let now = self.core.now();
        if !crossfade {
            let recent = self
                .last_clip_start
                .is_some_and(|at| now.secs_since(at) < self.config.overlap_guard);
            if recent || self.core.long_busy() {
                return false;
            }
        }
        let range = self.range();
        let clip = self.pick(range, kind);
        if clip.is_null() {
            return false;
        }
        let looping = kind == DriveKind::Cruise;
        let handoff = if crossfade { Handoff::Crossfade } else { Handoff::Cut };
        self.core.play_long(clip, looping, 0.0, handoff);
        log::debug!("{}: {:?} for {} range", self.config.common.name, kind, range.name());
        self.current_range = Some(range);
        self.last_clip_start = Some(now);
        true
    }

    fn decelerate(&mut self) {
        self.core.enter(EngineState::Decelerating);
        self.queued = None;
        let fade = self.config.crossfade_ms;
        if let Some(pair) = self.core.long.as_ref() {
            for voice in pair.voices() {
                if self.core.bank.get(voice).is_some_and(|v| v.looping) {
                    self.core.bank.stop(voice, fade);
                }
            }
        }
    }

    fn idle_class(&mut self) {
        let cfg = self.config;
        let now = self.core.now();
        if !self.core.bank.is_busy(REV) {
            if self.core.state == EngineState::Gesture {
                self.core.enter(EngineState::Idle);
            }
            self.core.set_idle_target(cfg.common.idle.normal, false);
            self.core.play_idle();
        }

        let allowed = !self.core.long_busy();
        if let Some(gesture) = self.core.observe_gesture(allowed) {
            if self.core.play_rev_stage(REV, gesture.peak).is_some() {
                self.core.set_idle_target(cfg.common.idle.ducked, false);
                self.core.enter(EngineState::Gesture);
            }
        }

        if self.core.gesture.is_open() {
            return;
        }
        if self
            .core
            .gesture
            .secs_since_resolution(now)
            .is_some_and(|secs| secs < cfg.rev_exclusion)
        {
            return;
        }
        if self.range() == ThrottleRange::Idle {
            return;
        }
        let raw = self.core.conditioner.raw();
        if raw <= cfg.lag_raw_max && self.core.conditioner.smoothed() > cfg.lag_smoothed_min {
            return;
        }
        self.core.enter(EngineState::PreAccel);
        // Ramped rather than instant, unlike the M4 launch: a release inside
        // the grace period brings the idle back without a gap.
        self.core.set_idle_target(0.0, false);
    }

    fn pre_accel(&mut self) {
        if self.core.timers.time_in_state < self.config.pre_accel_delay {
            return;
        }
        if self.range() == ThrottleRange::Idle {
            self.core.enter(EngineState::Idle);
            self.core.set_idle_target(self.config.common.idle.normal, false);
            return;
        }
        self.core.enter(EngineState::Accelerating);
        self.play_drive(DriveKind::Pull, false);
    }

    fn accelerating(&mut self) {
        let range = self.range();
        if range == ThrottleRange::Idle {
            self.decelerate();
            return;
        }
        if self.core.long_busy() {
            if Some(range) != self.current_range {
                self.queued = Some(range);
            }
            return;
        }
        if let Some(queued) = self.queued.take() {
            if queued == range {
                self.play_drive(DriveKind::Pull, false);
            }
        } else if self.core.timers.time_in_state >= self.config.cruise_delay {
            self.core.enter(EngineState::Cruising);
            self.play_drive(DriveKind::Cruise, false);
        } else {
            self.play_drive(DriveKind::Pull, false);
        }
    }

    fn cruising(&mut self) {
        let range = self.range();
        if range == ThrottleRange::Idle {
            self.decelerate();
        } else if Some(range) != self.current_range {
            self.core.enter(EngineState::Accelerating);
            self.play_drive(DriveKind::Pull, true);
        } else if !self.core.long_busy() {
            self.play_drive(DriveKind::Cruise, false);
        }
    }

    fn decelerating(&mut self) {
        if self.range() != ThrottleRange::Idle {
            self.core.enter(EngineState::Accelerating);
            self.play_drive(DriveKind::Pull, false);
        } else if !self.core.long_busy() {
            self.current_range = None;
            self.core.return_to_idle();
        }
    }
}

impl EngineProfile for RangedProfile {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }

    fn update(&mut self, now: SimTime, dt: f32) {
        self.core.begin_tick(now, dt);
        let rev_busy = self.core.bank.is_busy(REV);
        self.core.rpm.advance(now, dt, rev_busy);

        match self.core.state {
            EngineState::EngineOff => {
                self.core.try_start(REV);
            }
            EngineState::Starting => {
                self.core.finish_start(REV);
            }
            EngineState::Idle | EngineState::Gesture => self.idle_class(),
            EngineState::PreAccel => self.pre_accel(),
            EngineState::Accelerating => self.accelerating(),
            EngineState::Cruising => self.cruising(),
            EngineState::Decelerating => self.decelerating(),
            _ => {}
        }

        self.core.end_tick(dt);
    }

    fn reset(&mut self) {
        self.core.reset();
        self.current_range = None;
        self.queued = None;
        self.last_clip_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::testing::{bank_for, Driver};

    fn profile() -> (RangedProfile, Driver) {
        let mut clips = bank_for(&SUPRA.clip_names(), 1.0);
        let profile = RangedProfile::new(&SUPRA, &mut clips);
        (profile, Driver::new())
    }

    fn idle(profile: &mut RangedProfile, driver: &mut Driver) {
        driver.hold(profile, 0.3, 1.0 / 60.0);
        driver.hold(profile, 0.0, 1.5);
        assert_eq!(profile.state(), EngineState::Idle);
    }

    #[test]
    fn ranges_by_threshold() {
        assert_eq!(SUPRA.range(0.0), ThrottleRange::Idle);
        assert_eq!(SUPRA.range(0.09), ThrottleRange::Idle);
        assert_eq!(SUPRA.range(0.10), ThrottleRange::Light);
        assert_eq!(SUPRA.range(0.31), ThrottleRange::Aggressive);
        assert_eq!(SUPRA.range(0.61), ThrottleRange::Violent);
        assert_eq!(SUPRA.range(0.95), ThrottleRange::Highway);
    }

    #[test]
    fn sustained_light_throttle_pulls_after_grace() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.hold(&mut p, 0.2, 0.5);
        assert!(p.state().is_idle_class(), "gesture window still open");
        d.hold(&mut p, 0.2, 0.7);
        assert_eq!(p.state(), EngineState::Accelerating);
        assert_eq!(p.current_range(), Some(ThrottleRange::Light));
        assert!(p.core().long_busy());
        assert_eq!(p.core().idle.target(), 0.0);
    }

    #[test]
    fn finished_pull_turns_into_cruise() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.hold(&mut p, 0.2, 2.2);
        assert_eq!(p.state(), EngineState::Cruising);
        let active = p.core().long.as_ref().map(|pair| pair.active()).unwrap();
        assert!(p.voices().get(active).unwrap().looping);
    }

    #[test]
    fn lift_fades_cruise_then_idles() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.hold(&mut p, 0.2, 2.2);
        d.hold(&mut p, 0.0, 0.2);
        assert_eq!(p.state(), EngineState::Decelerating);
        d.hold(&mut p, 0.0, 1.0);
        assert_eq!(p.state(), EngineState::Idle);
        assert!(!p.voices().is_busy(DRIVE_A));
        assert!(!p.voices().is_busy(DRIVE_B));
    }

    #[test]
    fn range_change_during_pull_is_queued() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.hold(&mut p, 0.2, 1.2);
        assert_eq!(p.state(), EngineState::Accelerating);
        d.hold(&mut p, 0.5, 0.5);
        assert_eq!(p.queued_range(), Some(ThrottleRange::Aggressive));
        d.hold(&mut p, 0.5, 0.4);
        assert_eq!(p.current_range(), Some(ThrottleRange::Aggressive));
        assert_eq!(p.queued_range(), None);
    }

    #[test]
    fn blip_revs_without_driving() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.ramp(&mut p, 0.0, 0.32, 0.15);
        d.ramp(&mut p, 0.32, 0.0, 0.15);
        assert!(p.voices().is_busy(REV));
        assert_eq!(p.state(), EngineState::Gesture);
        d.hold(&mut p, 0.0, 0.5);
        assert!(p.state().is_idle_class());
        assert!(!p.core().long_busy());
    }

    #[test]
    fn quick_release_in_pre_accel_returns_to_idle() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.hold(&mut p, 0.2, 0.8);
        assert_eq!(p.state(), EngineState::PreAccel);
        d.hold(&mut p, 0.0, 0.3);
        assert_eq!(p.state(), EngineState::Idle);
    }

    #[test]
    fn pre_accel_ramps_the_idle_down() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        for _ in 0..120 {
            d.step(&mut p, 0.2);
            if p.state() == EngineState::PreAccel {
                break;
            }
        }
        assert_eq!(p.state(), EngineState::PreAccel);
        assert_eq!(p.core().idle.target(), 0.0);
        assert!(p.core().idle.current() > 0.5, "idle dropped to {}", p.core().idle.current());
    }
}
