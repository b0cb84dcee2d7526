//! Staged revs, launch control and long acceleration sequences.

use alloc::vec::Vec;

use rb_ir::{
    ClipRef, ClipResolver, CommonConfig, EngineState, GestureConfig, GestureInput, IdleConfig,
    RevStage, RpmConfig, SimTime, Smoothing,
};

use crate::engine_core::{EngineCore, Handoff};
use crate::profile::EngineProfile;
use crate::voice_bank::VoiceId;

pub const IDLE: VoiceId = 0;
/// Starter and launch-control clips
pub const SFX: VoiceId = 1;
pub const REV: VoiceId = 2;
pub const LONG_A: VoiceId = 3;
pub const LONG_B: VoiceId = 4;
const VOICES: usize = 5;

/// Parameters of a [`StagedProfile`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StagedConfig {
    pub common: CommonConfig,
    /// Idle level while launch control holds
    pub launch_idle: f32,
    /// Exclusive smoothed-throttle band that arms launch control
    pub launch_band: (f32, f32),
    pub launch_hold: f32,
    /// Raw throttle that fires the launch
    pub launch_trigger: f32,
    pub launch_stop_fade_ms: u32,
    pub launch_engage_clip: &'static str,
    pub launch_hold_clip: &'static str,
    pub full_throttle: f32,
    pub full_throttle_hold: f32,
    /// Seconds in IDLE before another full-throttle sequence is allowed
    pub accel_reset_idle: f32,
    pub accel_clip: &'static str,
    /// Leading silence skipped at the start of the accel clip
    pub accel_offset: f32,
    pub cruise_clip: &'static str,
    pub decel_clip: &'static str,
    pub cruise_floor: f32,
    pub reengage: f32,
    pub handoff: Handoff,
    pub crossfade_ms: u32,
}

impl StagedConfig {
    /// Every clip name the profile resolves.
    pub fn clip_names(&self) -> Vec<&'static str> {
        let mut names = Vec::from([
            self.common.idle_clip,
            self.common.starter_clip,
            self.launch_engage_clip,
            self.launch_hold_clip,
            self.accel_clip,
            self.cruise_clip,
            self.decel_clip,
        ]);
        names.extend(self.common.rev_stages.iter().map(|s| s.clip));
        names
    }
}

pub static M4: StagedConfig = StagedConfig {
    common: CommonConfig {
        name: "M4",
        asset_dir: "m4",
        deadzone: 0.05,
        start_margin: 0.05,
        smoothing: Smoothing::Mean { window: 5 },
        gesture_input: GestureInput::Smoothed,
        gesture: GestureConfig {
            window: 0.75,
            lockout: 0.3,
            open_threshold: 0.05,
            prior_max: 0.05,
            fall_ratio: 0.7,
            near_idle: 0.075,
            min_peak: 0.07,
            require_decreasing: true,
        },
        rpm: RpmConfig {
            idle: 800.0,
            redline: 8500.0,
            decay_rate: 1500.0,
            decay_cooldown: 0.1,
            reset_after: 6.0,
        },
        idle: IdleConfig {
            normal: 0.7,
            ducked: 0.15,
            ramp_speed: 2.5,
        },
        idle_clip: "engine_idle_loop",
        starter_clip: "engine_starter",
        rev_stages: &[
            RevStage { clip: "engine_rev_stage1", peak_rpm: 3000.0 },
            RevStage { clip: "engine_rev_stage2", peak_rpm: 5000.0 },
            RevStage { clip: "engine_rev_stage3", peak_rpm: 7000.0 },
            RevStage { clip: "engine_rev_stage4", peak_rpm: 8500.0 },
        ],
        rev_volume: 0.9,
    },
    launch_idle: 0.05,
    launch_band: (0.55, 0.85),
    launch_hold: 0.5,
    launch_trigger: 0.98,
    launch_stop_fade_ms: 150,
    launch_engage_clip: "launch_control_engage",
    launch_hold_clip: "launch_control_hold_loop",
    full_throttle: 0.98,
    full_throttle_hold: 1.5,
    accel_reset_idle: 3.0,
    accel_clip: "acceleration_gears_1_to_4",
    accel_offset: 0.5,
    cruise_clip: "engine_cruising_loop",
    decel_clip: "deceleration_downshifts_to_idle",
    cruise_floor: 0.90,
    reengage: 0.85,
    handoff: Handoff::StopThenPlay {
        fade_ms: 100,
        gap_ms: 50,
    },
    crossfade_ms: 500,
};

/// Idle with staged revs, launch control, and a full-throttle sequence of
/// accelerate, cruise and decelerate clips on a crossfade pair.
pub struct StagedProfile {
    core: EngineCore,
    config: &'static StagedConfig,
    accel: ClipRef,
    cruise: ClipRef,
    decel: ClipRef,
    engage: ClipRef,
    hold: ClipRef,
    launch_active: bool,
    accel_recent: bool,
    /// Floor below which a drive sequence decelerates; lowered to the
    /// re-engage level after a re-engagement so the two do not flap.
    drive_floor: f32,
}

impl StagedProfile {
    pub fn new(config: &'static StagedConfig, resolver: &mut dyn ClipResolver) -> Self {
        let dir = config.common.asset_dir;
        let core = EngineCore::new(&config.common, resolver, VOICES, IDLE).with_long_pair(
            LONG_A,
            LONG_B,
            config.crossfade_ms,
        );
        Self {
            core,
            config,
            accel: resolver.resolve(dir, config.accel_clip),
            cruise: resolver.resolve(dir, config.cruise_clip),
            decel: resolver.resolve(dir, config.decel_clip),
            engage: resolver.resolve(dir, config.launch_engage_clip),
            hold: resolver.resolve(dir, config.launch_hold_clip),
            launch_active: false,
            accel_recent: false,
            drive_floor: config.cruise_floor,
        }
    }

    pub fn is_launch_active(&self) -> bool {
        self.launch_active
    }

    fn in_launch_band(&self, throttle: f32) -> bool {
        let (lo, hi) = self.config.launch_band;
        throttle > lo && throttle < hi
    }

    fn idle_class(&mut self, dt: f32) {
        let cfg = self.config;
        let idle = cfg.common.idle;
        let throttle = self.core.conditioner.smoothed();
        let rev_busy = self.core.bank.is_busy(REV);

        if self.core.state == EngineState::Idle {
            if self.core.timers.time_in_state > cfg.accel_reset_idle {
                self.accel_recent = false;
            }
            if !rev_busy && !self.launch_active {
                self.core.set_idle_target(idle.normal, false);
            }
        } else {
            self.core.set_idle_target(idle.ducked, false);
            if !rev_busy {
                self.core.enter(EngineState::Idle);
                self.core.set_idle_target(idle.normal, false);
            }
        }

        if self.in_launch_band(throttle) {
            self.core.timers.time_in_launch_band += dt;
            if self.core.timers.time_in_launch_band >= cfg.launch_hold && !self.launch_active {
                self.engage_launch();
                return;
            }
        } else {
            self.core.timers.time_in_launch_band = 0.0;
        }

        let allowed = !self.core.long_busy() && !self.launch_active;
        if let Some(gesture) = self.core.observe_gesture(allowed) {
            if self.core.play_rev_stage(REV, gesture.peak).is_some() {
                self.core.set_idle_target(idle.ducked, false);
                self.core.enter(EngineState::Gesture);
                self.core.timers.time_at_full_throttle = 0.0;
            }
        }

        if throttle >= cfg.full_throttle {
            self.core.timers.time_at_full_throttle += dt;
            if self.core.timers.time_at_full_throttle >= cfg.full_throttle_hold && !self.accel_recent {
                log::info!("{}: full acceleration", cfg.common.name);
                self.launch(50);
            }
        } else {
            self.core.timers.time_at_full_throttle = 0.0;
        }
    }

    fn engage_launch(&mut self) {
        log::info!("{}: launch control engaged", self.config.common.name);
        let core = &mut self.core;
        core.enter(EngineState::LaunchHold);
        core.gesture.cancel();
        core.bank.stop(REV, 0);
        core.bank.stop(SFX, 0);
        core.bank.play(SFX, self.engage, false, 1.0);
        core.bank.chain(SFX, self.hold, true);
        core.set_idle_target(self.config.launch_idle, true);
        core.timers.time_in_launch_band = 0.0;
        core.timers.time_at_full_throttle = 0.0;
        core.rpm.settle(core.now());
        self.launch_active = true;
    }

    fn stop_launch(&mut self, fade_ms: u32) {
        if self.launch_active {
            self.core.bank.stop(SFX, fade_ms);
        }
        self.launch_active = false;
    }

    /// Cut straight into the acceleration sequence.
    fn launch(&mut self, launch_fade_ms: u32) {
        self.stop_launch(launch_fade_ms);
        let core = &mut self.core;
        core.enter(EngineState::Accelerating);
        core.set_idle_target(0.0, true);
        core.bank.stop(REV, 0);
        core.gesture.cancel();
        core.play_long(self.accel, false, self.config.accel_offset, Handoff::Cut);
        core.timers.time_at_full_throttle = 0.0;
        core.rpm.settle(core.now());
        self.accel_recent = true;
        self.drive_floor = self.config.cruise_floor;
    }

    fn launch_hold(&mut self) {
        let cfg = self.config;
        let raw = self.core.conditioner.raw();
        let throttle = self.core.conditioner.smoothed();
        if raw >= cfg.launch_trigger {
            log::info!("{}: launching", cfg.common.name);
            self.launch(0);
        } else if !self.in_launch_band(throttle) || !self.launch_active {
            log::info!("{}: launch control disengaged", cfg.common.name);
            self.stop_launch(cfg.launch_stop_fade_ms);
            self.core.return_to_idle();
        }
    }

    fn decelerate(&mut self) {
        self.core.enter(EngineState::Decelerating);
        self.core.play_long(self.decel, false, 0.0, self.config.handoff);
    }

    fn drive(&mut self) {
        let cfg = self.config;
        let throttle = self.core.conditioner.smoothed();
        let settled = !self.core.long_busy()
            && !self.core.long.as_ref().is_some_and(|pair| pair.is_transitioning());

        match self.core.state {
            EngineState::Accelerating => {
                if throttle < self.drive_floor {
                    self.decelerate();
                } else if settled {
                    self.core.enter(EngineState::Cruising);
                    self.core.play_long(self.cruise, true, 0.0, cfg.handoff);
                }
            }
            EngineState::Cruising => {
                if throttle < self.drive_floor {
                    self.decelerate();
                }
            }
            EngineState::Decelerating => {
                if throttle >= cfg.reengage {
                    self.core.enter(EngineState::Accelerating);
                    self.core.play_long(self.accel, false, cfg.accel_offset, cfg.handoff);
                    self.accel_recent = true;
                    self.drive_floor = cfg.reengage.min(cfg.cruise_floor);
                } else if settled {
                    self.drive_floor = cfg.cruise_floor;
                    self.core.return_to_idle();
                }
            }
            _ => {}
        }
    }
}

impl EngineProfile for StagedProfile {
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
                self.core.try_start(SFX);
            }
            EngineState::Starting => {
                self.core.finish_start(SFX);
            }
            EngineState::Idle | EngineState::Gesture => self.idle_class(dt),
            EngineState::LaunchHold => self.launch_hold(),
            EngineState::Accelerating | EngineState::Cruising | EngineState::Decelerating => {
                self.drive()
            }
            _ => {}
        }

        self.core.end_tick(dt);
    }

    fn reset(&mut self) {
        self.core.reset();
        self.launch_active = false;
        self.accel_recent = false;
        self.drive_floor = self.config.cruise_floor;
    }
}
