//! Layered foundation loops with an automatic gearbox.

use alloc::vec::Vec;

use arrayvec::ArrayVec;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rb_ir::{
    ClipRef, ClipResolver, CommonConfig, EngineState, GearboxConfig, GestureConfig, GestureInput,
    IdleConfig, RpmConfig, SimTime, Smoothing, Snapshot,
};

use crate::action_queue::Action;
use crate::engine_core::EngineCore;
use crate::layers::{FoundationLayers, LayerShape};
use crate::profile::EngineProfile;
use crate::rpm::Shift;
use crate::sfx_queue::{SfxOutcome, SfxQueue};
use crate::voice_bank::VoiceId;

pub const IDLE: VoiceId = 0;
pub const RUMBLE_LOW: VoiceId = 1;
pub const RUMBLE_MID: VoiceId = 2;
pub const WHINE_LOW: VoiceId = 3;
pub const WHINE_HIGH: VoiceId = 4;
pub const ROAR: VoiceId = 5;
pub const BURBLE: VoiceId = 6;
pub const STARTUP: VoiceId = 7;
/// Gear changes and revs
pub const SHIFT: VoiceId = 8;
const VOICES: usize = 9;

const REV_QUEUE: usize = 3;
const MAX_VARIANTS: usize = 4;

/// Parameters of a [`GearedProfile`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GearedConfig {
    pub common: CommonConfig,
    pub gearbox: GearboxConfig,
    pub layers: LayerShape,
    /// Smoothed and raw throttle must both exceed this to drive
    pub drive_threshold: f32,
    /// Negative load below minus this brakes instead of accelerating
    pub lift_load: f32,
    pub rumble_low_clip: &'static str,
    pub rumble_mid_clip: &'static str,
    pub whine_low_clip: &'static str,
    pub whine_high_clip: &'static str,
    pub rev_clips: &'static [&'static str],
    pub upshift_clip: &'static str,
    pub downshift_clips: &'static [&'static str],
    pub roar_clip: &'static str,
    /// Positive load above this fires the roar
    pub roar_threshold: f32,
    pub roar_gain: f32,
    pub roar_hold_ms: u32,
    pub roar_fade_ms: u32,
    pub burble_clip: &'static str,
    /// Negative load below minus this starts the burble
    pub burble_threshold: f32,
    pub burble_gain: f32,
    pub burble_max: f32,
    /// RPM at which the burble reaches full level
    pub burble_rpm: f32,
    pub burble_fade_ms: u32,
    pub seed: u64,
}

impl GearedConfig {
    /// Every clip name the profile resolves.
    pub fn clip_names(&self) -> Vec<&'static str> {
        let mut names = Vec::from([
            self.common.idle_clip,
            self.common.starter_clip,
            self.rumble_low_clip,
            self.rumble_mid_clip,
            self.whine_low_clip,
            self.whine_high_clip,
            self.upshift_clip,
            self.roar_clip,
            self.burble_clip,
        ]);
        names.extend_from_slice(self.rev_clips);
        names.extend_from_slice(self.downshift_clips);
        names
    }
}

pub static HELLCAT: GearedConfig = GearedConfig {
    common: CommonConfig {
        name: "Hellcat",
        asset_dir: "hellcat",
        deadzone: 0.05,
        start_margin: 0.05,
        smoothing: Smoothing::Ema { alpha: 0.2 },
        gesture_input: GestureInput::Raw,
        gesture: GestureConfig {
            window: 1.0,
            lockout: 0.5,
            open_threshold: 0.10,
            prior_max: 0.075,
            fall_ratio: 0.5,
            near_idle: 0.10,
            min_peak: 0.08,
            require_decreasing: false,
        },
        rpm: RpmConfig {
            idle: 750.0,
            redline: 6200.0,
            decay_rate: 2000.0,
            decay_cooldown: 0.1,
            reset_after: 6.0,
        },
        idle: IdleConfig {
            normal: 0.7,
            ducked: 0.3,
            ramp_speed: 2.5,
        },
        idle_clip: "hellcat_idle_loop",
        starter_clip: "hellcat_startup_roar",
        rev_stages: &[],
        rev_volume: 1.0,
    },
    gearbox: GearboxConfig {
        accel_base: 1200.0,
        gear_multipliers: [1.2, 0.9, 0.7, 0.5, 0.4],
        coast_decay: 2000.0,
        lift_decay: 3500.0,
        engine_braking: [2000.0, 1500.0, 1200.0, 800.0, 600.0],
        downshift_rpm: [0.0, 1400.0, 1800.0, 2200.0, 2800.0],
        min_shift_interval: 2.5,
        upshift_base: 1800.0,
        upshift_per_gear: 100.0,
        rev_match_base: 400.0,
        rev_match_per_gear: 150.0,
        rev_match_cap: 0.75,
    },
    layers: LayerShape {
        idle_fade_start: 0.05,
        idle_fade_width: 0.1,
        blend_start: 0.4,
        blend_end: 0.6,
        low_curve: 1.8,
        mid_curve: 2.5,
        blend_curve: 2.0,
        whine_curve: 1.6,
        whine_rpm_boost: 0.3,
        whine_rpm_curve: 1.2,
        whine_low_fade_start: 0.3,
        whine_low_fade_end: 0.7,
        whine_low_gain: 0.8,
        whine_high_start: 0.4,
        whine_high_curve: 2.0,
        inertia: 3.0,
    },
    drive_threshold: 0.05,
    lift_load: 0.05,
    rumble_low_clip: "hellcat_rumble_low_rpm_loop",
    rumble_mid_clip: "hellcat_rumble_mid_rpm_loop",
    whine_low_clip: "hellcat_whine_low_rpm_loop",
    whine_high_clip: "hellcat_whine_high_rpm_loop",
    rev_clips: &["hellcat_rev_1", "hellcat_rev_2", "hellcat_rev_3"],
    upshift_clip: "hellcat_upshift_bark",
    downshift_clips: &["hellcat_downshift_revmatch1", "hellcat_downshift_revmatch2"],
    roar_clip: "hellcat_exhaust_roar",
    roar_threshold: 0.05,
    roar_gain: 2.0,
    roar_hold_ms: 150,
    roar_fade_ms: 150,
    burble_clip: "hellcat_decel_burble",
    burble_threshold: 0.05,
    burble_gain: 1.5,
    burble_max: 0.8,
    burble_rpm: 3000.0,
    burble_fade_ms: 200,
    seed: 0x4e11_ca75,
};

type Variants = ArrayVec<ClipRef, MAX_VARIANTS>;

fn resolve_pool(resolver: &mut dyn ClipResolver, dir: &str, names: &[&str]) -> Variants {
    names
        .iter()
        .take(MAX_VARIANTS)
        .map(|name| resolver.resolve(dir, name))
        .filter(|clip| !clip.is_null())
        .collect()
}

fn pick(rng: &mut SmallRng, pool: &Variants) -> ClipRef {
    if pool.is_empty() {
        return ClipRef::NULL;
    }
    pool[rng.gen_range(0..pool.len())]
}

/// Always-on rumble and whine loops shaped by throttle and RPM, with
/// exhaust one-shots on top and a five-speed automatic underneath.
///
/// Revs are picked at random and queued on the shift voice.
pub struct GearedProfile {
    core: EngineCore,
    config: &'static GearedConfig,
    layers: FoundationLayers,
    revs: SfxQueue<REV_QUEUE>,
    rev_clips: Variants,
    downshift_clips: Variants,
    upshift: ClipRef,
    roar: ClipRef,
    burble: ClipRef,
    rng: SmallRng,
    idle_gain: f32,
}

impl GearedProfile {
    pub fn new(config: &'static GearedConfig, resolver: &mut dyn ClipResolver) -> Self {
        let dir = config.common.asset_dir;
        let mut core = EngineCore::new(&config.common, resolver, VOICES, IDLE).with_gearbox();
        core.drives_idle_volume = false;
        let layers = FoundationLayers::new(
            config.layers,
            [
                (RUMBLE_LOW, resolver.resolve(dir, config.rumble_low_clip)),
                (RUMBLE_MID, resolver.resolve(dir, config.rumble_mid_clip)),
                (WHINE_LOW, resolver.resolve(dir, config.whine_low_clip)),
                (WHINE_HIGH, resolver.resolve(dir, config.whine_high_clip)),
            ],
        );
        Self {
            core,
            config,
            layers,
            revs: SfxQueue::new(),
            rev_clips: resolve_pool(resolver, dir, config.rev_clips),
            downshift_clips: resolve_pool(resolver, dir, config.downshift_clips),
            upshift: resolver.resolve(dir, config.upshift_clip),
            roar: resolver.resolve(dir, config.roar_clip),
            burble: resolver.resolve(dir, config.burble_clip),
            rng: SmallRng::seed_from_u64(config.seed),
            idle_gain: 1.0,
        }
    }

    pub fn layers(&self) -> &FoundationLayers {
        &self.layers
    }

    pub fn queued_revs(&self) -> usize {
        self.revs.len()
    }

    fn idle_class(&mut self, dt: f32) {
        let cfg = self.config;
        let idle = cfg.common.idle;
        if self.core.state == EngineState::Gesture {
            if !self.core.bank.is_busy(SHIFT) && self.revs.is_empty() {
                self.core.enter(EngineState::Idle);
                self.core.set_idle_target(idle.normal, false);
            }
        } else {
            self.core.set_idle_target(idle.normal, false);
        }

        if self.core.observe_gesture(true).is_some() {
            let clip = pick(&mut self.rng, &self.rev_clips);
            let outcome = self.revs.request(&mut self.core.bank, SHIFT, clip, 1.0);
            if outcome != SfxOutcome::Dropped {
                self.core.set_idle_target(idle.ducked, false);
                self.core.enter(EngineState::Gesture);
                return;
            }
        }

        let smoothed = self.core.conditioner.smoothed();
        let raw = self.core.conditioner.raw();
        if !self.core.gesture.is_open() && smoothed > cfg.drive_threshold && raw > cfg.drive_threshold {
            self.core.enter(EngineState::Driving);
            return;
        }
        self.core.rpm.coast(dt, cfg.gearbox.coast_decay);
    }

    fn driving(&mut self, dt: f32) {
        let cfg = self.config;
        let gearbox = &cfg.gearbox;
        let now = self.core.now();
        let smoothed = self.core.conditioner.smoothed();
        let load = self.core.conditioner.load();

        if smoothed <= cfg.drive_threshold {
            self.core.enter(EngineState::Idle);
            self.core.set_idle_target(cfg.common.idle.normal, false);
            return;
        }

        if load < -cfg.lift_load {
            self.core.rpm.brake(dt, gearbox);
        } else {
            self.core.rpm.integrate(dt, smoothed, gearbox);
        }

        if let Some(shift) = self.core.rpm.evaluate_shift(now, smoothed, load, gearbox) {
            let clip = match shift {
                Shift::Up => self.upshift,
                Shift::Down(_) => pick(&mut self.rng, &self.downshift_clips),
            };
            let from = self.core.rpm.gear();
            self.core.rpm.apply_shift(now, shift, gearbox);
            log::debug!(
                "{}: {:?} {:?} -> {:?} at {:.0} rpm",
                cfg.common.name,
                shift,
                from,
                self.core.rpm.gear(),
                self.core.rpm.current()
            );
            if self.core.bank.play(SHIFT, clip, false, 1.0) {
                self.core.set_idle_target(cfg.common.idle.ducked, false);
            }
        }

        if !self.core.bank.is_busy(SHIFT) {
            self.core.set_idle_target(cfg.common.idle.normal, false);
        }
    }

    /// Exhaust roar on a throttle stab, burble loop while lifting.
    fn character(&mut self) {
        let cfg = self.config;
        let load = self.core.conditioner.load();
        let now = self.core.now();
        let bank = &mut self.core.bank;

        if load > cfg.roar_threshold && !bank.is_busy(ROAR) {
            let volume = (cfg.roar_gain * load).min(1.0);
            if bank.play(ROAR, self.roar, false, volume) {
                self.core
                    .actions
                    .cancel(|a| matches!(a, Action::Stop { voice: ROAR, .. }));
                self.core.actions.push(
                    now.add_millis(cfg.roar_hold_ms),
                    Action::Stop {
                        voice: ROAR,
                        fade_ms: cfg.roar_fade_ms,
                    },
                );
            }
        }

        let bank = &mut self.core.bank;
        if load < -cfg.burble_threshold {
            if !bank.is_busy(BURBLE) {
                let level = (cfg.burble_gain * -load).min(cfg.burble_max);
                let rpm_factor = (self.core.rpm.current() / cfg.burble_rpm).min(1.0);
                bank.play(BURBLE, self.burble, true, level * rpm_factor);
            }
        } else if bank.is_busy(BURBLE) && !bank.is_fading(BURBLE) {
            bank.stop(BURBLE, cfg.burble_fade_ms);
        }
    }
}

impl EngineProfile for GearedProfile {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }

    fn update(&mut self, now: SimTime, dt: f32) {
        self.core.begin_tick(now, dt);
        self.revs.pump(&mut self.core.bank, SHIFT);

        match self.core.state {
            EngineState::EngineOff => {
                self.core.try_start(STARTUP);
            }
            EngineState::Starting => {
                self.core.finish_start(STARTUP);
            }
            EngineState::Idle | EngineState::Gesture => self.idle_class(dt),
            EngineState::Driving => self.driving(dt),
            _ => {}
        }

        let running = !matches!(self.core.state, EngineState::EngineOff | EngineState::Starting);
        if running {
            let smoothed = self.core.conditioner.smoothed();
            let factor = self.core.rpm.factor();
            self.idle_gain = self.layers.update(&mut self.core.bank, smoothed, factor, dt);
            self.character();
        }

        self.core.end_tick(dt);
        if running && self.core.bank.is_busy(IDLE) {
            let volume = self.core.idle.current() * self.idle_gain;
            self.core.bank.set_volume(IDLE, volume);
        }
    }

    fn reset(&mut self) {
        self.core.reset();
        self.layers.reset(&mut self.core.bank);
        self.revs.clear();
        self.idle_gain = 1.0;
    }

    fn fade_out(&mut self, fade_ms: u32) {
        self.revs.clear();
        self.core.fade_out(fade_ms);
    }

    fn snapshot(&self) -> Snapshot {
        self.core.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::testing::{bank_for, Driver};

    fn profile() -> (GearedProfile, Driver) {
        let mut clips = bank_for(&HELLCAT.clip_names(), 1.0);
        let profile = GearedProfile::new(&HELLCAT, &mut clips);
        (profile, Driver::new())
    }

    fn idle(profile: &mut GearedProfile, driver: &mut Driver) {
        driver.hold(profile, 0.3, 1.0 / 60.0);
        driver.hold(profile, 0.0, 1.5);
        assert_eq!(profile.state(), EngineState::Idle);
    }

    #[test]
    fn idles_with_silent_layers() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        assert!(p.voices().is_busy(IDLE));
        for voice in [RUMBLE_LOW, RUMBLE_MID, WHINE_LOW, WHINE_HIGH] {
            assert!(!p.voices().is_busy(voice));
        }
        assert_eq!(p.core().rpm.gear(), Some(1));
    }

    #[test]
    fn blip_plays_a_rev_without_driving() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.ramp(&mut p, 0.0, 0.32, 0.15);
        d.ramp(&mut p, 0.32, 0.0, 0.15);
        assert_eq!(p.state(), EngineState::Gesture);
        assert!(p.voices().is_busy(SHIFT));
        assert!((p.core().idle.target() - 0.3).abs() < 1e-6);
        d.hold(&mut p, 0.0, 1.5);
        assert_eq!(p.state(), EngineState::Idle);
    }

    #[test]
    fn throttle_stab_fires_roar_that_fades() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.hold(&mut p, 0.5, 1.0 / 60.0);
        assert!(p.voices().is_busy(ROAR));
        d.hold(&mut p, 0.5, 0.4);
        assert!(!p.voices().is_busy(ROAR));
    }

    #[test]
    fn sustained_throttle_drives_and_upshifts() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.hold(&mut p, 1.0, 1.2);
        assert_eq!(p.state(), EngineState::Driving);
        assert!(p.voices().is_busy(RUMBLE_MID));
        assert!(p.core().rpm.current() > 750.0);

        d.hold(&mut p, 1.0, 4.0);
        assert_eq!(p.core().rpm.gear(), Some(2));
        assert!(p.core().rpm.current() < 6200.0);
        assert!(p.voices().is_busy(SHIFT));
        assert!(p.core().bank.volume(IDLE) < 0.01);
    }

    #[test]
    fn lift_returns_to_idle_and_first_gear() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.hold(&mut p, 1.0, 2.0);
        assert_eq!(p.state(), EngineState::Driving);
        d.hold(&mut p, 0.0, 1.0 / 60.0);
        assert!(p.voices().is_busy(BURBLE));
        d.hold(&mut p, 0.0, 3.0);
        assert_eq!(p.state(), EngineState::Idle);
        assert_eq!(p.core().rpm.current(), 750.0);
        assert_eq!(p.core().rpm.gear(), Some(1));
        assert!(!p.voices().is_busy(BURBLE));
    }

    #[test]
    fn reset_silences_layers() {
        let (mut p, mut d) = profile();
        idle(&mut p, &mut d);
        d.hold(&mut p, 1.0, 2.0);
        p.reset();
        assert_eq!(p.state(), EngineState::EngineOff);
        assert!(!p.voices().any_busy());
        assert_eq!(p.queued_revs(), 0);
    }
}
