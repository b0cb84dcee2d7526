//! End-to-end throttle scenarios against the built-in profiles.
//!
//! Every clip is one second of silence, so timings depend only on the
//! state machines and not on audio content.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rb_engine::profiles::{ranged, staged, GearedProfile, RangedProfile, StagedProfile, HELLCAT, M4, SUPRA};
use rb_engine::{EngineProfile, ProfileSwitcher, VolumeRamp, SWITCH_FADE_MS};
use rb_ir::{Clip, ClipBank, EngineState, SimTime, Snapshot, ThrottleSample};

const TICK: f32 = 1.0 / 60.0;

fn silent_bank(names: &[&str]) -> ClipBank {
    let mut bank = ClipBank::new();
    for name in names {
        bank.insert(Clip::silence(name, 1.0, 1000));
    }
    bank
}

fn m4() -> StagedProfile {
    StagedProfile::new(&M4, &mut silent_bank(&M4.clip_names()))
}

fn supra() -> RangedProfile {
    RangedProfile::new(&SUPRA, &mut silent_bank(&SUPRA.clip_names()))
}

fn hellcat() -> GearedProfile {
    GearedProfile::new(&HELLCAT, &mut silent_bank(&HELLCAT.clip_names()))
}

/// Feeds a profile at 60 Hz and records a snapshot after every tick.
struct Feed {
    now: SimTime,
    trace: Vec<Snapshot>,
}

impl Feed {
    fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            trace: Vec::new(),
        }
    }

    fn step(&mut self, profile: &mut dyn EngineProfile, raw: f32) {
        self.now = self.now.add_secs(TICK);
        profile.tick(self.now, TICK, ThrottleSample::new(self.now, raw));
        self.trace.push(profile.snapshot());
    }

    fn hold(&mut self, profile: &mut dyn EngineProfile, raw: f32, secs: f32) {
        let ticks = ((secs / TICK).round() as usize).max(1);
        for _ in 0..ticks {
            self.step(profile, raw);
        }
    }

    fn ramp(&mut self, profile: &mut dyn EngineProfile, from: f32, to: f32, secs: f32) {
        let ticks = ((secs / TICK).round() as usize).max(1);
        for i in 1..=ticks {
            self.step(profile, from + (to - from) * i as f32 / ticks as f32);
        }
    }

    /// Crank, then sit at zero throttle until idling.
    fn start(&mut self, profile: &mut dyn EngineProfile) {
        self.hold(profile, 0.3, TICK);
        self.hold(profile, 0.0, 1.5);
        assert_eq!(profile.state(), EngineState::Idle);
        self.trace.clear();
    }

    fn blip(&mut self, profile: &mut dyn EngineProfile, peak: f32) {
        self.ramp(profile, 0.0, peak, 0.15);
        self.ramp(profile, peak, 0.0, 0.15);
    }

    /// Ticks on which `voice` went from idle to busy.
    fn starts_on(&self, voice: usize) -> usize {
        let mut busy = false;
        let mut starts = 0;
        for s in &self.trace {
            let now = s.voices.get(voice).is_some_and(|v| v.busy);
            if now && !busy {
                starts += 1;
            }
            busy = now;
        }
        starts
    }

    fn entries_into(&self, state: EngineState) -> usize {
        let mut prev = None;
        let mut count = 0;
        for s in &self.trace {
            if s.state == state && prev != Some(state) {
                count += 1;
            }
            prev = Some(s.state);
        }
        count
    }
}

#[test]
fn single_blip_revs_once_and_idle_recovers() {
    let mut p = m4();
    let mut f = Feed::new();
    f.start(&mut p);

    f.blip(&mut p, 0.32);
    f.hold(&mut p, 0.0, 2.0);

    assert_eq!(f.starts_on(staged::REV), 1);
    let lowest = f.trace.iter().map(|s| s.idle_volume).fold(1.0, f32::min);
    assert!(lowest < 0.2, "idle never ducked: {}", lowest);
    assert_eq!(p.state(), EngineState::Idle);
    assert!((p.voices().volume(staged::IDLE) - 0.7).abs() < 1e-3);
}

#[test]
fn supra_blip_revs_once() {
    let mut p = supra();
    let mut f = Feed::new();
    f.start(&mut p);

    f.blip(&mut p, 0.32);
    f.hold(&mut p, 0.0, 2.0);

    assert_eq!(f.starts_on(ranged::REV), 1);
    assert_eq!(f.entries_into(EngineState::Accelerating), 0);
    assert!(!p.core().long_busy());
    assert!(p.state().is_idle_class());
}

#[test]
fn sustained_full_throttle_accelerates_once() {
    let mut p = m4();
    let mut f = Feed::new();
    f.start(&mut p);

    f.hold(&mut p, 1.0, 2.5);

    assert_eq!(f.entries_into(EngineState::Accelerating), 1);
    let entry = f
        .trace
        .iter()
        .find(|s| s.state == EngineState::Accelerating)
        .expect("accelerated");
    assert_eq!(entry.idle_volume, 0.0);
    assert!(entry.time.secs_since(SimTime::ZERO) > 1.5 + 1.5);
}

#[test]
fn launch_control_holds_then_launches_at_full_volume() {
    let mut p = m4();
    let mut f = Feed::new();
    f.start(&mut p);

    f.hold(&mut p, 0.7, 0.6);
    assert_eq!(p.state(), EngineState::LaunchHold);
    assert!(p.voices().is_busy(staged::SFX));

    f.step(&mut p, 1.0);
    assert_eq!(p.state(), EngineState::Accelerating);
    assert!(!p.voices().is_busy(staged::SFX));
    assert!(p.voices().is_busy(staged::LONG_A));
    assert_eq!(p.voices().volume(staged::LONG_A), 1.0);
}

#[test]
fn rapid_double_blip_revs_once() {
    let mut p = m4();
    let mut f = Feed::new();
    f.start(&mut p);

    f.blip(&mut p, 0.32);
    f.hold(&mut p, 0.0, 0.1);
    f.blip(&mut p, 0.32);
    f.hold(&mut p, 0.0, 1.5);

    assert_eq!(f.starts_on(staged::REV), 1);
}

#[test]
fn switch_mid_idle_fades_out_and_next_starts_off() {
    let mut clips = silent_bank(&M4.clip_names());
    let m4: Box<dyn EngineProfile> = Box::new(StagedProfile::new(&M4, &mut clips));
    let mut clips = silent_bank(&SUPRA.clip_names());
    let supra: Box<dyn EngineProfile> = Box::new(RangedProfile::new(&SUPRA, &mut clips));
    let mut s = ProfileSwitcher::new(vec![m4, supra], SWITCH_FADE_MS).expect("profiles");

    let mut now = SimTime::ZERO;
    let mut run = |s: &mut ProfileSwitcher, raw: f32, secs: f32| {
        for _ in 0..(secs / TICK).round() as usize {
            now = now.add_secs(TICK);
            s.tick(now, TICK, ThrottleSample::new(now, raw));
        }
        now
    };

    run(&mut s, 0.3, TICK);
    let at = run(&mut s, 0.0, 1.5);
    assert_eq!(s.active().state(), EngineState::Idle);
    assert!(s.switch_profile(at));

    run(&mut s, 0.0, 0.4);
    assert!(s.is_switching());
    let idle = s.active().voices().volume(staged::IDLE);
    assert!(idle > 0.0 && idle < 0.7, "halfway idle volume {}", idle);

    run(&mut s, 0.0, 0.45);
    assert!(!s.is_switching());
    let outgoing = s.profile(0).expect("m4");
    assert!(!outgoing.voices().any_busy());
    assert!(outgoing.voices().iter().all(|v| v.volume == 0.0 || v.clip.is_none()));
    assert_eq!(s.active().name(), "Supra");
    assert_eq!(s.active().state(), EngineState::EngineOff);
}

/// Random walk with occasional jumps, always inside [0, 1].
fn wander(rng: &mut SmallRng, current: &mut f32, target: &mut f32) -> f32 {
    if rng.gen_range(0..100) < 4 {
        *target = rng.gen_range(0.0..=1.0);
    }
    *current += (*target - *current) * 0.2 + rng.gen_range(-0.05..0.05);
    *current = current.clamp(0.0, 1.0);
    *current
}

fn check_invariants(profile: &mut dyn EngineProfile, seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut f = Feed::new();
    let (mut current, mut target) = (0.0, 0.0);

    for _ in 0..60 * 30 {
        let raw = wander(&mut rng, &mut current, &mut target);
        f.step(profile, raw);

        let conditioner = &profile.core().conditioner;
        let smoothed = conditioner.smoothed();
        let (lo, hi) = conditioner.history_range();
        assert!((0.0..=1.0).contains(&smoothed));
        assert!(smoothed >= lo - 1e-6 && smoothed <= hi + 1e-6, "{} outside {}..{}", smoothed, lo, hi);

        let rpm = &profile.core().rpm;
        assert!(
            rpm.current() >= rpm.idle() - 1e-3 && rpm.current() <= rpm.redline() + 1e-3,
            "{}: rpm {} out of range",
            profile.name(),
            rpm.current()
        );
    }
    assert!(f.trace.iter().any(|s| s.state != EngineState::EngineOff));
}

#[test]
fn random_throttle_keeps_signals_in_range() {
    check_invariants(&mut m4(), 1);
    check_invariants(&mut supra(), 2);
    check_invariants(&mut hellcat(), 3);
}

#[test]
fn long_sequence_blocks_gestures() {
    let mut p = m4();
    let mut f = Feed::new();
    let mut rng = SmallRng::seed_from_u64(11);
    f.start(&mut p);
    f.hold(&mut p, 1.0, 1.7);
    assert!(p.core().long_busy());

    for _ in 0..60 * 10 {
        let long_busy = p.core().long_busy();
        let rev_busy = p.voices().is_busy(staged::REV);
        let raw = if rng.gen_bool(0.5) { 1.0 } else { rng.gen_range(0.0..0.4) };
        f.step(&mut p, raw);
        if long_busy {
            assert!(!p.core().gesture.is_open());
            assert!(rev_busy || !p.voices().is_busy(staged::REV));
        }
    }
}

#[test]
fn repeated_volume_target_does_not_restart_ramp() {
    let mut ramp = VolumeRamp::new(0.7, 2.5);
    assert!(ramp.set_target(0.15, false));
    ramp.advance(0.1);
    let mid = ramp.current();
    let restarts = ramp.restarts();

    assert!(!ramp.set_target(0.15, false));
    assert_eq!(ramp.current(), mid);
    assert_eq!(ramp.restarts(), restarts);
    assert_eq!(ramp.target(), 0.15);
}
