//! Profile rotation with a fade-out between vehicles.

use alloc::boxed::Box;
use alloc::vec::Vec;

use rb_ir::{SimTime, Snapshot, ThrottleSample};

use crate::profile::EngineProfile;

/// Default fade applied to the outgoing profile.
pub const SWITCH_FADE_MS: u32 = 800;

/// A switch that is fading out `from` before `to` takes over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchTransition {
    pub from: usize,
    pub to: usize,
    pub start: SimTime,
    pub end: SimTime,
}

/// Owns every profile and runs exactly one of them per tick.
pub struct ProfileSwitcher {
    profiles: Vec<Box<dyn EngineProfile>>,
    active: usize,
    transition: Option<SwitchTransition>,
    shutdown_at: Option<SimTime>,
    finished: bool,
    fade_ms: u32,
    now: SimTime,
}

impl ProfileSwitcher {
    /// Returns `None` if `profiles` is empty. The first profile starts active.
    pub fn new(profiles: Vec<Box<dyn EngineProfile>>, fade_ms: u32) -> Option<Self> {
        if profiles.is_empty() {
            return None;
        }
        Some(Self {
            profiles,
            active: 0,
            transition: None,
            shutdown_at: None,
            finished: false,
            fade_ms,
            now: SimTime::ZERO,
        })
    }

    pub fn active(&self) -> &dyn EngineProfile {
        self.profiles[self.active].as_ref()
    }

    pub fn active_mut(&mut self) -> &mut dyn EngineProfile {
        self.profiles[self.active].as_mut()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn profile(&self, index: usize) -> Option<&dyn EngineProfile> {
        self.profiles.get(index).map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn transition(&self) -> Option<&SwitchTransition> {
        self.transition.as_ref()
    }

    pub fn is_switching(&self) -> bool {
        self.transition.is_some()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_at.is_some()
    }

    /// True once a shutdown fade has completed and every voice is stopped.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Begin fading to the next profile in rotation.
    ///
    /// Returns false when a switch or shutdown is already under way.
    pub fn switch_profile(&mut self, now: SimTime) -> bool {
        if self.transition.is_some() || self.shutdown_at.is_some() {
            return false;
        }
        let from = self.active;
        let to = (from + 1) % self.profiles.len();
        log::info!(
            "switching {} -> {} over {} ms",
            self.profiles[from].name(),
            self.profiles[to].name(),
            self.fade_ms
        );
        self.profiles[from].fade_out(self.fade_ms);
        self.transition = Some(SwitchTransition {
            from,
            to,
            start: now,
            end: now.add_millis(self.fade_ms),
        });
        true
    }

    /// Fade the active profile out over `fade_ms`, abandoning any switch.
    /// Calling it again has no effect.
    pub fn shutdown(&mut self, now: SimTime, fade_ms: u32) {
        if self.shutdown_at.is_some() {
            return;
        }
        if let Some(t) = self.transition.take() {
            log::info!("shutdown abandons switch to {}", self.profiles[t.to].name());
        }
        log::info!("{}: shutting down over {} ms", self.active().name(), fade_ms);
        self.active_mut().fade_out(fade_ms);
        self.shutdown_at = Some(now.add_millis(fade_ms));
    }

    /// One coordinator tick.
    ///
    /// During a switch or shutdown the sample only warms the incoming
    /// profile's smoothing; no state machine runs.
    pub fn tick(&mut self, now: SimTime, dt: f32, sample: ThrottleSample) {
        self.now = now;

        if let Some(end) = self.shutdown_at {
            let profile = self.profiles[self.active].as_mut();
            profile.advance_audio(now);
            if !self.finished && now >= end {
                profile.stop_all();
                self.finished = true;
                log::info!("{}: shutdown complete", profile.name());
            }
            return;
        }

        if let Some(t) = self.transition {
            self.profiles[t.to].condition(sample);
            self.profiles[t.from].advance_audio(now);
            if now >= t.end {
                self.profiles[t.from].stop_all();
                self.active = t.to;
                self.profiles[t.to].reset();
                self.transition = None;
                log::info!("active profile: {}", self.profiles[t.to].name());
            }
            return;
        }

        self.profiles[self.active].tick(now, dt, sample);
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = self.active().snapshot();
        snapshot.time = self.now;
        snapshot.switching = self.transition.is_some();
        snapshot.shutting_down = self.shutdown_at.is_some();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::testing::bank_for;
    use crate::profiles::{create_profile, profile_assets, PROFILE_NAMES};
    use rb_ir::EngineState;

    const TICK: f32 = 1.0 / 60.0;

    fn switcher() -> ProfileSwitcher {
        let names: Vec<&str> = PROFILE_NAMES
            .iter()
            .filter_map(|name| profile_assets(name))
            .flat_map(|(_, names)| names)
            .collect();
        let mut clips = bank_for(&names, 1.0);
        let profiles = PROFILE_NAMES
            .iter()
            .filter_map(|name| create_profile(name, &mut clips))
            .collect();
        ProfileSwitcher::new(profiles, SWITCH_FADE_MS).expect("profiles")
    }

    fn run(s: &mut ProfileSwitcher, now: &mut SimTime, raw: f32, secs: f32) {
        let ticks = (secs / TICK).round() as usize;
        for _ in 0..ticks {
            *now = now.add_secs(TICK);
            s.tick(*now, TICK, ThrottleSample::new(*now, raw));
        }
    }

    fn idle(s: &mut ProfileSwitcher, now: &mut SimTime) {
        run(s, now, 0.3, TICK);
        run(s, now, 0.0, 1.5);
        assert_eq!(s.active().state(), EngineState::Idle);
    }

    #[test]
    fn empty_rotation_is_rejected() {
        assert!(ProfileSwitcher::new(Vec::new(), SWITCH_FADE_MS).is_none());
    }

    #[test]
    fn switch_fades_then_resets_next_profile() {
        let mut s = switcher();
        let mut now = SimTime::ZERO;
        idle(&mut s, &mut now);
        assert_eq!(s.active().name(), "M4");

        assert!(s.switch_profile(now));
        assert!(!s.switch_profile(now));
        run(&mut s, &mut now, 0.0, 0.4);
        assert!(s.is_switching());
        assert_eq!(s.active().name(), "M4");
        assert!(s.active().voices().volume(0) < 0.7);

        run(&mut s, &mut now, 0.0, 0.5);
        assert!(!s.is_switching());
        assert_eq!(s.active().name(), "Supra");
        assert_eq!(s.active().state(), EngineState::EngineOff);
        let m4 = s.profile(0).expect("m4");
        assert!(!m4.voices().any_busy());
    }

    #[test]
    fn throttle_during_switch_drives_nothing() {
        let mut s = switcher();
        let mut now = SimTime::ZERO;
        idle(&mut s, &mut now);
        s.switch_profile(now);
        run(&mut s, &mut now, 1.0, 0.7);
        assert_eq!(s.active().state(), EngineState::Idle);
        assert_eq!(s.profile(1).map(|p| p.state()), Some(EngineState::EngineOff));
    }

    #[test]
    fn rotation_wraps() {
        let mut s = switcher();
        let mut now = SimTime::ZERO;
        for expected in ["Supra", "Hellcat", "M4"] {
            s.switch_profile(now);
            run(&mut s, &mut now, 0.0, 1.0);
            assert_eq!(s.active().name(), expected);
        }
    }

    #[test]
    fn shutdown_mid_switch_finishes() {
        let mut s = switcher();
        let mut now = SimTime::ZERO;
        idle(&mut s, &mut now);
        s.switch_profile(now);
        run(&mut s, &mut now, 0.0, 0.2);
        s.shutdown(now, 300);
        s.shutdown(now, 300);
        assert!(!s.is_switching());
        assert!(!s.switch_profile(now));
        run(&mut s, &mut now, 0.0, 0.4);
        assert!(s.is_finished());
        assert!(!s.active().voices().any_busy());
        assert!(s.snapshot().shutting_down);
    }
}
