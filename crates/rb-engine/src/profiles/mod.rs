//! Built-in vehicle profiles.

pub mod geared;
pub mod ranged;
pub mod staged;

use alloc::boxed::Box;
use alloc::vec::Vec;

use rb_ir::ClipResolver;

use crate::profile::EngineProfile;

pub use geared::{GearedConfig, GearedProfile, HELLCAT};
pub use ranged::{RangedConfig, RangedProfile, SUPRA};
pub use staged::{StagedConfig, StagedProfile, M4};

/// Names accepted by [`create_profile`], in switch rotation order.
pub const PROFILE_NAMES: &[&str] = &["M4", "Supra", "Hellcat"];

/// Create a profile by name (case-insensitive).
pub fn create_profile(name: &str, resolver: &mut dyn ClipResolver) -> Option<Box<dyn EngineProfile>> {
    let profile: Box<dyn EngineProfile> = if name.eq_ignore_ascii_case("m4") {
        Box::new(StagedProfile::new(&M4, resolver))
    } else if name.eq_ignore_ascii_case("supra") {
        Box::new(RangedProfile::new(&SUPRA, resolver))
    } else if name.eq_ignore_ascii_case("hellcat") {
        Box::new(GearedProfile::new(&HELLCAT, resolver))
    } else {
        return None;
    };
    Some(profile)
}

/// Asset directory and clip names a profile resolves.
pub fn profile_assets(name: &str) -> Option<(&'static str, Vec<&'static str>)> {
    if name.eq_ignore_ascii_case("m4") {
        Some((M4.common.asset_dir, M4.clip_names()))
    } else if name.eq_ignore_ascii_case("supra") {
        Some((SUPRA.common.asset_dir, SUPRA.clip_names()))
    } else if name.eq_ignore_ascii_case("hellcat") {
        Some((HELLCAT.common.asset_dir, HELLCAT.clip_names()))
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use rb_ir::{Clip, ClipBank, SimTime, ThrottleSample};

    use crate::profile::EngineProfile;

    const TICK: f32 = 1.0 / 60.0;

    /// A clip bank holding a silent clip of `secs` for every name.
    pub fn bank_for(names: &[&str], secs: f32) -> ClipBank {
        let mut bank = ClipBank::new();
        for name in names {
            bank.insert(Clip::silence(name, secs, 1000));
        }
        bank
    }

    /// Feeds a profile at 60 Hz.
    pub struct Driver {
        pub now: SimTime,
    }

    impl Driver {
        pub fn new() -> Self {
            Self { now: SimTime::ZERO }
        }

        pub fn step<P: EngineProfile + ?Sized>(&mut self, profile: &mut P, raw: f32) {
            self.now = self.now.add_secs(TICK);
            profile.tick(self.now, TICK, ThrottleSample::new(self.now, raw));
        }

        pub fn hold<P: EngineProfile + ?Sized>(&mut self, profile: &mut P, raw: f32, secs: f32) {
            let ticks = ((secs / TICK).round() as usize).max(1);
            for _ in 0..ticks {
                self.step(profile, raw);
            }
        }

        /// Linear ramp ending exactly on `to`.
        pub fn ramp<P: EngineProfile + ?Sized>(&mut self, profile: &mut P, from: f32, to: f32, secs: f32) {
            let ticks = ((secs / TICK).round() as usize).max(1);
            for i in 1..=ticks {
                let raw = from + (to - from) * i as f32 / ticks as f32;
                self.step(profile, raw);
            }
        }
    }
}
