//! The owning context: profiles, clips and collaborators behind one tick.

use rb_engine::{create_profile, profile_assets, EngineProfile, Frame, Mixer, ProfileSwitcher};
use rb_formats::AssetStore;
use rb_ir::{ClipBank, ClipResolver, SimTime, Snapshot, ThrottleSample};

use crate::hardware::{ButtonEvent, ButtonSource, ModeButton, ThrottleInput, ThrottleSource};
use crate::telemetry::TelemetrySink;
use crate::{SimConfig, SimError};

/// Build the profiles named in `names`, in order.
pub fn build_profiles<S: AsRef<str>>(
    names: &[S],
    resolver: &mut dyn ClipResolver,
) -> Result<Vec<Box<dyn EngineProfile>>, SimError> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            create_profile(name, &mut *resolver).ok_or_else(|| SimError::UnknownProfile(name.to_string()))
        })
        .collect()
}

/// Load every clip the rotation needs from `root` and build the profiles.
///
/// Missing files are not errors; the affected clips stay silent.
pub fn load_profiles<S: AsRef<str>>(
    root: &std::path::Path,
    names: &[S],
) -> Result<(Vec<Box<dyn EngineProfile>>, ClipBank), SimError> {
    let mut store = AssetStore::new(root);
    for name in names {
        let name = name.as_ref();
        let (dir, clips) = profile_assets(name).ok_or_else(|| SimError::UnknownProfile(name.to_string()))?;
        let found = store.preload(dir, &clips);
        log::info!("{}: {}/{} clips in {}", name, found, clips.len(), store.root().join(dir).display());
    }
    let profiles = build_profiles(names, &mut store)?;
    Ok((profiles, store.into_clips()))
}

pub struct Simulator {
    config: SimConfig,
    switcher: ProfileSwitcher,
    clips: ClipBank,
    mixer: Mixer,
    throttle: ThrottleInput<Box<dyn ThrottleSource>>,
    button: ModeButton<Box<dyn ButtonSource>>,
    sink: Box<dyn TelemetrySink>,
    now: SimTime,
    ticks: u64,
}

impl Simulator {
    pub fn initialize(
        config: SimConfig,
        profiles: Vec<Box<dyn EngineProfile>>,
        clips: ClipBank,
        throttle: Box<dyn ThrottleSource>,
        button: Box<dyn ButtonSource>,
        sink: Box<dyn TelemetrySink>,
    ) -> Result<Self, SimError> {
        let switcher = ProfileSwitcher::new(profiles, config.switch_fade_ms).ok_or(SimError::NoProfiles)?;
        log::info!(
            "simulator: {} profiles, {} Hz ticks, starting with {}",
            switcher.len(),
            config.tick_rate,
            switcher.active().name()
        );
        Ok(Self {
            mixer: Mixer::new(config.sample_rate, config.master_gain),
            throttle: ThrottleInput::new(throttle, config.calibration),
            button: ModeButton::new(button, config.button),
            config,
            switcher,
            clips,
            sink,
            now: SimTime::ZERO,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick_dt(&self) -> f32 {
        1.0 / self.config.tick_rate.max(1) as f32
    }

    pub fn frames_per_tick(&self) -> usize {
        self.mixer.frames_per_tick(self.tick_dt())
    }

    /// Read inputs, advance the active profile by `dt` and publish a snapshot.
    pub fn tick(&mut self, dt: f32) {
        self.now = self.now.add_secs(dt);
        self.ticks += 1;
        let now = self.now;

        let raw = self.throttle.read(now);
        match self.button.poll(now) {
            Some(ButtonEvent::Short) => {
                self.switcher.switch_profile(now);
            }
            Some(ButtonEvent::Long) => self.shutdown(),
            None => {}
        }

        self.switcher.tick(now, dt, ThrottleSample::new(now, raw));
        let snapshot = self.switcher.snapshot();
        self.sink.record(&snapshot);
    }

    /// One tick at the configured rate.
    pub fn step(&mut self) {
        self.tick(self.tick_dt());
    }

    pub fn switch_profile(&mut self) -> bool {
        self.switcher.switch_profile(self.now)
    }

    /// Fade everything out. Safe to call at any time, more than once.
    pub fn shutdown(&mut self) {
        self.switcher.shutdown(self.now, self.config.shutdown_fade_ms);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.switcher.is_shutting_down()
    }

    pub fn is_finished(&self) -> bool {
        self.switcher.is_finished()
    }

    /// Silence every voice immediately.
    pub fn halt(&mut self) {
        self.switcher.active_mut().stop_all();
    }

    /// Render the active profile's voices for the block starting now.
    pub fn render(&self, out: &mut [Frame]) {
        self.mixer
            .render(self.switcher.active().voices(), &self.clips, self.now, out);
    }

    pub fn active_profile(&self) -> &dyn EngineProfile {
        self.switcher.active()
    }

    pub fn switcher(&self) -> &ProfileSwitcher {
        &self.switcher
    }

    pub fn clips(&self) -> &ClipBank {
        &self.clips
    }

    pub fn snapshot(&self) -> Snapshot {
        self.switcher.snapshot()
    }
}
