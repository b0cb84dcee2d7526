//! Shared engine framework: the parts every profile's state machine uses.

use arrayvec::ArrayVec;
use rb_ir::{ClipRef, ClipResolver, CommonConfig, EngineState, SimTime, Snapshot};

use crate::action_queue::{Action, ActionQueue};
use crate::conditioner::ThrottleConditioner;
use crate::crossfade::CrossfadePair;
use crate::gesture::{GestureDetector, GestureResult};
use crate::ramp::VolumeRamp;
use crate::rpm::RpmModel;
use crate::stages::select_stage;
use crate::voice_bank::{VoiceBank, VoiceId};

/// Maximum staged rev clips per profile.
pub const MAX_STAGES: usize = 6;

/// Continuous timers attached to the engine state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StateTimers {
    pub time_in_state: f32,
    pub time_at_full_throttle: f32,
    pub time_in_launch_band: f32,
}

/// How a long sequence takes over from whatever the pair is playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handoff {
    /// Hard cut, full volume immediately
    Cut,
    /// Equal-length fade out / fade in on the pair
    Crossfade,
    /// Fade both voices out, then start after a short gap
    StopThenPlay { fade_ms: u32, gap_ms: u32 },
}

/// A staged rev that was started.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RevPlayed {
    pub stage: usize,
    pub peak_rpm: f32,
}

/// State and collaborators shared by all profiles.
///
/// Profiles own one `EngineCore` and layer their transition logic on top.
pub struct EngineCore {
    pub config: &'static CommonConfig,
    pub state: EngineState,
    pub timers: StateTimers,
    pub conditioner: ThrottleConditioner,
    pub gesture: GestureDetector,
    pub rpm: RpmModel,
    pub bank: VoiceBank,
    pub idle: VolumeRamp,
    pub actions: ActionQueue,
    /// Crossfade pair for long sequences, if the profile has one
    pub long: Option<CrossfadePair>,
    pub idle_voice: VoiceId,
    pub idle_clip: ClipRef,
    pub starter_clip: ClipRef,
    pub stages: ArrayVec<ClipRef, MAX_STAGES>,
    /// When false the profile computes the idle voice's gain itself
    pub drives_idle_volume: bool,
    now: SimTime,
}

impl EngineCore {
    /// Resolve the common clips and build a silent engine in `ENGINE_OFF`.
    pub fn new(
        config: &'static CommonConfig,
        resolver: &mut dyn ClipResolver,
        voices: usize,
        idle_voice: VoiceId,
    ) -> Self {
        let dir = config.asset_dir;
        let stages = config
            .rev_stages
            .iter()
            .take(MAX_STAGES)
            .map(|stage| resolver.resolve(dir, stage.clip))
            .collect();
        Self {
            config,
            state: EngineState::EngineOff,
            timers: StateTimers::default(),
            conditioner: ThrottleConditioner::new(config.smoothing),
            gesture: GestureDetector::new(config.gesture),
            rpm: RpmModel::new(config.rpm),
            bank: VoiceBank::new(voices),
            idle: VolumeRamp::new(config.idle.normal, config.idle.ramp_speed),
            actions: ActionQueue::new(),
            long: None,
            idle_voice,
            idle_clip: resolver.resolve(dir, config.idle_clip),
            starter_clip: resolver.resolve(dir, config.starter_clip),
            stages,
            drives_idle_volume: true,
            now: SimTime::ZERO,
        }
    }

    /// Attach a long-sequence crossfade pair.
    pub fn with_long_pair(mut self, a: VoiceId, b: VoiceId, crossfade_ms: u32) -> Self {
        self.long = Some(CrossfadePair::new(a, b, crossfade_ms));
        self
    }

    pub fn with_gearbox(mut self) -> Self {
        self.rpm = RpmModel::with_gearbox(self.config.rpm);
        self
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn name(&self) -> &'static str {
        self.config.name
    }

    /// Settle voices and run deferred actions up to `now`.
    pub fn begin_tick(&mut self, now: SimTime, dt: f32) {
        self.now = now;
        self.bank.advance(now);
        self.timers.time_in_state += dt;
        while let Some(action) = self.actions.pop_due(now) {
            self.run_action(action);
        }
        if let Some(pair) = self.long.as_mut() {
            pair.update(&mut self.bank);
        }
    }

    /// Move the idle ramp and push it to the idle voice.
    pub fn end_tick(&mut self, dt: f32) {
        self.idle.advance(dt);
        if self.drives_idle_volume && self.bank.is_busy(self.idle_voice) {
            self.bank.set_volume(self.idle_voice, self.idle.current());
        }
    }

    pub fn enter(&mut self, next: EngineState) {
        if next == self.state {
            return;
        }
        log::debug!("{}: {} -> {}", self.config.name, self.state, next);
        self.state = next;
        self.timers.time_in_state = 0.0;
    }

    /// Returns false when the request did not change the target.
    pub fn set_idle_target(&mut self, volume: f32, instant: bool) -> bool {
        let changed = self.idle.set_target(volume, instant);
        if instant && self.drives_idle_volume {
            self.bank.set_volume(self.idle_voice, self.idle.current());
        }
        changed
    }

    /// Start the idle loop at the current target if it is not already running.
    pub fn play_idle(&mut self) {
        if self.bank.is_busy(self.idle_voice) {
            return;
        }
        self.idle.snap();
        self.bank.play(self.idle_voice, self.idle_clip, true, self.idle.current());
    }

    /// `(current, previous)` of the value that drives gestures and the start trigger.
    pub fn fast_throttle(&self) -> (f32, f32) {
        self.conditioner.input(self.config.gesture_input)
    }

    /// `ENGINE_OFF` handler: start on throttle above deadzone + margin.
    pub fn try_start(&mut self, starter_voice: VoiceId) -> bool {
        let (throttle, _) = self.fast_throttle();
        if throttle <= self.config.start_threshold() {
            return false;
        }
        log::info!("{}: engine starting", self.config.name);
        self.bank.play(starter_voice, self.starter_clip, false, 1.0);
        self.conditioner.zero();
        self.rpm.settle(self.now);
        self.enter(EngineState::Starting);
        true
    }

    /// `STARTING` handler: move to idle once the starter is done.
    pub fn finish_start(&mut self, starter_voice: VoiceId) -> bool {
        if self.bank.is_busy(starter_voice) {
            return false;
        }
        self.enter(EngineState::Idle);
        self.set_idle_target(self.config.idle.normal, false);
        self.play_idle();
        self.rpm.settle(self.now);
        true
    }

    /// Back to `IDLE` from a drive or launch sequence.
    pub fn return_to_idle(&mut self) {
        self.enter(EngineState::Idle);
        self.set_idle_target(self.config.idle.normal, false);
        self.play_idle();
        self.rpm.settle(self.now);
    }

    /// Feed the detector, unless `allowed` is false, in which case any open
    /// window is dropped and nothing is recognized.
    pub fn observe_gesture(&mut self, allowed: bool) -> Option<GestureResult> {
        if !allowed {
            self.gesture.cancel();
            return None;
        }
        let (current, previous) = self.fast_throttle();
        self.gesture.observe(self.now, current, previous)
    }

    /// Pick and play a staged rev on `voice`, jumping RPM to its peak.
    ///
    /// Refused while `voice` is still busy or the blip is too soft for the
    /// current RPM. A missing clip still moves the RPM.
    pub fn play_rev_stage(&mut self, voice: VoiceId, peak: f32) -> Option<RevPlayed> {
        if self.bank.is_busy(voice) {
            return None;
        }
        let stages = self.config.rev_stages;
        let stage = select_stage(stages, self.rpm.current(), self.rpm.idle(), peak)?;
        let stage = stage.min(self.stages.len().saturating_sub(1));
        let clip = self.stages.get(stage).copied().unwrap_or(ClipRef::NULL);
        let peak_rpm = stages[stage].peak_rpm;

        self.bank.play(voice, clip, false, self.config.rev_volume);
        self.rpm.apply_rev(self.now, peak_rpm, clip.duration);
        log::debug!(
            "{}: rev stage {} (peak {:.2}, {:.0} rpm)",
            self.config.name,
            stage + 1,
            peak,
            peak_rpm
        );
        Some(RevPlayed { stage, peak_rpm })
    }

    /// Start a long sequence on the crossfade pair.
    pub fn play_long(&mut self, clip: ClipRef, looping: bool, offset: f32, handoff: Handoff) {
        let Some(pair) = self.long.as_mut() else {
            return;
        };
        self.actions.cancel(|a| matches!(a, Action::PlayLong { .. }));
        match handoff {
            Handoff::Cut => {
                pair.play_from(&mut self.bank, clip, looping, offset, false);
            }
            Handoff::Crossfade => {
                pair.play_from(&mut self.bank, clip, looping, offset, true);
            }
            Handoff::StopThenPlay { fade_ms, gap_ms } => {
                pair.stop(&mut self.bank, fade_ms);
                if !clip.is_null() {
                    self.actions.push(
                        self.now.add_millis(gap_ms),
                        Action::PlayLong {
                            clip,
                            looping,
                            offset,
                        },
                    );
                }
            }
        }
    }

    /// Whether the pair is sounding or about to.
    pub fn long_busy(&self) -> bool {
        let sounding = self.long.as_ref().is_some_and(|pair| pair.is_busy(&self.bank));
        sounding || self.actions.any_pending(|a| matches!(a, Action::PlayLong { .. }))
    }

    pub fn stop_long(&mut self, fade_ms: u32) {
        self.actions.cancel(|a| matches!(a, Action::PlayLong { .. }));
        if let Some(pair) = self.long.as_mut() {
            pair.stop(&mut self.bank, fade_ms);
        }
    }

    /// Fade every voice over `fade_ms` and drop pending work.
    pub fn fade_out(&mut self, fade_ms: u32) {
        self.actions.clear();
        if let Some(pair) = self.long.as_mut() {
            pair.reset();
        }
        self.bank.fade_all(fade_ms);
    }

    /// Advance voices only; the state machine is frozen.
    pub fn advance_audio(&mut self, now: SimTime) {
        self.now = now;
        self.bank.advance(now);
    }

    /// Back to `ENGINE_OFF`, silent, with fresh timers. The conditioner
    /// keeps its history.
    pub fn reset(&mut self) {
        self.bank.stop_all();
        self.actions.clear();
        if let Some(pair) = self.long.as_mut() {
            pair.reset();
        }
        self.gesture.reset();
        self.rpm.reset();
        self.idle = VolumeRamp::new(self.config.idle.normal, self.config.idle.ramp_speed);
        self.timers = StateTimers::default();
        self.state = EngineState::EngineOff;
    }

    pub fn snapshot(&self) -> Snapshot {
        let window = self.gesture.window();
        Snapshot {
            time: self.now,
            profile: self.config.name,
            state: self.state,
            time_in_state: self.timers.time_in_state,
            raw_throttle: self.conditioner.raw(),
            smoothed_throttle: self.conditioner.smoothed(),
            rpm: self.rpm.current(),
            gear: self.rpm.gear(),
            idle_volume: self.bank.volume(self.idle_voice),
            idle_target: self.idle.target(),
            gesture_open: window.active,
            gesture_peak: if window.active { window.peak } else { 0.0 },
            lockout_remaining: self.gesture.lockout_remaining(self.now),
            switching: false,
            shutting_down: false,
            voices: self.bank.statuses(),
        }
    }

    fn run_action(&mut self, action: Action) {
        match action {
            Action::Play {
                voice,
                clip,
                looping,
                volume,
            } => {
                self.bank.play(voice, clip, looping, volume);
            }
            Action::PlayLong {
                clip,
                looping,
                offset,
            } => {
                if let Some(pair) = self.long.as_mut() {
                    pair.play_from(&mut self.bank, clip, looping, offset, false);
                }
            }
            Action::Stop { voice, fade_ms } => self.bank.stop(voice, fade_ms),
        }
    }
}
