//! The trait every vehicle profile implements.

use rb_ir::{EngineState, SimTime, Snapshot, ThrottleSample};

use crate::engine_core::EngineCore;
use crate::voice_bank::VoiceBank;

/// A vehicle-specific engine state machine driving its own voices.
///
/// Implementors own an [`EngineCore`] and supply the transition logic in
/// [`update`](EngineProfile::update); everything else has a default that
/// forwards to the core.
pub trait EngineProfile: Send {
    fn core(&self) -> &EngineCore;
    fn core_mut(&mut self) -> &mut EngineCore;

    /// Run one tick of the state machine. The sample for this tick has
    /// already gone through [`condition`](EngineProfile::condition).
    fn update(&mut self, now: SimTime, dt: f32);

    /// Return to `ENGINE_OFF` with every voice silent.
    fn reset(&mut self) {
        self.core_mut().reset();
    }

    fn name(&self) -> &'static str {
        self.core().name()
    }

    fn state(&self) -> EngineState {
        self.core().state
    }

    fn condition(&mut self, sample: ThrottleSample) -> f32 {
        self.core_mut().conditioner.condition(sample)
    }

    /// Condition `sample` and run the state machine.
    fn tick(&mut self, now: SimTime, dt: f32, sample: ThrottleSample) {
        self.condition(sample);
        self.update(now, dt);
    }

    /// Let fades and expiries progress without touching the state machine.
    fn advance_audio(&mut self, now: SimTime) {
        self.core_mut().advance_audio(now);
    }

    fn fade_out(&mut self, fade_ms: u32) {
        self.core_mut().fade_out(fade_ms);
    }

    fn stop_all(&mut self) {
        self.core_mut().bank.stop_all();
    }

    fn snapshot(&self) -> Snapshot {
        self.core().snapshot()
    }

    fn voices(&self) -> &VoiceBank {
        &self.core().bank
    }
}
