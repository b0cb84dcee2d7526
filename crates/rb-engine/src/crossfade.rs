//! Two-voice crossfade pair for long sequences.

use rb_ir::{ClipRef, SimTime};

use crate::voice_bank::{VoiceBank, VoiceId};

/// A hand-off in progress between the two voices of a pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrossfadeTransition {
    pub voice_out: VoiceId,
    pub voice_in: VoiceId,
    pub start: SimTime,
    pub duration_ms: u32,
}

impl CrossfadeTransition {
    /// Progress in [0, 1].
    pub fn progress(&self, now: SimTime) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now.micros.saturating_sub(self.start.micros) as f32;
        (elapsed / (self.duration_ms as f32 * 1000.0)).min(1.0)
    }
}

/// Long sequences alternate between voices `a` and `b`.
///
/// At most one [`CrossfadeTransition`] exists per pair; starting another
/// replaces it.
#[derive(Clone, Debug)]
pub struct CrossfadePair {
    a: VoiceId,
    b: VoiceId,
    active: VoiceId,
    duration_ms: u32,
    transition: Option<CrossfadeTransition>,
}

impl CrossfadePair {
    pub fn new(a: VoiceId, b: VoiceId, duration_ms: u32) -> Self {
        Self {
            a,
            b,
            active: a,
            duration_ms,
            transition: None,
        }
    }

    pub fn active(&self) -> VoiceId {
        self.active
    }

    pub fn voices(&self) -> [VoiceId; 2] {
        [self.a, self.b]
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    pub fn transition(&self) -> Option<&CrossfadeTransition> {
        self.transition.as_ref()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn is_busy(&self, bank: &VoiceBank) -> bool {
        bank.is_busy(self.a) || bank.is_busy(self.b)
    }

    /// Clip currently playing on the active voice.
    pub fn is_playing(&self, bank: &VoiceBank, clip: ClipRef) -> bool {
        bank.is_playing(self.active, clip)
    }

    pub fn play(&mut self, bank: &mut VoiceBank, clip: ClipRef, looping: bool, transition: bool) -> bool {
        self.play_from(bank, clip, looping, 0.0, transition)
    }

    /// Start `clip` on the pair.
    ///
    /// With `transition`, the sounding voice fades out while the other one
    /// fades in from silence and becomes active. Without it, the inactive
    /// voice is cut and the clip starts at full volume on the active voice.
    /// A null clip does nothing.
    pub fn play_from(
        &mut self,
        bank: &mut VoiceBank,
        clip: ClipRef,
        looping: bool,
        offset: f32,
        transition: bool,
    ) -> bool {
        if clip.is_null() {
            return false;
        }
        if transition && self.duration_ms > 0 && bank.is_busy(self.active) {
            let voice_out = self.active;
            let voice_in = self.other(voice_out);
            bank.stop(voice_out, self.duration_ms);
            bank.play_from(voice_in, clip, looping, 0.0, offset);
            self.active = voice_in;
            self.transition = Some(CrossfadeTransition {
                voice_out,
                voice_in,
                start: bank.now(),
                duration_ms: self.duration_ms,
            });
        } else {
            self.transition = None;
            bank.stop(self.other(self.active), 0);
            bank.play_from(self.active, clip, looping, 1.0, offset);
        }
        true
    }

    /// Advance the fade-in of the incoming voice.
    pub fn update(&mut self, bank: &mut VoiceBank) {
        let Some(t) = self.transition else {
            return;
        };
        let progress = t.progress(bank.now());
        bank.set_volume(t.voice_in, progress);
        if progress >= 1.0 {
            self.transition = None;
        }
    }

    /// Stop both voices.
    pub fn stop(&mut self, bank: &mut VoiceBank, fade_ms: u32) {
        self.transition = None;
        bank.stop(self.a, fade_ms);
        bank.stop(self.b, fade_ms);
    }

    pub fn reset(&mut self) {
        self.active = self.a;
        self.transition = None;
    }

    fn other(&self, id: VoiceId) -> VoiceId {
        if id == self.a {
            self.b
        } else {
            self.a
        }
    }
}
