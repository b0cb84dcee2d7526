//! VoiceBank: the fixed set of logical voices owned by one profile.

use arrayvec::ArrayVec;
use rb_ir::{ClipKey, ClipRef, SimTime, VoiceStatus, MAX_VOICES};

use crate::voice::{Chained, Voice, VoiceState};

/// Index of a voice within its bank.
pub type VoiceId = usize;

/// Statically assigned playback slots.
///
/// All commands act at the time last passed to [`advance`](VoiceBank::advance).
/// Out-of-range ids are ignored.
#[derive(Clone, Debug)]
pub struct VoiceBank {
    voices: ArrayVec<Voice, MAX_VOICES>,
    now: SimTime,
}

impl VoiceBank {
    /// Create a bank with `count` voices (capped at [`MAX_VOICES`]).
    pub fn new(count: usize) -> Self {
        Self {
            voices: (0..count.min(MAX_VOICES)).map(|_| Voice::default()).collect(),
            now: SimTime::ZERO,
        }
    }

    /// Move the bank clock forward, settling fades and finished clips.
    pub fn advance(&mut self, now: SimTime) {
        self.now = now;
        for voice in &mut self.voices {
            voice.advance(now);
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Play from the start. A null clip leaves the voice untouched and
    /// returns false.
    pub fn play(&mut self, id: VoiceId, clip: ClipRef, looping: bool, volume: f32) -> bool {
        self.play_from(id, clip, looping, volume, 0.0)
    }

    /// Play skipping the first `offset` seconds of the clip.
    pub fn play_from(&mut self, id: VoiceId, clip: ClipRef, looping: bool, volume: f32, offset: f32) -> bool {
        if clip.is_null() {
            return false;
        }
        let now = self.now;
        match self.voices.get_mut(id) {
            Some(voice) => {
                voice.start(now, clip, looping, volume, offset);
                true
            }
            None => false,
        }
    }

    /// Queue `clip` to start on `id` as soon as the current clip ends,
    /// or start it now if the voice is free.
    pub fn chain(&mut self, id: VoiceId, clip: ClipRef, looping: bool) {
        if clip.is_null() {
            return;
        }
        if !self.is_busy(id) {
            self.play(id, clip, looping, 1.0);
            return;
        }
        if let Some(voice) = self.voices.get_mut(id) {
            voice.chained = Some(Chained { clip, looping });
        }
    }

    /// Stop a voice, immediately (`fade_ms == 0`) or with a linear fade.
    /// Stopping an idle voice does nothing.
    pub fn stop(&mut self, id: VoiceId, fade_ms: u32) {
        let now = self.now;
        if let Some(voice) = self.voices.get_mut(id) {
            voice.fade_out(now, fade_ms);
        }
    }

    pub fn stop_all(&mut self) {
        for voice in &mut self.voices {
            voice.stop();
        }
    }

    /// Fade every sounding voice to silence over `fade_ms`.
    pub fn fade_all(&mut self, fade_ms: u32) {
        let now = self.now;
        for voice in &mut self.voices {
            voice.fade_out(now, fade_ms);
        }
    }

    pub fn is_busy(&self, id: VoiceId) -> bool {
        self.voices.get(id).is_some_and(|v| v.is_busy(self.now))
    }

    /// Busy with exactly this clip. A voice playing something else
    /// counts as available for the caller's purposes.
    pub fn is_playing(&self, id: VoiceId, clip: ClipRef) -> bool {
        clip.key.is_some()
            && self.is_busy(id)
            && self.voices.get(id).is_some_and(|v| v.clip == clip.key)
    }

    pub fn is_fading(&self, id: VoiceId) -> bool {
        self.voices.get(id).is_some_and(|v| v.state == VoiceState::Fading)
    }

    pub fn any_busy(&self) -> bool {
        (0..self.voices.len()).any(|id| self.is_busy(id))
    }

    /// Set the gain of a sounding voice (cancels a fade).
    pub fn set_volume(&mut self, id: VoiceId, volume: f32) {
        if let Some(voice) = self.voices.get_mut(id) {
            voice.set_volume(volume);
        }
    }

    pub fn volume(&self, id: VoiceId) -> f32 {
        self.voices.get(id).map_or(0.0, |v| v.volume)
    }

    pub fn current_clip(&self, id: VoiceId) -> Option<ClipKey> {
        self.voices.get(id).and_then(|v| v.clip)
    }

    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }

    /// Telemetry view of every voice.
    pub fn statuses(&self) -> ArrayVec<VoiceStatus, MAX_VOICES> {
        self.voices
            .iter()
            .map(|v| VoiceStatus {
                busy: v.is_busy(self.now),
                clip: v.clip,
                volume: v.volume,
            })
            .collect()
    }
}
