//! One-shot SFX requests queued behind a busy voice.

use heapless::Deque;
use rb_ir::ClipRef;

use crate::voice_bank::{VoiceBank, VoiceId};

/// Outcome of [`SfxQueue::request`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SfxOutcome {
    Played,
    Queued,
    /// Queue full, or the clip is unavailable.
    Dropped,
}

/// Up to `N` pending one-shots for a single voice, played in order.
#[derive(Clone, Debug, Default)]
pub struct SfxQueue<const N: usize> {
    pending: Deque<(ClipRef, f32), N>,
}

impl<const N: usize> SfxQueue<N> {
    pub fn new() -> Self {
        Self {
            pending: Deque::new(),
        }
    }

    /// Play now if the voice is free and nothing is waiting, else queue.
    pub fn request(&mut self, bank: &mut VoiceBank, voice: VoiceId, clip: ClipRef, volume: f32) -> SfxOutcome {
        if clip.is_null() {
            return SfxOutcome::Dropped;
        }
        if self.pending.is_empty() && !bank.is_busy(voice) {
            bank.play(voice, clip, false, volume);
            return SfxOutcome::Played;
        }
        match self.pending.push_back((clip, volume)) {
            Ok(()) => SfxOutcome::Queued,
            Err(_) => {
                log::debug!("sfx queue full, dropping request");
                SfxOutcome::Dropped
            }
        }
    }

    /// Start the next queued one-shot once the voice is free.
    pub fn pump(&mut self, bank: &mut VoiceBank, voice: VoiceId) -> bool {
        if bank.is_busy(voice) {
            return false;
        }
        match self.pending.pop_front() {
            Some((clip, volume)) => bank.play(voice, clip, false, volume),
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
