//! Voice: one exclusive clip playback slot with explicit, owned state.

use rb_ir::{ClipKey, ClipRef, SimTime};

/// Voice lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// Nothing assigned.
    #[default]
    Idle,
    /// Playing at `volume`.
    Playing,
    /// Ramping to silence; stops when the fade completes.
    Fading,
}

/// An in-progress fade to silence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fade {
    pub from: f32,
    pub start: SimTime,
    pub duration_ms: u32,
}

impl Fade {
    /// Gain at `now`, or `None` once the fade has completed.
    fn gain_at(&self, now: SimTime) -> Option<f32> {
        let elapsed = now.micros.saturating_sub(self.start.micros);
        let total = self.duration_ms as u64 * 1000;
        if elapsed >= total {
            None
        } else {
            Some(self.from * (1.0 - elapsed as f32 / total as f32))
        }
    }

    fn end(&self) -> SimTime {
        self.start.add_millis(self.duration_ms)
    }
}

/// A clip to start on the same voice the moment the current one ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chained {
    pub clip: ClipRef,
    pub looping: bool,
}

/// A logical playback slot.
///
/// Busy-ness is derived from the voice's own record of what it was asked
/// to play and when that ends, never from polling the audio backend.
#[derive(Clone, Debug, Default)]
pub struct Voice {
    pub clip: Option<ClipKey>,
    pub looping: bool,
    pub started_at: SimTime,
    /// Seconds of leading audio skipped
    pub offset: f32,
    /// Clip length in seconds
    pub duration: f32,
    /// When a one-shot finishes (ignored while looping)
    pub expires_at: SimTime,
    /// Current gain (0.0-1.0)
    pub volume: f32,
    pub state: VoiceState,
    pub fade: Option<Fade>,
    pub chained: Option<Chained>,
}

impl Voice {
    /// Start `clip` now. Any previous clip and pending follow-up are dropped.
    pub fn start(&mut self, now: SimTime, clip: ClipRef, looping: bool, volume: f32, offset: f32) {
        let Some(key) = clip.key else {
            return;
        };
        let offset = offset.clamp(0.0, clip.duration);
        self.clip = Some(key);
        self.looping = looping;
        self.started_at = now;
        self.offset = offset;
        self.duration = clip.duration;
        self.expires_at = now.add_secs(clip.duration - offset);
        self.volume = volume.clamp(0.0, 1.0);
        self.state = VoiceState::Playing;
        self.fade = None;
        self.chained = None;
    }

    /// Silence immediately.
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    /// Fade from the current volume to silence over `ms`, then stop.
    /// An already running fade is never lengthened.
    pub fn fade_out(&mut self, now: SimTime, ms: u32) {
        if self.state == VoiceState::Idle {
            return;
        }
        if ms == 0 {
            self.stop();
            return;
        }
        if let Some(fade) = self.fade {
            if fade.end() <= now.add_millis(ms) {
                return;
            }
        }
        self.fade = Some(Fade {
            from: self.volume,
            start: now,
            duration_ms: ms,
        });
        self.state = VoiceState::Fading;
        self.chained = None;
    }

    /// Set the gain, cancelling any fade.
    pub fn set_volume(&mut self, volume: f32) {
        if self.state == VoiceState::Idle {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        if self.fade.take().is_some() {
            self.state = VoiceState::Playing;
        }
    }

    pub fn is_busy(&self, now: SimTime) -> bool {
        match self.state {
            VoiceState::Idle => false,
            _ => self.looping || now < self.expires_at || self.chained.is_some(),
        }
    }

    /// Apply fades, expiry and chained follow-ups up to `now`.
    pub fn advance(&mut self, now: SimTime) {
        if let Some(fade) = self.fade {
            match fade.gain_at(now) {
                Some(gain) => self.volume = gain,
                None => {
                    self.stop();
                    return;
                }
            }
        }

        if self.state == VoiceState::Idle || self.looping || now < self.expires_at {
            return;
        }

        match self.chained.take() {
            Some(next) if next.clip.key.is_some() => {
                let at = self.expires_at;
                let volume = self.volume;
                self.start(at, next.clip, next.looping, volume, 0.0);
            }
            _ => self.stop(),
        }
    }

    /// Seconds into the clip at time `t`, or `None` when silent.
    pub fn playhead(&self, t: SimTime) -> Option<f64> {
        if self.state == VoiceState::Idle || t < self.started_at {
            return None;
        }
        let pos = t.secs_since(self.started_at) as f64 + self.offset as f64;
        let len = self.duration as f64;
        if len <= 0.0 {
            return None;
        }
        if self.looping {
            Some(pos % len)
        } else if pos < len {
            Some(pos)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_ir::{Clip, ClipBank};

    fn clip(bank: &mut ClipBank, secs: f32) -> ClipRef {
        bank.insert(Clip::silence("c", secs, 100))
    }

    #[test]
    fn one_shot_expires() {
        let mut bank = ClipBank::new();
        let c = clip(&mut bank, 1.0);
        let mut v = Voice::default();
        v.start(SimTime::ZERO, c, false, 1.0, 0.0);
        assert!(v.is_busy(SimTime::from_secs(0.5)));
        v.advance(SimTime::from_secs(1.0));
        assert!(!v.is_busy(SimTime::from_secs(1.0)));
        assert_eq!(v.state, VoiceState::Idle);
    }

    #[test]
    fn loop_stays_busy() {
        let mut bank = ClipBank::new();
        let c = clip(&mut bank, 1.0);
        let mut v = Voice::default();
        v.start(SimTime::ZERO, c, true, 1.0, 0.0);
        v.advance(SimTime::from_secs(5.0));
        assert!(v.is_busy(SimTime::from_secs(5.0)));
        let pos = v.playhead(SimTime::from_secs(2.25)).unwrap();
        assert!((pos - 0.25).abs() < 1e-6);
    }

    #[test]
    fn null_clip_is_noop() {
        let mut v = Voice::default();
        v.start(SimTime::ZERO, ClipRef::NULL, false, 1.0, 0.0);
        assert_eq!(v.state, VoiceState::Idle);
    }

    #[test]
    fn offset_shortens_expiry() {
        let mut bank = ClipBank::new();
        let c = clip(&mut bank, 2.0);
        let mut v = Voice::default();
        v.start(SimTime::ZERO, c, false, 1.0, 0.5);
        assert_eq!(v.expires_at, SimTime::from_secs(1.5));
        let pos = v.playhead(SimTime::ZERO).unwrap();
        assert!((pos - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fade_reaches_silence_then_stops() {
        let mut bank = ClipBank::new();
        let c = clip(&mut bank, 10.0);
        let mut v = Voice::default();
        v.start(SimTime::ZERO, c, true, 0.8, 0.0);
        v.fade_out(SimTime::ZERO, 100);
        v.advance(SimTime::from_millis(50));
        assert!((v.volume - 0.4).abs() < 1e-3);
        assert!(v.is_busy(SimTime::from_millis(50)));
        v.advance(SimTime::from_millis(100));
        assert_eq!(v.state, VoiceState::Idle);
        assert_eq!(v.volume, 0.0);
    }

    #[test]
    fn second_fade_does_not_lengthen() {
        let mut bank = ClipBank::new();
        let c = clip(&mut bank, 10.0);
        let mut v = Voice::default();
        v.start(SimTime::ZERO, c, true, 1.0, 0.0);
        v.fade_out(SimTime::ZERO, 100);
        v.fade_out(SimTime::from_millis(50), 800);
        v.advance(SimTime::from_millis(100));
        assert_eq!(v.state, VoiceState::Idle);
    }

    #[test]
    fn chained_clip_starts_at_expiry() {
        let mut bank = ClipBank::new();
        let engage = clip(&mut bank, 1.0);
        let hold = clip(&mut bank, 0.5);
        let mut v = Voice::default();
        v.start(SimTime::ZERO, engage, false, 1.0, 0.0);
        v.chained = Some(Chained { clip: hold, looping: true });
        v.advance(SimTime::from_secs(1.02));
        assert_eq!(v.clip, hold.key);
        assert!(v.looping);
        assert_eq!(v.started_at, SimTime::from_secs(1.0));
    }
}
