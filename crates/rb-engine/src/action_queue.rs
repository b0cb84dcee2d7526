//! Deferred playback actions.
//!
//! Stop-then-play hand-offs arm an action here instead of sleeping on the
//! tick thread; the owning engine drains due actions at the start of each
//! tick.

use arrayvec::ArrayVec;
use rb_ir::{ClipRef, SimTime};

use crate::voice_bank::VoiceId;

/// Maximum pending actions per profile.
pub const MAX_ACTIONS: usize = 8;

/// What to do when a deferred action comes due.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    /// Start a clip on a specific voice.
    Play {
        voice: VoiceId,
        clip: ClipRef,
        looping: bool,
        volume: f32,
    },
    /// Start a clip on the long-sequence crossfade pair, without transition.
    PlayLong {
        clip: ClipRef,
        looping: bool,
        offset: f32,
    },
    Stop { voice: VoiceId, fade_ms: u32 },
}

/// An action and the time it comes due.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledAction {
    pub due: SimTime,
    pub action: Action,
}

/// Fixed-capacity queue sorted by due time. Equal times keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct ActionQueue {
    actions: ArrayVec<ScheduledAction, MAX_ACTIONS>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `action` for `due`. Returns false (and drops it) when full.
    pub fn push(&mut self, due: SimTime, action: Action) -> bool {
        let pos = self.actions.partition_point(|a| a.due <= due);
        match self.actions.try_insert(pos, ScheduledAction { due, action }) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("deferred action queue full, dropping {:?}", action);
                false
            }
        }
    }

    /// Pop the earliest action due at or before `now`.
    pub fn pop_due(&mut self, now: SimTime) -> Option<Action> {
        match self.actions.first() {
            Some(first) if first.due <= now => Some(self.actions.remove(0).action),
            _ => None,
        }
    }

    /// Whether a pending action matches `f`.
    pub fn any_pending<F: Fn(&Action) -> bool>(&self, f: F) -> bool {
        self.actions.iter().any(|a| f(&a.action))
    }

    /// Drop every pending action matching `f`.
    pub fn cancel<F: Fn(&Action) -> bool>(&mut self, f: F) {
        self.actions.retain(|a| !f(&a.action));
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(voice: VoiceId) -> Action {
        Action::Stop { voice, fade_ms: 0 }
    }

    #[test]
    fn pops_in_due_order() {
        let mut q = ActionQueue::new();
        q.push(SimTime::from_millis(30), stop(3));
        q.push(SimTime::from_millis(10), stop(1));
        q.push(SimTime::from_millis(20), stop(2));

        let now = SimTime::from_millis(100);
        assert_eq!(q.pop_due(now), Some(stop(1)));
        assert_eq!(q.pop_due(now), Some(stop(2)));
        assert_eq!(q.pop_due(now), Some(stop(3)));
        assert_eq!(q.pop_due(now), None);
    }

    #[test]
    fn not_due_yet() {
        let mut q = ActionQueue::new();
        q.push(SimTime::from_millis(50), stop(0));
        assert_eq!(q.pop_due(SimTime::from_millis(49)), None);
        assert_eq!(q.pop_due(SimTime::from_millis(50)), Some(stop(0)));
    }

    #[test]
    fn equal_due_keeps_insertion_order() {
        let mut q = ActionQueue::new();
        let t = SimTime::from_millis(5);
        q.push(t, stop(7));
        q.push(t, stop(8));
        assert_eq!(q.pop_due(t), Some(stop(7)));
        assert_eq!(q.pop_due(t), Some(stop(8)));
    }

    #[test]
    fn full_queue_drops() {
        let mut q = ActionQueue::new();
        for i in 0..MAX_ACTIONS {
            assert!(q.push(SimTime::from_millis(i as u64), stop(i)));
        }
        assert!(!q.push(SimTime::ZERO, stop(99)));
        assert_eq!(q.len(), MAX_ACTIONS);
    }

    #[test]
    fn cancel_matching() {
        let mut q = ActionQueue::new();
        q.push(SimTime::ZERO, stop(1));
        q.push(
            SimTime::ZERO,
            Action::PlayLong {
                clip: ClipRef::NULL,
                looping: false,
                offset: 0.0,
            },
        );
        assert!(q.any_pending(|a| matches!(a, Action::PlayLong { .. })));
        q.cancel(|a| matches!(a, Action::PlayLong { .. }));
        assert!(!q.any_pending(|a| matches!(a, Action::PlayLong { .. })));
        assert_eq!(q.len(), 1);
    }
}
