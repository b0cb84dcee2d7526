//! Throttle conditioning: clamping, bounded history and smoothing.

use heapless::Deque;
use rb_ir::{clamp_unit, GestureInput, Smoothing, ThrottleSample};

/// Capacity of the raw sample history.
pub const HISTORY_LEN: usize = 20;

/// Turns raw calibrated samples into a stable [0, 1] value.
#[derive(Clone, Debug)]
pub struct ThrottleConditioner {
    history: Deque<f32, HISTORY_LEN>,
    smoothing: Smoothing,
    ema: Option<f32>,
    raw: f32,
    prev_raw: f32,
    smoothed: f32,
    prev_smoothed: f32,
}

impl ThrottleConditioner {
    pub fn new(smoothing: Smoothing) -> Self {
        Self {
            history: Deque::new(),
            smoothing,
            ema: None,
            raw: 0.0,
            prev_raw: 0.0,
            smoothed: 0.0,
            prev_smoothed: 0.0,
        }
    }

    /// Record a sample and return the smoothed value.
    pub fn condition(&mut self, sample: ThrottleSample) -> f32 {
        self.update(clamp_unit(sample.raw))
    }

    /// Force the throttle to read closed, e.g. right after the engine starts
    /// so the starting blip does not immediately register as a rev.
    pub fn zero(&mut self) {
        self.ema = None;
        self.update(0.0);
    }

    /// Drop all history.
    pub fn reset(&mut self) {
        *self = Self::new(self.smoothing);
    }

    /// Last raw sample.
    pub fn raw(&self) -> f32 {
        self.raw
    }

    pub fn previous_raw(&self) -> f32 {
        self.prev_raw
    }

    /// Last smoothed value.
    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    pub fn previous_smoothed(&self) -> f32 {
        self.prev_smoothed
    }

    /// `(current, previous)` of the value selected by `input`.
    pub fn input(&self, input: GestureInput) -> (f32, f32) {
        match input {
            GestureInput::Smoothed => (self.smoothed, self.prev_smoothed),
            GestureInput::Raw => (self.raw, self.prev_raw),
        }
    }

    /// Per-tick change of the raw value.
    pub fn load(&self) -> f32 {
        self.raw - self.prev_raw
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Smallest and largest raw sample held.
    pub fn history_range(&self) -> (f32, f32) {
        self.history
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    fn update(&mut self, raw: f32) -> f32 {
        if self.history.is_full() {
            self.history.pop_front();
        }
        // Capacity was just ensured above.
        let _ = self.history.push_back(raw);

        self.prev_raw = self.raw;
        self.raw = raw;
        self.prev_smoothed = self.smoothed;
        self.smoothed = match self.smoothing {
            Smoothing::Mean { window } => self.mean_of_last(window),
            Smoothing::Ema { alpha } => {
                let alpha = alpha.clamp(0.0, 1.0);
                let ema = match self.ema {
                    Some(prev) => alpha * raw + (1.0 - alpha) * prev,
                    None => raw,
                };
                self.ema = Some(ema);
                let (lo, hi) = self.history_range();
                ema.clamp(lo, hi)
            }
        };
        self.smoothed = clamp_unit(self.smoothed);
        self.smoothed
    }

    fn mean_of_last(&self, window: usize) -> f32 {
        let len = self.history.len();
        let n = window.clamp(1, HISTORY_LEN).min(len);
        if n == 0 {
            return 0.0;
        }
        let sum: f32 = self.history.iter().skip(len - n).sum();
        sum / n as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_ir::SimTime;

    fn feed(c: &mut ThrottleConditioner, values: &[f32]) -> f32 {
        let mut out = 0.0;
        for &v in values {
            out = c.condition(ThrottleSample::new(SimTime::ZERO, v));
        }
        out
    }

    #[test]
    fn mean_uses_last_window_samples() {
        let mut c = ThrottleConditioner::new(Smoothing::Mean { window: 5 });
        let out = feed(&mut c, &[1.0, 1.0, 0.0, 0.0, 0.0, 0.5, 0.5]);
        // Last five: 0, 0, 0, 0.5, 0.5
        assert!((out - 0.2).abs() < 1e-6);
    }

    #[test]
    fn mean_with_short_history() {
        let mut c = ThrottleConditioner::new(Smoothing::Mean { window: 5 });
        let out = feed(&mut c, &[0.4, 0.8]);
        assert!((out - 0.6).abs() < 1e-6);
    }

    #[test]
    fn raw_is_clamped() {
        let mut c = ThrottleConditioner::new(Smoothing::Mean { window: 1 });
        assert_eq!(feed(&mut c, &[3.0]), 1.0);
        assert_eq!(feed(&mut c, &[-1.0]), 0.0);
    }

    #[test]
    fn history_is_bounded() {
        let mut c = ThrottleConditioner::new(Smoothing::Mean { window: 5 });
        for i in 0..50 {
            feed(&mut c, &[(i % 10) as f32 / 10.0]);
        }
        assert_eq!(c.len(), HISTORY_LEN);
    }

    #[test]
    fn ema_tracks_input() {
        let mut c = ThrottleConditioner::new(Smoothing::Ema { alpha: 0.3 });
        feed(&mut c, &[0.0]);
        let out = feed(&mut c, &[1.0]);
        assert!((out - 0.3).abs() < 1e-6);
        assert_eq!(c.raw(), 1.0);
        assert_eq!(c.previous_raw(), 0.0);
    }

    #[test]
    fn ema_stays_inside_history_range() {
        let mut c = ThrottleConditioner::new(Smoothing::Ema { alpha: 0.2 });
        feed(&mut c, &[0.0; 5]);
        for _ in 0..HISTORY_LEN {
            let out = feed(&mut c, &[0.5]);
            let (lo, hi) = c.history_range();
            assert!(out >= lo && out <= hi, "{out} outside [{lo}, {hi}]");
        }
        // History is all 0.5 now, so the lagging average is pulled up to it.
        assert_eq!(c.smoothed(), 0.5);
    }

    #[test]
    fn zero_resets_smoothing() {
        let mut c = ThrottleConditioner::new(Smoothing::Ema { alpha: 0.2 });
        feed(&mut c, &[0.6, 0.6, 0.6]);
        c.zero();
        assert_eq!(c.raw(), 0.0);
        assert_eq!(c.smoothed(), 0.0);
    }

    #[test]
    fn input_selects_raw_or_smoothed() {
        let mut c = ThrottleConditioner::new(Smoothing::Mean { window: 2 });
        feed(&mut c, &[0.0, 0.4]);
        assert_eq!(c.input(GestureInput::Raw), (0.4, 0.0));
        let (cur, prev) = c.input(GestureInput::Smoothed);
        assert!((cur - 0.2).abs() < 1e-6);
        assert_eq!(prev, 0.0);
    }
}
