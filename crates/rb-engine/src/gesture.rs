//! Blip recognition: rise from idle, peak, fall back near idle.

use rb_ir::{GestureConfig, SimTime};

/// The single open (or most recently closed) gesture window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureWindow {
    pub active: bool,
    pub start: SimTime,
    pub peak: f32,
    /// No window opens before this time
    pub lockout_until: SimTime,
}

/// A recognized blip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureResult {
    pub peak: f32,
}

/// Recognizes bounded rise-then-fall throttle patterns.
///
/// The detector holds at most one window. Callers are expected to
/// [`cancel`](GestureDetector::cancel) it whenever something with higher
/// priority (a drive sequence, launch control) takes over.
#[derive(Clone, Debug)]
pub struct GestureDetector {
    config: GestureConfig,
    window: GestureWindow,
}

impl GestureDetector {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            window: GestureWindow::default(),
        }
    }

    /// Feed one sample. `previous` is the sample from the tick before.
    pub fn observe(&mut self, now: SimTime, current: f32, previous: f32) -> Option<GestureResult> {
        let cfg = &self.config;
        let window = &mut self.window;

        if !window.active {
            if now >= window.lockout_until
                && current > cfg.open_threshold
                && previous <= cfg.prior_max
            {
                window.active = true;
                window.start = now;
                window.peak = current;
            }
            return None;
        }

        window.peak = window.peak.max(current);

        if now.secs_since(window.start) > cfg.window {
            window.active = false;
            return None;
        }

        let fallen = current < window.peak * cfg.fall_ratio && current <= cfg.near_idle;
        let falling = !cfg.require_decreasing || current < previous;
        if !(fallen && falling) {
            return None;
        }

        window.active = false;
        if window.peak <= cfg.min_peak {
            log::trace!("gesture dropped, peak {:.3} below threshold", window.peak);
            return None;
        }
        window.lockout_until = now.add_secs(cfg.lockout);
        Some(GestureResult { peak: window.peak })
    }

    /// Close an open window without a result. Lockout is unaffected.
    pub fn cancel(&mut self) {
        self.window.active = false;
    }

    /// Forget everything, including the lockout.
    pub fn reset(&mut self) {
        self.window = GestureWindow::default();
    }

    pub fn is_open(&self) -> bool {
        self.window.active
    }

    pub fn window(&self) -> &GestureWindow {
        &self.window
    }

    /// True until `lockout_until`.
    pub fn in_lockout(&self, now: SimTime) -> bool {
        now < self.window.lockout_until
    }

    pub fn lockout_remaining(&self, now: SimTime) -> f32 {
        self.window.lockout_until.secs_since(now)
    }

    /// Seconds since the lockout began, or `None` if no gesture resolved yet.
    pub fn secs_since_resolution(&self, now: SimTime) -> Option<f32> {
        if self.window.lockout_until == SimTime::ZERO {
            return None;
        }
        let resolved_at = self.window.lockout_until.micros
            .saturating_sub(SimTime::from_secs(self.config.lockout).micros);
        Some(now.secs_since(SimTime::from_micros(resolved_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: f32 = 1.0 / 60.0;

    fn config() -> GestureConfig {
        GestureConfig {
            window: 0.75,
            lockout: 0.3,
            open_threshold: 0.05,
            prior_max: 0.05,
            fall_ratio: 0.7,
            near_idle: 0.075,
            min_peak: 0.07,
            require_decreasing: true,
        }
    }

    /// Feeds `values` one tick apart starting at `start`, returning every
    /// result and the time after the last sample.
    fn run(det: &mut GestureDetector, start: SimTime, values: &[f32]) -> (Vec<GestureResult>, SimTime) {
        let mut now = start;
        let mut prev = 0.0;
        let mut results = Vec::new();
        for &v in values {
            if let Some(r) = det.observe(now, v, prev) {
                results.push(r);
            }
            prev = v;
            now = now.add_secs(TICK);
        }
        (results, now)
    }

    #[test]
    fn blip_resolves_with_peak() {
        let mut det = GestureDetector::new(config());
        let (results, _) = run(&mut det, SimTime::ZERO, &[0.0, 0.1, 0.3, 0.4, 0.2, 0.06, 0.0]);
        assert_eq!(results.len(), 1);
        assert!((results[0].peak - 0.4).abs() < 1e-6);
        assert!(!det.is_open());
    }

    #[test]
    fn sustained_input_times_out() {
        let mut det = GestureDetector::new(config());
        let mut values = vec![0.0, 0.5];
        values.extend(core::iter::repeat(0.5).take(60));
        values.extend([0.2, 0.0]);
        let (results, _) = run(&mut det, SimTime::ZERO, &values);
        assert!(results.is_empty());
    }

    #[test]
    fn lockout_suppresses_second_blip() {
        let mut det = GestureDetector::new(config());
        let blip = [0.0, 0.3, 0.5, 0.2, 0.05, 0.0];
        let (first, now) = run(&mut det, SimTime::ZERO, &blip);
        assert_eq!(first.len(), 1);
        let (second, _) = run(&mut det, now, &blip);
        assert!(second.is_empty());
        assert!(!det.is_open());
    }

    #[test]
    fn blip_after_lockout_is_recognized() {
        let mut det = GestureDetector::new(config());
        let blip = [0.0, 0.3, 0.5, 0.2, 0.05, 0.0];
        let (_, now) = run(&mut det, SimTime::ZERO, &blip);
        let (second, _) = run(&mut det, now.add_secs(0.5), &blip);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn small_peak_is_discarded_without_lockout() {
        let mut det = GestureDetector::new(config());
        let (results, now) = run(&mut det, SimTime::ZERO, &[0.0, 0.06, 0.065, 0.04, 0.0]);
        assert!(results.is_empty());
        assert!(!det.is_open());
        assert!(!det.in_lockout(now));
    }

    #[test]
    fn cancel_closes_window() {
        let mut det = GestureDetector::new(config());
        det.observe(SimTime::ZERO, 0.3, 0.0);
        assert!(det.is_open());
        det.cancel();
        assert!(!det.is_open());
    }

    #[test]
    fn no_open_without_rising_edge() {
        let mut det = GestureDetector::new(config());
        // Previous sample already above the deadzone
        det.observe(SimTime::ZERO, 0.3, 0.2);
        assert!(!det.is_open());
    }

    #[test]
    fn secs_since_resolution_tracks_lockout() {
        let mut det = GestureDetector::new(config());
        assert_eq!(det.secs_since_resolution(SimTime::ZERO), None);
        let (_, now) = run(&mut det, SimTime::ZERO, &[0.0, 0.3, 0.5, 0.2, 0.05]);
        let since = det.secs_since_resolution(now).unwrap();
        assert!(since > 0.0 && since < 0.05);
    }
}
