//! Layered foundation loops driven by throttle and RPM.

use core::f32::consts::FRAC_PI_2;

use libm::{cosf, powf, sinf};
use rb_ir::ClipRef;

use crate::ramp::VolumeRamp;
use crate::voice_bank::{VoiceBank, VoiceId};

/// Shaping parameters for the foundation layers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerShape {
    /// Idle layer fades out over `[idle_fade_start, idle_fade_start + idle_fade_width]`
    pub idle_fade_start: f32,
    pub idle_fade_width: f32,
    /// Rumble low/mid equal-power blend zone
    pub blend_start: f32,
    pub blend_end: f32,
    pub low_curve: f32,
    pub mid_curve: f32,
    pub blend_curve: f32,
    pub whine_curve: f32,
    pub whine_rpm_boost: f32,
    pub whine_rpm_curve: f32,
    /// Low whine fades out over `[whine_low_fade_start, whine_low_fade_end]`
    pub whine_low_fade_start: f32,
    pub whine_low_fade_end: f32,
    pub whine_low_gain: f32,
    pub whine_high_start: f32,
    pub whine_high_curve: f32,
    /// Volume units per second the loops move toward their targets
    pub inertia: f32,
}

/// Target volumes for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayerTargets {
    pub idle: f32,
    pub rumble_low: f32,
    pub rumble_mid: f32,
    pub whine_low: f32,
    pub whine_high: f32,
}

/// Compute layer targets from smoothed throttle `t` and RPM factor `r`
/// (both in [0, 1]).
pub fn layer_targets(shape: &LayerShape, t: f32, r: f32) -> LayerTargets {
    let t = t.clamp(0.0, 1.0);
    let r = r.clamp(0.0, 1.0);

    let idle = 1.0 - ((t - shape.idle_fade_start) / shape.idle_fade_width).clamp(0.0, 1.0);

    let low = powf(t, shape.low_curve);
    let mid = powf(t, shape.mid_curve);
    let (rumble_low, rumble_mid) = if t < shape.blend_start {
        (low, 0.0)
    } else if t > shape.blend_end {
        (0.0, mid)
    } else {
        let x = (t - shape.blend_start) / (shape.blend_end - shape.blend_start);
        let p = powf(x, shape.blend_curve) * FRAC_PI_2;
        (low * cosf(p), mid * sinf(p))
    };

    let boost = shape.whine_rpm_boost * powf(r, shape.whine_rpm_curve);
    let low_fade = 1.0
        - ((t - shape.whine_low_fade_start) / (shape.whine_low_fade_end - shape.whine_low_fade_start))
            .clamp(0.0, 1.0);
    let whine_low = (powf(t, shape.whine_curve) + boost) * low_fade * shape.whine_low_gain;
    let whine_high = if t > shape.whine_high_start {
        let x = (t - shape.whine_high_start) / (1.0 - shape.whine_high_start);
        powf(x, shape.whine_high_curve) + boost
    } else {
        0.0
    };

    LayerTargets {
        idle,
        rumble_low: rumble_low.clamp(0.0, 1.0),
        rumble_mid: rumble_mid.clamp(0.0, 1.0),
        whine_low: whine_low.clamp(0.0, 1.0),
        whine_high: whine_high.clamp(0.0, 1.0),
    }
}

const AUDIBLE: f32 = 0.01;

/// One looping layer voice with inertia.
#[derive(Clone, Debug)]
pub struct Layer {
    pub voice: VoiceId,
    pub clip: ClipRef,
    inertia: f32,
    ramp: VolumeRamp,
}

impl Layer {
    pub fn new(voice: VoiceId, clip: ClipRef, inertia: f32) -> Self {
        Self {
            voice,
            clip,
            inertia,
            ramp: VolumeRamp::new(0.0, inertia),
        }
    }

    pub fn volume(&self) -> f32 {
        self.ramp.current()
    }

    /// Chase `target`, starting the loop when it becomes audible and
    /// stopping it once both target and volume are silent.
    pub fn update(&mut self, bank: &mut VoiceBank, target: f32, dt: f32) {
        self.ramp.set_target(target, false);
        let volume = self.ramp.advance(dt);
        if !bank.is_busy(self.voice) {
            if target > AUDIBLE {
                bank.play(self.voice, self.clip, true, volume);
            }
        } else if target <= AUDIBLE && volume <= AUDIBLE {
            bank.stop(self.voice, 0);
        } else {
            bank.set_volume(self.voice, volume);
        }
    }

    pub fn reset(&mut self) {
        self.ramp = VolumeRamp::new(0.0, self.inertia);
    }
}

/// Rumble and supercharger whine loops plus the throttle-scaled idle.
#[derive(Clone, Debug)]
pub struct FoundationLayers {
    shape: LayerShape,
    pub rumble_low: Layer,
    pub rumble_mid: Layer,
    pub whine_low: Layer,
    pub whine_high: Layer,
    targets: LayerTargets,
}

/// Voices and clips for [`FoundationLayers`], in
/// rumble low, rumble mid, whine low, whine high order.
pub type LayerVoices = [(VoiceId, ClipRef); 4];

impl FoundationLayers {
    pub fn new(shape: LayerShape, voices: LayerVoices) -> Self {
        let layer = |(voice, clip): (VoiceId, ClipRef)| Layer::new(voice, clip, shape.inertia);
        Self {
            shape,
            rumble_low: layer(voices[0]),
            rumble_mid: layer(voices[1]),
            whine_low: layer(voices[2]),
            whine_high: layer(voices[3]),
            targets: LayerTargets::default(),
        }
    }

    /// Recompute targets and move every loop toward them.
    ///
    /// Returns the gain to apply to the idle loop on top of its own ramp.
    pub fn update(&mut self, bank: &mut VoiceBank, throttle: f32, rpm_factor: f32, dt: f32) -> f32 {
        let targets = layer_targets(&self.shape, throttle, rpm_factor);
        self.rumble_low.update(bank, targets.rumble_low, dt);
        self.rumble_mid.update(bank, targets.rumble_mid, dt);
        self.whine_low.update(bank, targets.whine_low, dt);
        self.whine_high.update(bank, targets.whine_high, dt);
        self.targets = targets;
        targets.idle
    }

    pub fn targets(&self) -> &LayerTargets {
        &self.targets
    }

    /// Stop every loop and zero the inertia state.
    pub fn reset(&mut self, bank: &mut VoiceBank) {
        for layer in [
            &mut self.rumble_low,
            &mut self.rumble_mid,
            &mut self.whine_low,
            &mut self.whine_high,
        ] {
            bank.stop(layer.voice, 0);
            layer.reset();
        }
        self.targets = LayerTargets::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_ir::{Clip, ClipBank};

    const SHAPE: LayerShape = LayerShape {
        idle_fade_start: 0.05,
        idle_fade_width: 0.1,
        blend_start: 0.4,
        blend_end: 0.6,
        low_curve: 1.8,
        mid_curve: 2.5,
        blend_curve: 2.0,
        whine_curve: 1.6,
        whine_rpm_boost: 0.3,
        whine_rpm_curve: 1.2,
        whine_low_fade_start: 0.3,
        whine_low_fade_end: 0.7,
        whine_low_gain: 0.8,
        whine_high_start: 0.4,
        whine_high_curve: 2.0,
        inertia: 3.0,
    };

    #[test]
    fn closed_throttle_is_all_idle() {
        let t = layer_targets(&SHAPE, 0.0, 0.0);
        assert_eq!(t.idle, 1.0);
        assert_eq!(t.rumble_low, 0.0);
        assert_eq!(t.rumble_mid, 0.0);
        assert_eq!(t.whine_low, 0.0);
        assert_eq!(t.whine_high, 0.0);
    }

    #[test]
    fn idle_fades_over_band() {
        assert!((layer_targets(&SHAPE, 0.1, 0.0).idle - 0.5).abs() < 1e-5);
        assert_eq!(layer_targets(&SHAPE, 0.2, 0.0).idle, 0.0);
    }

    #[test]
    fn rumble_blend_is_continuous() {
        let below = layer_targets(&SHAPE, 0.3999, 0.0);
        let start = layer_targets(&SHAPE, 0.4, 0.0);
        assert!((below.rumble_low - start.rumble_low).abs() < 1e-3);
        assert_eq!(start.rumble_mid, 0.0);

        let end = layer_targets(&SHAPE, 0.6, 0.0);
        let above = layer_targets(&SHAPE, 0.6001, 0.0);
        assert!(end.rumble_low < 1e-3);
        assert!((end.rumble_mid - above.rumble_mid).abs() < 1e-3);
    }

    #[test]
    fn whine_crosses_from_low_to_high() {
        let light = layer_targets(&SHAPE, 0.2, 0.0);
        assert!(light.whine_low > 0.0);
        assert_eq!(light.whine_high, 0.0);

        let full = layer_targets(&SHAPE, 1.0, 1.0);
        assert_eq!(full.whine_low, 0.0);
        assert_eq!(full.whine_high, 1.0);
    }

    #[test]
    fn rpm_boosts_whine() {
        let low_rpm = layer_targets(&SHAPE, 0.2, 0.0);
        let high_rpm = layer_targets(&SHAPE, 0.2, 0.8);
        assert!(high_rpm.whine_low > low_rpm.whine_low);
    }

    #[test]
    fn layer_starts_chases_and_stops() {
        let mut clips = ClipBank::new();
        let rumble = clips.insert(Clip::silence("rumble", 1.0, 100));
        let mut bank = VoiceBank::new(1);
        let mut layer = Layer::new(0, rumble, 3.0);

        layer.update(&mut bank, 0.6, 0.1);
        assert!(bank.is_busy(0));
        assert!((bank.volume(0) - 0.3).abs() < 1e-5);

        layer.update(&mut bank, 0.6, 0.1);
        assert!((bank.volume(0) - 0.6).abs() < 1e-5);

        for _ in 0..5 {
            layer.update(&mut bank, 0.0, 0.1);
        }
        assert!(!bank.is_busy(0));
    }

    #[test]
    fn foundation_reports_idle_gain() {
        let mut clips = ClipBank::new();
        let clip = clips.insert(Clip::silence("loop", 1.0, 100));
        let mut bank = VoiceBank::new(4);
        let mut layers = FoundationLayers::new(SHAPE, [(0, clip), (1, clip), (2, clip), (3, clip)]);

        let gain = layers.update(&mut bank, 0.8, 0.5, 1.0 / 60.0);
        assert_eq!(gain, 0.0);
        assert!(bank.is_busy(1));
        assert!(bank.is_busy(3));

        layers.reset(&mut bank);
        assert!(!bank.any_busy());
    }
}
