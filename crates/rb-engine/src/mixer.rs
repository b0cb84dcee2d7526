//! Block renderer: turns a voice bank's state into stereo frames.

use rb_ir::{ClipBank, SimTime};

use crate::frame::Frame;
use crate::voice_bank::VoiceBank;

/// Renders voices by computing each one's playhead from its start time,
/// so playback needs no per-voice cursor state.
#[derive(Clone, Copy, Debug)]
pub struct Mixer {
    sample_rate: u32,
    master_gain: f32,
}

impl Mixer {
    pub fn new(sample_rate: u32, master_gain: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            master_gain,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames in one tick of `dt` seconds.
    pub fn frames_per_tick(&self, dt: f32) -> usize {
        (self.sample_rate as f32 * dt).round() as usize
    }

    /// Overwrite `out` with the mix of every voice, frame 0 at `start`.
    pub fn render(&self, bank: &VoiceBank, clips: &ClipBank, start: SimTime, out: &mut [Frame]) {
        out.fill(Frame::silence());
        let frame_us = 1_000_000.0 / self.sample_rate as f64;

        for voice in bank.iter() {
            let Some(clip) = voice.clip.and_then(|key| clips.get(key)) else {
                continue;
            };
            let gain = voice.volume * self.master_gain;
            if gain <= 0.0 {
                continue;
            }
            let rate = clip.sample_rate as f64;
            for (i, frame) in out.iter_mut().enumerate() {
                let t = SimTime::from_micros(start.micros + (i as f64 * frame_us) as u64);
                if let Some(pos) = voice.playhead(t) {
                    let (l, r) = clip.data.frame_at(pos * rate, voice.looping);
                    frame.mix(Frame::from_f32(l * gain, r * gain));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_ir::{Clip, SampleData};

    fn dc_clip(clips: &mut ClipBank, value: i16, frames: usize) -> rb_ir::ClipRef {
        clips.insert(Clip::new("dc", SampleData::Mono16(vec![value; frames]), 1000))
    }

    #[test]
    fn empty_bank_renders_silence() {
        let clips = ClipBank::new();
        let bank = VoiceBank::new(2);
        let mut out = [Frame::mono(5); 8];
        Mixer::new(1000, 1.0).render(&bank, &clips, SimTime::ZERO, &mut out);
        assert!(out.iter().all(Frame::is_silent));
    }

    #[test]
    fn voice_volume_scales_output() {
        let mut clips = ClipBank::new();
        let dc = dc_clip(&mut clips, 16384, 100);
        let mut bank = VoiceBank::new(1);
        bank.play(0, dc, false, 0.5);

        let mut out = [Frame::silence(); 4];
        Mixer::new(1000, 1.0).render(&bank, &clips, SimTime::ZERO, &mut out);
        // 0.5 full scale at half volume
        assert!((out[0].left as i32 - 8191).abs() <= 1);
    }

    #[test]
    fn one_shot_ends_mid_block() {
        let mut clips = ClipBank::new();
        let dc = dc_clip(&mut clips, 16384, 3);
        let mut bank = VoiceBank::new(1);
        bank.play(0, dc, false, 1.0);

        let mut out = [Frame::silence(); 6];
        Mixer::new(1000, 1.0).render(&bank, &clips, SimTime::ZERO, &mut out);
        assert!(!out[1].is_silent());
        assert!(out[4].is_silent());
    }

    #[test]
    fn loop_wraps() {
        let mut clips = ClipBank::new();
        let dc = dc_clip(&mut clips, 16384, 3);
        let mut bank = VoiceBank::new(1);
        bank.play(0, dc, true, 1.0);

        let mut out = [Frame::silence(); 10];
        Mixer::new(1000, 1.0).render(&bank, &clips, SimTime::ZERO, &mut out);
        assert!(out.iter().all(|f| !f.is_silent()));
    }

    #[test]
    fn voices_sum() {
        let mut clips = ClipBank::new();
        let dc = dc_clip(&mut clips, 8192, 100);
        let mut bank = VoiceBank::new(2);
        bank.play(0, dc, true, 1.0);
        bank.play(1, dc, true, 1.0);

        let mut out = [Frame::silence(); 2];
        Mixer::new(1000, 1.0).render(&bank, &clips, SimTime::ZERO, &mut out);
        assert!((out[0].left as i32 - 16382).abs() <= 2);
    }
}
