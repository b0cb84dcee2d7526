//! Pre-recorded audio clips and the handles used to reference them.

use alloc::string::String;
use alloc::vec::Vec;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Key for referencing clips in a [`ClipBank`].
    pub struct ClipKey;
}

/// A decoded, immutable audio asset.
#[derive(Clone, Debug)]
pub struct Clip {
    /// Logical clip name (file stem)
    pub name: String,
    /// Audio data
    pub data: SampleData,
    /// Playback rate of `data` in Hz
    pub sample_rate: u32,
}

impl Clip {
    pub fn new(name: &str, data: SampleData, sample_rate: u32) -> Self {
        Self {
            name: String::from(name),
            data,
            sample_rate: sample_rate.max(1),
        }
    }

    /// A clip of digital silence lasting `secs`.
    pub fn silence(name: &str, secs: f32, sample_rate: u32) -> Self {
        let frames = (secs.max(0.0) * sample_rate as f32) as usize;
        Self::new(name, SampleData::Mono16(alloc::vec![0; frames]), sample_rate)
    }

    /// A sine tone lasting `secs`, handy for audible test renders.
    pub fn tone(name: &str, secs: f32, sample_rate: u32, hz: f32) -> Self {
        let frames = (secs.max(0.0) * sample_rate as f32) as usize;
        let step = 2.0 * core::f32::consts::PI * hz / sample_rate.max(1) as f32;
        let data: Vec<i16> = (0..frames)
            .map(|i| (libm::sinf(step * i as f32) * 16_000.0) as i16)
            .collect();
        Self::new(name, SampleData::Mono16(data), sample_rate)
    }

    /// Number of sample frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        self.data.len() as f32 / self.sample_rate as f32
    }
}

/// Clip audio data.
#[derive(Clone, Debug)]
pub enum SampleData {
    /// 16-bit mono samples
    Mono16(Vec<i16>),
    /// 16-bit stereo samples (left, right)
    Stereo16(Vec<i16>, Vec<i16>),
}

impl SampleData {
    /// Get the number of sample frames.
    pub fn len(&self) -> usize {
        match self {
            SampleData::Mono16(v) => v.len(),
            SampleData::Stereo16(l, _) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_channels(&self) -> u16 {
        match self {
            SampleData::Mono16(_) => 1,
            SampleData::Stereo16(_, _) => 2,
        }
    }

    /// Left (or mono) sample at `pos`; out of range reads as silence.
    pub fn get_left(&self, pos: usize) -> i16 {
        match self {
            SampleData::Mono16(v) => v.get(pos).copied().unwrap_or(0),
            SampleData::Stereo16(l, _) => l.get(pos).copied().unwrap_or(0),
        }
    }

    /// Right sample at `pos` (left for mono).
    pub fn get_right(&self, pos: usize) -> i16 {
        match self {
            SampleData::Mono16(v) => v.get(pos).copied().unwrap_or(0),
            SampleData::Stereo16(_, r) => r.get(pos).copied().unwrap_or(0),
        }
    }

    /// Linearly interpolated stereo frame at fractional position `pos`,
    /// normalized to [-1, 1]. Past the last frame the blend partner is
    /// the first frame when looping, silence otherwise.
    pub fn frame_at(&self, pos: f64, looping: bool) -> (f32, f32) {
        let len = self.len();
        if len == 0 || pos < 0.0 {
            return (0.0, 0.0);
        }
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let next = if idx + 1 >= len && looping { 0 } else { idx + 1 };

        let l0 = self.get_left(idx) as f32;
        let l1 = self.get_left(next) as f32;
        let r0 = self.get_right(idx) as f32;
        let r1 = self.get_right(next) as f32;
        (
            (l0 + (l1 - l0) * frac) / 32768.0,
            (r0 + (r1 - r0) * frac) / 32768.0,
        )
    }
}

/// Handle to a clip plus its known duration.
///
/// The null handle is valid and means "asset unavailable"; every play
/// request that carries it is a no-op.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClipRef {
    pub key: Option<ClipKey>,
    /// Duration in seconds (0.0 for the null handle)
    pub duration: f32,
}

impl ClipRef {
    pub const NULL: ClipRef = ClipRef {
        key: None,
        duration: 0.0,
    };

    pub fn is_null(&self) -> bool {
        self.key.is_none()
    }
}

/// Owns every loaded clip; voices refer to entries by [`ClipKey`].
#[derive(Default)]
pub struct ClipBank {
    clips: SlotMap<ClipKey, Clip>,
}

impl ClipBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a clip and return its handle.
    pub fn insert(&mut self, clip: Clip) -> ClipRef {
        let duration = clip.duration();
        let key = self.clips.insert(clip);
        ClipRef {
            key: Some(key),
            duration,
        }
    }

    pub fn get(&self, key: ClipKey) -> Option<&Clip> {
        self.clips.get(key)
    }

    /// Look up a clip by name. Linear scan, intended for setup.
    pub fn find(&self, name: &str) -> ClipRef {
        self.clips
            .iter()
            .find(|(_, clip)| clip.name.as_str() == name)
            .map(|(key, clip)| ClipRef {
                key: Some(key),
                duration: clip.duration(),
            })
            .unwrap_or(ClipRef::NULL)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Resolves logical clip names to handles.
///
/// `dir` is the profile's asset directory; in-memory banks may ignore it.
pub trait ClipResolver {
    fn resolve(&mut self, dir: &str, name: &str) -> ClipRef;
}

impl ClipResolver for ClipBank {
    fn resolve(&mut self, _dir: &str, name: &str) -> ClipRef {
        self.find(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_are_kept_whole() {
        let name = "a_really_long_descriptive_clip_name_over_forty_bytes";
        let mut bank = ClipBank::new();
        let inserted = bank.insert(Clip::silence(name, 0.5, 1000));
        let found = bank.find(name);
        assert!(!found.is_null());
        assert_eq!(found.key, inserted.key);
        assert_eq!(bank.get(found.key.unwrap()).unwrap().name.as_str(), name);
        assert!(!bank.resolve("m4", name).is_null());
    }

    #[test]
    fn duration_from_frames() {
        let clip = Clip::silence("idle", 1.5, 1000);
        assert_eq!(clip.len(), 1500);
        assert!((clip.duration() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn frame_at_integer_matches_nearest() {
        let data = SampleData::Mono16(alloc::vec![0, 16384, -8192]);
        let (l, r) = data.frame_at(1.0, false);
        assert!((l - 0.5).abs() < 1e-6);
        assert_eq!(l, r);
    }

    #[test]
    fn frame_at_midpoint_blends() {
        let data = SampleData::Stereo16(alloc::vec![0, 16384], alloc::vec![16384, 0]);
        let (l, r) = data.frame_at(0.5, false);
        assert!((l - 0.25).abs() < 1e-4);
        assert!((r - 0.25).abs() < 1e-4);
    }

    #[test]
    fn frame_at_end_wraps_only_when_looping() {
        let data = SampleData::Mono16(alloc::vec![16384, 0, 0, 16384]);
        let (looped, _) = data.frame_at(3.5, true);
        let (oneshot, _) = data.frame_at(3.5, false);
        assert!((looped - 0.5).abs() < 1e-4);
        assert!((oneshot - 0.25).abs() < 1e-4);
    }

    #[test]
    fn bank_find_by_name() {
        let mut bank = ClipBank::new();
        let idle = bank.insert(Clip::silence("engine_idle_loop", 2.0, 100));
        bank.insert(Clip::silence("engine_starter", 1.0, 100));

        let found = bank.find("engine_idle_loop");
        assert_eq!(found, idle);
        assert!((found.duration - 2.0).abs() < 1e-6);
        assert!(bank.find("missing").is_null());
    }

    #[test]
    fn resolver_ignores_dir_for_memory_bank() {
        let mut bank = ClipBank::new();
        let rev = bank.insert(Clip::silence("engine_rev_stage1", 0.8, 100));
        assert_eq!(bank.resolve("m4", "engine_rev_stage1"), rev);
    }
}
