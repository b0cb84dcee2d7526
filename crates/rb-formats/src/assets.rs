//! Clip resolution against an asset directory on disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rb_ir::{ClipBank, ClipRef, ClipResolver};

use crate::wav::load_wav;
use crate::FormatError;

/// Loads `<root>/<dir>/<name>.wav` on first use and caches the handle.
///
/// Missing or undecodable files resolve to [`ClipRef::NULL`] and are
/// reported once.
pub struct AssetStore {
    root: PathBuf,
    clips: ClipBank,
    resolved: HashMap<(String, String), ClipRef>,
    missing: usize,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clips: ClipBank::new(),
            resolved: HashMap::new(),
            missing: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clip_path(&self, dir: &str, name: &str) -> PathBuf {
        self.root.join(dir).join(format!("{}.wav", name))
    }

    /// Read and decode one clip without caching it.
    pub fn load(&mut self, dir: &str, name: &str) -> Result<ClipRef, FormatError> {
        let data = fs::read(self.clip_path(dir, name))?;
        let clip = load_wav(&data, name)?;
        Ok(self.clips.insert(clip))
    }

    /// Resolve every name up front. Returns how many are available.
    pub fn preload(&mut self, dir: &str, names: &[&str]) -> usize {
        names
            .iter()
            .filter(|name| !self.resolve(dir, name).is_null())
            .count()
    }

    /// Clips that could not be loaded so far.
    pub fn missing(&self) -> usize {
        self.missing
    }

    pub fn clips(&self) -> &ClipBank {
        &self.clips
    }

    pub fn into_clips(self) -> ClipBank {
        self.clips
    }
}

impl ClipResolver for AssetStore {
    fn resolve(&mut self, dir: &str, name: &str) -> ClipRef {
        let key = (dir.to_string(), name.to_string());
        if let Some(clip) = self.resolved.get(&key) {
            return *clip;
        }
        let clip = match self.load(dir, name) {
            Ok(clip) => {
                log::debug!("loaded {}/{} ({:.2} s)", dir, name, clip.duration);
                clip
            }
            Err(e) => {
                log::warn!("{}: {}", self.clip_path(dir, name).display(), e);
                self.missing += 1;
                ClipRef::NULL
            }
        };
        self.resolved.insert(key, clip);
        clip
    }
}
