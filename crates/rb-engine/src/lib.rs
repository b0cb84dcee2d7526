//! Simulation core for the revbox engine sound simulator.
//!
//! Conditions throttle samples, runs one vehicle profile's state machine
//! per tick and drives a bank of exclusive playback voices. Rendering the
//! voices into frames is left to [`Mixer`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod action_queue;
mod conditioner;
mod crossfade;
mod engine_core;
mod frame;
mod gesture;
pub mod layers;
mod mixer;
mod profile;
pub mod profiles;
mod ramp;
mod rpm;
mod sfx_queue;
mod stages;
mod switcher;
mod voice;
mod voice_bank;

pub use action_queue::{Action, ActionQueue, MAX_ACTIONS};
pub use conditioner::{ThrottleConditioner, HISTORY_LEN};
pub use crossfade::{CrossfadePair, CrossfadeTransition};
pub use engine_core::{EngineCore, Handoff, RevPlayed, StateTimers, MAX_STAGES};
pub use frame::Frame;
pub use gesture::{GestureDetector, GestureResult, GestureWindow};
pub use mixer::Mixer;
pub use profile::EngineProfile;
pub use profiles::{create_profile, profile_assets, PROFILE_NAMES};
pub use ramp::VolumeRamp;
pub use rpm::{Downshift, RpmModel, Shift};
pub use sfx_queue::{SfxOutcome, SfxQueue};
pub use stages::select_stage;
pub use switcher::{ProfileSwitcher, SwitchTransition, SWITCH_FADE_MS};
pub use voice::Voice;
pub use voice_bank::{VoiceBank, VoiceId};
