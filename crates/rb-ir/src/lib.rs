//! Core data model for the revbox engine sound simulator.
//!
//! Shared by the simulation core, the asset loader and the headless
//! runtime. Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod clip;
mod config;
mod snapshot;
mod state;
mod throttle;
mod time;

pub use clip::{Clip, ClipBank, ClipKey, ClipRef, ClipResolver, SampleData};
pub use config::{
    CommonConfig, GearboxConfig, GestureConfig, GestureInput, IdleConfig, RevStage, RpmConfig,
    Smoothing, TOP_GEAR,
};
pub use snapshot::{Snapshot, VoiceStatus, MAX_VOICES};
pub use state::EngineState;
pub use throttle::{clamp_unit, ThrottleSample};
pub use time::SimTime;
