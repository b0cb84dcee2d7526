//! Audio output trait and error types.

use rb_engine::Frame;

/// Error type for audio operations.
#[derive(Debug)]
pub enum AudioError {
    /// No output device available
    NoDevice,
    /// Failed to query the device configuration
    Config(String),
    /// Failed to build the output stream
    StreamBuild(String),
    /// Failed to start or pause the stream
    Playback(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::NoDevice => write!(f, "no audio output device available"),
            AudioError::Config(msg) => write!(f, "device config error: {}", msg),
            AudioError::StreamBuild(msg) => write!(f, "stream build error: {}", msg),
            AudioError::Playback(msg) => write!(f, "playback error: {}", msg),
        }
    }
}

impl std::error::Error for AudioError {}

/// Sink for rendered frames.
///
/// The tick thread is the only writer; the backend owns whatever runs
/// the hardware callback.
pub trait AudioOutput {
    fn sample_rate(&self) -> u32;

    /// Queue frames, waiting for room so the caller is paced by playback.
    fn write(&mut self, frames: &[Frame]);

    fn start(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self) -> Result<(), AudioError>;
}
