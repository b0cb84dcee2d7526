//! Asset loading for revbox.
//!
//! Decodes PCM WAV files into [`rb_ir::Clip`]s, encodes rendered frames
//! back to WAV, and resolves clip names against an asset directory.

mod assets;
mod wav;

use std::fmt;
use std::io;

pub use assets::AssetStore;
pub use wav::{frames_to_wav, load_wav, write_wav};

/// Error type for asset decoding and encoding.
#[derive(Debug)]
pub enum FormatError {
    /// Missing RIFF/WAVE magic or a required chunk
    InvalidHeader,
    /// File ends inside a header
    UnexpectedEof,
    /// Compressed, float or more than two channels
    Unsupported { format: u16, channels: u16, bits: u16 },
    /// I/O error
    Io(io::Error),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::InvalidHeader => write!(f, "invalid WAV header"),
            FormatError::UnexpectedEof => write!(f, "unexpected end of file"),
            FormatError::Unsupported {
                format,
                channels,
                bits,
            } => write!(
                f,
                "unsupported WAV encoding (format {}, {} channels, {} bits)",
                format, channels, bits
            ),
            FormatError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FormatError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FormatError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::UnexpectedEof
        } else {
            FormatError::Io(e)
        }
    }
}

impl From<binrw::Error> for FormatError {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(e) => e.into(),
            _ => FormatError::InvalidHeader,
        }
    }
}
