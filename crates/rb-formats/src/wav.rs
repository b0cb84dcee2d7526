//! WAV encoding and decoding for PCM audio.

use binrw::{binrw, BinRead, BinWrite};
use rb_engine::Frame;
use rb_ir::{Clip, SampleData};
use std::io::{Cursor, Seek, SeekFrom, Write};

use crate::FormatError;

const PCM: u16 = 1;

#[binrw]
#[brw(little, magic = b"RIFF")]
struct RiffHeader {
    size: u32,
    form: [u8; 4],
}

#[binrw]
#[brw(little)]
struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

#[binrw]
#[brw(little)]
struct FmtChunk {
    format: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

// --- Writing ---

/// Write 16-bit stereo PCM.
pub fn write_wav<W: Write + Seek>(w: &mut W, frames: &[Frame], sample_rate: u32) -> Result<(), FormatError> {
    let channels: u16 = 2;
    let bits_per_sample: u16 = 16;
    let block_align = channels * (bits_per_sample / 8);
    let data_size = frames.len() as u32 * block_align as u32;

    RiffHeader {
        size: 36 + data_size,
        form: *b"WAVE",
    }
    .write(w)?;
    ChunkHeader {
        id: *b"fmt ",
        size: 16,
    }
    .write(w)?;
    FmtChunk {
        format: PCM,
        channels,
        sample_rate,
        byte_rate: sample_rate * block_align as u32,
        block_align,
        bits_per_sample,
    }
    .write(w)?;
    ChunkHeader {
        id: *b"data",
        size: data_size,
    }
    .write(w)?;

    for frame in frames {
        w.write_all(&frame.left.to_le_bytes())?;
        w.write_all(&frame.right.to_le_bytes())?;
    }
    Ok(())
}

pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Result<Vec<u8>, FormatError> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, frames, sample_rate)?;
    Ok(cursor.into_inner())
}

// --- Reading ---

/// Decode an 8- or 16-bit PCM WAV file into a clip called `name`.
pub fn load_wav(data: &[u8], name: &str) -> Result<Clip, FormatError> {
    let mut cursor = Cursor::new(data);
    let riff = RiffHeader::read(&mut cursor)?;
    if &riff.form != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let len = data.len() as u64;
    let mut fmt: Option<FmtChunk> = None;
    let mut body: Option<(usize, usize)> = None;

    while cursor.position() + 8 <= len {
        let chunk = ChunkHeader::read(&mut cursor)?;
        let start = cursor.position();
        if &chunk.id == b"fmt " && chunk.size >= 16 {
            fmt = Some(FmtChunk::read(&mut cursor)?);
        } else if &chunk.id == b"data" {
            body = Some((start as usize, chunk.size as usize));
        }
        // Chunks are word aligned
        let next = start + chunk.size as u64 + (chunk.size as u64 & 1);
        cursor.seek(SeekFrom::Start(next))?;
    }

    let fmt = fmt.ok_or(FormatError::InvalidHeader)?;
    let (offset, size) = body.ok_or(FormatError::InvalidHeader)?;
    let end = (offset + size).min(data.len());
    let raw = &data[offset.min(end)..end];

    let samples = match (fmt.format, fmt.bits_per_sample, fmt.channels) {
        (PCM, 8, 1) => SampleData::Mono16(read_8bit(raw)),
        (PCM, 8, 2) => {
            let (l, r) = split_stereo(read_8bit(raw));
            SampleData::Stereo16(l, r)
        }
        (PCM, 16, 1) => SampleData::Mono16(read_16bit(raw)),
        (PCM, 16, 2) => {
            let (l, r) = split_stereo(read_16bit(raw));
            SampleData::Stereo16(l, r)
        }
        (format, bits, channels) => {
            return Err(FormatError::Unsupported {
                format,
                channels,
                bits,
            })
        }
    };
    Ok(Clip::new(name, samples, fmt.sample_rate))
}

/// 8-bit WAV is unsigned with 128 as center.
fn read_8bit(raw: &[u8]) -> Vec<i16> {
    raw.iter().map(|&b| (b as i16 - 128) << 8).collect()
}

fn read_16bit(raw: &[u8]) -> Vec<i16> {
    raw.chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}

fn split_stereo(interleaved: Vec<i16>) -> (Vec<i16>, Vec<i16>) {
    let mut left = Vec::with_capacity(interleaved.len() / 2);
    let mut right = Vec::with_capacity(interleaved.len() / 2);
    for pair in interleaved.chunks_exact(2) {
        left.push(pair[0]);
        right.push(pair[1]);
    }
    (left, right)
}
