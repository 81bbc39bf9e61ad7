//! Reader for FLAC files.
//!
//! ```md
//! 4 bytes "fLaC"
//! metadata blocks:
//!     1 bit last block flag
//!     7 bits block type
//!     3 bytes big endian block size
//!     block size bytes payload
//! audio frames
//! ```
use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use tracing::{debug, trace};

use crate::mp3::id3v2;
use crate::util::{check_len, ReadUtil, SeekUtil};
use crate::vorbis::VorbisComments;
use crate::{AudioMetadata, Error, ReadConfig};

const STREAM_INFO: u8 = 0;
const VORBIS_COMMENT: u8 = 4;
const INVALID: u8 = 127;

/// The content of the STREAMINFO block.
///
/// ```md
/// 2 bytes minimum block size
/// 2 bytes maximum block size
/// 3 bytes minimum frame size
/// 3 bytes maximum frame size
/// 20 bits sample rate
/// 3 bits channels - 1
/// 5 bits bits per sample - 1
/// 36 bits total samples
/// 16 bytes md5 signature
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StreamInfo {
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub min_frame_size: u32,
    pub max_frame_size: u32,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    pub total_samples: u64,
    pub md5: [u8; 16],
}

impl StreamInfo {
    pub const LEN: u64 = 34;

    pub fn parse(data: &[u8; 34]) -> Self {
        let packed = u64::from_be_bytes([
            data[10], data[11], data[12], data[13], data[14], data[15], data[16], data[17],
        ]);
        let mut md5 = [0; 16];
        md5.copy_from_slice(&data[18..34]);

        Self {
            min_block_size: u16::from_be_bytes([data[0], data[1]]),
            max_block_size: u16::from_be_bytes([data[2], data[3]]),
            min_frame_size: u32::from_be_bytes([0, data[4], data[5], data[6]]),
            max_frame_size: u32::from_be_bytes([0, data[7], data[8], data[9]]),
            sample_rate: (packed >> 44) as u32,
            channels: ((packed >> 41) & 0x7) as u8 + 1,
            bits_per_sample: ((packed >> 36) & 0x1f) as u8 + 1,
            total_samples: packed & 0xf_ffff_ffff,
            md5,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self.sample_rate {
            0 => None,
            r => Some(Duration::from_secs_f64(self.total_samples as f64 / r as f64)),
        }
    }
}

/// Everything read from a FLAC file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FlacMetadata {
    pub audio: AudioMetadata,
    pub stream_info: Option<StreamInfo>,
    pub comments: Option<VorbisComments>,
    /// The offset of the first audio frame.
    pub audio_offset: u64,
}

/// Attempts to read the metadata blocks of a FLAC stream. A leading ID3v2 tag is skipped.
pub fn read_from(reader: &mut (impl Read + Seek), cfg: &ReadConfig) -> crate::Result<FlacMetadata> {
    reader.seek(SeekFrom::Start(0))?;
    let mut start = 0;
    if let Some((_, _, flags, size)) = id3v2::read_header(reader)? {
        let footer = if flags & 0x10 != 0 { id3v2::HEADER_LEN } else { 0 };
        start = id3v2::HEADER_LEN + size as u64 + footer;
        debug!("skipping {start} byte id3v2 tag before flac stream");
    }
    reader.seek(SeekFrom::Start(start))?;

    let magic: [u8; 4] = reader.read_array()?;
    if &magic != b"fLaC" {
        return Err(Error::no_tag("Missing fLaC signature"));
    }

    let mut flac = FlacMetadata::default();
    loop {
        let head = reader.read_u8()?;
        let last = head & 0x80 != 0;
        let block_type = head & 0x7f;
        let len = reader.read_be_u24()? as u64;
        trace!("flac block type {block_type}, {len} bytes, last: {last}");

        match block_type {
            STREAM_INFO => {
                if len < StreamInfo::LEN {
                    return Err(Error::corrupt(format!("FLAC STREAMINFO block of {len} bytes")));
                }
                let data: [u8; 34] = reader.read_array()?;
                reader.skip(len - StreamInfo::LEN)?;
                flac.stream_info = Some(StreamInfo::parse(&data));
            }
            VORBIS_COMMENT => {
                check_len("FLAC comment block", len, cfg.max_text_len)?;
                let data = reader.read_u8_vec(len)?;
                let (comments, consumed) = VorbisComments::parse(&data, cfg)?;
                if consumed as u64 != len {
                    debug!("{} unused bytes in flac comment block", len - consumed as u64);
                }
                flac.comments = Some(comments);
            }
            INVALID => return Err(Error::corrupt("Invalid FLAC block type 127")),
            _ => reader.skip(len)?,
        }

        if last {
            break;
        }
    }

    flac.audio_offset = reader.stream_position()?;
    if let Some(c) = &flac.comments {
        c.apply(&mut flac.audio);
    }

    if cfg.read_audio_info {
        let audio_len = reader.remaining_len()?;
        if let Some(duration) = flac.stream_info.as_ref().and_then(StreamInfo::duration) {
            flac.audio.set_length(duration.as_secs() as u32);
            let secs = duration.as_secs_f64();
            if secs > 0.0 {
                flac.audio.set_bitrate((audio_len as f64 * 8.0 / secs / 1000.0) as u32);
            }
        }
    }

    Ok(flac)
}
