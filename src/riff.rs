//! Reader for RIFF AVI files.
//!
//! ```md
//! 4 bytes "RIFF"
//! 4 bytes little endian size
//! 4 bytes "AVI "
//! 4 bytes "LIST"
//! 4 bytes little endian size
//! 4 bytes "hdrl"
//! 4 bytes "avih"
//! 4 bytes little endian size
//! main header:
//!     4 bytes micro seconds per frame
//!     4 bytes max bytes per second
//!     4 bytes padding granularity
//!     4 bytes flags
//!     4 bytes total frames
//!     4 bytes initial frames
//!     4 bytes stream count
//!     4 bytes suggested buffer size
//!     4 bytes width
//!     4 bytes height
//! ```
use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::util::{ReadUtil, SeekUtil};
use crate::{Error, VideoMetadata};

const MAIN_HEADER_LEN: u32 = 40;

/// The fields of the AVI main header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AviHeader {
    pub micro_sec_per_frame: u32,
    pub total_frames: u32,
    pub streams: u32,
    pub width: u32,
    pub height: u32,
}

impl AviHeader {
    pub fn duration_secs(&self) -> u64 {
        self.micro_sec_per_frame as u64 * self.total_frames as u64 / 1_000_000
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AviMetadata {
    pub video: VideoMetadata,
    pub header: AviHeader,
}

/// Attempts to read the main header of an AVI file.
pub fn read_from(reader: &mut (impl Read + Seek)) -> crate::Result<AviMetadata> {
    reader.seek(SeekFrom::Start(0))?;
    let mut signature = Vec::with_capacity(12);
    reader.by_ref().take(12).read_to_end(&mut signature)?;
    if signature.len() < 12 || &signature[0..4] != b"RIFF" || &signature[8..12] != b"AVI " {
        return Err(Error::no_tag("Missing RIFF AVI signature"));
    }

    reader.skip(12)?;
    let chunk: [u8; 4] = reader.read_array()?;
    if &chunk != b"avih" {
        return Err(Error::corrupt("Missing AVI main header (avih)"));
    }
    let len = reader.read_le_u32()?;
    if len < MAIN_HEADER_LEN {
        return Err(Error::corrupt(format!("AVI main header of {len} bytes")));
    }

    let micro_sec_per_frame = reader.read_le_u32()?;
    reader.skip(12)?;
    let total_frames = reader.read_le_u32()?;
    reader.skip(4)?;
    let streams = reader.read_le_u32()?;
    reader.skip(4)?;
    let width = reader.read_le_u32()?;
    let height = reader.read_le_u32()?;

    let header = AviHeader { micro_sec_per_frame, total_frames, streams, width, height };
    debug!("avi main header: {header:?}");

    let mut video = VideoMetadata::default();
    video.set_length(u32::try_from(header.duration_secs()).unwrap_or(u32::MAX));
    video.set_width(width);
    video.set_height(height);

    Ok(AviMetadata { video, header })
}
