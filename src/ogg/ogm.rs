//! OGM video, the DirectShow stream headers carried in Ogg pages.
//!
//! ```md
//! stream header packet
//!     1 byte type (0x01)
//!     8 bytes stream type ("video\0\0\0", "audio\0\0\0", "text\0\0\0\0")
//!     4 bytes subtype
//!     4 bytes little endian header size
//!     8 bytes little endian time unit (100ns)
//!     8 bytes little endian samples per unit
//!     4 bytes little endian default length
//!     4 bytes little endian buffer size
//!     2 bytes little endian bits per sample
//!     2 bytes padding
//!     4 bytes little endian width
//!     4 bytes little endian height
//! comment packet
//!     1 byte type (0x03)
//!     6 bytes "vorbis"
//!     comment block
//!     1 byte framing
//! ```
use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, warn};

use super::{last_granule, PacketReader, CAPTURE};
use crate::util::{until_nul, ReadUtil};
use crate::vorbis::VorbisComments;
use crate::{Error, ReadConfig, VideoMetadata};

const HEADER: u8 = 0x01;
const COMMENT: u8 = 0x03;
const VIDEO: &[u8] = b"video";
const TIME_UNITS_PER_SEC: i64 = 10_000_000;

/// The fields of an OGM video stream header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StreamHeader {
    pub stream_type: String,
    pub time_unit: i64,
    pub samples_per_unit: i64,
    pub width: u32,
    pub height: u32,
}

impl StreamHeader {
    pub fn parse(packet: &[u8]) -> Option<Self> {
        if packet.len() < 41 {
            return None;
        }
        let le_i64 = |i: usize| {
            let mut b = [0; 8];
            b.copy_from_slice(&packet[i..i + 8]);
            i64::from_le_bytes(b)
        };
        let le_u32 = |i: usize| {
            packet.get(i..i + 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        };

        let stream_type = String::from_utf8_lossy(until_nul(&packet[1..9])).into_owned();
        let is_video = packet[1..9].starts_with(VIDEO);
        Some(Self {
            stream_type,
            time_unit: le_i64(17),
            samples_per_unit: le_i64(25),
            width: if is_video { le_u32(45).unwrap_or(0) } else { 0 },
            height: if is_video { le_u32(49).unwrap_or(0) } else { 0 },
        })
    }

    pub fn is_video(&self) -> bool {
        self.stream_type.as_bytes() == VIDEO
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OgmMetadata {
    pub video: VideoMetadata,
    pub header: Option<StreamHeader>,
    pub comments: Option<VorbisComments>,
}

/// Attempts to read the header and comment packets preceding the first data packet.
pub fn read_from(reader: &mut (impl Read + Seek), cfg: &ReadConfig) -> crate::Result<OgmMetadata> {
    reader.seek(SeekFrom::Start(0))?;
    let capture: [u8; 4] = reader.read_array()?;
    if capture != CAPTURE {
        return Err(Error::no_tag("Missing OggS capture pattern"));
    }
    reader.seek(SeekFrom::Start(0))?;

    let mut ogm = OgmMetadata::default();
    let mut video_serial = None;
    {
        let mut packets = PacketReader::new(reader, cfg.max_text_len);
        while let Some((serial, packet)) = packets.next_packet()? {
            let Some(&flag) = packet.first() else {
                continue;
            };
            if flag & 1 == 0 {
                debug!("ogm data packet on stream {serial}, done reading headers");
                break;
            }

            match flag {
                HEADER => {
                    if let Some(header) = StreamHeader::parse(&packet) {
                        debug!("ogm stream {serial}: {header:?}");
                        if header.is_video() && ogm.header.is_none() {
                            video_serial = Some(serial);
                            ogm.header = Some(header);
                        }
                    }
                }
                COMMENT => {
                    let Some(block) = packet.get(7..).filter(|_| &packet[1..7] == b"vorbis") else {
                        continue;
                    };
                    let (comments, consumed) = VorbisComments::parse(block, cfg)?;
                    let framed = block.get(consumed).map_or(false, |b| b & 1 != 0);
                    if !framed {
                        warn!("ogm comment packet without framing bit");
                        break;
                    }
                    ogm.comments = Some(comments);
                }
                _ => (),
            }
        }
    }

    if let Some(c) = &ogm.comments {
        apply(c, &mut ogm.video);
    }

    if let Some(h) = &ogm.header {
        ogm.video.set_width(h.width);
        ogm.video.set_height(h.height);
        if let (true, Some(serial)) = (cfg.read_audio_info, video_serial) {
            if let Some(frames) = last_granule(reader, serial)? {
                let secs = frames as i128 * h.time_unit as i128 / TIME_UNITS_PER_SEC as i128;
                if let Ok(secs) = u32::try_from(secs) {
                    ogm.video.set_length(secs);
                }
            }
        }
    }

    Ok(ogm)
}

/// Fills the video record. Repeated comments are joined with a newline, repeated languages with
/// a semicolon.
fn apply(comments: &VorbisComments, video: &mut VideoMetadata) {
    if let Some(v) = comments.get("TITLE") {
        video.fill_title(v);
    }
    if let Some(v) = comments.get("DATE") {
        video.fill_year(v.chars().take(4).collect::<String>());
    }
    if let Some(v) = comments.get("LICENSE") {
        video.fill_license(v);
    }

    let joined = comments.get_all("COMMENT").collect::<Vec<_>>().join("\n");
    video.fill_comment(joined);
    let joined = comments.get_all("LANGUAGE").collect::<Vec<_>>().join(";");
    video.fill_language(joined);
}
