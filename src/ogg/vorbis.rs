//! Ogg Vorbis audio.
//!
//! ```md
//! identification packet
//!     1 byte type (0x01)
//!     6 bytes "vorbis"
//!     4 bytes little endian version
//!     1 byte channels
//!     4 bytes little endian sample rate
//!     4 bytes little endian maximum bitrate
//!     4 bytes little endian nominal bitrate
//!     4 bytes little endian minimum bitrate
//!     1 byte block sizes
//!     1 byte framing
//! comment packet
//!     1 byte type (0x03)
//!     6 bytes "vorbis"
//!     comment block
//!     1 byte framing
//! setup packet
//!     1 byte type (0x05)
//!     6 bytes "vorbis"
//!     codebooks
//! ```
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use super::{last_granule, paginate, write_renumbered, Page, PacketReader, BEGIN_OF_STREAM, CAPTURE};
use crate::util::{ReadUtil, SeekUtil};
use crate::vorbis::VorbisComments;
use crate::write::{replace_file, TagWriter, WriteStatus};
use crate::{AudioMetadata, Error, ReadConfig};

pub const IDENT_PACKET: &[u8; 7] = b"\x01vorbis";
pub const COMMENT_PACKET: &[u8; 7] = b"\x03vorbis";
pub const SETUP_PACKET: &[u8; 7] = b"\x05vorbis";

/// The stream parameters of the identification packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VorbisInfo {
    pub channels: u8,
    pub sample_rate: u32,
    pub max_bitrate: i32,
    pub nominal_bitrate: i32,
    pub min_bitrate: i32,
}

impl VorbisInfo {
    pub fn parse(packet: &[u8]) -> crate::Result<Self> {
        if packet.len() < 28 || !packet.starts_with(IDENT_PACKET) {
            return Err(Error::corrupt("Invalid vorbis identification packet"));
        }
        let le_i32 =
            |i: usize| i32::from_le_bytes([packet[i], packet[i + 1], packet[i + 2], packet[i + 3]]);

        Ok(Self {
            channels: packet[11],
            sample_rate: le_i32(12) as u32,
            max_bitrate: le_i32(16),
            nominal_bitrate: le_i32(20),
            min_bitrate: le_i32(24),
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OggMetadata {
    pub audio: AudioMetadata,
    pub info: VorbisInfo,
    pub comments: Option<VorbisComments>,
    pub serial: u32,
}

/// Splits a comment packet into its comments, returning whether the framing bit was present.
fn parse_comment_packet(packet: &[u8], cfg: &ReadConfig) -> crate::Result<(VorbisComments, bool)> {
    let (comments, consumed) = VorbisComments::parse(&packet[COMMENT_PACKET.len()..], cfg)?;
    let framed = packet
        .get(COMMENT_PACKET.len() + consumed)
        .map_or(false, |b| b & 1 != 0);
    Ok((comments, framed))
}

/// Attempts to read the header packets of the first Vorbis stream.
pub fn read_from(reader: &mut (impl Read + Seek), cfg: &ReadConfig) -> crate::Result<OggMetadata> {
    reader.seek(SeekFrom::Start(0))?;
    let capture: [u8; 4] = reader.read_array()?;
    if capture != CAPTURE {
        return Err(Error::no_tag("Missing OggS capture pattern"));
    }
    reader.seek(SeekFrom::Start(0))?;

    let mut ogg = OggMetadata::default();
    let header_end = {
        let mut packets = PacketReader::new(reader, cfg.max_text_len);
        let (serial, ident) = packets
            .next_packet()?
            .ok_or_else(|| Error::corrupt("Missing vorbis identification packet"))?;
        if !ident.starts_with(IDENT_PACKET) {
            return Err(Error::no_tag("First ogg stream is not vorbis"));
        }
        ogg.serial = serial;
        ogg.info = VorbisInfo::parse(&ident)?;
        debug!("vorbis stream {serial}: {:?}", ogg.info);

        loop {
            match packets.next_packet()? {
                Some((s, packet)) if s == serial => {
                    if !packet.starts_with(COMMENT_PACKET) {
                        return Err(Error::corrupt("Missing vorbis comment packet"));
                    }
                    let (comments, framed) = parse_comment_packet(&packet, cfg)?;
                    if !framed {
                        warn!("vorbis comment packet without framing bit");
                    }
                    ogg.comments = Some(comments);
                    break;
                }
                Some(_) => continue,
                None => return Err(Error::corrupt("Missing vorbis comment packet")),
            }
        }
        packets.position()?
    };

    if let Some(c) = &ogg.comments {
        c.apply(&mut ogg.audio);
    }

    if cfg.read_audio_info && ogg.info.sample_rate > 0 {
        let granule = last_granule(reader, ogg.serial)?;
        let secs = granule.map(|g| g as f64 / ogg.info.sample_rate as f64);
        if let Some(secs) = secs {
            ogg.audio.set_length(secs as u32);
        }

        if ogg.info.nominal_bitrate > 0 {
            ogg.audio.set_bitrate(ogg.info.nominal_bitrate as u32 / 1000);
        } else if let Some(secs) = secs.filter(|s| *s > 0.0) {
            let audio_len = reader.seek(SeekFrom::End(0))?.saturating_sub(header_end);
            ogg.audio.set_bitrate((audio_len as f64 * 8.0 / secs / 1000.0) as u32);
        }
    }

    Ok(ogg)
}

/// Rewrites the comment packet of a single stream Ogg Vorbis file.
#[derive(Clone, Debug, Default)]
pub struct OggWriter;

impl TagWriter for OggWriter {
    fn commit(&self, path: &Path, audio: &AudioMetadata) -> WriteStatus {
        match write_path(path, audio) {
            Ok(()) => WriteStatus::Success,
            Err(status) => status,
        }
    }
}

/// The three header packets and the offset of the first audio page.
struct Headers {
    serial: u32,
    packets: Vec<Vec<u8>>,
    audio_start: u64,
    next_sequence: u32,
}

fn read_headers(reader: &mut (impl Read + Seek)) -> Result<Headers, WriteStatus> {
    let mut serial = None;
    let mut packets: Vec<Vec<u8>> = Vec::new();
    let mut partial: Vec<u8> = Vec::new();
    let mut next_sequence = 0;

    match reader.read_array::<4>() {
        Ok(capture) if capture == CAPTURE => (),
        _ => return Err(WriteStatus::IncorrectFileType),
    }
    reader.seek(SeekFrom::Start(0)).map_err(|_| WriteStatus::ReadWriteError)?;

    while packets.len() < 3 {
        let page = Page::read_from(reader).map_err(|_| WriteStatus::FormatDefective)?;
        if *serial.get_or_insert(page.serial) != page.serial {
            debug!("ogg stream {} interleaved with the vorbis headers", page.serial);
            return Err(WriteStatus::FormatDefective);
        }
        next_sequence = page.sequence.wrapping_add(1);

        for (data, complete) in page.packets() {
            if packets.len() == 3 {
                // audio data sharing a page with the setup header
                return Err(WriteStatus::FormatDefective);
            }
            partial.extend_from_slice(data);
            if complete {
                packets.push(std::mem::take(&mut partial));
            }
        }
    }

    let valid = packets[0].starts_with(IDENT_PACKET)
        && packets[1].starts_with(COMMENT_PACKET)
        && packets[2].starts_with(SETUP_PACKET);
    if !valid || !partial.is_empty() {
        return Err(WriteStatus::IncorrectFileType);
    }

    let audio_start = reader.stream_position().map_err(|_| WriteStatus::ReadWriteError)?;
    Ok(Headers { serial: serial.unwrap_or_default(), packets, audio_start, next_sequence })
}

fn write_path(path: &Path, audio: &AudioMetadata) -> Result<(), WriteStatus> {
    let file = File::open(path).map_err(|_| WriteStatus::ReadWriteError)?;
    let mut reader = BufReader::new(file);
    let headers = read_headers(&mut reader)?;

    let cfg = ReadConfig::DEFAULT;
    let (mut comments, _) =
        parse_comment_packet(&headers.packets[1], &cfg).map_err(|_| WriteStatus::FormatDefective)?;
    comments.update(audio);

    let mut comment_packet = COMMENT_PACKET.to_vec();
    comment_packet.extend(comments.encode());
    comment_packet.push(1);

    let serial = headers.serial;
    let mut pages = paginate(&[&headers.packets[0][..]], serial, 0, BEGIN_OF_STREAM, 0);
    pages.extend(paginate(
        &[&comment_packet[..], &headers.packets[2][..]],
        serial,
        1,
        0,
        0,
    ));
    debug!(
        "rewriting {} vorbis header pages, {} were followed by page {}",
        pages.len(),
        headers.audio_start,
        headers.next_sequence
    );

    reader
        .seek(SeekFrom::Start(headers.audio_start))
        .map_err(|_| WriteStatus::ReadWriteError)?;

    let result = replace_file(path, |_, writer| {
        for p in pages.iter() {
            writer.write_all(&p.encode())?;
        }
        let mut sequence = pages.len() as u32;
        while reader.remaining_len()? > 0 {
            let mut page = Page::read_from(&mut reader)?;
            write_renumbered(writer, &mut page, sequence)?;
            sequence = sequence.wrapping_add(1);
        }
        Ok(())
    });

    result.map_err(|e| {
        debug!("failed to write ogg file: {e}");
        WriteStatus::ReadWriteError
    })
}
