//! Reader and writer for MPEG-4 audio files (M4A, M4B, MP4).
//!
//! ```md
//! ftyp
//! moov
//! ├─ mvhd
//! ├─ trak
//! │  └─ mdia
//! │     └─ minf
//! │        └─ stbl
//! │           ├─ stsd
//! │           │  └─ mp4a | alac
//! │           └─ stco | co64
//! └─ udta
//!    └─ meta
//!       ├─ hdlr
//!       └─ ilst
//! mdat
//! ```
use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, trace};

use crate::util::{ReadUtil, SeekUtil};
use crate::{AudioMetadata, Error, ErrorKind, ReadConfig};

pub use ident::Fourcc;
pub use ilst::Item;
pub use write::M4aWriter;

use head::{parse_children, parse_full_head, parse_head, AtomBounds, Head};
use ident::*;

pub mod head;
pub mod ident;
pub mod ilst;
mod write;

/// Es descriptor tag
const ELEMENTARY_STREAM_DESCRIPTOR: u8 = 0x03;
/// Decoder config descriptor tag
const DECODER_CONFIG_DESCRIPTOR: u8 = 0x04;
/// Length of the sample entry fields preceding the children of `mp4a` and `alac`.
const SAMPLE_ENTRY_LEN: u64 = 28;

/// Everything read from an MPEG-4 file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Mp4Metadata {
    pub audio: AudioMetadata,
    pub major_brand: Fourcc,
    pub timescale: u32,
    pub duration: u64,
    pub max_bitrate: Option<u32>,
    pub avg_bitrate: Option<u32>,
    /// The items of the metadata item list in stored order.
    pub items: Vec<Item>,
}

/// The atoms relevant to reading and rewriting the metadata, and their positions.
#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub mp4: Mp4Metadata,
    pub moov: Option<AtomBounds>,
    pub udta: Option<AtomBounds>,
    pub meta: Option<AtomBounds>,
    /// Whether the meta atom carries a 4 byte full atom head.
    pub meta_full_head: bool,
    pub hdlr: bool,
    pub ilst: Option<AtomBounds>,
    pub chunk_offsets: Vec<(Fourcc, AtomBounds)>,
    pub media_data: Vec<AtomBounds>,
}

/// Attempts to read the metadata of an MPEG-4 file.
pub fn read_from(reader: &mut (impl Read + Seek), cfg: &ReadConfig) -> crate::Result<Mp4Metadata> {
    let mut scan = scan(reader, cfg)?;
    if scan.moov.is_none() {
        return Err(Error::corrupt("Missing movie (moov) atom"));
    }

    let mp4 = &mut scan.mp4;
    ilst::apply(&mp4.items, &mut mp4.audio)?;

    if cfg.read_audio_info {
        if mp4.timescale > 0 {
            let secs = mp4.duration / mp4.timescale as u64;
            mp4.audio.set_length(u32::try_from(secs).unwrap_or(u32::MAX));
        }
        let bitrate = mp4.avg_bitrate.filter(|&b| b > 0).or(mp4.max_bitrate);
        if let Some(b) = bitrate.filter(|&b| b > 0) {
            mp4.audio.set_bitrate(b / 1000);
        }
    }

    Ok(scan.mp4)
}

pub(crate) fn scan(reader: &mut (impl Read + Seek), cfg: &ReadConfig) -> crate::Result<Scan> {
    reader.seek(SeekFrom::Start(0))?;
    let file_len = reader.remaining_len()?;

    let head = parse_head(reader).map_err(|e| match e.kind {
        ErrorKind::Io(_) => Error::no_tag("Missing filetype (ftyp) atom"),
        _ => e,
    })?;
    if head.fourcc() != FILETYPE {
        return Err(Error::no_tag(format!(
            "Expected filetype (ftyp) atom, found '{}'",
            head.fourcc()
        )));
    }
    if head.len() > file_len {
        return Err(Error::corrupt("Filetype (ftyp) atom exceeds the file"));
    }

    let mut scan = Scan::default();
    if head.content_len() >= 4 {
        scan.mp4.major_brand = Fourcc(reader.read_array()?);
    }
    debug!("mp4 major brand '{}'", scan.mp4.major_brand);
    reader.seek(SeekFrom::Start(head.len()))?;

    parse_children(reader, Fourcc(*b"file"), file_len - head.len(), |r, head, bounds| {
        trace!("top level atom '{}', {} bytes", head.fourcc(), head.len());
        match head.fourcc() {
            MOVIE => {
                scan.moov = Some(bounds.clone());
                parse_moov(r, head, cfg, &mut scan)
            }
            MEDIA_DATA => {
                scan.media_data.push(bounds.clone());
                Ok(())
            }
            _ => Ok(()),
        }
    })?;

    Ok(scan)
}

fn parse_moov<R: Read + Seek>(
    reader: &mut R,
    head: Head,
    cfg: &ReadConfig,
    scan: &mut Scan,
) -> crate::Result<()> {
    parse_children(reader, MOVIE, head.content_len(), |r, head, bounds| match head.fourcc() {
        MOVIE_HEADER => parse_mvhd(r, &mut scan.mp4),
        TRACK => parse_trak(r, head, scan),
        USER_DATA => {
            scan.udta = Some(bounds.clone());
            parse_udta(r, head, cfg, scan)
        }
        _ => Ok(()),
    })
}

/// Movie header.
///
/// ```md
/// 1 byte version
/// 3 bytes flags
/// 4 or 8 bytes creation time
/// 4 or 8 bytes modification time
/// 4 bytes timescale
/// 4 or 8 bytes duration
/// ```
fn parse_mvhd(reader: &mut (impl Read + Seek), mp4: &mut Mp4Metadata) -> crate::Result<()> {
    let (version, _) = parse_full_head(reader)?;
    match version {
        0 => {
            reader.skip(8)?;
            mp4.timescale = reader.read_be_u32()?;
            mp4.duration = reader.read_be_u32()? as u64;
        }
        1 => {
            reader.skip(16)?;
            mp4.timescale = reader.read_be_u32()?;
            mp4.duration = reader.read_be_u64()?;
        }
        v => {
            return Err(Error::new(
                ErrorKind::UnknownVersion(v),
                format!("Unknown movie header (mvhd) version {v}"),
            ));
        }
    }
    Ok(())
}

/// The containers between `trak` and the sample table atoms, outermost first.
const SAMPLE_TABLE_PATH: [Fourcc; 3] = [MEDIA, MEDIA_INFORMATION, SAMPLE_TABLE];

fn parse_trak<R: Read + Seek>(reader: &mut R, head: Head, scan: &mut Scan) -> crate::Result<()> {
    parse_sample_table_path(reader, head, &SAMPLE_TABLE_PATH, scan)
}

/// Descends along `path` down to the sample descriptions and chunk offsets of `stbl`. Only the
/// next atom of the path is entered, so the depth is bounded by the path length.
fn parse_sample_table_path<R: Read + Seek>(
    reader: &mut R,
    head: Head,
    path: &[Fourcc],
    scan: &mut Scan,
) -> crate::Result<()> {
    let len = head.content_len();
    parse_children(reader, head.fourcc(), len, |r, head, bounds| match path.split_first() {
        Some((&next, rest)) if head.fourcc() == next => {
            parse_sample_table_path(r, head, rest, scan)
        }
        Some(_) => Ok(()),
        None => match head.fourcc() {
            SAMPLE_TABLE_SAMPLE_DESCRIPTION => parse_stsd(r, head, &mut scan.mp4),
            SAMPLE_TABLE_CHUNK_OFFSET | SAMPLE_TABLE_CHUNK_OFFSET_64 => {
                scan.chunk_offsets.push((head.fourcc(), bounds.clone()));
                Ok(())
            }
            _ => Ok(()),
        },
    })
}

/// Sample description.
///
/// ```md
/// 1 byte version
/// 3 bytes flags
/// 4 bytes entry count
/// sample entries
/// ```
fn parse_stsd<R: Read + Seek>(
    reader: &mut R,
    head: Head,
    mp4: &mut Mp4Metadata,
) -> crate::Result<()> {
    if head.content_len() < 8 {
        return Err(Error::corrupt("Sample description (stsd) atom is too short"));
    }
    parse_full_head(reader)?;
    reader.skip(4)?;

    parse_children(reader, head.fourcc(), head.content_len() - 8, |r, head, _| {
        if head.content_len() < SAMPLE_ENTRY_LEN {
            return Ok(());
        }
        let len = head.content_len() - SAMPLE_ENTRY_LEN;
        match head.fourcc() {
            MP4_AUDIO => {
                r.skip(SAMPLE_ENTRY_LEN)?;
                parse_children(r, MP4_AUDIO, len, |r, head, _| match head.fourcc() {
                    ELEMENTARY_STREAM_DESCRIPTION => parse_esds(r, head, mp4),
                    _ => Ok(()),
                })
            }
            APPLE_LOSSLESS => {
                r.skip(SAMPLE_ENTRY_LEN)?;
                parse_children(r, APPLE_LOSSLESS, len, |r, head, _| match head.fourcc() {
                    APPLE_LOSSLESS => parse_alac_cookie(r, head, mp4),
                    _ => Ok(()),
                })
            }
            _ => Ok(()),
        }
    })
}

/// Elementary stream descriptor.
///
/// ```md
/// 1 byte version
/// 3 bytes flags
/// │
/// └──elementary stream descriptor
///    1 byte tag (0x03)
///    1~4 bytes len
///    2 bytes id
///    1 byte flag
///    │
///    └──decoder config descriptor
///       1 byte tag (0x04)
///       1~4 bytes len
///       1 byte object type indication
///       1 byte stream type
///       3 bytes buffer size
///       4 bytes maximum bitrate
///       4 bytes average bitrate
/// ```
fn parse_esds(
    reader: &mut (impl Read + Seek),
    head: Head,
    mp4: &mut Mp4Metadata,
) -> crate::Result<()> {
    let (version, _) = parse_full_head(reader)?;
    if version != 0 {
        return Err(Error::new(
            ErrorKind::UnknownVersion(version),
            "Unknown elementary stream descriptor (esds) version",
        ));
    }

    let (tag, head_len, desc_len) = parse_desc_head(reader)?;
    if tag != ELEMENTARY_STREAM_DESCRIPTOR {
        debug!("missing elementary stream descriptor, found tag {tag}");
        return Ok(());
    }
    let max_len = head.content_len().saturating_sub(4 + head_len);
    let len = desc_len.min(max_len);

    let flags = {
        reader.skip(2)?;
        reader.read_u8()?
    };
    let mut parsed = 3;
    if flags & 0x80 != 0 {
        reader.skip(2)?;
        parsed += 2;
    }
    if flags & 0x40 != 0 {
        let url_len = reader.read_u8()? as u64;
        reader.skip(url_len)?;
        parsed += 1 + url_len;
    }
    if flags & 0x20 != 0 {
        reader.skip(2)?;
        parsed += 2;
    }

    while parsed < len {
        let (tag, head_len, desc_len) = parse_desc_head(reader)?;
        if tag == DECODER_CONFIG_DESCRIPTOR {
            reader.skip(5)?;
            mp4.max_bitrate = Some(reader.read_be_u32()?);
            mp4.avg_bitrate = Some(reader.read_be_u32()?);
            break;
        }
        reader.skip(desc_len)?;
        parsed += head_len + desc_len;
    }

    Ok(())
}

fn parse_desc_head(reader: &mut impl Read) -> crate::Result<(u8, u64, u64)> {
    let tag = reader.read_u8()?;

    let mut head_len = 1;
    let mut len = 0;
    while head_len < 5 {
        let b = reader.read_u8()?;
        len = (len << 7) | (b & 0x7F) as u64;
        head_len += 1;
        if b & 0x80 == 0 {
            break;
        }
    }

    Ok((tag, head_len, len))
}

/// Apple lossless magic cookie.
///
/// ```md
/// 1 byte version
/// 3 bytes flags
/// 4 bytes frame length
/// 1 byte compatible version
/// 1 byte bit depth
/// 3 bytes rice parameters
/// 1 byte channels
/// 2 bytes max run
/// 4 bytes max frame bytes
/// 4 bytes average bitrate
/// 4 bytes sample rate
/// ```
fn parse_alac_cookie(
    reader: &mut (impl Read + Seek),
    head: Head,
    mp4: &mut Mp4Metadata,
) -> crate::Result<()> {
    if head.content_len() < 24 {
        return Err(Error::corrupt("Apple lossless (alac) cookie is too short"));
    }
    reader.skip(4 + 16)?;
    mp4.avg_bitrate = Some(reader.read_be_u32()?);
    Ok(())
}

fn parse_udta<R: Read + Seek>(
    reader: &mut R,
    head: Head,
    cfg: &ReadConfig,
    scan: &mut Scan,
) -> crate::Result<()> {
    parse_children(reader, USER_DATA, head.content_len(), |r, head, bounds| {
        if head.fourcc() != METADATA || scan.meta.is_some() {
            return Ok(());
        }
        scan.meta = Some(bounds.clone());

        // some writers omit the full atom head of meta
        let mut len = head.content_len();
        if len >= 8 {
            let peek: [u8; 8] = r.read_array()?;
            r.seek(SeekFrom::Current(-8))?;
            scan.meta_full_head = &peek[4..8] != b"hdlr";
        }
        if scan.meta_full_head {
            if len < 4 {
                return Err(Error::corrupt("Metadata (meta) atom is too short"));
            }
            parse_full_head(r)?;
            len -= 4;
        }

        parse_children(r, METADATA, len, |r, head, bounds| match head.fourcc() {
            HANDLER_REFERENCE => {
                scan.hdlr = true;
                Ok(())
            }
            ITEM_LIST => {
                scan.ilst = Some(bounds.clone());
                scan.mp4.items = ilst::parse(r, head.content_len(), cfg)?;
                Ok(())
            }
            _ => Ok(()),
        })
    })
}
