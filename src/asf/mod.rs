//! Reader for Advanced Systems Format files (WMA, WMV).
//!
//! ```md
//! 16 bytes header object guid
//! 8 bytes header object size
//! 4 bytes object count
//! 2 bytes reserved
//! objects:
//!     16 bytes object guid
//!     8 bytes object size including this head
//!     object size - 24 bytes content
//! ```
use std::io::{Read, Seek};

use tracing::{debug, trace};

use crate::genre::resolve_genre;
use crate::record::{normalize, parse_number};
use crate::util::{self, check_len, decode_latin1, decode_utf16, non_negative, ReadUtil, SeekUtil};
use crate::{AudioMetadata, Error, Metadata, ReadConfig, VideoMetadata};

pub use drm::{Drm, WeedInfo, WrmHeader};

pub mod drm;
pub mod ident;

use ident::*;

/// The number of bytes of an extended string value that are decoded, the rest is skipped.
const MAX_EXTENDED_STRING: u16 = 250;

/// Everything read from an ASF header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AsfMetadata {
    /// The tags interpreted as an audio file.
    pub audio: AudioMetadata,
    /// The tags interpreted as a video file.
    pub video: VideoMetadata,
    pub has_audio: bool,
    pub has_video: bool,
    /// The DRM header if the file is protected and the header is valid.
    pub drm: Option<Drm>,
    /// The DRM type of the content encryption object.
    pub drm_type: Option<String>,
    pub copyright: Option<String>,
    pub rating: Option<String>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
}

impl AsfMetadata {
    /// Returns the video record if the file contains a video stream, otherwise the audio record.
    pub fn into_metadata(self) -> Metadata {
        match self.has_video {
            true => Metadata::Video(self.video),
            false => Metadata::Audio(self.audio),
        }
    }
}

/// Values collected while walking the header objects.
#[derive(Default)]
struct Builder {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    year: Option<String>,
    comment: Option<String>,
    genre: Option<String>,
    genre_id: Option<String>,
    track: Option<u16>,
    zero_based_track: Option<u16>,
    bitrate: Option<u32>,
    length: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    asf: AsfMetadata,
}

/// Attempts to read the ASF header from the reader.
pub fn read_from(reader: &mut (impl Read + Seek), cfg: &ReadConfig) -> crate::Result<AsfMetadata> {
    let guid = reader.read_guid()?;
    if guid != HEADER {
        return Err(Error::no_tag("Missing ASF header object guid"));
    }

    let header_size = reader.read_le_i64()?;
    if header_size < 0 {
        return Err(Error::corrupt(format!("ASF header size is negative: {header_size}")));
    }
    let object_count = reader.read_le_i32()?;
    let object_count = non_negative("ASF object count", object_count)?;
    if object_count > cfg.max_asf_objects {
        return Err(Error::corrupt(format!(
            "ASF object count {object_count} exceeds the limit of {}",
            cfg.max_asf_objects
        )));
    }
    reader.skip(2)?;
    debug!("asf header size: {header_size}, objects: {object_count}");

    let mut builder = Builder::default();
    for i in 0..object_count {
        let guid = reader.read_guid()?;
        let size = reader.read_le_i64()?;
        let content_len = size
            .checked_sub(24)
            .filter(|l| *l >= 0)
            .ok_or_else(|| Error::corrupt(format!("ASF object size is too small: {size}")))?;
        let content_len = content_len as u64;

        let name = object_name(&guid);
        trace!("asf object[{i}]: {name}, {content_len} bytes");

        let start = reader.stream_position()?;
        let end = start
            .checked_add(content_len)
            .ok_or_else(|| Error::corrupt("ASF object size overflows"))?;
        parse_object(reader, cfg, &mut builder, &guid, content_len)?;
        util::seek_to_end(reader, name, end)?;
    }

    Ok(builder.finish())
}

fn parse_object(
    reader: &mut (impl Read + Seek),
    cfg: &ReadConfig,
    builder: &mut Builder,
    guid: &util::Guid,
    len: u64,
) -> crate::Result<()> {
    match *guid {
        FILE_PROPERTIES => parse_file_properties(reader, builder),
        STREAM_PROPERTIES => parse_stream_properties(reader, builder),
        EXTENDED_STREAM_PROPERTIES => parse_extended_stream_properties(reader, builder),
        CONTENT_DESCRIPTION => parse_content_description(reader, builder),
        EXTENDED_CONTENT_DESCRIPTION => parse_extended_content_description(reader, builder),
        CONTENT_ENCRYPTION => parse_content_encryption(reader, cfg, builder),
        EXTENDED_CONTENT_ENCRYPTION if cfg.read_drm => {
            parse_extended_content_encryption(reader, cfg, builder)
        }
        _ => {
            debug!("skipping {len} bytes of unhandled asf object");
            Ok(())
        }
    }
}

/// ```md
/// 48 bytes file id, file size, creation date, data packets count
/// 8 bytes duration in 100ns units
/// 20 bytes preroll, flags, minimum and maximum packet size
/// 4 bytes maximum bitrate
/// ```
fn parse_file_properties(
    reader: &mut (impl Read + Seek),
    builder: &mut Builder,
) -> crate::Result<()> {
    reader.skip(48)?;
    let duration = reader.read_le_i64()? / 10_000_000;
    let duration = i32::try_from(duration)
        .ok()
        .filter(|d| *d >= 0)
        .ok_or_else(|| Error::corrupt(format!("ASF duration is out of range: {duration}")))?;
    builder.length = Some(duration as u32);

    reader.skip(20)?;
    let max_bitrate = non_negative("ASF maximum bitrate", reader.read_le_i32()?)?;
    debug!("asf duration: {duration}s, maximum bitrate: {max_bitrate}");
    builder.bitrate = Some(max_bitrate / 1000);
    Ok(())
}

fn parse_stream_properties(
    reader: &mut (impl Read + Seek),
    builder: &mut Builder,
) -> crate::Result<()> {
    let stream_type = reader.read_guid()?;

    if stream_type == AUDIO_STREAM {
        builder.asf.has_audio = true;
    } else if stream_type == VIDEO_STREAM {
        builder.asf.has_video = true;
        reader.skip(38)?;
        builder.width = Some(non_negative("ASF video width", reader.read_le_i32()?)?);
        builder.height = Some(non_negative("ASF video height", reader.read_le_i32()?)?);
        debug!("asf video stream: {:?}x{:?}", builder.width, builder.height);
    }

    Ok(())
}

fn parse_extended_stream_properties(
    reader: &mut (impl Read + Seek),
    builder: &mut Builder,
) -> crate::Result<()> {
    reader.skip(56)?;
    let channels = reader.read_le_u16()?;
    let sample_rate = non_negative("ASF sample rate", reader.read_le_i32()?)?;
    let byte_rate = non_negative("ASF byte rate", reader.read_le_i32()?)?;
    debug!("asf channels: {channels}, sample rate: {sample_rate}, byte rate: {byte_rate}");

    builder.asf.channels = Some(channels);
    builder.asf.sample_rate = Some(sample_rate);
    if builder.bitrate.is_none() {
        builder.bitrate = Some((byte_rate as u64 * 8 / 1000) as u32);
    }
    Ok(())
}

/// ```md
/// 5 * 2 bytes title, author, copyright, description and rating length
/// the utf-16 strings in the same order
/// ```
fn parse_content_description(
    reader: &mut (impl Read + Seek),
    builder: &mut Builder,
) -> crate::Result<()> {
    let mut lengths = [0u16; 5];
    for l in lengths.iter_mut() {
        *l = reader.read_le_u16()?;
    }

    let mut values = Vec::with_capacity(5);
    for l in lengths {
        let data = reader.read_u8_vec(l as u64)?;
        values.push(normalize(&decode_utf16(&data, false)));
    }
    let mut values = values.into_iter();
    let mut next = || values.next().flatten();

    builder.title = next();
    builder.artist = next();
    builder.asf.copyright = next();
    builder.comment = next();
    builder.asf.rating = next();
    debug!("asf content description: {:?} by {:?}", builder.title, builder.artist);
    Ok(())
}

/// ```md
/// 2 bytes field count
/// fields:
///     2 bytes name length
///     utf-16 name
///     2 bytes value type
///     2 bytes value length
///     value
/// ```
fn parse_extended_content_description(
    reader: &mut (impl Read + Seek),
    builder: &mut Builder,
) -> crate::Result<()> {
    let count = reader.read_le_u16()?;
    debug!("asf extended content description with {count} fields");

    for _ in 0..count {
        let name_len = reader.read_le_u16()?;
        let name = decode_utf16(&reader.read_u8_vec(name_len as u64)?, false);
        let value_type = reader.read_le_u16()?;
        let value_len = reader.read_le_u16()?;

        match value_type {
            TYPE_STRING => {
                let read_len = value_len.min(MAX_EXTENDED_STRING);
                let data = reader.read_u8_vec(read_len as u64)?;
                reader.skip((value_len - read_len) as u64)?;
                let value = decode_utf16(&data, false);
                trace!("asf extended string {name}: {value}");
                builder.apply_extended_string(&name, &value);
            }
            TYPE_INT if value_len == 4 => {
                let value = reader.read_le_i32()?;
                trace!("asf extended int {name}: {value}");
                builder.apply_extended_int(&name, value)?;
            }
            TYPE_LONG if value_len == 8 => {
                let value = reader.read_le_i64()?;
                trace!("ignoring asf extended long {name}: {value}");
            }
            TYPE_BINARY | TYPE_BOOLEAN | TYPE_INT | TYPE_LONG => {
                trace!("ignoring asf extended field {name} of type {value_type}");
                reader.skip(value_len as u64)?;
            }
            t => {
                debug!("unknown asf extended field type {t} of {name}");
                reader.skip(value_len as u64)?;
            }
        }
    }

    Ok(())
}

/// ```md
/// 4 bytes secret data length
/// secret data
/// 4 bytes protection type length
/// ascii protection type
/// 4 bytes key id length
/// key id
/// 4 bytes license url length
/// license url
/// ```
fn parse_content_encryption(
    reader: &mut (impl Read + Seek),
    cfg: &ReadConfig,
    builder: &mut Builder,
) -> crate::Result<()> {
    let data_len = reader.read_le_u32()?;
    reader.skip(data_len as u64)?;

    let type_len = non_negative("ASF protection type length", reader.read_le_i32()?)?;
    check_len("ASF protection type", type_len as u64, cfg.max_text_len)?;
    let drm_type = reader.read_u8_vec(type_len as u64)?;
    builder.asf.drm_type = normalize(&decode_latin1(util::until_nul(&drm_type)));
    debug!("asf protection type: {:?}", builder.asf.drm_type);

    let key_len = reader.read_le_u32()?;
    reader.skip(key_len as u64)?;
    let url_len = reader.read_le_u32()?;
    reader.skip(url_len as u64)?;
    Ok(())
}

fn parse_extended_content_encryption(
    reader: &mut (impl Read + Seek),
    cfg: &ReadConfig,
    builder: &mut Builder,
) -> crate::Result<()> {
    let len = non_negative("ASF encryption data length", reader.read_le_i32()?)?;
    check_len("ASF encryption data", len as u64, cfg.max_text_len)?;
    let data = reader.read_u8_vec(len as u64)?;
    let xml = match data.starts_with(&[0xff, 0xfe]) || data.starts_with(&[0xfe, 0xff]) {
        true => util::decode_utf16_bom(&data),
        false => decode_utf16(&data, false),
    };

    match Drm::parse(&xml) {
        Some(drm) => {
            debug!("parsed asf drm header, weed: {}", matches!(drm, Drm::Weed(_)));
            builder.asf.drm = Some(drm);
        }
        None => debug!("asf drm header is invalid"),
    }
    Ok(())
}

impl Builder {
    fn apply_extended_string(&mut self, name: &str, value: &str) {
        let value = match normalize(value) {
            Some(v) => v,
            None => return,
        };
        let target = match name {
            WM_TITLE => &mut self.title,
            WM_AUTHOR => &mut self.artist,
            WM_ALBUM_TITLE => &mut self.album,
            WM_YEAR => &mut self.year,
            WM_GENRE => &mut self.genre,
            WM_GENRE_ID => &mut self.genre_id,
            WM_DESCRIPTION => &mut self.comment,
            WM_TRACK_NUMBER => {
                if self.track.is_none() {
                    self.track = parse_number(&value);
                }
                return;
            }
            WM_TRACK => {
                if self.zero_based_track.is_none() {
                    self.zero_based_track = parse_number(&value);
                }
                return;
            }
            _ => return,
        };
        if target.is_none() {
            *target = Some(value);
        }
    }

    fn apply_extended_int(&mut self, name: &str, value: i32) -> crate::Result<()> {
        match name {
            WM_TRACK_NUMBER if self.track.is_none() => {
                let track = value as i16;
                if track < 0 {
                    return Err(Error::corrupt(format!("ASF track number is negative: {track}")));
                }
                self.track = Some(track as u16);
            }
            WM_TRACK if self.zero_based_track.is_none() => {
                self.zero_based_track = u16::try_from(value).ok();
            }
            _ => (),
        }
        Ok(())
    }

    fn apply_weed(&mut self, weed: &WeedInfo) {
        let overrides = [
            (&mut self.artist, weed.author()),
            (&mut self.title, weed.title()),
            (&mut self.comment, weed.description()),
            (&mut self.album, weed.collection()),
            (&mut self.asf.copyright, weed.copyright()),
        ];
        for (target, value) in overrides {
            if let Some(v) = value.and_then(normalize) {
                *target = Some(v);
            }
        }
    }

    fn finish(mut self) -> AsfMetadata {
        // weed fields win over the description objects regardless of their order
        if let Some(Drm::Weed(weed)) = self.asf.drm.take() {
            self.apply_weed(&weed);
            self.asf.drm = Some(Drm::Weed(weed));
        }

        let Builder {
            title,
            artist,
            album,
            year,
            comment,
            genre,
            genre_id,
            track,
            zero_based_track,
            bitrate,
            length,
            width,
            height,
            mut asf,
        } = self;

        let track = track
            .filter(|&t| t != 0)
            .or_else(|| zero_based_track.and_then(|t| t.checked_add(1)));
        let genre = genre.or_else(|| genre_id.as_deref().map(resolve_genre));

        let (license, license_type) = match (&asf.drm, &asf.drm_type) {
            (Some(Drm::Weed(weed)), _) => (Some(weed.license_info()), Some("weed")),
            (Some(Drm::Header(_)), Some(t)) => {
                (Some(format!("{}{t}", drm::PROTECTED)), Some("drm"))
            }
            _ => (None, None),
        };

        let audio = &mut asf.audio;
        if let Some(t) = &title {
            audio.set_title(t);
        }
        if let Some(a) = &artist {
            audio.set_artist(a);
        }
        if let Some(a) = &album {
            audio.set_album(a);
        }
        if let Some(y) = &year {
            audio.set_year(y);
        }
        if let Some(c) = &comment {
            audio.set_comment(c);
        }
        if let Some(g) = &genre {
            audio.set_genre(g);
        }
        if let Some(l) = &license {
            audio.set_license(l);
        }
        if let Some(t) = license_type {
            audio.set_license_type(t);
        }
        if let Some(t) = track {
            audio.set_track(t);
        }
        if let Some(b) = bitrate {
            audio.set_bitrate(b);
        }

        let video = &mut asf.video;
        if let Some(t) = &title {
            video.set_title(t);
        }
        if let Some(y) = &year {
            video.set_year(y);
        }
        if let Some(c) = &comment {
            video.set_comment(c);
        }
        if let Some(l) = &license {
            video.set_license(l);
        }
        if let Some(w) = width {
            video.set_width(w);
        }
        if let Some(h) = height {
            video.set_height(h);
        }
        if let Some(l) = length {
            asf.audio.set_length(l);
            asf.video.set_length(l);
        }

        asf
    }
}
