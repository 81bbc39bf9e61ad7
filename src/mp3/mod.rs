//! Reader and writer for MP3 files.
//!
//! Tags are read from a leading ID3v2 tag and a trailing ID3v1 trailer, ID3v2 values take
//! precedence. Bitrate and length are derived from the first MPEG frame and its VBR header.
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::{AudioMetadata, Error, ReadConfig, TagWriter, WriteConfig, WriteStatus};

pub use header::{ChannelMode, Emphasis, FrameHeader, Layer, MpegVersion, VbrHeader};
pub use id3v2::{Frame, Id3v2Tag};

pub mod header;
pub mod id3v1;
pub mod id3v2;

/// The number of bytes of the first frame inspected for a VBR header.
const VBR_SEARCH_LEN: u64 = 200;

/// Stream information derived from the first frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mp3Info {
    pub header: FrameHeader,
    /// The offset of the first frame.
    pub frame_offset: u64,
    pub vbr: Option<VbrHeader>,
    /// The declared or estimated number of frames.
    pub frames: u64,
    /// The average bitrate in kbps.
    pub bitrate: u32,
    pub duration: Duration,
}

impl Mp3Info {
    pub fn version(&self) -> MpegVersion {
        self.header.version
    }

    pub fn layer(&self) -> Layer {
        self.header.layer
    }

    pub fn channel_mode(&self) -> ChannelMode {
        self.header.channel_mode
    }

    pub fn sample_rate(&self) -> u32 {
        self.header.sample_rate()
    }
}

/// Everything read from an MP3 file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Mp3Metadata {
    /// The merged tags and stream information.
    pub audio: AudioMetadata,
    pub id3v2: Option<Id3v2Tag>,
    pub id3v1: Option<AudioMetadata>,
    pub info: Option<Mp3Info>,
}

/// Attempts to read the tags and stream information of an MP3 file. Fails if the stream has
/// neither a tag nor an MPEG frame.
pub fn read_from(reader: &mut (impl Read + Seek), cfg: &ReadConfig) -> crate::Result<Mp3Metadata> {
    let id3v2 = id3v2::read_from(reader, cfg)?;
    let id3v1 = id3v1::read_from(reader)?;

    let len = reader.seek(SeekFrom::End(0))?;
    let audio_start = id3v2.as_ref().map_or(0, |t| t.len());
    let audio_end = match id3v1 {
        Some(_) => len.saturating_sub(id3v1::TAG_LEN),
        None => len,
    };
    let info = read_info(reader, cfg, audio_start, audio_end)?;

    if id3v2.is_none() && id3v1.is_none() && info.is_none() {
        return Err(Error::no_tag("No ID3 tag or MPEG frame found"));
    }

    let mut audio = AudioMetadata::default();
    if let Some(tag) = &id3v2 {
        tag.apply(&mut audio);
    }
    if let Some(v1) = &id3v1 {
        fill_from(&mut audio, v1);
    }
    if let (Some(info), true) = (&info, cfg.read_audio_info) {
        audio.set_bitrate(info.bitrate);
        audio.set_length(info.duration.as_secs() as u32);
    }

    Ok(Mp3Metadata { audio, id3v2, id3v1, info })
}

/// Fills the unset fields of the record with the values of the other one.
fn fill_from(audio: &mut AudioMetadata, other: &AudioMetadata) {
    if let Some(t) = other.title() {
        audio.fill_title(t);
    }
    if let Some(a) = other.artist() {
        audio.fill_artist(a);
    }
    if let Some(a) = other.album() {
        audio.fill_album(a);
    }
    if let Some(y) = other.year() {
        audio.fill_year(y);
    }
    if let Some(c) = other.comment() {
        audio.fill_comment(c);
    }
    if let Some(t) = other.track() {
        audio.fill_track(t);
    }
    if let Some(g) = other.genre() {
        audio.fill_genre(g);
    }
}

/// Searches the first frame after the ID3v2 tag and derives bitrate and length.
fn read_info(
    reader: &mut (impl Read + Seek),
    cfg: &ReadConfig,
    audio_start: u64,
    audio_end: u64,
) -> crate::Result<Option<Mp3Info>> {
    reader.seek(SeekFrom::Start(audio_start))?;
    let mut buf = Vec::new();
    reader.by_ref().take(cfg.max_frame_search + 4).read_to_end(&mut buf)?;

    let (offset, header) = match header::find_frame(&buf) {
        Some(f) => f,
        None => {
            debug!("no mpeg frame within {} bytes", cfg.max_frame_search);
            return Ok(None);
        }
    };
    let frame_offset = audio_start + offset as u64;
    debug!("mpeg frame at {frame_offset}: {header:?}");

    reader.seek(SeekFrom::Start(frame_offset))?;
    let mut frame = Vec::new();
    reader.by_ref().take(VBR_SEARCH_LEN).read_to_end(&mut frame)?;
    let vbr = VbrHeader::find(&frame, &header);

    let frame_duration = header.frame_duration();
    let declared = vbr
        .as_ref()
        .and_then(|v| Some((v.frames().filter(|&f| f > 0)?, v.bytes())));
    let info = match declared {
        Some((frames, bytes)) => {
            let duration = frame_duration * frames;
            let bitrate = match bytes {
                Some(b) => (b as f64 * 8.0 / (duration.as_secs_f64() * 1000.0)) as u32,
                None => header.bitrate(),
            };
            debug!("vbr header: {frames} frames, {bitrate} kbps");
            Mp3Info { header, frame_offset, vbr, frames: frames as u64, bitrate, duration }
        }
        None => {
            let audio_len = audio_end.saturating_sub(frame_offset);
            let bitrate = header.bitrate();
            let frames = audio_len / header.average_frame_size().max(1);
            let duration =
                Duration::from_secs_f64(audio_len as f64 * 8.0 / (bitrate as f64 * 1000.0));
            Mp3Info { header, frame_offset, vbr, frames, bitrate, duration }
        }
    };

    Ok(Some(info))
}

/// Writes the ID3 tags of MP3 files.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Mp3Writer {
    pub cfg: WriteConfig,
}

impl Mp3Writer {
    pub fn new(cfg: WriteConfig) -> Self {
        Self { cfg }
    }
}

impl TagWriter for Mp3Writer {
    fn commit(&self, path: &Path, audio: &AudioMetadata) -> WriteStatus {
        match is_mp3(path) {
            Ok(true) => (),
            Ok(false) => return WriteStatus::IncorrectFileType,
            Err(status) => return status,
        }

        if self.cfg.write_id3v1 {
            let mut file = match OpenOptions::new().read(true).write(true).open(path) {
                Ok(f) => f,
                Err(_) => return WriteStatus::ReadWriteError,
            };
            let status = id3v1::write_to(&mut file, audio);
            if !status.is_success() {
                return status;
            }
        }

        if self.cfg.write_id3v2 {
            if let Err(status) = id3v2::write_path(path, audio) {
                return status;
            }
        }

        WriteStatus::Success
    }
}

/// Checks whether the file starts with an ID3v2 tag or contains an MPEG frame near its start.
fn is_mp3(path: &Path) -> Result<bool, WriteStatus> {
    let mut file = std::fs::File::open(path).map_err(|_| WriteStatus::ReadWriteError)?;
    match id3v2::read_header(&mut file) {
        Ok(Some(_)) => return Ok(true),
        Ok(None) => (),
        Err(_) => return Err(WriteStatus::BadId3),
    }

    let mut buf = Vec::new();
    let limit = ReadConfig::DEFAULT.max_frame_search;
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.by_ref().take(limit).read_to_end(&mut buf))
        .map_err(|_| WriteStatus::ReadWriteError)?;
    Ok(header::find_frame(&buf).is_some())
}
