use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::asf::ident::HEADER;
use crate::mp3::{header, Mp3Writer};
use crate::mp4::M4aWriter;
use crate::ogg::vorbis::{OggWriter, IDENT_PACKET};
use crate::write::TagWriter;
use crate::{asf, flac, mp3, mp4, ogg, riff};
use crate::{Error, ErrorKind, Metadata, ReadConfig, WriteConfig};

/// The number of leading bytes needed to detect a format.
pub const SIGNATURE_LEN: usize = 128;

/// A container format with a metadata reader.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Format {
    /// Advanced Systems Format (WMA, WMV).
    Asf,
    /// MPEG audio with ID3 tags.
    Mp3,
    Flac,
    /// Ogg Vorbis audio.
    Ogg,
    /// Ogg DirectShow video.
    Ogm,
    /// MPEG-4 audio (M4A, M4B).
    M4a,
    /// RIFF AVI video.
    Avi,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Asf => "ASF",
            Self::Mp3 => "MP3",
            Self::Flac => "FLAC",
            Self::Ogg => "Ogg Vorbis",
            Self::Ogm => "OGM",
            Self::M4a => "MPEG-4 audio",
            Self::Avi => "AVI",
        };
        write!(f, "{name}")
    }
}

impl Format {
    pub const ALL: [Format; 7] =
        [Self::Asf, Self::Mp3, Self::Flac, Self::Ogg, Self::Ogm, Self::M4a, Self::Avi];

    /// Returns the format of a file extension, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "asf" | "wma" | "wmv" => Some(Self::Asf),
            "mp3" => Some(Self::Mp3),
            "flac" => Some(Self::Flac),
            "ogg" | "oga" => Some(Self::Ogg),
            "ogm" => Some(Self::Ogm),
            "m4a" | "m4b" | "m4p" | "mp4" => Some(Self::M4a),
            "avi" => Some(Self::Avi),
            _ => None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref().extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }

    /// Detects the format from the leading bytes of a file. Ogg files are told apart by the
    /// start of their first packet.
    pub fn detect(signature: &[u8]) -> Option<Self> {
        if signature.starts_with(&HEADER) {
            return Some(Self::Asf);
        }
        if signature.starts_with(b"fLaC") {
            return Some(Self::Flac);
        }
        if signature.starts_with(&ogg::CAPTURE) {
            let segments = *signature.get(26)? as usize;
            let packet = signature.get(ogg::HEADER_LEN + segments..)?;
            return match packet.first() {
                Some(0x01) if !packet.starts_with(IDENT_PACKET) => Some(Self::Ogm),
                _ => Some(Self::Ogg),
            };
        }
        if signature.get(4..8) == Some(&b"ftyp"[..]) {
            return Some(Self::M4a);
        }
        if signature.starts_with(b"RIFF") && signature.get(8..12) == Some(&b"AVI "[..]) {
            return Some(Self::Avi);
        }
        let frame_start = header::find_frame(signature).map(|(i, _)| i);
        if signature.starts_with(b"ID3") || frame_start == Some(0) {
            return Some(Self::Mp3);
        }
        None
    }

    /// Attempts to read the metadata of this format from the reader.
    pub fn read_from(
        &self,
        reader: &mut (impl Read + Seek),
        cfg: &ReadConfig,
    ) -> crate::Result<Metadata> {
        debug!("reading {self} metadata");
        let metadata = match self {
            Self::Asf => asf::read_from(reader, cfg)?.into_metadata(),
            Self::Mp3 => Metadata::Audio(mp3::read_from(reader, cfg)?.audio),
            Self::Flac => Metadata::Audio(flac::read_from(reader, cfg)?.audio),
            Self::Ogg => Metadata::Audio(ogg::vorbis::read_from(reader, cfg)?.audio),
            Self::Ogm => Metadata::Video(ogg::ogm::read_from(reader, cfg)?.video),
            Self::M4a => Metadata::Audio(mp4::read_from(reader, cfg)?.audio),
            Self::Avi => Metadata::Video(riff::read_from(reader)?.video),
        };
        Ok(metadata)
    }

    /// Returns the writer of this format, if it can be written.
    pub fn writer(&self, cfg: WriteConfig) -> Option<Box<dyn TagWriter>> {
        match self {
            Self::Mp3 => Some(Box::new(Mp3Writer::new(cfg))),
            Self::Ogg => Some(Box::new(OggWriter)),
            Self::M4a => Some(Box::new(M4aWriter)),
            _ => None,
        }
    }
}

/// Detects the format of the reader from its leading bytes and reads its metadata.
pub fn read_from(reader: &mut (impl Read + Seek), cfg: &ReadConfig) -> crate::Result<Metadata> {
    reader.seek(SeekFrom::Start(0))?;
    let mut signature = Vec::with_capacity(SIGNATURE_LEN);
    reader.by_ref().take(SIGNATURE_LEN as u64).read_to_end(&mut signature)?;

    let format = Format::detect(&signature)
        .ok_or_else(|| Error::new(ErrorKind::UnsupportedFormat, "Unknown file signature"))?;
    format.read_from(reader, cfg)
}

/// Reads the metadata of the file at the path. The format is chosen by the file extension and
/// detected from the content if the extension is unknown.
pub fn read_from_path(path: impl AsRef<Path>) -> crate::Result<Metadata> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    match Format::from_path(path) {
        Some(f) => f.read_from(&mut reader, &ReadConfig::DEFAULT),
        None => read_from(&mut reader, &ReadConfig::DEFAULT),
    }
}
