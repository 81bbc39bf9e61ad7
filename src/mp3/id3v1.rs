//! The fixed size ID3v1 trailer.
//!
//! ```md
//! 3 bytes "TAG"
//! 30 bytes title
//! 30 bytes artist
//! 30 bytes album
//! 4 bytes year
//! 30 bytes comment, or 28 bytes comment, a zero byte and the track number
//! 1 byte genre
//! ```
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::genre::{genre_code, genre_name, NO_GENRE};
use crate::util::{decode_latin1, encode_latin1_lossy, until_nul, ReadUtil};
use crate::{AudioMetadata, WriteStatus};

/// The size of the trailer.
pub const TAG_LEN: u64 = 128;

const TITLE: usize = 3;
const ARTIST: usize = 33;
const ALBUM: usize = 63;
const YEAR: usize = 93;
const COMMENT: usize = 97;
const TRACK_MARKER: usize = 125;
const TRACK: usize = 126;
const GENRE: usize = 127;

fn text(tag: &[u8; 128], start: usize, len: usize) -> Option<String> {
    crate::record::normalize(&decode_latin1(until_nul(&tag[start..start + len])))
}

/// Attempts to read the trailer. Returns `None` if the stream is shorter than the trailer or its
/// last 128 bytes don't start with `TAG`.
pub fn read_from(reader: &mut (impl Read + Seek)) -> crate::Result<Option<AudioMetadata>> {
    let len = reader.seek(SeekFrom::End(0))?;
    if len < TAG_LEN {
        return Ok(None);
    }
    reader.seek(SeekFrom::End(-(TAG_LEN as i64)))?;
    let tag: [u8; 128] = reader.read_array()?;
    if &tag[..3] != b"TAG" {
        return Ok(None);
    }
    debug!("found id3v1 trailer");
    Ok(Some(parse(&tag)))
}

pub fn parse(tag: &[u8; 128]) -> AudioMetadata {
    let mut audio = AudioMetadata::default();

    if let Some(t) = text(tag, TITLE, 30) {
        audio.set_title(t);
    }
    if let Some(a) = text(tag, ARTIST, 30) {
        audio.set_artist(a);
    }
    if let Some(a) = text(tag, ALBUM, 30) {
        audio.set_album(a);
    }
    if let Some(y) = text(tag, YEAR, 4) {
        audio.set_year(y);
    }

    // ID3v1.1 stores the track in the last byte of the comment
    let has_track = tag[TRACK_MARKER] == 0 && tag[TRACK] != 0;
    let comment_len = if has_track { 28 } else { 30 };
    if let Some(c) = text(tag, COMMENT, comment_len) {
        audio.set_comment(c);
    }
    if has_track {
        audio.set_track(tag[TRACK] as u16);
    }

    if let Some(g) = genre_name(tag[GENRE] as usize) {
        audio.set_genre(g);
    }

    audio
}

/// Writes `bytes` padded with zeros or truncated to `len` bytes.
fn write_field(writer: &mut impl Write, bytes: &[u8], len: usize) -> std::io::Result<()> {
    let mut field = bytes[..bytes.len().min(len)].to_vec();
    field.resize(len, 0);
    writer.write_all(&field)
}

/// Writes the trailer in place. An existing trailer is overwritten, otherwise a new one is
/// appended.
pub fn write_to(file: &mut File, audio: &AudioMetadata) -> WriteStatus {
    let len = match file.seek(SeekFrom::End(0)) {
        Ok(l) => l,
        Err(_) => return WriteStatus::ReadWriteError,
    };
    if len < TAG_LEN {
        return WriteStatus::FormatDefective;
    }

    let track = match audio.track() {
        Some(t) => match u8::try_from(t) {
            Ok(t) => t,
            Err(_) => return WriteStatus::FailedTrack,
        },
        None => 0,
    };
    let genre = match audio.genre() {
        Some(g) => genre_code(g).unwrap_or(NO_GENRE),
        None => NO_GENRE,
    };

    let existing = file
        .seek(SeekFrom::End(-(TAG_LEN as i64)))
        .and_then(|_| file.read_array::<3>());
    let pos = match existing {
        Ok(magic) if &magic == b"TAG" => len - TAG_LEN,
        Ok(_) => len,
        Err(_) => return WriteStatus::ReadWriteError,
    };
    debug!("writing id3v1 trailer at {pos}");

    let text = |t: Option<&str>| encode_latin1_lossy(t.unwrap_or_default());
    let stages: [(WriteStatus, Vec<u8>, usize); 6] = [
        (WriteStatus::ReadWriteError, b"TAG".to_vec(), 3),
        (WriteStatus::FailedTitle, text(audio.title()), 30),
        (WriteStatus::FailedArtist, text(audio.artist()), 30),
        (WriteStatus::FailedAlbum, text(audio.album()), 30),
        (WriteStatus::FailedYear, text(audio.year()), 4),
        (WriteStatus::FailedComment, text(audio.comment()), 28),
    ];

    if file.seek(SeekFrom::Start(pos)).is_err() {
        return WriteStatus::ReadWriteError;
    }
    for (status, bytes, len) in stages {
        if write_field(file, &bytes, len).is_err() {
            return status;
        }
    }
    if file.write_all(&[0, track]).is_err() {
        return WriteStatus::FailedTrack;
    }
    if file.write_all(&[genre]).is_err() {
        return WriteStatus::FailedGenre;
    }
    if file.flush().is_err() {
        return WriteStatus::ReadWriteError;
    }

    WriteStatus::Success
}
