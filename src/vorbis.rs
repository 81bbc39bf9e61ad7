//! Vorbis comments, the `KEY=value` tag used by FLAC and Ogg.
//!
//! ```md
//! 4 bytes little endian vendor length
//! utf-8 vendor string
//! 4 bytes little endian comment count
//! comments:
//!     4 bytes little endian length
//!     utf-8 "KEY=value"
//! ```
use std::io::Cursor;

use tracing::{debug, trace};

use crate::genre::resolve_genre;
use crate::record::parse_pair;
use crate::util::{check_len, decode_utf8, ReadUtil};
use crate::{AudioMetadata, Error, ReadConfig};

/// Keys replaced by the writers. The key of a comment is case insensitive.
const MANAGED_KEYS: [&str; 14] = [
    "TITLE",
    "ARTIST",
    "ALBUM",
    "DATE",
    "COMMENT",
    "DESCRIPTION",
    "GENRE",
    "TRACKNUMBER",
    "TRACKTOTAL",
    "TOTALTRACKS",
    "DISCNUMBER",
    "DISCTOTAL",
    "TOTALDISCS",
    "LICENSE",
];

/// A parsed comment block.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VorbisComments {
    pub vendor: String,
    /// The comments in stored order, keys as found in the file.
    pub comments: Vec<(String, String)>,
}

impl VorbisComments {
    /// Parses a comment block. Returns the comments and the number of bytes consumed.
    pub fn parse(data: &[u8], cfg: &ReadConfig) -> crate::Result<(Self, usize)> {
        let mut reader = Cursor::new(data);
        let remaining = |r: &Cursor<&[u8]>| data.len() as u64 - r.position().min(data.len() as u64);

        let vendor_len = reader.read_le_u32()? as u64;
        check_len("Vorbis vendor", vendor_len, cfg.max_text_len)?;
        let vendor = decode_utf8(&reader.read_u8_vec(vendor_len)?);

        let count = reader.read_le_u32()? as u64;
        if count > remaining(&reader) / 4 {
            return Err(Error::corrupt(format!(
                "Vorbis comment count {count} exceeds the block size of {} bytes",
                data.len()
            )));
        }

        let mut comments = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let len = reader.read_le_u32()? as u64;
            check_len("Vorbis comment", len, cfg.max_text_len)?;
            let entry = decode_utf8(&reader.read_u8_vec(len)?);
            match entry.split_once('=') {
                Some((k, v)) => {
                    trace!("vorbis comment {k}={v}");
                    comments.push((k.to_owned(), v.to_owned()));
                }
                None => debug!("ignoring vorbis comment without separator"),
            }
        }

        Ok((Self { vendor, comments }, reader.position() as usize))
    }

    /// Returns the values of the key in stored order, ignoring case.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.comments
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first value of the key, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.comments.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v.as_str())
    }

    /// Fills the unset fields of the record. The first value of a key wins.
    pub fn apply(&self, audio: &mut AudioMetadata) {
        for (key, value) in self.comments.iter() {
            match key.to_ascii_uppercase().as_str() {
                "TITLE" => audio.fill_title(value),
                "ARTIST" => audio.fill_artist(value),
                "ALBUM" => audio.fill_album(value),
                "COMMENT" | "DESCRIPTION" => audio.fill_comment(value),
                "LICENSE" => audio.fill_license(value),
                "GENRE" => audio.fill_genre(resolve_genre(value)),
                "DATE" => audio.fill_year(value.trim().chars().take(4).collect::<String>()),
                "TRACKNUMBER" => {
                    let (track, total) = parse_pair(value);
                    if let Some(n) = track {
                        audio.fill_track(n);
                    }
                    if let Some(n) = total {
                        audio.fill_total_tracks(n);
                    }
                }
                "TRACKTOTAL" | "TOTALTRACKS" => {
                    if let (Some(n), _) = parse_pair(value) {
                        audio.fill_total_tracks(n);
                    }
                }
                "DISCNUMBER" => {
                    let (disk, total) = parse_pair(value);
                    if let Some(n) = disk {
                        audio.fill_disk(n);
                    }
                    if let Some(n) = total {
                        audio.fill_total_disks(n);
                    }
                }
                "DISCTOTAL" | "TOTALDISCS" => {
                    if let (Some(n), _) = parse_pair(value) {
                        audio.fill_total_disks(n);
                    }
                }
                _ => (),
            }
        }
    }

    /// Replaces the managed comments with the values of the record. Other comments are kept
    /// after the managed ones.
    pub fn update(&mut self, audio: &AudioMetadata) {
        let mut comments = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                comments.push((key.to_owned(), v));
            }
        };

        push("TITLE", audio.title().map(str::to_owned));
        push("ARTIST", audio.artist().map(str::to_owned));
        push("ALBUM", audio.album().map(str::to_owned));
        push("DATE", audio.year().map(str::to_owned));
        push("TRACKNUMBER", audio.track().map(|n| n.to_string()));
        push("TRACKTOTAL", audio.total_tracks().map(|n| n.to_string()));
        push("DISCNUMBER", audio.disk().map(|n| n.to_string()));
        push("DISCTOTAL", audio.total_disks().map(|n| n.to_string()));
        push("GENRE", audio.genre().map(str::to_owned));
        push("COMMENT", audio.comment().map(str::to_owned));
        push("LICENSE", audio.license().map(str::to_owned));

        let kept = self
            .comments
            .drain(..)
            .filter(|(k, _)| !MANAGED_KEYS.iter().any(|m| k.eq_ignore_ascii_case(m)));
        comments.extend(kept);
        self.comments = comments;
    }

    /// Serializes the comment block without a framing bit.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.vendor.len() as u32).to_le_bytes());
        out.extend_from_slice(self.vendor.as_bytes());
        out.extend_from_slice(&(self.comments.len() as u32).to_le_bytes());
        for (k, v) in self.comments.iter() {
            let entry = format!("{k}={v}");
            out.extend_from_slice(&(entry.len() as u32).to_le_bytes());
            out.extend_from_slice(entry.as_bytes());
        }
        out
    }
}
