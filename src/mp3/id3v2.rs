//! The ID3v2 tag at the start of MP3 files.
//!
//! ```md
//! 3 bytes "ID3"
//! 1 byte major version
//! 1 byte revision
//! 1 byte flags
//! 4 bytes synchsafe size of the tag excluding this header
//! ```
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace, warn};

use crate::genre::{genre_code, genre_name, resolve_genre};
use crate::record::parse_pair;
use crate::util::{
    decode_latin1, decode_utf16, decode_utf16_bom, decode_utf8, encode_latin1, until_nul, ReadUtil,
};
use crate::{AudioMetadata, Error, ErrorKind, ReadConfig, WriteStatus};

/// The length of the tag header and footer.
pub const HEADER_LEN: u64 = 10;
/// Padding added when a tag has to be rewritten.
pub const PADDING: usize = 1024;

const FLAG_UNSYNCHRONISATION: u8 = 0x80;
const FLAG_EXTENDED_HEADER: u8 = 0x40;
const FLAG_V2_COMPRESSION: u8 = 0x40;
const FLAG_FOOTER: u8 = 0x10;
/// The largest value of a 4 byte synchsafe integer.
const MAX_SYNCHSAFE: u32 = 0x0fff_ffff;

/// Frames replaced by the writer, as version 2.3 identifiers. Comment frames are only managed if
/// their description is empty.
const MANAGED_FRAMES: [&str; 7] = ["TIT2", "TPE1", "TALB", "TYER", "TDRC", "TRCK", "TCON"];

/// The read configuration of the writer. Frames of any size are kept when a tag is rewritten.
const WRITE_CONFIG: ReadConfig = ReadConfig { max_text_len: u64::MAX, ..ReadConfig::DEFAULT };

/// Identifiers of version 2.2 frames and their version 2.3 counterparts.
const V22_FRAMES: &[(&str, &str)] = &[
    ("BUF", "RBUF"),
    ("CNT", "PCNT"),
    ("COM", "COMM"),
    ("CRA", "AENC"),
    ("EQU", "EQUA"),
    ("ETC", "ETCO"),
    ("GEO", "GEOB"),
    ("IPL", "IPLS"),
    ("LNK", "LINK"),
    ("MCI", "MCDI"),
    ("MLL", "MLLT"),
    ("PIC", "APIC"),
    ("POP", "POPM"),
    ("REV", "RVRB"),
    ("RVA", "RVAD"),
    ("SLT", "SYLT"),
    ("STC", "SYTC"),
    ("TAL", "TALB"),
    ("TBP", "TBPM"),
    ("TCM", "TCOM"),
    ("TCO", "TCON"),
    ("TCR", "TCOP"),
    ("TDA", "TDAT"),
    ("TDY", "TDLY"),
    ("TEN", "TENC"),
    ("TFT", "TFLT"),
    ("TIM", "TIME"),
    ("TKE", "TKEY"),
    ("TLA", "TLAN"),
    ("TLE", "TLEN"),
    ("TMT", "TMED"),
    ("TOA", "TOPE"),
    ("TOF", "TOFN"),
    ("TOL", "TOLY"),
    ("TOR", "TORY"),
    ("TOT", "TOAL"),
    ("TP1", "TPE1"),
    ("TP2", "TPE2"),
    ("TP3", "TPE3"),
    ("TP4", "TPE4"),
    ("TPA", "TPOS"),
    ("TPB", "TPUB"),
    ("TRC", "TSRC"),
    ("TRD", "TRDA"),
    ("TRK", "TRCK"),
    ("TSI", "TSIZ"),
    ("TSS", "TSSE"),
    ("TT1", "TIT1"),
    ("TT2", "TIT2"),
    ("TT3", "TIT3"),
    ("TXT", "TEXT"),
    ("TXX", "TXXX"),
    ("TYE", "TYER"),
    ("UFI", "UFID"),
    ("ULT", "USLT"),
    ("WAF", "WOAF"),
    ("WAR", "WOAR"),
    ("WAS", "WOAS"),
    ("WCM", "WCOM"),
    ("WCP", "WCOP"),
    ("WPB", "WPUB"),
    ("WXX", "WXXX"),
];

/// A frame as stored in the tag. Identifier, flags and payload keep the layout of the tag
/// version, version 2.2 frames have no flags.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub id: String,
    pub flags: [u8; 2],
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(id: impl Into<String>, data: Vec<u8>) -> Self {
        Self { id: id.into(), flags: [0, 0], data }
    }
}

/// Returns the version 2.3 identifier of a frame stored in a tag of the version. Version 2.2
/// identifiers without counterpart are returned unchanged.
pub fn common_id(version: u8, id: &str) -> &str {
    match version {
        2 => V22_FRAMES.iter().find(|(v2, _)| *v2 == id).map_or(id, |&(_, v3)| v3),
        _ => id,
    }
}

/// Returns the identifier a version 2.3 frame is stored as in a tag of the version.
fn stored_id(version: u8, id: &str) -> Option<&str> {
    match version {
        2 => V22_FRAMES.iter().find(|(_, v3)| *v3 == id).map(|&(v2, _)| v2),
        _ => Some(id),
    }
}

/// Returns the payload of a frame stored in a tag of the version, or `None` if the payload is
/// compressed, encrypted or grouped and can't be interpreted directly.
///
/// ```md
/// version 2.3 format flags: ijk00000, i compression, j encryption, k grouping
/// version 2.4 format flags: 0h00kmnp, h grouping, k compression, m encryption,
///                           n unsynchronisation, p data length indicator
/// ```
pub fn payload(version: u8, frame: &Frame) -> Option<Cow<'_, [u8]>> {
    let format = frame.flags[1];
    match version {
        3 if format & 0xe0 != 0 => None,
        4 => {
            if format & 0x0c != 0 {
                return None;
            }
            let data = match format & 0x02 != 0 {
                true => Cow::Owned(undo_unsynchronisation(&frame.data)),
                false => Cow::Borrowed(&frame.data[..]),
            };
            // the group byte and the data length indicator precede the payload
            let skip = (format & 0x40 != 0) as usize + (format & 0x01 != 0) as usize * 4;
            if data.len() < skip {
                return None;
            }
            Some(match data {
                Cow::Borrowed(d) => Cow::Borrowed(&d[skip..]),
                Cow::Owned(mut d) => {
                    d.drain(..skip);
                    Cow::Owned(d)
                }
            })
        }
        _ => Some(Cow::Borrowed(&frame.data[..])),
    }
}

/// A parsed ID3v2 tag.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Id3v2Tag {
    pub version: u8,
    pub revision: u8,
    pub flags: u8,
    /// The size of the tag excluding header and footer.
    pub size: u32,
    pub frames: Vec<Frame>,
}

impl Id3v2Tag {
    /// The number of bytes the tag occupies at the start of the file.
    pub fn len(&self) -> u64 {
        let footer = match self.version == 4 && self.flags & FLAG_FOOTER != 0 {
            true => HEADER_LEN,
            false => 0,
        };
        HEADER_LEN + self.size as u64 + footer
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn has_footer(&self) -> bool {
        self.len() != HEADER_LEN + self.size as u64
    }

    /// Returns the interpretable payloads of the frames with the version 2.3 identifier in stored
    /// order.
    pub fn payloads(&self, id: &str) -> Vec<Cow<'_, [u8]>> {
        let Some(stored) = stored_id(self.version, id) else {
            return Vec::new();
        };
        self.frames
            .iter()
            .filter(|f| f.id == stored)
            .filter_map(|f| payload(self.version, f))
            .collect()
    }

    /// Returns the first interpretable frame with the version 2.3 identifier.
    pub fn frame(&self, id: &str) -> Option<&Frame> {
        let stored = stored_id(self.version, id)?;
        self.frames.iter().find(|f| f.id == stored && payload(self.version, f).is_some())
    }

    /// Returns the decoded text of the first text frame with the identifier.
    pub fn text(&self, id: &str) -> Option<String> {
        self.payloads(id).first().and_then(|p| decode_text(p))
    }

    /// Returns the text of the comment with an empty description, or the first comment.
    pub fn comment(&self) -> Option<String> {
        let payloads = self.payloads("COMM");
        let mut comments = payloads.iter().filter_map(|p| decode_comment(p));

        let first = comments.next()?;
        if first.0.is_empty() {
            return Some(first.1);
        }
        match comments.find(|(desc, _)| desc.is_empty()) {
            Some((_, text)) => Some(text),
            None => Some(first.1),
        }
    }

    /// Stores the tag values into the record, overwriting what is set.
    pub fn apply(&self, audio: &mut AudioMetadata) {
        if let Some(t) = self.text("TIT2") {
            audio.set_title(t);
        }
        if let Some(a) = self.text("TPE1") {
            audio.set_artist(a);
        }
        if let Some(a) = self.text("TALB") {
            audio.set_album(a);
        }
        if let Some(y) = self.text("TYER").or_else(|| self.text("TDRC")) {
            audio.set_year(y.trim().chars().take(4).collect::<String>());
        }
        if let Some(t) = self.text("TRCK") {
            let (track, total) = parse_pair(&t);
            if let Some(n) = track {
                audio.set_track(n);
            }
            if let Some(n) = total {
                audio.set_total_tracks(n);
            }
        }
        if let Some(d) = self.text("TPOS") {
            let (disk, total) = parse_pair(&d);
            if let Some(n) = disk {
                audio.set_disk(n);
            }
            if let Some(n) = total {
                audio.set_total_disks(n);
            }
        }
        if let Some(g) = self.text("TCON") {
            audio.set_genre(resolve_genre(&g));
        }
        if let Some(c) = self.comment() {
            audio.set_comment(c);
        }
    }
}

/// Decodes a synchsafe integer, 7 bits of each byte are used.
pub fn decode_synchsafe(bytes: [u8; 4]) -> Option<u32> {
    if bytes.iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    Some(bytes.iter().fold(0, |acc, &b| (acc << 7) | b as u32))
}

pub fn encode_synchsafe(val: u32) -> [u8; 4] {
    [
        (val >> 21 & 0x7f) as u8,
        (val >> 14 & 0x7f) as u8,
        (val >> 7 & 0x7f) as u8,
        (val & 0x7f) as u8,
    ]
}

/// Removes the zero bytes inserted after each `0xff` byte.
fn undo_unsynchronisation(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut prev = 0;
    for &b in data {
        if !(prev == 0xff && b == 0) {
            out.push(b);
        }
        prev = b;
    }
    out
}

/// Reads the 10 byte tag header at the current position. Returns the version, revision, flags
/// and size, or `None` if there is no tag.
pub fn read_header(reader: &mut impl Read) -> crate::Result<Option<(u8, u8, u8, u32)>> {
    let header: [u8; 10] = match reader.read_array() {
        Ok(h) => h,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if &header[..3] != b"ID3" {
        return Ok(None);
    }

    let size = decode_synchsafe([header[6], header[7], header[8], header[9]])
        .ok_or_else(|| Error::corrupt("ID3v2 tag size is not synchsafe"))?;
    Ok(Some((header[3], header[4], header[5], size)))
}

/// Attempts to read an ID3v2 tag at the start of the reader.
pub fn read_from(
    reader: &mut (impl Read + Seek),
    cfg: &ReadConfig,
) -> crate::Result<Option<Id3v2Tag>> {
    reader.seek(SeekFrom::Start(0))?;
    let (version, revision, flags, size) = match read_header(reader)? {
        Some(h) => h,
        None => return Ok(None),
    };
    debug!("id3v2.{version}.{revision} tag, {size} bytes");

    let mut tag = Id3v2Tag { version, revision, flags, size, frames: Vec::new() };
    if !(2..=4).contains(&version) {
        return Err(Error::new(
            ErrorKind::UnknownVersion(version),
            format!("Unknown ID3v2 version 2.{version}"),
        ));
    }

    let body = reader.read_u8_vec(size as u64)?;
    if version == 2 && flags & FLAG_V2_COMPRESSION != 0 {
        warn!("ignoring compressed id3v2.2 tag");
        return Ok(Some(tag));
    }
    let tag_unsync = flags & FLAG_UNSYNCHRONISATION != 0;
    let body = match tag_unsync && version < 4 {
        true => undo_unsynchronisation(&body),
        false => body,
    };

    let mut pos = 0;
    if version > 2 && flags & FLAG_EXTENDED_HEADER != 0 {
        let bytes = body.get(..4).ok_or_else(|| Error::corrupt("Truncated ID3v2 extended header"))?;
        let bytes = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let ext_len = match version {
            3 => u32::from_be_bytes(bytes) as usize + 4,
            _ => decode_synchsafe(bytes)
                .ok_or_else(|| Error::corrupt("ID3v2 extended header size is not synchsafe"))?
                as usize,
        };
        trace!("skipping {ext_len} byte id3v2 extended header");
        pos = ext_len;
    }

    tag.frames = parse_frames(&body, pos, version, tag_unsync, cfg)?;
    Ok(Some(tag))
}

fn parse_frames(
    body: &[u8],
    mut pos: usize,
    version: u8,
    tag_unsync: bool,
    cfg: &ReadConfig,
) -> crate::Result<Vec<Frame>> {
    let (id_len, head_len) = match version {
        2 => (3, 6),
        _ => (4, 10),
    };
    let mut frames = Vec::new();

    while pos + head_len <= body.len() {
        let head = &body[pos..pos + head_len];
        let id = &head[..id_len];
        if id[0] == 0 {
            break;
        }
        if !id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            warn!("invalid id3v2 frame id at {pos}, stopping");
            break;
        }
        let id = decode_latin1(id);

        let (size, flags) = match version {
            2 => (u32::from_be_bytes([0, head[3], head[4], head[5]]), [0, 0]),
            3 => (u32::from_be_bytes([head[4], head[5], head[6], head[7]]), [head[8], head[9]]),
            _ => {
                let size = decode_synchsafe([head[4], head[5], head[6], head[7]])
                    .ok_or_else(|| Error::corrupt(format!("Size of frame {id} is not synchsafe")))?;
                (size, [head[8], head[9]])
            }
        };
        pos += head_len;

        let size = size as usize;
        if size > body.len() - pos {
            return Err(Error::corrupt(format!(
                "ID3v2 frame {id} of {size} bytes exceeds the tag by {} bytes",
                size - (body.len() - pos)
            )));
        }
        let data = &body[pos..pos + size];
        pos += size;

        if size as u64 > cfg.max_text_len {
            debug!("skipping id3v2 frame {id} of {size} bytes");
            continue;
        }

        // every frame carries its own unsynchronisation flag in version 2.4
        let flags = match version == 4 && tag_unsync {
            true => [flags[0], flags[1] | 0x02],
            false => flags,
        };
        let frame = Frame { id, flags, data: data.to_vec() };
        trace!("id3v2 frame {}: {} bytes", frame.id, frame.data.len());
        frames.push(frame);
    }

    Ok(frames)
}

fn decode(encoding: u8, data: &[u8]) -> Option<String> {
    match encoding {
        0 => Some(decode_latin1(until_nul(data))),
        1 => Some(decode_utf16_bom(data)),
        2 => Some(decode_utf16(data, true)),
        3 => Some(decode_utf8(until_nul(data))),
        e => {
            debug!("unknown id3v2 text encoding {e}");
            None
        }
    }
}

/// Decodes a text frame, returns the first value.
pub fn decode_text(data: &[u8]) -> Option<String> {
    let (&encoding, text) = data.split_first()?;
    decode(encoding, text)
}

/// Decodes a comment frame into its description and text. The text is everything after the
/// last terminator.
///
/// ```md
/// 1 byte encoding
/// 3 bytes language
/// description followed by a terminator
/// text
/// ```
pub fn decode_comment(data: &[u8]) -> Option<(String, String)> {
    let encoding = *data.first()?;
    let content = data.get(4..)?;
    let unit = match encoding {
        1 | 2 => 2,
        _ => 1,
    };
    let is_nul = |i: usize| content[i..i + unit].iter().all(|&b| b == 0);

    let mut end = content.len() - content.len() % unit;
    while end >= unit && is_nul(end - unit) {
        end -= unit;
    }
    let split = (0..end).step_by(unit).filter(|&i| is_nul(i)).last();

    let (description, text) = match split {
        Some(i) => (&content[..i], &content[i + unit..end]),
        None => (&content[..0], &content[..end]),
    };
    Some((decode(encoding, description)?, decode(encoding, text)?))
}

/// Encodes text as ISO-8859-1 if possible, otherwise as UTF-16 with a byte order mark.
fn encode_text(text: &str) -> (u8, Vec<u8>) {
    match encode_latin1(text) {
        Some(bytes) => (0, bytes),
        None => {
            let mut bytes = vec![0xff, 0xfe];
            for unit in text.encode_utf16() {
                bytes.extend_from_slice(&unit.to_le_bytes());
            }
            (1, bytes)
        }
    }
}

fn text_frame(id: &str, text: &str) -> Frame {
    let (encoding, bytes) = encode_text(text);
    let mut data = vec![encoding];
    data.extend(bytes);
    Frame::new(id, data)
}

fn comment_frame(text: &str) -> Frame {
    let (encoding, bytes) = encode_text(text);
    let mut data = vec![encoding];
    data.extend_from_slice(b"eng");
    match encoding {
        0 => data.push(0),
        _ => data.extend_from_slice(&[0xff, 0xfe, 0, 0]),
    }
    data.extend(bytes);
    Frame::new("COMM", data)
}

fn is_managed(version: u8, frame: &Frame) -> bool {
    match common_id(version, &frame.id) {
        "COMM" => payload(version, frame)
            .and_then(|p| decode_comment(&p))
            .map_or(false, |(desc, _)| desc.is_empty()),
        id => MANAGED_FRAMES.contains(&id),
    }
}

/// Builds the frame list of a tag of the version written for the record. The frames of the
/// existing tag that aren't managed are kept as they are.
pub fn build_frames(version: u8, existing: &[Frame], audio: &AudioMetadata) -> Vec<Frame> {
    let mut frames = Vec::new();

    if let Some(t) = audio.title() {
        frames.push(text_frame("TIT2", t));
    }
    if let Some(a) = audio.artist() {
        frames.push(text_frame("TPE1", a));
    }
    if let Some(a) = audio.album() {
        frames.push(text_frame("TALB", a));
    }
    if let Some(y) = audio.year() {
        let id = match version {
            4 => "TDRC",
            _ => "TYER",
        };
        frames.push(text_frame(id, y));
    }
    match (audio.track(), audio.total_tracks()) {
        (Some(t), Some(n)) => frames.push(text_frame("TRCK", &format!("{t}/{n}"))),
        (Some(t), None) => frames.push(text_frame("TRCK", &t.to_string())),
        _ => (),
    }
    if let Some(c) = audio.comment() {
        frames.push(comment_frame(c));
    }
    if let Some(g) = audio.genre() {
        let text = match genre_code(g).and_then(|c| Some((c, genre_name(c as usize)?))) {
            Some((code, name)) => format!("({code}){name}"),
            None => g.to_owned(),
        };
        frames.push(text_frame("TCON", &text));
    }

    for frame in frames.iter_mut() {
        if let Some(id) = stored_id(version, &frame.id) {
            frame.id = id.to_owned();
        }
    }
    frames.extend(existing.iter().filter(|f| !is_managed(version, f)).cloned());
    frames
}

/// Serializes the frames in the layout of the version. Returns `None` if a frame is too large
/// for the size field of the version.
pub fn encode_frames(version: u8, frames: &[Frame]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    for f in frames {
        let len = u32::try_from(f.data.len()).ok()?;
        out.extend_from_slice(f.id.as_bytes());
        match version {
            2 => {
                if len > 0x00ff_ffff {
                    return None;
                }
                out.extend_from_slice(&len.to_be_bytes()[1..]);
            }
            3 => {
                out.extend_from_slice(&len.to_be_bytes());
                out.extend_from_slice(&f.flags);
            }
            _ => {
                if len > MAX_SYNCHSAFE {
                    return None;
                }
                out.extend_from_slice(&encode_synchsafe(len));
                out.extend_from_slice(&f.flags);
            }
        }
        out.extend_from_slice(&f.data);
    }
    Some(out)
}

/// Serializes a tag of the version with the body padded to `size` bytes.
pub fn encode_tag(version: u8, frames: &[u8], size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN as usize + size);
    out.extend_from_slice(b"ID3");
    out.extend_from_slice(&[version, 0, 0]);
    out.extend_from_slice(&encode_synchsafe(size as u32));
    out.extend_from_slice(frames);
    out.resize(HEADER_LEN as usize + size, 0);
    out
}

/// Writes the tag for the record to the file. The tag keeps the version of the existing tag, new
/// tags are version 2.3 tags. The tag is written in place if it fits into the space of the
/// existing tag, otherwise the file is rewritten.
pub fn write_path(path: &Path, audio: &AudioMetadata) -> Result<(), WriteStatus> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|_| WriteStatus::ReadWriteError)?;

    let existing = match read_from(&mut file, &WRITE_CONFIG) {
        Ok(t) => t,
        Err(e) if matches!(e.kind, ErrorKind::Io(_)) => return Err(WriteStatus::ReadWriteError),
        Err(e) => {
            debug!("existing id3v2 tag is invalid: {e}");
            return Err(WriteStatus::BadId3);
        }
    };

    if let Some(tag) = &existing {
        if tag.version == 2 && tag.flags & FLAG_V2_COMPRESSION != 0 {
            debug!("can't rewrite a compressed id3v2.2 tag");
            return Err(WriteStatus::BadId3);
        }
    }

    let version = existing.as_ref().map_or(3, |t| t.version);
    let old_frames = existing.as_ref().map_or(&[][..], |t| &t.frames[..]);
    let frames = encode_frames(version, &build_frames(version, old_frames, audio))
        .filter(|f| f.len() + PADDING <= MAX_SYNCHSAFE as usize)
        .ok_or(WriteStatus::FormatDefective)?;
    if existing.is_none() && frames.is_empty() {
        return Ok(());
    }

    match &existing {
        Some(old) if !old.has_footer() && frames.len() <= old.size as usize => {
            debug!("writing id3v2 tag in place");
            let tag = encode_tag(version, &frames, old.size as usize);
            write_in_place(&mut file, &tag).map_err(|_| WriteStatus::ReadWriteError)
        }
        _ => {
            let old_len = existing.as_ref().map_or(0, |t| t.len());
            debug!("rewriting file with a new id3v2 tag");
            let tag = encode_tag(version, &frames, frames.len() + PADDING);
            drop(file);
            crate::write::replace_file(path, |src, dst| {
                dst.write_all(&tag)?;
                src.seek(SeekFrom::Start(old_len))?;
                io::copy(src, dst)?;
                Ok(())
            })
            .map_err(|_| WriteStatus::ReadWriteError)
        }
    }
}

fn write_in_place(file: &mut File, tag: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(tag)?;
    file.flush()
}
