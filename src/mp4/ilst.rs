//! Items of the metadata item list (`ilst`).
//!
//! ```md
//! item atom
//! └─ data atom
//!    1 byte version
//!    3 bytes type
//!    4 bytes locale
//!    payload
//! ```
use std::io::{Cursor, Read, Seek, SeekFrom};

use tracing::trace;

use super::head::{parse_children, Head, Size};
use super::ident::*;
use crate::genre::{genre_code, genre_name};
use crate::record::parse_pair;
use crate::util::{check_len, decode_utf8, ReadUtil, SeekUtil};
use crate::{AudioMetadata, Error, ReadConfig};

/// Type code of implicit binary data.
pub const IMPLICIT: u32 = 0;
/// Type code of UTF-8 text.
pub const UTF8: u32 = 1;

/// An item of the list with its raw bytes, head included.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Item {
    pub ident: Fourcc,
    pub raw: Vec<u8>,
}

impl Item {
    /// Returns the type code and payload of the first `data` child.
    pub fn data(&self) -> crate::Result<Option<(u32, Vec<u8>)>> {
        let mut cursor = Cursor::new(&self.raw[..]);
        let head = super::head::parse_head(&mut cursor)?;
        let mut found = None;

        parse_children(&mut cursor, self.ident, head.content_len(), |r, head, _| {
            if head.fourcc() != DATA || found.is_some() {
                return Ok(());
            }
            if head.content_len() < 8 {
                return Err(Error::corrupt(format!("Data atom of '{}' is too short", self.ident)));
            }
            let datatype = r.read_be_u32()? & 0x00ff_ffff;
            r.skip(4)?;
            found = Some((datatype, r.read_u8_vec(head.content_len() - 8)?));
            Ok(())
        })?;

        Ok(found)
    }

    /// Builds an item holding a single data atom.
    pub fn new(ident: Fourcc, datatype: u32, payload: &[u8]) -> Self {
        let data_size = Size::from(8 + payload.len() as u64);
        let item_size = Size::from(data_size.len());

        let mut raw = Vec::with_capacity(item_size.len() as usize);
        raw.extend(Head::from(item_size, ident).to_bytes());
        raw.extend(Head::from(data_size, DATA).to_bytes());
        raw.extend(datatype.to_be_bytes());
        raw.extend([0; 4]);
        raw.extend_from_slice(payload);
        Self { ident, raw }
    }

    pub fn text(ident: Fourcc, text: &str) -> Self {
        Self::new(ident, UTF8, text.as_bytes())
    }

    /// A `trkn` or `disk` item, `trkn` carries two extra trailing bytes.
    pub fn pair(ident: Fourcc, number: u16, total: u16) -> Self {
        let mut payload = vec![0, 0];
        payload.extend(number.to_be_bytes());
        payload.extend(total.to_be_bytes());
        if ident == TRACK_NUMBER {
            payload.extend([0, 0]);
        }
        Self::new(ident, IMPLICIT, &payload)
    }

    pub fn is_managed(&self) -> bool {
        MANAGED_ITEMS.contains(&self.ident)
    }
}

/// Reads the items of an `ilst` atom of `len` content bytes.
pub fn parse(
    reader: &mut (impl Read + Seek),
    len: u64,
    cfg: &ReadConfig,
) -> crate::Result<Vec<Item>> {
    let mut items = Vec::new();
    parse_children(reader, ITEM_LIST, len, |r, head, bounds| {
        check_len("Metadata item", head.len(), cfg.max_text_len)?;
        trace!("ilst item '{}', {} bytes", head.fourcc(), head.len());
        r.seek(SeekFrom::Start(bounds.pos()))?;
        let raw = r.read_u8_vec(head.len())?;
        items.push(Item { ident: head.fourcc(), raw });
        Ok(())
    })?;
    Ok(items)
}

fn be_u16_at(data: &[u8], i: usize) -> Option<u16> {
    data.get(i..i + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

/// Fills the record from the items. Earlier items take precedence, the data of unknown items
/// is never decoded.
pub fn apply(items: &[Item], audio: &mut AudioMetadata) -> crate::Result<()> {
    for item in items.iter().filter(|i| i.is_managed()) {
        let Some((_, data)) = item.data()? else {
            continue;
        };
        match item.ident {
            TITLE => audio.fill_title(decode_utf8(&data)),
            ALBUM => audio.fill_album(decode_utf8(&data)),
            ARTIST => audio.fill_artist(decode_utf8(&data)),
            YEAR => audio.fill_year(decode_utf8(&data).chars().take(4).collect::<String>()),
            COMMENT => audio.fill_comment(decode_utf8(&data)),
            CUSTOM_GENRE => audio.fill_genre(decode_utf8(&data)),
            STANDARD_GENRE => {
                let name = be_u16_at(&data, 0)
                    .and_then(|c| c.checked_sub(1))
                    .and_then(|c| genre_name(c as usize));
                if let Some(name) = name {
                    audio.fill_genre(name);
                }
            }
            TRACK_NUMBER => {
                if let Some(n) = be_u16_at(&data, 2).filter(|&n| n != 0) {
                    audio.fill_track(n);
                }
                if let Some(n) = be_u16_at(&data, 4).filter(|&n| n != 0) {
                    audio.fill_total_tracks(n);
                }
            }
            TRACK_TEXT => {
                let (track, total) = parse_pair(&decode_utf8(&data));
                if let Some(n) = track {
                    audio.fill_track(n);
                }
                if let Some(n) = total {
                    audio.fill_total_tracks(n);
                }
            }
            DISK_NUMBER => {
                if let Some(n) = be_u16_at(&data, 2).filter(|&n| n != 0) {
                    audio.fill_disk(n);
                }
                if let Some(n) = be_u16_at(&data, 4).filter(|&n| n != 0) {
                    audio.fill_total_disks(n);
                }
            }
            _ => (),
        }
    }
    Ok(())
}

/// Builds the item list content: the managed items from the record followed by the unmanaged
/// items of the existing list.
pub fn build(existing: &[Item], audio: &AudioMetadata) -> Vec<Item> {
    let mut items = Vec::new();
    if let Some(v) = audio.title() {
        items.push(Item::text(TITLE, v));
    }
    if let Some(v) = audio.artist() {
        items.push(Item::text(ARTIST, v));
    }
    if let Some(v) = audio.album() {
        items.push(Item::text(ALBUM, v));
    }
    if let Some(v) = audio.year() {
        items.push(Item::text(YEAR, v));
    }
    if let Some(v) = audio.comment() {
        items.push(Item::text(COMMENT, v));
    }
    if let Some(v) = audio.genre() {
        match genre_code(v) {
            Some(c) => {
                let code = (c as u16 + 1).to_be_bytes();
                items.push(Item::new(STANDARD_GENRE, IMPLICIT, &code));
            }
            None => items.push(Item::text(CUSTOM_GENRE, v)),
        }
    }
    if audio.track().is_some() || audio.total_tracks().is_some() {
        let track = audio.track().unwrap_or(0);
        items.push(Item::pair(TRACK_NUMBER, track, audio.total_tracks().unwrap_or(0)));
    }
    if audio.disk().is_some() || audio.total_disks().is_some() {
        let disk = audio.disk().unwrap_or(0);
        items.push(Item::pair(DISK_NUMBER, disk, audio.total_disks().unwrap_or(0)));
    }

    items.extend(existing.iter().filter(|i| !i.is_managed()).cloned());
    items
}
