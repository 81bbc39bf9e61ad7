use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use super::head::{full_head_bytes, AtomBounds, Head, Size};
use super::ident::*;
use super::{ilst, scan, Scan};
use crate::util::ReadUtil;
use crate::write::{replace_file, TagWriter, WriteStatus};
use crate::{AudioMetadata, ErrorKind, ReadConfig};

/// The largest movie atom that is rewritten in memory.
const MAX_MOVIE_LEN: u64 = 64 * 1024 * 1024;

/// Rewrites the metadata item list of an MPEG-4 file.
#[derive(Clone, Debug, Default)]
pub struct M4aWriter;

impl TagWriter for M4aWriter {
    fn commit(&self, path: &Path, audio: &AudioMetadata) -> WriteStatus {
        match write_path(path, audio) {
            Ok(()) => WriteStatus::Success,
            Err(status) => status,
        }
    }
}

/// The handler reference of an item list.
///
/// ```md
/// 1 byte version
/// 3 bytes flags
/// 4 bytes predefined
/// 4 bytes handler type (mdir)
/// 12 bytes reserved
/// 2 bytes name
/// ```
fn handler_atom() -> Vec<u8> {
    let mut content = vec![0; 8];
    content.extend(b"mdirappl");
    content.extend([0; 10]);
    atom(HANDLER_REFERENCE, &content)
}

fn atom(fourcc: Fourcc, content: &[u8]) -> Vec<u8> {
    let size = Size::from(content.len() as u64);
    let mut buf = Head::from(size, fourcc).to_bytes();
    buf.extend_from_slice(content);
    buf
}

/// An edit of the movie atom: the bytes in `[start, end)` are replaced by `bytes`.
struct Splice {
    start: u64,
    end: u64,
    bytes: Vec<u8>,
    /// Existing ancestors whose size changes.
    parents: Vec<AtomBounds>,
}

impl Splice {
    fn len_diff(&self) -> i64 {
        self.bytes.len() as i64 - (self.end - self.start) as i64
    }
}

/// Creates the new item list and whatever of `hdlr`, `meta` and `udta` is missing.
fn plan(scan: &Scan, moov: &AtomBounds, audio: &AudioMetadata) -> Splice {
    let items = ilst::build(&scan.mp4.items, audio);
    let list: Vec<u8> = items.iter().flat_map(|i| i.raw.iter().copied()).collect();

    let mut bytes = Vec::new();
    if !scan.hdlr {
        bytes.extend(handler_atom());
    }
    bytes.extend(atom(ITEM_LIST, &list));

    let mut parents = vec![moov.clone()];
    let (start, end) = match (&scan.udta, &scan.meta, &scan.ilst) {
        (Some(udta), Some(meta), Some(ilst)) => {
            parents.extend([udta.clone(), meta.clone()]);
            (ilst.pos(), ilst.end())
        }
        (Some(udta), Some(meta), None) => {
            parents.extend([udta.clone(), meta.clone()]);
            (meta.end(), meta.end())
        }
        (Some(udta), None, _) => {
            let mut meta = full_head_bytes(0, [0; 3]).to_vec();
            meta.append(&mut bytes);
            bytes = atom(METADATA, &meta);
            parents.push(udta.clone());
            (udta.end(), udta.end())
        }
        (None, _, _) => {
            let mut meta = full_head_bytes(0, [0; 3]).to_vec();
            meta.append(&mut bytes);
            bytes = atom(USER_DATA, &atom(METADATA, &meta));
            (moov.end(), moov.end())
        }
    };

    Splice { start, end, bytes, parents }
}

/// Adds `diff` to the size of the atom at `bounds`, inside the movie buffer starting at `base`.
fn patch_size(
    buf: &mut [u8],
    base: u64,
    bounds: &AtomBounds,
    diff: i64,
) -> Result<(), WriteStatus> {
    let pos = (bounds.pos() - base) as usize;
    let len = bounds.len() as i64 + diff;
    if bounds.ext() {
        buf[pos + 8..pos + 16].copy_from_slice(&(len as u64).to_be_bytes());
    } else {
        let len = u32::try_from(len).map_err(|_| WriteStatus::FormatDefective)?;
        buf[pos..pos + 4].copy_from_slice(&len.to_be_bytes());
    }
    Ok(())
}

/// Shifts the chunk offsets that point behind the movie atom.
fn patch_chunk_offsets(
    buf: &mut [u8],
    base: u64,
    chunk_offsets: &[(Fourcc, AtomBounds)],
    moved_from: u64,
    diff: i64,
) -> Result<(), WriteStatus> {
    for (fourcc, bounds) in chunk_offsets {
        let entry_len = if *fourcc == SAMPLE_TABLE_CHUNK_OFFSET_64 { 8 } else { 4 };
        let content = (bounds.content_pos() - base) as usize;
        let end = (bounds.end() - base) as usize;
        if end - content < 8 {
            return Err(WriteStatus::FormatDefective);
        }
        let count = &buf[content + 4..content + 8];
        let count = u32::from_be_bytes([count[0], count[1], count[2], count[3]]) as usize;
        let table = content + 8;
        if table + count * entry_len > end {
            return Err(WriteStatus::FormatDefective);
        }

        for entry in buf[table..table + count * entry_len].chunks_exact_mut(entry_len) {
            if entry_len == 8 {
                let mut b = [0; 8];
                b.copy_from_slice(entry);
                let offset = u64::from_be_bytes(b);
                if offset >= moved_from {
                    entry.copy_from_slice(&((offset as i64 + diff) as u64).to_be_bytes());
                }
            } else {
                let offset = u32::from_be_bytes([entry[0], entry[1], entry[2], entry[3]]) as u64;
                if offset >= moved_from {
                    let shifted = u32::try_from(offset as i64 + diff)
                        .map_err(|_| WriteStatus::FormatDefective)?;
                    entry.copy_from_slice(&shifted.to_be_bytes());
                }
            }
        }
    }
    Ok(())
}

fn write_path(path: &Path, audio: &AudioMetadata) -> Result<(), WriteStatus> {
    let file = File::open(path).map_err(|_| WriteStatus::ReadWriteError)?;
    let mut reader = BufReader::new(file);

    let scan = scan(&mut reader, &ReadConfig::DEFAULT).map_err(|e| match e.kind {
        ErrorKind::NoTag => WriteStatus::IncorrectFileType,
        ErrorKind::Io(_) => WriteStatus::ReadWriteError,
        _ => WriteStatus::FormatDefective,
    })?;
    let moov = scan.moov.clone().ok_or(WriteStatus::FormatDefective)?;
    if moov.len() > MAX_MOVIE_LEN {
        return Err(WriteStatus::FormatDefective);
    }

    let splice = plan(&scan, &moov, audio);
    let diff = splice.len_diff();
    debug!(
        "replacing {} bytes of the movie atom with {}",
        splice.end - splice.start,
        splice.bytes.len()
    );

    reader.seek(SeekFrom::Start(moov.pos())).map_err(|_| WriteStatus::ReadWriteError)?;
    let mut buf = reader.read_u8_vec(moov.len()).map_err(|_| WriteStatus::ReadWriteError)?;

    let base = moov.pos();
    for p in splice.parents.iter() {
        patch_size(&mut buf, base, p, diff)?;
    }
    if scan.media_data.iter().any(|m| m.pos() > base) {
        patch_chunk_offsets(&mut buf, base, &scan.chunk_offsets, moov.end(), diff)?;
    }
    let start = (splice.start - base) as usize;
    let end = (splice.end - base) as usize;
    buf.splice(start..end, splice.bytes);

    let result = replace_file(path, |src, writer| {
        io::copy(&mut Read::by_ref(src).take(base), writer)?;
        writer.write_all(&buf)?;
        src.seek(SeekFrom::Start(moov.end()))?;
        io::copy(src, writer)?;
        Ok(())
    });

    result.map_err(|e| {
        debug!("failed to write mp4 file: {e}");
        WriteStatus::ReadWriteError
    })
}
