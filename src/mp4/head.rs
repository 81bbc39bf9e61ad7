use std::io::{Read, Seek, SeekFrom};
use std::ops::Deref;

use super::ident::Fourcc;
use crate::util::{ReadUtil, SeekUtil};
use crate::Error;

/// The declared length of an atom and whether its head uses the 64 bit form.
///
/// ```md
/// 4 bytes standard length
/// 4 bytes identifier
/// 8 bytes optional extended length
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Size {
    /// 16 byte head with a 64 bit length instead of the 8 byte one.
    ext: bool,
    /// The length including this head.
    len: u64,
}

impl Size {
    pub const fn from(content_len: u64) -> Self {
        let mut len = content_len + 8;
        let ext = len > u32::MAX as u64;
        if ext {
            len += 8;
        }
        Self { ext, len }
    }

    pub const fn ext(&self) -> bool {
        self.ext
    }

    pub const fn len(&self) -> u64 {
        self.len
    }

    pub const fn head_len(&self) -> u64 {
        match self.ext {
            true => 16,
            false => 8,
        }
    }

    pub const fn content_len(&self) -> u64 {
        self.len - self.head_len()
    }
}

/// The size and identifier preceding the content of every atom.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Head {
    size: Size,
    fourcc: Fourcc,
}

impl Deref for Head {
    type Target = Size;

    fn deref(&self) -> &Self::Target {
        &self.size
    }
}

impl Head {
    pub const fn new(ext: bool, len: u64, fourcc: Fourcc) -> Self {
        Self { size: Size { ext, len }, fourcc }
    }

    pub const fn from(size: Size, fourcc: Fourcc) -> Self {
        Self { size, fourcc }
    }

    pub const fn size(&self) -> Size {
        self.size
    }

    pub const fn fourcc(&self) -> Fourcc {
        self.fourcc
    }
}

/// Reads an atom head. A 32 bit length of 1 is followed by the 64 bit length, a length of 0 runs
/// to the end of the stream and lengths shorter than the head itself are corrupt.
pub fn parse_head(reader: &mut (impl Read + Seek)) -> crate::Result<Head> {
    let len = reader.read_be_u32()? as u64;
    let fourcc = Fourcc(reader.read_array()?);

    match len {
        0 => Ok(Head::new(false, reader.remaining_len()? + 8, fourcc)),
        1 => {
            let len = reader.read_be_u64()?;
            if len < 16 {
                return Err(Error::corrupt(format!(
                    "Extended length of '{fourcc}' is shorter than its head: {len}"
                )));
            }
            Ok(Head::new(true, len, fourcc))
        }
        2..=7 => Err(Error::corrupt(format!(
            "Length of '{fourcc}' is shorter than its head: {len}"
        ))),
        _ => Ok(Head::new(false, len, fourcc)),
    }
}

impl Head {
    /// Encodes the head, 8 bytes or 16 bytes with an extended length.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.head_len() as usize);
        if self.ext() {
            buf.extend(1u32.to_be_bytes());
            buf.extend(*self.fourcc);
            buf.extend(self.len().to_be_bytes());
        } else {
            buf.extend((self.len() as u32).to_be_bytes());
            buf.extend(*self.fourcc);
        }
        buf
    }
}

/// Reads the version and flags of a full atom.
///
/// ```md
/// 1 byte version
/// 3 bytes flags
/// ```
pub fn parse_full_head(reader: &mut impl Read) -> crate::Result<(u8, [u8; 3])> {
    let version = reader.read_u8()?;
    let flags = reader.read_array()?;
    Ok((version, flags))
}

pub const fn full_head_bytes(version: u8, flags: [u8; 3]) -> [u8; 4] {
    [version, flags[0], flags[1], flags[2]]
}

/// The position of an atom inside the stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AtomBounds {
    pos: u64,
    size: Size,
}

impl Deref for AtomBounds {
    type Target = Size;

    fn deref(&self) -> &Self::Target {
        &self.size
    }
}

impl AtomBounds {
    pub const fn pos(&self) -> u64 {
        self.pos
    }

    pub fn content_pos(&self) -> u64 {
        self.pos + self.head_len()
    }

    pub fn end(&self) -> u64 {
        self.pos + self.len()
    }
}

/// Returns the bounds of the atom whose head was just parsed. The end of the atom has to be
/// addressable.
pub fn find_bounds(reader: &mut impl Seek, size: Size) -> crate::Result<AtomBounds> {
    let pos = reader.stream_position()? - size.head_len();
    if pos.checked_add(size.len()).is_none() {
        return Err(Error::corrupt(format!(
            "Atom of {} bytes at {pos} ends beyond the addressable range",
            size.len()
        )));
    }
    Ok(AtomBounds { pos, size })
}

/// Calls `f` for every child atom inside the next `len` bytes. Every child has to fit into the
/// remaining bytes of its parent, and the reader is moved to the end of each child afterwards.
pub fn parse_children<R: Read + Seek>(
    reader: &mut R,
    parent: Fourcc,
    len: u64,
    mut f: impl FnMut(&mut R, Head, &AtomBounds) -> crate::Result<()>,
) -> crate::Result<()> {
    let end = reader.stream_position()?.checked_add(len).ok_or_else(|| {
        Error::corrupt(format!("Content of '{parent}' ends beyond the addressable range"))
    })?;

    while reader.stream_position()? + 8 <= end {
        let head = parse_head(reader)?;
        let bounds = find_bounds(reader, head.size())?;
        if bounds.end() > end {
            return Err(Error::corrupt(format!(
                "Atom '{}' of {} bytes exceeds its parent '{parent}'",
                head.fourcc(),
                head.len(),
            )));
        }

        f(reader, head, &bounds)?;
        crate::util::seek_to_end(reader, &head.fourcc().to_string(), bounds.end())?;
    }

    reader.seek(SeekFrom::Start(end))?;
    Ok(())
}
