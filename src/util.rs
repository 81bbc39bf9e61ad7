use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::warn;

use crate::{Error, ErrorKind};

pub trait ReadUtil: Read {
    /// Attempts to read an unsigned 8 bit integer from the reader.
    fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Attempts to read a fixed size byte array from the reader.
    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Attempts to read an unsigned 16 bit little endian integer from the reader.
    fn read_le_u16(&mut self) -> io::Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Attempts to read an unsigned 32 bit little endian integer from the reader.
    fn read_le_u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Attempts to read a signed 32 bit little endian integer from the reader.
    fn read_le_i32(&mut self) -> io::Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Attempts to read a signed 64 bit little endian integer from the reader.
    fn read_le_i64(&mut self) -> io::Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Attempts to read an unsigned 24 bit big endian integer from the reader.
    fn read_be_u24(&mut self) -> io::Result<u32> {
        let [a, b, c] = self.read_array()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    /// Attempts to read an unsigned 32 bit big endian integer from the reader.
    fn read_be_u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Attempts to read an unsigned 64 bit big endian integer from the reader.
    fn read_be_u64(&mut self) -> io::Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// Attempts to read a 16 byte GUID from the reader.
    fn read_guid(&mut self) -> io::Result<Guid> {
        self.read_array()
    }

    /// Attempts to read `len` bytes into a vector. The buffer grows with the data actually read,
    /// so a bogus length fails with an unexpected EOF instead of a huge allocation.
    fn read_u8_vec(&mut self, len: u64) -> io::Result<Vec<u8>>
    where
        Self: Sized,
    {
        let mut buf = Vec::new();
        self.take(len).read_to_end(&mut buf)?;
        if (buf.len() as u64) < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes, stream ended after {}", buf.len()),
            ));
        }
        Ok(buf)
    }
}

impl<T: Read> ReadUtil for T {}

pub trait SeekUtil: Seek {
    /// Returns the number of bytes between the current position and the end of the stream.
    fn remaining_len(&mut self) -> io::Result<u64> {
        let pos = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(end.saturating_sub(pos))
    }

    /// Skips `len` bytes, failing if fewer bytes remain.
    fn skip(&mut self, len: u64) -> io::Result<()> {
        let remaining = self.remaining_len()?;
        if len > remaining {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("can't skip {len} bytes, only {remaining} remain"),
            ));
        }
        self.seek(SeekFrom::Current(len as i64))?;
        Ok(())
    }
}

impl<T: Seek> SeekUtil for T {}

pub trait WriteUtil: Write {
    fn write_u8(&mut self, val: u8) -> io::Result<()> {
        self.write_all(&[val])
    }

    fn write_be_u32(&mut self, val: u32) -> io::Result<()> {
        self.write_all(&val.to_be_bytes())
    }

    fn write_be_u64(&mut self, val: u64) -> io::Result<()> {
        self.write_all(&val.to_be_bytes())
    }
}

impl<T: Write> WriteUtil for T {}

/// A 16 byte object identifier.
pub type Guid = [u8; 16];

/// Fails with a corruption error if a declared length exceeds the sanity ceiling.
pub fn check_len(name: &str, len: u64, max: u64) -> crate::Result<()> {
    if len > max {
        return Err(Error::corrupt(format!(
            "{name} length {len} exceeds the limit of {max} bytes"
        )));
    }
    Ok(())
}

/// Fails with a corruption error if a 32 bit value is negative when interpreted as signed.
pub fn non_negative(name: &str, val: i32) -> crate::Result<u32> {
    u32::try_from(val).map_err(|_| Error::corrupt(format!("{name} is negative: {val}")))
}

/// Moves the reader to the end of a nested structure. Fails if the reader already went past it.
pub fn seek_to_end(reader: &mut (impl Read + Seek), name: &str, end: u64) -> crate::Result<()> {
    let pos = reader.stream_position()?;
    if pos > end {
        return Err(Error::new(
            ErrorKind::SizeMismatch,
            format!("{name} read {} bytes past its declared end", pos - end),
        ));
    }
    reader.skip(end - pos)?;
    Ok(())
}

/// Returns the bytes up to the first zero byte.
pub fn until_nul(data: &[u8]) -> &[u8] {
    match data.iter().position(|&b| b == 0) {
        Some(i) => &data[..i],
        None => data,
    }
}

pub fn decode_latin1(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

/// Encodes the text as ISO-8859-1, returns `None` if a character is outside of its range.
pub fn encode_latin1(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

/// Encodes the text as ISO-8859-1, replacing unrepresentable characters with `?`.
pub fn encode_latin1_lossy(text: &str) -> Vec<u8> {
    text.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')).collect()
}

pub fn decode_utf8(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(s) => s.to_owned(),
        Err(_) => {
            warn!("invalid utf-8 text, decoding as latin-1");
            decode_latin1(data)
        }
    }
}

/// Decodes UTF-16 text. If the text can't be decoded the zero bytes are stripped and the rest is
/// decoded as single byte text.
pub fn decode_utf16(data: &[u8], big_endian: bool) -> String {
    let units = data.chunks_exact(2).map(|c| match big_endian {
        true => u16::from_be_bytes([c[0], c[1]]),
        false => u16::from_le_bytes([c[0], c[1]]),
    });
    let units: Vec<u16> = units.take_while(|&u| u != 0).collect();

    match String::from_utf16(&units) {
        Ok(s) => s,
        Err(_) => {
            warn!("invalid utf-16 text, stripping zero bytes");
            let stripped: Vec<u8> = data.iter().copied().filter(|&b| b != 0).collect();
            decode_latin1(&stripped)
        }
    }
}

/// Decodes UTF-16 text that starts with a byte order mark, defaulting to little endian.
pub fn decode_utf16_bom(data: &[u8]) -> String {
    match data {
        [0xfe, 0xff, rest @ ..] => decode_utf16(rest, true),
        [0xff, 0xfe, rest @ ..] => decode_utf16(rest, false),
        _ => decode_utf16(data, false),
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn skip_past_end() {
        let mut reader = Cursor::new(vec![0u8; 10]);
        reader.skip(4).unwrap();
        assert_eq!(reader.position(), 4);
        assert!(reader.skip(7).is_err());
        assert_eq!(reader.position(), 4);
        reader.skip(6).unwrap();
    }

    #[test]
    fn read_vec_truncated() {
        let mut reader = Cursor::new(vec![1u8, 2, 3]);
        assert!(reader.read_u8_vec(u32::MAX as u64).is_err());
    }

    #[test]
    fn mixed_endianness() {
        let mut reader = Cursor::new(vec![0x01, 0x02, 0x03, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(reader.read_be_u24().unwrap(), 0x010203);
        assert_eq!(reader.read_le_u32().unwrap(), 0x04030201);
    }

    #[test]
    fn utf16_fallback() {
        assert_eq!(decode_utf16(&[b'h', 0, b'i', 0, 0, 0, b'x', 0], false), "hi");
        // lone surrogate
        assert_eq!(decode_utf16(&[0x00, 0xd8, b'a', 0], false), "\u{d8}a");
        assert_eq!(decode_utf16_bom(&[0xfe, 0xff, 0, b'o', 0, b'k']), "ok");
    }

    #[test]
    fn latin1() {
        assert_eq!(encode_latin1("caf\u{e9}"), Some(vec![b'c', b'a', b'f', 0xe9]));
        assert_eq!(encode_latin1("\u{263a}"), None);
        assert_eq!(encode_latin1_lossy("a\u{263a}"), b"a?".to_vec());
        assert_eq!(decode_latin1(&[0xe9]), "\u{e9}");
    }
}
