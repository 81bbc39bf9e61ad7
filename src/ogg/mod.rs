//! Ogg page framing shared by the Vorbis and OGM readers and the Vorbis comment writer.
//!
//! ```md
//! 4 bytes "OggS"
//! 1 byte version
//! 1 byte header type
//! 8 bytes little endian granule position
//! 4 bytes little endian serial number
//! 4 bytes little endian page sequence number
//! 4 bytes little endian crc checksum
//! 1 byte segment count
//! segment count bytes lacing values
//! sum of lacing values bytes payload
//! ```
use std::collections::{HashMap, VecDeque};
use std::io::{Read, Seek, SeekFrom, Write};

use tracing::{debug, trace};

use crate::util::{check_len, ReadUtil, SeekUtil};
use crate::Error;

pub mod ogm;
pub mod vorbis;

pub const CAPTURE: [u8; 4] = *b"OggS";
pub const HEADER_LEN: usize = 27;
/// The page continues a packet from the previous page.
pub const CONTINUED: u8 = 0x01;
/// First page of a logical stream.
pub const BEGIN_OF_STREAM: u8 = 0x02;
/// Last page of a logical stream.
pub const END_OF_STREAM: u8 = 0x04;
/// How far from the end of a file the last page is searched for.
pub const LAST_PAGE_WINDOW: u64 = 64 * 1024;

const CRC_TABLE: [u32; 256] = crc_table();

const fn crc_table() -> [u32; 256] {
    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        let mut r = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            r = if r & 0x8000_0000 != 0 { (r << 1) ^ 0x04c1_1db7 } else { r << 1 };
            j += 1;
        }
        table[i] = r;
        i += 1;
    }
    table
}

/// The page checksum, computed with the checksum field zeroed.
pub fn checksum(data: &[u8]) -> u32 {
    data.iter().fold(0, |crc, &b| (crc << 8) ^ CRC_TABLE[((crc >> 24) as u8 ^ b) as usize])
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Page {
    pub version: u8,
    pub header_type: u8,
    pub granule: i64,
    pub serial: u32,
    pub sequence: u32,
    pub checksum: u32,
    pub lacing: Vec<u8>,
    pub data: Vec<u8>,
}

impl Page {
    /// Attempts to read a page at the current position of the reader.
    pub fn read_from(reader: &mut impl Read) -> crate::Result<Self> {
        let capture: [u8; 4] = reader.read_array()?;
        if capture != CAPTURE {
            return Err(Error::corrupt("Missing OggS page capture pattern"));
        }

        let version = reader.read_u8()?;
        let header_type = reader.read_u8()?;
        let granule = reader.read_le_i64()?;
        let serial = reader.read_le_u32()?;
        let sequence = reader.read_le_u32()?;
        let checksum = reader.read_le_u32()?;
        let segments = reader.read_u8()?;
        let lacing = reader.read_u8_vec(segments as u64)?;
        let len: u64 = lacing.iter().map(|&l| l as u64).sum();
        let data = reader.read_u8_vec(len)?;

        Ok(Self { version, header_type, granule, serial, sequence, checksum, lacing, data })
    }

    pub fn is_continued(&self) -> bool {
        self.header_type & CONTINUED != 0
    }

    /// The encoded length of this page.
    pub fn len(&self) -> usize {
        HEADER_LEN + self.lacing.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lacing.is_empty()
    }

    /// Encodes the page with a freshly computed checksum.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.len());
        buf.extend_from_slice(&CAPTURE);
        buf.push(self.version);
        buf.push(self.header_type);
        buf.extend_from_slice(&self.granule.to_le_bytes());
        buf.extend_from_slice(&self.serial.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&[0; 4]);
        buf.push(self.lacing.len() as u8);
        buf.extend_from_slice(&self.lacing);
        buf.extend_from_slice(&self.data);

        let crc = checksum(&buf);
        buf[22..26].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    pub fn write_to(&self, writer: &mut impl Write) -> crate::Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }

    /// Whether the stored checksum matches the page content.
    pub fn is_valid(&self) -> bool {
        let encoded = self.encode();
        u32::from_le_bytes([encoded[22], encoded[23], encoded[24], encoded[25]]) == self.checksum
    }

    /// Splits the payload along the lacing values. The flag is false for a packet that continues
    /// on the next page.
    pub fn packets(&self) -> Vec<(&[u8], bool)> {
        let mut packets = Vec::new();
        let mut start = 0;
        let mut pos = 0;
        for &l in self.lacing.iter() {
            pos += l as usize;
            if l < 255 {
                packets.push((&self.data[start..pos], true));
                start = pos;
            }
        }
        if self.lacing.last() == Some(&255) {
            packets.push((&self.data[start..pos], false));
        }
        packets
    }
}

/// Splits packets into pages of at most 255 lacing values. Pages on which no packet ends carry a
/// granule position of -1.
pub fn paginate(
    packets: &[&[u8]],
    serial: u32,
    first_sequence: u32,
    first_header_type: u8,
    granule: i64,
) -> Vec<Page> {
    let mut lacing = Vec::new();
    let mut payload = Vec::new();
    let mut starts = Vec::new();
    for p in packets {
        let full = p.len() / 255;
        for i in 0..full {
            lacing.push(255);
            starts.push(i == 0);
        }
        lacing.push((p.len() % 255) as u8);
        starts.push(full == 0);
        payload.extend_from_slice(p);
    }

    let mut pages = Vec::new();
    let mut offset = 0;
    for (i, (chunk, starts)) in lacing.chunks(255).zip(starts.chunks(255)).enumerate() {
        let len: usize = chunk.iter().map(|&l| l as usize).sum();
        let mut header_type = if i == 0 { first_header_type } else { 0 };
        if !starts[0] {
            header_type |= CONTINUED;
        }
        let ends_packet = chunk.iter().any(|&l| l < 255);

        pages.push(Page {
            version: 0,
            header_type,
            granule: if ends_packet { granule } else { -1 },
            serial,
            sequence: first_sequence + i as u32,
            checksum: 0,
            lacing: chunk.to_vec(),
            data: payload[offset..offset + len].to_vec(),
        });
        offset += len;
    }

    for p in pages.iter_mut() {
        let encoded = p.encode();
        p.checksum = u32::from_le_bytes([encoded[22], encoded[23], encoded[24], encoded[25]]);
    }
    pages
}

/// Reassembles packets from consecutive pages, keeping one partial packet per logical stream.
pub struct PacketReader<'a, R> {
    reader: &'a mut R,
    pending: VecDeque<(u32, Vec<u8>)>,
    partial: HashMap<u32, Vec<u8>>,
    max_packet_len: u64,
}

impl<'a, R: Read + Seek> PacketReader<'a, R> {
    pub fn new(reader: &'a mut R, max_packet_len: u64) -> Self {
        Self { reader, pending: VecDeque::new(), partial: HashMap::new(), max_packet_len }
    }

    /// Returns the next complete packet with the serial number of its stream, or `None` at the
    /// end of the file.
    pub fn next_packet(&mut self) -> crate::Result<Option<(u32, Vec<u8>)>> {
        loop {
            if let Some(p) = self.pending.pop_front() {
                return Ok(Some(p));
            }
            if self.reader.remaining_len()? == 0 {
                return Ok(None);
            }

            let page = Page::read_from(self.reader)?;
            trace!(
                "ogg page serial {}, sequence {}, {} bytes",
                page.serial,
                page.sequence,
                page.data.len()
            );
            self.push_page(&page)?;
        }
    }

    fn push_page(&mut self, page: &Page) -> crate::Result<()> {
        let mut buf = match (page.is_continued(), self.partial.remove(&page.serial)) {
            (true, Some(b)) => b,
            (false, Some(b)) => {
                debug!("dropping {} byte unterminated ogg packet", b.len());
                Vec::new()
            }
            (_, None) => Vec::new(),
        };

        for (data, complete) in page.packets() {
            buf.extend_from_slice(data);
            check_len("Ogg packet", buf.len() as u64, self.max_packet_len)?;
            if complete {
                self.pending.push_back((page.serial, std::mem::take(&mut buf)));
            } else {
                self.partial.insert(page.serial, std::mem::take(&mut buf));
            }
        }
        Ok(())
    }

    /// The position of the underlying reader, after the last page consumed.
    pub fn position(&mut self) -> crate::Result<u64> {
        Ok(self.reader.stream_position()?)
    }
}

/// Returns the granule position of the last page of the stream `serial` within the final
/// 64 KiB of the reader.
pub fn last_granule(reader: &mut (impl Read + Seek), serial: u32) -> crate::Result<Option<i64>> {
    let len = reader.seek(SeekFrom::End(0))?;
    let start = len.saturating_sub(LAST_PAGE_WINDOW);
    reader.seek(SeekFrom::Start(start))?;
    let buf = reader.read_u8_vec(len - start)?;

    let mut end = buf.len();
    while let Some(i) = buf[..end].windows(4).rposition(|w| w == CAPTURE) {
        end = i;
        if buf.len() < i + HEADER_LEN {
            continue;
        }
        let granule = i64::from_le_bytes([
            buf[i + 6],
            buf[i + 7],
            buf[i + 8],
            buf[i + 9],
            buf[i + 10],
            buf[i + 11],
            buf[i + 12],
            buf[i + 13],
        ]);
        let page_serial = u32::from_le_bytes([buf[i + 14], buf[i + 15], buf[i + 16], buf[i + 17]]);
        if page_serial == serial && granule >= 0 {
            return Ok(Some(granule));
        }
    }
    Ok(None)
}

/// Writes the page with its sequence number replaced and the checksum recomputed.
pub fn write_renumbered(
    writer: &mut impl Write,
    page: &mut Page,
    sequence: u32,
) -> crate::Result<()> {
    page.sequence = sequence;
    writer.write_all(&page.encode())?;
    Ok(())
}
