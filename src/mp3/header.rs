//! MPEG audio frame headers and the VBR headers stored in the first frame.
//!
//! ```md
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//! A sync
//! B version
//! C layer
//! D protection bit, 0 if protected by a CRC
//! E bitrate index
//! F sample rate index
//! G padding
//! H private
//! I channel mode
//! J mode extension
//! K copyright
//! L original
//! M emphasis
//! ```
use std::time::Duration;

/// Bitrates in kbps indexed by the bitrate index and the version/layer group.
///
/// Groups: MPEG1 layer I, MPEG1 layer II, MPEG1 layer III, MPEG2/2.5 layer I,
/// MPEG2/2.5 layer II and III.
const BITRATES: [[u32; 5]; 15] = [
    [0, 0, 0, 0, 0],
    [32, 32, 32, 32, 8],
    [64, 48, 40, 48, 16],
    [96, 56, 48, 56, 24],
    [128, 64, 56, 64, 32],
    [160, 80, 64, 80, 40],
    [192, 96, 80, 96, 48],
    [224, 112, 96, 112, 56],
    [256, 128, 112, 128, 64],
    [288, 160, 128, 144, 80],
    [320, 192, 160, 160, 96],
    [352, 224, 192, 176, 112],
    [384, 256, 224, 192, 128],
    [416, 320, 256, 224, 144],
    [448, 384, 320, 256, 160],
];

/// Sample rates in Hz indexed by the sample rate index, for MPEG1.
const SAMPLE_RATES: [u32; 3] = [44100, 48000, 32000];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

impl MpegVersion {
    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0b00 => Some(Self::Mpeg25),
            0b10 => Some(Self::Mpeg2),
            0b11 => Some(Self::Mpeg1),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Layer {
    I,
    II,
    III,
}

impl Layer {
    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0b01 => Some(Self::III),
            0b10 => Some(Self::II),
            0b11 => Some(Self::I),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Emphasis {
    None,
    FiftyFifteen,
    CcitJ17,
}

/// A decoded MPEG audio frame header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    /// Whether the frame is protected by a CRC.
    pub protection: bool,
    pub bitrate_index: u8,
    pub sample_rate_index: u8,
    pub padding: bool,
    pub private: bool,
    pub channel_mode: ChannelMode,
    pub copyright: bool,
    pub original: bool,
    pub emphasis: Emphasis,
}

impl FrameHeader {
    /// Decodes the 4 header bytes. Returns `None` if the sync pattern is missing or any field
    /// holds a reserved or invalid value.
    pub fn decode(bytes: [u8; 4]) -> Option<Self> {
        let h = u32::from_be_bytes(bytes);
        if h >> 21 != 0x7ff {
            return None;
        }

        let version = MpegVersion::from_bits((h >> 19) & 0b11)?;
        let layer = Layer::from_bits((h >> 17) & 0b11)?;
        let bitrate_index = ((h >> 12) & 0b1111) as u8;
        if bitrate_index == 0 || bitrate_index == 15 {
            return None;
        }
        let sample_rate_index = ((h >> 10) & 0b11) as u8;
        if sample_rate_index == 3 {
            return None;
        }
        let emphasis = match h & 0b11 {
            0b00 => Emphasis::None,
            0b01 => Emphasis::FiftyFifteen,
            0b11 => Emphasis::CcitJ17,
            _ => return None,
        };
        let channel_mode = match (h >> 6) & 0b11 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        Some(Self {
            version,
            layer,
            protection: (h >> 16) & 1 == 0,
            bitrate_index,
            sample_rate_index,
            padding: (h >> 9) & 1 == 1,
            private: (h >> 8) & 1 == 1,
            channel_mode,
            copyright: (h >> 3) & 1 == 1,
            original: (h >> 2) & 1 == 1,
            emphasis,
        })
    }

    /// The bitrate in kbps.
    pub fn bitrate(&self) -> u32 {
        let group = match (self.version, self.layer) {
            (MpegVersion::Mpeg1, Layer::I) => 0,
            (MpegVersion::Mpeg1, Layer::II) => 1,
            (MpegVersion::Mpeg1, Layer::III) => 2,
            (_, Layer::I) => 3,
            (_, _) => 4,
        };
        BITRATES[self.bitrate_index as usize][group]
    }

    /// The sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        let rate = SAMPLE_RATES[self.sample_rate_index as usize];
        match self.version {
            MpegVersion::Mpeg1 => rate,
            MpegVersion::Mpeg2 => rate / 2,
            MpegVersion::Mpeg25 => rate / 4,
        }
    }

    /// The number of samples encoded in one frame.
    pub fn samples_per_frame(&self) -> u32 {
        let samples = match self.layer {
            Layer::I => 384,
            _ => 1152,
        };
        match self.version {
            MpegVersion::Mpeg1 => samples,
            _ => samples / 2,
        }
    }

    /// The playback time of a single frame.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples_per_frame() as f64 / self.sample_rate() as f64)
    }

    /// The average frame size in bytes derived from the header bitrate.
    pub fn average_frame_size(&self) -> u64 {
        let factor = match self.layer {
            Layer::I => 12_000,
            _ => 144_000,
        };
        factor * self.bitrate() as u64 / self.sample_rate() as u64
    }

    /// The offset of a Xing/Info header from the frame start, following the side information.
    pub fn xing_offset(&self) -> usize {
        match (self.version, self.channel_mode) {
            (MpegVersion::Mpeg1, ChannelMode::Mono) => 21,
            (MpegVersion::Mpeg1, _) => 36,
            (_, ChannelMode::Mono) => 13,
            (_, _) => 21,
        }
    }
}

/// The offset of a VBRI header from the frame start.
pub const VBRI_OFFSET: usize = 36;

/// A VBR header declaring the real frame and byte count of the stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VbrHeader {
    /// A Xing header, or an Info header written by encoders for CBR streams.
    Xing {
        info: bool,
        frames: Option<u32>,
        bytes: Option<u32>,
        toc: Option<Vec<u8>>,
        scale: Option<u32>,
    },
    /// A Fraunhofer VBRI header.
    Vbri { version: u16, delay: u16, quality: u16, bytes: u32, frames: u32 },
}

impl VbrHeader {
    /// Looks for a VBR header in the data of the first frame, starting at the frame header.
    pub fn find(frame: &[u8], header: &FrameHeader) -> Option<Self> {
        frame.get(header.xing_offset()..).and_then(parse_xing).or_else(|| {
            frame.get(VBRI_OFFSET..).and_then(parse_vbri)
        })
    }

    pub fn frames(&self) -> Option<u32> {
        match self {
            Self::Xing { frames, .. } => *frames,
            Self::Vbri { frames, .. } => Some(*frames),
        }
    }

    pub fn bytes(&self) -> Option<u32> {
        match self {
            Self::Xing { bytes, .. } => *bytes,
            Self::Vbri { bytes, .. } => Some(*bytes),
        }
    }
}

struct Cursor<'a>(&'a [u8]);

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.0.len() < len {
            return None;
        }
        let (head, tail) = self.0.split_at(len);
        self.0 = tail;
        Some(head)
    }

    fn be_u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn be_u32(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// ```md
/// 4 bytes "Xing" or "Info"
/// 4 bytes flags
/// 4 bytes optional frame count
/// 4 bytes optional byte count
/// 100 bytes optional table of contents
/// 4 bytes optional quality indicator
/// ```
fn parse_xing(data: &[u8]) -> Option<VbrHeader> {
    let mut c = Cursor(data);
    let info = match c.take(4)? {
        b"Xing" => false,
        b"Info" => true,
        _ => return None,
    };
    let flags = c.be_u32()?;

    let frames = if flags & 0x1 != 0 { Some(c.be_u32()?) } else { None };
    let bytes = if flags & 0x2 != 0 { Some(c.be_u32()?) } else { None };
    let toc = if flags & 0x4 != 0 { Some(c.take(100)?.to_vec()) } else { None };
    let scale = if flags & 0x8 != 0 { Some(c.be_u32()?) } else { None };

    Some(VbrHeader::Xing { info, frames, bytes, toc, scale })
}

/// ```md
/// 4 bytes "VBRI"
/// 2 bytes version
/// 2 bytes delay
/// 2 bytes quality
/// 4 bytes byte count
/// 4 bytes frame count
/// ```
fn parse_vbri(data: &[u8]) -> Option<VbrHeader> {
    let mut c = Cursor(data);
    if c.take(4)? != b"VBRI" {
        return None;
    }
    Some(VbrHeader::Vbri {
        version: c.be_u16()?,
        delay: c.be_u16()?,
        quality: c.be_u16()?,
        bytes: c.be_u32()?,
        frames: c.be_u32()?,
    })
}

/// Returns the offset and header of the first valid frame header in the buffer.
pub fn find_frame(buf: &[u8]) -> Option<(usize, FrameHeader)> {
    buf.windows(4).enumerate().find_map(|(i, w)| {
        let header = FrameHeader::decode([w[0], w[1], w[2], w[3]])?;
        Some((i, header))
    })
}
