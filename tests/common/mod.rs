#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use mediameta::asf::ident as asf;
use mediameta::mp3::id3v2::{encode_frames, encode_tag};
use mediameta::mp3::Frame;
use mediameta::mp4::ident::*;
use mediameta::mp4::Item;
use mediameta::ogg::{self, vorbis, BEGIN_OF_STREAM, END_OF_STREAM};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

#[track_caller]
pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    println!("writing `{}`...", path.display());
    fs::write(&path, data).unwrap();
    path
}

// ASF

pub fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().chain(Some(0)).flat_map(u16::to_le_bytes).collect()
}

pub fn asf_object(guid: &[u8; 16], content: &[u8]) -> Vec<u8> {
    let mut o = guid.to_vec();
    o.extend((24 + content.len() as i64).to_le_bytes());
    o.extend_from_slice(content);
    o
}

/// A header object with the given object count, which may differ from the number of objects.
pub fn asf_file(count: i32, objects: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = objects.concat();
    let mut f = asf::HEADER.to_vec();
    f.extend((30 + body.len() as i64).to_le_bytes());
    f.extend(count.to_le_bytes());
    f.extend([1, 2]);
    f.extend(body);
    f
}

pub fn asf_file_properties(duration: i64, max_bitrate: i32) -> Vec<u8> {
    let mut c = vec![0; 48];
    c.extend(duration.to_le_bytes());
    c.extend([0; 20]);
    c.extend(max_bitrate.to_le_bytes());
    asf_object(&asf::FILE_PROPERTIES, &c)
}

pub fn asf_content_description(title: &str, author: &str, description: &str) -> Vec<u8> {
    let strings = [utf16(title), utf16(author), Vec::new(), utf16(description), Vec::new()];
    let mut c = Vec::new();
    for s in strings.iter() {
        c.extend((s.len() as u16).to_le_bytes());
    }
    for s in strings.iter() {
        c.extend_from_slice(s);
    }
    asf_object(&asf::CONTENT_DESCRIPTION, &c)
}

pub enum AsfValue<'a> {
    Text(&'a str),
    Int(i32),
}

pub fn asf_extended_content(fields: &[(&str, AsfValue)]) -> Vec<u8> {
    let mut c = (fields.len() as u16).to_le_bytes().to_vec();
    for (name, value) in fields {
        let name = utf16(name);
        c.extend((name.len() as u16).to_le_bytes());
        c.extend(name);
        let (value_type, data) = match value {
            AsfValue::Text(t) => (asf::TYPE_STRING, utf16(t)),
            AsfValue::Int(i) => (asf::TYPE_INT, i.to_le_bytes().to_vec()),
        };
        c.extend(value_type.to_le_bytes());
        c.extend((data.len() as u16).to_le_bytes());
        c.extend(data);
    }
    asf_object(&asf::EXTENDED_CONTENT_DESCRIPTION, &c)
}

pub fn asf_video_stream(width: i32, height: i32) -> Vec<u8> {
    let mut c = asf::VIDEO_STREAM.to_vec();
    c.extend([0; 38]);
    c.extend(width.to_le_bytes());
    c.extend(height.to_le_bytes());
    asf_object(&asf::STREAM_PROPERTIES, &c)
}

pub fn asf_extended_encryption(xml: &str) -> Vec<u8> {
    let data = utf16(xml);
    let mut c = (data.len() as i32).to_le_bytes().to_vec();
    c.extend(data);
    asf_object(&asf::EXTENDED_CONTENT_ENCRYPTION, &c)
}

// MP3

/// MPEG-1 Layer III, 128 kbps, 44100 Hz, joint stereo, a frame is 417 bytes long.
pub const MPEG_FRAME_HEADER: [u8; 4] = [0xff, 0xfb, 0x90, 0x44];
pub const MPEG_FRAME_LEN: usize = 417;

pub fn mpeg_frames(count: usize) -> Vec<u8> {
    let mut frame = MPEG_FRAME_HEADER.to_vec();
    frame.resize(MPEG_FRAME_LEN, 0);
    frame.repeat(count)
}

/// A single MPEG-1 Layer I frame carrying a Xing header.
pub fn xing_frame(frames: u32, bytes: u32) -> Vec<u8> {
    let mut f = vec![0xff, 0xff, 0x90, 0x44];
    f.resize(36, 0);
    f.extend(b"Xing");
    f.extend(3u32.to_be_bytes());
    f.extend(frames.to_be_bytes());
    f.extend(bytes.to_be_bytes());
    f.resize(417, 0);
    f
}

pub fn text_frame(id: &str, text: &str) -> Frame {
    let mut data = vec![0];
    data.extend(text.as_bytes());
    Frame::new(id, data)
}

pub fn id3v2_tag(frames: &[Frame]) -> Vec<u8> {
    id3v2_tag_version(3, frames)
}

pub fn id3v2_tag_version(version: u8, frames: &[Frame]) -> Vec<u8> {
    let frames = encode_frames(version, frames).unwrap();
    let len = frames.len() + 64;
    encode_tag(version, &frames, len)
}

pub struct Id3v1<'a> {
    pub title: &'a str,
    pub artist: &'a str,
    pub album: &'a str,
    pub year: &'a str,
    pub comment: &'a str,
    pub track: u8,
    pub genre: u8,
}

pub fn id3v1_trailer(tag: &Id3v1) -> Vec<u8> {
    let mut t = b"TAG".to_vec();
    for (text, len) in [(tag.title, 30), (tag.artist, 30), (tag.album, 30), (tag.year, 4)] {
        let mut field = text.as_bytes().to_vec();
        field.resize(len, 0);
        t.extend(field);
    }
    let mut comment = tag.comment.as_bytes().to_vec();
    comment.resize(28, 0);
    t.extend(comment);
    t.extend([0, tag.track, tag.genre]);
    t
}

// FLAC

pub fn flac_file(comments: &[&str], samples: u64) -> Vec<u8> {
    let mut info = [0u8; 34];
    info[0..2].copy_from_slice(&4096u16.to_be_bytes());
    info[2..4].copy_from_slice(&4096u16.to_be_bytes());
    // 44100 Hz, 2 channels, 16 bits
    let packed: u64 = (44100 << 44) | (1 << 41) | (15 << 36) | samples;
    info[10..18].copy_from_slice(&packed.to_be_bytes());

    let block = comment_block("reference libFLAC", comments);

    let mut f = b"fLaC".to_vec();
    f.push(0);
    f.extend(&(34u32.to_be_bytes()[1..]));
    f.extend(info);
    f.push(0x80 | 4);
    f.extend(&((block.len() as u32).to_be_bytes()[1..]));
    f.extend(block);
    f.extend([0x55; 4000]);
    f
}

pub fn comment_block(vendor: &str, comments: &[&str]) -> Vec<u8> {
    let mut out = (vendor.len() as u32).to_le_bytes().to_vec();
    out.extend(vendor.as_bytes());
    out.extend((comments.len() as u32).to_le_bytes());
    for c in comments {
        out.extend((c.len() as u32).to_le_bytes());
        out.extend(c.as_bytes());
    }
    out
}

// Ogg

pub const OGG_SERIAL: u32 = 0x0515;

pub fn ident_packet(sample_rate: u32, nominal: i32) -> Vec<u8> {
    let mut p = vorbis::IDENT_PACKET.to_vec();
    p.extend(0u32.to_le_bytes());
    p.push(2);
    p.extend(sample_rate.to_le_bytes());
    p.extend(0i32.to_le_bytes());
    p.extend(nominal.to_le_bytes());
    p.extend(0i32.to_le_bytes());
    p.extend([0xb8, 1]);
    p
}

pub fn vorbis_comment_packet(comments: &[&str]) -> Vec<u8> {
    let mut p = vorbis::COMMENT_PACKET.to_vec();
    p.extend(comment_block("Xiph.Org libVorbis", comments));
    p.push(1);
    p
}

/// Header pages followed by `audio_pages` pages of audio, the last one ending the stream at
/// `granule`.
pub fn ogg_vorbis_file(comments: &[&str], granule: i64, audio_pages: u32) -> Vec<u8> {
    let ident = ident_packet(44100, 128_000);
    let comment = vorbis_comment_packet(comments);
    let setup = [&vorbis::SETUP_PACKET[..], &[0x42; 3000][..]].concat();

    let mut f = Vec::new();
    for p in ogg::paginate(&[&ident[..]], OGG_SERIAL, 0, BEGIN_OF_STREAM, 0) {
        f.extend(p.encode());
    }
    let headers = ogg::paginate(&[&comment[..], &setup[..]], OGG_SERIAL, 1, 0, 0);
    let mut sequence = 1 + headers.len() as u32;
    for p in headers {
        f.extend(p.encode());
    }
    for i in 1..=audio_pages {
        let (flags, pos) = match i == audio_pages {
            true => (END_OF_STREAM, granule),
            false => (0, granule * i as i64 / audio_pages as i64),
        };
        let packet = vec![i as u8; 700];
        for p in ogg::paginate(&[&packet[..]], OGG_SERIAL, sequence, flags, pos) {
            f.extend(p.encode());
        }
        sequence += 1;
    }
    f
}

/// A DirectShow video stream header packet.
pub fn ogm_video_header(time_unit: i64, width: i32, height: i32) -> Vec<u8> {
    let mut p = vec![0x01];
    p.extend(b"video\0\0\0");
    p.extend(b"XVID");
    p.extend(0i32.to_le_bytes());
    p.extend(time_unit.to_le_bytes());
    p.extend(1i64.to_le_bytes());
    p.extend(0i32.to_le_bytes());
    p.extend(0i32.to_le_bytes());
    p.extend(0i16.to_le_bytes());
    p.extend([0; 2]);
    p.extend(width.to_le_bytes());
    p.extend(height.to_le_bytes());
    p
}

pub fn ogm_file(comments: &[&str], time_unit: i64, granule: i64) -> Vec<u8> {
    let header = ogm_video_header(time_unit, 640, 480);
    let comment = vorbis_comment_packet(comments);
    let mut f = Vec::new();
    for p in ogg::paginate(&[&header[..]], 3, 0, BEGIN_OF_STREAM, 0) {
        f.extend(p.encode());
    }
    for p in ogg::paginate(&[&comment[..]], 3, 1, 0, 0) {
        f.extend(p.encode());
    }
    for p in ogg::paginate(&[&[0x08, 0, 0, 0][..]], 3, 2, END_OF_STREAM, granule) {
        f.extend(p.encode());
    }
    f
}

// MPEG-4

pub fn atom(fourcc: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let mut a = (8 + content.len() as u32).to_be_bytes().to_vec();
    a.extend(fourcc);
    a.extend_from_slice(content);
    a
}

fn esds(max_bitrate: u32, avg_bitrate: u32) -> Vec<u8> {
    let mut c = vec![0; 4];
    c.extend([0x03, 18, 0, 1, 0]);
    c.extend([0x04, 13, 0x40, 0x15, 0, 0, 0]);
    c.extend(max_bitrate.to_be_bytes());
    c.extend(avg_bitrate.to_be_bytes());
    atom(b"esds", &c)
}

/// The atom layouts of the test files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Layout {
    /// Only the atoms that are read.
    Minimal,
    /// The usual siblings of a real file plus unknown atoms between the read ones at every
    /// level, including a malformed unknown item in the item list.
    Interleaved,
}

fn full_atom(fourcc: &[u8; 4], content: &[u8]) -> Vec<u8> {
    atom(fourcc, &[&[0; 4][..], content].concat())
}

fn trak(chunk_offset: u32, layout: Layout) -> Vec<u8> {
    let mut entry = vec![0; 28];
    entry.extend(esds(160_000, 128_000));
    let mut stsd = vec![0, 0, 0, 1];
    stsd.extend(atom(b"mp4a", &entry));
    let stsd = full_atom(b"stsd", &stsd);

    let mut stco = vec![0, 0, 0, 1];
    stco.extend(chunk_offset.to_be_bytes());
    let stco = full_atom(b"stco", &stco);

    if layout == Layout::Minimal {
        let stbl = atom(b"stbl", &[stsd, stco].concat());
        return atom(b"trak", &atom(b"mdia", &atom(b"minf", &stbl)));
    }

    let stbl = [
        stsd,
        full_atom(b"stts", &[0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 4, 0]),
        full_atom(b"stsc", &[0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1]),
        full_atom(b"stsz", &[0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 8, 0]),
        stco,
        atom(b"sgpd", &[0; 8]),
    ];
    let dref = full_atom(b"dref", &[&[0, 0, 0, 1][..], &full_atom(b"url ", &[])[..]].concat());
    let minf = [
        full_atom(b"smhd", &[0; 4]),
        atom(b"dinf", &dref),
        atom(b"stbl", &stbl.concat()),
        atom(b"free", &[0; 4]),
    ];
    let mut hdlr = vec![0; 4];
    hdlr.extend(b"soun");
    hdlr.extend([0; 13]);
    let mdia = [
        full_atom(b"mdhd", &[0; 20]),
        full_atom(b"hdlr", &hdlr),
        atom(b"minf", &minf.concat()),
    ];
    let trak = [
        full_atom(b"tkhd", &[0; 80]),
        atom(b"edts", &full_atom(b"elst", &[0; 4])),
        atom(b"mdia", &mdia.concat()),
        atom(b"uuid", &[0x5a; 16]),
    ];
    atom(b"trak", &trak.concat())
}

fn mvhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut c = vec![0; 12];
    c.extend(timescale.to_be_bytes());
    c.extend(duration.to_be_bytes());
    c.resize(100, 0);
    atom(b"mvhd", &c)
}

pub fn ilst(items: &[Item]) -> Vec<u8> {
    let list: Vec<u8> = items.iter().flat_map(|i| i.raw.iter().copied()).collect();
    atom(b"ilst", &list)
}

pub fn udta(items: &[Item], layout: Layout) -> Vec<u8> {
    let mut hdlr = vec![0; 8];
    hdlr.extend(b"mdirappl");
    hdlr.extend([0; 10]);
    let hdlr = atom(b"hdlr", &hdlr);

    if layout == Layout::Minimal {
        let meta = [&[0; 4][..], &hdlr[..], &ilst(items)[..]].concat();
        return atom(b"udta", &atom(b"meta", &meta));
    }

    let meta = [
        &[0; 4][..],
        &hdlr[..],
        &atom(b"free", &[0; 8])[..],
        &ilst(items)[..],
        &atom(b"free", &[])[..],
    ];
    let udta = [atom(b"cprt", &[0; 6]), atom(b"meta", &meta.concat()), atom(b"Xtra", &[1; 5])];
    atom(b"udta", &udta.concat())
}

pub const MDAT_CONTENT: [u8; 2048] = [0x21; 2048];

/// An audio file with a single track whose only chunk is the content of `mdat`. Without items no
/// `udta` atom is written.
pub fn mp4_file(items: Option<&[Item]>) -> Vec<u8> {
    mp4_file_with_layout(items, Layout::Minimal)
}

pub fn mp4_file_with_layout(items: Option<&[Item]>, layout: Layout) -> Vec<u8> {
    let ftyp = atom(b"ftyp", b"M4A \0\0\0\0M4A mp42isom");
    let moov = |offset: u32| {
        let mut c = mvhd(44100, 44100 * 30);
        if layout == Layout::Interleaved {
            c.extend(full_atom(b"iods", &[0x10, 0x07, 0, 0x4f, 0xff, 0xff, 0x29, 0xff, 0xff]));
        }
        c.extend(trak(offset, layout));
        if let Some(items) = items {
            c.extend(udta(items, layout));
        }
        if layout == Layout::Interleaved {
            c.extend(atom(b"free", &[0; 32]));
        }
        atom(b"moov", &c)
    };
    let moov_len = moov(0).len();
    let offset = (ftyp.len() + moov_len + 8) as u32;

    [ftyp, moov(offset), atom(b"mdat", &MDAT_CONTENT)].concat()
}

/// Returns the chunk offset stored in the first `stco` atom.
pub fn chunk_offset(file: &[u8]) -> u32 {
    let pos = file.windows(4).position(|w| w == b"stco").unwrap();
    let entry = &file[pos + 12..pos + 16];
    u32::from_be_bytes([entry[0], entry[1], entry[2], entry[3]])
}

pub fn sample_items() -> Vec<Item> {
    vec![
        Item::text(TITLE, "Song"),
        Item::pair(TRACK_NUMBER, 3, 10),
        Item::text(Fourcc(*b"\xa9too"), "encoder"),
    ]
}

/// An unknown item whose data atom is shorter than its head.
pub fn malformed_item() -> Item {
    let mut raw = vec![0, 0, 0, 16, b'x', b'x', b'x', b'x'];
    raw.extend([0, 0, 0, 2, b'j', b'u', b'n', b'k']);
    Item { ident: Fourcc(*b"xxxx"), raw }
}

/// Known items with unknown ones between them.
pub fn interleaved_items() -> Vec<Item> {
    vec![
        Item::text(Fourcc(*b"\xa9wrt"), "Composer"),
        Item::text(TITLE, "Song"),
        malformed_item(),
        Item::pair(TRACK_NUMBER, 3, 10),
        Item::text(Fourcc(*b"\xa9too"), "encoder"),
    ]
}

// RIFF

pub fn avi_file(us_per_frame: u32, frames: u32, width: u32, height: u32) -> Vec<u8> {
    let mut f = b"RIFF".to_vec();
    f.extend(0u32.to_le_bytes());
    f.extend(b"AVI LIST");
    f.extend(68u32.to_le_bytes());
    f.extend(b"hdrlavih");
    f.extend(56u32.to_le_bytes());
    for v in [us_per_frame, 0, 0, 0, frames, 0, 1, 0, width, height, 0, 0, 0, 0] {
        f.extend(v.to_le_bytes());
    }
    f
}
