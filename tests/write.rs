use std::fs;
use std::io::Cursor;
use std::path::Path;

use mediameta::mp3::Frame;
use mediameta::mp4::ident::{TITLE, TRACK_NUMBER};
use mediameta::ogg::Page;
use mediameta::{
    AudioMetadata, Format, M4aWriter, Mp3Writer, OggWriter, ReadConfig, TagWriter, WriteConfig,
    WriteStatus,
};

mod common;
use common::*;

#[track_caller]
fn commit(writer: &dyn TagWriter, path: &Path, audio: &AudioMetadata) {
    println!("writing to `{}`...", path.display());
    assert_eq!(writer.commit(path, audio), WriteStatus::Success);
}

#[track_caller]
fn assert_idempotent(writer: &dyn TagWriter, path: &Path, audio: &AudioMetadata) {
    commit(writer, path, audio);
    let first = fs::read(path).unwrap();
    commit(writer, path, audio);
    let second = fs::read(path).unwrap();
    assert!(first == second, "second commit changed the file");
}

fn record() -> AudioMetadata {
    let mut audio = AudioMetadata::default();
    audio.set_title("New Title");
    audio.set_artist("Artist");
    audio.set_album("Album");
    audio.set_year("2010");
    audio.set_comment("Nice");
    audio.set_track(5);
    audio.set_total_tracks(9);
    audio.set_genre("Rock");
    audio
}

#[test]
fn id3v1_truncates_title() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "song.mp3", &mpeg_frames(10));

    let mut audio = AudioMetadata::default();
    audio.set_title("a".repeat(40));
    audio.set_track(3);
    let writer = Mp3Writer::new(WriteConfig { write_id3v1: true, write_id3v2: false });
    commit(&writer, &path, &audio);
    commit(&writer, &path, &audio);

    let data = fs::read(&path).unwrap();
    assert_eq!(data.len(), 10 * MPEG_FRAME_LEN + 128);
    let mp3 = mediameta::mp3::read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap();
    assert!(mp3.id3v2.is_none());
    let id3v1 = mp3.id3v1.unwrap();
    assert_eq!(id3v1.title(), Some("a".repeat(30).as_str()));
    assert_eq!(id3v1.track(), Some(3));
}

#[test]
fn id3v1_needs_a_full_trailer() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "short.mp3", &MPEG_FRAME_HEADER);
    let writer = Mp3Writer::new(WriteConfig::DEFAULT);
    assert_eq!(writer.commit(&path, &record()), WriteStatus::FormatDefective);
}

#[test]
fn mp3_round_trip() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut data = id3v2_tag(&[text_frame("TIT2", "Old"), text_frame("TXXX", "\0custom")]);
    data.extend(mpeg_frames(20));
    let path = write_file(dir.path(), "song.mp3", &data);

    let writer = Format::Mp3.writer(WriteConfig::DEFAULT).unwrap();
    assert_idempotent(writer.as_ref(), &path, &record());

    let data = fs::read(&path).unwrap();
    let mp3 = mediameta::mp3::read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap();
    let audio = &mp3.audio;
    assert_eq!(audio.title(), Some("New Title"));
    assert_eq!(audio.artist(), Some("Artist"));
    assert_eq!(audio.comment(), Some("Nice"));
    assert_eq!(audio.track(), Some(5));
    assert_eq!(audio.total_tracks(), Some(9));
    assert_eq!(audio.genre(), Some("Rock"));
    assert_eq!(audio.bitrate(), Some(128));

    let id3v2 = mp3.id3v2.unwrap();
    assert_eq!(id3v2.version, 3);
    assert!(id3v2.frame("TXXX").is_some());
    assert_eq!(id3v2.text("TCON").as_deref(), Some("(17)Rock"));
    assert_eq!(mp3.id3v1.unwrap().genre(), Some("Rock"));
}

#[test]
fn mp3_keeps_version_2_2_frames() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let picture = Frame::new("PIC", b"\x00JPG\x03cover\x00\xff\xd8\xff\xe0".to_vec());
    let unknown = Frame::new("CRM", b"owner\x00explanation\x00data".to_vec());
    let frames = [text_frame("TT2", "Old"), picture.clone(), unknown.clone()];
    let mut data = id3v2_tag_version(2, &frames);
    data.extend(mpeg_frames(20));
    let path = write_file(dir.path(), "song.mp3", &data);

    assert_idempotent(&Mp3Writer::new(WriteConfig::DEFAULT), &path, &record());

    let data = fs::read(&path).unwrap();
    let mp3 = mediameta::mp3::read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap();
    assert_eq!(mp3.audio.title(), Some("New Title"));
    assert_eq!(mp3.audio.year(), Some("2010"));
    assert_eq!(mp3.audio.genre(), Some("Rock"));

    let id3v2 = mp3.id3v2.unwrap();
    assert_eq!(id3v2.version, 2);
    assert_eq!(id3v2.frame("APIC"), Some(&picture));
    assert!(id3v2.frames.contains(&unknown));
    assert_eq!(id3v2.frames.iter().filter(|f| f.id == "TT2").count(), 1);
}

#[test]
fn mp3_keeps_version_2_4_frames() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let utf8 = Frame::new("TXXX", b"\x03desc\x00v\xc3\xa4lue".to_vec());
    let mut compressed = Frame::new("TPE2", vec![0, 0, 0, 9, 0x78, 0x9c, 1, 2, 3]);
    compressed.flags = [0, 0x09];
    // larger than a text field may be, kept as it is
    let large = Frame::new("PRIV", vec![0x42; ReadConfig::DEFAULT.max_text_len as usize + 1]);
    let frames = [
        Frame::new("TIT2", b"\x03\xc3\xa4lt".to_vec()),
        utf8.clone(),
        compressed.clone(),
        large.clone(),
    ];
    let mut data = id3v2_tag_version(4, &frames);
    data.extend(mpeg_frames(20));
    let path = write_file(dir.path(), "song.mp3", &data);

    assert_idempotent(&Mp3Writer::new(WriteConfig::DEFAULT), &path, &record());

    let data = fs::read(&path).unwrap();
    let tag = mediameta::mp3::id3v2::read_from(&mut Cursor::new(&data[..]), &ReadConfig {
        max_text_len: u64::MAX,
        ..ReadConfig::DEFAULT
    })
    .unwrap()
    .unwrap();
    assert_eq!(tag.version, 4);
    assert_eq!(tag.text("TIT2").as_deref(), Some("New Title"));
    assert_eq!(tag.text("TDRC").as_deref(), Some("2010"));
    assert_eq!(tag.text("TYER"), None);
    assert!(tag.frames.contains(&utf8));
    assert!(tag.frames.contains(&compressed));
    assert!(tag.frames.contains(&large));

    let mp3 = mediameta::mp3::read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap();
    assert_eq!(mp3.audio.title(), Some("New Title"));
    assert_eq!(mp3.audio.year(), Some("2010"));
}

#[test]
fn mp3_writer_rejects_other_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "song.mp3", &flac_file(&[], 44_100));
    let writer = Mp3Writer::new(WriteConfig::DEFAULT);
    assert_eq!(writer.commit(&path, &record()), WriteStatus::IncorrectFileType);

    let missing = dir.path().join("missing.mp3");
    assert_eq!(writer.commit(&missing, &record()), WriteStatus::ReadWriteError);
}

#[test]
fn ogg_round_trip() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let comments = ["TITLE=Old", "ENCODER=libvorbis", "TRACKNUMBER=1"];
    let path = write_file(dir.path(), "song.ogg", &ogg_vorbis_file(&comments, 44_100 * 20, 4));

    assert_idempotent(&OggWriter, &path, &record());

    let data = fs::read(&path).unwrap();
    let mut cursor = Cursor::new(&data[..]);
    let mut sequence = 0;
    while (cursor.position() as usize) < data.len() {
        let page = Page::read_from(&mut cursor).unwrap();
        assert!(page.is_valid());
        assert_eq!(page.sequence, sequence);
        sequence += 1;
    }

    let ogg = mediameta::ogg::vorbis::read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT)
        .unwrap();
    assert_eq!(ogg.audio.title(), Some("New Title"));
    assert_eq!(ogg.audio.track(), Some(5));
    assert_eq!(ogg.audio.total_tracks(), Some(9));
    assert_eq!(ogg.audio.length(), Some(20));
    let comments = ogg.comments.unwrap();
    assert_eq!(comments.get("ENCODER"), Some("libvorbis"));
    assert_eq!(comments.vendor, "Xiph.Org libVorbis");
}

#[test]
fn ogg_writer_rejects_other_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "song.ogg", &mpeg_frames(4));
    assert_eq!(OggWriter.commit(&path, &record()), WriteStatus::IncorrectFileType);

    let path = write_file(dir.path(), "clip.ogm", &ogm_file(&["TITLE=Movie"], 400_000, 250));
    assert_eq!(OggWriter.commit(&path, &record()), WriteStatus::IncorrectFileType);
}

#[test]
fn m4a_round_trip() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let original = mp4_file(Some(&sample_items()));
    let path = write_file(dir.path(), "song.m4a", &original);

    assert_idempotent(&M4aWriter, &path, &record());

    let data = fs::read(&path).unwrap();
    let grown = data.len() as i64 - original.len() as i64;
    assert_eq!(chunk_offset(&data) as i64, chunk_offset(&original) as i64 + grown);
    assert!(data.ends_with(&MDAT_CONTENT));

    let mp4 = mediameta::mp4::read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap();
    assert_eq!(mp4.audio.title(), Some("New Title"));
    assert_eq!(mp4.audio.track(), Some(5));
    assert_eq!(mp4.audio.total_tracks(), Some(9));
    assert_eq!(mp4.audio.genre(), Some("Rock"));
    assert_eq!(mp4.audio.length(), Some(30));

    let idents: Vec<_> = mp4.items.iter().map(|i| i.ident).collect();
    assert_eq!(idents.iter().filter(|&&i| i == TITLE).count(), 1);
    assert_eq!(idents.iter().filter(|&&i| i == TRACK_NUMBER).count(), 1);
    assert_eq!(mp4.items.last(), sample_items().last());
}

#[test]
fn m4a_keeps_unknown_siblings() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let original = mp4_file_with_layout(Some(&interleaved_items()), Layout::Interleaved);
    let path = write_file(dir.path(), "song.m4a", &original);

    assert_idempotent(&M4aWriter, &path, &record());

    let data = fs::read(&path).unwrap();
    let kept = [b"iods", b"tkhd", b"mdhd", b"smhd", b"dinf", b"stts", b"sgpd", b"cprt", b"Xtra"];
    for fourcc in kept {
        assert!(data.windows(4).any(|w| w == fourcc), "lost '{}'", String::from_utf8_lossy(fourcc));
    }
    let grown = data.len() as i64 - original.len() as i64;
    assert_eq!(chunk_offset(&data) as i64, chunk_offset(&original) as i64 + grown);
    assert!(data.ends_with(&MDAT_CONTENT));

    let mp4 = mediameta::mp4::read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap();
    assert_eq!(mp4.audio.title(), Some("New Title"));
    assert_eq!(mp4.audio.track(), Some(5));
    assert_eq!(mp4.audio.length(), Some(30));
    let unknown: Vec<_> = interleaved_items().into_iter().filter(|i| !i.is_managed()).collect();
    assert!(mp4.items.ends_with(&unknown));
    assert!(unknown.contains(&malformed_item()));
}

#[test]
fn m4a_creates_user_data() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let original = mp4_file(None);
    let path = write_file(dir.path(), "song.m4a", &original);

    let mut audio = AudioMetadata::default();
    audio.set_title("Created");
    commit(&M4aWriter, &path, &audio);

    let data = fs::read(&path).unwrap();
    assert!(data.windows(4).any(|w| w == b"udta"));
    let grown = (data.len() - original.len()) as u32;
    assert_eq!(chunk_offset(&data), chunk_offset(&original) + grown);

    let metadata = mediameta::read_from_path(&path).unwrap();
    assert_eq!(metadata.title(), Some("Created"));
}

#[test]
fn m4a_writer_rejects_other_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "song.m4a", &mpeg_frames(4));
    assert_eq!(M4aWriter.commit(&path, &record()), WriteStatus::IncorrectFileType);
}
