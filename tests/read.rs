use std::io::Cursor;

use mediameta::asf::drm::WEED_LAINFO;
use mediameta::{ErrorKind, Format, Metadata, ReadConfig};

mod common;
use common::*;

#[track_caller]
fn read(data: Vec<u8>) -> Metadata {
    common::init_logging();
    let metadata = mediameta::read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap();
    println!("{metadata}");
    metadata
}

#[track_caller]
fn read_err(format: Format, data: Vec<u8>) -> ErrorKind {
    common::init_logging();
    let err = format.read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap_err();
    println!("{err}");
    err.kind
}

fn weed_xml() -> String {
    format!(
        "<WRMHEADER version=\"2.0.0.0\"><DATA>\
         <SECURITYVERSION>2.2</SECURITYVERSION><CID>cid</CID>\
         <LAINFO>{WEED_LAINFO}</LAINFO><KID>kid==</KID><CHECKSUM>sum</CHECKSUM>\
         <VersionID>7</VersionID><ContentID>42</ContentID><ice9>ice</ice9>\
         <Collection>Album</Collection><Description>Desc</Description>\
         <Copyright>(c) Band</Copyright><Author>Band</Author><Title>Song</Title>\
         </DATA><SIGNATURE><VALUE>sig</VALUE></SIGNATURE></WRMHEADER>"
    )
}

#[test]
fn missing_magic() {
    for format in Format::ALL {
        println!("{format}:");
        let kind = read_err(format, vec![0x20; 512]);
        assert!(!matches!(kind, ErrorKind::Io(_)), "{format}: {kind:?}");
    }

    let err = mediameta::read_from(&mut Cursor::new(vec![0x20; 512]), &ReadConfig::DEFAULT);
    assert!(matches!(err.unwrap_err().kind, ErrorKind::UnsupportedFormat));
}

#[test]
fn asf_audio() {
    let data = asf_file(3, &[
        asf_file_properties(3_000_000_000, 128_000),
        asf_content_description("Title", "Artist", "Comment"),
        asf_extended_content(&[
            ("WM/AlbumTitle", AsfValue::Text("Album")),
            ("WM/Year", AsfValue::Text("2004")),
            ("WM/Genre", AsfValue::Text("Jazz")),
            ("WM/TrackNumber", AsfValue::Int(5)),
            ("WM/Lyrics", AsfValue::Text("ignored")),
        ]),
    ]);

    let metadata = read(data);
    let audio = metadata.audio().unwrap();
    assert_eq!(audio.title(), Some("Title"));
    assert_eq!(audio.artist(), Some("Artist"));
    assert_eq!(audio.comment(), Some("Comment"));
    assert_eq!(audio.album(), Some("Album"));
    assert_eq!(audio.year(), Some("2004"));
    assert_eq!(audio.genre(), Some("Jazz"));
    assert_eq!(audio.track(), Some(5));
    assert_eq!(audio.length(), Some(300));
    assert_eq!(audio.bitrate(), Some(128));
    assert_eq!(audio.license(), None);
}

#[test]
fn asf_zero_based_track() {
    let data = asf_file(1, &[asf_extended_content(&[("WM/Track", AsfValue::Int(4))])]);
    assert_eq!(read(data).audio().unwrap().track(), Some(5));

    let data = asf_file(1, &[asf_extended_content(&[
        ("WM/Track", AsfValue::Int(4)),
        ("WM/TrackNumber", AsfValue::Text("9")),
    ])]);
    assert_eq!(read(data).audio().unwrap().track(), Some(9));
}

#[test]
fn asf_video() {
    let data = asf_file(2, &[
        asf_content_description("Clip", "", ""),
        asf_video_stream(1280, 720),
    ]);
    let metadata = read(data);
    let video = metadata.video().unwrap();
    assert_eq!(video.title(), Some("Clip"));
    assert_eq!(video.width(), Some(1280));
    assert_eq!(video.height(), Some(720));
}

#[test]
fn asf_weed_overrides_description() {
    let data = asf_file(2, &[
        asf_extended_encryption(&weed_xml()),
        asf_content_description("Other", "Someone", ""),
    ]);
    let metadata = read(data);
    let audio = metadata.audio().unwrap();
    assert_eq!(audio.title(), Some("Song"));
    assert_eq!(audio.artist(), Some("Band"));
    assert_eq!(audio.album(), Some("Album"));
    assert_eq!(audio.comment(), Some("Desc"));
    assert_eq!(audio.license(), Some("Weed (c) Band. Content ID: 42, Version ID: 7"));
    assert_eq!(audio.license_type(), Some("weed"));
}

#[test]
fn asf_limits() {
    let objects = [asf_content_description("Title", "", "")];
    let kind = read_err(Format::Asf, asf_file(101, &objects));
    assert!(matches!(kind, ErrorKind::Corrupt));
    let kind = read_err(Format::Asf, asf_file(-1, &objects));
    assert!(matches!(kind, ErrorKind::Corrupt));

    let kind = read_err(Format::Asf, asf_file(1, &[asf_file_properties(-10_000_000, 1000)]));
    assert!(matches!(kind, ErrorKind::Corrupt));
    let kind = read_err(Format::Asf, asf_file(1, &[asf_file_properties(10_000_000, -1)]));
    assert!(matches!(kind, ErrorKind::Corrupt));

    let negative = asf_extended_content(&[("WM/TrackNumber", AsfValue::Int(-2))]);
    let kind = read_err(Format::Asf, asf_file(1, &[negative]));
    assert!(matches!(kind, ErrorKind::Corrupt));
}

#[test]
fn mp3_cbr() {
    let metadata = read(mpeg_frames(100));
    let audio = metadata.audio().unwrap();
    assert_eq!(audio.bitrate(), Some(128));
    assert_eq!(audio.length(), Some(2));
    assert_eq!(audio.title(), None);
}

#[test]
fn mp3_xing() {
    let audio = read(xing_frame(1000, 2_000_000)).into_audio().unwrap();
    assert_eq!(audio.length(), Some(8));
    assert_eq!(audio.bitrate(), Some(1837));
}

#[test]
fn mp3_id3v1() {
    let mut data = mpeg_frames(10);
    data.extend(id3v1_trailer(&Id3v1 {
        title: "Title",
        artist: "Artist",
        album: "Album",
        year: "1999",
        comment: "Comment",
        track: 7,
        genre: 17,
    }));

    let audio = read(data).into_audio().unwrap();
    assert_eq!(audio.title(), Some("Title"));
    assert_eq!(audio.artist(), Some("Artist"));
    assert_eq!(audio.album(), Some("Album"));
    assert_eq!(audio.year(), Some("1999"));
    assert_eq!(audio.comment(), Some("Comment"));
    assert_eq!(audio.track(), Some(7));
    assert_eq!(audio.genre(), Some("Rock"));
}

#[test]
fn mp3_id3v2_precedes_id3v1() {
    let mut data = id3v2_tag(&[
        text_frame("TIT2", "Long Title"),
        text_frame("TRCK", "3/12"),
        text_frame("TCON", "(17)"),
    ]);
    data.extend(mpeg_frames(10));
    data.extend(id3v1_trailer(&Id3v1 {
        title: "Short",
        artist: "",
        album: "Album",
        year: "",
        comment: "",
        track: 0,
        genre: 255,
    }));

    let audio = read(data).into_audio().unwrap();
    assert_eq!(audio.title(), Some("Long Title"));
    assert_eq!(audio.album(), Some("Album"));
    assert_eq!(audio.track(), Some(3));
    assert_eq!(audio.total_tracks(), Some(12));
    assert_eq!(audio.genre(), Some("Rock"));
    assert_eq!(audio.bitrate(), Some(128));
}

#[test]
fn flac() {
    let data = flac_file(&["TITLE=Foo", "artist=Bar", "DATE=2005-06-07", "TRACKNUMBER=2"], 441_000);
    let audio = read(data).into_audio().unwrap();
    assert_eq!(audio.title(), Some("Foo"));
    assert_eq!(audio.artist(), Some("Bar"));
    assert_eq!(audio.year(), Some("2005"));
    assert_eq!(audio.track(), Some(2));
    assert_eq!(audio.length(), Some(10));
}

#[test]
fn flac_after_id3v2() {
    let mut data = id3v2_tag(&[text_frame("TIT2", "Ignored")]);
    data.extend(flac_file(&["TITLE=Foo"], 44_100));
    let metadata = Format::Flac.read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap();
    assert_eq!(metadata.title(), Some("Foo"));
}

#[test]
fn ogg_vorbis() {
    let comments = ["TITLE=Song", "ARTIST=Someone", "TRACKNUMBER=4/12", "GENRE=Ambient"];
    let audio = read(ogg_vorbis_file(&comments, 44_100 * 20, 3)).into_audio().unwrap();
    assert_eq!(audio.title(), Some("Song"));
    assert_eq!(audio.artist(), Some("Someone"));
    assert_eq!(audio.track(), Some(4));
    assert_eq!(audio.total_tracks(), Some(12));
    assert_eq!(audio.genre(), Some("Ambient"));
    assert_eq!(audio.length(), Some(20));
    assert_eq!(audio.bitrate(), Some(128));
}

#[test]
fn ogm() {
    let comments = [
        "TITLE=Movie",
        "COMMENT=one",
        "COMMENT=two",
        "LANGUAGE=English",
        "LANGUAGE=German",
        "DATE=2001-01-01",
    ];
    let video = read(ogm_file(&comments, 400_000, 250)).into_video().unwrap();
    assert_eq!(video.title(), Some("Movie"));
    assert_eq!(video.comment(), Some("one\ntwo"));
    assert_eq!(video.language(), Some("English;German"));
    assert_eq!(video.year(), Some("2001"));
    assert_eq!(video.width(), Some(640));
    assert_eq!(video.height(), Some(480));
    assert_eq!(video.length(), Some(10));
}

#[test]
fn mp4() {
    let audio = read(mp4_file(Some(&sample_items()))).into_audio().unwrap();
    assert_eq!(audio.title(), Some("Song"));
    assert_eq!(audio.track(), Some(3));
    assert_eq!(audio.total_tracks(), Some(10));
    assert_eq!(audio.length(), Some(30));
    assert_eq!(audio.bitrate(), Some(128));

    let audio = read(mp4_file(None)).into_audio().unwrap();
    assert_eq!(audio.title(), None);
    assert_eq!(audio.length(), Some(30));
}

#[test]
fn mp4_skips_unknown_siblings() {
    let data = mp4_file_with_layout(Some(&interleaved_items()), Layout::Interleaved);
    let audio = read(data.clone()).into_audio().unwrap();
    assert_eq!(audio.title(), Some("Song"));
    assert_eq!(audio.track(), Some(3));
    assert_eq!(audio.total_tracks(), Some(10));
    assert_eq!(audio.length(), Some(30));
    assert_eq!(audio.bitrate(), Some(128));

    let mp4 = mediameta::mp4::read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap();
    assert_eq!(mp4.items, interleaved_items());
}

#[test]
fn mp4_deeply_nested_media() {
    // `mdia` atoms nested inside each other instead of `mdia > minf > stbl`
    let depth = 200_000;
    let mut trak = Vec::with_capacity(depth * 8 + 8);
    trak.extend((8 * depth as u32 + 8).to_be_bytes());
    trak.extend(b"trak");
    for level in 0..depth {
        trak.extend((8 * (depth - level) as u32).to_be_bytes());
        trak.extend(b"mdia");
    }
    let ftyp = atom(b"ftyp", b"M4A \0\0\0\0");
    let data = [ftyp, atom(b"moov", &trak)].concat();

    let metadata = Format::M4a.read_from(&mut Cursor::new(data), &ReadConfig::DEFAULT).unwrap();
    assert_eq!(metadata.audio().unwrap().length(), None);
}

#[test]
fn mp4_length_beyond_addressable_range() {
    let mut data = atom(b"ftyp", b"M4A \0\0\0\0");
    data.extend([0, 0, 0, 1, b'f', b'r', b'e', b'e']);
    data.extend(u64::MAX.to_be_bytes());
    assert!(matches!(read_err(Format::M4a, data), ErrorKind::Corrupt));
}

#[test]
fn mp4_tags_only() {
    let data = mp4_file(Some(&sample_items()));
    let metadata = Format::M4a.read_from(&mut Cursor::new(data), &ReadConfig::TAGS_ONLY).unwrap();
    let audio = metadata.audio().unwrap();
    assert_eq!(audio.title(), Some("Song"));
    assert_eq!(audio.length(), None);
    assert_eq!(audio.bitrate(), None);
}

#[test]
fn avi() {
    let video = read(avi_file(40_000, 1500, 720, 576)).into_video().unwrap();
    assert_eq!(video.length(), Some(60));
    assert_eq!(video.width(), Some(720));
    assert_eq!(video.height(), Some(576));
}

#[test]
fn read_paths() {
    let dir = tempfile::tempdir().unwrap();
    let flac = write_file(dir.path(), "song.FLAC", &flac_file(&["TITLE=Foo"], 44_100));
    let unknown = write_file(dir.path(), "clip.bin", &avi_file(40_000, 25, 320, 240));

    let metadata = mediameta::read_from_path(&flac).unwrap();
    assert_eq!(metadata.title(), Some("Foo"));
    let metadata = mediameta::read_from_path(&unknown).unwrap();
    assert_eq!(metadata.video().and_then(|v| v.width()), Some(320));

    let missing = mediameta::read_from_path(dir.path().join("missing.mp3")).unwrap_err();
    assert!(matches!(missing.kind, ErrorKind::Io(_)));
}
