use std::fmt;
use std::ops::Deref;

/// A 4 byte atom identifier (four character code).
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct Fourcc(pub [u8; 4]);

impl Deref for Fourcc {
    type Target = [u8; 4];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fourcc({})", self)
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: String = self.0.iter().map(|&b| b as char).collect();
        write!(f, "{s}")
    }
}

/// (`ftyp`) Identifier of an atom information about the filetype.
pub const FILETYPE: Fourcc = Fourcc(*b"ftyp");
/// (`mdat`)
pub const MEDIA_DATA: Fourcc = Fourcc(*b"mdat");
/// (`moov`) Identifier of an atom containing a structure of children storing metadata.
pub const MOVIE: Fourcc = Fourcc(*b"moov");
/// (`mvhd`) Identifier of an atom containing information about the whole movie (or audio file).
pub const MOVIE_HEADER: Fourcc = Fourcc(*b"mvhd");
/// (`trak`) Identifier of an atom containing information about a single track.
pub const TRACK: Fourcc = Fourcc(*b"trak");
/// (`mdia`) Identifier of an atom containing information about a tracks media type and data.
pub const MEDIA: Fourcc = Fourcc(*b"mdia");
/// (`minf`)
pub const MEDIA_INFORMATION: Fourcc = Fourcc(*b"minf");
/// (`stbl`)
pub const SAMPLE_TABLE: Fourcc = Fourcc(*b"stbl");
/// (`stco`)
pub const SAMPLE_TABLE_CHUNK_OFFSET: Fourcc = Fourcc(*b"stco");
/// (`co64`)
pub const SAMPLE_TABLE_CHUNK_OFFSET_64: Fourcc = Fourcc(*b"co64");
/// (`stsd`)
pub const SAMPLE_TABLE_SAMPLE_DESCRIPTION: Fourcc = Fourcc(*b"stsd");
/// (`mp4a`)
pub const MP4_AUDIO: Fourcc = Fourcc(*b"mp4a");
/// (`alac`)
pub const APPLE_LOSSLESS: Fourcc = Fourcc(*b"alac");
/// (`esds`)
pub const ELEMENTARY_STREAM_DESCRIPTION: Fourcc = Fourcc(*b"esds");
/// (`udta`) Identifier of an atom containing user metadata.
pub const USER_DATA: Fourcc = Fourcc(*b"udta");
/// (`meta`) Identifier of an atom containing a metadata item list.
pub const METADATA: Fourcc = Fourcc(*b"meta");
/// (`hdlr`) Handler reference, `mdir` for an item list.
pub const HANDLER_REFERENCE: Fourcc = Fourcc(*b"hdlr");
/// (`ilst`) Identifier of an atom containing a list of metadata atoms.
pub const ITEM_LIST: Fourcc = Fourcc(*b"ilst");
/// (`data`) Identifier of an atom containing typed data.
pub const DATA: Fourcc = Fourcc(*b"data");

/// (`©nam`)
pub const TITLE: Fourcc = Fourcc(*b"\xa9nam");
/// (`©alb`)
pub const ALBUM: Fourcc = Fourcc(*b"\xa9alb");
/// (`©ART`)
pub const ARTIST: Fourcc = Fourcc(*b"\xa9ART");
/// (`©day`)
pub const YEAR: Fourcc = Fourcc(*b"\xa9day");
/// (`gnre`) Standard genre, stored as the table index plus one.
pub const STANDARD_GENRE: Fourcc = Fourcc(*b"gnre");
/// (`©gen`)
pub const CUSTOM_GENRE: Fourcc = Fourcc(*b"\xa9gen");
/// (`trkn`)
pub const TRACK_NUMBER: Fourcc = Fourcc(*b"trkn");
/// (`©trk`) Track number stored as text.
pub const TRACK_TEXT: Fourcc = Fourcc(*b"\xa9trk");
/// (`©cmt`)
pub const COMMENT: Fourcc = Fourcc(*b"\xa9cmt");
/// (`disk`)
pub const DISK_NUMBER: Fourcc = Fourcc(*b"disk");

/// Items replaced by the writer.
pub const MANAGED_ITEMS: [Fourcc; 10] = [
    TITLE,
    ALBUM,
    ARTIST,
    YEAR,
    STANDARD_GENRE,
    CUSTOM_GENRE,
    TRACK_NUMBER,
    TRACK_TEXT,
    COMMENT,
    DISK_NUMBER,
];
