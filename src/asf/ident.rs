use crate::util::Guid;

/// The header object wrapping all other objects of the ASF header.
pub const HEADER: Guid = [
    0x30, 0x26, 0xb2, 0x75, 0x8e, 0x66, 0xcf, 0x11, 0xa6, 0xd9, 0x00, 0xaa, 0x00, 0x62, 0xce, 0x6c,
];
/// (`8CABDCA1-A947-11CF-8EE4-00C00C205365`)
pub const FILE_PROPERTIES: Guid = [
    0xa1, 0xdc, 0xab, 0x8c, 0x47, 0xa9, 0xcf, 0x11, 0x8e, 0xe4, 0x00, 0xc0, 0x0c, 0x20, 0x53, 0x65,
];
/// (`B7DC0791-A9B7-11CF-8EE6-00C00C205365`)
pub const STREAM_PROPERTIES: Guid = [
    0x91, 0x07, 0xdc, 0xb7, 0xb7, 0xa9, 0xcf, 0x11, 0x8e, 0xe6, 0x00, 0xc0, 0x0c, 0x20, 0x53, 0x65,
];
/// (`14E6A5CB-C672-4332-8399-A96952065B5A`)
pub const EXTENDED_STREAM_PROPERTIES: Guid = [
    0xcb, 0xa5, 0xe6, 0x14, 0x72, 0xc6, 0x32, 0x43, 0x83, 0x99, 0xa9, 0x69, 0x52, 0x06, 0x5b, 0x5a,
];
/// (`75B22633-668E-11CF-A6D9-00AA0062CE6C`)
pub const CONTENT_DESCRIPTION: Guid = [
    0x33, 0x26, 0xb2, 0x75, 0x8e, 0x66, 0xcf, 0x11, 0xa6, 0xd9, 0x00, 0xaa, 0x00, 0x62, 0xce, 0x6c,
];
/// (`D2D0A440-E307-11D2-97F0-00A0C95EA850`)
pub const EXTENDED_CONTENT_DESCRIPTION: Guid = [
    0x40, 0xa4, 0xd0, 0xd2, 0x07, 0xe3, 0xd2, 0x11, 0x97, 0xf0, 0x00, 0xa0, 0xc9, 0x5e, 0xa8, 0x50,
];
/// (`2211B3FB-BD23-11D2-B4B7-00A0C955FC6E`)
pub const CONTENT_ENCRYPTION: Guid = [
    0xfb, 0xb3, 0x11, 0x22, 0x23, 0xbd, 0xd2, 0x11, 0xb4, 0xb7, 0x00, 0xa0, 0xc9, 0x55, 0xfc, 0x6e,
];
/// (`298AE614-2622-4C17-B935-DAE07EE9289C`)
pub const EXTENDED_CONTENT_ENCRYPTION: Guid = [
    0x14, 0xe6, 0x8a, 0x29, 0x22, 0x26, 0x17, 0x4c, 0xb9, 0x35, 0xda, 0xe0, 0x7e, 0xe9, 0x28, 0x9c,
];

/// Stream type of audio streams in the stream properties object.
pub const AUDIO_STREAM: Guid = [
    0x40, 0x9e, 0x69, 0xf8, 0x4d, 0x5b, 0xcf, 0x11, 0xa8, 0xfd, 0x00, 0x80, 0x5f, 0x5c, 0x44, 0x2b,
];
/// Stream type of video streams in the stream properties object.
pub const VIDEO_STREAM: Guid = [
    0xc0, 0xef, 0x19, 0xbc, 0x4d, 0x5b, 0xcf, 0x11, 0xa8, 0xfd, 0x00, 0x80, 0x5f, 0x5c, 0x44, 0x2b,
];

pub const WM_TITLE: &str = "WM/Title";
pub const WM_AUTHOR: &str = "WM/Author";
pub const WM_ALBUM_TITLE: &str = "WM/AlbumTitle";
/// Zero based track number.
pub const WM_TRACK: &str = "WM/Track";
/// One based track number.
pub const WM_TRACK_NUMBER: &str = "WM/TrackNumber";
pub const WM_YEAR: &str = "WM/Year";
pub const WM_GENRE: &str = "WM/Genre";
pub const WM_GENRE_ID: &str = "WM/GenreID";
pub const WM_DESCRIPTION: &str = "WM/Description";

/// Extended content description value types.
pub const TYPE_STRING: u16 = 0;
pub const TYPE_BINARY: u16 = 1;
pub const TYPE_BOOLEAN: u16 = 2;
pub const TYPE_INT: u16 = 3;
pub const TYPE_LONG: u16 = 4;

/// Returns a readable name of a known object.
pub fn object_name(guid: &Guid) -> &'static str {
    match *guid {
        FILE_PROPERTIES => "file properties",
        STREAM_PROPERTIES => "stream properties",
        EXTENDED_STREAM_PROPERTIES => "extended stream properties",
        CONTENT_DESCRIPTION => "content description",
        EXTENDED_CONTENT_DESCRIPTION => "extended content description",
        CONTENT_ENCRYPTION => "content encryption",
        EXTENDED_CONTENT_ENCRYPTION => "extended content encryption",
        _ => "unknown object",
    }
}
