use std::fmt;

use mediameta_proc::{number_field_accessor, ordinal_field_accessor, text_field_accessor};

use crate::genre::resolve_genre;

/// Trims whitespace and zero characters, returns `None` for blank text.
pub(crate) fn normalize(text: &str) -> Option<String> {
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    match text.is_empty() {
        true => None,
        false => Some(text.to_owned()),
    }
}

/// Parses a number, accepting the `n/m` notation of track and disk fields.
pub(crate) fn parse_number<T: std::str::FromStr>(text: &str) -> Option<T> {
    let text = text.trim();
    let number = text.split_once('/').map_or(text, |(n, _)| n).trim();
    number.parse().ok()
}

fn parse_ordinal(text: &str) -> Option<u16> {
    parse_number(text).filter(|&n| n != 0)
}

/// Parses `n/m` into its two halves. Zero values are treated as unset.
pub(crate) fn parse_pair(text: &str) -> (Option<u16>, Option<u16>) {
    let (n, m) = match text.split_once('/') {
        Some((n, m)) => (n, Some(m)),
        None => (text, None),
    };
    let non_zero = |s: &str| s.trim().parse::<u16>().ok().filter(|&n| n != 0);
    (non_zero(n), m.and_then(non_zero))
}

/// The format independent audio tag.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AudioMetadata {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    year: Option<String>,
    comment: Option<String>,
    track: Option<u16>,
    total_tracks: Option<u16>,
    disk: Option<u16>,
    total_disks: Option<u16>,
    genre: Option<String>,
    bitrate: Option<u32>,
    length: Option<u32>,
    license: Option<String>,
    license_type: Option<String>,
}

text_field_accessor!(AudioMetadata, "title");
text_field_accessor!(AudioMetadata, "artist");
text_field_accessor!(AudioMetadata, "album");
text_field_accessor!(AudioMetadata, "year");
text_field_accessor!(AudioMetadata, "comment");
text_field_accessor!(AudioMetadata, "genre");
text_field_accessor!(AudioMetadata, "license");
text_field_accessor!(AudioMetadata, "license_type");

ordinal_field_accessor!(AudioMetadata, "track", u16);
ordinal_field_accessor!(AudioMetadata, "total_tracks", u16);
ordinal_field_accessor!(AudioMetadata, "disk", u16);
ordinal_field_accessor!(AudioMetadata, "total_disks", u16);
number_field_accessor!(AudioMetadata, "bitrate", u32);
number_field_accessor!(AudioMetadata, "length", u32);

impl AudioMetadata {
    /// Returns true if every canonical field is set.
    pub fn is_complete(&self) -> bool {
        self.title.is_some()
            && self.artist.is_some()
            && self.album.is_some()
            && self.year.is_some()
            && self.comment.is_some()
            && self.track.is_some()
            && self.genre.is_some()
            && self.bitrate.is_some()
            && self.length.is_some()
    }

    /// Returns the set fields as ordered name value pairs.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        let mut push = |name, value: Option<String>| {
            if let Some(v) = value {
                fields.push((name, v));
            }
        };

        push("title", self.title.clone());
        push("artist", self.artist.clone());
        push("album", self.album.clone());
        push("genre", self.genre.clone());
        push("track", self.track.map(|n| n.to_string()));
        push("totaltracks", self.total_tracks.map(|n| n.to_string()));
        push("disk", self.disk.map(|n| n.to_string()));
        push("totaldisks", self.total_disks.map(|n| n.to_string()));
        push("year", self.year.clone());
        push("seconds", self.length.map(|n| n.to_string()));
        push("bitrate", self.bitrate.map(|n| n.to_string()));
        push("comments", self.comment.clone());
        push("license", self.license.clone());
        push("licensetype", self.license_type.clone());

        fields
    }

    /// Builds a record from name value pairs. Unknown names are ignored, unparsable numbers are
    /// dropped.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut audio = Self::default();
        for (name, value) in fields {
            match name {
                "title" => audio.set_title(value),
                "artist" => audio.set_artist(value),
                "album" => audio.set_album(value),
                "genre" => audio.set_genre(resolve_genre(value)),
                "track" => audio.track = parse_ordinal(value),
                "totaltracks" => audio.total_tracks = parse_ordinal(value),
                "disk" => audio.disk = parse_ordinal(value),
                "totaldisks" => audio.total_disks = parse_ordinal(value),
                "year" => audio.set_year(value),
                "seconds" => audio.length = parse_number(value),
                "bitrate" => audio.bitrate = parse_number(value),
                "comments" => audio.set_comment(value),
                "license" => audio.set_license(value),
                "licensetype" => audio.set_license_type(value),
                _ => (),
            }
        }
        audio
    }
}

impl fmt::Display for AudioMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.fields() {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// The format independent video tag.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VideoMetadata {
    title: Option<String>,
    year: Option<String>,
    length: Option<u32>,
    comment: Option<String>,
    language: Option<String>,
    license: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

text_field_accessor!(VideoMetadata, "title");
text_field_accessor!(VideoMetadata, "year");
text_field_accessor!(VideoMetadata, "comment");
text_field_accessor!(VideoMetadata, "language");
text_field_accessor!(VideoMetadata, "license");

number_field_accessor!(VideoMetadata, "length", u32);
number_field_accessor!(VideoMetadata, "width", u32);
number_field_accessor!(VideoMetadata, "height", u32);

impl VideoMetadata {
    /// Returns true if every canonical field is set.
    pub fn is_complete(&self) -> bool {
        self.title.is_some()
            && self.year.is_some()
            && self.length.is_some()
            && self.comment.is_some()
            && self.language.is_some()
            && self.license.is_some()
            && self.width.is_some()
            && self.height.is_some()
    }

    /// Returns the set fields as ordered name value pairs.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let texts = [
            ("title", self.title.clone()),
            ("year", self.year.clone()),
            ("length", self.length.map(|n| n.to_string())),
            ("comments", self.comment.clone()),
            ("language", self.language.clone()),
            ("license", self.license.clone()),
            ("width", self.width.map(|n| n.to_string())),
            ("height", self.height.map(|n| n.to_string())),
        ];
        texts.into_iter().filter_map(|(name, value)| Some((name, value?))).collect()
    }

    /// Builds a record from name value pairs. Unknown names are ignored, unparsable numbers are
    /// dropped.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut video = Self::default();
        for (name, value) in fields {
            match name {
                "title" => video.set_title(value),
                "year" => video.set_year(value),
                "length" => video.length = parse_number(value),
                "comments" => video.set_comment(value),
                "language" => video.set_language(value),
                "license" => video.set_license(value),
                "width" => video.width = parse_number(value),
                "height" => video.height = parse_number(value),
                _ => (),
            }
        }
        video
    }
}

impl fmt::Display for VideoMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.fields() {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// The record produced by a reader.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Metadata {
    /// Tags of an audio file.
    Audio(AudioMetadata),
    /// Tags of a video file.
    Video(VideoMetadata),
}

impl Metadata {
    /// Returns the audio record if this is an audio file.
    pub fn audio(&self) -> Option<&AudioMetadata> {
        match self {
            Self::Audio(a) => Some(a),
            Self::Video(_) => None,
        }
    }

    /// Returns the video record if this is a video file.
    pub fn video(&self) -> Option<&VideoMetadata> {
        match self {
            Self::Audio(_) => None,
            Self::Video(v) => Some(v),
        }
    }

    pub fn into_audio(self) -> Option<AudioMetadata> {
        match self {
            Self::Audio(a) => Some(a),
            Self::Video(_) => None,
        }
    }

    pub fn into_video(self) -> Option<VideoMetadata> {
        match self {
            Self::Audio(_) => None,
            Self::Video(v) => Some(v),
        }
    }

    /// Returns the title of either record.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Audio(a) => a.title(),
            Self::Video(v) => v.title(),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Self::Audio(a) => a.is_complete(),
            Self::Video(v) => v.is_complete(),
        }
    }

    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Audio(a) => a.fields(),
            Self::Video(v) => v.fields(),
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio(a) => a.fmt(f),
            Self::Video(v) => v.fmt(f),
        }
    }
}
