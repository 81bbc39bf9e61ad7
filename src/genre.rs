use std::collections::HashMap;

/// The ID3v1 genre list including the Winamp extensions. The position in the list is the code
/// stored in ID3v1 trailers and `(N)` references. The MPEG-4 `gnre` atom stores the code
/// incremented by 1.
pub const STANDARD_GENRES: [&str; 148] = [
    "Blues",
    "Classic Rock",
    "Country",
    "Dance",
    "Disco",
    "Funk",
    "Grunge",
    "Hip-Hop",
    "Jazz",
    "Metal",
    "New Age",
    "Oldies",
    "Other",
    "Pop",
    "R&B",
    "Rap",
    "Reggae",
    "Rock",
    "Techno",
    "Industrial",
    "Alternative",
    "Ska",
    "Death Metal",
    "Pranks",
    "Soundtrack",
    "Euro-Techno",
    "Ambient",
    "Trip-Hop",
    "Vocal",
    "Jazz+Funk",
    "Fusion",
    "Trance",
    "Classical",
    "Instrumental",
    "Acid",
    "House",
    "Game",
    "Sound Clip",
    "Gospel",
    "Noise",
    "AlternRock",
    "Bass",
    "Soul",
    "Punk",
    "Space",
    "Meditative",
    "Instrumental Pop",
    "Instrumental Rock",
    "Ethnic",
    "Gothic",
    "Darkwave",
    "Techno-Industrial",
    "Electronic",
    "Pop-Folk",
    "Eurodance",
    "Dream",
    "Southern Rock",
    "Comedy",
    "Cult",
    "Gangsta",
    "Top 40",
    "Christian Rap",
    "Pop/Funk",
    "Jungle",
    "Native American",
    "Cabaret",
    "New Wave",
    "Psychadelic",
    "Rave",
    "Showtunes",
    "Trailer",
    "Lo-Fi",
    "Tribal",
    "Acid Punk",
    "Acid Jazz",
    "Polka",
    "Retro",
    "Musical",
    "Rock & Roll",
    "Hard Rock",
    "Folk",
    "Folk-Rock",
    "National Folk",
    "Swing",
    "Fast Fusion",
    "Bebob",
    "Latin",
    "Revival",
    "Celtic",
    "Bluegrass",
    "Avantgarde",
    "Gothic Rock",
    "Progressive Rock",
    "Psychedelic Rock",
    "Symphonic Rock",
    "Slow Rock",
    "Big Band",
    "Chorus",
    "Easy Listening",
    "Acoustic",
    "Humour",
    "Speech",
    "Chanson",
    "Opera",
    "Chamber Music",
    "Sonata",
    "Symphony",
    "Booty Bass",
    "Primus",
    "Porn Groove",
    "Satire",
    "Slow Jam",
    "Club",
    "Tango",
    "Samba",
    "Folklore",
    "Ballad",
    "Power Ballad",
    "Rhythmic Soul",
    "Freestyle",
    "Duet",
    "Punk Rock",
    "Drum Solo",
    "A capella",
    "Euro-House",
    "Dance Hall",
    "Goa",
    "Drum & Bass",
    "Club-House",
    "Hardcore",
    "Terror",
    "Indie",
    "BritPop",
    "Negerpunk",
    "Polsk Punk",
    "Beat",
    "Christian Gangsta Rap",
    "Heavy Metal",
    "Black Metal",
    "Crossover",
    "Contemporary Christian",
    "Christian Rock",
    "Merengue",
    "Salsa",
    "Thrash Metal",
    "Anime",
    "JPop",
    "Synthpop",
];

/// The ID3v1 genre byte signalling that no genre is set.
pub const NO_GENRE: u8 = 255;

lazy_static! {
    static ref GENRE_CODES: HashMap<String, u8> = STANDARD_GENRES
        .iter()
        .enumerate()
        .map(|(code, name)| (name.to_lowercase(), code as u8))
        .collect();
}

/// Returns the name of the genre with the ID3v1 code.
pub fn genre_name(code: usize) -> Option<&'static str> {
    STANDARD_GENRES.get(code).copied()
}

/// Looks up the ID3v1 code of a genre name, ignoring case.
pub fn genre_code(name: &str) -> Option<u8> {
    GENRE_CODES.get(&name.trim().to_lowercase()).copied()
}

/// Resolves genre text found in tags. `(N)`, `(N)text` and plain numeric references are looked
/// up in the genre list, everything else is returned as free text.
pub fn resolve_genre(text: &str) -> String {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix('(') {
        if let Some((code, _)) = rest.split_once(')') {
            if let Some(name) = code.parse::<usize>().ok().and_then(genre_name) {
                return name.to_owned();
            }
        }
    }

    match text.parse::<usize>().ok().and_then(genre_name) {
        Some(name) => name.to_owned(),
        None => text.to_owned(),
    }
}
