/// Configure what is read and which limits apply while reading.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadConfig {
    /// Whether to derive bitrate and length from the stream (MPEG frames, stream info blocks,
    /// Ogg granules, sample descriptions).
    pub read_audio_info: bool,
    /// Whether to parse the DRM header of ASF files.
    pub read_drm: bool,
    /// The maximum number of top level ASF header objects.
    pub max_asf_objects: u32,
    /// The number of bytes searched for the first MPEG frame header.
    pub max_frame_search: u64,
    /// The maximum length of a single text field or tag in bytes.
    pub max_text_len: u64,
}

impl ReadConfig {
    /// The default configuration reading everything.
    pub const DEFAULT: ReadConfig = ReadConfig {
        read_audio_info: true,
        read_drm: true,
        max_asf_objects: 100,
        max_frame_search: 100_000,
        max_text_len: 16 * 1024 * 1024,
    };

    /// A configuration only reading the descriptive tags.
    pub const TAGS_ONLY: ReadConfig = ReadConfig {
        read_audio_info: false,
        read_drm: false,
        ..ReadConfig::DEFAULT
    };
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The default read configuration.
pub const DEFAULT_CONFIG: ReadConfig = ReadConfig::DEFAULT;

/// Configure which tags are written to MP3 files.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WriteConfig {
    /// Whether the fixed 128 byte ID3v1 trailer is written.
    pub write_id3v1: bool,
    /// Whether the ID3v2 tag at the start of the file is written.
    pub write_id3v2: bool,
}

impl WriteConfig {
    /// The default configuration writing both ID3 versions.
    pub const DEFAULT: WriteConfig = WriteConfig { write_id3v1: true, write_id3v2: true };
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
