use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::AudioMetadata;

/// The outcome of committing a record to a file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteStatus {
    Success,
    /// The file isn't of the format handled by the writer.
    IncorrectFileType,
    /// The file couldn't be opened, read, written or replaced.
    ReadWriteError,
    /// The file is too small or damaged to hold a tag.
    FormatDefective,
    /// The existing ID3v2 tag couldn't be parsed.
    BadId3,
    FailedTitle,
    FailedArtist,
    FailedAlbum,
    FailedYear,
    FailedComment,
    FailedTrack,
    FailedGenre,
}

impl WriteStatus {
    pub fn is_success(&self) -> bool {
        *self == WriteStatus::Success
    }
}

/// A writer applying an audio record to an existing file.
pub trait TagWriter {
    /// Writes the record to the file at the path, replacing the tag fields the writer manages.
    fn commit(&self, path: &Path, audio: &AudioMetadata) -> WriteStatus;
}

/// Replaces the file at the path with the output of `fill`. The output is written to a temporary
/// file in the same directory which is renamed over the original, so the original stays intact if
/// anything fails.
pub(crate) fn replace_file(
    path: &Path,
    fill: impl FnOnce(&mut File, &mut BufWriter<&File>) -> io::Result<()>,
) -> crate::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut src = File::open(path)?;
    let temp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        fill(&mut src, &mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    std::fs::set_permissions(temp.path(), src.metadata()?.permissions())?;
    drop(src);
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
