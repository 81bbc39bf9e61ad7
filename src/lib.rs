//! A library for reading descriptive metadata from audio and video containers, and for rewriting
//! the tags of MP3, Ogg Vorbis and MPEG-4 audio files.
//!
//! Every reader produces one of two format independent records, [`AudioMetadata`] or
//! [`VideoMetadata`].
//!
//! # Examples
//!
//! ## Reading
//! ```no_run
//! let metadata = mediameta::read_from_path("music.flac").unwrap();
//!
//! if let Some(audio) = metadata.audio() {
//!     println!("{:?} by {:?}", audio.title(), audio.artist());
//! }
//! ```
//!
//! ## Writing
//! ```no_run
//! use std::path::Path;
//!
//! use mediameta::{Format, WriteConfig};
//!
//! let path = Path::new("music.mp3");
//! let mut audio = mediameta::read_from_path(path).unwrap().into_audio().unwrap();
//! audio.set_title("title");
//!
//! let writer = Format::Mp3.writer(WriteConfig::DEFAULT).unwrap();
//! assert!(writer.commit(path, &audio).is_success());
//! ```
#[macro_use]
extern crate lazy_static;

pub use crate::config::{ReadConfig, WriteConfig, DEFAULT_CONFIG};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::format::{read_from, read_from_path, Format};
pub use crate::genre::STANDARD_GENRES;
pub use crate::mp3::Mp3Writer;
pub use crate::mp4::M4aWriter;
pub use crate::ogg::vorbis::OggWriter;
pub use crate::record::{AudioMetadata, Metadata, VideoMetadata};
pub use crate::write::{TagWriter, WriteStatus};

pub mod asf;
pub mod flac;
pub mod genre;
pub mod mp3;
pub mod mp4;
pub mod ogg;
pub mod riff;
pub mod vorbis;

mod config;
mod error;
mod format;
mod record;
mod util;
mod write;
