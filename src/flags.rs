//! Media flags.
//!
//! [`MediaFlag`] is a bitfield describing what a media file, a stream, or a
//! packet's stream contains: its category (video, audio, ...), properties
//! such as embedded artwork, and library-level descriptors (file, album,
//! TV show). Flags compose with `|` and are tested with
//! [`is`](MediaFlag::is).
//!
//! ```
//! use mediakit::MediaFlag;
//!
//! let flags = MediaFlag::VIDEO | MediaFlag::AUDIO;
//! assert!(flags.is(MediaFlag::AUDIO));
//! assert!(!flags.is(MediaFlag::SUBTITLE));
//! assert_eq!(flags.to_string(), "VIDEO|AUDIO");
//! assert_eq!(MediaFlag::NONE.to_string(), "NONE");
//! ```

use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    str::FromStr,
};

bitflags::bitflags! {
    /// A set of media flags.
    ///
    /// Named flags are declared in enumeration order, which is also the
    /// order they render in.
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MediaFlag: u32 {
        /// Part of an album.
        const ALBUM = 1 << 0;
        /// An album track.
        const ALBUM_TRACK = 1 << 1;
        /// The album is a compilation.
        const ALBUM_COMPILATION = 1 << 2;
        /// Part of a TV show.
        const TVSHOW = 1 << 3;
        /// A TV show episode.
        const TVSHOW_EPISODE = 1 << 4;
        /// Backed by a local file.
        const FILE = 1 << 5;
        /// Contains video.
        const VIDEO = 1 << 6;
        /// Contains audio.
        const AUDIO = 1 << 7;
        /// Contains subtitles.
        const SUBTITLE = 1 << 8;
        /// Contains a data stream.
        const DATA = 1 << 9;
        /// Contains an attachment.
        const ATTACHMENT = 1 << 10;
        /// Contains artwork.
        const ARTWORK = 1 << 11;
        /// Contains captions.
        const CAPTIONS = 1 << 12;
        /// Is an encoder.
        const ENCODER = 1 << 13;
        /// Is a decoder.
        const DECODER = 1 << 14;
    }
}

impl MediaFlag {
    /// No flags.
    pub const NONE: MediaFlag = MediaFlag::empty();

    /// Union of every named flag.
    pub const MAX: MediaFlag = MediaFlag::all();

    /// The stream categories a [`StreamMap`](crate::StreamMap) selects on,
    /// in selection order.
    pub const CATEGORIES: [MediaFlag; 5] = [
        MediaFlag::VIDEO,
        MediaFlag::AUDIO,
        MediaFlag::SUBTITLE,
        MediaFlag::DATA,
        MediaFlag::ATTACHMENT,
    ];

    /// Union of [`CATEGORIES`](MediaFlag::CATEGORIES).
    pub const ALL_CATEGORIES: MediaFlag = MediaFlag::VIDEO
        .union(MediaFlag::AUDIO)
        .union(MediaFlag::SUBTITLE)
        .union(MediaFlag::DATA)
        .union(MediaFlag::ATTACHMENT);

    /// Whether every flag in `test` is also set in `self`.
    pub const fn is(self, test: MediaFlag) -> bool {
        self.contains(test)
    }

    /// Whether no flag is set.
    pub const fn is_none(self) -> bool {
        self.is_empty()
    }

    /// Whether the value lies within `[NONE, MAX]`.
    pub const fn is_valid(self) -> bool {
        MediaFlag::MAX.contains(self)
    }

    /// The name of a single named flag, or `None` for combinations.
    pub fn name(self) -> Option<&'static str> {
        if self.is_none() {
            return Some("NONE");
        }
        MediaFlag::MAX
            .iter_names()
            .find(|(_, flag)| *flag == self)
            .map(|(name, _)| name)
    }
}

impl Default for MediaFlag {
    fn default() -> Self {
        MediaFlag::NONE
    }
}

impl Display for MediaFlag {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if !self.is_valid() {
            return write!(f, "[?? Invalid MediaFlag {:#x}]", self.bits());
        }
        if self.is_none() {
            return write!(f, "NONE");
        }
        for (position, (name, _)) in self.iter_names().enumerate() {
            if position > 0 {
                write!(f, "|")?;
            }
            write!(f, "{name}")?;
        }
        Ok(())
    }
}

impl Debug for MediaFlag {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "MediaFlag({self})")
    }
}

/// Error returned when parsing an unknown flag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMediaFlagError(String);

impl Display for ParseMediaFlagError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "unknown media flag: {}", self.0)
    }
}

impl std::error::Error for ParseMediaFlagError {}

impl FromStr for MediaFlag {
    type Err = ParseMediaFlagError;

    /// Parse names separated by `|` or `,`, case-insensitively.
    ///
    /// An empty string and `none` parse as [`MediaFlag::NONE`].
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut flags = MediaFlag::NONE;
        for part in value.split(['|', ',']) {
            let part = part.trim();
            if part.is_empty() || part.eq_ignore_ascii_case("none") {
                continue;
            }
            let (_, flag) = MediaFlag::MAX
                .iter_names()
                .find(|(name, _)| name.eq_ignore_ascii_case(part))
                .ok_or_else(|| ParseMediaFlagError(part.to_string()))?;
            flags |= flag;
        }
        Ok(flags)
    }
}
