//! Container and stream metadata.
//!
//! Containers carry free-form key/value tags. [`MediaKey`] names a tag,
//! [`MetadataValue`] holds its typed value and [`Metadata`] is the mapping
//! snapshot taken when a media file is opened.
//!
//! Tags arrive from the container as strings. Each well-known key has an
//! expected [`ValueType`] and values are parsed into that type when they are
//! inserted; a value that does not parse is kept as text rather than
//! dropped.
//!
//! ```
//! use mediakit::{MediaKey, Metadata};
//!
//! let mut metadata = Metadata::new();
//! metadata.insert_raw(MediaKey::TRACK, "3/12");
//! metadata.insert_raw(MediaKey::TITLE, "Intro");
//!
//! assert_eq!(metadata.get(&MediaKey::TRACK).and_then(|v| v.as_u64()), Some(3));
//! assert_eq!(metadata.get(&MediaKey::TITLE).and_then(|v| v.as_str()), Some("Intro"));
//! assert!(metadata.get(&MediaKey::GENRE).is_none());
//! ```

use std::{
    borrow::{Borrow, Cow},
    collections::{HashMap, hash_map},
    fmt::{Display, Formatter, Result as FmtResult},
};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::flags::MediaFlag;

/// The type a metadata key's value is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Free-form text.
    Text,
    /// An unsigned integer (track number, year, ...).
    UInt,
    /// A boolean flag.
    Bool,
    /// A point in time.
    Timestamp,
}

/// The name of a metadata tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaKey(Cow<'static, str>);

macro_rules! media_keys {
    ($($(#[$doc:meta])* $name:ident = $key:literal => $ty:ident;)*) => {
        impl MediaKey {
            $(
                $(#[$doc])*
                pub const $name: MediaKey = MediaKey(Cow::Borrowed($key));
            )*

            /// The expected value type of this key. Unknown keys are text.
            pub fn value_type(&self) -> ValueType {
                match self.as_str() {
                    $($key => ValueType::$ty,)*
                    _ => ValueType::Text,
                }
            }
        }
    };
}

media_keys! {
    /// Major brand of an ISO base media file.
    BRAND_MAJOR = "major_brand" => Text;
    /// Compatible brands of an ISO base media file.
    BRAND_COMPATIBLE = "compatible_brands" => Text;
    /// When the media was created.
    CREATED = "creation_time" => Timestamp;
    /// Software that encoded the media.
    ENCODER = "encoder" => Text;
    /// Album name.
    ALBUM = "album" => Text;
    /// Album artist.
    ALBUM_ARTIST = "artist" => Text;
    /// Free-form comment.
    COMMENT = "comment" => Text;
    /// Composer.
    COMPOSER = "composer" => Text;
    /// Copyright notice.
    COPYRIGHT = "copyright" => Text;
    /// Release year.
    YEAR = "date" => UInt;
    /// Disc number.
    DISC = "disc" => UInt;
    /// Person or organisation that encoded the media.
    ENCODED_BY = "encoded_by" => Text;
    /// Original file name.
    FILENAME = "filename" => Text;
    /// Genre.
    GENRE = "genre" => Text;
    /// Language code.
    LANGUAGE = "language" => Text;
    /// Performer.
    PERFORMER = "performer" => Text;
    /// Publisher.
    PUBLISHER = "publisher" => Text;
    /// Broadcast service name.
    SERVICE_NAME = "service_name" => Text;
    /// Broadcast service provider.
    SERVICE_PROVIDER = "service_provider" => Text;
    /// Title.
    TITLE = "title" => Text;
    /// Track number.
    TRACK = "track" => UInt;
    /// Major version of an ISO base media file.
    VERSION_MAJOR = "major_version" => Text;
    /// Minor version of an ISO base media file.
    VERSION_MINOR = "minor_version" => Text;
    /// TV show name.
    SHOW = "show" => Text;
    /// TV season number.
    SEASON = "season_number" => UInt;
    /// Episode sort key.
    EPISODE_SORT = "episode_sort" => Text;
    /// Episode number.
    EPISODE_ID = "episode_id" => UInt;
    /// Part of a compilation.
    COMPILATION = "compilation" => Bool;
    /// Gapless playback is requested.
    GAPLESS_PLAYBACK = "gapless_playback" => Bool;
    /// Store account identifier.
    ACCOUNT_ID = "account_id" => Text;
    /// Description.
    DESCRIPTION = "description" => Text;
    /// Store media type.
    MEDIA_TYPE = "media_type" => Text;
    /// When the media was purchased.
    PURCHASED = "purchase_date" => Timestamp;
    /// Album sort key.
    ALBUM_SORT = "sort_album" => Text;
    /// Artist sort key.
    ARTIST_SORT = "sort_artist" => Text;
    /// Title sort key.
    TITLE_SORT = "sort_name" => Text;
    /// Long synopsis.
    SYNOPSIS = "synopsis" => Text;
    /// Grouping.
    GROUPING = "grouping" => Text;
}

impl MediaKey {
    /// A key outside the well-known set.
    pub fn new(key: impl Into<String>) -> Self {
        MediaKey(Cow::Owned(key.into()))
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MediaKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MediaKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MediaKey {
    fn from(key: &str) -> Self {
        MediaKey::new(key)
    }
}

/// A typed metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    /// Free-form text, or a value that did not parse as its expected type.
    Text(String),
    /// An unsigned integer.
    UInt(u64),
    /// A boolean.
    Bool(bool),
    /// A UTC timestamp.
    Timestamp(DateTime<Utc>),
}

impl MetadataValue {
    /// Parse `raw` as `value_type`, falling back to text.
    pub fn parse(raw: &str, value_type: ValueType) -> Self {
        let trimmed = raw.trim();
        let parsed = match value_type {
            ValueType::Text => None,
            ValueType::UInt => parse_uint(trimmed).map(MetadataValue::UInt),
            ValueType::Bool => parse_bool(trimmed).map(MetadataValue::Bool),
            ValueType::Timestamp => parse_timestamp(trimmed).map(MetadataValue::Timestamp),
        };
        parsed.unwrap_or_else(|| MetadataValue::Text(raw.to_string()))
    }

    /// The value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The value as an unsigned integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MetadataValue::UInt(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a timestamp, if it is one.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            MetadataValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }
}

impl Display for MetadataValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MetadataValue::Text(text) => f.write_str(text),
            MetadataValue::UInt(value) => write!(f, "{value}"),
            MetadataValue::Bool(value) => write!(f, "{value}"),
            MetadataValue::Timestamp(value) => write!(f, "{}", value.to_rfc3339()),
        }
    }
}

/// Leading decimal digits: `"3/12"` is track 3, `"2014-05-01"` is year 2014.
fn parse_uint(raw: &str) -> Option<u64> {
    let end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Key/value metadata of a media file or stream.
///
/// Order is irrelevant. Looking up an absent key returns `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    values: HashMap<MediaKey, MetadataValue>,
}

impl Metadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a typed value, replacing any previous value for `key`.
    pub fn insert(&mut self, key: MediaKey, value: MetadataValue) {
        self.values.insert(key, value);
    }

    /// Insert a raw container string, parsed by the key's expected type.
    pub fn insert_raw(&mut self, key: MediaKey, raw: &str) {
        let value = MetadataValue::parse(raw, key.value_type());
        self.values.insert(key, value);
    }

    /// The value for `key`, or `None` if absent.
    pub fn get(&self, key: &MediaKey) -> Option<&MetadataValue> {
        self.values.get(key)
    }

    /// The value for a key given by name.
    pub fn get_str(&self, key: &str) -> Option<&MetadataValue> {
        self.values.get(key)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &MediaKey) -> bool {
        self.values.contains_key(key)
    }

    /// The keys present, sorted for stable output.
    pub fn keys(&self) -> Vec<&MediaKey> {
        let mut keys: Vec<&MediaKey> = self.values.keys().collect();
        keys.sort();
        keys
    }

    /// Iterate over key/value pairs in no particular order.
    pub fn iter(&self) -> hash_map::Iter<'_, MediaKey, MetadataValue> {
        self.values.iter()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Library flags implied by the tags: album, album track, compilation,
    /// TV show and TV episode.
    pub fn flags(&self) -> MediaFlag {
        let mut flags = MediaFlag::NONE;
        if self.contains(&MediaKey::ALBUM) {
            flags |= MediaFlag::ALBUM;
            if self.contains(&MediaKey::TRACK) {
                flags |= MediaFlag::ALBUM_TRACK;
            }
        }
        if self.get(&MediaKey::COMPILATION).and_then(MetadataValue::as_bool) == Some(true) {
            flags |= MediaFlag::ALBUM_COMPILATION;
        }
        if self.contains(&MediaKey::SHOW) {
            flags |= MediaFlag::TVSHOW;
            if self.contains(&MediaKey::EPISODE_ID) || self.contains(&MediaKey::EPISODE_SORT) {
                flags |= MediaFlag::TVSHOW_EPISODE;
            }
        }
        flags
    }
}

impl<'a> IntoIterator for &'a Metadata {
    type Item = (&'a MediaKey, &'a MetadataValue);
    type IntoIter = hash_map::Iter<'a, MediaKey, MetadataValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
