//! Harvested post representation.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Timestamp format used in the durable store.
pub(crate) const STORE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single harvested post.
///
/// `link` is the natural unique key used for deduplication; `posted_at` is
/// the dataset sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Handle of the author.
    pub author: String,
    /// Full text of the post.
    pub text: String,
    /// Repost count at harvest time.
    pub reposts: u64,
    /// Like count at harvest time.
    pub likes: u64,
    /// Reply count at harvest time.
    pub replies: u64,
    /// When the post was published.
    pub posted_at: PostedAt,
    /// Permalink; unique per post.
    pub link: String,
}

/// The publication timestamp of a post, as stored in the dataset.
///
/// Keeps the raw string exactly as harvested alongside its parsed form, so
/// rows whose timestamp cannot be parsed survive round-trips through the
/// store unchanged. The total order places every parsable timestamp first
/// (ascending), then unparsable values ordered by their raw string, which
/// keeps sorting deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedAt {
    raw: String,
    parsed: Option<DateTime<Utc>>,
}

impl PostedAt {
    /// Parses a raw timestamp string.
    ///
    /// Accepts the store format (`2018-06-15 12:30:45`) and RFC 3339. A
    /// value in neither format is kept verbatim with no parsed form.
    #[must_use]
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = NaiveDateTime::parse_from_str(&raw, STORE_TIME_FORMAT)
            .map(|naive| naive.and_utc())
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|at| at.with_timezone(&Utc))
                    .ok()
            });
        Self { raw, parsed }
    }

    /// Creates a timestamp from a known instant.
    ///
    /// Sub-second precision is dropped so the value round-trips through the
    /// store format unchanged.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let at = at.with_nanosecond(0).unwrap_or(at);
        Self {
            raw: at.format(STORE_TIME_FORMAT).to_string(),
            parsed: Some(at),
        }
    }

    /// The parsed instant, if the raw value was parsable.
    #[must_use]
    pub const fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.parsed
    }

    /// The raw timestamp string as harvested.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for PostedAt {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.parsed, other.parsed) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for PostedAt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for PostedAt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for PostedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PostedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::parse(String::deserialize(deserializer)?))
    }
}
