//! Curriculum model - the ordered list of topics a learner works through.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Canonical topic identifier.
///
/// Always the part of a curriculum entry before the first colon, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(String);

impl TopicId {
    /// Create a topic id from a bare name or a `"Name: description"` entry.
    pub fn new(entry: impl AsRef<str>) -> Self {
        let entry = entry.as_ref();
        let name = match entry.split_once(':') {
            Some((name, _)) => name,
            None => entry,
        };
        Self(name.trim().to_string())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TopicId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TopicId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TopicId {
    fn from(entry: &str) -> Self {
        Self::new(entry)
    }
}

impl From<String> for TopicId {
    fn from(entry: String) -> Self {
        Self::new(entry)
    }
}

/// A single curriculum entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurriculumEntry {
    /// Canonical identifier
    pub id: TopicId,

    /// Text after the first colon, if any
    pub description: Option<String>,

    /// Entry exactly as supplied
    pub raw: String,
}

impl CurriculumEntry {
    /// Parse a bare name or a `"Name: description"` entry.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let description = raw
            .split_once(':')
            .map(|(_, desc)| desc.trim())
            .filter(|desc| !desc.is_empty())
            .map(str::to_string);

        Self {
            id: TopicId::new(&raw),
            description,
            raw,
        }
    }
}

/// Ordered sequence of topics. Position defines prerequisite order.
///
/// Serialized as the list of raw entries, which is how curricula are cached
/// locally and delivered by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Curriculum {
    entries: Vec<CurriculumEntry>,
}

impl Curriculum {
    /// Build a curriculum from raw entries, keeping their order.
    pub fn parse<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<CurriculumEntry> = entries.into_iter().map(CurriculumEntry::parse).collect();

        for (index, entry) in entries.iter().enumerate() {
            if entries[..index].iter().any(|earlier| earlier.id == entry.id) {
                debug!("Duplicate topic '{}' at position {}; first occurrence wins", entry.id, index);
            }
        }

        Self { entries }
    }

    /// Position of a topic, first occurrence.
    pub fn position(&self, topic: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id.as_str() == topic)
    }

    /// Topic immediately before `topic`.
    ///
    /// `None` when the topic is unknown, `Some(None)` when it is the first one.
    pub fn previous(&self, topic: &str) -> Option<Option<&TopicId>> {
        let index = self.position(topic)?;
        Some(index.checked_sub(1).map(|prev| &self.entries[prev].id))
    }

    /// Entry at a position.
    pub fn get(&self, index: usize) -> Option<&CurriculumEntry> {
        self.entries.get(index)
    }

    /// First topic, if any.
    pub fn first(&self) -> Option<&TopicId> {
        self.entries.first().map(|entry| &entry.id)
    }

    /// Whether the topic appears in this curriculum.
    pub fn contains(&self, topic: &str) -> bool {
        self.position(topic).is_some()
    }

    /// Iterate over entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &CurriculumEntry> {
        self.entries.iter()
    }

    /// Iterate over topic ids in order.
    pub fn topics(&self) -> impl Iterator<Item = &TopicId> {
        self.entries.iter().map(|entry| &entry.id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<String>> for Curriculum {
    fn from(entries: Vec<String>) -> Self {
        Self::parse(entries)
    }
}

impl From<Curriculum> for Vec<String> {
    fn from(curriculum: Curriculum) -> Self {
        curriculum.entries.into_iter().map(|entry| entry.raw).collect()
    }
}
