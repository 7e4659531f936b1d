//! Data models for Course Fetcher
//!
//! This module defines the read-only course tree materialized from a manifest
//! (course → lesson → video) and the derived download task consumed by workers.

use std::fmt;
use std::path::PathBuf;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A course: the top-level directory of the download tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Course name (blank for legacy lesson-only manifests)
    #[serde(rename = "nome", alias = "name", default)]
    pub name: String,
    /// Lessons in manifest order
    #[serde(rename = "aulas", alias = "lessons")]
    pub lessons: Vec<Lesson>,
}

/// A lesson inside a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson name, used as the second directory level
    #[serde(rename = "nome", alias = "name")]
    pub name: String,
    /// Videos in manifest order
    #[serde(default)]
    pub videos: Vec<VideoEntry>,
}

/// One video with its available resolutions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEntry {
    /// Human title of the video
    #[serde(rename = "titulo", alias = "title")]
    pub title: String,
    /// Resolution label to source URL, in manifest order
    #[serde(rename = "resolucoes", alias = "resolutions", default)]
    pub resolutions: Resolutions,
}

/// Resolution label → URL mapping that keeps the manifest's insertion order
///
/// The order matters: when none of the preferred labels is present, the
/// first-inserted entry is the fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolutions(Vec<(String, String)>);

impl Resolutions {
    /// Build from ordered `(label, url)` pairs
    pub fn from_pairs<I, L, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, U)>,
        L: Into<String>,
        U: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(label, url)| (label.into(), url.into()))
                .collect(),
        )
    }

    /// URL for a label, ignoring entries with an empty URL
    pub fn get(&self, label: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(l, url)| l == label && !url.trim().is_empty())
            .map(|(_, url)| url.as_str())
    }

    /// Entries with a usable (non-empty) URL, in insertion order
    pub fn usable(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(_, url)| !url.trim().is_empty())
            .map(|(label, url)| (label.as_str(), url.as_str()))
    }

    /// Labels in insertion order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(label, _)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Resolutions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, url) in &self.0 {
            map.serialize_entry(label, url)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Resolutions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Resolutions;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of resolution labels to URLs")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(4));
                while let Some((label, url)) = map.next_entry::<String, Option<String>>()? {
                    pairs.push((label, url.unwrap_or_default()));
                }
                Ok(Resolutions(pairs))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// One resolved, independent unit of download work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTask {
    /// Final on-disk location
    pub destination: PathBuf,
    /// Chosen source URL
    pub url: String,
    /// Resolution label the URL was chosen for
    pub resolution: String,
    /// Raw video title for display
    pub title: String,
    /// 1-based position of the video within its lesson
    pub index: usize,
    /// 1-based position in the whole run, for `(i/total)` numbering
    pub sequence: usize,
}

impl DownloadTask {
    /// File name component of the destination, for compact display
    pub fn file_name(&self) -> String {
        self.destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.title.clone())
    }
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} [{}]", self.sequence, self.title, self.resolution)
    }
}
