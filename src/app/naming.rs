//! File path generation and organization
//!
//! This module turns raw course, lesson and video titles into filesystem-safe
//! path segments and builds the on-disk layout:
//!
//! `{root}/{course}/{lesson}/Video {n} - {title}.{ext}`
//!
//! Paths longer than the configured limit have their file stem shortened and
//! marked with `...`; the directory portion and extension are never touched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::naming;
use crate::errors::PathError;

/// How characters that are illegal in a path segment are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizePolicy {
    /// Delete illegal characters
    #[default]
    Strip,
    /// Substitute each illegal character with `_`
    Replace,
    /// Keep only alphanumerics, spaces, `-` and `_`
    Whitelist,
}

impl std::str::FromStr for SanitizePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strip" => Ok(Self::Strip),
            "replace" => Ok(Self::Replace),
            "whitelist" => Ok(Self::Whitelist),
            other => Err(format!(
                "unknown sanitize policy '{}', expected strip, replace or whitelist",
                other
            )),
        }
    }
}

/// Make a raw title safe to use as a single path segment
///
/// Deterministic and idempotent. Blank input gives an empty segment; any
/// other input that sanitizes to nothing becomes a placeholder name.
pub fn sanitize(raw: &str, policy: SanitizePolicy) -> String {
    let mut cleaned = String::with_capacity(raw.len());

    for c in raw.chars() {
        if c.is_control() {
            continue;
        }
        match policy {
            SanitizePolicy::Strip => {
                if !naming::ILLEGAL_CHARS.contains(&c) {
                    cleaned.push(c);
                }
            }
            SanitizePolicy::Replace => {
                if naming::ILLEGAL_CHARS.contains(&c) {
                    cleaned.push(naming::REPLACEMENT_CHAR);
                } else {
                    cleaned.push(c);
                }
            }
            SanitizePolicy::Whitelist => {
                if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                    cleaned.push(c);
                }
            }
        }
    }

    let trimmed = cleaned
        .trim_start()
        .trim_end_matches(|c: char| c.is_whitespace() || c == '.');

    if trimmed.is_empty() && !raw.is_empty() {
        naming::EMPTY_NAME_PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

fn video_prefix(index: usize) -> String {
    format!("Video {} - ", index)
}

/// Build `{lesson_dir}/Video {index} - {segment}.{extension}`
pub fn compose(lesson_dir: &Path, index: usize, segment: &str, extension: &str) -> PathBuf {
    let file_name = if extension.is_empty() {
        format!("{}{}", video_prefix(index), segment)
    } else {
        format!("{}{}.{}", video_prefix(index), segment, extension)
    };
    lesson_dir.join(file_name)
}

/// Shorten the file stem so the whole path fits in `max_length` characters
///
/// Returns the path unchanged when it already fits, or when even an empty
/// stem could not make it fit (callers check [`fits`] and report an error).
/// Idempotent: a shortened path is exactly `max_length` characters long.
pub fn truncate(path: &Path, max_length: usize) -> PathBuf {
    truncate_keeping(path, max_length, 1)
}

/// Like [`truncate`], but the first `keep` characters of the stem survive
///
/// When fewer than `keep` stem characters fit, the path is returned
/// unchanged so it fails the length check instead of losing its prefix.
pub fn truncate_keeping(path: &Path, max_length: usize, keep: usize) -> PathBuf {
    let full = path.to_string_lossy();
    let total_len = full.chars().count();
    if total_len <= max_length {
        return path.to_path_buf();
    }

    let Some(file_name) = path.file_name() else {
        return path.to_path_buf();
    };
    let file_name = file_name.to_string_lossy();
    let prefix_len = total_len - file_name.chars().count();

    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let fixed = prefix_len + extension.chars().count() + naming::TRUNCATION_MARKER.chars().count();
    let budget = match max_length.checked_sub(fixed) {
        Some(budget) if budget >= keep.max(1) => budget,
        _ => return path.to_path_buf(),
    };

    let short_stem: String = stem.chars().take(budget).collect();
    let short_name = format!("{}{}{}", short_stem, naming::TRUNCATION_MARKER, extension);
    match path.parent() {
        Some(parent) => parent.join(short_name),
        None => PathBuf::from(short_name),
    }
}

/// Whether a path is within `max_length` characters
pub fn fits(path: &Path, max_length: usize) -> bool {
    path.to_string_lossy().chars().count() <= max_length
}

/// Path naming rules shared by expansion and execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNamer {
    policy: SanitizePolicy,
    max_path_length: usize,
    extension: String,
}

impl Default for PathNamer {
    fn default() -> Self {
        Self {
            policy: SanitizePolicy::default(),
            max_path_length: naming::DEFAULT_MAX_PATH_LENGTH,
            extension: naming::DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl PathNamer {
    /// Create a namer with explicit rules
    pub fn new(policy: SanitizePolicy, max_path_length: usize, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            policy,
            max_path_length,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn policy(&self) -> SanitizePolicy {
        self.policy
    }

    pub fn max_path_length(&self) -> usize {
        self.max_path_length
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Sanitize a title with this namer's policy
    pub fn sanitize(&self, raw: &str) -> String {
        sanitize(raw, self.policy)
    }

    /// Directory holding a lesson's videos; blank names add no level
    pub fn lesson_dir(&self, root: &Path, course_name: &str, lesson_name: &str) -> PathBuf {
        let mut dir = root.to_path_buf();
        for segment in [self.sanitize(course_name), self.sanitize(lesson_name)] {
            if !segment.is_empty() {
                dir.push(segment);
            }
        }
        dir
    }

    /// Full destination for the video at 1-based `index`, already truncated
    ///
    /// The `Video {index} - ` prefix and one title character are never cut,
    /// so distinct positions in a lesson keep distinct file names. A path
    /// that cannot keep them stays over the limit and fails [`Self::check`].
    pub fn video_path(&self, lesson_dir: &Path, index: usize, title: &str) -> PathBuf {
        let segment = self.sanitize(title);
        let composed = compose(lesson_dir, index, &segment, &self.extension);
        let keep = video_prefix(index).chars().count() + segment.chars().count().min(1);
        truncate_keeping(&composed, self.max_path_length, keep)
    }

    /// Fail when a path is still over the limit after truncation
    pub fn check(&self, path: &Path) -> Result<(), PathError> {
        if fits(path, self.max_path_length) {
            Ok(())
        } else {
            Err(PathError::TooLong {
                path: path.to_path_buf(),
                max_length: self.max_path_length,
            })
        }
    }
}
