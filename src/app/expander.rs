//! Manifest to task expansion
//!
//! Turns the read-only course tree into the ordered list of download tasks.
//! Expansion is pure: it builds path strings but never touches the disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::app::models::{Course, DownloadTask, Resolutions};
use crate::app::naming::PathNamer;

/// A video entry dropped because no resolution had a usable URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedEntry {
    pub course: String,
    pub lesson: String,
    pub title: String,
    /// 1-based position within the lesson
    pub index: usize,
    /// Labels present in the manifest, possibly all with empty URLs
    pub available: Vec<String>,
}

/// A video entry dropped because an earlier task already writes its path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateEntry {
    pub course: String,
    pub lesson: String,
    pub title: String,
    /// 1-based position within the lesson
    pub index: usize,
    /// Destination shared with the earlier task
    pub destination: PathBuf,
}

/// Tasks produced by expansion plus the entries that were dropped
#[derive(Debug, Clone, Default)]
pub struct ExpansionReport {
    pub tasks: Vec<DownloadTask>,
    pub unresolved: Vec<UnresolvedEntry>,
    pub duplicates: Vec<DuplicateEntry>,
}

impl ExpansionReport {
    /// Number of video entries seen, including dropped ones
    pub fn total_entries(&self) -> usize {
        self.tasks.len() + self.unresolved.len() + self.duplicates.len()
    }

    /// Number of entries that produced no task
    pub fn dropped(&self) -> usize {
        self.unresolved.len() + self.duplicates.len()
    }
}

/// Choose `(label, url)` for a video
///
/// The first preferred label with a non-empty URL wins; otherwise the
/// first-inserted entry with a non-empty URL; otherwise `None`.
pub fn select_resolution<'a, S: AsRef<str>>(
    resolutions: &'a Resolutions,
    preferences: &[S],
) -> Option<(&'a str, &'a str)> {
    preferences
        .iter()
        .find_map(|label| {
            let label = label.as_ref();
            resolutions
                .usable()
                .find(|(candidate, _)| *candidate == label)
        })
        .or_else(|| resolutions.usable().next())
}

/// Builds download tasks for one or more courses
#[derive(Debug, Clone)]
pub struct TaskExpander {
    root: PathBuf,
    preferences: Vec<String>,
    namer: PathNamer,
}

impl TaskExpander {
    pub fn new(root: impl Into<PathBuf>, preferences: Vec<String>, namer: PathNamer) -> Self {
        Self {
            root: root.into(),
            preferences,
            namer,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn preferences(&self) -> &[String] {
        &self.preferences
    }

    /// Expand a single course; sequence numbers start at 1
    pub fn expand(&self, course: &Course) -> ExpansionReport {
        self.expand_all(std::slice::from_ref(course))
    }

    /// Expand several courses in order with run-wide sequence numbers
    ///
    /// Every task gets a distinct destination; later entries that map onto
    /// an earlier task's path are reported in `duplicates`.
    pub fn expand_all(&self, courses: &[Course]) -> ExpansionReport {
        let mut report = ExpansionReport::default();
        let mut seen = HashSet::new();
        for course in courses {
            self.expand_into(course, &mut report, &mut seen);
        }
        report
    }

    fn expand_into(
        &self,
        course: &Course,
        report: &mut ExpansionReport,
        seen: &mut HashSet<PathBuf>,
    ) {
        for lesson in &course.lessons {
            let lesson_dir = self.namer.lesson_dir(&self.root, &course.name, &lesson.name);

            for (position, video) in lesson.videos.iter().enumerate() {
                let index = position + 1;
                let Some((label, url)) = select_resolution(&video.resolutions, &self.preferences)
                else {
                    warn!(
                        "No usable resolution for '{}' (lesson '{}', video {}), skipping",
                        video.title, lesson.name, index
                    );
                    report.unresolved.push(UnresolvedEntry {
                        course: course.name.clone(),
                        lesson: lesson.name.clone(),
                        title: video.title.clone(),
                        index,
                        available: video.resolutions.labels().map(str::to_string).collect(),
                    });
                    continue;
                };

                let destination = self.namer.video_path(&lesson_dir, index, &video.title);
                if !seen.insert(destination.clone()) {
                    warn!(
                        "'{}' (lesson '{}', video {}) maps to {} which another video already uses, skipping",
                        video.title,
                        lesson.name,
                        index,
                        destination.display()
                    );
                    report.duplicates.push(DuplicateEntry {
                        course: course.name.clone(),
                        lesson: lesson.name.clone(),
                        title: video.title.clone(),
                        index,
                        destination,
                    });
                    continue;
                }

                report.tasks.push(DownloadTask {
                    destination,
                    url: url.to_string(),
                    resolution: label.to_string(),
                    title: video.title.clone(),
                    index,
                    sequence: report.tasks.len() + 1,
                });
            }
        }
    }
}

/// Expand one course with the default naming rules
pub fn expand<S: AsRef<str>>(course: &Course, root: &Path, preferences: &[S]) -> Vec<DownloadTask> {
    let preferences = preferences.iter().map(|p| p.as_ref().to_string()).collect();
    TaskExpander::new(root, preferences, PathNamer::default())
        .expand(course)
        .tasks
}
