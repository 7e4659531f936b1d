//! Core types for manifest loading
//!
//! Statistics and layout information gathered while reading manifest files.

use std::fmt;
use std::path::PathBuf;

use crate::app::models::Course;

/// Shape of the JSON found in one manifest file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestLayout {
    /// A single course object
    Course,
    /// An array of course objects
    CourseList,
    /// A bare array of lessons, read as one unnamed course
    LessonList,
}

impl fmt::Display for ManifestLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManifestLayout::Course => "course",
            ManifestLayout::CourseList => "course list",
            ManifestLayout::LessonList => "lesson list",
        };
        f.write_str(name)
    }
}

/// Statistics about manifest loading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestStats {
    /// Manifest files read
    pub files_loaded: usize,
    /// Courses found
    pub courses: usize,
    /// Lessons found
    pub lessons: usize,
    /// Video entries found
    pub videos: usize,
}

impl ManifestStats {
    /// Count the contents of newly loaded courses
    pub fn add_courses(&mut self, courses: &[Course]) {
        self.courses += courses.len();
        for course in courses {
            self.lessons += course.lessons.len();
            self.videos += course
                .lessons
                .iter()
                .map(|lesson| lesson.videos.len())
                .sum::<usize>();
        }
    }
}

/// Every course read from a manifest path, in load order
#[derive(Debug, Clone, Default)]
pub struct LoadedManifest {
    pub courses: Vec<Course>,
    /// Files that were read, with the layout detected in each
    pub sources: Vec<(PathBuf, ManifestLayout)>,
    pub stats: ManifestStats,
}
