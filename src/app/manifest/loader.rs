//! Manifest file loading
//!
//! Reads UTF-8 JSON manifests from a file or a directory of files. Any file
//! that fails to read or parse fails the whole load; nothing is downloaded
//! from a partially understood manifest.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use super::types::{LoadedManifest, ManifestLayout};
use crate::app::models::{Course, Lesson};
use crate::constants::files::MANIFEST_EXTENSION;
use crate::errors::{ManifestError, ManifestResult};

/// Load every course from a manifest file or directory
pub async fn load_manifest(path: &Path) -> ManifestResult<LoadedManifest> {
    let metadata = fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ManifestError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ManifestError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let files = if metadata.is_dir() {
        let files = manifest_files_in(path).await?;
        if files.is_empty() {
            return Err(ManifestError::EmptyDirectory {
                path: path.to_path_buf(),
            });
        }
        info!("Found {} manifest files in {}", files.len(), path.display());
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut loaded = LoadedManifest::default();
    for file in files {
        let (courses, layout) = load_manifest_file(&file).await?;
        debug!(
            "Loaded {} course(s) from {} ({})",
            courses.len(),
            file.display(),
            layout
        );
        loaded.stats.files_loaded += 1;
        loaded.stats.add_courses(&courses);
        loaded.sources.push((file, layout));
        loaded.courses.extend(courses);
    }

    Ok(loaded)
}

/// `*.json` files directly inside `dir`, sorted by file name
async fn manifest_files_in(dir: &Path) -> ManifestResult<Vec<PathBuf>> {
    let io_err = |source| ManifestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(io_err)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        let is_manifest = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(MANIFEST_EXTENSION))
            .unwrap_or(false);
        if is_manifest && entry.file_type().await.map_err(io_err)?.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Read and parse a single manifest file
pub async fn load_manifest_file(path: &Path) -> ManifestResult<(Vec<Course>, ManifestLayout)> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_manifest(&text, path)
}

/// Parse manifest JSON, detecting which supported layout it uses
///
/// `origin` is only used in error messages.
pub fn parse_manifest(text: &str, origin: &Path) -> ManifestResult<(Vec<Course>, ManifestLayout)> {
    let json_err = |source| ManifestError::JsonParse {
        path: origin.to_path_buf(),
        source,
    };
    let value: Value = serde_json::from_str(text).map_err(json_err)?;

    match detect_layout(&value) {
        Some(ManifestLayout::Course) => {
            let course: Course = from_value(value, origin)?;
            Ok((vec![course], ManifestLayout::Course))
        }
        Some(ManifestLayout::CourseList) => {
            let courses: Vec<Course> = from_value(value, origin)?;
            Ok((courses, ManifestLayout::CourseList))
        }
        Some(ManifestLayout::LessonList) => {
            let lessons: Vec<Lesson> = from_value(value, origin)?;
            let course = Course {
                name: String::new(),
                lessons,
            };
            Ok((vec![course], ManifestLayout::LessonList))
        }
        None => Err(ManifestError::InvalidLayout {
            path: origin.to_path_buf(),
            reason: "expected a course object, an array of courses or an array of lessons"
                .to_string(),
        }),
    }
}

fn is_course(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.contains_key("aulas") || obj.contains_key("lessons"))
        .unwrap_or(false)
}

fn is_lesson(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.contains_key("videos"))
        .unwrap_or(false)
}

fn detect_layout(value: &Value) -> Option<ManifestLayout> {
    match value {
        Value::Object(_) if is_course(value) => Some(ManifestLayout::Course),
        Value::Array(items) => match items.first() {
            None => Some(ManifestLayout::CourseList),
            Some(first) if is_course(first) => Some(ManifestLayout::CourseList),
            Some(first) if is_lesson(first) => Some(ManifestLayout::LessonList),
            Some(_) => None,
        },
        _ => None,
    }
}

fn from_value<T: DeserializeOwned>(value: Value, origin: &Path) -> ManifestResult<T> {
    serde_json::from_value(value).map_err(|source| ManifestError::JsonParse {
        path: origin.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const COURSE: &str = r#"{
        "nome": "Curso A",
        "aulas": [
            {"nome": "Aula 1", "videos": [
                {"titulo": "Intro", "resolucoes": {"720p": "http://v/1", "360p": "http://v/1s"}},
                {"titulo": "Setup", "resolucoes": {"480p": "http://v/2"}}
            ]}
        ]
    }"#;

    #[test]
    fn test_parse_single_course() {
        let (courses, layout) = parse_manifest(COURSE, Path::new("a.json")).unwrap();
        assert_eq!(layout, ManifestLayout::Course);
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].name, "Curso A");
        assert_eq!(courses[0].lessons[0].videos.len(), 2);
    }

    #[test]
    fn test_parse_course_list() {
        let text = format!("[{}, {}]", COURSE, COURSE.replace("Curso A", "Curso B"));
        let (courses, layout) = parse_manifest(&text, Path::new("a.json")).unwrap();
        assert_eq!(layout, ManifestLayout::CourseList);
        assert_eq!(courses[1].name, "Curso B");
    }

    #[test]
    fn test_parse_legacy_lesson_list() {
        let text = r#"[{"nome": "Aula 1", "videos": [
            {"titulo": "Intro", "resolucoes": {"720p": "http://v/1"}}]}]"#;
        let (courses, layout) = parse_manifest(text, Path::new("lessons.json")).unwrap();
        assert_eq!(layout, ManifestLayout::LessonList);
        assert_eq!(courses.len(), 1);
        assert!(courses[0].name.is_empty());
        assert_eq!(courses[0].lessons[0].name, "Aula 1");
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let err = parse_manifest("{\"nome\": ", Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, ManifestError::JsonParse { .. }));
    }

    #[test]
    fn test_unknown_layout_is_fatal() {
        let err = parse_manifest(r#"{"foo": 1}"#, Path::new("x.json")).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidLayout { .. }));

        let err = parse_manifest(r#"[1, 2]"#, Path::new("x.json")).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidLayout { .. }));
    }

    #[test]
    fn test_wrong_field_types_are_fatal() {
        let text = r#"{"nome": "C", "aulas": [{"nome": "A", "videos": "oops"}]}"#;
        let err = parse_manifest(text, Path::new("x.json")).unwrap_err();
        assert!(matches!(err, ManifestError::JsonParse { .. }));
    }

    #[tokio::test]
    async fn test_load_missing_path() {
        let dir = TempDir::new().unwrap();
        let err = load_manifest(&dir.path().join("missing.json")).await.unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_directory_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.json"), COURSE.replace("Curso A", "B"))
            .await
            .unwrap();
        fs::write(dir.path().join("a.json"), COURSE).await.unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").await.unwrap();

        let loaded = load_manifest(dir.path()).await.unwrap();
        let names: Vec<_> = loaded.courses.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Curso A", "B"]);
        assert_eq!(loaded.stats.files_loaded, 2);
        assert_eq!(loaded.stats.courses, 2);
        assert_eq!(loaded.stats.lessons, 2);
        assert_eq!(loaded.stats.videos, 4);
    }

    #[tokio::test]
    async fn test_load_directory_with_bad_file_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.json"), COURSE).await.unwrap();
        fs::write(dir.path().join("b.json"), "not json").await.unwrap();

        let err = load_manifest(dir.path()).await.unwrap_err();
        assert!(matches!(err, ManifestError::JsonParse { .. }));
    }

    #[tokio::test]
    async fn test_load_empty_directory() {
        let dir = TempDir::new().unwrap();
        let err = load_manifest(dir.path()).await.unwrap_err();
        assert!(matches!(err, ManifestError::EmptyDirectory { .. }));
    }
}
