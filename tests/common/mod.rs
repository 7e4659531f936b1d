//! Shared helpers for the integration tests
//!
//! Builds minimal but structurally valid MP4 files, course manifests that
//! point at a wiremock server, and coordinators tuned for fast tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use course_fetcher::app::{
    load_manifest, Coordinator, CoordinatorConfig, DownloadTask, FetchClient, PathNamer,
    ProbeMode, TaskExpander, ValidityChecker, WorkerConfig,
};

pub fn mp4_box(fourcc: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(fourcc);
    out.extend_from_slice(body);
    out
}

fn moov(sample_len: u32, offset: u32) -> Vec<u8> {
    let mut hdlr = vec![0u8; 8];
    hdlr.extend_from_slice(b"vide");
    hdlr.extend_from_slice(&[0u8; 13]);

    let mut stsz = vec![0u8; 4];
    stsz.extend_from_slice(&0u32.to_be_bytes());
    stsz.extend_from_slice(&1u32.to_be_bytes());
    stsz.extend_from_slice(&sample_len.to_be_bytes());

    let mut stco = vec![0u8; 4];
    stco.extend_from_slice(&1u32.to_be_bytes());
    stco.extend_from_slice(&offset.to_be_bytes());

    let stbl = mp4_box(b"stbl", &[mp4_box(b"stsz", &stsz), mp4_box(b"stco", &stco)].concat());
    let minf = mp4_box(b"minf", &stbl);
    let mdia = mp4_box(b"mdia", &[mp4_box(b"hdlr", &hdlr), minf].concat());
    mp4_box(b"moov", &mp4_box(b"trak", &mdia))
}

/// A playable-looking MP4 whose only video sample is `sample`
pub fn mp4_file(sample: &[u8]) -> Vec<u8> {
    let ftyp = mp4_box(b"ftyp", b"isom\0\0\x02\0isomiso2");
    let moov_len = moov(sample.len() as u32, 0).len();
    let offset = (ftyp.len() + moov_len + 8) as u32;
    [ftyp, moov(sample.len() as u32, offset), mp4_box(b"mdat", sample)].concat()
}

/// Distinct video body for the `n`th file
pub fn video_body(n: usize) -> Vec<u8> {
    let mut sample = b"\x00\x00\x01\x65".to_vec();
    sample.extend(format!("frame-data-{:04}", n).into_bytes());
    sample.extend(std::iter::repeat(n as u8 | 1).take(256));
    mp4_file(&sample)
}

/// One course with `lessons` lessons of `per_lesson` videos each
///
/// Video `n` (1-based across the course) is served from `/v/{n}.mp4`.
pub fn course_manifest(base: &str, name: &str, lessons: usize, per_lesson: usize) -> serde_json::Value {
    let mut n = 0;
    let aulas: Vec<_> = (1..=lessons)
        .map(|lesson| {
            let videos: Vec<_> = (1..=per_lesson)
                .map(|video| {
                    n += 1;
                    json!({
                        "titulo": format!("Parte {}: tópico {}", video, n),
                        "resolucoes": {
                            "1080p": "",
                            "720p": format!("{}/v/{}.mp4", base, n),
                            "360p": format!("{}/low/{}.mp4", base, n),
                        }
                    })
                })
                .collect();
            json!({ "nome": format!("Aula {}", lesson), "videos": videos })
        })
        .collect();
    json!({ "nome": name, "aulas": aulas })
}

pub async fn write_manifest(dir: &Path, file_name: &str, manifest: &serde_json::Value) -> PathBuf {
    let path = dir.join(file_name);
    tokio::fs::write(&path, serde_json::to_vec_pretty(manifest).unwrap())
        .await
        .unwrap();
    path
}

/// Serve `video_body(n)` at `/v/{n}.mp4` for `1..=count`
pub async fn mount_videos(server: &MockServer, count: usize) {
    for n in 1..=count {
        Mock::given(method("GET"))
            .and(path(format!("/v/{}.mp4", n)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(video_body(n)))
            .mount(server)
            .await;
    }
}

/// Load a manifest and expand it with the default naming rules
pub async fn plan(manifest: &Path, root: &Path) -> Vec<DownloadTask> {
    let loaded = load_manifest(manifest).await.unwrap();
    TaskExpander::new(root, vec!["720p".to_string()], PathNamer::default())
        .expand_all(&loaded.courses)
        .tasks
}

pub fn fast_worker_config() -> WorkerConfig {
    WorkerConfig::default()
        .with_max_retries(1)
        .with_retry_delays(Duration::from_millis(1), Duration::from_millis(10))
        .with_download_timeout(Duration::from_secs(20))
}

pub fn coordinator(workers: usize) -> Coordinator {
    coordinator_with(workers, fast_worker_config())
}

pub fn coordinator_with(workers: usize, worker_config: WorkerConfig) -> Coordinator {
    let config = CoordinatorConfig::default()
        .with_worker_count(workers)
        .with_signal_handling(false)
        .with_worker_config(worker_config);
    Coordinator::new(
        config,
        Arc::new(FetchClient::new().unwrap()),
        ValidityChecker::new(ProbeMode::Container),
    )
    .unwrap()
}

/// Every file under `root`, keyed by relative path
pub fn file_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(relative, std::fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}
