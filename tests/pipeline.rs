//! End-to-end tests for the download pipeline
//!
//! Manifest loading, task expansion, validity probing and the coordinator
//! run together against a local wiremock server.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use course_fetcher::app::client::partial_path;
use course_fetcher::app::worker::INTERRUPTED_REASON;
use course_fetcher::app::{
    load_manifest, Coordinator, CoordinatorConfig, FetchClient, PathNamer, TaskExpander,
    ValidityChecker,
};
use course_fetcher::errors::ManifestError;

use common::*;

/// Test a completed course is skipped entirely on the next run
#[tokio::test]
async fn test_rerun_after_full_download_transfers_nothing() {
    let server = MockServer::start().await;
    mount_videos(&server, 6).await;

    let dir = TempDir::new().unwrap();
    let root = dir.path().join("aulas");
    let manifest = course_manifest(&server.uri(), "Curso de Rust", 2, 3);
    let manifest_path = write_manifest(dir.path(), "curso.json", &manifest).await;

    let first = coordinator(5).run(plan(&manifest_path, &root).await, 5).await;
    assert_eq!(first.downloaded, 6);
    assert!(first.is_complete());
    let requests_after_first = server.received_requests().await.unwrap().len();
    assert_eq!(requests_after_first, 6);

    let tree = file_tree(&root);
    assert_eq!(tree.len(), 6);
    assert!(tree.contains_key(&PathBuf::from(
        "Curso de Rust/Aula 1/Video 1 - Parte 1 tópico 1.mp4"
    )));
    assert!(tree.contains_key(&PathBuf::from(
        "Curso de Rust/Aula 2/Video 3 - Parte 3 tópico 6.mp4"
    )));

    let second = coordinator(5).run(plan(&manifest_path, &root).await, 5).await;
    assert_eq!(second.skipped, 6);
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.total_bytes, 0);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first
    );
    assert_eq!(file_tree(&root), tree);
}

/// Test empty and truncated files are detected and replaced
#[tokio::test]
async fn test_broken_files_are_downloaded_again() {
    let server = MockServer::start().await;
    mount_videos(&server, 3).await;

    let dir = TempDir::new().unwrap();
    let root = dir.path().join("aulas");
    let manifest = course_manifest(&server.uri(), "Curso", 1, 3);
    let manifest_path = write_manifest(dir.path(), "curso.json", &manifest).await;
    let tasks = plan(&manifest_path, &root).await;

    tokio::fs::create_dir_all(tasks[0].destination.parent().unwrap())
        .await
        .unwrap();
    // Zero-byte leftover
    tokio::fs::write(&tasks[0].destination, b"").await.unwrap();
    // Cut off inside the sample data
    let body = video_body(2);
    tokio::fs::write(&tasks[1].destination, &body[..body.len() - 100])
        .await
        .unwrap();
    // Complete file
    tokio::fs::write(&tasks[2].destination, video_body(3))
        .await
        .unwrap();

    let summary = coordinator(2).run(tasks.clone(), 2).await;
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);

    for (n, task) in tasks.iter().enumerate() {
        assert_eq!(
            tokio::fs::read(&task.destination).await.unwrap(),
            video_body(n + 1)
        );
    }
}

/// Serves a response that promises more bytes than it sends, then hangs up
async fn truncating_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\r\nftyp-partial")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}", addr)
}

/// Test a connection dropped mid-transfer leaves nothing at the destination
#[tokio::test]
async fn test_dropped_connection_leaves_no_file() {
    let base = truncating_server().await;

    let dir = TempDir::new().unwrap();
    let root = dir.path().join("aulas");
    let manifest = course_manifest(&base, "Curso", 1, 1);
    let manifest_path = write_manifest(dir.path(), "curso.json", &manifest).await;
    let tasks = plan(&manifest_path, &root).await;

    let summary = coordinator(1).run(tasks.clone(), 1).await;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.downloaded, 0);
    assert!(!tasks[0].destination.exists());
    assert!(!partial_path(&tasks[0].destination).exists());
}

/// Test pool sizes 1 and 5 produce the same files and counts
#[tokio::test]
async fn test_pool_size_does_not_change_results() {
    let server = MockServer::start().await;
    mount_videos(&server, 20).await;

    let manifest = course_manifest(&server.uri(), "Curso", 4, 5);

    let mut results = Vec::new();
    for pool in [1, 5] {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("aulas");
        let manifest_path = write_manifest(dir.path(), "curso.json", &manifest).await;
        let tasks = plan(&manifest_path, &root).await;
        assert_eq!(tasks.len(), 20);

        let summary = coordinator(pool).run(tasks, pool).await;
        results.push((
            summary.downloaded,
            summary.skipped,
            summary.failed,
            summary.total_bytes,
            file_tree(&root),
        ));
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].0, 20);
    assert_eq!(results[0].4.len(), 20);
}

/// Test entries without a usable URL are dropped while the rest download
#[tokio::test]
async fn test_unresolvable_entries_do_not_stop_the_run() {
    let server = MockServer::start().await;
    mount_videos(&server, 1).await;

    let dir = TempDir::new().unwrap();
    let root = dir.path().join("aulas");
    let manifest = serde_json::json!({
        "nome": "Curso",
        "aulas": [{
            "nome": "Aula 1",
            "videos": [
                { "titulo": "Sem links", "resolucoes": { "720p": "", "480p": "" } },
                { "titulo": "Com link", "resolucoes": { "720p": format!("{}/v/1.mp4", server.uri()) } }
            ]
        }]
    });
    let manifest_path = write_manifest(dir.path(), "curso.json", &manifest).await;

    let tasks = plan(&manifest_path, &root).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].index, 2);

    let summary = coordinator(5).run(tasks.clone(), 5).await;
    assert_eq!(summary.downloaded, 1);
    assert!(tasks[0]
        .destination
        .ends_with("Curso/Aula 1/Video 2 - Com link.mp4"));
}

/// Test a directory of manifests is loaded in name order
#[tokio::test]
async fn test_manifest_directory_runs_every_course() {
    let server = MockServer::start().await;
    mount_videos(&server, 2).await;

    let dir = TempDir::new().unwrap();
    let manifests = dir.path().join("cursos");
    tokio::fs::create_dir_all(&manifests).await.unwrap();
    write_manifest(
        &manifests,
        "b.json",
        &course_manifest(&server.uri(), "Segundo", 1, 2),
    )
    .await;
    write_manifest(
        &manifests,
        "a.json",
        &course_manifest(&server.uri(), "Primeiro", 1, 1),
    )
    .await;

    let root = dir.path().join("aulas");
    let tasks = plan(&manifests, &root).await;
    assert_eq!(tasks.len(), 3);
    assert!(tasks[0].destination.starts_with(root.join("Primeiro")));
    assert_eq!(
        tasks.iter().map(|t| t.sequence).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let summary = coordinator(3).run(tasks, 3).await;
    assert_eq!(summary.downloaded, 3);
}

/// Test a course listed in two manifest files is downloaded once
#[tokio::test]
async fn test_repeated_course_in_directory_downloads_once() {
    let server = MockServer::start().await;
    mount_videos(&server, 2).await;

    let dir = TempDir::new().unwrap();
    let manifests = dir.path().join("cursos");
    tokio::fs::create_dir_all(&manifests).await.unwrap();
    let manifest = course_manifest(&server.uri(), "Curso", 1, 2);
    write_manifest(&manifests, "a.json", &manifest).await;
    write_manifest(&manifests, "b.json", &manifest).await;

    let root = dir.path().join("aulas");
    let loaded = load_manifest(&manifests).await.unwrap();
    assert_eq!(loaded.courses.len(), 2);
    let report = TaskExpander::new(&root, vec!["720p".to_string()], PathNamer::default())
        .expand_all(&loaded.courses);
    assert_eq!(report.tasks.len(), 2);
    assert_eq!(report.duplicates.len(), 2);

    let summary = coordinator(5).run(report.tasks, 5).await;
    assert_eq!(summary.downloaded, 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert_eq!(file_tree(&root).len(), 2);
}

/// Test a malformed manifest fails before anything is written
#[tokio::test]
async fn test_malformed_manifest_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("curso.json");
    tokio::fs::write(&path, b"{ \"nome\": \"Curso\", \"aulas\": [ ")
        .await
        .unwrap();

    let result = load_manifest(&path).await;
    assert!(matches!(result, Err(ManifestError::JsonParse { .. })));
}

/// Test a deadline stops the run and leaves unclaimed tasks untouched
#[tokio::test]
async fn test_deadline_leaves_partial_run_resumable() {
    let server = MockServer::start().await;
    mount_videos(&server, 1).await;
    // Everything else stalls well past the deadline
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(video_body(99))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let root = dir.path().join("aulas");
    let manifest = course_manifest(&server.uri(), "Curso", 1, 4);
    let manifest_path = write_manifest(dir.path(), "curso.json", &manifest).await;
    let tasks = plan(&manifest_path, &root).await;

    let config = CoordinatorConfig::default()
        .with_signal_handling(false)
        .with_deadline(Some(Duration::from_millis(500)))
        .with_worker_config(fast_worker_config());
    let coordinator = Coordinator::new(
        config,
        Arc::new(FetchClient::new().unwrap()),
        ValidityChecker::default(),
    )
    .unwrap();

    let summary = coordinator.run(tasks.clone(), 1).await;
    assert!(summary.interrupted);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.not_started, 2);
    assert!(tasks[0].destination.exists());
    for task in &tasks[1..] {
        assert!(!task.destination.exists());
        assert!(!partial_path(&task.destination).exists());
    }
    assert_eq!(summary.failures[0].reason, INTERRUPTED_REASON);
}
