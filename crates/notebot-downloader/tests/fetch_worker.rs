// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FetchWorker against a wiremock file host.

use std::time::Duration;

use notebot_core::{ClaimRequest, DownloadTask, WorkStore};
use notebot_test_utils::TestHarness;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn harness_for(server: &MockServer) -> TestHarness {
    TestHarness::builder()
        .with_file_base_url(server.uri())
        .build()
        .await
        .unwrap()
}

async fn wait_for_task(
    harness: &TestHarness,
    task_id: i64,
    done: impl Fn(&DownloadTask) -> bool,
) -> DownloadTask {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let task = harness
            .store()
            .get_download_task(task_id)
            .await
            .unwrap()
            .expect("task exists");
        if done(&task) {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {task_id} never reached the expected state: {task:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn completed_download_records_path_and_content_type() {
    let server = MockServer::start().await;
    let body = b"%PDF-1.7 fake".to_vec();
    Mock::given(method("GET"))
        .and(path("/documents/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), "application/pdf"))
        .mount(&server)
        .await;

    let harness = harness_for(&server).await;
    let task_id = harness
        .store()
        .enqueue_download("documents/report.pdf", Some(body.len() as i64))
        .await
        .unwrap();

    let worker = harness.fetch_worker().unwrap();
    let cancel = CancellationToken::new();
    let running = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    let task = wait_for_task(&harness, task_id, |t| t.completed).await;
    cancel.cancel();
    running.await.unwrap().unwrap();

    assert_eq!(task.mime_type.as_deref(), Some("application/pdf"));
    assert!(task.last_error.is_none());
    let local = task.local_path.expect("local path recorded");
    assert!(local.starts_with(&*harness.download_dir().to_string_lossy()));
    assert_eq!(tokio::fs::read(&local).await.unwrap(), body);
    assert!(!std::path::Path::new(&format!("{local}.part")).exists());
}

#[tokio::test]
async fn jpeg_extension_overrides_generic_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photos/file_1.jpg"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0xFF, 0xD8, 0xFF], "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let harness = harness_for(&server).await;
    let task_id = harness
        .store()
        .enqueue_download("photos/file_1.jpg", None)
        .await
        .unwrap();

    let worker = harness.fetch_worker().unwrap();
    let cancel = CancellationToken::new();
    let running = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    let task = wait_for_task(&harness, task_id, |t| t.completed).await;
    cancel.cancel();
    running.await.unwrap().unwrap();

    assert_eq!(task.mime_type.as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn non_success_response_marks_the_task_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voice/file_9.oga"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness_for(&server).await;
    let task_id = harness
        .store()
        .enqueue_download("voice/file_9.oga", None)
        .await
        .unwrap();

    let worker = harness.fetch_worker().unwrap();
    let cancel = CancellationToken::new();
    let running = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    let task = wait_for_task(&harness, task_id, |t| t.last_error.is_some()).await;
    // Give the worker a few more polls to prove the task is not fetched again.
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    running.await.unwrap().unwrap();

    assert!(!task.completed);
    let error = task.last_error.unwrap();
    assert!(error.contains("Response: 404, Not Found"), "{error}");
    assert!(error.contains("/voice/file_9.oga"), "{error}");

    let reclaimed = harness
        .store()
        .claim_download_tasks(&ClaimRequest {
            token: "other".into(),
            limit: None,
            stale_after: Duration::ZERO,
        })
        .await
        .unwrap();
    assert!(reclaimed.is_empty());
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/clip.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(vec![1u8; 2048], "video/mp4")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let harness = harness_for(&server).await;
    let task_id = harness
        .store()
        .enqueue_download("videos/clip.mp4", Some(2048))
        .await
        .unwrap();

    let worker = harness.fetch_worker().unwrap();
    let cancel = CancellationToken::new();
    let running = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    wait_for_task(&harness, task_id, |t| t.claimed_at.is_some()).await;
    cancel.cancel();
    running.await.unwrap().unwrap();

    let task = harness
        .store()
        .get_download_task(task_id)
        .await
        .unwrap()
        .unwrap();
    assert!(task.completed, "in-flight fetch must finish before run returns");
    assert_eq!(task.mime_type.as_deref(), Some("video/mp4"));
}

#[tokio::test]
async fn file_is_discarded_when_its_task_vanishes_mid_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents/late.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF".to_vec(), "application/pdf")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let harness = harness_for(&server).await;
    let store = harness.store();
    let task_id = store.enqueue_download("documents/late.pdf", None).await.unwrap();

    let worker = harness.fetch_worker().unwrap();
    let cancel = CancellationToken::new();
    let running = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    wait_for_task(&harness, task_id, |t| t.claimed_at.is_some()).await;
    // The owning event failed and took its task with it.
    store.delete_download_task(task_id).await.unwrap();
    cancel.cancel();
    running.await.unwrap().unwrap();

    let mut entries = tokio::fs::read_dir(harness.download_dir()).await.unwrap();
    let mut left = Vec::new();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        left.push(entry.file_name());
    }
    assert!(left.is_empty(), "orphaned files left behind: {left:?}");
}
