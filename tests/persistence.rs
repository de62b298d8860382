//! Subscriptions surviving a restart through the file store.

mod common;

use common::*;
use std::sync::Arc;
use subcache::{FileStore, MetadataStore, ResumeState, StoreConfig, SubscriptionTracker};
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> Arc<FileStore> {
    Arc::new(
        FileStore::open(StoreConfig {
            path: dir.path().join("meta"),
            ..Default::default()
        })
        .unwrap(),
    )
}

fn session(dir: &TempDir, transport: Arc<RecordingTransport>) -> SubscriptionTracker {
    let tracker = tracker(open_store(dir), transport);
    tracker.start_resume().unwrap().join().unwrap();
    assert_eq!(tracker.resume_state(), ResumeState::Idle);
    tracker
}

#[test]
fn test_restart_resumes_by_importance() {
    let dir = TempDir::new().unwrap();

    {
        let tracker = session(&dir, RecordingTransport::new());
        for _ in 0..3 {
            tracker.acquire(&request("inbox"), None).unwrap();
        }
        tracker.acquire(&request("archive"), None).unwrap();
        assert!(tracker.sync_store(WAIT));
    }

    let transport = RecordingTransport::new();
    let tracker = session(&dir, transport.clone());

    // Older and more used wins.
    assert_eq!(transport.calls(), vec!["inbox", "archive"]);

    let inbox = tracker
        .tracked(&request("inbox").signature().unwrap())
        .unwrap();
    assert_eq!(inbox.count, 3);
    assert!(inbox.updated_at >= inbox.created_at);
}

#[test]
fn test_counts_accumulate_across_restarts() {
    let dir = TempDir::new().unwrap();

    for _ in 0..3 {
        let tracker = session(&dir, RecordingTransport::new());
        tracker.acquire(&request("posts"), None).unwrap();
        assert!(tracker.sync_store(WAIT));
    }

    let tracker = session(&dir, RecordingTransport::new());
    let posts = tracker
        .tracked(&request("posts").signature().unwrap())
        .unwrap();
    assert_eq!(posts.count, 3);
}

#[test]
fn test_parameters_survive_restart() {
    let dir = TempDir::new().unwrap();
    let req = request("comments")
        .param(&serde_json::json!({"post": "abc", "limit": 20}))
        .unwrap()
        .param(&true)
        .unwrap();

    {
        let tracker = session(&dir, RecordingTransport::new());
        tracker.acquire(&req, None).unwrap();
        assert!(tracker.sync_store(WAIT));
    }

    let tracker = session(&dir, RecordingTransport::new());
    let sig = req.signature().unwrap();
    assert!(tracker.is_live(&sig));
    assert_eq!(sig.to_request().unwrap(), req);
}

#[test]
fn test_acquire_before_resume_is_flushed_at_idle() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let tracker = tracker(store.clone(), RecordingTransport::new());

    tracker.acquire(&request("early"), None).unwrap();
    assert!(tracker.sync_store(WAIT));
    assert!(store.get_all().unwrap().is_empty());

    tracker.start_resume().unwrap().join().unwrap();

    let all = store.get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[&key("early")].count, 1);
}
