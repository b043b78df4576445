//! End-to-end tests for the synchronization engine.
//!
//! Each test arranges a real file in a temp directory, drives the engine
//! through its public handle, and asserts on observable state: snapshots,
//! debounced change events, and warnings.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

use docsync::{ChangeEvent, DocumentHandle, ReconcileWarning, SaveError, Settings};

/// Settings with short windows so the tests stay fast. Ratios mirror the
/// defaults: suppression outlasts debounce, failure window is shorter.
fn fast_settings() -> Arc<Settings> {
    let mut settings = Settings::default();
    settings.watcher.debounce_ms = 20;
    settings.save.suppression_ms = 150;
    settings.save.failed_suppression_ms = 50;
    settings.reconcile.retry_backoff_ms = 5;
    settings.render.idle_ms = 20;
    Arc::new(settings)
}

async fn next_change(rx: &mut broadcast::Receiver<ChangeEvent>) -> ChangeEvent {
    timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("change event should arrive")
        .expect("change channel open")
}

/// Atomic replace the way external editors do it: temp file, then rename.
fn replace_file(path: &std::path::Path, content: &str) {
    let temp = path.with_extension("tmp-external");
    fs::write(&temp, content).unwrap();
    fs::rename(&temp, path).unwrap();
}

#[tokio::test]
async fn save_round_trips_content_exactly() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("doc.md");
    fs::write(&file, "original").unwrap();

    let doc = DocumentHandle::open(&file, fast_settings()).await.unwrap();
    doc.edit("# Title\n\nbody with unicode: caf\u{e9}\n").await;
    doc.save().await.unwrap();

    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "# Title\n\nbody with unicode: caf\u{e9}\n"
    );

    // Reopening the path yields the saved content
    let reopened = DocumentHandle::open(&file, fast_settings()).await.unwrap();
    let snapshot = reopened.snapshot().await.unwrap();
    assert_eq!(snapshot.content, "# Title\n\nbody with unicode: caf\u{e9}\n");
    assert_eq!(snapshot.version, 0);
    assert!(!snapshot.dirty);
}

#[tokio::test]
async fn stale_notification_for_superseded_content_is_ignored() {
    // Scenario: open "A", edit to "AB" in memory, then a watcher signal
    // arrives for disk content still hashing to "A".
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("doc.md");
    fs::write(&file, "A").unwrap();

    let doc = DocumentHandle::open(&file, fast_settings()).await.unwrap();
    doc.edit("AB").await;

    // Rewrite the same bytes: fires the watcher, but the content hash
    // still matches the last known disk state.
    fs::write(&file, "A").unwrap();
    sleep(Duration::from_millis(400)).await;

    let snapshot = doc.snapshot().await.unwrap();
    assert_eq!(snapshot.content, "AB", "local edit must survive");
    assert_eq!(snapshot.version, 1, "no version bump from the stale signal");
}

#[tokio::test]
async fn external_replace_applies_after_suppression_expires() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("doc.md");
    fs::write(&file, "A").unwrap();

    let doc = DocumentHandle::open(&file, fast_settings()).await.unwrap();
    doc.save().await.unwrap();

    // Let the suppression window from our own save lapse
    sleep(Duration::from_millis(300)).await;

    let mut changes = doc.subscribe_changes();
    replace_file(&file, "A2");

    let event = next_change(&mut changes).await;
    assert_eq!(event.content, "A2");

    let snapshot = doc.snapshot().await.unwrap();
    assert_eq!(snapshot.content, "A2");
    assert!(snapshot.version >= 1, "accepted external apply bumps version");
    assert!(!snapshot.dirty, "applied external content is the disk content");
}

#[tokio::test]
async fn duplicate_notifications_apply_once() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("doc.md");
    fs::write(&file, "A").unwrap();

    let doc = DocumentHandle::open(&file, fast_settings()).await.unwrap();
    let mut changes = doc.subscribe_changes();

    replace_file(&file, "B");
    let first = next_change(&mut changes).await;
    assert_eq!(first.content, "B");

    // The same content keeps getting announced; each signal hashes to the
    // disk state already applied.
    for _ in 0..3 {
        sleep(Duration::from_millis(100)).await;
        fs::write(&file, "B").unwrap();
    }
    sleep(Duration::from_millis(400)).await;

    assert!(
        changes.try_recv().is_err(),
        "identical content must not re-apply"
    );
    let snapshot = doc.snapshot().await.unwrap();
    assert_eq!(snapshot.version, first.version, "exactly one apply");
}

#[tokio::test]
async fn own_save_echo_is_suppressed() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("doc.md");
    fs::write(&file, "A").unwrap();

    let doc = DocumentHandle::open(&file, fast_settings()).await.unwrap();
    let mut changes = doc.subscribe_changes();

    doc.edit("AB").await;
    doc.save().await.unwrap();

    // One change event for the edit itself, debounced
    let event = next_change(&mut changes).await;
    assert_eq!(event.version, 1);
    assert_eq!(event.content, "AB");

    // The watcher sees our own write; nothing further may happen
    sleep(Duration::from_millis(500)).await;
    assert!(changes.try_recv().is_err(), "save echo must not produce events");

    let snapshot = doc.snapshot().await.unwrap();
    assert_eq!(snapshot.version, 1, "no reload loop from our own write");
    assert!(!snapshot.dirty);
}

#[tokio::test]
async fn burst_of_edits_notifies_once_with_latest() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("doc.md");
    fs::write(&file, "").unwrap();

    let doc = DocumentHandle::open(&file, fast_settings()).await.unwrap();
    let mut changes = doc.subscribe_changes();

    for i in 1..=10 {
        doc.edit(format!("draft {i}")).await;
    }

    let event = next_change(&mut changes).await;
    assert_eq!(event.version, 10);
    assert_eq!(event.content, "draft 10");

    sleep(Duration::from_millis(200)).await;
    assert!(
        changes.try_recv().is_err(),
        "intermediate versions are superseded, not queued"
    );
}

#[tokio::test]
async fn removed_file_warns_and_preserves_buffer() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("doc.md");
    fs::write(&file, "precious").unwrap();

    let doc = DocumentHandle::open(&file, fast_settings()).await.unwrap();
    let mut warnings = doc.subscribe_warnings();

    doc.edit("precious unsaved").await;
    fs::remove_file(&file).unwrap();

    let warning = timeout(Duration::from_secs(3), warnings.recv())
        .await
        .expect("warning should arrive")
        .expect("warning channel open");
    assert!(matches!(warning, ReconcileWarning::FileRemoved { .. }));

    let snapshot = doc.snapshot().await.unwrap();
    assert_eq!(snapshot.content, "precious unsaved", "buffer must be kept");
    assert!(!snapshot.watching, "watching stops after removal");

    // The buffer can still be saved back out
    doc.save().await.unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), "precious unsaved");
}

#[tokio::test]
async fn local_edits_after_external_apply_win() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("doc.md");
    fs::write(&file, "A").unwrap();

    let doc = DocumentHandle::open(&file, fast_settings()).await.unwrap();
    let mut changes = doc.subscribe_changes();

    // Accepted external change
    replace_file(&file, "external");
    let applied = next_change(&mut changes).await;
    assert_eq!(applied.content, "external");

    // Local edits afterwards are the final word
    doc.edit("external plus me").await;
    let event = next_change(&mut changes).await;
    assert_eq!(event.content, "external plus me");

    sleep(Duration::from_millis(300)).await;
    let snapshot = doc.snapshot().await.unwrap();
    assert_eq!(
        snapshot.content, "external plus me",
        "no reload may overwrite a later local edit"
    );
}

#[tokio::test]
async fn operations_on_closed_session_are_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("doc.md");
    fs::write(&file, "A").unwrap();

    let doc = DocumentHandle::open(&file, fast_settings()).await.unwrap();
    doc.close().await;
    sleep(Duration::from_millis(50)).await;

    assert!(matches!(doc.save().await, Err(SaveError::SessionClosed)));
    assert!(doc.snapshot().await.is_none());
}

#[tokio::test]
async fn documents_are_independent() {
    let dir = tempfile::TempDir::new().unwrap();
    let file_a = dir.path().join("a.md");
    let file_b = dir.path().join("b.md");
    fs::write(&file_a, "contents of a").unwrap();
    fs::write(&file_b, "contents of b").unwrap();

    let doc_a = DocumentHandle::open(&file_a, fast_settings()).await.unwrap();
    let doc_b = DocumentHandle::open(&file_b, fast_settings()).await.unwrap();

    doc_a.edit("a edited").await;
    doc_a.save().await.unwrap();
    doc_a.close().await;

    // Closing and saving one document leaves the other untouched
    let snapshot_b = doc_b.snapshot().await.unwrap();
    assert_eq!(snapshot_b.content, "contents of b");
    assert_eq!(snapshot_b.version, 0);
    assert_eq!(fs::read_to_string(&file_b).unwrap(), "contents of b");
}
