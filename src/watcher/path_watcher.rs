//! Debounced single-path watcher over the platform notification primitive.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep_until};

use crate::config::WatcherConfig;

use super::WatchError;

/// One debounced "the file changed" notification.
///
/// Tagged with the generation it was recorded under; consumers drop
/// signals whose generation no longer matches the handle's.
#[derive(Debug, Clone, Copy)]
pub struct ChangeSignal {
    pub generation: u64,
}

/// Watches one path and delivers debounced change signals.
pub struct PathWatcher;

impl PathWatcher {
    /// Start watching `path`, delivering debounced signals on `signals`.
    ///
    /// The watch is armed on the parent directory (non-recursive) with
    /// events filtered to the target file. This survives the rename-based
    /// atomic replace most editors perform: the path keeps its identity
    /// even though the inode behind it changes.
    pub fn start(
        path: &Path,
        config: &WatcherConfig,
        signals: mpsc::Sender<ChangeSignal>,
    ) -> Result<WatchHandle, WatchError> {
        let file_name = path.file_name().ok_or_else(|| WatchError::PathUnavailable {
            path: path.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // Canonicalize so raw event paths compare equal to the target.
        let watch_dir = parent
            .canonicalize()
            .map_err(|e| WatchError::PathUnavailable {
                path: path.to_path_buf(),
                reason: format!("cannot resolve parent directory: {e}"),
            })?;
        let target = watch_dir.join(file_name);

        let (raw_tx, raw_rx) = mpsc::channel(config.channel_capacity);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = raw_tx.blocking_send(res);
        })
        .map_err(|e| WatchError::from_notify(path, e))?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::from_notify(path, e))?;

        let generation = Arc::new(AtomicU64::new(0));
        let debounce = Duration::from_millis(config.debounce_ms);

        let task = tokio::spawn(debounce_loop(
            raw_rx,
            target.clone(),
            debounce,
            generation.clone(),
            signals,
        ));

        crate::debug_event!("watcher", "started", "{}", target.display());

        Ok(WatchHandle {
            path: target,
            generation,
            _watcher: watcher,
            task,
        })
    }
}

/// Live watch on one path.
///
/// Holds the OS watch descriptor alive; dropping the handle (or calling
/// [`WatchHandle::stop`]) ends delivery.
pub struct WatchHandle {
    path: PathBuf,
    /// Bumped whenever the watched path is replaced and the watch re-arms.
    /// Signals recorded under an older value are dropped.
    generation: Arc<AtomicU64>,
    /// Kept alive; dropping it stops raw event delivery.
    _watcher: notify::RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("path", &self.path)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl WatchHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current generation; signals carrying an older value are stale.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Stop watching. Idempotent.
    ///
    /// The generation is invalidated before teardown, so any signal still
    /// in flight is recognizably stale and dropped by its consumer.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.task.abort();
        crate::debug_event!("watcher", "stopped", "{}", self.path.display());
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Coalesce raw events for the target path into debounced signals.
///
/// A pending signal captures the generation current at the latest raw
/// event; if the generation moved on before the quiet period elapsed
/// (re-arm or stop), the signal is dropped silently.
async fn debounce_loop(
    mut raw_rx: mpsc::Receiver<notify::Result<Event>>,
    target: PathBuf,
    window: Duration,
    generation: Arc<AtomicU64>,
    signals: mpsc::Sender<ChangeSignal>,
) {
    let mut pending: Option<(Instant, u64)> = None;

    loop {
        let deadline = pending.map(|(d, _)| d);

        tokio::select! {
            maybe = raw_rx.recv() => {
                let Some(res) = maybe else { break };
                match res {
                    Ok(event) => {
                        if !event.paths.iter().any(|p| p == &target) {
                            continue;
                        }
                        let due = Instant::now() + window;
                        match event.kind {
                            // The path was replaced (unlink, create, or a
                            // rename landing on it): re-arm against the new
                            // inode by bumping the generation, then record
                            // the change under the new one.
                            EventKind::Create(_)
                            | EventKind::Remove(_)
                            | EventKind::Modify(ModifyKind::Name(_)) => {
                                let generation = generation.fetch_add(1, Ordering::SeqCst) + 1;
                                crate::debug_event!(
                                    "watcher",
                                    "re-armed",
                                    "{} generation {generation}",
                                    target.display()
                                );
                                pending = Some((due, generation));
                            }
                            // In-place write.
                            EventKind::Modify(_) | EventKind::Any => {
                                pending = Some((due, generation.load(Ordering::SeqCst)));
                            }
                            _ => {}
                        }
                    }
                    Err(e) => {
                        tracing::warn!("[watcher] file watch error: {e}");
                    }
                }
            }

            // Quiet period elapsed: deliver one signal for the burst.
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((_, signal_generation)) = pending.take() {
                    if signal_generation == generation.load(Ordering::SeqCst) {
                        if signals
                            .send(ChangeSignal { generation: signal_generation })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    } else {
                        crate::debug_event!(
                            "watcher",
                            "dropped stale signal",
                            "generation {signal_generation}"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio::time::{sleep, timeout};

    fn test_config() -> WatcherConfig {
        WatcherConfig {
            debounce_ms: 30,
            channel_capacity: 64,
        }
    }

    #[tokio::test]
    async fn burst_of_writes_coalesces_into_one_signal() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("doc.md");
        fs::write(&file, "initial").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let _handle = PathWatcher::start(&file, &test_config(), tx).unwrap();

        // Several writes well inside the debounce window
        fs::write(&file, "one").unwrap();
        fs::write(&file, "two").unwrap();
        fs::write(&file, "three").unwrap();

        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("signal should arrive")
            .expect("channel open");

        // No second signal for the same burst
        sleep(Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err(), "burst must coalesce to one signal");
    }

    #[tokio::test]
    async fn rename_over_target_bumps_generation() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("doc.md");
        fs::write(&file, "initial").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let handle = PathWatcher::start(&file, &test_config(), tx).unwrap();
        let before = handle.generation();

        // Atomic-replace the file the way editors do
        let temp = dir.path().join(".doc.md.tmp");
        fs::write(&temp, "replaced").unwrap();
        fs::rename(&temp, &file).unwrap();

        let signal = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("signal should arrive")
            .expect("channel open");

        assert!(handle.generation() > before, "replace must re-arm");
        assert_eq!(signal.generation, handle.generation());
    }

    #[tokio::test]
    async fn stop_prevents_further_signals() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("doc.md");
        fs::write(&file, "initial").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let handle = PathWatcher::start(&file, &test_config(), tx).unwrap();

        handle.stop();
        handle.stop(); // idempotent
        let stop_generation = handle.generation();

        fs::write(&file, "after stop").unwrap();
        sleep(Duration::from_millis(200)).await;

        // Either nothing arrives, or only signals stale relative to stop
        while let Ok(signal) = rx.try_recv() {
            assert!(
                signal.generation < stop_generation,
                "no live signal may fire after stop"
            );
        }
    }

    #[tokio::test]
    async fn missing_parent_directory_is_path_unavailable() {
        let (tx, _rx) = mpsc::channel(16);
        let err = PathWatcher::start(
            Path::new("/nonexistent-docsync-dir/doc.md"),
            &test_config(),
            tx,
        )
        .unwrap_err();
        assert!(matches!(err, WatchError::PathUnavailable { .. }));
    }

    #[tokio::test]
    async fn changes_to_sibling_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("doc.md");
        let sibling = dir.path().join("other.md");
        fs::write(&file, "initial").unwrap();
        fs::write(&sibling, "initial").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let _handle = PathWatcher::start(&file, &test_config(), tx).unwrap();

        fs::write(&sibling, "sibling change").unwrap();
        sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err(), "sibling events must be filtered");
    }
}
