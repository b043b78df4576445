//! The per-document serial execution context.
//!
//! One task owns all mutable state for one document and select!s over
//! three sources: commands from the handle, debounced watcher signals,
//! and the render trigger's deadline. Everything that touches document
//! state happens inline in this loop, so operations execute in a strict
//! total order. Blocking I/O (the reconciler's reads, the save's
//! temp-write + rename) is awaited off the executor thread, with results
//! applied back here.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use crate::config::Settings;
use crate::document::{Authority, DocumentSnapshot};
use crate::events::{ChangeEvent, DocumentBroadcaster, ReconcileWarning};
use crate::hash::ContentHash;
use crate::reconcile::{ChangeReconciler, Decision, ReadOutcome};
use crate::render::RenderTrigger;
use crate::save::{SaveCoordinator, SaveError, SuppressionWindow};
use crate::watcher::{ChangeSignal, WatchHandle};

use super::EditSession;

/// Requests from the handle, executed in arrival order.
pub(crate) enum Command {
    Edit {
        content: String,
    },
    Save {
        reply: tokio::sync::oneshot::Sender<Result<(), SaveError>>,
    },
    Snapshot {
        reply: tokio::sync::oneshot::Sender<DocumentSnapshot>,
    },
    Close,
}

pub(crate) struct DocumentActor {
    session: EditSession,
    saver: SaveCoordinator,
    reconciler: ChangeReconciler,
    render: RenderTrigger,
    suppression: SuppressionWindow,
    broadcaster: DocumentBroadcaster,
    watch: Option<WatchHandle>,
    commands: mpsc::Receiver<Command>,
    signals: mpsc::Receiver<ChangeSignal>,
}

impl DocumentActor {
    pub(crate) fn new(
        session: EditSession,
        settings: &Arc<Settings>,
        broadcaster: DocumentBroadcaster,
        watch: Option<WatchHandle>,
        commands: mpsc::Receiver<Command>,
        signals: mpsc::Receiver<ChangeSignal>,
    ) -> Self {
        Self {
            session,
            saver: SaveCoordinator::new(&settings.save),
            reconciler: ChangeReconciler::new(&settings.reconcile),
            render: RenderTrigger::new(settings.render.idle_ms),
            suppression: SuppressionWindow::default(),
            broadcaster,
            watch,
            commands,
            signals,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let render_deadline = self.render.deadline();

            tokio::select! {
                maybe = self.commands.recv() => {
                    match maybe {
                        Some(Command::Edit { content }) => self.handle_edit(content),
                        Some(Command::Save { reply }) => {
                            let result = self.handle_save().await;
                            let _ = reply.send(result);
                        }
                        Some(Command::Snapshot { reply }) => {
                            let snapshot = self
                                .session
                                .document()
                                .snapshot(self.watch.is_some());
                            let _ = reply.send(snapshot);
                        }
                        // All handles dropped is a close too.
                        Some(Command::Close) | None => break,
                    }
                }

                Some(signal) = self.signals.recv() => {
                    self.handle_signal(signal).await;
                }

                _ = sleep_until(render_deadline.unwrap_or_else(Instant::now)),
                    if render_deadline.is_some() =>
                {
                    self.fire_render();
                }
            }
        }

        self.shutdown();
    }

    fn handle_edit(&mut self, content: String) {
        self.session.apply_local_edit(content);
        self.render.bump();
        crate::debug_event!(
            "session",
            "local edit",
            "{} v{}",
            self.session.document().path().display(),
            self.session.document().version()
        );
    }

    async fn handle_save(&mut self) -> Result<(), SaveError> {
        if let Err(e) = self.session.begin_save() {
            // Unreachable under serialization; fail the save rather than
            // mutate state under a foreign authority.
            tracing::error!("[save] invariant violated: {e}");
            return Err(SaveError::Rejected {
                reason: e.to_string(),
            });
        }

        let path = self.session.document().path().to_path_buf();
        let content = self.session.document().content().to_string();
        let result = self.saver.write_atomic(&path, content).await;

        match &result {
            Ok(()) => {
                // Arm before mark_saved so the watcher echo of this write
                // is already covered when it arrives.
                self.suppression.arm(self.saver.suppression_window());
                self.session.mark_saved();
                crate::log_event!(
                    "save",
                    "completed",
                    "{} v{}",
                    path.display(),
                    self.session.document().version()
                );
            }
            Err(e) => {
                // A torn temp write may still have produced raw events.
                self.suppression.arm(self.saver.failure_window());
                tracing::warn!("[save] failed for {}: {e}", path.display());
            }
        }

        self.session.finish_save();
        result
    }

    async fn handle_signal(&mut self, signal: ChangeSignal) {
        let Some(watch) = &self.watch else {
            return;
        };
        if signal.generation != watch.generation() {
            crate::debug_event!(
                "reconcile",
                "dropped stale signal",
                "generation {}",
                signal.generation
            );
            return;
        }

        // Cheap precedence checks before touching the disk.
        if self.suppression.active() {
            crate::debug_event!("reconcile", "suppressed self-write echo");
            return;
        }
        if self.session.document().authority() != Authority::Idle {
            crate::debug_event!(
                "reconcile",
                "authority busy",
                "{:?}",
                self.session.document().authority()
            );
            return;
        }

        let path = self.session.document().path().to_path_buf();
        let outcome = self.reconciler.read_current(&path).await;
        match outcome {
            ReadOutcome::Content(content) => {
                let incoming = ContentHash::of(&content);
                let decision = ChangeReconciler::decide(
                    self.suppression.active(),
                    self.session.document().authority(),
                    &incoming,
                    self.session.document().disk_hash(),
                );
                match decision {
                    Decision::Apply => {
                        if self.session.apply_external_content(content) {
                            self.render.bump();
                            crate::log_event!(
                                "reconcile",
                                "applied external change",
                                "{} v{} hash {}",
                                path.display(),
                                self.session.document().version(),
                                incoming.short()
                            );
                        }
                    }
                    Decision::Unchanged => {
                        crate::debug_event!("reconcile", "duplicate event, content unchanged");
                    }
                    Decision::SuppressedEcho => {
                        crate::debug_event!("reconcile", "suppressed self-write echo");
                    }
                    Decision::AuthorityBusy => {
                        crate::debug_event!("reconcile", "authority busy");
                    }
                }
            }
            ReadOutcome::Removed => {
                tracing::warn!(
                    "[reconcile] file removed, keeping buffer: {}",
                    path.display()
                );
                self.stop_watching();
                self.broadcaster
                    .send_warning(ReconcileWarning::FileRemoved { path });
            }
            ReadOutcome::Failed { attempts, source } => {
                tracing::warn!(
                    "[reconcile] read failed after {attempts} attempts for {}: {source}",
                    path.display()
                );
                self.broadcaster
                    .send_warning(ReconcileWarning::TransientReadFailure { path, attempts });
            }
        }
    }

    fn fire_render(&mut self) {
        let version = self.session.document().version();
        if self.render.fire(version) {
            self.broadcaster.send_change(ChangeEvent {
                version,
                content: self.session.document().content().to_string(),
            });
            crate::debug_event!("render", "notified", "v{version}");
        }
    }

    fn stop_watching(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.stop();
        }
    }

    /// Single teardown point: no partial-cancellation states.
    fn shutdown(&mut self) {
        self.stop_watching();
        self.render.cancel();
        crate::debug_event!(
            "session",
            "closed",
            "{}",
            self.session.document().path().display()
        );
    }
}
