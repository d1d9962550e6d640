//! Event model and the per-watch dispatch loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{CreateKind, RemoveKind};
use notify::{Event, EventKind as NotifyKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::probe::FsProbe;
use crate::trigger::fire_filtered;

use super::entry::WatchEntry;

/// Category of filesystem change delivered to triggers.
///
/// `Add`/`Change`/`Unlink` apply to individual files; the `Dir` kinds show
/// up for watches on directory trees. `Error` carries backend stream
/// failures and probe failures during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Add,
    Change,
    Unlink,
    AddDir,
    UnlinkDir,
    Error,
}

/// An explicit change notification: what happened, and to which path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: EventKind,
    pub path: PathBuf,
}

impl FsEvent {
    pub fn new(kind: EventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Map a notify event to our kind. Access, metadata-only, and other noise
/// kinds carry no trigger and map to None.
fn classify(event: &Event) -> Option<EventKind> {
    match event.kind {
        NotifyKind::Create(CreateKind::Folder) => Some(EventKind::AddDir),
        NotifyKind::Create(_) => Some(EventKind::Add),
        NotifyKind::Modify(_) => Some(EventKind::Change),
        NotifyKind::Remove(RemoveKind::Folder) => Some(EventKind::UnlinkDir),
        NotifyKind::Remove(_) => Some(EventKind::Unlink),
        _ => None,
    }
}

/// Per-watch dispatch loop.
///
/// One task per watch drains that watch's channel, giving one ordered
/// delivery sequence per path while watches stay concurrent with each
/// other. The loop ends when the watch is deleted (the notify watcher is
/// dropped, closing the sender).
pub(crate) async fn run(
    watch_path: PathBuf,
    entries: Arc<Mutex<Vec<WatchEntry>>>,
    probe: Arc<dyn FsProbe>,
    mut rx: mpsc::Receiver<notify::Result<Event>>,
) {
    while let Some(res) = rx.recv().await {
        match res {
            Ok(event) => {
                let Some(kind) = classify(&event) else {
                    continue;
                };
                for path in &event.paths {
                    deliver(
                        &watch_path,
                        &entries,
                        probe.as_ref(),
                        FsEvent::new(kind, path.clone()),
                    );
                }
            }
            Err(e) => {
                tracing::error!("[watch] stream error on {}: {e}", watch_path.display());
                deliver(
                    &watch_path,
                    &entries,
                    probe.as_ref(),
                    FsEvent::new(EventKind::Error, watch_path.clone()),
                );
            }
        }
    }
    crate::debug_event!("watch", "stopped", "{}", watch_path.display());
}

/// Route one event to the entry registered for `watch_path`.
///
/// The entry is re-read under the lock per event so `change_expression` and
/// `change_trigger` affect the very next delivery; the snapshot is taken,
/// the lock released, and only then does the user callback run.
pub(crate) fn deliver(
    watch_path: &Path,
    entries: &Mutex<Vec<WatchEntry>>,
    probe: &dyn FsProbe,
    event: FsEvent,
) {
    let (expr, trigger, error_trigger) = {
        let entries = entries.lock();
        let Some(entry) = entries.iter().find(|e| e.path == watch_path) else {
            // Deleted between event arrival and dispatch.
            return;
        };
        let Some(trigger) = entry.triggers.get(event.kind).cloned() else {
            return;
        };
        let error_trigger = entry.triggers.get(EventKind::Error).cloned();
        (Arc::clone(&entry.expr), trigger, error_trigger)
    };

    if event.kind == EventKind::Error {
        // Error deliveries report a fault; the expression does not gate them.
        trigger(&event.path);
        return;
    }

    crate::debug_event!("watch", "event", "{:?} {}", event.kind, event.path.display());
    fire_filtered(&trigger, &expr, probe, &event.path, error_trigger.as_ref());
}
