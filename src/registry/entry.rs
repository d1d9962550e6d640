//! Watch entries: one registered path with its expression and triggers.

use std::path::PathBuf;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::task::JoinHandle;

use crate::expr::Expr;
use crate::trigger::TriggerSet;

/// One registered watch.
///
/// The registry exclusively owns entries, and each entry owns the OS-side
/// resources for its path; removing the entry releases them.
pub(crate) struct WatchEntry {
    pub(crate) path: PathBuf,
    pub(crate) expr: Arc<Expr>,
    pub(crate) triggers: TriggerSet,
    pub(crate) _handle: WatchHandle,
}

/// The OS-side resources backing a watch.
///
/// Dropping the notify watcher releases the OS subscription and its event
/// callback, which closes the channel sender and lets the dispatch task
/// drain and exit. The abort is a backstop for a task parked in `recv`.
pub(crate) struct WatchHandle {
    pub(crate) _watcher: RecommendedWatcher,
    pub(crate) task: JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
