//! Watch registry: the caller-facing API.
//!
//! Owns the set of active watches and routes raw filesystem notifications
//! to the triggers registered for each path.
//!
//! # Architecture
//!
//! ```text
//! WatchRegistry
//!   - Shared entry list (path, expression, triggers, OS handle)
//!   - One notify watcher + one dispatch task per watch
//!         |
//!   notify event -> classify kind -> look up entry -> evaluate -> trigger
//! ```

mod dispatch;
mod entry;
mod error;

pub use dispatch::{EventKind, FsEvent};
pub use error::WatchError;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::config::WatcherConfig;
use crate::expr::Expr;
use crate::probe::{FsProbe, LiveProbe};
use crate::trigger::{Trigger, TriggerSet};

use entry::{WatchEntry, WatchHandle};

/// The set of active watches.
///
/// An explicit object with a controlled lifetime; independent registries
/// coexist (one per test, one per session). Entries are keyed by path, one
/// entry per path. Dropping the registry closes every OS handle and stops
/// every dispatch task.
///
/// `watch`, `watch_many`, and `change_watch` spawn the per-watch dispatch
/// task and must be called from within a tokio runtime.
pub struct WatchRegistry {
    entries: Arc<Mutex<Vec<WatchEntry>>>,
    probe: Arc<dyn FsProbe>,
    config: WatcherConfig,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::with_config(WatcherConfig::default())
    }

    pub fn with_config(config: WatcherConfig) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            probe: Arc::new(LiveProbe),
            config,
        }
    }

    /// Replace the metadata probe. Leaf terms of every expression evaluate
    /// through it.
    pub fn with_probe(mut self, probe: Arc<dyn FsProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Register a new watch on `path`, filtered by `expr`.
    ///
    /// Opens an OS watch handle (recursive for directories when configured)
    /// and wires the populated triggers. Registering a path twice is
    /// rejected with [`WatchError::DuplicateWatch`].
    pub fn watch(
        &self,
        path: impl Into<PathBuf>,
        expr: Expr,
        triggers: TriggerSet,
    ) -> Result<(), WatchError> {
        let path = path.into();
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.path == path) {
            return Err(WatchError::DuplicateWatch { path });
        }

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                let _ = tx.blocking_send(res);
            })
            .map_err(|e| WatchError::Backend {
                path: path.clone(),
                source: e,
            })?;

        let mode = if self.config.recursive && path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&path, mode)
            .map_err(|e| WatchError::Backend {
                path: path.clone(),
                source: e,
            })?;

        let task = tokio::spawn(dispatch::run(
            path.clone(),
            Arc::clone(&self.entries),
            Arc::clone(&self.probe),
            rx,
        ));

        crate::log_event!("registry", "watching", "{}", path.display());
        entries.push(WatchEntry {
            path,
            expr: Arc::new(expr),
            triggers,
            _handle: WatchHandle {
                _watcher: watcher,
                task,
            },
        });
        Ok(())
    }

    /// Batch registration.
    ///
    /// Arity is checked before anything registers; after that the batch is
    /// fail-fast and non-transactional, so registrations that succeeded
    /// before a failure stay active.
    pub fn watch_many(
        &self,
        paths: Vec<PathBuf>,
        exprs: Vec<Expr>,
        trigger_sets: Vec<TriggerSet>,
    ) -> Result<(), WatchError> {
        if paths.len() != exprs.len() || exprs.len() != trigger_sets.len() {
            return Err(WatchError::LengthMismatch {
                paths: paths.len(),
                exprs: exprs.len(),
                triggers: trigger_sets.len(),
            });
        }
        for ((path, expr), triggers) in paths.into_iter().zip(exprs).zip(trigger_sets) {
            self.watch(path, expr, triggers)?;
        }
        Ok(())
    }

    /// Stop watching `path`, closing the OS handle and stopping dispatch.
    ///
    /// A callback already in flight is not interrupted.
    pub fn delete_watch(&self, path: &Path) -> Result<(), WatchError> {
        let entry = {
            let mut entries = self.entries.lock();
            let Some(pos) = entries.iter().position(|e| e.path == path) else {
                return Err(WatchError::NotFound {
                    path: path.to_path_buf(),
                });
            };
            entries.remove(pos)
        };
        // Dropping the entry outside the lock releases the OS handle and
        // lets the dispatch task wind down.
        drop(entry);
        crate::log_event!("registry", "unwatched", "{}", path.display());
        Ok(())
    }

    /// Replace a watch wholesale: delete, then re-register.
    ///
    /// Not atomic. If the re-registration fails the path is left unwatched.
    pub fn change_watch(
        &self,
        path: &Path,
        expr: Expr,
        triggers: TriggerSet,
    ) -> Result<(), WatchError> {
        self.delete_watch(path)?;
        self.watch(path.to_path_buf(), expr, triggers)
    }

    /// Replace the trigger for one event kind on an existing watch.
    ///
    /// The next delivery picks it up; the watch's current expression still
    /// gates it.
    pub fn change_trigger(
        &self,
        path: &Path,
        kind: EventKind,
        trigger: Trigger,
    ) -> Result<(), WatchError> {
        self.with_entry_mut(path, |entry| entry.triggers.set(kind, trigger))
    }

    /// Install a no-op trigger for one event kind.
    ///
    /// The OS subscription stays; other kinds on the same watch keep firing.
    pub fn delete_trigger(&self, path: &Path, kind: EventKind) -> Result<(), WatchError> {
        self.with_entry_mut(path, |entry| {
            entry.triggers.set(kind, Arc::new(|_: &Path| {}))
        })
    }

    /// The currently active triggers for `path`, for inspection.
    pub fn trigger_list(&self, path: &Path) -> Result<TriggerSet, WatchError> {
        let entries = self.entries.lock();
        entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.triggers.clone())
            .ok_or_else(|| WatchError::NotFound {
                path: path.to_path_buf(),
            })
    }

    /// Replace the expression used for future evaluations on `path`.
    ///
    /// Triggers are untouched.
    pub fn change_expression(&self, path: &Path, expr: Expr) -> Result<(), WatchError> {
        self.with_entry_mut(path, |entry| entry.expr = Arc::new(expr))
    }

    /// Expressions of every watch structurally equal to `expr`.
    pub fn find_by_expression(&self, expr: &Expr) -> Vec<Expr> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.expr.as_ref() == expr)
            .map(|e| e.expr.as_ref().clone())
            .collect()
    }

    /// Paths currently watched, in registration order.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.entries.lock().iter().map(|e| e.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Route a synthetic notification through the registry as if the OS
    /// backend had emitted it for the watch registered at `watch_path`.
    ///
    /// Unregistered paths and unwired kinds are dropped silently, exactly
    /// like live events.
    pub fn dispatch(&self, watch_path: &Path, event: FsEvent) {
        dispatch::deliver(watch_path, &self.entries, self.probe.as_ref(), event);
    }

    fn with_entry_mut(
        &self,
        path: &Path,
        f: impl FnOnce(&mut WatchEntry),
    ) -> Result<(), WatchError> {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|e| e.path == path) {
            Some(entry) => {
                f(entry);
                Ok(())
            }
            None => Err(WatchError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
