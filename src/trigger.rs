//! Triggers: user callbacks bound to event kinds, gated by an expression.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::expr::{Expr, evaluate};
use crate::probe::FsProbe;
use crate::registry::EventKind;

/// A user callback invoked with the path that triggered it.
///
/// Triggers are reference-counted, not owned: callers keep ownership of
/// whatever state the closure captures.
pub type Trigger = Arc<dyn Fn(&Path) + Send + Sync>;

/// The per-event-kind triggers for one watch.
///
/// Only the kinds a caller populates are wired; an event whose kind has no
/// trigger is dropped without evaluating the expression.
#[derive(Clone, Default)]
pub struct TriggerSet {
    triggers: HashMap<EventKind, Trigger>,
}

impl TriggerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration of a trigger for one event kind.
    pub fn on(mut self, kind: EventKind, f: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        self.triggers.insert(kind, Arc::new(f));
        self
    }

    /// Install or replace the trigger for one event kind.
    pub fn set(&mut self, kind: EventKind, trigger: Trigger) {
        self.triggers.insert(kind, trigger);
    }

    pub fn get(&self, kind: EventKind) -> Option<&Trigger> {
        self.triggers.get(&kind)
    }

    /// Event kinds with a trigger installed, in a stable order.
    pub fn kinds(&self) -> Vec<EventKind> {
        let mut kinds: Vec<EventKind> = self.triggers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

impl fmt::Debug for TriggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerSet")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Evaluate `expr` against `path` and fire `trigger` on a match.
///
/// A probe failure (the path vanished between the event and the stat) is
/// routed to the watch's `error` trigger when one is registered, otherwise
/// logged and dropped. It never escapes the notification context.
pub(crate) fn fire_filtered(
    trigger: &Trigger,
    expr: &Expr,
    probe: &dyn FsProbe,
    path: &Path,
    on_error: Option<&Trigger>,
) {
    match evaluate(path, expr, probe) {
        Ok(true) => trigger(path),
        Ok(false) => {
            crate::debug_event!("trigger", "filtered", "{}", path.display());
        }
        Err(e) => match on_error {
            Some(error_trigger) => error_trigger(path),
            None => {
                tracing::warn!("[trigger] probe failed for {}: {e}", path.display());
            }
        },
    }
}
