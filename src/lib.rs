//! File watching with a boolean expression filter language.
//!
//! Register interest in one or more paths, attach a filter expression such
//! as `["allof", ["type", "f"], ["not", ["empty"]]]`, and receive callbacks
//! only for filesystem events that satisfy it.
//!
//! ```no_run
//! use vigil::{EventKind, Expr, TriggerSet, WatchRegistry};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), vigil::WatchError> {
//! let registry = WatchRegistry::new();
//! let expr = Expr::parse_str(r#"["allof", ["suffix", "php"], ["not", ["empty"]]]"#).unwrap();
//! let triggers = TriggerSet::new().on(EventKind::Change, |path| {
//!     println!("changed: {}", path.display());
//! });
//! registry.watch("site/src", expr, triggers)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod expr;
pub mod logging;
pub mod probe;
pub mod registry;
pub mod trigger;

pub use config::{LoggingConfig, Settings, WatcherConfig};
pub use expr::{Expr, ExprError, TimeField, evaluate};
pub use probe::{EntryKind, FileStat, FsProbe, LiveProbe, ProbeError};
pub use registry::{EventKind, FsEvent, WatchError, WatchRegistry};
pub use trigger::{Trigger, TriggerSet};
