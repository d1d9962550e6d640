//! Recursive expression evaluation against a single path.

use std::path::Path;

use crate::probe::{FsProbe, ProbeError};

use super::{Expr, TimeField};

/// Evaluate `expr` against `path`.
///
/// Pure with respect to the tree; leaf terms read live filesystem state
/// through `probe`, so the same call can change answer as the file mutates.
/// The only failure mode is a probe failure from `empty`, `since`, or
/// `type` on a path that vanished or cannot be read.
pub fn evaluate(path: &Path, expr: &Expr, probe: &dyn FsProbe) -> Result<bool, ProbeError> {
    match expr {
        Expr::Literal(b) => Ok(*b),
        Expr::True => Ok(true),
        Expr::False => Ok(false),

        Expr::AllOf(subs) => {
            for sub in subs {
                if !evaluate(path, sub, probe)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Expr::AnyOf(subs) => {
            for sub in subs {
                if evaluate(path, sub, probe)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Expr::Not(sub) => Ok(!evaluate(path, sub, probe)?),

        Expr::Suffix(suffix) => Ok(path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.to_lowercase() == *suffix)),
        Expr::Regex { re, .. } | Expr::IRegex { re, .. } => {
            Ok(re.is_match(&path.to_string_lossy()))
        }
        Expr::Name(name) => Ok(path.file_name().and_then(|n| n.to_str()) == Some(name.as_str())),
        Expr::IName(name) => Ok(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_lowercase() == *name)),

        Expr::Empty => Ok(probe.stat(path)?.size == 0),
        Expr::Exists => Ok(probe.exists(path)),
        Expr::Since { ts, field } => {
            let stat = probe.stat(path)?;
            let t = match field {
                TimeField::Mtime => stat.mtime,
                TimeField::Ctime => stat.ctime,
                TimeField::Atime => stat.atime,
            };
            Ok(t > *ts)
        }
        Expr::Type(kind) => Ok(probe.lstat(path)? == *kind),
    }
}
