//! Boolean filter expressions evaluated against a filesystem path.
//!
//! An expression is a tree of terms with the canonical wire form of a JSON
//! array whose zeroth element names the term:
//!
//! ```text
//! ["allof", ["type", "f"], ["not", ["empty"]]]
//! ```
//!
//! A bare JSON boolean is valid shorthand for `["true"]`/`["false"]`.
//!
//! Terms are a closed set: parsing rejects unknown names, wrong arities, and
//! invalid regex patterns up front, so a malformed expression fails at
//! construction rather than silently matching nothing.

mod eval;

pub use eval::evaluate;

use regex::{Regex, RegexBuilder};
use serde_json::{Value, json};
use thiserror::Error;

use crate::probe::EntryKind;

/// Errors from expression construction.
#[derive(Error, Debug)]
pub enum ExprError {
    #[error("unknown term '{term}'")]
    UnknownTerm { term: String },

    #[error("term '{term}' takes {expected} argument(s), got {got}")]
    Arity {
        term: String,
        expected: &'static str,
        got: usize,
    },

    #[error("term '{term}' argument must be a {expected}")]
    BadArgument {
        term: String,
        expected: &'static str,
    },

    #[error("invalid regex pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("'since' field must be mtime, ctime, or atime, got '{field}'")]
    BadTimeField { field: String },

    #[error("'type' letter must be one of b, c, d, f, p, l, s, got '{letter}'")]
    BadTypeLetter { letter: String },

    #[error("expression must be a JSON array or a bare boolean")]
    BadSyntax,

    #[error("expression is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which stat timestamp a `since` term compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Mtime,
    Ctime,
    Atime,
}

impl TimeField {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "mtime" => Some(TimeField::Mtime),
            "ctime" => Some(TimeField::Ctime),
            "atime" => Some(TimeField::Atime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeField::Mtime => "mtime",
            TimeField::Ctime => "ctime",
            TimeField::Atime => "atime",
        }
    }
}

/// A filter expression, one variant per term.
///
/// Immutable once attached to a watch; replacing a watch's expression
/// installs a new tree. String arguments for the case-folding terms
/// (`suffix`, `iname`) are lowercased here so evaluation is a plain
/// comparison.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Bare boolean shorthand, the escape hatch for hardcoding a result.
    Literal(bool),
    True,
    False,
    AllOf(Vec<Expr>),
    AnyOf(Vec<Expr>),
    Not(Box<Expr>),
    /// Lowercased file extension equals this (stored without the dot).
    Suffix(String),
    Regex { pattern: String, re: Regex },
    IRegex { pattern: String, re: Regex },
    Name(String),
    /// Stored lowercased.
    IName(String),
    Empty,
    Exists,
    Since { ts: f64, field: TimeField },
    Type(EntryKind),
}

impl Expr {
    /// Parse the canonical JSON form.
    pub fn parse(value: &Value) -> Result<Self, ExprError> {
        match value {
            Value::Bool(b) => Ok(Expr::Literal(*b)),
            Value::Array(items) => Self::parse_term(items),
            _ => Err(ExprError::BadSyntax),
        }
    }

    /// Parse an expression from JSON text.
    pub fn parse_str(text: &str) -> Result<Self, ExprError> {
        let value: Value = serde_json::from_str(text)?;
        Self::parse(&value)
    }

    fn parse_term(items: &[Value]) -> Result<Self, ExprError> {
        let Some(Value::String(term)) = items.first() else {
            return Err(ExprError::BadSyntax);
        };
        let args = &items[1..];

        match term.as_str() {
            "allof" => Ok(Expr::AllOf(parse_all(args)?)),
            "anyof" => Ok(Expr::AnyOf(parse_all(args)?)),
            "not" => {
                check_arity(term, args, 1)?;
                Ok(Expr::Not(Box::new(Expr::parse(&args[0])?)))
            }
            // Constant terms never evaluate their arguments; extra
            // elements are tolerated rather than rejected.
            "true" => Ok(Expr::True),
            "false" => Ok(Expr::False),
            "suffix" => {
                let s = one_string(term, args)?;
                Ok(Expr::Suffix(
                    s.strip_prefix('.').unwrap_or(s).to_lowercase(),
                ))
            }
            "regex" => {
                let pattern = one_string(term, args)?;
                let re = Regex::new(pattern).map_err(|source| ExprError::BadPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
                Ok(Expr::Regex {
                    pattern: pattern.to_string(),
                    re,
                })
            }
            "iregex" => {
                let pattern = one_string(term, args)?;
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ExprError::BadPattern {
                        pattern: pattern.to_string(),
                        source,
                    })?;
                Ok(Expr::IRegex {
                    pattern: pattern.to_string(),
                    re,
                })
            }
            "name" => Ok(Expr::Name(one_string(term, args)?.to_string())),
            "iname" => Ok(Expr::IName(one_string(term, args)?.to_lowercase())),
            "empty" => {
                check_arity(term, args, 0)?;
                Ok(Expr::Empty)
            }
            "exists" => {
                check_arity(term, args, 0)?;
                Ok(Expr::Exists)
            }
            "since" => {
                check_arity(term, args, 2)?;
                let ts = args[0].as_f64().ok_or(ExprError::BadArgument {
                    term: term.clone(),
                    expected: "number (seconds since epoch)",
                })?;
                let field = args[1].as_str().ok_or(ExprError::BadArgument {
                    term: term.clone(),
                    expected: "string",
                })?;
                let field = TimeField::parse(field).ok_or_else(|| ExprError::BadTimeField {
                    field: field.to_string(),
                })?;
                Ok(Expr::Since { ts, field })
            }
            "type" => {
                let letter = one_string(term, args)?;
                let kind = parse_type_letter(letter).ok_or_else(|| ExprError::BadTypeLetter {
                    letter: letter.to_string(),
                })?;
                Ok(Expr::Type(kind))
            }
            _ => Err(ExprError::UnknownTerm { term: term.clone() }),
        }
    }

    /// Re-emit the canonical JSON form.
    pub fn to_value(&self) -> Value {
        match self {
            Expr::Literal(b) => Value::Bool(*b),
            Expr::True => json!(["true"]),
            Expr::False => json!(["false"]),
            Expr::AllOf(subs) => term_array("allof", subs),
            Expr::AnyOf(subs) => term_array("anyof", subs),
            Expr::Not(sub) => json!(["not", sub.to_value()]),
            Expr::Suffix(s) => json!(["suffix", s]),
            Expr::Regex { pattern, .. } => json!(["regex", pattern]),
            Expr::IRegex { pattern, .. } => json!(["iregex", pattern]),
            Expr::Name(n) => json!(["name", n]),
            Expr::IName(n) => json!(["iname", n]),
            Expr::Empty => json!(["empty"]),
            Expr::Exists => json!(["exists"]),
            Expr::Since { ts, field } => json!(["since", ts, field.as_str()]),
            Expr::Type(kind) => json!(["type", type_letter(*kind)]),
        }
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Literal(b)
    }
}

/// Structural equality; regex terms compare by pattern string since compiled
/// programs are not comparable.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        use Expr::*;
        match (self, other) {
            (Literal(a), Literal(b)) => a == b,
            (True, True) | (False, False) | (Empty, Empty) | (Exists, Exists) => true,
            (AllOf(a), AllOf(b)) | (AnyOf(a), AnyOf(b)) => a == b,
            (Not(a), Not(b)) => a == b,
            (Suffix(a), Suffix(b)) | (Name(a), Name(b)) | (IName(a), IName(b)) => a == b,
            (Regex { pattern: a, .. }, Regex { pattern: b, .. }) => a == b,
            (IRegex { pattern: a, .. }, IRegex { pattern: b, .. }) => a == b,
            (
                Since { ts: a, field: fa },
                Since {
                    ts: b,
                    field: fb,
                },
            ) => a == b && fa == fb,
            (Type(a), Type(b)) => a == b,
            _ => false,
        }
    }
}

fn parse_all(args: &[Value]) -> Result<Vec<Expr>, ExprError> {
    args.iter().map(Expr::parse).collect()
}

fn check_arity(term: &str, args: &[Value], expected: usize) -> Result<(), ExprError> {
    if args.len() != expected {
        return Err(ExprError::Arity {
            term: term.to_string(),
            expected: match expected {
                0 => "0",
                1 => "1",
                _ => "2",
            },
            got: args.len(),
        });
    }
    Ok(())
}

fn one_string<'a>(term: &str, args: &'a [Value]) -> Result<&'a str, ExprError> {
    check_arity(term, args, 1)?;
    args[0].as_str().ok_or(ExprError::BadArgument {
        term: term.to_string(),
        expected: "string",
    })
}

fn parse_type_letter(s: &str) -> Option<EntryKind> {
    match s {
        "b" => Some(EntryKind::BlockDevice),
        "c" => Some(EntryKind::CharDevice),
        "d" => Some(EntryKind::Directory),
        "f" => Some(EntryKind::File),
        "p" => Some(EntryKind::Fifo),
        "l" => Some(EntryKind::Symlink),
        "s" => Some(EntryKind::Socket),
        _ => None,
    }
}

fn type_letter(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::BlockDevice => "b",
        EntryKind::CharDevice => "c",
        EntryKind::Directory => "d",
        EntryKind::File => "f",
        EntryKind::Fifo => "p",
        EntryKind::Symlink => "l",
        EntryKind::Socket => "s",
        EntryKind::Unknown => "?",
    }
}

fn term_array(name: &str, subs: &[Expr]) -> Value {
    let mut items = vec![json!(name)];
    items.extend(subs.iter().map(Expr::to_value));
    Value::Array(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_boolean() {
        assert_eq!(Expr::parse_str("true").unwrap(), Expr::Literal(true));
        assert_eq!(Expr::parse_str("false").unwrap(), Expr::Literal(false));
    }

    #[test]
    fn test_parse_nested_combinators() {
        let expr = Expr::parse_str(r#"["allof", ["type", "f"], ["not", ["empty"]]]"#).unwrap();
        assert_eq!(
            expr,
            Expr::AllOf(vec![
                Expr::Type(EntryKind::File),
                Expr::Not(Box::new(Expr::Empty)),
            ])
        );
    }

    #[test]
    fn test_parse_unknown_term() {
        match Expr::parse_str(r#"["nonesuch"]"#) {
            Err(ExprError::UnknownTerm { term }) => assert_eq!(term, "nonesuch"),
            other => panic!("expected UnknownTerm, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_arity_errors() {
        assert!(matches!(
            Expr::parse_str(r#"["not"]"#),
            Err(ExprError::Arity { .. })
        ));
        assert!(matches!(
            Expr::parse_str(r#"["suffix", "a", "b"]"#),
            Err(ExprError::Arity { .. })
        ));
        assert!(matches!(
            Expr::parse_str(r#"["since", 1]"#),
            Err(ExprError::Arity { .. })
        ));
        assert!(matches!(
            Expr::parse_str(r#"["empty", "x"]"#),
            Err(ExprError::Arity { .. })
        ));
    }

    #[test]
    fn test_parse_bad_arguments() {
        assert!(matches!(
            Expr::parse_str(r#"["name", 42]"#),
            Err(ExprError::BadArgument { .. })
        ));
        assert!(matches!(
            Expr::parse_str(r#"["since", "soon", "mtime"]"#),
            Err(ExprError::BadArgument { .. })
        ));
        assert!(matches!(
            Expr::parse_str(r#"["since", 1, "birthtime"]"#),
            Err(ExprError::BadTimeField { .. })
        ));
        assert!(matches!(
            Expr::parse_str(r#"["type", "x"]"#),
            Err(ExprError::BadTypeLetter { .. })
        ));
        assert!(matches!(
            Expr::parse_str(r#"["regex", "[unterminated"]"#),
            Err(ExprError::BadPattern { .. })
        ));
        assert!(matches!(
            Expr::parse_str(r#"{"term": "true"}"#),
            Err(ExprError::BadSyntax)
        ));
        assert!(matches!(Expr::parse_str("not json"), Err(ExprError::Json(_))));
    }

    #[test]
    fn test_suffix_normalizes_dot_and_case() {
        let with_dot = Expr::parse_str(r#"["suffix", ".TXT"]"#).unwrap();
        let bare = Expr::parse_str(r#"["suffix", "txt"]"#).unwrap();
        assert_eq!(with_dot, bare);
    }

    #[test]
    fn test_constant_terms_ignore_arguments() {
        assert_eq!(Expr::parse_str(r#"["true", 1, 2]"#).unwrap(), Expr::True);
        assert_eq!(Expr::parse_str(r#"["false", "x"]"#).unwrap(), Expr::False);
    }

    #[test]
    fn test_round_trip() {
        let text = r#"["anyof",["suffix","rs"],["iregex","^/tmp/"],["since",12345.0,"mtime"]]"#;
        let expr = Expr::parse_str(text).unwrap();
        let reparsed = Expr::parse(&expr.to_value()).unwrap();
        assert_eq!(expr, reparsed);
    }

    #[test]
    fn test_regex_equality_is_by_pattern() {
        let a = Expr::parse_str(r#"["regex", "t$"]"#).unwrap();
        let b = Expr::parse_str(r#"["regex", "t$"]"#).unwrap();
        let c = Expr::parse_str(r#"["iregex", "t$"]"#).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
