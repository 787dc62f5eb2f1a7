//! Gateway pattern translation.
//!
//! Handlers declare routes in the gateway dialect:
//!
//! | gateway              | local router       |
//! |----------------------|--------------------|
//! | `/items/{id}`        | `/items/{id}`      |
//! | `/files/{key+}`      | `/files/{*key}`    |
//! | `/x/{id:[0-9]+}`     | `/x/{id}` + regex  |
//! | `/static/{tail:.*}`  | `/static/{*tail}` + regex |
//!
//! The gateway rejects `{name:regex}`, so it is refused unless explicitly
//! allowed. When allowed, the variable becomes a plain `{name}`, or a
//! catch-all when its regex can match `/`, and the regex travels along as a
//! [`PathConstraint`] checked after matching.
//!
//! Each translation also carries a positional `shape` (`/x/{v0}`) used as
//! the radix key, so routes that differ only by variable names or
//! constraints share one slot.

use regex::Regex;
use regex_syntax::hir::{Class, Hir, HirKind};
use thiserror::Error;

use crate::routing::matcher::PathConstraint;

#[derive(Debug, Error)]
pub enum PatternError {
    /// Pattern uses syntax the gateway does not accept.
    #[error("route `{pattern}` constrains `{variable}` with a regular expression, which the gateway does not support")]
    UnsupportedRoutePattern { pattern: String, variable: String },

    /// Pattern cannot be expressed in either dialect.
    #[error("route `{pattern}` is invalid: {reason}")]
    InvalidRoutePattern { pattern: String, reason: String },
}

/// A pattern rewritten for the local router.
#[derive(Debug, Clone)]
pub struct TranslatedPattern {
    /// Pattern in local router syntax.
    pub local: String,
    /// `local` with variables renamed by position (`v0`, `v1`, ...).
    pub shape: String,
    /// Variable names in the order they appear.
    pub params: Vec<String>,
    /// Constraints the router itself cannot enforce.
    pub constraints: Vec<PathConstraint>,
    /// True when an unsupported construct was let through.
    pub overridden: bool,
}

/// Translate a gateway pattern into local router syntax.
pub fn translate(pattern: &str, allow_unsupported: bool) -> Result<TranslatedPattern, PatternError> {
    let invalid = |reason: &str| PatternError::InvalidRoutePattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    if !pattern.starts_with('/') {
        return Err(invalid("must start with `/`"));
    }

    let mut local = String::with_capacity(pattern.len() + 2);
    let mut shape = String::with_capacity(pattern.len());
    let mut params = Vec::new();
    let mut constraints = Vec::new();
    let mut overridden = false;
    let mut rest = pattern;

    while let Some(open) = rest.find(['{', '}']) {
        if rest.as_bytes()[open] == b'}' {
            return Err(invalid("unbalanced `}`"));
        }
        local.push_str(&rest[..open]);
        shape.push_str(&rest[..open]);

        let close = closing_brace(&rest[open..]).ok_or_else(|| invalid("unbalanced `{`"))? + open;
        let inner = &rest[open + 1..close];
        rest = &rest[close + 1..];

        let (name, catch_all) = match Variable::parse(inner).map_err(invalid)? {
            Variable::Segment(name) => (name, false),
            Variable::CatchAll(name) => (name, true),
            Variable::Constrained(name, expr) => {
                if !allow_unsupported {
                    return Err(PatternError::UnsupportedRoutePattern {
                        pattern: pattern.to_string(),
                        variable: name.to_string(),
                    });
                }
                tracing::warn!(
                    pattern = %pattern,
                    variable = %name,
                    "Regex-constrained route variable is not supported by the gateway; honoring it locally"
                );
                let crosses = can_match_slash(expr)
                    .map_err(|e| invalid(&format!("bad regex for `{name}`: {e}")))?;
                let regex = Regex::new(&format!("^(?:{expr})$"))
                    .map_err(|e| invalid(&format!("bad regex for `{name}`: {e}")))?;
                constraints.push(PathConstraint::new(name, regex));
                overridden = true;
                (name, crosses)
            }
        };

        if catch_all && !rest.is_empty() {
            return Err(invalid(&format!(
                "`{name}` can span segments and must be the last segment"
            )));
        }

        let marker = if catch_all { "*" } else { "" };
        local.push_str(&format!("{{{marker}{name}}}"));
        shape.push_str(&format!("{{{marker}v{}}}", params.len()));
        params.push(name.to_string());
    }
    local.push_str(rest);
    shape.push_str(rest);

    Ok(TranslatedPattern {
        local,
        shape,
        params,
        constraints,
        overridden,
    })
}

enum Variable<'a> {
    Segment(&'a str),
    CatchAll(&'a str),
    Constrained(&'a str, &'a str),
}

impl<'a> Variable<'a> {
    fn parse(inner: &'a str) -> Result<Self, &'static str> {
        let var = if let Some((name, expr)) = inner.split_once(':') {
            if name.ends_with('+') || name.starts_with('*') {
                return Err("a catch-all variable cannot carry a regular expression");
            }
            Variable::Constrained(name, expr)
        } else if let Some(name) = inner.strip_prefix('*') {
            Variable::CatchAll(name)
        } else if let Some(name) = inner.strip_suffix('+') {
            Variable::CatchAll(name)
        } else {
            Variable::Segment(inner)
        };
        let name = match var {
            Variable::Segment(n) | Variable::CatchAll(n) | Variable::Constrained(n, _) => n,
        };
        if name.is_empty() {
            return Err("empty variable name");
        }
        Ok(var)
    }
}

/// Whether `expr` can match text containing `/`.
fn can_match_slash(expr: &str) -> Result<bool, regex_syntax::Error> {
    let hir = regex_syntax::Parser::new().parse(expr)?;
    Ok(mentions_slash(&hir))
}

fn mentions_slash(hir: &Hir) -> bool {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => false,
        HirKind::Literal(literal) => literal.0.contains(&b'/'),
        HirKind::Class(Class::Unicode(class)) => class
            .ranges()
            .iter()
            .any(|r| r.start() <= '/' && '/' <= r.end()),
        HirKind::Class(Class::Bytes(class)) => class
            .ranges()
            .iter()
            .any(|r| r.start() <= b'/' && b'/' <= r.end()),
        HirKind::Repetition(repetition) => mentions_slash(&repetition.sub),
        HirKind::Capture(capture) => mentions_slash(&capture.sub),
        HirKind::Concat(subs) | HirKind::Alternation(subs) => subs.iter().any(mentions_slash),
    }
}

/// Byte offset of the brace closing the one at the start of `s`.
/// Regex quantifiers like `{3}` nest inside a variable.
fn closing_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(pattern: &str) -> String {
        translate(pattern, false).unwrap().local
    }

    #[test]
    fn plain_patterns_pass_through() {
        assert_eq!(local("/"), "/");
        assert_eq!(local("/items"), "/items");
        assert_eq!(local("/items/{id}"), "/items/{id}");
        assert_eq!(local("/a/{x}/b/{y}"), "/a/{x}/b/{y}");
    }

    #[test]
    fn catch_all_is_rewritten() {
        let t = translate("/files/{key+}", false).unwrap();
        assert_eq!(t.local, "/files/{*key}");
        assert_eq!(t.shape, "/files/{*v0}");
        assert_eq!(t.params, vec!["key"]);
        assert!(t.constraints.is_empty());
        assert!(!t.overridden);
    }

    #[test]
    fn translation_is_idempotent() {
        for pattern in ["/", "/items/{id}", "/files/{key+}", "/{proxy+}", "/a/{b}/c"] {
            let once = local(pattern);
            assert_eq!(local(&once), once, "pattern {pattern}");
        }
    }

    #[test]
    fn regex_variable_rejected_by_default() {
        let err = translate("/x/{id:[0-9]+}", false).unwrap_err();
        match err {
            PatternError::UnsupportedRoutePattern { pattern, variable } => {
                assert_eq!(pattern, "/x/{id:[0-9]+}");
                assert_eq!(variable, "id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn regex_variable_allowed_with_override() {
        let t = translate("/x/{id:[0-9]{1,3}}", true).unwrap();
        assert_eq!(t.local, "/x/{id}");
        assert_eq!(t.shape, "/x/{v0}");
        assert!(t.overridden);
        assert_eq!(t.constraints.len(), 1);
        assert!(t.constraints[0].accepts("123"));
        assert!(!t.constraints[0].accepts("1234"));
        assert!(!t.constraints[0].accepts("abc"));
    }

    #[test]
    fn malformed_patterns() {
        for pattern in ["items", "/a/{id", "/a/id}", "/a/{}", "/a/{+}", "/f/{rest+}/more"] {
            assert!(
                matches!(translate(pattern, true), Err(PatternError::InvalidRoutePattern { .. })),
                "pattern {pattern}"
            );
        }
    }

    #[test]
    fn slash_matching_regex_becomes_catch_all() {
        let t = translate("/static/{tail:.*}", true).unwrap();
        assert_eq!(t.local, "/static/{*tail}");
        assert_eq!(t.shape, "/static/{*v0}");
        assert!(t.constraints[0].accepts("css/site.css"));

        let t = translate("/f/{path:[a-z/]+}", true).unwrap();
        assert_eq!(t.local, "/f/{*path}");

        let t = translate("/f/{name:[^/]+}", true).unwrap();
        assert_eq!(t.local, "/f/{name}");
    }

    #[test]
    fn spanning_regex_must_be_last() {
        assert!(matches!(
            translate("/s/{tail:.*}/edit", true),
            Err(PatternError::InvalidRoutePattern { .. })
        ));
    }

    #[test]
    fn catch_all_with_regex_is_invalid() {
        for pattern in ["/f/{key+:[a-z/]+}", "/f/{*key:.*}"] {
            assert!(
                matches!(translate(pattern, true), Err(PatternError::InvalidRoutePattern { .. })),
                "pattern {pattern}"
            );
        }
    }

    #[test]
    fn shapes_ignore_variable_names() {
        let a = translate("/x/{id:[0-9]+}", true).unwrap();
        let b = translate("/x/{slug:[a-z]+}", true).unwrap();
        assert_eq!(a.shape, b.shape);
        assert_eq!(translate("/a/{x}/b/{y}", false).unwrap().shape, "/a/{v0}/b/{v1}");
    }

    #[test]
    fn bad_regex_is_invalid_even_with_override() {
        assert!(matches!(
            translate("/x/{id:[0-9}", true),
            Err(PatternError::InvalidRoutePattern { .. })
        ));
    }
}
