//! Route table synthesis.
//!
//! The table is ordered. Hosts try rules top to bottom, after serving any
//! function or static asset whose output name matches the request exactly,
//! so the catch-all fallback always comes last.

use std::path::Path;

use regex::Regex;
use slipway_core::{RouteRule, RoutesConfig, paths};

use crate::assets::html_stem;

/// Pattern the fallback rule is written with.
pub const CATCH_ALL: &str = "/(.*)";

/// Build the ordered route table for a static site rooted at `static_root`.
pub fn synthesize(static_root: &Path, config: &RoutesConfig) -> Result<Vec<RouteRule>, RouteError> {
    let destination = fallback_destination(static_root, config);
    tracing::debug!(destination = %destination, "selected fallback document");
    Ok(vec![rewrite(CATCH_ALL, &destination, true, false)?])
}

/// Clean URL of the catch-all document when the build produced one, else
/// the clean URL of the index document.
pub fn fallback_destination(static_root: &Path, config: &RoutesConfig) -> String {
    if static_root.join(&config.fallback_document).is_file() {
        clean_url(&config.fallback_document)
    } else {
        clean_url(&config.index_document)
    }
}

/// `blog/post.html` → `/blog/post`
pub fn clean_url(document: &str) -> String {
    let normalized = paths::normalize(document).unwrap_or_else(|| document.to_owned());
    let stem = html_stem(&normalized).unwrap_or(&normalized);
    format!("/{stem}")
}

/// Compile one rewrite rule.
///
/// `source` is a path pattern made of literal text, raw regex groups
/// (`(.*)`) and named segment parameters (`:slug`). The result is anchored
/// at both ends.
pub fn rewrite(
    source: &str,
    destination: &str,
    clean_urls: bool,
    trailing_slash: bool,
) -> Result<RouteRule, RouteError> {
    let matcher = compile(source)?;
    validate_destination(destination)?;
    Ok(RouteRule::new(
        source,
        destination,
        clean_urls,
        trailing_slash,
        matcher,
    ))
}

fn compile(source: &str) -> Result<Regex, RouteError> {
    let invalid = |detail: &str| RouteError::InvalidPattern {
        pattern: source.to_owned(),
        detail: detail.to_owned(),
    };
    if !source.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }

    let mut body = String::from("^");
    let mut literal = String::new();
    let mut chars = source.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '(' => {
                body.push_str(&regex::escape(&literal));
                literal.clear();
                let mut depth = 1usize;
                let mut end = None;
                while let Some((i, c)) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(i);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let end = end.ok_or_else(|| invalid("unbalanced '('"))?;
                body.push_str(&source[start..=end]);
            }
            ')' => return Err(invalid("unbalanced ')'")),
            ':' if chars
                .peek()
                .is_some_and(|(_, n)| n.is_ascii_alphabetic() || *n == '_') =>
            {
                body.push_str(&regex::escape(&literal));
                literal.clear();
                let mut name = String::new();
                while let Some((_, n)) =
                    chars.next_if(|(_, n)| n.is_ascii_alphanumeric() || *n == '_')
                {
                    name.push(n);
                }
                body.push_str(&format!("(?P<{name}>[^/]+)"));
            }
            other => literal.push(other),
        }
    }
    body.push_str(&regex::escape(&literal));
    body.push('$');

    Regex::new(&body).map_err(|e| invalid(&e.to_string()))
}

fn validate_destination(destination: &str) -> Result<(), RouteError> {
    let local = destination.starts_with('/');
    let remote = destination.starts_with("https://") || destination.starts_with("http://");
    if (local || remote) && !destination.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(RouteError::InvalidDestination {
            destination: destination.to_owned(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid route pattern {pattern:?}: {detail}")]
    InvalidPattern { pattern: String, detail: String },

    #[error("invalid route destination {destination:?}: must be an absolute path or URL")]
    InvalidDestination { destination: String },
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn catch_all_matches_any_absolute_path(path in "/[a-z0-9/._-]{0,40}") {
            let rule = rewrite(CATCH_ALL, "/index", true, false).unwrap();
            prop_assert!(rule.matches(&path));
        }

        #[test]
        fn clean_url_drops_document_extension(
            stem in "[a-z][a-z0-9]{0,10}(/[a-z][a-z0-9]{0,10}){0,3}"
        ) {
            prop_assert_eq!(clean_url(&format!("{stem}.html")), format!("/{stem}"));
        }
    }
}
