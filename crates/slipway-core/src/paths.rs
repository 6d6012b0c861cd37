//! Project-relative path helpers.
//!
//! Every path that ends up in a manifest is `/`-separated regardless of the
//! host platform, so file sets and handler references stay stable between
//! builds on different machines.

use std::path::{Component, Path};

/// Normalize a project-relative path: `\` becomes `/`, `.` segments and
/// empty segments are dropped, and `..` pops the previous segment.
///
/// Returns `None` when the path climbs above its root. A leading `/` is
/// treated as the project root.
pub fn normalize(path: &str) -> Option<String> {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop()?;
            }
            s => out.push(s),
        }
    }
    Some(out.join("/"))
}

/// Render a relative `Path` with `/` separators.
///
/// Root and prefix components are skipped; `..` pops like [`normalize`].
pub fn to_slash(path: &Path) -> Option<String> {
    let mut out: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => out.push(s.to_string_lossy().into_owned()),
            Component::ParentDir => {
                out.pop()?;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Some(out.join("/"))
}

/// Join two `/`-separated paths, normalizing the result.
pub fn join(base: &str, relative: &str) -> Option<String> {
    if base.is_empty() {
        normalize(relative)
    } else {
        normalize(&format!("{base}/{relative}"))
    }
}

/// Directory part of a `/`-separated path (`""` for top-level files).
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Final segment of a `/`-separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Extension of the final segment, without the dot.
///
/// Dotfiles such as `.env` have no extension.
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some(&name[i + 1..]),
    }
}

/// `path` with the extension of its final segment removed.
pub fn strip_extension(path: &str) -> &str {
    match extension(path) {
        Some(ext) => &path[..path.len() - ext.len() - 1],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize("a/./b/../c").as_deref(), Some("a/c"));
        assert_eq!(normalize("./a//b/").as_deref(), Some("a/b"));
        assert_eq!(normalize("/a/b").as_deref(), Some("a/b"));
    }

    #[test]
    fn normalize_converts_backslashes() {
        assert_eq!(normalize("a\\b\\c.js").as_deref(), Some("a/b/c.js"));
    }

    #[test]
    fn normalize_rejects_escape() {
        assert!(normalize("../a").is_none());
        assert!(normalize("a/../../b").is_none());
    }

    #[test]
    fn to_slash_joins_components() {
        let p: PathBuf = ["api", "dist", "functions", "graphql.js"].iter().collect();
        assert_eq!(to_slash(&p).as_deref(), Some("api/dist/functions/graphql.js"));
    }

    #[test]
    fn extension_helpers() {
        assert_eq!(extension("a/b.test.js"), Some("js"));
        assert_eq!(extension("a/.env"), None);
        assert_eq!(extension("a.b/c"), None);
        assert_eq!(strip_extension("blog/post.html"), "blog/post");
        assert_eq!(strip_extension("a.b/c"), "a.b/c");
        assert_eq!(parent("a/b/c.js"), "a/b");
        assert_eq!(parent("c.js"), "");
    }

    #[test]
    fn join_handles_empty_base() {
        assert_eq!(join("", "./lib/a.js").as_deref(), Some("lib/a.js"));
        assert_eq!(join("src/fn", "../lib/a").as_deref(), Some("src/lib/a"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn segment() -> impl Strategy<Value = String> {
            "[a-z0-9_-]{1,8}(\\.[a-z]{1,3})?"
        }

        proptest! {
            #[test]
            fn normalize_is_idempotent(segments in proptest::collection::vec(segment(), 0..6)) {
                let path = segments.join("/");
                let once = normalize(&path).unwrap();
                prop_assert_eq!(normalize(&once).unwrap(), once.clone());
                prop_assert_eq!(once, path);
            }

            #[test]
            fn backslash_and_slash_agree(segments in proptest::collection::vec(segment(), 1..6)) {
                prop_assert_eq!(
                    normalize(&segments.join("\\")),
                    normalize(&segments.join("/"))
                );
            }
        }
    }
}
