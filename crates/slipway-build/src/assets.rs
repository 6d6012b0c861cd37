use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use slipway_core::{StaticAsset, paths};
use walkdir::WalkDir;

/// Content type forced on documents served without their extension.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Map every file under `static_root` to the request path it is served at.
///
/// Keys are output names (request path without the leading `/`). Documents
/// lose their `.html` extension so `blog/post.html` is served at `/blog/post`.
/// A missing root means an API-only project and yields an empty map.
pub fn classify(static_root: &Path) -> Result<BTreeMap<String, StaticAsset>, AssetError> {
    let mut assets: BTreeMap<String, StaticAsset> = BTreeMap::new();
    if !static_root.is_dir() {
        tracing::warn!(
            dir = %static_root.display(),
            "static directory not found; no static assets"
        );
        return Ok(assets);
    }

    let walker = WalkDir::new(static_root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for dirent in walker {
        let dirent = dirent.map_err(|e| AssetError::Walk {
            path: e
                .path()
                .map_or_else(|| static_root.to_path_buf(), Path::to_path_buf),
            source: e,
        })?;
        if dirent.file_type().is_dir() {
            continue;
        }

        let relative = dirent
            .path()
            .strip_prefix(static_root)
            .ok()
            .and_then(paths::to_slash)
            .ok_or_else(|| AssetError::InvalidPath {
                path: dirent.path().to_path_buf(),
            })?;

        let (name, content_type) = match html_stem(&relative) {
            Some(stem) => (stem.to_owned(), Some(HTML_CONTENT_TYPE.to_owned())),
            None => (relative.clone(), None),
        };

        if let Some(existing) = assets.get(&name) {
            return Err(AssetError::Collision {
                request_path: existing.request_path.clone(),
                first: existing.file.clone(),
                second: dirent.path().to_path_buf(),
            });
        }

        tracing::trace!(file = %relative, request_path = %name, "classified static asset");
        assets.insert(
            name.clone(),
            StaticAsset {
                request_path: format!("/{name}"),
                file: dirent.path().to_path_buf(),
                content_type,
            },
        );
    }

    tracing::debug!(
        dir = %static_root.display(),
        assets = assets.len(),
        "classified static assets"
    );
    Ok(assets)
}

/// `blog/post.html` → `blog/post`; any letter case of the extension counts.
pub(crate) fn html_stem(path: &str) -> Option<&str> {
    match paths::extension(path) {
        Some(ext) if ext.eq_ignore_ascii_case("html") => Some(paths::strip_extension(path)),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to walk {path}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("static files {first} and {second} are both served at {request_path}")]
    Collision {
        request_path: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("static file {path} cannot be expressed as a request path")]
    InvalidPath { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, path: &str) {
        let path = root.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn documents_get_clean_urls_and_html_type() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "index.html");
        touch(tmp.path(), "blog/post.html");
        touch(tmp.path(), "assets/app.js");

        let assets = classify(tmp.path()).unwrap();

        assert_eq!(
            assets.keys().collect::<Vec<_>>(),
            vec!["assets/app.js", "blog/post", "index"]
        );
        let post = &assets["blog/post"];
        assert_eq!(post.request_path, "/blog/post");
        assert_eq!(post.file, tmp.path().join("blog/post.html"));
        assert_eq!(post.content_type.as_deref(), Some(HTML_CONTENT_TYPE));
        assert_eq!(assets["assets/app.js"].content_type, None);
        assert!(assets.values().all(|a| !a.request_path.ends_with(".html")));
    }

    #[test]
    fn uppercase_extension_is_a_document() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "LEGACY.HTML");

        let assets = classify(tmp.path()).unwrap();

        assert_eq!(assets["LEGACY"].request_path, "/LEGACY");
    }

    #[test]
    fn document_colliding_with_bare_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "about");
        touch(tmp.path(), "about.html");

        let err = classify(tmp.path()).unwrap_err();

        assert!(matches!(
            err,
            AssetError::Collision { ref request_path, .. } if request_path == "/about"
        ));
    }

    #[test]
    fn missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(classify(&tmp.path().join("web/dist")).unwrap().is_empty());
    }

    #[test]
    fn html_stem_ignores_other_extensions() {
        assert_eq!(html_stem("a/b.html"), Some("a/b"));
        assert_eq!(html_stem("a/b.htm"), None);
        assert_eq!(html_stem(".html"), None);
    }
}
