//! Built-in [`ModuleResolver`]: follows literal `import`/`require` specifiers.
//!
//! The scanner is deliberately syntactic. It recognizes
//!
//! - `import … from '…'` and `export … from '…'`
//! - side-effect `import '…'`
//! - dynamic `import('…')` and `require('…')`
//!
//! and resolves them the way Node does for files on disk: extension and
//! `index` probing for relative specifiers, `node_modules` lookup walking up
//! from the importer for bare ones. Specifiers built at runtime are invisible
//! to it; such files can be reached only if something else imports them.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use slipway_core::{FileKind, ProjectFile, paths};

use crate::cache::CacheError;
use crate::resolve::{ModuleResolver, Resolution, ResolveError, ResolveOptions};

static SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"\bfrom\s*['"]([^'"\n]+)['"]"#,
        r#"|\bimport\s*['"]([^'"\n]+)['"]"#,
        r#"|\b(?:require|import)\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#,
    ))
    .expect("specifier pattern is valid")
});

static ESM_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"^\s*(?:import(?:\s+[\w${*]|\s*[{*'"])|export\s*[{*]"#,
        r#"|export\s+(?:default|const|let|var|function|async|class|type|interface|enum)\b)"#,
    ))
    .expect("esm pattern is valid")
});

/// Files the scanner reads for specifiers.
const CODE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx", "mts", "cts"];

const JS_PROBE: &[&str] = &["js", "mjs", "cjs", "json"];
const TS_PROBE: &[&str] = &["js", "mjs", "cjs", "json", "ts", "tsx", "jsx"];

const NODE_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Resolves module graphs by scanning sources for literal specifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportScanner;

impl ImportScanner {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleResolver for ImportScanner {
    fn resolve(
        &self,
        entrypoint: &str,
        options: &ResolveOptions<'_>,
    ) -> Result<Resolution, ResolveError> {
        let missing = || ResolveError::EntrypointMissing {
            path: entrypoint.to_owned(),
        };
        let entry = paths::normalize(entrypoint).ok_or_else(missing)?;
        let file = options.files.read(&entry)?.ok_or_else(missing)?;

        let mut walk = Walk::new(options);
        walk.enqueue(entry, file);
        while let Some((path, file)) = walk.queue.pop_front() {
            walk.visit(&path, &file)?;
        }

        tracing::debug!(
            entrypoint,
            source_files = walk.resolution.source_files.len(),
            module_files = walk.resolution.module_files.len(),
            warnings = walk.resolution.warnings.len(),
            "scanned module graph"
        );
        Ok(walk.resolution)
    }
}

enum Probe {
    Found(String, Arc<ProjectFile>),
    Excluded,
    Missing,
}

/// Breadth-first walk state for one entrypoint.
struct Walk<'o, 'a> {
    options: &'o ResolveOptions<'a>,
    resolution: Resolution,
    seen: HashSet<String>,
    queue: VecDeque<(String, Arc<ProjectFile>)>,
}

impl<'o, 'a> Walk<'o, 'a> {
    fn new(options: &'o ResolveOptions<'a>) -> Self {
        Self {
            options,
            resolution: Resolution::default(),
            seen: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    fn enqueue(&mut self, path: String, file: Arc<ProjectFile>) {
        if self.seen.insert(path.clone()) {
            self.queue.push_back((path, file));
        }
    }

    fn visit(&mut self, path: &str, file: &ProjectFile) -> Result<(), CacheError> {
        let esm = is_module(path, file, self.options.mixed_modules);
        if esm {
            self.resolution.module_files.insert(path.to_owned());
        } else {
            self.resolution.source_files.insert(path.to_owned());
        }

        // The link ships as-is; its content belongs to the target's directory.
        if let FileKind::Symlink { target } = &file.kind {
            return self.follow_link(path, target);
        }

        if !paths::extension(path).is_some_and(|ext| CODE_EXTENSIONS.contains(&ext)) {
            return Ok(());
        }
        let Some(text) = file.text() else {
            return Ok(());
        };
        for specifier in specifiers(text) {
            self.follow(path, &specifier, esm)?;
        }
        Ok(())
    }

    fn follow(&mut self, importer: &str, specifier: &str, esm: bool) -> Result<(), CacheError> {
        let dir = paths::parent(importer);
        let probe = if is_relative(specifier) {
            match paths::join(dir, specifier) {
                Some(base) => self.probe_module(&base)?,
                None => Probe::Missing,
            }
        } else if specifier.starts_with('/') {
            Probe::Missing
        } else if is_builtin(specifier) {
            return Ok(());
        } else {
            self.probe_package(dir, specifier, esm)?
        };

        match probe {
            Probe::Found(path, file) => self.enqueue(path, file),
            Probe::Excluded => {
                tracing::trace!(specifier, importer, "skipped excluded module");
            }
            Probe::Missing => self
                .resolution
                .warnings
                .push(format!("failed to resolve {specifier:?} from {importer}")),
        }
        Ok(())
    }

    /// Pull in the file a symlinked module points at.
    fn follow_link(&mut self, link: &str, target: &Path) -> Result<(), CacheError> {
        let resolved = target
            .to_str()
            .filter(|_| !target.is_absolute())
            .and_then(|t| paths::join(paths::parent(link), t));
        let Some(resolved) = resolved else {
            self.resolution.warnings.push(format!(
                "symlink {link} points outside the project: {}",
                target.display()
            ));
            return Ok(());
        };
        if self.options.exclude.is_excluded(&resolved) {
            return Ok(());
        }

        match self.options.files.read(&resolved)? {
            Some(file) => self.enqueue(resolved, file),
            None => self
                .resolution
                .warnings
                .push(format!("symlink {link} points at missing file {resolved}")),
        }
        Ok(())
    }

    /// Resolve a path the way Node resolves a file or directory module.
    fn probe_module(&self, base: &str) -> Result<Probe, CacheError> {
        let mut excluded = false;
        for candidate in self.candidates(base) {
            if self.options.exclude.is_excluded(&candidate) {
                excluded = true;
                continue;
            }
            if let Some(file) = self.options.files.read(&candidate)? {
                return Ok(Probe::Found(candidate, file));
            }
        }
        Ok(if excluded {
            Probe::Excluded
        } else {
            Probe::Missing
        })
    }

    fn candidates(&self, base: &str) -> Vec<String> {
        let extensions = if self.options.typescript {
            TS_PROBE
        } else {
            JS_PROBE
        };

        let mut out = vec![base.to_owned()];
        out.extend(extensions.iter().map(|ext| format!("{base}.{ext}")));
        // Compiled-ESM convention: `./util.js` written against `util.ts`
        if self.options.typescript
            && let Some(stem) = base.strip_suffix(".js")
        {
            out.push(format!("{stem}.ts"));
            out.push(format!("{stem}.tsx"));
        }
        out.extend(extensions.iter().map(|ext| format!("{base}/index.{ext}")));
        out
    }

    /// Look a bare specifier up in `node_modules`, walking up from `dir`.
    fn probe_package(
        &mut self,
        dir: &str,
        specifier: &str,
        esm: bool,
    ) -> Result<Probe, CacheError> {
        let (name, subpath) = split_package(specifier);

        for base in ancestors(dir) {
            if paths::file_name(base) == "node_modules" {
                continue;
            }
            let Some(package_dir) = paths::join(base, &format!("node_modules/{name}")) else {
                continue;
            };

            let manifest_path = format!("{package_dir}/package.json");
            let manifest = if self.options.exclude.is_excluded(&manifest_path) {
                None
            } else {
                self.options.files.read(&manifest_path)?
            };

            let Some(manifest) = manifest else {
                let target = match subpath {
                    Some(sub) => paths::join(&package_dir, sub),
                    None => Some(package_dir.clone()),
                };
                if let Some(target) = target {
                    let probe = self.probe_module(&target)?;
                    if !matches!(probe, Probe::Missing) {
                        return Ok(probe);
                    }
                }
                continue;
            };

            // Node reads package.json at runtime to resolve the package.
            self.enqueue(manifest_path.clone(), Arc::clone(&manifest));

            let entry = self.package_entry(&manifest_path, &manifest, subpath, esm);
            let target = match (entry, subpath) {
                (Some(entry), _) => paths::join(&package_dir, &entry),
                (None, Some(sub)) => paths::join(&package_dir, sub),
                (None, None) => Some(package_dir.clone()),
            };
            return match target {
                Some(target) => self.probe_module(&target),
                None => Ok(Probe::Missing),
            };
        }
        Ok(Probe::Missing)
    }

    /// The file a package (or one of its subpaths) points at, relative to the package.
    fn package_entry(
        &mut self,
        manifest_path: &str,
        manifest: &ProjectFile,
        subpath: Option<&str>,
        esm: bool,
    ) -> Option<String> {
        let json: Value = match serde_json::from_slice(&manifest.content) {
            Ok(json) => json,
            Err(e) => {
                self.resolution
                    .warnings
                    .push(format!("invalid package manifest {manifest_path}: {e}"));
                return None;
            }
        };

        if let Some(exports) = json.get("exports") {
            let key = subpath.map_or_else(|| ".".to_owned(), |sub| format!("./{sub}"));
            let target = match exports {
                Value::Object(map) if map.keys().any(|k| k.starts_with('.')) => map.get(&key),
                other if subpath.is_none() => Some(other),
                _ => None,
            };
            if let Some(target) = target.and_then(|t| conditional_target(t, esm)) {
                return Some(target);
            }
        }
        if subpath.is_some() {
            return None;
        }
        if esm && let Some(module) = json.get("module").and_then(Value::as_str) {
            return Some(module.to_owned());
        }
        json.get("main").and_then(Value::as_str).map(str::to_owned)
    }
}

/// Pick the target of an `exports` entry.
///
/// Like Node, the first key (in the manifest's own order) naming a condition
/// this importer satisfies wins.
fn conditional_target(value: &Value, esm: bool) -> Option<String> {
    match value {
        Value::String(target) => Some(target.clone()),
        Value::Array(items) => items.iter().find_map(|v| conditional_target(v, esm)),
        Value::Object(map) => {
            let loader = if esm { "import" } else { "require" };
            map.iter()
                .filter(|(key, _)| {
                    matches!(key.as_str(), "node" | "default") || key.as_str() == loader
                })
                .find_map(|(_, v)| conditional_target(v, esm))
        }
        _ => None,
    }
}

/// Literal specifiers in `source`, ignoring anything inside comments.
fn specifiers(source: &str) -> Vec<String> {
    SPECIFIER
        .captures_iter(&strip_comments(source))
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_owned())
        })
        .collect()
}

/// `source` with `//` and `/* */` comments blanked out.
///
/// String literals are copied untouched, so `'https://…'` is not a comment.
/// Newlines are kept for line-anchored matching.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q || (c == '\n' && q != '`') {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&n| n != '\n').is_some() {}
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            other => out.push(other),
        }
    }
    out
}

fn is_module(path: &str, file: &ProjectFile, mixed_modules: bool) -> bool {
    match paths::extension(path) {
        Some("mjs" | "mts") => true,
        Some("js" | "jsx" | "ts" | "tsx") if mixed_modules => file.text().is_some_and(|text| {
            strip_comments(text)
                .lines()
                .any(|line| ESM_STATEMENT.is_match(line))
        }),
        _ => false,
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

fn is_builtin(specifier: &str) -> bool {
    if specifier.starts_with("node:") {
        return true;
    }
    let name = specifier.split('/').next().unwrap_or(specifier);
    NODE_BUILTINS.contains(&name)
}

/// `@scope/name/sub` → (`@scope/name`, `Some("sub")`), `name` → (`name`, `None`).
fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let split_at = if specifier.starts_with('@') {
        specifier
            .match_indices('/')
            .nth(1)
            .map(|(i, _)| i)
    } else {
        specifier.find('/')
    };
    match split_at {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..]).filter(|s| !s.is_empty())),
        None => (specifier, None),
    }
}

/// `dir` and every parent up to the project root (`""`).
fn ancestors(dir: &str) -> Vec<&str> {
    let mut out = vec![dir];
    let mut current = dir;
    while !current.is_empty() {
        current = paths::parent(current);
        out.push(current);
    }
    out
}
