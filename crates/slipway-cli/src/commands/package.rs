use std::path::{Path, PathBuf};

use anyhow::Context;
use slipway_build::{ImportScanner, Pipeline};
use slipway_core::{OutputManifest, SlipwayConfig};

pub async fn package(
    dir: PathBuf,
    json: bool,
    out: Option<PathBuf>,
    parallel: bool,
) -> anyhow::Result<()> {
    // Manifest paths are reported absolute.
    let dir = std::fs::canonicalize(&dir)
        .with_context(|| format!("project directory {} not found", dir.display()))?;
    let mut config = SlipwayConfig::load(&dir)?;
    if parallel {
        config.pipeline.parallel = true;
    }

    // Tracing is file-system bound; keep it off the async runtime.
    let manifest =
        tokio::task::spawn_blocking(move || Pipeline::new(dir, config, &ImportScanner).run())
            .await
            .context("packaging task failed to complete")??;

    if let Some(path) = &out {
        let rendered = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(path, rendered)
            .with_context(|| format!("failed to write manifest to {}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    } else {
        print_summary(&manifest, out.as_deref());
    }
    Ok(())
}

fn print_summary(manifest: &OutputManifest, out: Option<&Path>) {
    let functions: Vec<_> = manifest.functions().collect();
    let static_count = manifest.static_assets().count();

    println!(
        "Packaged {} function(s) and {} static asset(s)",
        functions.len(),
        static_count
    );
    for (name, unit) in &functions {
        println!(
            "  {name}  {}  ({} files, {} MB, {}s, {})",
            unit.handler,
            unit.files.len(),
            unit.memory,
            unit.max_duration,
            unit.runtime
        );
    }

    if !manifest.omitted.is_empty() {
        println!();
        println!("Omitted {} function(s):", manifest.omitted.len());
        for omission in &manifest.omitted {
            println!("  {}: {}", omission.output_name, omission.reason);
        }
    }

    if !manifest.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &manifest.warnings {
            println!("  {warning}");
        }
    }

    if let Some(fallback) = manifest.fallback() {
        println!();
        println!("Fallback: {} -> {}", fallback.source, fallback.destination);
    }
    if let Some(path) = out {
        println!("Manifest written to {}", path.display());
    }
}
