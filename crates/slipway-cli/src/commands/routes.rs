use std::path::Path;

use slipway_core::SlipwayConfig;

pub async fn routes(dir: &Path) -> anyhow::Result<()> {
    let config = SlipwayConfig::load(dir)?;
    let static_root = dir.join(&config.layout.static_dir);
    let rules = slipway_build::routes::synthesize(&static_root, &config.routes)?;

    for rule in &rules {
        println!(
            "{} -> {}  (src: {}, clean_urls: {}, trailing_slash: {})",
            rule.source,
            rule.destination,
            rule.src(),
            rule.clean_urls,
            rule.trailing_slash
        );
    }
    Ok(())
}
