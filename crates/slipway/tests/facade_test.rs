use slipway::build::{ImportScanner, Pipeline};
use slipway::{Output, SlipwayConfig};
use tempfile::TempDir;

#[test]
fn facade_runs_the_pipeline() {
    let tmp = TempDir::new().unwrap();
    let functions = tmp.path().join("api/dist/functions");
    std::fs::create_dir_all(&functions).unwrap();
    std::fs::write(functions.join("hello.js"), "exports.handler = () => 'hi';").unwrap();

    let scanner = ImportScanner::new();
    let manifest = Pipeline::new(tmp.path(), SlipwayConfig::default(), &scanner)
        .run()
        .unwrap();

    match &manifest.outputs["api/hello"] {
        Output::Function(unit) => assert_eq!(unit.handler, "hello.handler"),
        Output::Static(_) => panic!("expected a function"),
    }
    assert_eq!(manifest.fallback().unwrap().destination, "/index");
}

#[test]
fn facade_exposes_core_config() {
    let config = SlipwayConfig::default();
    assert_eq!(config.layout.api_prefix, "api");
}
