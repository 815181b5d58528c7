//! Loading build options from files and the environment

use quill_build::{BuildError, BuildOptions, OptimizationLevel, OutputTo};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var("QUILL_OUTPUT_DIR");
    env::remove_var("QUILL_OPTIMIZATIONS");
}

#[test]
fn test_load_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("quill.toml");
    fs::write(
        &path,
        r#"
output-dir = "target/js"
output-to = "stdout"
optimizations = "simple"
externs = ["externs/jquery.js"]
strict-resolution = true
"#,
    )
    .unwrap();

    let options = BuildOptions::load_from_file(&path).unwrap();
    assert_eq!(options.output_dir, PathBuf::from("target/js"));
    assert_eq!(options.output_to, Some(OutputTo::Stdout));
    assert_eq!(options.optimizations, OptimizationLevel::Simple);
    assert_eq!(options.externs, vec![PathBuf::from("externs/jquery.js")]);
    assert!(options.strict_resolution);
}

#[test]
fn test_load_missing_file() {
    let err = BuildOptions::load_from_file(&PathBuf::from("/nonexistent/quill.toml")).unwrap_err();
    assert!(matches!(err, BuildError::IoError { .. }));
}

#[test]
fn test_parse_error_names_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("quill.toml");
    fs::write(&path, "optimizations = \"extreme\"").unwrap();

    match BuildOptions::load_from_file(&path).unwrap_err() {
        BuildError::ConfigParse { file, .. } => assert_eq!(file, path),
        other => panic!("Expected ConfigParse, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    clear_env();
    env::set_var("QUILL_OUTPUT_DIR", "/tmp/quill-out");
    env::set_var("QUILL_OPTIMIZATIONS", "Advanced");

    let options = BuildOptions::from_toml_str("output-dir = \"target/js\"")
        .unwrap()
        .apply_env_overrides();
    clear_env();

    let options = options.unwrap();
    assert_eq!(options.output_dir, PathBuf::from("/tmp/quill-out"));
    assert_eq!(options.optimizations, OptimizationLevel::Advanced);
}

#[test]
#[serial]
fn test_invalid_env_level_rejected() {
    clear_env();
    env::set_var("QUILL_OPTIMIZATIONS", "maximum");

    let result = BuildOptions::default().apply_env_overrides();
    clear_env();

    match result.unwrap_err() {
        BuildError::InvalidOption { field, .. } => assert_eq!(field, "optimizations"),
        other => panic!("Expected InvalidOption, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_no_env_keeps_values() {
    clear_env();
    let options = BuildOptions::default()
        .with_output_dir("build")
        .apply_env_overrides()
        .unwrap();
    assert_eq!(options.output_dir, PathBuf::from("build"));
    assert_eq!(options.optimizations, OptimizationLevel::None);
}
