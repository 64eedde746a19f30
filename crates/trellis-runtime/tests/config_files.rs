#![forbid(unsafe_code)]

//! Loading configuration from disk and feeding it to sessions and grids.

use std::io::Write;

use tempfile::NamedTempFile;
use trellis_layout::OverlapMode;
use trellis_runtime::{ConfigError, GridSpec, Session, TrellisConfig};

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp file");
    file.write_all(content.as_bytes()).expect("write");
    file
}

#[test]
fn toml_file_configures_session_and_grid() {
    let file = write_temp(
        ".toml",
        "[grid]\noverlap_mode = \"error\"\n\n[reconcile]\nmax_restarts_per_child = 3\n",
    );
    let config = TrellisConfig::load(file.path()).expect("loads");
    assert_eq!(config.reconcile.max_restarts_per_child, 3);

    let grid = GridSpec::from_config(&config);
    assert_eq!(grid.mode(), OverlapMode::Error);
    let session = Session::with_config(config).expect("valid");
    assert_eq!(session.config().reconcile.max_restarts_per_child, 3);
}

#[test]
fn json_file_is_detected_by_extension() {
    let file = write_temp(".json", r#"{"session": {"max_deferred": 4}}"#);
    let config = TrellisConfig::load(file.path()).expect("loads");
    assert_eq!(config.session.max_deferred, 4);
    assert_eq!(config.grid.overlap_mode, OverlapMode::Warn);
}

#[test]
fn invalid_values_fail_loading() {
    let file = write_temp(".toml", "[session]\nmax_deferred = 0\n");
    let err = TrellisConfig::load(file.path()).err().expect("rejected");
    assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("dir");
    let err = TrellisConfig::load(dir.path().join("absent.toml"))
        .err()
        .expect("missing");
    assert!(matches!(err, ConfigError::Io(_)));
}
