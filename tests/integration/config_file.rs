//! Configuration files feeding the matcher

use std::collections::HashMap;
use std::io::Write;

use tempfile::NamedTempFile;

use l4quic::config::{apply_env_overrides, create_default_config, load_config, Config};
use l4quic::error::ConfigError;
use l4quic::matcher::QuicMatcher;

use super::*;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_drives_matcher() {
    let file = write_config(
        r#"{
            "matcher": { "sni": ["example.com"], "alpn": ["custom"] },
            "log": { "level": "debug", "format": "json" }
        }"#,
    );

    let config = load_config(file.path()).unwrap();
    let matcher = QuicMatcher::from_config(&config.matcher).unwrap();

    let decisions: Vec<bool> = CAPTURED
        .iter()
        .map(|p| matcher.matches_datagram(p))
        .collect();
    assert_eq!(decisions, [false, true, false]);
}

#[test]
fn test_empty_file_is_wildcard() {
    let file = write_config("{}");
    let config = load_config(file.path()).unwrap();
    let matcher = QuicMatcher::from_config(&config.matcher).unwrap();

    assert!(!matcher.has_criteria());
    assert!(CAPTURED.iter().all(|p| matcher.matches_datagram(p)));
}

#[test]
fn test_invalid_patterns_rejected_at_load() {
    for json in [
        r#"{ "matcher": { "sni": [] } }"#,
        r#"{ "matcher": { "alpn": [""] } }"#,
        r#"{ "matcher": { "sni": ["ex*.com"] } }"#,
        r#"{ "matcher": { "max_prefix_bytes": 100 } }"#,
    ] {
        let file = write_config(json);
        let err = load_config(file.path()).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError(_)),
            "{json} gave {err}"
        );
    }
}

#[test]
fn test_env_overrides_change_decisions() {
    let env: HashMap<&str, &str> = [("L4QUIC_ALPN", "h3-29, custom")].into_iter().collect();
    let config = apply_env_overrides(Config::default(), |name| {
        env.get(name).map(|v| (*v).to_string())
    })
    .unwrap();

    let matcher = QuicMatcher::from_config(&config.matcher).unwrap();
    let decisions: Vec<bool> = CAPTURED
        .iter()
        .map(|p| matcher.matches_datagram(p))
        .collect();
    assert_eq!(decisions, [false, true, true]);
}

#[test]
fn test_generated_config_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    create_default_config(&path).unwrap();
    let config = load_config(&path).unwrap();

    assert_eq!(config, Config::default());
    assert!(QuicMatcher::from_config(&config.matcher).is_ok());
}
