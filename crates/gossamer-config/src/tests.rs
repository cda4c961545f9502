use std::fs;
use std::time::Duration;

use tempfile::tempdir;
use test_case::test_case;

use crate::{
    ConfigError, ConfigLoader, GossamerConfig, LOCAL_CONFIG_FILE, PROJECT_CONFIG_FILE,
    parse_debug_flag,
};

/// Loader isolated from the process environment.
fn loader(dir: &std::path::Path, vars: &[(&str, &str)]) -> ConfigLoader {
    let vars = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    ConfigLoader::new().with_project_dir(dir).with_env(vars)
}

#[test]
fn test_load_defaults() {
    let temp_dir = tempdir().expect("Failed to create temp dir");

    let config = loader(temp_dir.path(), &[]).load().expect("Failed to load config");

    assert_eq!(config, GossamerConfig::default());
    assert!(!config.log.debug);
    assert_eq!(config.runtime.tick(), Some(Duration::from_millis(50)));
    assert_eq!(config.gossip.interval(), Duration::from_millis(100));
    assert!(config.gossip.track_neighbors);
    assert_eq!(config.gossip.full_sync_every, 10);
    assert_eq!(config.counter.service, "seq-kv");
}

#[test]
fn test_load_project_config() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let project_dir = temp_dir.path();

    fs::write(
        project_dir.join(PROJECT_CONFIG_FILE),
        r#"
[runtime]
tick_ms = 0

[gossip]
interval_ms = 250
track_neighbors = false

[counter]
service = "lin-kv"
"#,
    )
    .expect("Failed to write config");

    let config = loader(project_dir, &[]).load().expect("Failed to load config");

    assert_eq!(config.runtime.tick(), None);
    assert_eq!(config.gossip.interval_ms, 250);
    assert!(!config.gossip.track_neighbors);
    assert_eq!(config.gossip.full_sync_every, 10, "unset keys keep defaults");
    assert_eq!(config.counter.service, "lin-kv");
}

#[test]
fn test_local_overrides() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let project_dir = temp_dir.path();

    fs::write(
        project_dir.join(PROJECT_CONFIG_FILE),
        "[gossip]\ninterval_ms = 250\nfull_sync_every = 4\n",
    )
    .expect("Failed to write project config");
    fs::write(
        project_dir.join(LOCAL_CONFIG_FILE),
        "[gossip]\ninterval_ms = 20\n",
    )
    .expect("Failed to write local config");

    let config = loader(project_dir, &[]).load().expect("Failed to load config");

    assert_eq!(config.gossip.interval_ms, 20);
    assert_eq!(config.gossip.full_sync_every, 4);
}

#[test]
fn test_env_overrides_files() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let project_dir = temp_dir.path();
    fs::write(
        project_dir.join(PROJECT_CONFIG_FILE),
        "[gossip]\ninterval_ms = 250\n",
    )
    .expect("Failed to write config");

    let config = loader(
        project_dir,
        &[
            ("GOSSAMER_GOSSIP__INTERVAL_MS", "75"),
            ("GOSSAMER_LOG__DEBUG", "true"),
            ("GOSSAMER_COUNTER__SERVICE", "lww-kv"),
        ],
    )
    .load()
    .expect("Failed to load config");

    assert_eq!(config.gossip.interval_ms, 75);
    assert!(config.log.debug);
    assert_eq!(config.counter.service, "lww-kv");
}

#[test_case("1", true; "one")]
#[test_case("2", true; "any non-zero")]
#[test_case(" 1 ", true; "surrounding whitespace")]
#[test_case("0", false; "zero")]
#[test_case("yes", false; "not a number")]
#[test_case("", false; "empty")]
fn test_parse_debug_flag(value: &str, expected: bool) {
    assert_eq!(parse_debug_flag(value), expected);
}

#[test_case(&[("DEBUG", "1")], true; "legacy flag enables")]
#[test_case(&[("DEBUG", "0")], false; "legacy zero leaves off")]
#[test_case(&[("DEBUG", "0"), ("GOSSAMER_LOG__DEBUG", "true")], true; "legacy zero does not disable")]
#[test_case(&[], false; "unset")]
fn test_legacy_debug_variable(vars: &[(&str, &str)], expected: bool) {
    let temp_dir = tempdir().expect("Failed to create temp dir");

    let config = loader(temp_dir.path(), vars).load().expect("Failed to load config");

    assert_eq!(config.log.debug, expected);
}

#[test]
fn test_zero_gossip_interval_is_rejected() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    fs::write(
        temp_dir.path().join(PROJECT_CONFIG_FILE),
        "[gossip]\ninterval_ms = 0\n",
    )
    .expect("Failed to write config");

    let result = loader(temp_dir.path(), &[]).load();

    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn test_empty_counter_service_is_rejected() {
    let mut config = GossamerConfig::default();
    config.counter.service = "  ".to_string();

    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn test_malformed_file_is_a_load_error() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    fs::write(
        temp_dir.path().join(PROJECT_CONFIG_FILE),
        "[gossip\ninterval_ms = ",
    )
    .expect("Failed to write config");

    let result = loader(temp_dir.path(), &[]).load();

    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_wrong_type_is_a_load_error() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    fs::write(
        temp_dir.path().join(PROJECT_CONFIG_FILE),
        "[gossip]\ntrack_neighbors = \"sometimes\"\n",
    )
    .expect("Failed to write config");

    let result = loader(temp_dir.path(), &[]).load();

    assert!(matches!(result, Err(ConfigError::Load(_))));
}
