// Config loading and validation tests

use std::time::Duration;

use guestwatch::config::AppConfig;

const VALID_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/snapshots.db"
max_pool_size = 4

[upstream]
base_url = "https://pve.local:8006/api2/json"
token_id = "monitor@pve!guestwatch"
token_secret = "secret"
accept_invalid_certs = true
default_node = "pve"

[polling]
interval_ms = 15000

[[polling.targets]]
node = "pve"
guest_id = "100"

[[polling.targets]]
node = " pve2 "
guest_id = "201"
interval_ms = 5000

[series]
window_size = 30
"#;

const MINIMAL_CONFIG: &str = r#"
[server]
port = 8081
host = "127.0.0.1"

[database]
path = "data/snapshots.db"
max_pool_size = 2

[upstream]
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.database.path, "data/snapshots.db");
    assert_eq!(config.upstream.token_id, "monitor@pve!guestwatch");
    assert!(config.upstream.accept_invalid_certs);
    assert_eq!(config.upstream.default_node.as_deref(), Some("pve"));
    assert_eq!(config.polling.targets.len(), 2);
    assert_eq!(config.series.window_size, 30);
}

#[test]
fn test_config_defaults() {
    let config = AppConfig::load_from_str(MINIMAL_CONFIG).expect("load_from_str");
    assert_eq!(config.polling.interval_ms, 15_000);
    assert!(config.polling.targets.is_empty());
    assert_eq!(config.series.window_size, 20);
    assert_eq!(config.upstream.timeout_secs, 10);
    assert!(config.upstream.base_url.is_empty());
    assert!(!config.upstream.accept_invalid_certs);
    assert!(config.upstream.default_node.is_none());
}

#[test]
fn test_poll_targets_apply_default_interval_and_trim() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    let targets = config.poll_targets();
    assert_eq!(targets[0].node, "pve");
    assert_eq!(targets[0].interval, Duration::from_millis(15_000));
    assert_eq!(targets[1].node, "pve2");
    assert_eq!(targets[1].guest_id, "201");
    assert_eq!(targets[1].interval, Duration::from_millis(5_000));
}

#[test]
fn test_blank_target_is_loaded_not_rejected() {
    let s = format!("{MINIMAL_CONFIG}\n[[polling.targets]]\nnode = \"pve\"\n");
    let config = AppConfig::load_from_str(&s).unwrap();
    let targets = config.poll_targets();
    assert_eq!(targets.len(), 1);
    assert!(targets[0].guest_id.is_empty());
    assert!(targets[0].validate().is_err());
}

#[test]
fn test_default_guest_forms_single_target_when_none_listed() {
    let s = MINIMAL_CONFIG.replace(
        "[upstream]",
        "[upstream]\ndefault_node = \"pve\"\ndefault_guest_id = \"100\"",
    );
    let config = AppConfig::load_from_str(&s).unwrap();
    assert_eq!(config.upstream.default_guest_id(), Some("100"));
    let targets = config.poll_targets();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].node, "pve");
    assert_eq!(targets[0].guest_id, "100");
    assert_eq!(targets[0].interval, Duration::from_millis(15_000));
    assert!(targets[0].validate().is_ok());
}

#[test]
fn test_blank_target_fields_fall_back_to_defaults() {
    let s = format!(
        "{}\n[[polling.targets]]\nguest_id = \"101\"\n\n[[polling.targets]]\nnode = \"pve2\"\n",
        MINIMAL_CONFIG.replace(
            "[upstream]",
            "[upstream]\ndefault_node = \"pve\"\ndefault_guest_id = \"100\"",
        )
    );
    let config = AppConfig::load_from_str(&s).unwrap();
    let targets = config.poll_targets();
    assert_eq!(targets.len(), 2);
    assert_eq!((targets[0].node.as_str(), targets[0].guest_id.as_str()), ("pve", "101"));
    assert_eq!((targets[1].node.as_str(), targets[1].guest_id.as_str()), ("pve2", "100"));
}

#[test]
fn test_no_targets_and_no_defaults_polls_nothing() {
    let config = AppConfig::load_from_str(MINIMAL_CONFIG).unwrap();
    assert!(config.poll_targets().is_empty());
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8081", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_zero_interval() {
    let bad = VALID_CONFIG.replace("interval_ms = 15000", "interval_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("polling.interval_ms"));

    let bad = VALID_CONFIG.replace("interval_ms = 5000", "interval_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("polling.targets[1]"));
}

#[test]
fn test_config_validation_rejects_zero_window() {
    let bad = VALID_CONFIG.replace("window_size = 30", "window_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("series.window_size"));
}

#[test]
fn test_config_requires_upstream_table() {
    let bad = MINIMAL_CONFIG.replace("[upstream]", "");
    assert!(AppConfig::load_from_str(&bad).is_err());
}
