use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(None, env_from(&[])).expect("settings");
    assert_eq!(settings, Settings::default());
    assert!(settings.api_config().is_err());
}

#[test]
fn file_values_override_defaults() {
    let raw = r#"
api_url = "https://erp.example.com/u2v1"
api_key = "file-key"
page_size = 25
batch_delete = true
"#;
    let settings = load_settings_from(Some(raw), env_from(&[])).expect("settings");
    assert_eq!(settings.api_url.as_deref(), Some("https://erp.example.com/u2v1"));
    assert_eq!(settings.api_key.as_deref(), Some("file-key"));
    assert_eq!(settings.page_size, 25);
    assert_eq!(settings.timeout_secs, 30);
    assert!(settings.batch_delete);
}

#[test]
fn app_prefixed_env_wins_over_legacy_env_and_file() {
    let raw = r#"api_url = "http://from-file""#;
    let settings = load_settings_from(
        Some(raw),
        env_from(&[
            ("U2V1_API_URL", "http://legacy"),
            ("APP__API_URL", "http://app"),
            ("U2V1_API_KEY", "legacy-key"),
            ("APP__PAGE_SIZE", "50"),
        ]),
    )
    .expect("settings");
    assert_eq!(settings.api_url.as_deref(), Some("http://app"));
    assert_eq!(settings.api_key.as_deref(), Some("legacy-key"));
    assert_eq!(settings.page_size, 50);
}

#[test]
fn unparsable_numeric_env_is_ignored() {
    let settings =
        load_settings_from(None, env_from(&[("APP__TIMEOUT_SECS", "soon")])).expect("settings");
    assert_eq!(settings.timeout_secs, 30);
}

#[test]
fn zero_timeout_is_ignored() {
    let settings = load_settings_from(Some("timeout_secs = 0"), env_from(&[])).expect("settings");
    assert_eq!(settings.timeout_secs, 30);

    let settings = load_settings_from(
        Some("timeout_secs = 12"),
        env_from(&[("APP__TIMEOUT_SECS", "0")]),
    )
    .expect("settings");
    assert_eq!(settings.timeout_secs, 12);
}

#[test]
fn api_config_refuses_zero_timeout() {
    let settings = Settings {
        api_url: Some("http://localhost:9000/api".into()),
        timeout_secs: 0,
        ..Settings::default()
    };
    assert!(settings.api_config().is_err());
}

#[test]
fn unknown_file_keys_are_rejected() {
    assert!(load_settings_from(Some("api_ulr = \"typo\""), env_from(&[])).is_err());
}

#[test]
fn api_config_carries_key_timeout_and_batch_flag() {
    let settings = Settings {
        api_url: Some("http://localhost:9000/api".into()),
        api_key: Some("k".into()),
        page_size: 10,
        timeout_secs: 5,
        batch_delete: true,
    };
    let config = settings.api_config().expect("api config");
    assert_eq!(config.base_url.as_str(), "http://localhost:9000/api");
    assert_eq!(config.api_key.as_deref(), Some("k"));
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert!(config.batch_delete);
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("company_admin_missing_{suffix}.toml"));

    let settings = load_settings(&path).expect("settings");
    assert_eq!(settings.page_size, Settings::default().page_size);
}

#[test]
fn reads_settings_from_file_on_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("company_admin_test_{suffix}.toml"));
    fs::write(&path, "page_size = 7\n").expect("write config");

    let settings = load_settings(&path).expect("settings");
    assert_eq!(settings.page_size, 7);

    fs::remove_file(path).expect("cleanup");
}
