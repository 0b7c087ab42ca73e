use super::*;

use std::collections::HashMap;

#[test]
fn defaults_keep_everything_in_memory() {
    let settings = Settings::default();
    assert_eq!(settings.database_url, "sqlite::memory:");
    assert_eq!(settings.currency_symbol, "₹");
    assert!(settings.enforce_transitions);
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/market.db"),
        "sqlite://./data/market.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:./data/market.db"),
        "sqlite://./data/market.db"
    );
    assert_eq!(normalize_database_url("  "), "sqlite::memory:");
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
            currency_symbol = "$"
            enforce_transitions = false
        "#,
    )
    .expect("parse");
    assert_eq!(settings.currency_symbol, "$");
    assert!(!settings.enforce_transitions);
    assert_eq!(settings.quantity_unit, "kg");
}

#[test]
fn unknown_file_keys_are_rejected() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "bind_addr = \"0.0.0.0:1\"").is_err());
}

#[test]
fn env_overrides_win_and_bad_bools_are_ignored() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("FARMCONNECT__DATABASE_URL", "./market.db"),
        ("FARMCONNECT__ENFORCE_TRANSITIONS", "maybe"),
        ("FARMCONNECT__LOG_FILTER", "debug"),
    ]);
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings, |key| env.get(key).map(|v| v.to_string()));

    assert_eq!(settings.database_url, "./market.db");
    assert!(settings.enforce_transitions);
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn explicit_config_file_must_exist() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.toml");
    assert!(load_settings(Some(&missing)).is_err());

    let present = dir.path().join("farmconnect.toml");
    fs::write(&present, "quantity_unit = \"quintal\"\n").expect("write");
    let settings = load_settings(Some(&present)).expect("load");
    assert_eq!(settings.quantity_unit, "quintal");
}
