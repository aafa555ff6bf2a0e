use cadence_test::core::config::{Settings, load_config};
use cadence_test::log_filter;
use cadence_test::recur::{RecurrenceEngine, SeriesTimezone};

#[test_log::test]
fn test_engine_and_timezone_from_settings() {
    let settings = Settings::from_toml_str(
        r#"
        [engine]
        default_timezone = "America/Chicago"
        max_batch = 2
        "#,
    )
    .expect("valid settings");

    let engine = RecurrenceEngine::from_config(&settings.engine).expect("valid engine config");
    let tz = SeriesTimezone::from_config(&settings.engine).expect("known zone");

    assert_eq!(engine.max_batch(), 2);
    assert_eq!(tz.name(), "America/Chicago");
}

#[test]
fn test_unknown_default_timezone_surfaces() {
    let settings = Settings::from_toml_str("[engine]\ndefault_timezone = \"Atlantis/Capital\"\n")
        .expect("document itself is valid");
    assert!(SeriesTimezone::from_config(&settings.engine).is_err());
}

#[test]
fn test_log_filter_follows_configured_level() {
    let settings =
        Settings::from_toml_str("[logging]\nlevel = \"cadence_recur=trace\"\n").expect("valid");
    let filter = log_filter(&settings.logging).expect("valid directive");
    assert_eq!(filter.to_string(), "cadence_recur=trace");

    let defaults = Settings::from_toml_str("").expect("defaults");
    assert_eq!(log_filter(&defaults.logging).expect("default level").to_string(), "info");

    let bad = Settings::from_toml_str("[logging]\nlevel = \"cadence_recur=loud\"\n").expect("valid");
    assert!(log_filter(&bad.logging).is_err());
}

#[test_log::test]
fn test_load_config_layers_environment_over_defaults() {
    // SAFETY: no other test in this binary reads or writes CADENCE_* variables.
    unsafe {
        std::env::set_var("CADENCE_ENGINE__MAX_BATCH", "42");
        std::env::set_var("CADENCE_LOGGING__LEVEL", "debug");
    }
    let loaded = load_config();
    unsafe {
        std::env::remove_var("CADENCE_ENGINE__MAX_BATCH");
        std::env::remove_var("CADENCE_LOGGING__LEVEL");
    }

    let settings = loaded.expect("environment overrides should load");
    assert_eq!(settings.engine.max_batch, 42);
    assert_eq!(settings.engine.default_timezone, "UTC");
    assert_eq!(settings.logging.level, "debug");
}
