// Tests for configuration loading

use clicksweep_core::config::{DEFAULT_CONFIG, SweepConfig, expand_path};
use clicksweep_core::report::ReportLayout;
use clicksweep_scanner::{InteractabilityGate, RecoveryStrategy, VolumeScope};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Default Tests
// ============================================================================

#[test]
fn test_defaults() {
    let config = SweepConfig::default();

    assert_eq!(config.scroll_step, 800);
    assert_eq!(config.click_timeout(), Duration::from_millis(3000));
    assert_eq!(config.settle(), Duration::from_millis(1500));
    assert_eq!(config.scroll_settle(), Duration::from_millis(1000));
    assert_eq!(config.quiescence_timeout(), Duration::from_secs(15));
    assert_eq!(config.recovery, RecoveryStrategy::Reset);
    assert_eq!(config.gate, InteractabilityGate::VisibleEnabled);
    assert_eq!(config.volume_scope, VolumeScope::Global);
    assert_eq!(config.report_layout, ReportLayout::Scoped);
    assert_eq!(config.report_path, PathBuf::from("clicksweep_report.csv"));
    assert!(!config.descend);
    assert!(config.headless);
    assert!(config.nav_selector.is_none());
}

#[test]
fn test_bundled_config_matches_builtin_defaults() {
    let bundled: SweepConfig = serde_json::from_str(DEFAULT_CONFIG).unwrap();
    assert_eq!(bundled, SweepConfig::default());
}

// ============================================================================
// Parsing Tests
// ============================================================================

#[test]
fn test_partial_config_fills_in_defaults() {
    let config: SweepConfig = serde_json::from_str(
        r#"{
            "nav_selector": "header nav",
            "descend": true,
            "recovery": "back",
            "gate": "visible",
            "volume_scope": "per-scope",
            "report_layout": "paged",
            "policy": { "skip_texts": ["Logout"] }
        }"#,
    )
    .unwrap();

    assert_eq!(config.nav_selector.as_deref(), Some("header nav"));
    assert!(config.descend);
    assert_eq!(config.recovery, RecoveryStrategy::Back);
    assert_eq!(config.gate, InteractabilityGate::Visible);
    assert_eq!(config.volume_scope, VolumeScope::PerScope);
    assert_eq!(config.report_layout, ReportLayout::Paged);
    assert_eq!(config.policy.skip_texts, vec!["Logout".to_string()]);
    // Untouched policy fields keep their defaults.
    assert_eq!(config.policy.max_words, 3);
    assert_eq!(config.scroll_step, 800);
}

#[test]
fn test_unknown_enum_value_is_rejected() {
    let result: Result<SweepConfig, _> = serde_json::from_str(r#"{ "recovery": "teleport" }"#);
    assert!(result.is_err());
}

// ============================================================================
// File Tests
// ============================================================================

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");
    let mut config = SweepConfig::default();
    config.footer_selector = Some("footer".to_string());
    config.click_timeout_ms = 5000;

    config.save(&path).unwrap();
    let loaded = SweepConfig::load(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_load_missing_file_names_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.json");

    let err = SweepConfig::load(&path).unwrap_err();

    assert!(format!("{:#}", err).contains("missing.json"));
}

#[test]
fn test_load_invalid_json_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    let err = SweepConfig::load(&path).unwrap_err();

    assert!(err.to_string().contains("Invalid config file"));
}

#[test]
fn test_resolve_prefers_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "scroll_step": 400 }"#).unwrap();

    let config = SweepConfig::resolve(Some(&path)).unwrap();

    assert_eq!(config.scroll_step, 400);
}

#[test]
fn test_expand_path_expands_tilde() {
    if std::env::var("HOME").is_ok() {
        let expanded = expand_path("~/reports/out.csv");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("reports/out.csv"));
    }

    assert_eq!(expand_path("/tmp/out.csv"), PathBuf::from("/tmp/out.csv"));
}
