//! Tests for configuration layering: defaults, `.worklog.toml`, environment
//! and command-line overrides.
//!
//! Note: These tests modify process environment variables and must run
//! serially to avoid race conditions.

mod common;

use common::TestWorkspace;
use serial_test::serial;
use worklog::config::{CommitTarget, Config, Overrides, TrackingMode};
use worklog::error::ConfigError;

const ENV_VARS: [&str; 6] = [
    "WORKLOG_INTERVAL_SECS",
    "WORKLOG_API_KEY",
    "GEMINI_API_KEY",
    "WORKLOG_MODEL",
    "WORKLOG_API_BASE",
    "WORKLOG_TIMEOUT_SECS",
];

/// Run `f` with every config variable unset except the given ones.
fn with_env<F: FnOnce()>(set: &[(&str, &str)], f: F) {
    let vars: Vec<(&str, Option<&str>)> = ENV_VARS
        .iter()
        .map(|name| {
            let value = set.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
            (*name, value)
        })
        .collect();
    temp_env::with_vars(vars, f);
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    let workspace = TestWorkspace::new();
    with_env(&[], || {
        let config = Config::load(&workspace.root, &Overrides::default()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.shadow_root(&workspace.root), workspace.shadow_root());
    });
}

#[test]
#[serial]
fn test_file_values_are_applied() {
    let workspace = TestWorkspace::new();
    workspace.write(
        ".worklog.toml",
        r#"
interval_secs = 300
tracking = "status"
use_diffs = true
ignore = ["*.log", "tmp/"]

[generator]
model = "gemini-2.0-flash"
"#,
    );

    with_env(&[], || {
        let config = Config::load(&workspace.root, &Overrides::default()).unwrap();
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.tracking, TrackingMode::Status);
        assert_eq!(config.target, CommitTarget::Shadow);
        assert!(config.use_diffs);
        assert_eq!(config.ignore, vec!["*.log", "tmp/"]);
        assert_eq!(config.generator.model, "gemini-2.0-flash");
        assert_eq!(config.generator.api_key, None);
    });
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let workspace = TestWorkspace::new();
    workspace.write(".worklog.toml", "interval_secs = 300\n");

    with_env(
        &[
            ("WORKLOG_INTERVAL_SECS", "120"),
            ("WORKLOG_MODEL", "gemini-pro"),
            ("WORKLOG_API_BASE", "http://localhost:9999"),
        ],
        || {
            let config = Config::load(&workspace.root, &Overrides::default()).unwrap();
            assert_eq!(config.interval_secs, 120);
            assert_eq!(config.generator.model, "gemini-pro");
            assert_eq!(config.generator.api_base, "http://localhost:9999");
        },
    );
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    let workspace = TestWorkspace::new();
    with_env(&[("WORKLOG_INTERVAL_SECS", "120")], || {
        let overrides = Overrides {
            interval_secs: Some(10),
            target: Some(CommitTarget::InPlace),
            ..Default::default()
        };
        let config = Config::load(&workspace.root, &overrides).unwrap();
        assert_eq!(config.interval_secs, 10);
        assert_eq!(config.target, CommitTarget::InPlace);
    });
}

#[test]
#[serial]
fn test_invalid_env_number_keeps_file_value() {
    let workspace = TestWorkspace::new();
    workspace.write(".worklog.toml", "interval_secs = 300\n");

    with_env(
        &[
            ("WORKLOG_INTERVAL_SECS", "five minutes"),
            ("WORKLOG_TIMEOUT_SECS", "-1"),
        ],
        || {
            let config = Config::load(&workspace.root, &Overrides::default()).unwrap();
            assert_eq!(config.interval_secs, 300);
            assert_eq!(config.generator.timeout_secs, 30);
        },
    );
}

#[test]
#[serial]
fn test_gemini_key_is_a_fallback() {
    let workspace = TestWorkspace::new();

    with_env(&[("GEMINI_API_KEY", "gemini-key")], || {
        let config = Config::load(&workspace.root, &Overrides::default()).unwrap();
        assert_eq!(config.generator.api_key.as_deref(), Some("gemini-key"));
    });

    with_env(
        &[("GEMINI_API_KEY", "gemini-key"), ("WORKLOG_API_KEY", "own-key")],
        || {
            let config = Config::load(&workspace.root, &Overrides::default()).unwrap();
            assert_eq!(config.generator.api_key.as_deref(), Some("own-key"));
        },
    );

    with_env(&[("WORKLOG_API_KEY", "   ")], || {
        let config = Config::load(&workspace.root, &Overrides::default()).unwrap();
        assert_eq!(config.generator.api_key, None);
    });
}

#[test]
#[serial]
fn test_zero_interval_from_cli_is_rejected() {
    let workspace = TestWorkspace::new();
    with_env(&[], || {
        let overrides = Overrides {
            interval_secs: Some(0),
            ..Default::default()
        };
        let result = Config::load(&workspace.root, &overrides);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    });
}

#[test]
#[serial]
fn test_malformed_file_reports_path() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(".worklog.toml", "interval_secs = \"often\"\n");

    with_env(&[], || {
        match Config::load(&workspace.root, &Overrides::default()) {
            Err(ConfigError::ParseFailed { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse failure, got {other:?}"),
        }
    });
}

#[test]
#[serial]
fn test_empty_shadow_dir_is_rejected() {
    let workspace = TestWorkspace::new();
    workspace.write(".worklog.toml", "shadow_dir = \"  \"\n");

    with_env(&[], || {
        let result = Config::load(&workspace.root, &Overrides::default());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    });
}

#[test]
#[serial]
fn test_zero_timeout_is_rejected() {
    let workspace = TestWorkspace::new();

    with_env(&[("WORKLOG_TIMEOUT_SECS", "0")], || {
        let result = Config::load(&workspace.root, &Overrides::default());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    });

    workspace.write(".worklog.toml", "[generator]\ntimeout_secs = 0\n");
    with_env(&[], || {
        let result = Config::load(&workspace.root, &Overrides::default());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    });
}
