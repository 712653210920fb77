use std::fs;
use std::path::PathBuf;

use ec2ctl_core::config::{Config, ConfigError, Profile, WaitConfig};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// 1. Missing config directory / nonexistent path
// ---------------------------------------------------------------------------

#[test]
fn load_from_nonexistent_path_returns_default_config() {
    let path = PathBuf::from("/tmp/ec2ctl-test-nonexistent/does/not/exist/config.toml");
    assert!(!path.exists());

    let config = Config::load_from_path(&path).expect("should not panic or error on missing path");

    assert!(config.profiles.is_empty());
    assert!(config.default_profile.is_none());
}

// ---------------------------------------------------------------------------
// 2. Empty config file
// ---------------------------------------------------------------------------

#[test]
fn load_empty_config_file_returns_default_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();

    let config = Config::load_from_path(&config_path).expect("empty file should parse as default");

    assert!(config.profiles.is_empty());
    assert!(config.default_profile.is_none());
}

// ---------------------------------------------------------------------------
// 3. Corrupt / invalid TOML
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_toml_returns_parse_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[[[broken").unwrap();

    let result = Config::load_from_path(&config_path);
    assert!(result.is_err(), "corrupt TOML should produce an error");

    let err = result.unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("Parse"),
        "error should mention parsing: {msg}"
    );
}

// ---------------------------------------------------------------------------
// 4. Wrongly typed values
// ---------------------------------------------------------------------------

#[test]
fn load_profile_with_wrong_types_returns_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
[profiles.broken]
region = "us-east-1"

[profiles.broken.wait]
interval_secs = "fifteen"
"#;
    fs::write(&config_path, content).unwrap();

    let result = Config::load_from_path(&config_path);
    assert!(result.is_err(), "mistyped wait interval should produce an error");
}

// ---------------------------------------------------------------------------
// 5. Config with unknown / extra fields
// ---------------------------------------------------------------------------

#[test]
fn load_config_with_unknown_fields_ignores_them() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
unknown_top_level_key = "hello"

[profiles.seoul]
region = "ap-northeast-2"
totally_unknown_field = true
"#;
    fs::write(&config_path, content).unwrap();

    let config =
        Config::load_from_path(&config_path).expect("unknown fields should be silently ignored");

    assert_eq!(
        config.profiles["seoul"].region.as_deref(),
        Some("ap-northeast-2")
    );
}

// ---------------------------------------------------------------------------
// 6. Round trip through save_to_path / load_from_path
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_round_trips_profiles() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.set_profile(
        "staging".to_string(),
        Profile {
            region: Some("eu-central-1".to_string()),
            aws_profile: Some("staging-admin".to_string()),
            wait: WaitConfig {
                interval_secs: 5,
                timeout_secs: 120,
            },
            ..Default::default()
        },
    );
    config.default_profile = Some("staging".to_string());
    config.save_to_path(&config_path).unwrap();

    let loaded = Config::load_from_path(&config_path).unwrap();
    assert_eq!(loaded.default_profile.as_deref(), Some("staging"));
    assert_eq!(loaded.profiles["staging"], config.profiles["staging"]);

    let (name, profile) = loaded.resolve_profile(None).unwrap();
    assert_eq!(name.as_deref(), Some("staging"));
    assert_eq!(profile.wait.timeout_secs, 120);
}

// ---------------------------------------------------------------------------
// 7. Environment variable expansion while loading
// ---------------------------------------------------------------------------

#[test]
#[serial_test::serial]
fn load_expands_environment_variables() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[profiles.env]
region = "${EC2CTL_EDGE_REGION}"
endpoint_url = "${EC2CTL_EDGE_ENDPOINT:-http://localhost:4566}"
"#,
    )
    .unwrap();

    unsafe {
        std::env::set_var("EC2CTL_EDGE_REGION", "sa-east-1");
        std::env::remove_var("EC2CTL_EDGE_ENDPOINT");
    }

    let config = Config::load_from_path(&config_path).unwrap();
    let profile = &config.profiles["env"];
    assert_eq!(profile.region.as_deref(), Some("sa-east-1"));
    assert_eq!(
        profile.endpoint_url.as_deref(),
        Some("http://localhost:4566")
    );

    unsafe {
        std::env::remove_var("EC2CTL_EDGE_REGION");
    }
}

// ---------------------------------------------------------------------------
// 8. Values serde accepts but a profile must reject
// ---------------------------------------------------------------------------

#[test]
fn loaded_profile_with_bad_values_fails_validation() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[profiles.fast]
region = "us-east-1"

[profiles.fast.wait]
interval_secs = 0

[profiles.images]
region = "us-east-1"

[profiles.images.images]
"Ubuntu 24.04" = "img-0123"
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&config_path).unwrap();

    let err = config.profiles["fast"].validate("fast").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "wait.interval_secs"));

    let err = config.profiles["images"].validate("images").unwrap_err();
    assert!(err.to_string().contains("images.Ubuntu 24.04"));
}

// ---------------------------------------------------------------------------
// 9. Profile resolution order
// ---------------------------------------------------------------------------

#[test]
fn resolution_prefers_explicit_then_default_then_first_by_name() {
    let content = r#"
[profiles.virginia]
region = "us-east-1"

[profiles.seoul]
region = "ap-northeast-2"
"#;
    let mut config: Config = toml::from_str(content).unwrap();

    let (name, _) = config.resolve_profile(None).unwrap();
    assert_eq!(name.as_deref(), Some("seoul"));

    config.default_profile = Some("virginia".to_string());
    let (name, profile) = config.resolve_profile(None).unwrap();
    assert_eq!(name.as_deref(), Some("virginia"));
    assert_eq!(profile.region.as_deref(), Some("us-east-1"));

    let (name, _) = config.resolve_profile(Some("seoul")).unwrap();
    assert_eq!(name.as_deref(), Some("seoul"));

    let err = config.resolve_profile(Some("oregon")).unwrap_err();
    assert!(matches!(err, ConfigError::ProfileNotFound { ref name } if name == "oregon"));
}

#[test]
fn dangling_default_profile_is_an_error() {
    let config: Config = toml::from_str(
        r#"
default_profile = "gone"

[profiles.seoul]
region = "ap-northeast-2"
"#,
    )
    .unwrap();

    assert!(matches!(
        config.resolve_profile(None),
        Err(ConfigError::ProfileNotFound { .. })
    ));
}

#[test]
fn no_profiles_resolves_to_builtin_defaults() {
    let (name, profile) = Config::default().resolve_profile(None).unwrap();
    assert!(name.is_none());
    assert_eq!(profile.wait, WaitConfig::default());
    assert!(profile.retry.enabled);
    assert_eq!(profile.retry.max_attempts, 3);
}

// ---------------------------------------------------------------------------
// 10. Output directory
// ---------------------------------------------------------------------------

#[test]
#[serial_test::serial]
fn output_dir_expands_home() {
    let home = TempDir::new().unwrap();
    let previous = std::env::var_os("HOME");
    unsafe {
        std::env::set_var("HOME", home.path());
    }

    let profile = Profile {
        output_dir: Some("~/ec2".to_string()),
        ..Default::default()
    };
    assert_eq!(profile.output_dir(), home.path().join("ec2"));

    unsafe {
        match previous {
            Some(value) => std::env::set_var("HOME", value),
            None => std::env::remove_var("HOME"),
        }
    }
}
