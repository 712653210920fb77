use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to create a test command isolated from the user's environment
fn ec2ctl() -> Command {
    let mut cmd = Command::cargo_bin("ec2ctl").unwrap();
    cmd.env_remove("EC2CTL_PROFILE")
        .env_remove("EC2CTL_CONFIG_FILE")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// A command bound to a config file inside a fresh temp dir
fn with_config() -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    (temp_dir, config_path)
}

fn ec2ctl_at(config_path: &std::path::Path) -> Command {
    let mut cmd = ec2ctl();
    cmd.arg("--config-file").arg(config_path);
    cmd
}

#[test]
fn test_help_flag() {
    ec2ctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("EC2 instance control"))
        .stdout(predicate::str::contains("EXAMPLES:"));
}

#[test]
fn test_help_short_flag() {
    ec2ctl()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    ec2ctl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ec2ctl"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_command() {
    ec2ctl()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "ec2ctl {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json() {
    ec2ctl()
        .args(["-o", "json", "version"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"ec2ctl\""));
}

#[test]
fn test_no_args_shows_help() {
    ec2ctl()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_invalid_subcommand() {
    ec2ctl()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_instance_help() {
    ec2ctl()
        .args(["instance", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("terminate"))
        .stdout(predicate::str::contains("launch"));
}

#[test]
fn test_instance_stop_help_shows_wait_flags() {
    ec2ctl()
        .args(["instance", "stop", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--wait"))
        .stdout(predicate::str::contains("--wait-timeout"))
        .stdout(predicate::str::contains("--force"));
}

#[test]
fn test_key_pair_aliases() {
    for alias in ["key-pair", "key", "kp"] {
        ec2ctl()
            .args([alias, "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("create"));
    }
}

#[test]
fn test_template_create_help() {
    ec2ctl()
        .args(["template", "create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--interactive"))
        .stdout(predicate::str::contains("--image-id"));
}

#[test]
fn test_network_help() {
    ec2ctl()
        .args(["network", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("security-groups"));
}

#[test]
fn test_instance_start_requires_an_id() {
    ec2ctl()
        .args(["instance", "start"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_wait_timeout_requires_wait() {
    ec2ctl()
        .args(["instance", "stop", "i-0abc", "--wait-timeout", "60"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--wait"));
}

#[test]
fn test_zero_wait_interval_is_a_usage_error() {
    ec2ctl()
        .args(["instance", "stop", "i-0abc", "--wait", "--wait-interval", "0"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--wait-interval"));

    ec2ctl()
        .args(["profile", "set", "seoul", "--wait-interval", "0"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_template_create_requires_image_without_interactive() {
    ec2ctl()
        .args(["template", "create", "web"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--image-id"));
}

#[test]
fn test_invalid_output_format() {
    ec2ctl()
        .args(["-o", "xml", "profile", "list"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_profile_list_empty() {
    let (_dir, config_path) = with_config();
    ec2ctl_at(&config_path)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profiles configured"));
}

#[test]
fn test_profile_path_follows_config_file() {
    let (_dir, config_path) = with_config();
    ec2ctl_at(&config_path)
        .args(["profile", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_profile_set_then_show() {
    let (_dir, config_path) = with_config();

    ec2ctl_at(&config_path)
        .args([
            "profile",
            "set",
            "seoul",
            "--region",
            "ap-northeast-2",
            "--aws-profile",
            "work",
            "--image",
            "Amazon Linux 2023=ami-0c9c942bd7bf113a2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("created successfully"))
        .stdout(predicate::str::contains("default profile"));

    let saved = std::fs::read_to_string(&config_path).unwrap();
    assert!(saved.contains("default_profile = \"seoul\""));
    assert!(saved.contains("ap-northeast-2"));
    assert!(saved.contains("ami-0c9c942bd7bf113a2"));

    ec2ctl_at(&config_path)
        .args(["-o", "json", "profile", "show", "seoul"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"aws_profile\": \"work\""))
        .stdout(predicate::str::contains("\"is_default\": true"));
}

#[test]
fn test_profile_set_updates_only_given_fields() {
    let (_dir, config_path) = with_config();

    ec2ctl_at(&config_path)
        .args(["profile", "set", "seoul", "--region", "ap-northeast-2"])
        .assert()
        .success();
    ec2ctl_at(&config_path)
        .args(["profile", "set", "seoul", "--wait-timeout", "900"])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated successfully"));

    ec2ctl_at(&config_path)
        .args(["-o", "json", "profile", "show", "seoul"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ap-northeast-2"))
        .stdout(predicate::str::contains("\"timeout_secs\": 900"));
}

#[test]
fn test_profile_set_rejects_invalid_values() {
    let (_dir, config_path) = with_config();

    ec2ctl_at(&config_path)
        .args(["profile", "set", "local", "--endpoint-url", "localhost:4566"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("endpoint_url"));

    ec2ctl_at(&config_path)
        .args(["profile", "set", "bad", "--image", "Ubuntu=img-123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ami-"));

    assert!(!config_path.exists());
}

#[test]
fn test_profile_set_image_needs_key_value() {
    ec2ctl()
        .args(["profile", "set", "seoul", "--image", "ami-0aaa"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn test_profile_list_and_query() {
    let (_dir, config_path) = with_config();

    for (name, region) in [("seoul", "ap-northeast-2"), ("virginia", "us-east-1")] {
        ec2ctl_at(&config_path)
            .args(["profile", "set", name, "--region", region])
            .assert()
            .success();
    }

    ec2ctl_at(&config_path)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seoul"))
        .stdout(predicate::str::contains("virginia"));

    ec2ctl_at(&config_path)
        .args(["profile", "list", "-q", "[?is_default].name"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"seoul\""))
        .stdout(predicate::str::contains("virginia").not());
}

#[test]
fn test_profile_default_and_remove() {
    let (_dir, config_path) = with_config();

    for name in ["seoul", "virginia"] {
        ec2ctl_at(&config_path)
            .args(["profile", "set", name, "--region", "us-east-1"])
            .assert()
            .success();
    }

    ec2ctl_at(&config_path)
        .args(["profile", "default", "virginia"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default profile set to 'virginia'"));

    ec2ctl_at(&config_path)
        .args(["profile", "remove", "virginia", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default profile cleared"));

    let saved = std::fs::read_to_string(&config_path).unwrap();
    assert!(!saved.contains("virginia"));
    assert!(!saved.contains("default_profile"));
}

#[test]
fn test_profile_missing_names_fail() {
    let (_dir, config_path) = with_config();

    ec2ctl_at(&config_path)
        .args(["profile", "show", "nowhere"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Profile 'nowhere' not found"));

    ec2ctl_at(&config_path)
        .args(["profile", "default", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    ec2ctl_at(&config_path)
        .args(["profile", "remove", "nowhere", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_profile_validate() {
    let (_dir, config_path) = with_config();

    ec2ctl_at(&config_path)
        .args(["profile", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("does not exist"));

    ec2ctl_at(&config_path)
        .args(["profile", "set", "seoul", "--region", "ap-northeast-2"])
        .assert()
        .success();

    ec2ctl_at(&config_path)
        .args(["-o", "json", "profile", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"overall_valid\": true"))
        .stdout(predicate::str::contains("\"profile_count\": 1"));
}

#[test]
fn test_unknown_profile_flag_fails_before_any_call() {
    let (_dir, config_path) = with_config();
    ec2ctl_at(&config_path)
        .args(["--profile", "nowhere", "instance", "ids"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Profile 'nowhere' not found"));
}

#[test]
fn test_completions_bash() {
    ec2ctl()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ec2ctl"));
}

#[test]
fn test_completions_invalid_shell() {
    ec2ctl()
        .args(["completions", "tcsh"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_config_file_from_environment() {
    let (_dir, config_path) = with_config();

    ec2ctl()
        .env("EC2CTL_CONFIG_FILE", &config_path)
        .args(["profile", "set", "seoul", "--region", "ap-northeast-2"])
        .assert()
        .success();

    assert!(config_path.exists());

    ec2ctl()
        .env("EC2CTL_CONFIG_FILE", &config_path)
        .env("EC2CTL_PROFILE", "nowhere")
        .args(["instance", "ids"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Profile 'nowhere' not found"));
}
