//! CLI contract tests for the `stratus` binary.

use assert_cmd::Command;

/// Env vars the config layer reads, cleared so the host environment cannot
/// leak into assertions.
const CONFIG_ENV_VARS: &[&str] = &[
    "STRATUS_LOG_LEVEL",
    "STRATUS_SHUTDOWN_TIMEOUT_SECS",
    "STRATUS_USERS_FILE",
    "STRATUS_LOGS_DIR",
    "STRATUS_WX_PROVIDER",
    "STRATUS_WX_API_KEY",
    "STRATUS_TELEGRAM_BOT_TOKEN",
];

fn stratus() -> Command {
    let mut cmd = Command::cargo_bin("stratus").expect("binary builds");
    for var in CONFIG_ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_the_subcommands() {
    let output = stratus().arg("--help").output().expect("run binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("start"));
    assert!(stdout.contains("check-config"));
}

#[test]
fn check_config_prints_file_values_with_secrets_redacted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("stratus.toml");
    std::fs::write(
        &config_path,
        r#"
[core]
log_level = "debug"

[weather]
provider = "weatherbit.io"
api_key = "sk-super-secret"

[telegram]
bot_token = "123456:token-value"
"#,
    )
    .expect("write config");

    let output = stratus()
        .env("STRATUS_CONFIG_PATH", &config_path)
        .arg("check-config")
        .output()
        .expect("run binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("log_level: \"debug\""));
    assert!(stdout.contains("provider: \"weatherbit.io\""));
    assert!(stdout.contains("__REDACTED__"));
    assert!(!stdout.contains("sk-super-secret"));
    assert!(!stdout.contains("token-value"));
}

#[test]
fn check_config_env_overrides_beat_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("stratus.toml");
    std::fs::write(&config_path, "[core]\nlog_level = \"debug\"\n").expect("write config");

    let output = stratus()
        .env("STRATUS_CONFIG_PATH", &config_path)
        .env("STRATUS_LOG_LEVEL", "trace")
        .arg("check-config")
        .output()
        .expect("run binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("log_level: \"trace\""));
}

#[test]
fn check_config_falls_back_to_defaults_without_a_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("does-not-exist.toml");

    let output = stratus()
        .env("STRATUS_CONFIG_PATH", &missing)
        .arg("check-config")
        .output()
        .expect("run binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("provider: \"weather.gov\""));
    assert!(stdout.contains("users_file: \"users.json\""));
}

#[test]
fn check_config_rejects_invalid_toml() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("stratus.toml");
    std::fs::write(&config_path, "core = not valid toml [").expect("write config");

    let output = stratus()
        .env("STRATUS_CONFIG_PATH", &config_path)
        .arg("check-config")
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse config TOML"));
}
