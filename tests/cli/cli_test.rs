//! CLI contract tests.

use assert_cmd::Command;

fn superexpat(home: &std::path::Path) -> Command {
    let mut cmd = match Command::cargo_bin("superexpat") {
        Ok(cmd) => cmd,
        Err(err) => panic!("binary should build: {err}"),
    };
    cmd.env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("SUPEREXPAT_LOG_LEVEL");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = match cmd.output() {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };
    assert!(output.status.success(), "command failed: {output:?}");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn categories_lists_every_topic_with_questions() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let stdout = stdout_of(superexpat(home.path()).arg("categories"));

    assert!(stdout.contains("💰 Cost of Living (cost_of_living)"));
    assert!(stdout.contains("🏠 Housing (housing_availability)"));
    assert!(stdout.contains("    - Do I need a work permit?"));
}

#[test]
fn countries_search_filters_by_name() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let stdout = stdout_of(superexpat(home.path()).args(["countries", "--search", "neth"]));

    assert!(stdout.contains("NL  Netherlands"));
    assert!(!stdout.contains("Indonesia"));
}

#[test]
fn init_writes_private_runtime_files() {
    let home = tempfile::tempdir().expect("should create temp dir");
    stdout_of(superexpat(home.path()).arg("init"));

    let root = home.path().join(".superexpat");
    let config = std::fs::read_to_string(root.join("config.toml")).expect("config written");
    assert!(config.contains("openai/gpt-3.5-turbo"));

    let env_file = root.join(".env");
    assert!(env_file.exists());
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&env_file)
            .expect("env file metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn chat_without_api_key_fails_cleanly() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let output = match superexpat(home.path())
        .args(["chat", "--country", "NL"])
        .env_remove("OPENROUTER_API_KEY")
        .write_stdin("")
        .output()
    {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("OPENROUTER_API_KEY"));
}

#[test]
fn chat_rejects_unknown_country() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let output = match superexpat(home.path())
        .args(["chat", "--country", "FR"])
        .write_stdin("")
        .output()
    {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown country code 'FR'"));
}

#[test]
fn chat_keeps_info_logs_out_of_the_terminal() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let output = match superexpat(home.path())
        .args(["chat", "--country", "NL", "--category", "climate"])
        .env("OPENROUTER_API_KEY", "sk-or-v1-test")
        .env("SUPEREXPAT_BASE_URL", "http://127.0.0.1:9/v1/chat/completions")
        .write_stdin("/suggest\n/quit\n")
        .output()
    {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    };
    assert!(output.status.success(), "chat failed: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("/1 What's the weather like throughout the year?"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        !stderr.contains("assistant session started"),
        "info events leaked to stderr: {stderr}"
    );

    let logs_dir = home.path().join(".superexpat").join("logs");
    let entries = std::fs::read_dir(&logs_dir).expect("logs dir created");
    let logged: String = entries
        .filter_map(Result::ok)
        .filter_map(|entry| std::fs::read_to_string(entry.path()).ok())
        .collect();
    assert!(logged.contains("assistant session started"));
}
