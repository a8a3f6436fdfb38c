use std::io::Write;
use std::process::Output;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::time::timeout;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Run the binary to completion with `config_path` and `args`.
async fn run_cli(config_path: &std::path::Path, args: &[&str]) -> Output {
    let child = tokio::process::Command::new(env!("CARGO_BIN_EXE_dragnet"))
        .args(args)
        .env("DRAGNET_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .output();

    timeout(Duration::from_secs(20), child)
        .await
        .expect("CLI did not exit in time")
        .expect("Failed to run CLI")
}

#[tokio::test]
async fn test_missing_query_fails_with_usage() {
    let config = write_config("");
    let output = run_cli(config.path(), &[]).await;

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage: dragnet"), "stderr: {}", stderr);
}

#[tokio::test]
async fn test_help_exits_successfully() {
    let output = run_cli(std::path::Path::new("/nonexistent/dragnet.toml"), &["--help"]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: dragnet"), "stdout: {}", stdout);
    assert!(stdout.contains("--metrics"), "stdout: {}", stdout);
}

#[tokio::test]
async fn test_missing_config_file_fails() {
    let output = run_cli(std::path::Path::new("/nonexistent/dragnet.toml"), &["sintel"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load config"), "stderr: {}", stderr);
}

#[tokio::test]
async fn test_invalid_config_fails_validation() {
    let config = write_config(
        r#"
[search]
max_results = 0
"#,
    );
    let output = run_cli(config.path(), &["sintel"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("validation failed"), "stderr: {}", stderr);
}

#[tokio::test]
async fn test_no_sources_fails() {
    let config = write_config(
        r#"
[search]
timeout_secs = 2
"#,
    );
    let output = run_cli(config.path(), &["sintel"]).await;

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No usable sources"), "stderr: {}", stderr);
}

#[tokio::test]
async fn test_url_without_resolver_fails() {
    let config = write_config("");
    let output = run_cli(config.path(), &["https://vimeo.com/76979871"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No [resolver] configured"), "stderr: {}", stderr);
}
