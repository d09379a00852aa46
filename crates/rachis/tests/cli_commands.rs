#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "rachis-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn rachis(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rachis"))
        .args(["--log-level", "error"])
        .args(args)
        .env_remove("RACHIS_VIEWER_ORIGIN")
        .output()
        .expect("rachis should run")
}

#[test]
fn version_prints_package_version() {
    let output = rachis(&["--format", "pretty", "version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("rachis {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_extended_json_lists_protocol_events() {
    let output = rachis(&["--format", "json", "version", "--extended"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"name\":\"rachis\""));
    assert!(stdout.contains("\"protocol_events\":[\"SESSION_PROPOSE\""));
    assert!(stdout.contains("\"cli\""));
}

#[test]
fn info_reports_default_viewer() {
    let output = rachis(&["--format", "json", "info"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"trusted_origin\":\"https://view.qiime2.org\""));
    assert!(stdout.contains("\"max_proposals\":200"));
    assert!(stdout.contains("\"negotiation_budget_ms\":2000"));
    assert!(stdout.contains("application/vnd.rachis.archive+zip"));
    assert!(stdout.contains("\"safe\":true"));
}

#[test]
fn info_honours_origin_env() {
    let output = Command::new(env!("CARGO_BIN_EXE_rachis"))
        .args(["--log-level", "error", "--format", "raw", "info"])
        .env("RACHIS_VIEWER_ORIGIN", "http://localhost:8080/viewer/")
        .output()
        .expect("rachis should run");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "http://localhost:8080"
    );
}

#[test]
fn info_rejects_opaque_origin() {
    let output = rachis(&["info", "--origin", "data:text/html,hi"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn simulate_delivers_archive_and_resizes() {
    let dir = unique_temp_dir("simulate");
    let file = dir.join("demo.qzv");
    std::fs::write(&file, b"PK\x03\x04 demo visualization").expect("archive should be writable");

    let output = rachis(&[
        "--format",
        "json",
        "simulate",
        file.to_str().expect("utf-8 path"),
        "--ignore-proposals",
        "2",
        "--interval",
        "1ms",
        "--height",
        "300",
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"delivered\":true"));
    assert!(stdout.contains("\"archive_bytes\":23"));
    assert!(stdout.contains("\"received_bytes\":23"));
    assert!(stdout.contains("\"container_height\":\"350px\""));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_silent_viewer_returns_124() {
    let dir = unique_temp_dir("silent");
    let file = dir.join("table.qza");
    std::fs::write(&file, b"PK\x03\x04").expect("archive should be writable");

    let output = rachis(&[
        "simulate",
        file.to_str().expect("utf-8 path"),
        "--silent",
        "--interval",
        "1ms",
        "--max-proposals",
        "10",
    ]);

    assert_eq!(output.status.code(), Some(124));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("did not respond after 10 proposals"), "{stderr}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_rejects_non_archive_file() {
    let dir = unique_temp_dir("notarchive");
    let file = dir.join("notes.txt");
    std::fs::write(&file, b"hello").expect("file should be writable");

    let output = rachis(&["simulate", file.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_writes_bytes() {
    let dir = unique_temp_dir("decode");
    let payload = dir.join("payload.b64");
    let out = dir.join("out.qza");
    // "PK\x03\x04hello" wrapped across lines.
    std::fs::write(&payload, "UEsDBGhl\nbGxv\n").expect("payload should be writable");

    let output = rachis(&[
        "--format",
        "json",
        "decode",
        payload.to_str().expect("utf-8 path"),
        "--out",
        out.to_str().expect("utf-8 path"),
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"bytes\":9"));
    assert!(stdout.contains("\"zip_signature\":true"));
    assert_eq!(
        std::fs::read(&out).expect("output should exist"),
        b"PK\x03\x04hello"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_invalid_payload_returns_60() {
    let dir = unique_temp_dir("badpayload");
    let payload = dir.join("payload.b64");
    std::fs::write(&payload, "UEsD*BA==").expect("payload should be writable");

    let output = rachis(&["decode", payload.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_missing_file_is_usage_error() {
    let output = rachis(&["decode", "/nonexistent/rachis/payload.b64"]);
    assert_eq!(output.status.code(), Some(64));
}
