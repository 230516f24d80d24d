use std::{fs, process::Command};

#[test]
fn short_session_prints_a_summary() {
    let output = Command::new(env!("CARGO_BIN_EXE_crystal-siege"))
        .args(["--seconds", "5", "--seed", "7"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch crystal-siege binary");

    assert!(output.status.success(), "session should finish cleanly");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("frames=313"), "unexpected summary: {stdout}");
}

#[test]
fn invalid_config_file_fails() {
    let path = std::env::temp_dir().join("crystal-siege-invalid-session.toml");
    fs::write(&path, "[session]\ntick_ms = 0\n").expect("temp config written");

    let output = Command::new(env!("CARGO_BIN_EXE_crystal-siege"))
        .arg("--config")
        .arg(&path)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to launch crystal-siege binary");
    let _ = fs::remove_file(&path);

    assert!(!output.status.success(), "zero tick length must be rejected");
}
