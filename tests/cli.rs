use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn portal_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_portal"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("files")).unwrap();
    fs::write(
        root.join("files").join("alpha.md"),
        "# Alpha\n\nNotes about Rust ownership.\n\nAnd a second paragraph.",
    )
    .unwrap();

    let config = format!(
        r#"[index]
dir = "{root}/data/index"

[sessions]
dir = "{root}/data/sessions"
keep_latest = 2

[llm]
active = "off"

[llm.providers.off]
provider = "disabled"
model = "none"
"#,
        root = root.display()
    );
    let config_path = root.join("config").join("portal.toml");
    fs::write(&config_path, config).unwrap();

    (tmp, config_path)
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(portal_binary())
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run portal")
}

#[test]
fn test_status_without_index() {
    let (_tmp, config) = setup_test_env();
    let out = run(&config, &["status"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("No index yet"));
}

#[test]
fn test_ask_without_index_fails() {
    let (_tmp, config) = setup_test_env();
    let out = run(&config, &["ask", "what is rust?"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no persisted index"));
}

#[test]
fn test_ingest_with_disabled_embedder_fails_without_index() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("files").join("alpha.md");
    let out = run(
        &config,
        &["ingest", file.to_str().unwrap(), "--session", "Session_cli"],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("disabled"));

    let saved = tmp
        .path()
        .join("data")
        .join("sessions")
        .join("Session_cli")
        .join("alpha.md");
    assert!(saved.is_file());
    assert!(!tmp.path().join("data").join("index").join("index.bin").exists());
}

#[test]
fn test_ingest_rejects_unsupported_file() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("files").join("image.png");
    fs::write(&file, [0u8; 8]).unwrap();
    let out = run(&config, &["ingest", file.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid file type"));
}

#[test]
fn test_sessions_clean_keeps_configured_count() {
    let (tmp, config) = setup_test_env();
    let sessions = tmp.path().join("data").join("sessions");
    for name in ["Session_1", "Session_2", "Session_3"] {
        fs::create_dir_all(sessions.join(name)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
    }

    let out = run(&config, &["sessions", "clean"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("Removed 1"));

    let out = run(&config, &["sessions", "clean", "--keep", "0"]);
    assert!(out.status.success());
    assert_eq!(fs::read_dir(&sessions).unwrap().count(), 0);
}

#[test]
fn test_analyze_with_disabled_llm_fails() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("files").join("alpha.md");
    let out = run(&config, &["analyze", file.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("analysis"));
}

#[test]
fn test_unknown_llm_override_fails() {
    let (_tmp, config) = setup_test_env();
    let out = run(&config, &["--llm", "google", "ask", "hi"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not found"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let out = run(&tmp.path().join("absent.toml"), &["status"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to read config file"));
}
