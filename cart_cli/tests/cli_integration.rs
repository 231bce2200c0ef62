use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use assert_cmd::Command;
use tempfile::tempdir;

// Fast timings so a bounded run gets past the splash screen.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sensor]
mode = "scripted"
window = 64
sample_rate_hz = 100

[follow]
sample_period_ms = 20
worry_ms = 40
lost_ms = 120

[ui]
tick_ms = 10
init_ms = 0

[network]
uplink_enabled = false
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn cart() -> Command {
    Command::cargo_bin("cart").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["run", "--max-ticks", "5"], 0, "MyCart!", "stdout")]
#[case(&["run", "--max-ticks", "5"], 0, "cart stopped after 5 ticks", "stderr")]
#[case(&["bogus"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = cart();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn quit_key_ends_the_run_on_the_goodbye_screen() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    cart()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--max-ticks", "500"])
        .write_stdin("q")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bye..."));
}

#[test]
fn keypad_starts_following() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    // Any key skips the splash, 1 on the home screen starts following.
    cart()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--max-ticks", "20"])
        .write_stdin("11")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stop  Scan  Help"));
}

#[rstest]
#[case("[ui]\ntick_ms = 0\n", "ui.tick_ms must be > 0")]
#[case("[follow]\nworry_ms = 5000\nlost_ms = 10\n", "follow.lost_ms")]
#[case("[pins]\nled = 17\n", "pins.")]
#[case("[network]\nserver = \"localhost:80\"\n", "network.server")]
#[case("[nonsense]\nx = 1\n", "unknown field")]
fn bad_config_exits_with_config_code(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, toml).unwrap();
    cart()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(needle))
        .stderr(predicate::str::contains("How to fix"));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    cart()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("self-check")
        .assert()
        .code(2);
}

#[test]
fn bad_catalog_is_reported_as_json() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("catalog.csv");
    fs::write(&csv, "upc,name,price,weight\n123,Widget,-1.00,0.5\n").unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!("[catalog]\nfile = {:?}\n", csv.to_string_lossy()),
    )
    .unwrap();

    let out = cart()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let line = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "Config");
    assert!(v["message"].as_str().unwrap().contains("catalog"));
}

#[test]
fn self_check_json_counts_catalog_rows() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("catalog.csv");
    fs::write(
        &csv,
        "upc,name,price,weight\n111,Apple,0.50,0.3\n222,Bread,2.25,1.0\n",
    )
    .unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!("[catalog]\nfile = {:?}\n", csv.to_string_lossy()),
    )
    .unwrap();

    let out = cart()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("self-check")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(v["status"], "ok");
    assert_eq!(v["catalog_items"], 2);
    assert_eq!(v["state"], "Init");
}
