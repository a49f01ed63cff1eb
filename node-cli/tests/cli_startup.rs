use std::process::Command;

fn run_fleet_node(args: &[&str], config_dir: &std::path::Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_fleet-node"))
        .args(args)
        .env("NODE_CONFIG_DIR", config_dir)
        .output()
        .expect("failed to run fleet-node binary")
}

#[test]
fn cli_help_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_fleet_node(&["--help"], dir.path());
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("fleet-node"));
    assert!(stdout.contains("--once"));
}

#[test]
fn cli_once_runs_every_ticker_and_exits() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_fleet_node(&["--once"], dir.path());
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn cli_once_is_idempotent_across_repeated_runs() {
    let dir = tempfile::tempdir().unwrap();
    let first = run_fleet_node(&["--once"], dir.path());
    assert!(first.status.success());
    let second = run_fleet_node(&["--once"], dir.path());
    assert!(second.status.success());
}
