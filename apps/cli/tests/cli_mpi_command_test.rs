//! Integration tests for `smchainer mpi-command`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Lay out `input/config/` under a temp base directory.
fn write_job(temp_dir: &TempDir, resource_config: &str, hyperparameters: &str) {
    let config_dir = temp_dir.path().join("input").join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("resourceconfig.json"), resource_config).unwrap();
    fs::write(config_dir.join("hyperparameters.json"), hyperparameters).unwrap();
}

fn smchainer(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("smchainer").unwrap();
    cmd.arg("--base-dir").arg(temp_dir.path()).env("SM_NUM_GPUS", "0");
    cmd
}

#[test]
fn test_mpi_command_lists_every_host() {
    let temp_dir = TempDir::new().unwrap();
    write_job(
        &temp_dir,
        r#"{"current_host": "algo-1", "hosts": ["algo-2", "algo-1"], "network_interface_name": "eth0"}"#,
        "{}",
    );

    smchainer(&temp_dir)
        .arg("mpi-command")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("mpirun --allow-run-as-root --host algo-2,algo-1 "))
        .stdout(predicate::str::contains("btl_tcp_if_include eth0"))
        .stdout(predicate::str::contains("-np 2 python -m chainer_framework.run_training"));
}

#[test]
fn test_mpi_command_uses_gpu_slots() {
    let temp_dir = TempDir::new().unwrap();
    write_job(&temp_dir, r#"{"current_host": "algo-2", "hosts": ["algo-1", "algo-2"]}"#, "{}");

    smchainer(&temp_dir)
        .env("SM_NUM_GPUS", "4")
        .arg("mpi-command")
        .assert()
        .success()
        .stdout(predicate::str::contains("--host algo-1:4,algo-2:4"))
        .stdout(predicate::str::contains("NCCL_SOCKET_IFNAME=ethwe"))
        .stdout(predicate::str::contains("-np 8"));
}

#[test]
fn test_mpi_command_respects_hyperparameters() {
    let temp_dir = TempDir::new().unwrap();
    write_job(
        &temp_dir,
        r#"{"current_host": "algo-1", "hosts": ["algo-1", "algo-2"]}"#,
        r#"{"process_slots_per_host": "2", "num_processes": "3"}"#,
    );

    let output = smchainer(&temp_dir).arg("mpi-command").arg("--json").output().unwrap();
    assert!(output.status.success());

    let argv: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(argv[0], "mpirun");
    let np = argv.iter().position(|a| a == "-np").unwrap();
    assert_eq!(argv[np + 1], "3");
    assert!(argv.contains(&"algo-1:2,algo-2:2".to_string()));
}

#[test]
fn test_mpi_command_entry_override_from_env() {
    let temp_dir = TempDir::new().unwrap();
    write_job(&temp_dir, r#"{"current_host": "algo-1", "hosts": ["algo-1", "algo-2"]}"#, "{}");

    smchainer(&temp_dir)
        .env("SMCHAINER_ENTRY_COMMAND", "python3 train.py")
        .env("SMCHAINER_MPIRUN_PROGRAM", "/usr/local/bin/mpirun")
        .arg("mpi-command")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("/usr/local/bin/mpirun "))
        .stdout(predicate::str::ends_with("-np 2 python3 train.py\n"));
}

#[test]
fn test_mpi_command_rejects_zero_slots() {
    let temp_dir = TempDir::new().unwrap();
    write_job(
        &temp_dir,
        r#"{"current_host": "algo-1", "hosts": ["algo-1", "algo-2"]}"#,
        r#"{"process_slots_per_host": "0"}"#,
    );

    smchainer(&temp_dir)
        .arg("mpi-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("process_slots_per_host"));
    assert!(!temp_dir.path().join("output").join("failure").exists());
}
