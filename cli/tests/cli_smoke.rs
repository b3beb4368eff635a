use assert_cmd::Command;
use mock_server::KvStore;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn start_server(store: KvStore) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_store(listener, store).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn consulkv(host: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_consulkv"));
    cmd.env_clear()
        .env("CONSULKV_HOST_URL", host)
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn help_works() {
    Command::new(env!("CARGO_BIN_EXE_consulkv"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Consul K/V"));
}

#[test]
fn write_then_read_prints_env_pair() {
    let host = start_server(KvStore::new());

    consulkv(&host)
        .args(["write", "--key", "test/test-key", "--value", "test-value"])
        .assert()
        .success()
        .stdout("true\n");

    consulkv(&host)
        .args(["read", "--key", "test/test-key", "--env-key", "my.nested/key"])
        .assert()
        .success()
        .stdout("my_nested_key=test-value\n");
}

#[test]
fn read_appends_to_env_file() {
    let host = start_server(KvStore::new());
    let tmp = TempDir::new().unwrap();
    let env_file = tmp.path().join("build.env");

    consulkv(&host)
        .args(["write", "--key", "app/db", "--value", "postgres://db"])
        .assert()
        .success();
    consulkv(&host)
        .arg("--env-file")
        .arg(&env_file)
        .args(["read", "--key", "app/db"])
        .assert()
        .success();

    let written = fs::read_to_string(&env_file).unwrap();
    assert_eq!(written, "app_db=postgres://db\n");
}

#[test]
fn missing_key_fails() {
    let host = start_server(KvStore::new());
    consulkv(&host)
        .args(["read", "--key", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("404"));
}

#[test]
fn write_without_value_content_fails_validation() {
    let host = start_server(KvStore::new());
    consulkv(&host)
        .args(["write", "--key", "k", "--value", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty value"));
}

#[test]
fn batch_reports_partial_failure() {
    let host = start_server(KvStore::new());
    let tmp = TempDir::new().unwrap();
    let batch = tmp.path().join("ops.json");
    fs::write(
        &batch,
        r#"[
            {"key":"svc/port","mode":"WRITE","value":"8080"},
            {"key":"svc/port","envKey":"SERVICE_PORT"},
            {"key":"svc/missing"}
        ]"#,
    )
    .unwrap();

    consulkv(&host)
        .arg("batch")
        .arg("--file")
        .arg(&batch)
        .assert()
        .failure()
        .stdout(predicate::str::contains("SERVICE_PORT=8080"))
        .stderr(predicate::str::contains("1 of 3 consul operations failed"));
}

#[test]
fn settings_file_supplies_host() {
    let host = start_server(KvStore::new());
    let tmp = TempDir::new().unwrap();
    let settings = tmp.path().join("settings.json");
    fs::write(&settings, format!(r#"{{"hostUrl":"{host}"}}"#)).unwrap();

    Command::new(env!("CARGO_BIN_EXE_consulkv"))
        .env_clear()
        .arg("--settings")
        .arg(&settings)
        .args(["delete", "--key", "anything"])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn probe_prints_status() {
    let host = start_server(KvStore::new());
    consulkv(&host)
        .arg("probe")
        .assert()
        .success()
        .stdout("200\n");
}

#[test]
fn multi_line_value_is_not_written_to_env_file() {
    let host = start_server(KvStore::new());
    let tmp = TempDir::new().unwrap();
    let env_file = tmp.path().join("build.env");

    consulkv(&host)
        .args(["write", "--key", "app/cert", "--value", "line one\nline two"])
        .assert()
        .success();
    consulkv(&host)
        .arg("--env-file")
        .arg(&env_file)
        .args(["read", "--key", "app/cert"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("spans multiple lines"));

    assert!(!env_file.exists());
}

#[test]
fn zero_timeouts_in_settings_fall_back_for_probe() {
    let host = start_server(KvStore::new());
    let tmp = TempDir::new().unwrap();
    let settings = tmp.path().join("settings.json");
    fs::write(
        &settings,
        format!(r#"{{"hostUrl":"{host}","timeoutConnectMs":0,"timeoutResponseMs":0}}"#),
    )
    .unwrap();

    Command::new(env!("CARGO_BIN_EXE_consulkv"))
        .env_clear()
        .arg("--settings")
        .arg(&settings)
        .arg("probe")
        .assert()
        .success()
        .stdout("200\n");
}
