use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_termd");
    let mut child = Command::new(exe)
        .env_remove("TERMD_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn termd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

#[test]
fn config_load_swaps_hour_table_and_grace() {
    let dir = tempfile::tempdir().expect("temp dir");
    let good = dir.path().join("termd.json");
    std::fs::write(
        &good,
        json!({
            "hours": [
                {"start": "08:00", "end": "09:30"},
                {"start": "09:30", "end": "11:00"}
            ],
            "graceMinutes": 0,
            "passMark": 11
        })
        .to_string(),
    )
    .expect("write config");
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"hours": [{"start": "10:00", "end": "09:00"}]}"#).expect("write bad config");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "1",
        "config.load",
        json!({ "path": bad.to_string_lossy() }),
    );
    assert_eq!(code, "config_failed");
    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert_eq!(health["hourSlots"], json!(17));

    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "config.load",
        json!({ "path": good.to_string_lossy() }),
    );
    assert_eq!(loaded["hourSlots"], json!(2));
    assert_eq!(loaded["graceMinutes"], json!(0));

    let range = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "schedule.timeRange",
        json!({ "startIndex": 1, "endIndex": 2 }),
    );
    assert_eq!(range["range"], json!("08:00–11:00"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn startup_config_from_env_and_broken_file_falls_back() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("termd.json");
    std::fs::write(&path, r#"{"graceMinutes": 25}"#).expect("write config");

    for (cfg, expected_grace) in [(path.clone(), 25), (dir.path().join("missing.json"), 10)] {
        let exe = env!("CARGO_BIN_EXE_termd");
        let mut child = Command::new(exe)
            .env("TERMD_CONFIG", &cfg)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn termd");
        let mut stdin = child.stdin.take().expect("child stdin");
        let mut reader = BufReader::new(child.stdout.take().expect("child stdout"));
        let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
        assert_eq!(health["graceMinutes"], json!(expected_grace));
        drop(stdin);
        let _ = child.wait();
    }
}

#[test]
fn out_of_range_startup_grace_is_logged_and_ignored() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("termd.json");
    std::fs::write(&path, r#"{"graceMinutes": 9223372036854775807}"#).expect("write config");

    let exe = env!("CARGO_BIN_EXE_termd");
    let mut child = Command::new(exe)
        .env("TERMD_CONFIG", &path)
        .env_remove("TERMD_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn termd");
    let mut stdin = child.stdin.take().expect("child stdin");
    let mut reader = BufReader::new(child.stdout.take().expect("child stdout"));
    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["graceMinutes"], json!(10));
    drop(stdin);

    let out = child.wait_with_output().expect("wait termd");
    let log = String::from_utf8_lossy(&out.stderr);
    assert!(log.contains("ignoring TERMD_CONFIG"), "stderr: {}", log);
    assert!(log.contains("graceMinutes must be between 0 and 1440"), "stderr: {}", log);
}
