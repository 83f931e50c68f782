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

fn schedule() -> serde_json::Value {
    json!([
        {"courseId": "QU110", "sectionId": "C", "day": "wednesday", "startHour": 9, "duration": 2},
        {"courseId": "QU110", "sectionId": "D", "day": "wednesday", "startHour": 1, "duration": 2}
    ])
}

#[test]
fn attendance_session_lifecycle() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let key = json!({"courseId": "QU110", "sectionId": "C"});

    // 2026-10-21 is a Wednesday; section C runs 14:00-15:40.
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.open",
        json!({"courseId": "QU110", "sectionId": "C", "schedule": schedule(), "now": "2026-10-21T07:30"}),
    );
    assert_eq!(code, "not_in_session");

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.open",
        json!({"courseId": "QU110", "sectionId": "C", "schedule": schedule(), "now": "2026-10-21T13:52"}),
    );
    let session_id = opened["session"]["id"].as_u64().expect("session id");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.open",
        json!({"courseId": "QU110", "sectionId": "C", "schedule": schedule(), "now": "2026-10-21T14:10"}),
    );
    assert_eq!(code, "session_open");

    let marked = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.mark",
        json!({"sessionId": session_id, "studentId": "s1", "mark": "late"}),
    );
    assert_eq!(marked["session"]["marks"]["s1"], json!("late"));

    let closed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.close",
        json!({"sessionId": session_id, "now": "2026-10-21T15:45"}),
    );
    assert_eq!(closed["session"]["closedAt"], json!("2026-10-21T15:45:00"));

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.mark",
        json!({"sessionId": session_id, "studentId": "s2", "mark": "present"}),
    );
    assert_eq!(code, "session_closed");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "7",
        "attendance.close",
        json!({"sessionId": 999, "now": "2026-10-21T15:45"}),
    );
    assert_eq!(code, "not_found");

    let listed = request_ok(&mut stdin, &mut reader, "8", "attendance.list", key);
    assert_eq!(listed["sessions"].as_array().map(|a| a.len()), Some(1));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn blocks_of_another_course_do_not_open_a_section() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    // 2026-10-19 is a Monday; MA101/A runs 08:50-10:30 but PHY200/A has no class then.
    let borrowed = json!([
        {"courseId": "MA101", "sectionId": "A", "day": "monday", "startHour": 3, "duration": 2},
        {"day": "monday", "startHour": 3, "duration": 2}
    ]);
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.open",
        json!({"courseId": "PHY200", "sectionId": "A", "schedule": borrowed, "now": "2026-10-19T09:00"}),
    );
    assert_eq!(code, "not_in_session");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.list",
        json!({"courseId": "PHY200", "sectionId": "A"}),
    );
    assert_eq!(listed["sessions"], json!([]));

    drop(stdin);
    let _ = child.wait();
}
