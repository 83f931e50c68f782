use crate::ipc::helpers::{
    get_required_str, get_required_u64, parse_now, parse_optional_param, parse_param, respond,
    section_key, to_json, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::schedule::ScheduledBlock;
use crate::store::AttendanceMark;
use serde_json::json;

fn attendance_open(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = section_key(params)?;
    let schedule: Vec<ScheduledBlock> = parse_param(params, "schedule")?;
    let now = parse_now(params)?;
    let grace: i64 = parse_optional_param(params, "graceMinutes")?.unwrap_or(state.config.grace_minutes);
    let session = state
        .store
        .open_attendance(&state.hours, &key, &schedule, now, grace)?;
    Ok(json!({ "session": to_json(&session)? }))
}

fn attendance_mark(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let session_id = get_required_u64(params, "sessionId")?;
    let student_id = get_required_str(params, "studentId")?;
    let mark: AttendanceMark = parse_param(params, "mark")?;
    let session = state.store.mark_attendance(session_id, &student_id, mark)?;
    Ok(json!({ "session": to_json(&session)? }))
}

fn attendance_close(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let session_id = get_required_u64(params, "sessionId")?;
    let now = parse_now(params)?;
    let session = state.store.close_attendance(session_id, now)?;
    Ok(json!({ "session": to_json(&session)? }))
}

fn attendance_list(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = section_key(params)?;
    let sessions: Vec<serde_json::Value> = state
        .store
        .sessions(&key)
        .into_iter()
        .map(to_json)
        .collect::<Result<_, _>>()?;
    Ok(json!({ "sessions": sessions }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    let result = match req.method.as_str() {
        "attendance.open" => attendance_open(state, p),
        "attendance.mark" => attendance_mark(state, p),
        "attendance.close" => attendance_close(state, p),
        "attendance.list" => attendance_list(state, p),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
