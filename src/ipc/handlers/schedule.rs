use crate::hours::HourTable;
use crate::ipc::helpers::{get_required_u32, parse_now, parse_optional_param, parse_param, respond, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::schedule::{
    active_context_with_grace, block_time_range, current_or_next, overlaps, schedule_conflicts,
    time_range, ScheduleBlock, ScheduledBlock, Upcoming,
};
use serde_json::json;

fn upcoming_json(table: &HourTable, u: Option<Upcoming<'_>>) -> Result<serde_json::Value, HandlerErr> {
    let Some(u) = u else {
        return Ok(serde_json::Value::Null);
    };
    Ok(json!({
        "index": u.index,
        "status": to_json(&u.status)?,
        "distanceMinutes": u.distance_minutes,
        "block": to_json(u.block)?,
        "timeRange": block_time_range(table, &u.block.block),
        "roomLabel": u.block.block.room_label(),
    }))
}

fn hours_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let slots: Vec<serde_json::Value> = state
        .hours
        .slots()
        .map(to_json)
        .collect::<Result<_, _>>()?;
    Ok(json!({ "slots": slots }))
}

fn hours_resolve(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let index = get_required_u32(params, "index")?;
    let slot = match state.hours.resolve(index) {
        Some(s) => to_json(s)?,
        None => serde_json::Value::Null,
    };
    Ok(json!({ "slot": slot }))
}

fn schedule_time_range(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let start = get_required_u32(params, "startIndex")?;
    let end = get_required_u32(params, "endIndex")?;
    Ok(json!({ "range": time_range(&state.hours, start, end) }))
}

fn schedule_overlaps(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let a: ScheduleBlock = parse_param(params, "a")?;
    let b: ScheduleBlock = parse_param(params, "b")?;
    Ok(json!({ "overlaps": overlaps(&state.hours, &a, &b) }))
}

fn schedule_conflicts_list(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let schedule: Vec<ScheduledBlock> = parse_param(params, "schedule")?;
    let pairs: Vec<[usize; 2]> = schedule_conflicts(&state.hours, &schedule)
        .into_iter()
        .map(|(i, j)| [i, j])
        .collect();
    Ok(json!({ "pairs": pairs }))
}

fn schedule_current_or_next(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let schedule: Vec<ScheduledBlock> = parse_param(params, "schedule")?;
    let now = parse_now(params)?;
    let found = current_or_next(&state.hours, &schedule, now);
    Ok(json!({ "match": upcoming_json(&state.hours, found)? }))
}

fn schedule_active_with_grace(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let schedule: Vec<ScheduledBlock> = parse_param(params, "schedule")?;
    let now = parse_now(params)?;
    let grace: i64 = parse_optional_param(params, "graceMinutes")?.unwrap_or(state.config.grace_minutes);
    let found = active_context_with_grace(&state.hours, &schedule, now, grace);
    Ok(json!({ "match": upcoming_json(&state.hours, found)? }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    let result = match req.method.as_str() {
        "hours.list" => hours_list(state),
        "hours.resolve" => hours_resolve(state, p),
        "schedule.timeRange" => schedule_time_range(state, p),
        "schedule.overlaps" => schedule_overlaps(state, p),
        "schedule.conflicts" => schedule_conflicts_list(state, p),
        "schedule.currentOrNext" => schedule_current_or_next(state, p),
        "schedule.activeWithGrace" => schedule_active_with_grace(state, p),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
