use crate::ipc::helpers::{
    get_required_str, parse_optional_param, parse_param, respond, term_key, to_json, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::labs::{lab_options, preference_order, EnrollmentPhase, LabSection};
use crate::schedule::ScheduledBlock;
use serde_json::json;

fn phase_get(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = term_key(params)?;
    Ok(json!({ "phase": to_json(&state.store.phase(&key))? }))
}

fn phase_set(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = term_key(params)?;
    let next: EnrollmentPhase = parse_param(params, "phase")?;
    let phase = state.store.set_phase(&key, next)?;
    Ok(json!({ "phase": to_json(&phase)? }))
}

fn enrollment_get(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = term_key(params)?;
    let student_id = get_required_str(params, "studentId")?;
    Ok(json!({
        "phase": to_json(&state.store.phase(&key))?,
        "enrollment": to_json(&state.store.enrollment(&key, &student_id))?,
    }))
}

fn toggle(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = term_key(params)?;
    let student_id = get_required_str(params, "studentId")?;
    let section_id = get_required_str(params, "sectionId")?;
    let section: Option<LabSection> = parse_optional_param(params, "section")?;
    let fixed: Vec<ScheduledBlock> = parse_optional_param(params, "fixedSchedule")?.unwrap_or_default();
    let preferences = state.store.toggle_preference(
        &state.hours,
        &key,
        &student_id,
        &section_id,
        section.as_ref(),
        &fixed,
    )?;
    Ok(json!({ "preferences": preferences }))
}

fn order(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let preferences: Vec<String> = parse_param(params, "preferences")?;
    let section_id = get_required_str(params, "sectionId")?;
    Ok(json!({ "rank": preference_order(&preferences, &section_id) }))
}

/// Preferences come from `params.preferences` or, failing that, from the stored enrollment.
fn options(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let catalog: Vec<LabSection> = parse_param(params, "catalog")?;
    let fixed: Vec<ScheduledBlock> = parse_optional_param(params, "fixedSchedule")?.unwrap_or_default();
    let preferences: Vec<String> = match parse_optional_param(params, "preferences")? {
        Some(p) => p,
        None => {
            let key = term_key(params)?;
            let student_id = get_required_str(params, "studentId")?;
            state.store.enrollment(&key, &student_id).preferences
        }
    };
    let opts = lab_options(&state.hours, &catalog, &fixed, &preferences);
    Ok(json!({ "options": to_json(&opts)? }))
}

fn submit(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = term_key(params)?;
    let student_id = get_required_str(params, "studentId")?;
    let preferences: Vec<String> = parse_param(params, "preferences")?;
    let catalog: Vec<LabSection> = parse_optional_param(params, "catalog")?.unwrap_or_default();
    let fixed: Vec<ScheduledBlock> = parse_optional_param(params, "fixedSchedule")?.unwrap_or_default();
    let seq = state.store.submit_preferences(
        &state.hours,
        &key,
        &student_id,
        preferences,
        &catalog,
        &fixed,
    )?;
    Ok(json!({ "submissionSeq": seq }))
}

fn assign(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = term_key(params)?;
    let student_id = get_required_str(params, "studentId")?;
    let section_id = get_required_str(params, "sectionId")?;
    let enrollment = state.store.assign_lab(&key, &student_id, &section_id)?;
    Ok(json!({ "enrollment": to_json(&enrollment)? }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    let result = match req.method.as_str() {
        "labs.phase.get" => phase_get(state, p),
        "labs.phase.set" => phase_set(state, p),
        "labs.get" => enrollment_get(state, p),
        "labs.toggle" => toggle(state, p),
        "labs.order" => order(p),
        "labs.options" => options(state, p),
        "labs.submit" => submit(state, p),
        "labs.assign" => assign(state, p),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
