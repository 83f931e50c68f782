use crate::config::EngineConfig;
use crate::ipc::helpers::{get_required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(
        &req.id,
        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "hourSlots": state.hours.slot_count(),
            "graceMinutes": state.config.grace_minutes,
            "passMark": state.config.pass_mark,
        })),
    )
}

fn config_load(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let path = PathBuf::from(get_required_str(params, "path")?);
    let failed = |e: anyhow::Error| HandlerErr::new("config_failed", format!("{e:#}"));
    let cfg = EngineConfig::load(&path).map_err(failed)?;
    let hours = cfg.hour_table().map_err(failed)?;

    // Nothing is applied unless both the file and its table are valid.
    state.config = cfg;
    state.hours = hours;
    tracing::info!(path = %path.to_string_lossy(), slots = state.hours.slot_count(), "config loaded");
    Ok(json!({
        "configPath": path.to_string_lossy(),
        "hourSlots": state.hours.slot_count(),
        "graceMinutes": state.config.grace_minutes,
        "passMark": state.config.pass_mark,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "config.load" => Some(respond(&req.id, config_load(state, &req.params))),
        _ => None,
    }
}
