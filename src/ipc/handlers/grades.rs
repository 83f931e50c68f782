use crate::grades::{
    class_summary, compute_final, compute_partial_score, round_off_1_decimal, EvaluationScheme,
    GradeMutation, GradeRecord, PartialScore, PartialWeights,
};
use crate::ipc::helpers::{
    get_required_str, parse_optional_param, parse_param, respond, section_key, to_json, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn final_json(record: Option<&GradeRecord>, scheme: Option<&EvaluationScheme>) -> Result<serde_json::Value, HandlerErr> {
    match compute_final(record, scheme) {
        Some(f) => {
            let mut v = to_json(&f)?;
            v["finalRounded"] = json!(round_off_1_decimal(f.final_score));
            Ok(v)
        }
        None => Ok(serde_json::Value::Null),
    }
}

fn grades_partial(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let partial: PartialScore = parse_param(params, "partial")?;
    let weights: PartialWeights = parse_param(params, "weights")?;
    Ok(json!({ "score": compute_partial_score(&partial, weights) }))
}

fn grades_final(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let record: Option<GradeRecord> = parse_optional_param(params, "record")?;
    let scheme: Option<EvaluationScheme> = parse_optional_param(params, "scheme")?;
    Ok(json!({ "result": final_json(record.as_ref(), scheme.as_ref())? }))
}

fn grades_get(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = section_key(params)?;
    let student_id = get_required_str(params, "studentId")?;
    let record = state.store.grade(&key, &student_id);
    let scheme: Option<EvaluationScheme> = parse_optional_param(params, "scheme")?;
    Ok(json!({
        "record": to_json(&record)?,
        "final": final_json(Some(&record), scheme.as_ref())?,
    }))
}

fn grades_update(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = section_key(params)?;
    let student_id = get_required_str(params, "studentId")?;
    let mutation: GradeMutation = parse_param(params, "mutation")?;
    let record = state.store.update_grade(&key, &student_id, &mutation);
    tracing::debug!(course = %key.course_id, section = %key.section_id, student = %student_id, "grade amended");
    Ok(json!({ "record": to_json(&record)? }))
}

fn grades_summary(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let key = section_key(params)?;
    let scheme: EvaluationScheme = parse_param(params, "scheme")?;
    let rows = state.store.section_grades(&key);
    let summary = class_summary(rows.iter().map(|(_, r)| r), &scheme, state.config.pass_mark);
    let students: Vec<serde_json::Value> = rows
        .iter()
        .map(|(student_id, r)| -> Result<serde_json::Value, HandlerErr> {
            Ok(json!({
                "studentId": student_id,
                "record": to_json(r)?,
                "final": final_json(Some(r), Some(&scheme))?,
            }))
        })
        .collect::<Result<_, _>>()?;
    Ok(json!({
        "summary": to_json(&summary)?,
        "students": students,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let p = &req.params;
    let result = match req.method.as_str() {
        "grades.partial" => grades_partial(p),
        "grades.final" => grades_final(p),
        "grades.get" => grades_get(state, p),
        "grades.update" => grades_update(state, p),
        "grades.summary" => grades_summary(state, p),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
