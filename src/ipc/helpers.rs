use crate::store::{SectionKey, StoreError, TermKey};
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde_json::json;

/// Error half of the reply envelope: `{"id", "ok": false, "error": {"code", "message"}}`.
#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "ok": false,
            "error": { "code": self.code, "message": self.message },
        })
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        tracing::warn!(error = %e, "request refused");
        Self::new(e.code(), e.to_string())
    }
}

pub fn respond(id: &str, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => json!({ "id": id, "ok": true, "result": v }),
        Err(e) => e.response(id),
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_required_u32(params: &serde_json::Value, key: &str) -> Result<u32, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_required_u64(params: &serde_json::Value, key: &str) -> Result<u64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn parse_param<T: DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<T, HandlerErr> {
    let Some(raw) = params.get(key) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid {}: {}", key, e)))
}

/// Absent or `null` -> `None`.
pub fn parse_optional_param<T: DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<T>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => parse_param(params, key).map(Some),
    }
}

/// Local wall-clock instant, `YYYY-MM-DDTHH:MM[:SS]` (a space also works as separator).
pub fn parse_now(params: &serde_json::Value) -> Result<NaiveDateTime, HandlerErr> {
    let raw = get_required_str(params, "now")?;
    let t = raw.trim().replace(' ', "T");
    NaiveDateTime::parse_from_str(&t, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&t, "%Y-%m-%dT%H:%M"))
        .map_err(|_| HandlerErr::bad_params("now must be YYYY-MM-DDTHH:MM[:SS]"))
}

pub fn term_key(params: &serde_json::Value) -> Result<TermKey, HandlerErr> {
    Ok(TermKey {
        course_id: get_required_str(params, "courseId")?,
        semester_id: get_required_str(params, "semesterId")?,
    })
}

pub fn section_key(params: &serde_json::Value) -> Result<SectionKey, HandlerErr> {
    Ok(SectionKey {
        course_id: get_required_str(params, "courseId")?,
        section_id: get_required_str(params, "sectionId")?,
    })
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(value).map_err(|e| HandlerErr::new("internal", e.to_string()))
}
