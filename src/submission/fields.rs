use serde_json::Value;
use uuid::Uuid;

use crate::models::NewSubmission;

#[derive(Debug, PartialEq)]
pub enum FieldError {
    NotAnObject,
    Missing(Vec<String>),
    InvalidId(String),
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldError::NotAnObject => write!(f, "Submission must be a JSON object"),
            FieldError::Missing(fields) => {
                write!(f, "Missing required field(s): {}", fields.join(", "))
            }
            FieldError::InvalidId(msg) => write!(f, "Invalid id: {msg}"),
        }
    }
}

/// Pull the submission fields out of a parsed body.
///
/// Each required field must be a non-blank string or a number; numbers are
/// kept in their textual form. Unknown fields are ignored.
pub fn extract(raw: &Value) -> Result<NewSubmission, FieldError> {
    let obj = raw.as_object().ok_or(FieldError::NotAnObject)?;

    let mut missing = Vec::new();
    let mut take = |field: &str| match obj.get(field).and_then(scalar_text) {
        Some(text) => text,
        None => {
            missing.push(field.to_string());
            String::new()
        }
    };

    let name = take("name");
    let age = take("age");
    let profession = take("profession");
    let experience = take("experience");

    if !missing.is_empty() {
        return Err(FieldError::Missing(missing));
    }

    let id = match obj.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(
            Uuid::parse_str(s.trim()).map_err(|e| FieldError::InvalidId(e.to_string()))?,
        ),
        Some(other) => {
            return Err(FieldError::InvalidId(format!(
                "expected a UUID string, got {other}"
            )));
        }
    };

    Ok(NewSubmission {
        id,
        name,
        age,
        profession,
        experience,
    })
}

/// True when the hidden honeypot field came back filled in. People never see
/// it; form-filling bots tend to populate every input.
pub fn trap_filled(raw: &Value, field: &str) -> bool {
    match raw.get(field) {
        None | Some(Value::Null) => false,
        Some(value @ Value::String(_)) => scalar_text(value).is_some(),
        Some(_) => true,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
