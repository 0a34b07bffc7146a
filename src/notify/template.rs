use regex::Regex;
use std::sync::LazyLock;

use crate::models::Submission;

static TEMPLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").unwrap());

/// Replace {{field}} placeholders with values from the submission.
/// Unknown placeholders render as empty strings.
pub fn render(template: &str, submission: &Submission) -> String {
    TEMPLATE_RE
        .replace_all(template, |caps: &regex::Captures| {
            resolve(&caps[1], submission).unwrap_or_default()
        })
        .to_string()
}

fn resolve(field: &str, submission: &Submission) -> Option<String> {
    match field {
        "id" => Some(submission.id.to_string()),
        "name" => Some(submission.name.clone()),
        "age" => Some(submission.age.clone()),
        "profession" => Some(submission.profession.clone()),
        "experience" => Some(submission.experience.clone()),
        "timestamp" => Some(submission.timestamp.to_rfc3339()),
        _ => None,
    }
}
