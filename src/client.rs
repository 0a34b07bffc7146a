use std::collections::HashSet;
use std::time::Duration;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::routes::list::NEXT_CURSOR_HEADER;
use crate::views::{EntriesView, EntryCard};

pub const SUBMIT_SUCCESS: &str = "Submission successful!";
pub const SUBMIT_FAILED: &str = "Failed to submit. Try again.";
pub const NETWORK_ERROR: &str = "Network error. Try again later.";

#[derive(Debug)]
pub enum ClientError {
    InvalidBaseUrl(String),
    Http(reqwest::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::InvalidBaseUrl(msg) => write!(f, "Invalid API base URL: {msg}"),
            ClientError::Http(err) => write!(f, "HTTP client error: {err}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err)
    }
}

/// The form's current contents. `id` identifies this particular filled-in
/// form so a resubmission after a failure is not stored twice.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionForm {
    pub id: Uuid,
    pub name: String,
    pub age: String,
    pub profession: String,
    pub experience: String,
}

impl Default for SubmissionForm {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7(),
            name: String::new(),
            age: String::new(),
            profession: String::new(),
            experience: String::new(),
        }
    }
}

impl SubmissionForm {
    pub fn new(
        name: impl Into<String>,
        age: impl Into<String>,
        profession: impl Into<String>,
        experience: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            age: age.into(),
            profession: profession.into(),
            experience: experience.into(),
            ..Self::default()
        }
    }

    /// Empty every field and start a new submission id.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_blank(&self) -> bool {
        self.name.is_empty()
            && self.age.is_empty()
            && self.profession.is_empty()
            && self.experience.is_empty()
    }

    fn payload(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "age": self.age,
            "profession": self.profession,
            "experience": self.experience,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Failure,
}

/// Message shown under the form after a submit attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn success(text: &str) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.to_string(),
        }
    }

    fn failure(text: &str) -> Self {
        Self {
            kind: NoticeKind::Failure,
            text: text.to_string(),
        }
    }

    pub fn color(&self) -> &'static str {
        match self.kind {
            NoticeKind::Success => "green",
            NoticeKind::Failure => "red",
        }
    }
}

/// Drives a running backend the way `static/script.js` does: submits the form
/// and loads the entries list, turning every outcome into what the page shows.
pub struct FormClient {
    http: reqwest::Client,
    api_base: String,
}

impl FormClient {
    pub fn new(api_base: impl Into<String>) -> Result<Self, ClientError> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(api_base));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, api_base })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// POST the form as JSON. Clears the form only on a 2xx response.
    pub async fn submit_form(&self, form: &mut SubmissionForm) -> Notice {
        let result = self
            .http
            .post(self.url("/submit"))
            .json(&form.payload())
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                form.reset();
                Notice::success(SUBMIT_SUCCESS)
            }
            Ok(resp) => {
                tracing::warn!("Submit rejected with status {}", resp.status());
                Notice::failure(SUBMIT_FAILED)
            }
            Err(e) => {
                tracing::error!("Submit failed: {e}");
                Notice::failure(NETWORK_ERROR)
            }
        }
    }

    /// Fetch every page of `/list` and decide what the entries area shows.
    pub async fn load_entries(&self) -> EntriesView {
        match self.fetch_all().await {
            Ok(entries) => EntriesView::from_cards(entries.iter().map(EntryCard::from_json).collect()),
            Err(e) => {
                tracing::error!("Error loading entries: {e}");
                EntriesView::Error
            }
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Value>, String> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let url = match cursor {
                Some(ref c) => {
                    let encoded: String = form_urlencoded::byte_serialize(c.as_bytes()).collect();
                    self.url(&format!("/list?cursor={encoded}"))
                }
                None => self.url("/list"),
            };

            let resp = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| format!("request failed: {e}"))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(format!("list returned {status}"));
            }

            let next = resp
                .headers()
                .get(NEXT_CURSOR_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let body = resp
                .bytes()
                .await
                .map_err(|e| format!("failed to read body: {e}"))?;
            let data: Value =
                serde_json::from_slice(&body).map_err(|e| format!("malformed JSON: {e}"))?;
            let Value::Array(page) = data else {
                return Err("list did not return an array".to_string());
            };
            entries.extend(page);

            match next {
                Some(c) if seen.insert(c.clone()) => cursor = Some(c),
                Some(c) => return Err(format!("cursor {c} repeated")),
                None => return Ok(entries),
            }
        }
    }
}
