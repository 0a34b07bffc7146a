use serde_json::{Map, Value};

/// How a submission body is encoded, going by its `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    /// `application/x-www-form-urlencoded`, i.e. a plain HTML form post.
    Form,
    /// Anything else; JSON is tried before form encoding.
    Unknown,
}

impl BodyFormat {
    /// A missing header means JSON, which is what the page script sends.
    pub fn detect(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return BodyFormat::Json;
        };

        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/json" => BodyFormat::Json,
            "application/x-www-form-urlencoded" => BodyFormat::Form,
            m if m.ends_with("+json") => BodyFormat::Json,
            _ => BodyFormat::Unknown,
        }
    }

    pub fn parse(self, body: &[u8]) -> Result<Value, String> {
        match self {
            BodyFormat::Json => {
                serde_json::from_slice(body).map_err(|e| format!("Invalid JSON: {e}"))
            }
            BodyFormat::Form => Ok(form_fields(body)),
            BodyFormat::Unknown => serde_json::from_slice(body).or_else(|_| {
                match std::str::from_utf8(body) {
                    Ok(text) if text.contains('=') => Ok(form_fields(body)),
                    _ => Err("Unable to parse body as JSON or form data".to_string()),
                }
            }),
        }
    }
}

/// Form pairs as a flat object of strings. A repeated name keeps its last value.
fn form_fields(body: &[u8]) -> Value {
    let fields: Map<String, Value> = form_urlencoded::parse(body)
        .map(|(name, value)| (name.into_owned(), Value::String(value.into_owned())))
        .collect();
    Value::Object(fields)
}
