use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::error::AppError;
use crate::state::SharedState;

use super::entries::{EntriesView, EntryCard};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    api_base: &'a str,
    honeypot_field: Option<&'a str>,
    entries_html: String,
}

/// The form page. The first page of entries is rendered server-side so the
/// list shows without JavaScript; `static/script.js` takes over from there.
pub async fn page(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let config = &state.config;

    let entries = match state.store.scan(None, config.list_page_size).await {
        Ok(page) => EntriesView::from_cards(page.items.iter().map(EntryCard::from).collect()),
        Err(e) => {
            tracing::error!("Could not load entries for page: {e}");
            EntriesView::Error
        }
    };

    let template = IndexTemplate {
        api_base: &config.api_base,
        honeypot_field: config.honeypot_field.as_deref(),
        entries_html: entries.render(),
    };

    let html = template
        .render()
        .map_err(|e| AppError::Internal(format!("Failed to render page: {e}")))?;
    Ok(Html(html))
}
