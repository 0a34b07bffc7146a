use axum::extract::{Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::SharedState;

pub const NEXT_CURSOR_HEADER: &str = "x-next-cursor";

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

/// One page of stored records as a bare JSON array. When more remain, the
/// cursor for the next page is returned in the `x-next-cursor` header.
pub async fn list(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let config = &state.config;

    let limit = match params.limit.as_deref().map(str::trim) {
        None | Some("") => config.list_page_size,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| AppError::BadRequest(format!("Invalid limit: {raw}")))?
            .clamp(1, config.list_max_page_size),
    };

    let cursor = match params.cursor.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid cursor".to_string()))?,
        ),
    };

    let page = state
        .store
        .scan(cursor, limit)
        .await
        .map_err(|e| AppError::Storage("Could not retrieve data.", e))?;

    let mut response = (StatusCode::OK, Json(page.items)).into_response();
    if let Some(next) = page.next_cursor {
        let value = HeaderValue::from_str(&next.to_string())
            .map_err(|e| AppError::Internal(format!("Invalid cursor header: {e}")))?;
        response
            .headers_mut()
            .insert(HeaderName::from_static(NEXT_CURSOR_HEADER), value);
    }

    Ok(response)
}
