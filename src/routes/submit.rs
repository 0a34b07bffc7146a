use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;

use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::pipeline::{self, NotificationStatus};
use crate::submission::parser::BodyFormat;

pub async fn submit(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let format = BodyFormat::detect(content_type);
    let raw_data = format.parse(&body).map_err(AppError::BadRequest)?;

    let result = pipeline::run(&state, &headers, Some(addr.ip()), raw_data).await?;

    if result.spam {
        // Silent 200 for spam
        return Ok((StatusCode::OK, Json(json!({ "message": "Submission received." })))
            .into_response());
    }

    let submission = result
        .submission
        .ok_or_else(|| AppError::Internal("Pipeline returned no submission".to_string()))?;

    if result.notification == NotificationStatus::Failed {
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Data saved but notification could not be delivered.",
                "id": submission.id,
                "stored": true,
                "notification": result.notification,
            })),
        )
            .into_response());
    }

    // Plain HTML form posts go back to the page
    if let Some(ref url) = state.config.redirect_url {
        if format == BodyFormat::Form {
            return Ok(Redirect::to(url).into_response());
        }
    }

    let message = match (result.duplicate, result.notification) {
        (_, NotificationStatus::Sent) => "Data saved and notification sent.",
        (false, NotificationStatus::Queued) => "Data saved; notification queued for retry.",
        _ => "Submission already recorded.",
    };

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": message,
            "id": submission.id,
            "stored": true,
            "duplicate": result.duplicate,
            "notification": result.notification,
        })),
    )
        .into_response())
}
