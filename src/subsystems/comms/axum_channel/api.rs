//! Handlers for `/api/*`.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{debug, warn};

use super::AxumState;
use crate::activity::Activity;
use crate::subsystems::comms::CommsEvent;

fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

/// GET /api/health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    Json(json!({ "status": "ok", "bot": state.comms.bot_id() })).into_response()
}

/// POST /api/messages — run one activity and return what the bot sent.
pub(super) async fn messages(
    State(state): State<AxumState>,
    body: Result<Json<Activity>, JsonRejection>,
) -> Response {
    let Json(activity) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(channel_id = %state.channel_id, "rejected activity: {rejection}");
            return (StatusCode::BAD_REQUEST, json_error("bad_request", rejection.body_text())).into_response();
        }
    };

    debug!(
        channel_id = %state.channel_id,
        kind = activity.kind.as_str(),
        conversation = %activity.conversation.id,
        "activity received"
    );

    let conversation_id = activity.conversation.id.clone();
    let result = state.comms.process(activity).await;
    state.comms.report_event(CommsEvent::TurnCompleted {
        channel_id: state.channel_id.to_string(),
        conversation_id,
        failed: result.is_err(),
    });

    match result {
        Ok(replies) => Json(json!({ "activities": replies })).into_response(),
        Err(e) => {
            warn!(channel_id = %state.channel_id, "turn failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("turn_failed", e)).into_response()
        }
    }
}
