//! HTTP surface: health check and the signed interactions endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    discord::{
        wire::{
            InteractionPayload, InteractionResponse, ResponseType, INTERACTION_COMMAND,
            INTERACTION_PING,
        },
        HttpInteractionReplier,
    },
    signature::{verify_request, SIGNATURE_HEADER, TIMESTAMP_HEADER},
};

type ApiResult<T> = Result<T, (StatusCode, &'static str)>;

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/interactions", post(interactions))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn interactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<InteractionResponse>> {
    let signature = header(&headers, SIGNATURE_HEADER);
    let timestamp = header(&headers, TIMESTAMP_HEADER);
    if !verify_request(&state.public_key, signature, timestamp, &body) {
        warn!("rejected interaction with invalid signature");
        return Err((StatusCode::UNAUTHORIZED, "invalid request signature"));
    }

    let payload: InteractionPayload = serde_json::from_slice(&body).map_err(|error| {
        warn!(%error, "malformed interaction payload");
        (StatusCode::BAD_REQUEST, "malformed interaction payload")
    })?;

    if payload.kind == INTERACTION_PING {
        return Ok(Json(InteractionResponse::pong()));
    }

    let event = payload.to_event().map_err(|error| {
        warn!(interaction_id = %payload.id, %error, "unsupported interaction");
        (StatusCode::BAD_REQUEST, "unsupported interaction")
    })?;

    let deferred_kind = if payload.kind == INTERACTION_COMMAND {
        ResponseType::DeferredChannelMessage
    } else {
        ResponseType::DeferredUpdate
    };
    let (replier, mut response) =
        HttpInteractionReplier::new(Arc::clone(&state.rest), payload.token, deferred_kind);
    let replier = Arc::new(replier);

    let controller = Arc::clone(&state.controller);
    let task_replier = Arc::clone(&replier);
    tokio::spawn(async move {
        controller.handle(&event, task_replier.as_ref()).await;
        task_replier.finish();
    });

    let answer = match tokio::time::timeout(state.ack_deadline, &mut response).await {
        Ok(Ok(answer)) => answer,
        // The controller finished without answering.
        Ok(Err(_)) => InteractionResponse::deferred(deferred_kind),
        Err(_) if replier.acknowledge_pending() => {
            info!(interaction_id = %payload.id, "acknowledging slow interaction");
            InteractionResponse::deferred(deferred_kind)
        }
        // Answered just as the deadline passed.
        Err(_) => response
            .await
            .unwrap_or_else(|_| InteractionResponse::deferred(deferred_kind)),
    };
    Ok(Json(answer))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
