use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{
    payload::{RelayRequest, UpstreamPayload},
    upstream::{Attribution, UpstreamReply},
    RelayState,
};

/// Single entry point: preflight, relay, or refuse.
pub async fn relay(State(state): State<RelayState>, req: Request) -> Response {
    let method = req.method().clone();
    if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else if method == Method::POST {
        let request_id = Uuid::new_v4();
        forward(state, req)
            .instrument(info_span!("relay", %request_id))
            .await
    } else {
        json_error(StatusCode::METHOD_NOT_ALLOWED, "Use POST with JSON body")
    }
}

async fn forward(state: RelayState, req: Request) -> Response {
    let body = match to_bytes(req.into_body(), state.config.max_body_bytes).await {
        Ok(body) => body,
        Err(err) => {
            warn!(%err, "failed to read request body");
            return invalid_json();
        }
    };

    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, bytes = body.len(), "rejecting malformed JSON body");
            return invalid_json();
        }
    };

    let mut request = RelayRequest::from_value(value);
    let payload = UpstreamPayload::build(&mut request, &state.config.default_model);
    let attribution = Attribution {
        referer: request.referer.as_deref(),
        title: request.title.as_deref(),
    };

    info!(
        model = %payload.model,
        messages = payload.messages.len(),
        max_output_tokens = ?payload.max_output_tokens,
        "forwarding chat request"
    );

    match state.upstream.forward(&payload, &attribution).await {
        Ok(reply) => {
            info!(status = reply.status, "relaying upstream reply");
            passthrough(reply)
        }
        Err(err) => {
            error!(%err, "upstream request failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

fn passthrough(reply: UpstreamReply) -> Response {
    let mut res = Response::new(Body::from(reply.body));
    *res.status_mut() = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = HeaderValue::from_str(&reply.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/json"));
    res.headers_mut().insert(header::CONTENT_TYPE, content_type);
    res
}

fn invalid_json() -> Response {
    json_error(StatusCode::BAD_REQUEST, "Invalid JSON body")
}

pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
