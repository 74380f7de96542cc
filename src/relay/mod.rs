use std::sync::Arc;

use axum::{middleware, routing::any, Router};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::RelayConfig;

pub mod cors;
pub mod handlers;
pub mod payload;
pub mod prompts;
pub mod upstream;

use upstream::UpstreamClient;

/// Immutable per-process state; requests share nothing else.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    pub upstream: UpstreamClient,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        let upstream = UpstreamClient::new(&config);
        Self {
            config: Arc::new(config),
            upstream,
        }
    }
}

/// The relay answers on `/` and, like the edge function it replaces, on any
/// other path too.
pub fn router() -> Router<RelayState> {
    Router::new()
        .route("/", any(handlers::relay))
        .fallback(handlers::relay)
}

/// Fully layered application, ready to serve.
pub fn app(config: RelayConfig) -> Router {
    router()
        .layer(middleware::from_fn(cors::cors_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(RelayState::new(config))
}
