use std::sync::Arc;

use chrono::{DateTime, Utc};
use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::bot::Bot;
use crate::listing::ListingRecord;
use crate::transport::{InboundTurn, OutboundMessage, RecordingTransport};

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/turn", post(turn))
        .route("/catalog", get(catalog))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct TurnResp {
    messages: Vec<OutboundMessage>,
}

/// Drive one dialogue turn and return the replies instead of sending them.
async fn turn(
    State(state): State<AppState>,
    Json(body): Json<InboundTurn>,
) -> Result<Json<TurnResp>, (StatusCode, String)> {
    let transport = RecordingTransport::new();
    state
        .bot
        .handle_turn(&body, &transport)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    let messages = transport.take().into_iter().map(|(_, m)| m).collect();
    Ok(Json(TurnResp { messages }))
}

#[derive(serde::Serialize)]
struct CatalogOut {
    listings: Vec<ListingRecord>,
    agents: Vec<String>,
    refreshed_at: Option<DateTime<Utc>>,
    feed_url: String,
}

async fn catalog(State(state): State<AppState>) -> Json<CatalogOut> {
    let snap = state.bot.catalog().current();
    Json(CatalogOut {
        listings: snap.records.clone(),
        agents: snap.agents.clone(),
        refreshed_at: snap.refreshed_at,
        feed_url: state.bot.config().feed_url(),
    })
}
