use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AggregatorError;
use crate::models::{
    ArbitrageOpportunity, Chain, Pool, PortfolioSummary, Position, Protocol, YieldHistoryPoint,
};
use crate::services::aggregator::DEFAULT_HISTORY_DAYS;
use crate::services::{Aggregator, PoolQuery, StrategyPlan, StrategyRequest};
use crate::sources::rpc::ChainStatus;

pub struct AppState {
    pub aggregator: Aggregator,
}

impl IntoResponse for AggregatorError {
    fn into_response(self) -> Response {
        let status = match self {
            AggregatorError::NoDataAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, AggregatorError>;

/// GET /api
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "OmniYield aggregation API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/health
async fn health() -> &'static str {
    "OK"
}

/// GET /api/chains
async fn get_chains(State(state): State<Arc<AppState>>) -> Json<Vec<Chain>> {
    Json(state.aggregator.get_chains())
}

/// GET /api/chains/status - live eth_blockNumber probe
async fn get_chain_status(State(state): State<Arc<AppState>>) -> Json<Vec<ChainStatus>> {
    Json(state.aggregator.get_chain_status().await)
}

/// GET /api/protocols
async fn get_protocols(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Protocol>> {
    Ok(Json(state.aggregator.get_protocols().await?))
}

/// GET /api/pools?chain_id=&protocol_id=&sort_by=apy|tvl|risk
async fn get_pools(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PoolQuery>,
) -> ApiResult<Vec<Pool>> {
    Ok(Json(state.aggregator.get_pools(&query).await?))
}

/// GET /api/arbitrage
async fn get_arbitrage(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ArbitrageOpportunity>> {
    Ok(Json(state.aggregator.get_arbitrage_opportunities().await?))
}

/// GET /api/portfolio
async fn get_portfolio(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Position>> {
    Ok(Json(state.aggregator.get_portfolio().await?))
}

/// POST /api/portfolio/summary - summarize caller-supplied positions
async fn summarize_portfolio(
    State(state): State<Arc<AppState>>,
    Json(positions): Json<Vec<Position>>,
) -> Json<PortfolioSummary> {
    Json(state.aggregator.get_portfolio_summary(&positions))
}

/// GET /api/analytics/overview
async fn get_overview(State(state): State<Arc<AppState>>) -> ApiResult<PortfolioSummary> {
    Ok(Json(state.aggregator.get_portfolio_overview().await?))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    days: Option<u32>,
}

/// GET /api/analytics/yield-history?days=30
async fn get_yield_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<YieldHistoryPoint>> {
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    Json(state.aggregator.get_yield_history(days))
}

/// POST /api/strategy/optimize
async fn optimize_strategy(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StrategyRequest>,
) -> ApiResult<StrategyPlan> {
    Ok(Json(state.aggregator.optimize_strategy(&request).await?))
}

/// GET /api/stats
async fn stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let health = state.aggregator.source_health();
    Json(serde_json::json!({
        "chains": state.aggregator.get_chains().len(),
        "sources": health,
    }))
}

pub fn create_rest_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chains", get(get_chains))
        .route("/chains/status", get(get_chain_status))
        .route("/protocols", get(get_protocols))
        .route("/pools", get(get_pools))
        .route("/arbitrage", get(get_arbitrage))
        .route("/portfolio", get(get_portfolio))
        .route("/portfolio/summary", post(summarize_portfolio))
        .route("/analytics/overview", get(get_overview))
        .route("/analytics/yield-history", get(get_yield_history))
        .route("/strategy/optimize", post(optimize_strategy))
        .route("/stats", get(stats));

    Router::new().nest("/api", api).with_state(state)
}
