mod support;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use omni_yield::api::{create_rest_router, AppState};
use omni_yield::services::{Aggregator, SourceSet};
use omni_yield::sources::synthetic::Catalogue;
use omni_yield::sources::MarketSource;

use support::{offline_config, pool_fixture, MockSource};

fn app(aggregator: Aggregator) -> Router {
    create_rest_router(Arc::new(AppState { aggregator }))
}

fn fixture_app() -> Router {
    let sources = SourceSet {
        pools: vec![MockSource::returning("pools", pool_fixture()) as Arc<dyn MarketSource>],
        ..SourceSet::default()
    };
    app(Aggregator::with_sources(&offline_config(), sources))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: Router, uri: &str, json: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn health_answers_ok() {
    let response = fixture_app()
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn chains_lists_the_registry() {
    let (status, body) = get(fixture_app(), "/api/chains").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ethereum", "bsc", "polygon", "avalanche", "arbitrum", "zetachain"]);
}

#[tokio::test]
async fn pools_accept_filters_and_sort_keys() {
    let (status, body) = get(fixture_app(), "/api/pools?chain_id=bsc&sort_by=tvl").await;
    assert_eq!(status, StatusCode::OK);
    let pools = body.as_array().unwrap();
    assert!(!pools.is_empty() && pools.len() <= 20);
    assert!(pools.iter().all(|p| p["chain_id"] == "bsc"));

    let (status, body) = get(fixture_app(), "/api/pools?chain_id=solana").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(vec![]));
}

#[tokio::test]
async fn arbitrage_is_capped_at_ten() {
    let (status, body) = get(fixture_app(), "/api/arbitrage").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().len() <= 10);
}

#[tokio::test]
async fn portfolio_summary_of_supplied_positions() {
    let positions = serde_json::json!([
        {
            "user_address": "0x1",
            "chain_id": "ethereum",
            "pool_id": "p1",
            "deposited_amount_usd": 1000.0,
            "current_value_usd": 1200.0,
            "rewards_earned_usd": 200.0,
            "apy_earned": 10.0,
            "last_compound": "2024-01-01T00:00:00Z"
        },
        {
            "user_address": "0x1",
            "chain_id": "polygon",
            "pool_id": "p2",
            "deposited_amount_usd": 2000.0,
            "current_value_usd": 1900.0,
            "rewards_earned_usd": -100.0,
            "apy_earned": 4.0,
            "last_compound": "2024-01-01T00:00:00Z"
        }
    ]);

    let (status, body) = post_json(fixture_app(), "/api/portfolio/summary", positions).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_deposited"], 3000.0);
    assert_eq!(body["total_value_locked"], 3100.0);
    assert_eq!(body["total_profit_loss"], 100.0);
    assert_eq!(body["average_apy"], 7.0);
    assert_eq!(body["chains_count"], 2);
}

#[tokio::test]
async fn overview_and_history_are_served() {
    let (status, body) = get(fixture_app(), "/api/analytics/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_positions"], 8);

    let (status, body) = get(fixture_app(), "/api/analytics/yield-history?days=7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 7);

    let (_, body) = get(fixture_app(), "/api/analytics/yield-history").await;
    assert_eq!(body.as_array().unwrap().len(), 30);
}

#[tokio::test]
async fn strategy_optimize_takes_a_json_request() {
    let (status, body) = post_json(
        fixture_app(),
        "/api/strategy/optimize",
        serde_json::json!({ "max_risk": "Medium", "amount_usd": 5000.0 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let total: u64 = body["optimized_allocation"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(total, 100);
    assert!(body["recommendations"].as_array().unwrap().len() >= 1);
}

#[tokio::test]
async fn no_data_maps_to_service_unavailable() {
    let aggregator = Aggregator::with_sources(&offline_config(), SourceSet::default())
        .with_catalogue(Catalogue::empty());

    let (status, body) = get(app(aggregator), "/api/protocols").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("protocols"));
}

#[tokio::test]
async fn stats_reports_source_health() {
    let app = fixture_app();
    let (status, _) = get(app.clone(), "/api/pools").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chains"], 6);
    assert_eq!(body["sources"][0]["source"], "pools");
    assert_eq!(body["sources"][0]["successes"], 1);
}
