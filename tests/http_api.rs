#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use asset_admin_lib::http::build_router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

#[path = "util.rs"]
mod util;

async fn app() -> (sqlx::SqlitePool, Router) {
    let pool = util::migrated_pool().await;
    util::seed_building_b1(&pool).await;
    let router = build_router(util::service(&pool));
    (pool, router)
}

async fn send(app: &Router, method: Method, uri: &str) -> Result<(StatusCode, Value)> {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())?,
        )
        .await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

#[tokio::test]
async fn health_reports_graph_version() -> Result<()> {
    let (_pool, app) = app().await;
    let (status, body) = send(&app, Method::GET, "/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["graphVersion"].as_u64().is_some());
    assert_eq!(body["entities"], json!(34));
    Ok(())
}

#[tokio::test]
async fn graph_endpoint_serves_the_definition() -> Result<()> {
    let (_pool, app) = app().await;
    let (status, body) = send(&app, Method::GET, "/graph").await?;
    assert_eq!(status, StatusCode::OK);
    let buildings = body["entities"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["table"] == "buildings")
        .expect("buildings registered");
    assert_eq!(buildings["soft_status"]["status_column"], "status");
    assert!(buildings["edges"].as_array().unwrap().len() >= 2);
    Ok(())
}

#[tokio::test]
async fn blocked_delete_is_a_conflict_with_dependents() -> Result<()> {
    let (pool, app) = app().await;
    let (status, body) = send(&app, Method::DELETE, "/entities/buildings/B1").await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["blocked"], json!(true));
    assert_eq!(body["entity"], "buildings");
    assert_eq!(
        body["dependents"],
        json!([
            { "table": "building_rooms", "column": "building_id", "count": 2, "action": "delete" },
            { "table": "assets", "column": "room_id", "count": 6, "action": "delete" },
        ])
    );
    assert!(body["message"].as_str().unwrap().contains("cascade=true"));
    assert!(body.get("warnings").is_none());
    assert_eq!(util::count(&pool, "buildings").await, 1);
    Ok(())
}

#[tokio::test]
async fn conflict_body_lists_schema_drift() -> Result<()> {
    let (pool, app) = app().await;
    util::exec(
        &pool,
        "ALTER TABLE service_schedules RENAME COLUMN asset_id TO asset_ref",
    )
    .await;

    let (status, body) = send(&app, Method::DELETE, "/entities/buildings/B1").await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["dependents"].as_array().unwrap().len(), 2);
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["table"], "service_schedules");
    assert_eq!(warnings[0]["column"], "asset_id");
    assert_eq!(warnings[0]["reason"], "missing_column");
    assert_eq!(warnings[0]["missing"], "service_schedules");
    assert_eq!(warnings[0]["missing_column"], "asset_id");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("could not be checked"));
    Ok(())
}

#[tokio::test]
async fn malformed_query_gets_a_json_error() -> Result<()> {
    let (pool, app) = app().await;
    let (status, body) =
        send(&app, Method::DELETE, "/entities/buildings/B1?cascade=1").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
    assert_eq!(body["code"], "HTTP/BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("query string"));
    assert_eq!(util::count(&pool, "buildings").await, 1);
    Ok(())
}

#[tokio::test]
async fn cascade_delete_returns_the_summary() -> Result<()> {
    let (pool, app) = app().await;
    let (status, body) =
        send(&app, Method::DELETE, "/entities/buildings/B1?cascade=true").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], json!({ "assets": 6, "building_rooms": 2 }));
    assert_eq!(body["totalDeleted"], json!(9));
    assert_eq!(body["deletedRecord"]["id"], "B1");
    assert_eq!(util::count(&pool, "assets").await, 0);

    let (status, body) =
        send(&app, Method::DELETE, "/entities/buildings/B1?cascade=true").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
    Ok(())
}

#[tokio::test]
async fn unknown_entity_is_a_bad_request() -> Result<()> {
    let (_pool, app) = app().await;
    let (status, body) = send(&app, Method::DELETE, "/entities/spaceships/1").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UnknownEntity");
    assert_eq!(body["code"], "CASCADE/UNKNOWN_ENTITY");
    Ok(())
}

#[tokio::test]
async fn soft_fallback_deactivates_instead() -> Result<()> {
    let (pool, app) = app().await;
    let (status, body) =
        send(&app, Method::DELETE, "/entities/buildings/B1?fallback=soft").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deactivated"], json!(true));
    assert_eq!(body["record"]["status"], "inactive");
    assert_eq!(util::count(&pool, "buildings").await, 1);

    let (status, _) = send(&app, Method::DELETE, "/entities/buildings/B1?fallback=hard").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn dependents_endpoint_is_a_dry_run() -> Result<()> {
    let (pool, app) = app().await;
    let (status, body) = send(&app, Method::GET, "/entities/buildings/B1/dependents").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blocked"], json!(true));
    assert_eq!(body["dependents"].as_array().unwrap().len(), 2);
    assert_eq!(body["dependents"][1]["autoCascade"], json!(false));
    assert_eq!(util::count(&pool, "building_rooms").await, 2);

    let (status, _) = send(&app, Method::GET, "/entities/buildings/B9/dependents").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn deactivate_endpoint_maps_unsupported_entities() -> Result<()> {
    let (pool, app) = app().await;
    util::exec(
        &pool,
        "INSERT INTO content_sections (id, slug, title) VALUES ('CS1', 'about', 'About')",
    )
    .await;

    let (status, body) = send(&app, Method::POST, "/entities/assets/A1/deactivate").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"], json!(["status", "is_active"]));

    let (status, body) =
        send(&app, Method::POST, "/entities/content_sections/CS1/deactivate").await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "SoftDeleteUnsupported");
    Ok(())
}
