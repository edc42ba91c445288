//! Integration tests for the HTTP API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use tower::util::ServiceExt;
use valbum_common::config::{AppConfig, LoggingConfig};
use valbum_ingest::models::{VRChatPhoto, WorldJoinLog};
use valbum_ingest::{build_router, AppState};

/// Test helper: build the router against a file-backed database in a temp
/// directory. The temp dir must outlive the returned router.
async fn create_test_app() -> (axum::Router, TempDir, AppConfig, sqlx::SqlitePool) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config = AppConfig {
        data_dir: temp.path().join("data"),
        vrchat_log_dir: temp.path().join("vrchat_logs"),
        port: 0,
        logging: LoggingConfig::default(),
    };
    config.ensure_data_dirs().expect("Failed to create data dirs");

    let pool = valbum_common::db::init_database(&config.database_path())
        .await
        .expect("Failed to initialize database");

    let state = AppState::new(pool.clone(), config.clone());
    let app = build_router(state);
    (app, temp, config, pool)
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

#[tokio::test]
async fn health_endpoint_reports_module_status() {
    let (app, _temp, _config, _pool) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "healthy");
    assert_eq!(json["module"], "valbum-ingest");
    assert!(json["version"].is_string());
    assert!(json["uptime_seconds"].is_number());
}

#[tokio::test]
async fn sync_endpoint_rejects_missing_log_dir() {
    let (app, _temp, _config, _pool) = create_test_app().await;
    // vrchat_log_dir was never created

    let response = app
        .oneshot(post_json("/api/sync", &json!({ "mode": "FULL" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn sync_endpoint_creates_records_from_raw_logs() {
    let (app, _temp, config, pool) = create_test_app().await;

    fs::create_dir_all(&config.vrchat_log_dir).unwrap();
    fs::write(
        config.vrchat_log_dir.join("output_log_2023-11-02_11-59-00.txt"),
        "2023.11.02 12:00:00 Log        -  [Behaviour] Joining wrld_6fecf18a-ab96-43f2-82dc-ccf79f17c34f:12345\n\
         2023.11.02 12:00:01 Log        -  [Behaviour] Joining or Creating Room: Cozy Winter Lodge\n",
    )
    .unwrap();

    let response = app
        .oneshot(post_json("/api/sync", &json!({ "mode": "FULL" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["created_world_join_logs"].as_array().unwrap().len(), 1);
    assert_eq!(
        json["created_world_join_logs"][0]["world_name"],
        "Cozy Winter Lodge"
    );

    assert_eq!(
        valbum_ingest::db::world_joins::count(&pool).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn sessions_endpoint_returns_empty_list_on_fresh_db() {
    let (app, _temp, _config, _pool) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn sessions_endpoint_groups_photos_under_their_session() {
    let (app, _temp, _config, pool) = create_test_app().await;

    let day = NaiveDate::from_ymd_opt(2023, 11, 2).unwrap();
    let join = WorldJoinLog::new(
        "wrld_11111111-2222-3333-4444-555555555555".to_string(),
        "Cozy Winter Lodge".to_string(),
        "12345".to_string(),
        day.and_hms_opt(12, 0, 0).unwrap(),
    );
    let photo = VRChatPhoto::new(
        "C:\\Pictures\\VRChat_2023-11-02_12-15-00.123_1920x1080.png".to_string(),
        day.and_hms_milli_opt(12, 15, 0, 123).unwrap(),
        1920,
        1080,
    );

    let mut conn = pool.acquire().await.unwrap();
    valbum_ingest::db::world_joins::insert_if_absent(&mut conn, &join)
        .await
        .unwrap();
    valbum_ingest::db::photos::insert_if_absent(&mut conn, &photo)
        .await
        .unwrap();
    drop(conn);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let groups = json.as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["world_name"], "Cozy Winter Lodge");
    assert_eq!(groups[0]["photos"].as_array().unwrap().len(), 1);
    assert_eq!(groups[0]["photos"][0]["width"], 1920);
}

#[tokio::test]
async fn import_endpoint_rejects_invalid_sources() {
    let (app, temp, _config, _pool) = create_test_app().await;

    let request_body = json!({
        "file_paths": [temp.path().join("does_not_exist").to_string_lossy()]
    });

    let response = app
        .oneshot(post_json("/api/import", &request_body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rollback_endpoint_reports_unknown_backup() {
    let (app, _temp, _config, _pool) = create_test_app().await;

    let request_body = json!({
        "backup_id": "00000000-0000-0000-0000-000000000000"
    });

    let response = app
        .oneshot(post_json("/api/import/rollback", &request_body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(json["error"]["message"], "バックアップが見つかりません");
}

#[tokio::test]
async fn export_endpoint_handles_empty_store() {
    let (app, temp, _config, _pool) = create_test_app().await;

    let request_body = json!({
        "target_dir": temp.path().join("exported").to_string_lossy()
    });

    let response = app
        .oneshot(post_json("/api/export", &request_body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_lines"], 0);
    assert_eq!(json["exported_files"], json!([]));
}
