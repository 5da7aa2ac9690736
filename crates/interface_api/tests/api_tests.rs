//! HTTP API tests
//!
//! Each test drives the full router with `oneshot` over an in-memory ledger,
//! a manual clock and a backup directory in a temp dir.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use core_kernel::ManualClock;
use infra_store::DirectoryBlobStore;
use interface_api::{config::ApiConfig, create_router, AppState};
use test_utils::empty_ledger;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
    _backups: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let (ledger, _store, clock) = empty_ledger();
        let backups = TempDir::new().unwrap();
        let blob_store = DirectoryBlobStore::open(backups.path()).await.unwrap();
        let router = create_router(AppState::new(ledger, blob_store, ApiConfig::default()));
        Self {
            router,
            clock,
            _backups: backups,
        }
    }

    async fn with_baseline() -> Self {
        let app = Self::new().await;
        let (status, _) = app
            .json(Method::PUT, "/api/v1/settings", json!({"top": 1000, "bottom": 500}))
            .await;
        assert_eq!(status, StatusCode::OK);
        app
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn call(&self, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, parse(&body))
    }

    async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, parse(&body))
    }

    async fn text(&self, method: Method, uri: &str, body: impl Into<String>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(body.into()))
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, parse(&body))
    }

    async fn add_january(&self) -> Value {
        let (status, body) = self.json(Method::POST, "/api/v1/bills", january()).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }
}

fn parse(body: &str) -> Value {
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
    }
}

fn january() -> Value {
    json!({"date": "2024-01-01", "amount": 300, "kwh": 200, "top": 1100, "bottom": 560})
}

fn num(value: &Value) -> f64 {
    value.as_f64().unwrap_or_else(|| panic!("not a number: {}", value))
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_backup_store() {
        let app = TestApp::new().await;
        let (status, body) = app.call(Method::GET, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["bills"], 0);
        assert_eq!(body["backups"]["status"], "healthy");
    }
}

mod bill_tests {
    use super::*;

    #[tokio::test]
    async fn test_worked_example_over_http() {
        let app = TestApp::with_baseline().await;
        let body = app.add_january().await;

        let metrics = &body["metrics"];
        assert_eq!(num(&metrics["rate"]), 1.5);
        assert_eq!(num(&metrics["consumptionTop"]), 100.0);
        assert_eq!(num(&metrics["consumptionBottom"]), 60.0);
        assert_eq!(num(&metrics["costTop"]), 150.0);
        assert_eq!(num(&metrics["costBottom"]), 90.0);
        assert_eq!(num(&metrics["commonKwh"]), 40.0);
        assert_eq!(num(&metrics["commonCost"]), 60.0);
        assert_eq!(metrics["hasAnomaly"], false);
        assert_eq!(num(&body["previous"]["top"]), 1000.0);
        assert_eq!(body["date"], "2024-01-01");
    }

    #[tokio::test]
    async fn test_bill_requires_baseline() {
        let app = TestApp::new().await;
        let (status, body) = app.json(Method::POST, "/api/v1/bills", january()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
    }

    #[tokio::test]
    async fn test_validation_issues_are_listed() {
        let app = TestApp::with_baseline().await;
        let (status, body) = app
            .json(
                Method::POST,
                "/api/v1/bills",
                json!({"date": "2024-01-01", "amount": "abc", "kwh": 200, "top": 900, "bottom": 560}),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
        let details = body["details"].as_array().unwrap();
        assert_eq!(details[0]["code"], "amount_not_positive");
        assert_eq!(details[1]["code"], "reading_regressed");
        assert_eq!(details[1]["field"], "top");

        let (_, bills) = app.call(Method::GET, "/api/v1/bills").await;
        assert_eq!(bills.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_get_update_and_not_found() {
        let app = TestApp::with_baseline().await;
        let created = app.add_january().await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = app.call(Method::GET, &format!("/api/v1/bills/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());

        let (status, body) = app
            .json(
                Method::PUT,
                &format!("/api/v1/bills/{}", id),
                json!({"date": "2024-01-05", "amount": 400, "kwh": 200, "top": 1100, "bottom": 560}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());
        assert_eq!(body["date"], "2024-01-05");
        assert_eq!(num(&body["metrics"]["rate"]), 2.0);

        let (status, _) = app
            .call(Method::GET, "/api/v1/bills/00000000-0000-0000-0000-000000000099")
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.call(Method::GET, "/api/v1/bills/not-an-id").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod undo_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_then_undo_restores_bill() {
        let app = TestApp::with_baseline().await;
        let created = app.add_january().await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, offer) = app.call(Method::DELETE, &format!("/api/v1/bills/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(offer["kind"], "delete");
        let token = offer["token"].as_u64().unwrap();

        let (_, bills) = app.call(Method::GET, "/api/v1/bills").await;
        assert!(bills.as_array().unwrap().is_empty());

        let (status, restored) = app.call(Method::POST, &format!("/api/v1/undo/{}", token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(restored["id"], id.as_str());

        let (_, bills) = app.call(Method::GET, "/api/v1/bills").await;
        assert_eq!(bills.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_undo_after_window_is_gone() {
        let app = TestApp::with_baseline().await;
        let created = app.add_january().await;
        let id = created["id"].as_str().unwrap().to_string();

        let (_, offer) = app.call(Method::DELETE, &format!("/api/v1/bills/{}", id)).await;
        let token = offer["token"].as_u64().unwrap();
        app.clock.advance(chrono::Duration::seconds(11));

        let (status, body) = app.call(Method::POST, &format!("/api/v1/undo/{}", token)).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["error"], "gone");
    }

    #[tokio::test]
    async fn test_undo_without_offer_conflicts() {
        let app = TestApp::with_baseline().await;
        let (status, _) = app.call(Method::POST, "/api/v1/undo/42").await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}

mod data_tests {
    use super::*;

    #[tokio::test]
    async fn test_summary_and_clear_all() {
        let app = TestApp::with_baseline().await;
        app.add_january().await;

        let (status, summary) = app.call(Method::GET, "/api/v1/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["billCount"], 1);
        assert_eq!(num(&summary["totalConsumption"]), 160.0);
        assert_eq!(num(&summary["totalCost"]), 240.0);

        let (status, _) = app.call(Method::DELETE, "/api/v1/data").await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, settings) = app.call(Method::GET, "/api/v1/settings").await;
        assert_eq!(settings["isSet"], false);
        let (_, bills) = app.call(Method::GET, "/api/v1/bills").await;
        assert!(bills.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_baseline_rejected() {
        let app = TestApp::new().await;
        let (status, _) = app
            .json(Method::PUT, "/api/v1/settings", json!({"top": -1, "bottom": 500}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_then_import_skips_existing_dates() {
        let app = TestApp::with_baseline().await;
        app.add_january().await;

        let request = Request::builder()
            .uri("/api/v1/export.csv")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(csv.starts_with("date,main.amount,main.kwh,readings.top,"));
        assert!(csv.contains("2024-01-01,300,200,1100,100,150.00,560,60,90.00,40,60.00"));

        let upload = format!("{}2024-02-01,150,100,1150,50,75.00,590,30,45.00,20,30.00\n", csv);
        let (status, report) = app.text(Method::POST, "/api/v1/import.csv", upload).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["accepted"].as_array().unwrap().len(), 1);
        assert_eq!(report["skipped"][0]["row"], 2);
        assert_eq!(report["skipped"][0]["reason"]["code"], "duplicate_date");

        let (_, bills) = app.call(Method::GET, "/api/v1/bills").await;
        assert_eq!(bills.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_import_is_bad_request() {
        let app = TestApp::with_baseline().await;
        let (status, body) = app.text(Method::POST, "/api/v1/import.csv", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }
}

mod backup_tests {
    use super::*;

    #[tokio::test]
    async fn test_download_and_restore() {
        let app = TestApp::with_baseline().await;
        app.add_january().await;

        let request = Request::builder()
            .uri("/api/v1/backup")
            .body(Body::empty())
            .unwrap();
        let (status, document) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);

        app.call(Method::DELETE, "/api/v1/data").await;

        let (status, restored) = app.text(Method::POST, "/api/v1/backup/restore", document).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(restored["billCount"], 1);
        assert_eq!(restored["baselineSet"], true);

        let (_, bills) = app.call(Method::GET, "/api/v1/bills").await;
        assert_eq!(num(&bills[0]["metrics"]["costTop"]), 150.0);
    }

    #[tokio::test]
    async fn test_malformed_backup_names_record() {
        let app = TestApp::with_baseline().await;
        let document = json!([
            {"date": "2024-01-01", "main": {"amount": 1, "kwh": 1}, "readings": {"top": 1, "bottom": 1}},
            {"date": 5, "main": {"amount": 1, "kwh": 1}, "readings": {"top": 1, "bottom": 1}}
        ]);
        let (status, body) = app
            .text(Method::POST, "/api/v1/backup/restore", document.to_string())
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("record #2"));
    }

    #[tokio::test]
    async fn test_cloud_save_update_and_load() {
        let app = TestApp::with_baseline().await;
        app.add_january().await;

        let (status, saved) = app.json(Method::POST, "/api/v1/backup/cloud", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["created"], true);
        let id = saved["id"].as_str().unwrap().to_string();
        let edit_key = saved["editKey"].as_str().unwrap().to_string();

        let (status, updated) = app
            .json(Method::POST, "/api/v1/backup/cloud", json!({"id": id, "editKey": edit_key}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["created"], false);

        let (status, _) = app
            .json(Method::POST, "/api/v1/backup/cloud", json!({"id": id, "editKey": "wrong"}))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        app.call(Method::DELETE, "/api/v1/data").await;

        let url = format!("https://backups.local/api/json/{}", id);
        let (status, restored) = app
            .json(Method::POST, "/api/v1/backup/cloud/load", json!({"id": url}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(restored["backupId"], id.as_str());
        assert_eq!(restored["billCount"], 1);
    }

    #[tokio::test]
    async fn test_cloud_load_unknown_and_blank() {
        let app = TestApp::new().await;

        let (status, _) = app
            .json(Method::POST, "/api/v1/backup/cloud/load", json!({"id": "abc123"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .json(Method::POST, "/api/v1/backup/cloud/load", json!({"id": "   "}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
