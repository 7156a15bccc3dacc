//! Integration tests for invoice-kit
//!
//! These tests drive the HTTP router in-process and verify end-to-end
//! behavior across aggregation, rendering, the PDF cache and the read path.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use invoice_kit::http::{self, AppState};
use invoice_kit::observability::CacheMetrics;
use invoice_kit::render::RenderContext;
use invoice_kit::{
    CacheKey, FormatRegistry, InMemoryProductStore, InvoiceService, PdfCache, ProductRecord,
    RenderedInvoice,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

// Product store used across tests
fn catalogue() -> InMemoryProductStore {
    vec![
        ProductRecord::new(1, "ItemA", 7),
        ProductRecord::new(2, "ItemB", 14),
        ProductRecord::new(3, "ItemC", 9),
    ]
    .into_iter()
    .collect()
}

fn service_with(cache: PdfCache) -> InvoiceService<InMemoryProductStore> {
    InvoiceService::new(catalogue(), FormatRegistry::standard(), cache).expect("build service")
}

fn app(dir: &TempDir) -> Router {
    let service = service_with(PdfCache::new(dir.path()));
    http::router(AppState::new(service, None))
}

struct TestResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }
}

async fn get(app: &Router, uri: &str) -> TestResponse {
    let request = Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost:8080")
        .body(Body::empty())
        .expect("build request");

    let response = app.clone().oneshot(request).await.expect("router call");
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec();

    TestResponse {
        status,
        content_type,
        body,
    }
}

fn pdf_files(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .expect("list storage dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .filter(|name| name.ends_with(".pdf"))
        .collect()
}

/// Metrics that count cache events.
#[derive(Clone, Default)]
struct CountingMetrics {
    hits: Arc<AtomicUsize>,
    generated: Arc<AtomicUsize>,
}

impl CacheMetrics for CountingMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn record_generated(&self, _key: &str, _duration: Duration, _bytes: usize) {
        self.generated.fetch_add(1, Ordering::SeqCst);
    }
}

/// Test 1: Raw invoice end-to-end
#[tokio::test]
async fn test_raw_invoice() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(&dir);

    let response = get(&app, "/api/invoice/raw?id=1&id=3").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "amountSum": 16,
            "productsList": [
                {"id": 1, "name": "ItemA", "amount": 7},
                {"id": 3, "name": "ItemC", "amount": 9}
            ]
        })
    );
    assert!(pdf_files(&dir).is_empty(), "raw must not write artifacts");
}

/// Test 2: Missing type defaults to raw, comma-separated IDs keep order
#[tokio::test]
async fn test_default_type_and_comma_separated_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(&dir);

    let response = get(&app, "/api/invoice?id=3,1&id=2").await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["amountSum"], 30);
    let names: Vec<&str> = body["productsList"]
        .as_array()
        .expect("products list")
        .iter()
        .map(|p| p["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["ItemC", "ItemA", "ItemB"]);
}

/// Test 3: Pdf twice yields one artifact and one redirect URL
#[tokio::test]
async fn test_pdf_invoice_is_cached() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(&dir);

    let first = get(&app, "/api/invoice/pdf?id=1&id=3").await;
    let second = get(&app, "/api/invoice/pdf?id=1&id=3").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);

    let url = first.json()["redirectUrl"]
        .as_str()
        .expect("redirectUrl")
        .to_string();
    assert_eq!(second.json()["redirectUrl"], url.as_str());

    let key = CacheKey::from_entities(&[
        ProductRecord::new(1, "ItemA", 7),
        ProductRecord::new(3, "ItemC", 9),
    ]);
    assert_eq!(
        url,
        format!("http://localhost:8080/api/access-pdf/{}.pdf", key)
    );
    assert_eq!(pdf_files(&dir), vec![key.file_name()]);
}

/// Test 4: Serving the artifact behind a redirect URL
#[tokio::test]
async fn test_access_pdf_serves_artifact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(&dir);

    let redirect = get(&app, "/api/invoice/pdf?id=2").await.json();
    let url = redirect["redirectUrl"].as_str().expect("redirectUrl");
    let path = url.trim_start_matches("http://localhost:8080");

    let served = get(&app, path).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.content_type.as_deref(), Some("application/pdf"));
    assert!(served.body.starts_with(b"%PDF-"));

    // The extension is optional on the read path.
    let without_ext = get(&app, path.trim_end_matches(".pdf")).await;
    assert_eq!(without_ext.status, StatusCode::OK);
    assert_eq!(without_ext.body, served.body);
}

/// Test 5: A missing product is reported regardless of its position
#[tokio::test]
async fn test_missing_product_any_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(&dir);

    for query in ["id=9,1,2", "id=1,9,2", "id=1&id=2&id=9"] {
        for kind in ["raw", "pdf"] {
            let response = get(&app, &format!("/api/invoice/{}?{}", kind, query)).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "{} {}", kind, query);
            assert_eq!(
                response.json(),
                json!({"status": "Product of ID 9 not found."})
            );
        }
    }
    assert!(pdf_files(&dir).is_empty());
}

/// Test 6: Unknown invoice type
#[tokio::test]
async fn test_unknown_type() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(&dir);

    let response = get(&app, "/api/invoice/xml?id=1").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({"status": "Type xml does not exist."}));
}

/// Test 7: Malformed ID parameters
#[tokio::test]
async fn test_invalid_id_parameters() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(&dir);

    let missing = get(&app, "/api/invoice/raw").await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let garbage = get(&app, "/api/invoice/raw?id=one").await;
    assert_eq!(garbage.status, StatusCode::BAD_REQUEST);
    assert_eq!(garbage.json(), json!({"status": "Invalid product ID one."}));
}

/// Test 8: The read path rejects unsafe names and reports absent files
#[tokio::test]
async fn test_access_pdf_guard() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(&dir);

    for uri in [
        "/api/access-pdf/..%2F..%2Fetc%2Fpasswd.pdf",
        "/api/access-pdf/foo%2Fbar.pdf",
        "/api/access-pdf/bad%20name.pdf",
        "/api/access-pdf/a.b.pdf",
    ] {
        let response = get(&app, uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(response.json(), json!({"status": "Illegal file access"}));
    }

    let absent = get(&app, "/api/access-pdf/absent").await;
    assert_eq!(absent.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        absent.json(),
        json!({"status": "File absent.pdf does not exist."})
    );
}

/// Test 9: Product listing
#[tokio::test]
async fn test_list_products() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(&dir);

    let response = get(&app, "/api/products").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!([
            {"id": 1, "name": "ItemA", "amount": 7},
            {"id": 2, "name": "ItemB", "amount": 14},
            {"id": 3, "name": "ItemC", "amount": 9}
        ])
    );
}

/// Test 10: Configured public URL wins over the Host header
#[tokio::test]
async fn test_public_url_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = service_with(PdfCache::new(dir.path()));
    let app = http::router(AppState::new(
        service,
        Some("https://billing.example.com".to_string()),
    ));

    let response = get(&app, "/api/invoice/pdf?id=1").await;
    let url = response.json()["redirectUrl"]
        .as_str()
        .expect("redirectUrl")
        .to_string();
    assert!(url.starts_with("https://billing.example.com/api/access-pdf/"));
}

/// Test 11: Concurrent requests for one key generate exactly once
///
/// Verifies:
/// - Every request receives the same redirect URL
/// - A single artifact exists afterwards
/// - All other requests observed a cache hit
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pdf_requests_generate_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let metrics = CountingMetrics::default();
    let cache = PdfCache::new(dir.path()).with_metrics(Box::new(metrics.clone()));
    let service = service_with(cache);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .invoice(Some("pdf"), &[1, 2, 3], &RenderContext::default())
                .await
        }));
    }

    let mut urls = Vec::new();
    for handle in handles {
        match handle.await.expect("task join").expect("pdf invoice") {
            RenderedInvoice::Redirect { url } => urls.push(url),
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    urls.dedup();
    assert_eq!(urls.len(), 1, "all requests share one URL");
    assert_eq!(metrics.generated.load(Ordering::SeqCst), 1);
    assert_eq!(metrics.hits.load(Ordering::SeqCst), 15);
    assert_eq!(pdf_files(&dir).len(), 1);
    assert_eq!(service.cache().in_flight(), 0);
}

/// Test 12: Different keys generate independently
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let metrics = CountingMetrics::default();
    let cache = PdfCache::new(dir.path()).with_metrics(Box::new(metrics.clone()));
    let service = service_with(cache);

    let requests: Vec<Vec<i64>> = vec![vec![1], vec![2], vec![3], vec![1, 2], vec![2, 1]];
    let mut handles = Vec::new();
    for ids in requests.clone() {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .invoice(Some("pdf"), &ids, &RenderContext::default())
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("task join").expect("pdf invoice");
    }

    assert_eq!(metrics.generated.load(Ordering::SeqCst), requests.len());
    assert_eq!(pdf_files(&dir).len(), requests.len());
}
