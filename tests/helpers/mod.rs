//! Test helpers: an in-process app rooted in a temp dir, plus request builders.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use tower::ServiceExt;

use edition_admin::app_state::AppState;
use edition_admin::config::{AppConfig, QueueBackend};
use edition_admin::services::memory_queue::MemoryJobQueue;
use edition_admin::services::queue::{JobStore, QueuedJob};

pub const BOUNDARY: &str = "----edition-admin-test-boundary";

/// Router plus the pieces tests inspect directly.
pub struct TestApp {
    pub root: tempfile::TempDir,
    pub config: AppConfig,
    pub queue: Arc<dyn JobStore>,
    pub router: Router,
}

/// Response parts worth asserting on.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response is JSON")
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Text of the `<p class="message">` element, if the page has one.
    pub fn message(&self) -> Option<String> {
        let html = scraper::Html::parse_document(&self.text());
        let selector = scraper::Selector::parse("p.message").expect("valid selector");
        html.select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
    }
}

/// Configuration with every location inside `root` and the in-memory queue.
pub fn test_config(root: &Path) -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        queue_backend: QueueBackend::Memory,
        redis_url: "redis://127.0.0.1:6379".to_string(),
        job_retention_secs: 3600,
        worker_count: 1,
        edition_base_location: root.join("projects"),
        resources_location: root.join("resources"),
        output_location: root.join("output"),
        temp_root: root.join("tmp"),
        python_path: "sh".to_string(),
        baking_webpages_baseurl: "http://apparatus.test/apparatus".to_string(),
        webdriver_url: "http://127.0.0.1:4444".to_string(),
        browser_headless: true,
        upload_limit_bytes: 1024 * 1024,
        admin_user: "admin".to_string(),
        admin_password: None,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(|_| {})
}

pub fn test_app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let root = tempfile::tempdir().expect("create temp root");
    let mut config = test_config(root.path());
    configure(&mut config);
    std::fs::create_dir_all(&config.output_location).expect("create output dir");

    let queue: Arc<dyn JobStore> = Arc::new(MemoryJobQueue::new(Duration::from_secs(
        config.job_retention_secs,
    )));
    let prometheus = PrometheusBuilder::new().build_recorder().handle();
    let state = AppState::new(config.clone(), queue.clone());
    let router = edition_admin::routes::router(state, Arc::new(prometheus));

    TestApp {
        root,
        config,
        queue,
        router,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(get(uri)).await
    }

    /// Take the single queued job, failing the test if there is none.
    pub async fn take_job(&self) -> QueuedJob {
        self.queue
            .dequeue()
            .await
            .expect("dequeue")
            .expect("a job was queued")
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

pub fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub fn ajax_poll(task_id: Option<&str>) -> Request<Body> {
    let body = task_id
        .map(|id| format!("task_id={id}"))
        .unwrap_or_default();
    let mut request = post_form("/poll_state", &body);
    request.headers_mut().insert(
        "x-requested-with",
        "XMLHttpRequest".parse().expect("header value"),
    );
    request
}

/// `multipart/form-data` POST with text fields and an optional `xmlfile`.
pub fn post_multipart(uri: &str, fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"xmlfile\"; filename=\"{filename}\"\r\nContent-Type: text/xml\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("build request")
}

/// Job id from a `?job=<id>` redirect.
pub fn job_id_from_location(location: &str) -> String {
    location
        .strip_prefix("?job=")
        .unwrap_or_else(|| panic!("unexpected redirect {location}"))
        .to_string()
}
