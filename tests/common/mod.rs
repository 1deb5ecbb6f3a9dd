//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use cinder_server::config::ServerConfig;
use cinder_server::security::StoreBaseValidator;
use cinder_server::{HttpServer, Shutdown};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const INDEX_HTML: &str = "<html><body>SPA</body></html>";
pub const APP_JS: &str = "console.log(\"app\")";
pub const SECRET: &str = "root:x:0:0:root:/root:/bin/bash";

/// A built SPA bundle in a temp dir, with a file just outside the root.
pub struct Site {
    pub dir: TempDir,
    pub root: PathBuf,
}

pub fn build_site() -> Site {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("dist");
    std::fs::create_dir_all(root.join("assets")).unwrap();

    std::fs::write(root.join("index.html"), INDEX_HTML).unwrap();
    std::fs::write(root.join("assets/app.js"), APP_JS).unwrap();
    std::fs::write(root.join("assets/logo.png"), [0x89, b'P', b'N', b'G', 0, 1, 2, 3]).unwrap();
    std::fs::write(root.join("robots.txt"), "User-agent: *\nDisallow:\n").unwrap();
    std::fs::write(root.join("data.bin"), [0u8, 1, 2, 3]).unwrap();
    std::fs::write(dir.path().join("secret.txt"), SECRET).unwrap();

    Site { dir, root }
}

pub fn test_config(content_root: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.static_files.content_root = content_root.display().to_string();
    config.proxy.connect_timeout_secs = 2;
    config.proxy.upstream_timeout_secs = 5;
    config
}

/// Start a server on an ephemeral port.
pub async fn spawn_server(
    config: ServerConfig,
    validator: Arc<dyn StoreBaseValidator>,
) -> (SocketAddr, Shutdown) {
    let server = HttpServer::with_validator(config, validator).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Client that leaves encodings and redirects alone so tests see the raw response.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .no_gzip()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Store base under a mock server, in the Healthcare API path shape.
pub fn mock_store_base(mock_uri: &str) -> String {
    format!("{}/v1/projects/p/locations/l/datasets/d/fhirStores/s", mock_uri)
}

/// Send one request through the router in-process.
pub async fn call(
    router: &Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, HeaderMap, Bytes) {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    (parts.status, parts.headers, bytes)
}

pub fn assert_security_headers(headers: &HeaderMap) {
    let csp = headers
        .get("content-security-policy")
        .expect("missing Content-Security-Policy")
        .to_str()
        .unwrap();
    assert!(csp.contains("default-src 'self'"));
    assert!(csp.contains("accounts.google.com"));
    assert!(csp.contains("healthcare.googleapis.com"));
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(
        headers["strict-transport-security"],
        "max-age=31536000; includeSubDomains"
    );
}
