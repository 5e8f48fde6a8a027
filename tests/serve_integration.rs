//! Integration tests for the chapter server
//!
//! Each test spawns the real binary against the sample book fixture and
//! probes it over HTTP.

use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Start the server and return the child process
fn start_server(fixture_path: &str, port: u16) -> Child {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let fixture_full_path = format!("{}/tests/fixtures/{}", manifest_dir, fixture_path);

    Command::new(env!("CARGO_BIN_EXE_lectern"))
        .args(["serve", &fixture_full_path, "-p", &port.to_string()])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start server")
}

/// Wait for server to be ready by polling the root endpoint
fn wait_for_server(port: u16, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    let client = reqwest::blocking::Client::new();

    while start.elapsed() < timeout {
        if let Ok(resp) = client.get(format!("http://127.0.0.1:{}/", port)).send()
            && resp.status().is_success()
        {
            return true;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    false
}

/// The catalog endpoint returns the fixture catalog in order
#[test]
fn catalog_endpoint_lists_chapters() {
    let port = 14620;
    let mut server = start_server("sample-book", port);
    assert!(
        wait_for_server(port, Duration::from_secs(30)),
        "Server did not start within timeout"
    );

    let client = reqwest::blocking::Client::new();
    let resp = client
        .get(format!("http://127.0.0.1:{}/api/chapters", port))
        .send()
        .expect("Failed to fetch catalog");

    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/json; charset=utf-8")
    );

    let chapters: serde_json::Value = resp.json().expect("Failed to parse catalog JSON");
    let list = chapters.as_array().expect("catalog should be an array");
    assert_eq!(list.len(), 3);
    assert_eq!(list[0]["id"], "preface");
    assert_eq!(list[1]["part"], "Part I: Foundations");
    assert_eq!(list[2]["title"], "Chapter 2: Transformers");

    server.kill().ok();
    server.wait().ok();
}

/// Chapter HTML is reachable on both routes with the revalidation policy
#[test]
fn chapter_routes_serve_html_with_cache_policy() {
    let port = 14621;
    let mut server = start_server("sample-book", port);
    assert!(
        wait_for_server(port, Duration::from_secs(30)),
        "Server did not start within timeout"
    );

    let client = reqwest::blocking::Client::new();
    let routes = [
        format!("http://127.0.0.1:{}/chapters/attention.html", port),
        format!("http://127.0.0.1:{}/api/chapter/attention", port),
    ];

    for url in routes {
        let resp = client.get(&url).send().expect("Failed to fetch chapter");
        assert!(resp.status().is_success(), "{} returned {}", url, resp.status());
        assert_eq!(
            resp.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("text/html; charset=utf-8"),
            "wrong content type for {}",
            url
        );
        assert_eq!(
            resp.headers()
                .get("cache-control")
                .and_then(|v| v.to_str().ok()),
            Some("public, max-age=0, must-revalidate"),
            "wrong cache policy for {}",
            url
        );
        let body = resp.text().expect("Failed to read chapter body");
        assert!(body.contains("Scaled dot products"));
    }

    server.kill().ok();
    server.wait().ok();
}

/// Missing chapters come back as structured 404 JSON
#[test]
fn missing_chapter_returns_structured_not_found() {
    let port = 14622;
    let mut server = start_server("sample-book", port);
    assert!(
        wait_for_server(port, Duration::from_secs(30)),
        "Server did not start within timeout"
    );

    let client = reqwest::blocking::Client::new();
    let resp = client
        .get(format!("http://127.0.0.1:{}/api/chapter/ghost", port))
        .send()
        .expect("Failed to fetch missing chapter");

    assert_eq!(resp.status().as_u16(), 404);
    let body: serde_json::Value = resp.json().expect("404 body should be JSON");
    assert_eq!(body["error"], "Chapter not found");
    assert_eq!(body["id"], "ghost");
    let tried = body["triedPaths"].as_array().expect("triedPaths array");
    assert_eq!(tried.len(), 1);
    assert!(
        tried[0].as_str().unwrap_or_default().ends_with("ghost.html"),
        "unexpected triedPaths entry: {tried:?}"
    );

    server.kill().ok();
    server.wait().ok();
}

/// Traversal-shaped ids are rejected before any filesystem access
#[test]
fn traversal_ids_are_rejected() {
    let port = 14623;
    let mut server = start_server("sample-book", port);
    assert!(
        wait_for_server(port, Duration::from_secs(30)),
        "Server did not start within timeout"
    );

    let client = reqwest::blocking::Client::new();
    for id in ["..", "..%2F..%2Fsecret", "a.b"] {
        let resp = client
            .get(format!("http://127.0.0.1:{}/api/chapter/{}", port, id))
            .send()
            .expect("Failed to send traversal request");
        assert_eq!(resp.status().as_u16(), 404, "id {id} should be rejected");
        let body: serde_json::Value = resp.json().expect("404 body should be JSON");
        assert_eq!(
            body["triedPaths"].as_array().map(Vec::len),
            Some(0),
            "traversal id {id} must not reach a path lookup"
        );
    }

    // Only one ".html" suffix is stripped, so a doubled suffix is not a
    // second route to an existing chapter
    let resp = client
        .get(format!(
            "http://127.0.0.1:{}/chapters/attention.html.html",
            port
        ))
        .send()
        .expect("Failed to send doubled-suffix request");
    assert_eq!(resp.status().as_u16(), 404);
    let body: serde_json::Value = resp.json().expect("404 body should be JSON");
    assert_eq!(body["id"], "attention.html");
    assert_eq!(body["triedPaths"].as_array().map(Vec::len), Some(0));

    server.kill().ok();
    server.wait().ok();
}

/// Diagram assets resolve under the canonical absolute path
#[test]
fn diagrams_are_served_with_long_cache() {
    let port = 14624;
    let mut server = start_server("sample-book", port);
    assert!(
        wait_for_server(port, Duration::from_secs(30)),
        "Server did not start within timeout"
    );

    let client = reqwest::blocking::Client::new();
    let resp = client
        .get(format!(
            "http://127.0.0.1:{}/chapters/diagrams/attention.svg",
            port
        ))
        .send()
        .expect("Failed to fetch diagram");

    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("image/svg+xml")
    );
    assert_eq!(
        resp.headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("public, max-age=86400")
    );

    server.kill().ok();
    server.wait().ok();
}

/// The public directory backs the root route
#[test]
fn index_page_is_served_at_root() {
    let port = 14625;
    let mut server = start_server("sample-book", port);
    assert!(
        wait_for_server(port, Duration::from_secs(30)),
        "Server did not start within timeout"
    );

    let client = reqwest::blocking::Client::new();
    let body = client
        .get(format!("http://127.0.0.1:{}/", port))
        .send()
        .expect("Failed to fetch index")
        .text()
        .expect("Failed to read index body");
    assert!(body.contains("Sample Book"));

    server.kill().ok();
    server.wait().ok();
}
