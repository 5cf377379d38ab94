//! Walkthrough: wrapping a handler and driving requests through the checker.
//!
//! Run with: cargo run --example lint_walkthrough

use envelope_lint::demo::DebugHandler;
use envelope_lint::TestHarness;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut app = TestHarness::new(DebugHandler::default());

    println!("=== A clean GET ===");
    let response = app.get("/demo/path").expect("conformant request");
    println!("status : {}", response.status);
    for (name, value) in &response.headers {
        println!("header : {}: {}", name, value);
    }
    println!("body   :\n{}", response.text());

    println!("=== A POST with a body ===");
    let response = app.post("/submit", b"name=alice").expect("conformant request");
    println!("status : {}", response.status);
    println!("body   :\n{}", response.text());

    println!("=== A 204 drops the body and its headers ===");
    let response = app
        .get("/?status=204%20No%20Content")
        .expect("conformant request");
    println!("status : {} ({} header(s))", response.status, response.headers.len());

    println!("=== An unusual method warns without failing ===");
    app.request("PROPFIND", "/", &[]).expect("warn, not fail");
    for warning in app.drain_warnings() {
        println!("warning: {}", warning);
    }
}
