//! End-to-end flows: the debug handler driven through the checker.

use envelope_lint::demo::DebugHandler;
use envelope_lint::TestHarness;

fn app() -> TestHarness<DebugHandler> {
    TestHarness::new(DebugHandler::default())
}

#[test]
fn environment_echo() {
    let mut app = app();
    let response = app.get("/some/path").expect("clean request");

    assert_eq!(response.status, "200 OK");
    assert_eq!(response.header("Content-Type"), Some("text/plain"));
    let text = response.text();
    assert!(text.contains("request-method: GET"));
    assert!(text.contains("path-info: /some/path"));
    assert!(text.contains("server-name: localhost"));
    assert!(app.warnings().is_empty());
}

#[test]
fn declared_content_length_matches_the_body() {
    let mut app = app();
    let response = app.get("/").expect("clean request");
    let declared: usize = response
        .header("Content-Length")
        .expect("length declared")
        .parse()
        .expect("numeric");
    assert_eq!(declared, response.body.len());
    assert!(app.warnings().is_empty());
}

#[test]
fn status_override_to_no_content() {
    let mut app = app();
    let response = app
        .get("/?status=204%20No%20Content")
        .expect("conformant 204");

    assert_eq!(response.status, "204 No Content");
    assert!(response.body.is_empty());
    assert_eq!(response.header("Content-Type"), None);
    assert_eq!(response.header("Content-Length"), None);
    assert!(app.warnings().is_empty());
}

#[test]
fn error_log_reaches_the_error_stream() {
    let mut app = app();
    let response = app.get("/?errorlog=boom").expect("clean request");
    assert_eq!(response.errors, b"boom");
}

#[test]
fn injected_headers_are_title_cased() {
    let mut app = app();
    let response = app.get("/?header-x-color=blue").expect("clean request");
    assert_eq!(response.header("X-Color"), Some("blue"));
}

#[test]
fn error_knob_restarts_the_response() {
    let mut app = app();
    let response = app.get("/?error=1").expect("restart is permitted");
    assert_eq!(response.status, "500 Internal Server Error");
    assert_eq!(response.body, b"internal error\n");
}

#[test]
fn posted_body_is_echoed() {
    let mut app = app();
    let response = app.post("/submit", b"name=alice").expect("clean request");
    let text = response.text();
    assert!(text.contains("-- Body ----------"));
    assert!(text.contains("name=alice"));
    assert!(text.contains("content-length: 10"));
}

#[test]
fn unusual_method_only_warns() {
    let mut app = app();
    let response = app.request("PROPFIND", "/", &[]).expect("warn, not fail");
    assert_eq!(response.status, "200 OK");

    let warnings = app.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("PROPFIND"));
}

#[test]
fn warnings_accumulate_across_requests() {
    let mut app = app();
    app.request("PROPFIND", "/", &[]).expect("first");
    app.request("BREW", "/", &[]).expect("second");
    assert_eq!(app.warnings().len(), 2);
    assert_eq!(app.drain_warnings().len(), 2);
    assert!(app.warnings().is_empty());
}
