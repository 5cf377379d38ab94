//! An in-process driver for checked handlers.
//!
//! `TestHarness` plays the calling collaborator: it builds a well-formed
//! context for a request, runs it through the checked handler, merges the
//! write-callback output with the iterated chunks, closes the body exactly
//! once, and hands back the collected response together with any warnings.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::{keys, Context, Value};
use crate::contract::{BodyWrite, FailureInfo, Handler, StartResponse};
use crate::error::Violation;
use crate::field::RawValue;
use crate::memory::{MemoryInput, MemorySink};
use crate::middleware::{wrap_with, CheckedHandler, LintConfig};
use crate::warning::{CollectingSink, ProtocolWarning};

/// Builds a well-formed context for the given request line.
///
/// `path` may carry a query string (`/search?q=x`). The body, when
/// non-empty, is installed as the input stream with a matching declared
/// content length.
pub fn request_context(method: &str, path: &str, body: &[u8]) -> Context {
    let (path_info, query) = match path.split_once('?') {
        Some((p, q)) => (p, q),
        None => (path, ""),
    };

    let mut context = Context::new();
    context.set(keys::REQUEST_METHOD, Value::text(method));
    context.set(keys::SCRIPT_NAME, Value::text(""));
    context.set(keys::PATH_INFO, Value::text(path_info));
    context.set(keys::REQUEST_PATH, Value::text(path_info));
    context.set(keys::QUERY_STRING, Value::text(query));
    context.set(keys::SERVER_NAME, Value::text("localhost"));
    context.set(keys::SERVER_PORT, Value::text("80"));
    context.set(keys::PROTOCOL_VERSION, Value::Version(1, 0));
    context.set(keys::URL_SCHEME, Value::text("http"));
    context.set(keys::MULTITHREAD, Value::Bool(false));
    context.set(keys::MULTIPROCESS, Value::Bool(false));
    context.set(keys::RUN_ONCE, Value::Bool(true));
    if !body.is_empty() {
        context.set(keys::CONTENT_LENGTH, Value::text(body.len().to_string()));
        context.set(
            keys::CONTENT_TYPE,
            Value::text("application/octet-stream"),
        );
    }
    context.set_input(Box::new(MemoryInput::new(body.to_vec())));
    context.set_errors(Box::new(MemorySink::new()));
    context
}

/// The response a [`TestHarness`] request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedResponse {
    /// The status line as declared by the handler
    pub status: String,
    /// The declared headers, decoded to text
    pub headers: Vec<(String, String)>,
    /// Write-callback output followed by iterated chunks
    pub body: Vec<u8>,
    /// Everything the handler wrote to the error stream
    pub errors: Vec<u8>,
}

impl CollectedResponse {
    /// Looks up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Default)]
struct ResponseParts {
    status: String,
    headers: Vec<(String, String)>,
    written: Vec<u8>,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Collector {
    parts: Arc<Mutex<ResponseParts>>,
}

impl StartResponse for Collector {
    fn start(
        &mut self,
        status: &RawValue,
        headers: &[(RawValue, RawValue)],
        _failure: Option<&FailureInfo>,
    ) -> Box<dyn BodyWrite> {
        let mut parts = relock(&self.parts);
        parts.status = status.to_text();
        parts.headers = headers
            .iter()
            .map(|(name, value)| (name.to_text(), value.to_text()))
            .collect();
        Box::new(CollectorWriter {
            parts: Arc::clone(&self.parts),
        })
    }
}

struct CollectorWriter {
    parts: Arc<Mutex<ResponseParts>>,
}

impl BodyWrite for CollectorWriter {
    fn write(&mut self, chunk: &RawValue) -> Result<(), Violation> {
        if let Some(bytes) = chunk.as_bytes() {
            relock(&self.parts).written.extend_from_slice(bytes);
        }
        Ok(())
    }
}

/// Drives requests through a checked handler.
///
/// # Examples
///
/// ```
/// use envelope_lint::demo::DebugHandler;
/// use envelope_lint::TestHarness;
///
/// let mut app = TestHarness::new(DebugHandler::default());
/// let response = app.get("/").unwrap();
/// assert!(response.status.starts_with("200"));
/// assert!(app.warnings().is_empty());
/// ```
pub struct TestHarness<H> {
    handler: CheckedHandler<H>,
    warnings: CollectingSink,
}

impl<H: Handler> TestHarness<H> {
    /// Wraps a handler with a collecting warning sink.
    pub fn new(handler: H) -> Self {
        let warnings = CollectingSink::new();
        let config = LintConfig::new().warnings_to(Arc::new(warnings.clone()));
        Self {
            handler: wrap_with(handler, config),
            warnings,
        }
    }

    /// Issues a GET request.
    pub fn get(&mut self, path: &str) -> Result<CollectedResponse, Violation> {
        self.request("GET", path, &[])
    }

    /// Issues a POST request with a body.
    pub fn post(&mut self, path: &str, body: &[u8]) -> Result<CollectedResponse, Violation> {
        self.request("POST", path, body)
    }

    /// Issues a request with an arbitrary method.
    pub fn request(
        &mut self,
        method: &str,
        path: &str,
        body: &[u8],
    ) -> Result<CollectedResponse, Violation> {
        let context = request_context(method, path, body);
        self.run(context)
    }

    /// Drives a caller-built context through the checked handler.
    pub fn run(&mut self, mut context: Context) -> Result<CollectedResponse, Violation> {
        let error_sink = MemorySink::new();
        context.set_errors(Box::new(error_sink.clone()));

        let parts = Arc::new(Mutex::new(ResponseParts::default()));
        let collector = Collector {
            parts: Arc::clone(&parts),
        };

        let mut body_guard = self.handler.call(context, Box::new(collector))?;
        let mut iterated = Vec::new();
        while let Some(chunk) = body_guard.next_chunk()? {
            iterated.extend(chunk);
        }
        body_guard.close();
        debug_assert!(body_guard.closed());

        let parts = relock(&parts);
        let mut body = parts.written.clone();
        body.extend(iterated);
        Ok(CollectedResponse {
            status: parts.status.clone(),
            headers: parts.headers.clone(),
            body,
            errors: error_sink.contents(),
        })
    }

    /// Warnings collected across every request so far.
    pub fn warnings(&self) -> Vec<ProtocolWarning> {
        self.warnings.collected()
    }

    /// Removes and returns the collected warnings.
    pub fn drain_warnings(&self) -> Vec<ProtocolWarning> {
        self.warnings.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_context_is_clean() {
        let context = request_context("GET", "/a/b?x=1", &[]);
        assert_eq!(
            context.get(keys::PATH_INFO).and_then(Value::as_text),
            Some("/a/b")
        );
        assert_eq!(
            context.get(keys::QUERY_STRING).and_then(Value::as_text),
            Some("x=1")
        );
        assert!(crate::checks::check_context(&context)
            .expect("valid context")
            .is_empty());
    }

    #[test]
    fn post_context_declares_length() {
        let context = request_context("POST", "/submit", b"hello");
        assert_eq!(
            context.get(keys::CONTENT_LENGTH).and_then(Value::as_text),
            Some("5")
        );
    }

    #[test]
    fn collected_response_header_lookup_is_case_insensitive() {
        let response = CollectedResponse {
            status: "200 OK".to_string(),
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: Vec::new(),
            errors: Vec::new(),
        };
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.header("x-missing"), None);
    }
}
