//! Runtime conformance checking for request-handler protocol envelopes.
//!
//! This crate wraps a request-handling application and validates, while a
//! request runs, that both sides obey the envelope contract: fixed context
//! keys with fixed types, single-call response-start semantics, header
//! well-formedness, status/header/body consistency, and the stream-closing
//! discipline. It exists to catch contract drift during testing, turning
//! silent protocol violations into immediate, precise failures.
//!
//! # Core Pieces
//!
//! - [`wrap`]: produces a [`CheckedHandler`], a drop-in replacement with
//!   the same calling convention as the wrapped [`Handler`]
//! - [`check_context`], [`check_status`], [`check_headers`],
//!   [`check_content_type`]: the pure validators the middleware composes
//! - [`InputGuard`], [`ErrorGuard`], [`Responder`], [`WriteGuard`],
//!   [`BodyGuard`]: the per-invocation wrappers around the collaborators
//! - [`Violation`]: fatal contract breaks; [`ProtocolWarning`]: advisory
//!   conditions delivered through a [`WarningSink`]
//!
//! # Examples
//!
//! ```
//! use envelope_lint::demo::DebugHandler;
//! use envelope_lint::TestHarness;
//!
//! // Wrap the example handler and drive a request through the checker.
//! let mut app = TestHarness::new(DebugHandler::default());
//! let response = app.get("/").unwrap();
//!
//! assert_eq!(response.status, "200 OK");
//! assert!(response.text().contains("request-method: GET"));
//! assert!(app.warnings().is_empty());
//! ```
//!
//! A handler that breaks the contract fails loudly instead:
//!
//! ```
//! use envelope_lint::{check_content_type, RawValue, ViolationKind};
//!
//! let headers = vec![
//!     (RawValue::text("Content-Type"), RawValue::text("text/plain")),
//!     (RawValue::text("Content-Length"), RawValue::text("4")),
//! ];
//! let violation =
//!     check_content_type(&RawValue::text("204 No Content"), &headers).unwrap_err();
//! assert_eq!(violation.kind, ViolationKind::HeaderNotAllowed);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod checks;
mod context;
mod contract;
pub mod demo;
mod error;
mod field;
mod guard;
mod harness;
mod memory;
mod middleware;
mod warning;

pub use checks::{check_content_type, check_context, check_headers, check_status};
pub use context::{keys, Context, Value};
pub use contract::{
    Body, BodyWrite, BoxedBody, ErrorStream, FailureInfo, Handler, InputStream, StartResponse,
};
pub use error::{Violation, ViolationKind};
pub use field::{is_latin1, latin1_decode, latin1_encode, RawValue};
pub use guard::{BodyGuard, ErrorGuard, InputGuard, Responder, WriteGuard};
pub use harness::{request_context, CollectedResponse, TestHarness};
pub use memory::{CloseHandle, MemoryBody, MemoryInput, MemorySink, MemoryWriter};
pub use middleware::{wrap, wrap_with, CallArg, CheckedHandler, Invocation, LintConfig};
pub use warning::{CollectingSink, ProtocolWarning, TracingSink, WarningKind, WarningSink};
