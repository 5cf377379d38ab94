//! Capability contracts for the collaborators of one invocation.
//!
//! The audited protocol describes its streams by the operations they
//! support, not by concrete types. These traits pin that capability set
//! down explicitly so the guards operate against a fixed interface instead
//! of probing for supported operations at runtime.
//!
//! Every operation a guard can reject returns `Result<_, Violation>`, which
//! lets a guard implement the same trait as the stream it wraps and slot
//! back into the context unchanged.

use crate::context::Context;
use crate::error::Violation;
use crate::field::RawValue;
use crate::guard::Responder;

/// The request input stream capability set.
///
/// `size`/`hint` arguments are signed on purpose: a handler passing a
/// negative size is a contract violation the input guard must be able to
/// observe, not a value the type system silently makes unrepresentable.
pub trait InputStream {
    /// Reads up to `size` bytes, or to the end of the stream when `size`
    /// is absent.
    fn read(&mut self, size: Option<i64>) -> Result<Vec<u8>, Violation>;

    /// Reads one line, capped at `size` bytes when present.
    fn readline(&mut self, size: Option<i64>) -> Result<Vec<u8>, Violation>;

    /// Reads whole lines until the accumulated size reaches `hint`, or to
    /// the end of the stream when `hint` is absent.
    fn readlines(&mut self, hint: Option<i64>) -> Result<Vec<Vec<u8>>, Violation>;

    /// Produces the next chunk of the stream's own iteration protocol, or
    /// `None` at the end.
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Violation>;

    /// Closes the stream.
    ///
    /// Concrete streams may support this; the input guard never forwards
    /// it, because stream lifetime belongs to the calling collaborator.
    fn close(&mut self) -> Result<(), Violation>;
}

/// The error stream capability set: write, writelines, flush. No close.
pub trait ErrorStream {
    /// Writes one block of bytes.
    fn write(&mut self, data: &[u8]) -> Result<(), Violation>;

    /// Writes a sequence of byte blocks, element-wise.
    fn writelines(&mut self, lines: &[Vec<u8>]) -> Result<(), Violation>;

    /// Flushes buffered output.
    fn flush(&mut self) -> Result<(), Violation>;

    /// Closes the stream. Guarded identically to [`InputStream::close`].
    fn close(&mut self) -> Result<(), Violation>;
}

/// The synchronous write callback handed back by the response starter.
pub trait BodyWrite {
    /// Writes one body chunk. The chunk must be bytes, never text.
    fn write(&mut self, chunk: &RawValue) -> Result<(), Violation>;
}

/// The body a handler returns: a lazy, finite chunk sequence with an
/// optional close.
pub trait Body {
    /// Produces the next body chunk, or `None` when exhausted.
    fn next_chunk(&mut self) -> Option<RawValue>;

    /// Releases resources held by the body. Default: nothing to release.
    fn close(&mut self) {}
}

/// A boxed [`Body`].
pub type BoxedBody = Box<dyn Body>;

/// What a handler reports when restarting a response after its own
/// internal error — the escape hatch from the single-start rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    /// Short classification of the failure
    pub summary: String,
    /// Free-form detail
    pub detail: String,
}

impl FailureInfo {
    /// Creates new failure info.
    pub fn new(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

/// The collaborator's real response-start callback.
///
/// The auditor validates status and headers before this is reached, so
/// implementations may trust the shape of what they receive.
pub trait StartResponse {
    /// Declares status and headers, optionally with failure info, and
    /// returns the write callback for this response.
    fn start(
        &mut self,
        status: &RawValue,
        headers: &[(RawValue, RawValue)],
        failure: Option<&FailureInfo>,
    ) -> Box<dyn BodyWrite>;
}

/// A request-handling application, as seen by the wrapping middleware.
///
/// The handler receives the (guarded) context and a [`Responder`] in place
/// of the raw start callback, and returns its body — `None` here is itself
/// a contract violation the output guard reports.
pub trait Handler {
    /// Handles one request.
    fn call(
        &mut self,
        context: &mut Context,
        responder: &mut Responder<'_>,
    ) -> Result<Option<BoxedBody>, Violation>;
}
