//! The output guard around the handler's returned body.

use std::sync::Arc;

use crate::contract::{Body, BoxedBody};
use crate::error::{Violation, ViolationKind};
use crate::field::RawValue;
use crate::guard::state::{BodyChannel, InvocationState, SharedState};
use crate::warning::{ProtocolWarning, TracingSink, WarningKind, WarningSink};

/// Wraps the iterable a handler returns.
///
/// Construction itself enforces that the handler returned a body at all;
/// iteration enforces that every chunk is bytes and that the handler did
/// not mix the write callback with iteration. `close` is an idempotent
/// latch that forwards to the wrapped body exactly once and exposes
/// [`closed`](BodyGuard::closed) so the driving collaborator can assert the
/// close-exactly-once lifecycle.
///
/// # Examples
///
/// ```
/// use envelope_lint::{BodyGuard, MemoryBody, RawValue};
///
/// let body = MemoryBody::new(vec![RawValue::bytes(b"chunk".to_vec())]);
/// let mut guard = BodyGuard::new(Some(Box::new(body))).unwrap();
/// assert_eq!(guard.next_chunk().unwrap(), Some(b"chunk".to_vec()));
/// assert_eq!(guard.next_chunk().unwrap(), None);
/// guard.close();
/// assert!(guard.closed());
///
/// // A handler that returns no body at all is already in violation.
/// assert!(BodyGuard::new(None).is_err());
/// ```
pub struct BodyGuard {
    inner: BoxedBody,
    state: SharedState,
    sink: Arc<dyn WarningSink>,
    exhausted: bool,
    closed: bool,
}

impl BodyGuard {
    /// Wraps a body with fresh, standalone invocation state.
    ///
    /// # Errors
    ///
    /// Returns a [`Violation`] when the handler returned no body.
    pub fn new(body: Option<BoxedBody>) -> Result<Self, Violation> {
        Self::with_state(body, InvocationState::shared(), Arc::new(TracingSink))
    }

    pub(crate) fn with_state(
        body: Option<BoxedBody>,
        state: SharedState,
        sink: Arc<dyn WarningSink>,
    ) -> Result<Self, Violation> {
        let inner = body.ok_or_else(|| {
            Violation::new(
                ViolationKind::MissingBody,
                "the application must return an iterator, even if only an empty one",
            )
        })?;
        Ok(Self {
            inner,
            state,
            sink,
            exhausted: false,
            closed: false,
        })
    }

    /// Produces the next body chunk, checked against the contract.
    ///
    /// # Errors
    ///
    /// Returns a [`Violation`] when the chunk is not bytes or when the
    /// write callback was already used for this response.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Violation> {
        if self.closed || self.exhausted {
            return Ok(None);
        }
        let chunk = match self.inner.next_chunk() {
            None => {
                self.exhausted = true;
                return Ok(None);
            }
            Some(chunk) => chunk,
        };
        let bytes = match chunk {
            RawValue::Bytes(b) => b,
            RawValue::Text(_) => {
                return Err(Violation::new(
                    ViolationKind::NotBytes,
                    "the application must yield byte strings, not text",
                ))
            }
        };
        let mut state = self.state.borrow_mut();
        if state.channel == BodyChannel::Write {
            return Err(Violation::new(
                ViolationKind::ChannelConflict,
                "body iteration after write() was used",
            ));
        }
        state.channel = BodyChannel::Iterate;
        state.produced += bytes.len() as u64;
        Ok(Some(bytes))
    }

    /// Closes the wrapped body.
    ///
    /// Idempotent: the first call forwards to the wrapped body's close and
    /// latches; further calls do nothing. Closing an exhausted body whose
    /// declared Content-Length disagrees with the bytes actually produced
    /// emits a warning.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.inner.close();

        let state = self.state.borrow();
        if self.exhausted || state.channel == BodyChannel::Write {
            if let Some(declared) = state.declared_length {
                if declared != state.produced {
                    self.sink.emit(ProtocolWarning::new(
                        WarningKind::ContentLengthMismatch,
                        format!(
                            "declared Content-Length {} but the body produced {} bytes",
                            declared, state.produced
                        ),
                    ));
                }
            }
        }
    }

    /// True once [`close`](BodyGuard::close) has been called.
    pub fn closed(&self) -> bool {
        self.closed
    }
}

impl std::fmt::Debug for BodyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyGuard")
            .field("exhausted", &self.exhausted)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Iterator for BodyGuard {
    type Item = Result<Vec<u8>, Violation>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::RawValue;
    use crate::memory::MemoryBody;
    use crate::warning::CollectingSink;

    #[test]
    fn missing_body_is_a_violation() {
        let err = BodyGuard::new(None).expect_err("no body");
        assert_eq!(err.kind, ViolationKind::MissingBody);
    }

    #[test]
    fn empty_body_is_fine() {
        let mut guard = BodyGuard::new(Some(Box::new(MemoryBody::new(Vec::new())))).expect("body");
        assert_eq!(guard.next_chunk().expect("chunk"), None);
    }

    #[test]
    fn text_chunks_are_violations() {
        let body = MemoryBody::new(vec![RawValue::text("not bytes")]);
        let mut guard = BodyGuard::new(Some(Box::new(body))).expect("body");
        let err = guard.next_chunk().expect_err("text chunk");
        assert_eq!(err.kind, ViolationKind::NotBytes);
    }

    #[test]
    fn close_forwards_exactly_once() {
        let body = MemoryBody::new(Vec::new());
        let closes = body.close_handle();
        let mut guard = BodyGuard::new(Some(Box::new(body))).expect("body");

        guard.close();
        guard.close();
        assert!(guard.closed());
        assert_eq!(closes.close_count(), 1);
    }

    #[test]
    fn next_after_close_yields_nothing() {
        let body = MemoryBody::new(vec![RawValue::bytes(b"late".to_vec())]);
        let mut guard = BodyGuard::new(Some(Box::new(body))).expect("body");
        guard.close();
        assert_eq!(guard.next_chunk().expect("chunk"), None);
    }

    #[test]
    fn iteration_after_write_conflicts() {
        let body = MemoryBody::new(vec![RawValue::bytes(b"x".to_vec())]);
        let state = InvocationState::shared();
        state.borrow_mut().channel = BodyChannel::Write;
        let mut guard = BodyGuard::with_state(
            Some(Box::new(body)),
            state,
            Arc::new(CollectingSink::new()),
        )
        .expect("body");

        let err = guard.next_chunk().expect_err("channel conflict");
        assert_eq!(err.kind, ViolationKind::ChannelConflict);
    }

    #[test]
    fn empty_iterable_after_write_is_tolerated() {
        let body = MemoryBody::new(Vec::new());
        let state = InvocationState::shared();
        state.borrow_mut().channel = BodyChannel::Write;
        let mut guard = BodyGuard::with_state(
            Some(Box::new(body)),
            state,
            Arc::new(CollectingSink::new()),
        )
        .expect("body");

        assert_eq!(guard.next_chunk().expect("chunk"), None);
    }

    #[test]
    fn content_length_mismatch_warns_on_close() {
        let body = MemoryBody::new(vec![RawValue::bytes(b"abc".to_vec())]);
        let state = InvocationState::shared();
        state.borrow_mut().declared_length = Some(10);
        let sink = CollectingSink::new();
        let mut guard = BodyGuard::with_state(
            Some(Box::new(body)),
            state,
            Arc::new(sink.clone()),
        )
        .expect("body");

        while guard.next_chunk().expect("chunk").is_some() {}
        guard.close();

        let warnings = sink.collected();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::ContentLengthMismatch);
    }

    #[test]
    fn matching_content_length_stays_quiet() {
        let body = MemoryBody::new(vec![RawValue::bytes(b"abc".to_vec())]);
        let state = InvocationState::shared();
        state.borrow_mut().declared_length = Some(3);
        let sink = CollectingSink::new();
        let mut guard = BodyGuard::with_state(
            Some(Box::new(body)),
            state,
            Arc::new(sink.clone()),
        )
        .expect("body");

        while guard.next_chunk().expect("chunk").is_some() {}
        guard.close();
        assert!(sink.is_empty());
    }
}
