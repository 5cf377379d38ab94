//! The response-start auditor and its write-callback guard.

use std::sync::Arc;

use crate::checks::{check_content_type, check_headers, check_status, declared_content_length, status_code};
use crate::contract::{BodyWrite, FailureInfo, StartResponse};
use crate::error::{Violation, ViolationKind};
use crate::field::RawValue;
use crate::guard::state::{BodyChannel, InvocationState, SharedState};
use crate::warning::WarningSink;

/// Audits the response-start callback.
///
/// A two-state machine: the first call validates the status line and header
/// list and flips to STARTED; a repeat call is only permitted when the
/// handler supplies [`FailureInfo`], signalling that it is restarting the
/// response after its own internal error. Whether the restart's status and
/// headers are validated again is configurable.
pub struct Responder<'a> {
    inner: &'a mut dyn StartResponse,
    state: SharedState,
    sink: Arc<dyn WarningSink>,
    revalidate_on_restart: bool,
}

impl<'a> Responder<'a> {
    pub(crate) fn new(
        inner: &'a mut dyn StartResponse,
        state: SharedState,
        sink: Arc<dyn WarningSink>,
        revalidate_on_restart: bool,
    ) -> Self {
        Self {
            inner,
            state,
            sink,
            revalidate_on_restart,
        }
    }

    /// Declares the response status and headers.
    ///
    /// # Errors
    ///
    /// Returns a [`Violation`] when the status line or header list is
    /// malformed, when the status and headers disagree about the body, or
    /// when the response was already started and no failure info was
    /// supplied.
    pub fn start(
        &mut self,
        status: &RawValue,
        headers: &[(RawValue, RawValue)],
        failure: Option<&FailureInfo>,
    ) -> Result<WriteGuard, Violation> {
        let already_started = self.state.borrow().started;
        let validate = if already_started {
            if failure.is_none() {
                return Err(Violation::new(
                    ViolationKind::AlreadyStarted,
                    "response has already been started",
                ));
            }
            self.revalidate_on_restart
        } else {
            true
        };

        if validate {
            for warning in check_status(status)? {
                self.sink.emit(warning);
            }
            check_headers(headers)?;
            check_content_type(status, headers)?;
        }

        {
            let mut state = self.state.borrow_mut();
            state.started = true;
            state.status_code = status_code(status).ok();
            state.declared_length = declared_content_length(headers);
        }

        let writer = self.inner.start(status, headers, failure);
        Ok(WriteGuard::with_state(writer, self.state.clone()))
    }
}

/// Guards the synchronous write callback returned by [`Responder::start`].
///
/// Every write must be a single byte value, and once the returned iterable
/// has begun producing chunks the write callback may no longer be used.
pub struct WriteGuard {
    inner: Box<dyn BodyWrite>,
    state: SharedState,
}

impl WriteGuard {
    /// Wraps a write callback with fresh, standalone invocation state.
    pub fn new(inner: Box<dyn BodyWrite>) -> Self {
        Self::with_state(inner, InvocationState::shared())
    }

    pub(crate) fn with_state(inner: Box<dyn BodyWrite>, state: SharedState) -> Self {
        Self { inner, state }
    }
}

impl std::fmt::Debug for WriteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteGuard").finish_non_exhaustive()
    }
}

impl BodyWrite for WriteGuard {
    fn write(&mut self, chunk: &RawValue) -> Result<(), Violation> {
        let bytes = match chunk {
            RawValue::Bytes(b) => b,
            RawValue::Text(_) => {
                return Err(Violation::new(
                    ViolationKind::NotBytes,
                    "write() argument must be a byte string",
                ))
            }
        };
        {
            let mut state = self.state.borrow_mut();
            if state.channel == BodyChannel::Iterate {
                return Err(Violation::new(
                    ViolationKind::ChannelConflict,
                    "write() used after body iteration began",
                ));
            }
            state.channel = BodyChannel::Write;
            state.produced += bytes.len() as u64;
        }
        self.inner.write(chunk)
    }
}
