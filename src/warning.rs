//! Non-fatal protocol warnings and their delivery side channel.
//!
//! Warnings flag conditions that are technically permissible but outside
//! best-practice expectations: a missing optional-but-common context key, an
//! unrecognized request method, a declared Content-Length that does not
//! match the bytes actually produced. They never abort the invocation and
//! are delivered through a [`WarningSink`] rather than the return value, so
//! a caller may observe or ignore them without altering control flow.

use std::fmt;
use std::sync::{Arc, Mutex};

/// A non-fatal advisory about a discouraged-but-legal condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolWarning {
    /// The kind of condition observed
    pub kind: WarningKind,
    /// Human-readable description
    pub message: String,
}

impl ProtocolWarning {
    /// Creates a new warning.
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProtocolWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// The kind of advisory condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// An optional-but-recommended context key is absent
    MissingKey {
        /// The key that was absent
        key: &'static str,
    },
    /// The request method is outside the common-verb allow list
    UnusualMethod,
    /// The status line carries no reason phrase
    NoReasonPhrase,
    /// A read requested more bytes than the declared content length
    OversizeRead,
    /// The produced body does not match the declared Content-Length
    ContentLengthMismatch,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::MissingKey { key } => write!(f, "missing recommended key '{}'", key),
            WarningKind::UnusualMethod => write!(f, "unusual request method"),
            WarningKind::NoReasonPhrase => write!(f, "no reason phrase"),
            WarningKind::OversizeRead => write!(f, "oversize read"),
            WarningKind::ContentLengthMismatch => write!(f, "content-length mismatch"),
        }
    }
}

/// The side channel warnings are delivered through.
///
/// Implementations must tolerate being shared (`&self` emission); one sink
/// instance serves every invocation of the handler it is configured on.
pub trait WarningSink {
    /// Delivers one warning.
    fn emit(&self, warning: ProtocolWarning);
}

/// Default sink: forwards warnings to `tracing` at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn emit(&self, warning: ProtocolWarning) {
        tracing::warn!(kind = %warning.kind, "{}", warning.message);
    }
}

/// A sink that accumulates warnings for later inspection.
///
/// Clones share one buffer, so a harness can keep a handle while the
/// middleware owns another.
///
/// # Examples
///
/// ```
/// use envelope_lint::{CollectingSink, ProtocolWarning, WarningKind, WarningSink};
///
/// let sink = CollectingSink::new();
/// sink.emit(ProtocolWarning::new(WarningKind::UnusualMethod, "PROPFIND"));
/// assert_eq!(sink.collected().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    collected: Arc<Mutex<Vec<ProtocolWarning>>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything emitted so far.
    pub fn collected(&self) -> Vec<ProtocolWarning> {
        self.lock().clone()
    }

    /// Removes and returns everything emitted so far.
    pub fn drain(&self) -> Vec<ProtocolWarning> {
        std::mem::take(&mut *self.lock())
    }

    /// True when nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ProtocolWarning>> {
        // A panicking emitter cannot corrupt a Vec of plain values.
        self.collected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WarningSink for CollectingSink {
    fn emit(&self, warning: ProtocolWarning) {
        self.lock().push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_accumulates_in_order() {
        let sink = CollectingSink::new();
        sink.emit(ProtocolWarning::new(WarningKind::UnusualMethod, "first"));
        sink.emit(ProtocolWarning::new(WarningKind::NoReasonPhrase, "second"));

        let collected = sink.collected();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].message, "first");
        assert_eq!(collected[1].message, "second");
    }

    #[test]
    fn clones_share_the_buffer() {
        let sink = CollectingSink::new();
        let handle = sink.clone();
        sink.emit(ProtocolWarning::new(WarningKind::OversizeRead, "shared"));
        assert_eq!(handle.collected().len(), 1);
    }

    #[test]
    fn drain_empties_the_buffer() {
        let sink = CollectingSink::new();
        sink.emit(ProtocolWarning::new(WarningKind::UnusualMethod, "x"));
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.is_empty());
    }
}
