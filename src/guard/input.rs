//! The input stream guard.

use std::sync::Arc;

use crate::contract::InputStream;
use crate::error::{Violation, ViolationKind};
use crate::warning::{ProtocolWarning, TracingSink, WarningKind, WarningSink};

/// Wraps the raw input stream so every read-like operation is checked
/// against the stream contract without altering stream content.
///
/// Sizes must be absent or non-negative; reads asking for more than the
/// declared content length are forwarded but warned about; `close` always
/// fails because the calling collaborator, not the handler, owns the
/// stream's lifetime.
///
/// # Examples
///
/// ```
/// use envelope_lint::{InputGuard, InputStream, MemoryInput};
///
/// let mut input = InputGuard::new(Box::new(MemoryInput::new(b"hello\n".to_vec())));
/// assert_eq!(input.read(Some(5)).unwrap(), b"hello");
/// assert!(input.read(Some(-1)).is_err());
/// assert!(input.close().is_err());
/// ```
pub struct InputGuard {
    inner: Box<dyn InputStream>,
    declared_length: Option<u64>,
    sink: Arc<dyn WarningSink>,
}

impl InputGuard {
    /// Wraps a stream with no declared length and the default warning sink.
    pub fn new(inner: Box<dyn InputStream>) -> Self {
        Self::with_state(inner, None, Arc::new(TracingSink))
    }

    pub(crate) fn with_state(
        inner: Box<dyn InputStream>,
        declared_length: Option<u64>,
        sink: Arc<dyn WarningSink>,
    ) -> Self {
        Self {
            inner,
            declared_length,
            sink,
        }
    }

    fn check_size(&self, size: Option<i64>, operation: &str) -> Result<(), Violation> {
        let size = match size {
            None => return Ok(()),
            Some(n) => n,
        };
        if size < 0 {
            return Err(Violation::new(
                ViolationKind::NegativeSize,
                format!("{} size must be non-negative, got {}", operation, size),
            ));
        }
        if let Some(declared) = self.declared_length {
            if size as u64 > declared {
                self.sink.emit(ProtocolWarning::new(
                    WarningKind::OversizeRead,
                    format!(
                        "{}({}) exceeds the declared content length of {}",
                        operation, size, declared
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl InputStream for InputGuard {
    fn read(&mut self, size: Option<i64>) -> Result<Vec<u8>, Violation> {
        self.check_size(size, "read")?;
        self.inner.read(size)
    }

    fn readline(&mut self, size: Option<i64>) -> Result<Vec<u8>, Violation> {
        self.check_size(size, "readline")?;
        self.inner.readline(size)
    }

    fn readlines(&mut self, hint: Option<i64>) -> Result<Vec<Vec<u8>>, Violation> {
        self.check_size(hint, "readlines")?;
        self.inner.readlines(hint)
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Violation> {
        self.inner.next_chunk()
    }

    fn close(&mut self) -> Result<(), Violation> {
        Err(Violation::new(
            ViolationKind::CloseForbidden,
            "the handler must not close the input stream",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryInput;
    use crate::warning::CollectingSink;

    fn guarded(data: &[u8]) -> InputGuard {
        InputGuard::new(Box::new(MemoryInput::new(data.to_vec())))
    }

    #[test]
    fn read_without_size_reads_to_end() {
        let mut input = guarded(b"hello");
        assert_eq!(input.read(None).expect("read"), b"hello");
        assert_eq!(input.read(None).expect("read"), b"");
    }

    #[test]
    fn negative_sizes_fail_on_every_operation() {
        let mut input = guarded(b"hello");
        assert_eq!(
            input.read(Some(-1)).expect_err("negative size").kind,
            ViolationKind::NegativeSize
        );
        assert_eq!(
            input.readline(Some(-5)).expect_err("negative size").kind,
            ViolationKind::NegativeSize
        );
        assert_eq!(
            input.readlines(Some(-2)).expect_err("negative size").kind,
            ViolationKind::NegativeSize
        );
    }

    #[test]
    fn close_always_fails_identically() {
        let mut input = guarded(b"");
        let first = input.close().expect_err("close is forbidden");
        let second = input.close().expect_err("close is forbidden");
        assert_eq!(first, second);
        assert_eq!(first.kind, ViolationKind::CloseForbidden);
    }

    #[test]
    fn oversize_read_warns_but_forwards() {
        let sink = CollectingSink::new();
        let mut input = InputGuard::with_state(
            Box::new(MemoryInput::new(b"ab".to_vec())),
            Some(2),
            Arc::new(sink.clone()),
        );
        assert_eq!(input.read(Some(10)).expect("read"), b"ab");
        let warnings = sink.collected();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::OversizeRead);
    }

    #[test]
    fn iteration_delegates_to_the_wrapped_stream() {
        let data = b"A line\nAnother line\nA final line\n";
        let mut input = guarded(data);
        let mut joined = Vec::new();
        while let Some(chunk) = input.next_chunk().expect("chunk") {
            joined.extend(chunk);
        }
        assert_eq!(joined, data);
    }
}
