//! The error stream guard.

use crate::contract::ErrorStream;
use crate::error::{Violation, ViolationKind};

/// Wraps the error stream, forwarding `write`/`writelines`/`flush` and
/// forbidding `close` — the collaborator owns this stream's lifetime,
/// mirroring the input guard's policy.
pub struct ErrorGuard {
    inner: Box<dyn ErrorStream>,
}

impl ErrorGuard {
    /// Wraps an error stream.
    pub fn new(inner: Box<dyn ErrorStream>) -> Self {
        Self { inner }
    }
}

impl ErrorStream for ErrorGuard {
    fn write(&mut self, data: &[u8]) -> Result<(), Violation> {
        self.inner.write(data)
    }

    fn writelines(&mut self, lines: &[Vec<u8>]) -> Result<(), Violation> {
        for line in lines {
            self.write(line)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Violation> {
        self.inner.flush()
    }

    fn close(&mut self) -> Result<(), Violation> {
        Err(Violation::new(
            ViolationKind::CloseForbidden,
            "the handler must not close the error stream",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;

    #[test]
    fn writelines_forwards_each_element() {
        let sink = MemorySink::new();
        let mut errors = ErrorGuard::new(Box::new(sink.clone()));
        errors
            .writelines(&[b"a line".to_vec(), b"another line".to_vec()])
            .expect("writelines");
        assert_eq!(sink.contents(), b"a lineanother line");
    }

    #[test]
    fn flush_forwards() {
        let sink = MemorySink::new();
        let mut errors = ErrorGuard::new(Box::new(sink.clone()));
        errors.flush().expect("flush");
        assert_eq!(sink.flushes(), 1);
    }

    #[test]
    fn close_always_fails() {
        let mut errors = ErrorGuard::new(Box::new(MemorySink::new()));
        let first = errors.close().expect_err("close is forbidden");
        let second = errors.close().expect_err("close is forbidden");
        assert_eq!(first, second);
        assert_eq!(first.kind, ViolationKind::CloseForbidden);
    }
}
