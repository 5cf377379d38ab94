//! In-memory collaborators.
//!
//! These implement the capability contracts over plain buffers. The harness
//! and the demos use them as stand-ins for a real gateway's streams; tests
//! use them to observe exactly what the guards forwarded.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::contract::{Body, BodyWrite, ErrorStream, InputStream};
use crate::error::Violation;
use crate::field::RawValue;

/// A readable byte buffer with file-like semantics: positional reads,
/// line-oriented readline/readlines, and line-wise iteration.
pub struct MemoryInput {
    data: Vec<u8>,
    pos: usize,
}

impl MemoryInput {
    /// Creates an input stream over the given bytes.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Rewinds the read position to the start.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    fn take(&mut self, count: usize) -> Vec<u8> {
        let count = count.min(self.remaining().len());
        let chunk = self.data[self.pos..self.pos + count].to_vec();
        self.pos += count;
        chunk
    }

    fn line_length(&self, cap: Option<usize>) -> usize {
        let rest = self.remaining();
        let line_end = rest
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(rest.len());
        match cap {
            Some(cap) => line_end.min(cap),
            None => line_end,
        }
    }
}

impl InputStream for MemoryInput {
    fn read(&mut self, size: Option<i64>) -> Result<Vec<u8>, Violation> {
        let count = match size {
            Some(n) if n >= 0 => n as usize,
            _ => self.remaining().len(),
        };
        Ok(self.take(count))
    }

    fn readline(&mut self, size: Option<i64>) -> Result<Vec<u8>, Violation> {
        let cap = match size {
            Some(n) if n >= 0 => Some(n as usize),
            _ => None,
        };
        let length = self.line_length(cap);
        Ok(self.take(length))
    }

    fn readlines(&mut self, hint: Option<i64>) -> Result<Vec<Vec<u8>>, Violation> {
        let hint = match hint {
            Some(n) if n > 0 => Some(n as usize),
            _ => None,
        };
        let mut lines = Vec::new();
        let mut total = 0;
        loop {
            let line = self.readline(None)?;
            if line.is_empty() {
                break;
            }
            total += line.len();
            lines.push(line);
            if let Some(hint) = hint {
                if total >= hint {
                    break;
                }
            }
        }
        Ok(lines)
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Violation> {
        let line = self.readline(None)?;
        Ok(if line.is_empty() { None } else { Some(line) })
    }

    fn close(&mut self) -> Result<(), Violation> {
        Ok(())
    }
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct SinkBuffer {
    data: Vec<u8>,
    flushes: usize,
}

/// A shared-buffer error stream. Clones share one buffer, so a harness can
/// keep a handle while the context owns another.
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<SinkBuffer>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        relock(&self.buffer).data.clone()
    }

    /// How many times `flush` was called.
    pub fn flushes(&self) -> usize {
        relock(&self.buffer).flushes
    }
}

impl ErrorStream for MemorySink {
    fn write(&mut self, data: &[u8]) -> Result<(), Violation> {
        relock(&self.buffer).data.extend_from_slice(data);
        Ok(())
    }

    fn writelines(&mut self, lines: &[Vec<u8>]) -> Result<(), Violation> {
        for line in lines {
            self.write(line)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Violation> {
        relock(&self.buffer).flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Violation> {
        Ok(())
    }
}

/// A body over a fixed chunk list, counting how many times it was closed.
pub struct MemoryBody {
    chunks: VecDeque<RawValue>,
    closes: Arc<AtomicUsize>,
}

impl MemoryBody {
    /// Creates a body over the given chunks.
    pub fn new(chunks: Vec<RawValue>) -> Self {
        Self {
            chunks: chunks.into(),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns a handle observing this body's close calls.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            closes: Arc::clone(&self.closes),
        }
    }
}

impl Body for MemoryBody {
    fn next_chunk(&mut self) -> Option<RawValue> {
        self.chunks.pop_front()
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Observes whether (and how often) a [`MemoryBody`] was closed.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    closes: Arc<AtomicUsize>,
}

impl CloseHandle {
    /// True once the body has been closed at least once.
    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    /// How many times the body's close was invoked.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// A write callback recording everything it receives. Clones share the
/// record.
#[derive(Clone, Default)]
pub struct MemoryWriter {
    written: Arc<Mutex<Vec<RawValue>>>,
}

impl MemoryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle sharing this writer's record.
    pub fn handle(&self) -> MemoryWriter {
        self.clone()
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<RawValue> {
        relock(&self.written).clone()
    }

    /// The written chunks, flattened to one byte buffer.
    pub fn joined(&self) -> Vec<u8> {
        relock(&self.written)
            .iter()
            .filter_map(|chunk| chunk.as_bytes().map(<[u8]>::to_vec))
            .flatten()
            .collect()
    }
}

impl BodyWrite for MemoryWriter {
    fn write(&mut self, chunk: &RawValue) -> Result<(), Violation> {
        relock(&self.written).push(chunk.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_caps_at_remaining() {
        let mut input = MemoryInput::new(b"hello".to_vec());
        assert_eq!(input.read(Some(2)).expect("read"), b"he");
        assert_eq!(input.read(Some(100)).expect("read"), b"llo");
        assert_eq!(input.read(Some(1)).expect("read"), b"");
    }

    #[test]
    fn readline_stops_at_newline() {
        let mut input = MemoryInput::new(b"hello\nworld".to_vec());
        assert_eq!(input.readline(None).expect("line"), b"hello\n");
        assert_eq!(input.readline(None).expect("line"), b"world");
        assert_eq!(input.readline(None).expect("line"), b"");
    }

    #[test]
    fn readline_honours_the_size_cap() {
        let mut input = MemoryInput::new(b"hello\n".to_vec());
        assert_eq!(input.readline(Some(3)).expect("line"), b"hel");
        assert_eq!(input.readline(Some(10)).expect("line"), b"lo\n");
    }

    #[test]
    fn readlines_hint_stops_once_reached() {
        let mut input = MemoryInput::new(b"hello\nt\nrest\n".to_vec());
        let lines = input.readlines(Some(8)).expect("lines");
        assert_eq!(lines, vec![b"hello\n".to_vec(), b"t\n".to_vec()]);
    }

    #[test]
    fn readlines_without_hint_reads_everything() {
        let mut input = MemoryInput::new(b"a\nb\nc".to_vec());
        let lines = input.readlines(None).expect("lines");
        assert_eq!(lines, vec![b"a\n".to_vec(), b"b\n".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn rewind_allows_rereading() {
        let mut input = MemoryInput::new(b"data".to_vec());
        assert_eq!(input.read(None).expect("read"), b"data");
        input.rewind();
        assert_eq!(input.read(None).expect("read"), b"data");
    }

    #[test]
    fn sink_clones_share_contents() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write(b"boom").expect("write");
        assert_eq!(sink.contents(), b"boom");
    }

    #[test]
    fn body_close_counts() {
        let mut body = MemoryBody::new(Vec::new());
        let handle = body.close_handle();
        assert!(!handle.is_closed());
        body.close();
        body.close();
        assert_eq!(handle.close_count(), 2);
    }

    #[test]
    fn writer_joined_flattens_byte_chunks() {
        let writer = MemoryWriter::new();
        let mut sink: Box<dyn BodyWrite> = Box::new(writer.handle());
        sink.write(&RawValue::bytes(b"ab".to_vec())).expect("write");
        sink.write(&RawValue::bytes(b"cd".to_vec())).expect("write");
        assert_eq!(writer.joined(), b"abcd");
    }
}
