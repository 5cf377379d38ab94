//! The invocation context: one request's metadata plus its I/O handles.
//!
//! The context is owned by the calling collaborator. The middleware only
//! reads it and swaps its two stream slots for guarded wrappers during one
//! invocation; it never mutates unrelated keys and never retains a
//! reference after the call returns.

use std::collections::BTreeMap;
use std::fmt;

use crate::contract::{ErrorStream, InputStream};

/// Context key names, exact and case-sensitive.
pub mod keys {
    /// The request method, e.g. `GET` (required).
    pub const REQUEST_METHOD: &str = "request-method";
    /// The script mount point; empty or `/`-prefixed, never a bare `/`.
    pub const SCRIPT_NAME: &str = "script-name";
    /// The remainder of the request path (required).
    pub const PATH_INFO: &str = "path-info";
    /// The raw query string (optional; its absence is warned about).
    pub const QUERY_STRING: &str = "query-string";
    /// The declared request body media type (optional).
    pub const CONTENT_TYPE: &str = "content-type";
    /// The declared request body length, a digit string (optional).
    pub const CONTENT_LENGTH: &str = "content-length";
    /// The serving host name (required).
    pub const SERVER_NAME: &str = "server-name";
    /// The serving port, a numeric string (required).
    pub const SERVER_PORT: &str = "server-port";
    /// The protocol version pair; major version must be 1 (required).
    pub const PROTOCOL_VERSION: &str = "protocol-version";
    /// The URL scheme, `http` or `https` (required).
    pub const URL_SCHEME: &str = "url-scheme";
    /// The full undecoded request path, used for the reconstruction
    /// cross-check (optional).
    pub const REQUEST_PATH: &str = "request-path";
    /// Whether the handler may be invoked from multiple threads.
    pub const MULTITHREAD: &str = "multithread";
    /// Whether the handler may be invoked from multiple processes.
    pub const MULTIPROCESS: &str = "multiprocess";
    /// Whether the handler will be invoked at most once per process.
    pub const RUN_ONCE: &str = "run-once";
    /// Vendor extension sub-mapping; only its map shape is checked.
    pub const EXTENSIONS: &str = "vendor-extensions";
    /// Name of the input stream slot, used in diagnostics.
    pub const INPUT_STREAM: &str = "input-stream";
    /// Name of the error stream slot, used in diagnostics.
    pub const ERROR_STREAM: &str = "error-stream";
}

/// A heterogeneous context value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Native text
    Text(String),
    /// An integer
    Int(i64),
    /// A boolean flag
    Bool(bool),
    /// A protocol version pair (major, minor)
    Version(u32, u32),
    /// A nested mapping, as used for vendor extensions
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Convenience constructor for text values.
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean content, if this is a flag value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the version pair, if this is a version value.
    pub fn as_version(&self) -> Option<(u32, u32)> {
        match self {
            Value::Version(major, minor) => Some((*major, *minor)),
            _ => None,
        }
    }

    /// Returns the nested mapping, if this is a map value.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Version(major, minor) => write!(f, "({}, {})", major, minor),
            Value::Map(m) => write!(f, "{{{} entries}}", m.len()),
        }
    }
}

/// One inbound request's key/value mapping and stream handles.
///
/// # Examples
///
/// ```
/// use envelope_lint::{keys, Context, MemoryInput, MemorySink, Value};
///
/// let mut context = Context::new();
/// context.set(keys::REQUEST_METHOD, Value::text("GET"));
/// context.set(keys::PATH_INFO, Value::text("/"));
/// context.set_input(Box::new(MemoryInput::new(b"".to_vec())));
/// context.set_errors(Box::new(MemorySink::new()));
///
/// assert_eq!(
///     context.get(keys::REQUEST_METHOD).and_then(Value::as_text),
///     Some("GET")
/// );
/// assert!(context.has_input());
/// ```
#[derive(Default)]
pub struct Context {
    fields: BTreeMap<String, Value>,
    input: Option<Box<dyn InputStream>>,
    errors: Option<Box<dyn ErrorStream>>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one field.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Looks up one field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// True when the field is present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// All fields, in sorted key order.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Installs the input stream.
    pub fn set_input(&mut self, input: Box<dyn InputStream>) {
        self.input = Some(input);
    }

    /// Installs the error stream.
    pub fn set_errors(&mut self, errors: Box<dyn ErrorStream>) {
        self.errors = Some(errors);
    }

    /// True when an input stream is installed.
    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// True when an error stream is installed.
    pub fn has_errors(&self) -> bool {
        self.errors.is_some()
    }

    /// Borrows the input stream for reading.
    pub fn input(&mut self) -> Option<&mut (dyn InputStream + 'static)> {
        self.input.as_deref_mut()
    }

    /// Borrows the error stream for writing.
    pub fn errors(&mut self) -> Option<&mut (dyn ErrorStream + 'static)> {
        self.errors.as_deref_mut()
    }

    /// Removes and returns the input stream, leaving the slot empty.
    pub fn take_input(&mut self) -> Option<Box<dyn InputStream>> {
        self.input.take()
    }

    /// Removes and returns the error stream, leaving the slot empty.
    pub fn take_errors(&mut self) -> Option<Box<dyn ErrorStream>> {
        self.errors.take()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("fields", &self.fields)
            .field("input", &self.input.is_some())
            .field("errors", &self.errors.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryInput, MemorySink};

    #[test]
    fn set_and_get_round_trip() {
        let mut context = Context::new();
        context.set(keys::SERVER_PORT, Value::text("8080"));
        assert_eq!(
            context.get(keys::SERVER_PORT).and_then(Value::as_text),
            Some("8080")
        );
        assert!(!context.contains(keys::SERVER_NAME));
    }

    #[test]
    fn value_accessors_reject_other_shapes() {
        assert_eq!(Value::text("x").as_bool(), None);
        assert_eq!(Value::Bool(true).as_text(), None);
        assert_eq!(Value::Version(1, 0).as_version(), Some((1, 0)));
        assert_eq!(Value::Int(9).as_int(), Some(9));
    }

    #[test]
    fn stream_slots_install_and_take() {
        let mut context = Context::new();
        assert!(!context.has_input());

        context.set_input(Box::new(MemoryInput::new(b"abc".to_vec())));
        context.set_errors(Box::new(MemorySink::new()));
        assert!(context.has_input());
        assert!(context.has_errors());

        let taken = context.take_input();
        assert!(taken.is_some());
        assert!(!context.has_input());
    }

    #[test]
    fn version_displays_as_pair() {
        assert_eq!(Value::Version(1, 0).to_string(), "(1, 0)");
    }

    #[test]
    fn fields_iterate_in_sorted_order() {
        let mut context = Context::new();
        context.set("zeta", Value::text("z"));
        context.set("alpha", Value::text("a"));
        let keys: Vec<&str> = context.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }
}
