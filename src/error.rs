use std::fmt;

/// A fatal contract violation with details about which invariant broke.
///
/// Violations are raised synchronously at the point of detection and are
/// never recovered internally; they propagate to the caller and abort the
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The kind of violation that occurred
    pub kind: ViolationKind,
    /// Human-readable message naming the broken invariant and the offending value
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Violation {}

/// The kind of contract violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// The wrapped handler was invoked with the wrong calling convention
    Invocation,
    /// A required context key is missing
    MissingKey {
        /// The key that was absent
        key: &'static str,
    },
    /// A context key is present but its value breaks a type or shape constraint
    InvalidKey {
        /// The offending key
        key: &'static str,
    },
    /// Script and path components do not reconstruct the declared request path
    PathMismatch,
    /// The status line does not parse as "<3-digit code> <reason>"
    MalformedStatus,
    /// A header name or value breaks the header well-formedness rules
    MalformedHeader,
    /// A single-valued header appears more than once
    DuplicateHeader,
    /// A body-describing header appears on a status that forbids a body
    HeaderNotAllowed,
    /// A body-bearing status is missing its Content-Type header
    MissingContentType,
    /// The response-start callback was invoked again without failure info
    AlreadyStarted,
    /// The handler tried to close a stream it does not own
    CloseForbidden,
    /// A negative size was passed to a read operation
    NegativeSize,
    /// A text value was supplied where bytes are required
    NotBytes,
    /// The handler returned no body iterator at all
    MissingBody,
    /// The write callback and body iteration were mixed in one response
    ChannelConflict,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Invocation => write!(f, "Bad invocation"),
            ViolationKind::MissingKey { key } => write!(f, "Missing context key '{}'", key),
            ViolationKind::InvalidKey { key } => write!(f, "Invalid context key '{}'", key),
            ViolationKind::PathMismatch => write!(f, "Path reconstruction mismatch"),
            ViolationKind::MalformedStatus => write!(f, "Malformed status line"),
            ViolationKind::MalformedHeader => write!(f, "Malformed header"),
            ViolationKind::DuplicateHeader => write!(f, "Duplicate header"),
            ViolationKind::HeaderNotAllowed => write!(f, "Header not allowed"),
            ViolationKind::MissingContentType => write!(f, "Missing Content-Type"),
            ViolationKind::AlreadyStarted => write!(f, "Response already started"),
            ViolationKind::CloseForbidden => write!(f, "Close forbidden"),
            ViolationKind::NegativeSize => write!(f, "Negative size"),
            ViolationKind::NotBytes => write!(f, "Not a byte value"),
            ViolationKind::MissingBody => write!(f, "Missing body iterator"),
            ViolationKind::ChannelConflict => write!(f, "Body channel conflict"),
        }
    }
}
