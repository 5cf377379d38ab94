//! Pure contract validators.
//!
//! Each checker takes explicit immutable inputs and returns either `Ok`
//! (possibly carrying warnings) or the first `Violation` it finds. None of
//! them touch global state; the middleware composes them and routes their
//! warnings into the configured sink. They are public so a test can aim one
//! at a hand-built status or header list directly.

use crate::context::{keys, Context, Value};
use crate::error::{Violation, ViolationKind};
use crate::field::{is_latin1, RawValue};
use crate::warning::{ProtocolWarning, WarningKind};

/// Request methods that pass without comment. Anything else is unusual but
/// not invalid per the wider protocol, so it warns instead of failing.
const COMMON_METHODS: [&str; 8] = [
    "GET", "HEAD", "POST", "OPTIONS", "PUT", "DELETE", "TRACE", "PATCH",
];

/// URL schemes the envelope permits.
const SCHEMES: [&str; 2] = ["http", "https"];

/// Parses and range-checks the status code of a status line.
pub(crate) fn status_code(status: &RawValue) -> Result<u16, Violation> {
    let text = status.to_text();
    let token = text.split(' ').next().unwrap_or("");
    if token.len() != 3 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Violation::new(
            ViolationKind::MalformedStatus,
            format!("status code must be three digits, got {:?}", text),
        ));
    }
    let code: u16 = token.parse().map_err(|_| {
        Violation::new(
            ViolationKind::MalformedStatus,
            format!("status code does not parse as an integer in {:?}", text),
        )
    })?;
    if !(100..=599).contains(&code) {
        return Err(Violation::new(
            ViolationKind::MalformedStatus,
            format!("status code must be within 100-599, got {}", code),
        ));
    }
    Ok(code)
}

/// Validates a status line of the form `<3-digit code> <reason phrase>`.
///
/// A missing reason phrase is permitted but warned about.
///
/// # Examples
///
/// ```
/// use envelope_lint::{check_status, RawValue};
///
/// assert!(check_status(&RawValue::text("200 OK")).unwrap().is_empty());
/// assert!(check_status(&RawValue::text("99 Too Low")).is_err());
/// ```
pub fn check_status(status: &RawValue) -> Result<Vec<ProtocolWarning>, Violation> {
    status_code(status)?;
    let text = status.to_text();
    let mut warnings = Vec::new();
    let reason = text.split_once(' ').map(|(_, rest)| rest).unwrap_or("");
    if reason.trim().is_empty() {
        warnings.push(ProtocolWarning::new(
            WarningKind::NoReasonPhrase,
            format!("status {:?} carries no reason phrase", text),
        ));
    }
    Ok(warnings)
}

fn is_header_token(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Validates header well-formedness: native text only, Latin-1
/// representable, token-shaped names, no control characters in values, no
/// `Status` header, and no duplicated single-valued headers.
pub fn check_headers(headers: &[(RawValue, RawValue)]) -> Result<(), Violation> {
    let mut seen_content_type = false;
    let mut seen_content_length = false;

    for (name, value) in headers {
        let name = match name {
            RawValue::Text(s) => s.as_str(),
            RawValue::Bytes(_) => {
                return Err(Violation::new(
                    ViolationKind::MalformedHeader,
                    "header name must be a native string, not bytes",
                ))
            }
        };
        if !is_latin1(name) {
            return Err(Violation::new(
                ViolationKind::MalformedHeader,
                format!("header name {:?} is not Latin-1 representable", name),
            ));
        }
        if !is_header_token(name) {
            return Err(Violation::new(
                ViolationKind::MalformedHeader,
                format!("header name {:?} is not a valid token", name),
            ));
        }
        if name.eq_ignore_ascii_case("status") {
            return Err(Violation::new(
                ViolationKind::MalformedHeader,
                "handlers must not emit a Status header",
            ));
        }

        let value = match value {
            RawValue::Text(s) => s.as_str(),
            RawValue::Bytes(_) => {
                return Err(Violation::new(
                    ViolationKind::MalformedHeader,
                    format!("value for header {:?} must be a native string, not bytes", name),
                ))
            }
        };
        if !is_latin1(value) {
            return Err(Violation::new(
                ViolationKind::MalformedHeader,
                format!("value for header {:?} is not Latin-1 representable", name),
            ));
        }
        if value.chars().any(|c| (c as u32) < 0x20) {
            return Err(Violation::new(
                ViolationKind::MalformedHeader,
                format!("value for header {:?} contains control characters", name),
            ));
        }

        if name.eq_ignore_ascii_case("content-type") {
            if seen_content_type {
                return Err(Violation::new(
                    ViolationKind::DuplicateHeader,
                    "Content-Type may appear at most once",
                ));
            }
            seen_content_type = true;
        }
        if name.eq_ignore_ascii_case("content-length") {
            if seen_content_length {
                return Err(Violation::new(
                    ViolationKind::DuplicateHeader,
                    "Content-Length may appear at most once",
                ));
            }
            seen_content_length = true;
        }
    }
    Ok(())
}

fn header_value<'a>(headers: &'a [(RawValue, RawValue)], name: &str) -> Option<&'a RawValue> {
    headers
        .iter()
        .find(|(n, _)| {
            n.as_text()
                .map(|t| t.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
        .map(|(_, v)| v)
}

/// Returns the declared Content-Length, when present and digit-shaped.
pub(crate) fn declared_content_length(headers: &[(RawValue, RawValue)]) -> Option<u64> {
    header_value(headers, "content-length")
        .and_then(RawValue::as_text)
        .and_then(|s| s.parse().ok())
}

/// Cross-checks the status code against body-describing headers.
///
/// No-content statuses (204, 304 and 1xx) must not declare a Content-Type
/// or a nonzero Content-Length; every other status must declare a
/// Content-Type.
///
/// # Examples
///
/// ```
/// use envelope_lint::{check_content_type, RawValue};
///
/// let headers = vec![(
///     RawValue::text("Content-Type"),
///     RawValue::text("text/plain"),
/// )];
/// assert!(check_content_type(&RawValue::text("200 OK"), &headers).is_ok());
/// assert!(check_content_type(&RawValue::text("204 No Content"), &headers).is_err());
/// ```
pub fn check_content_type(
    status: &RawValue,
    headers: &[(RawValue, RawValue)],
) -> Result<(), Violation> {
    let code = status_code(status)?;
    let no_body = matches!(code, 204 | 304) || (100..200).contains(&code);
    let content_type = header_value(headers, "content-type");
    let declared = declared_content_length(headers).unwrap_or(0);

    if no_body {
        if content_type.is_some() {
            return Err(Violation::new(
                ViolationKind::HeaderNotAllowed,
                format!("status {} must not carry a Content-Type header", code),
            ));
        }
        if declared > 0 {
            return Err(Violation::new(
                ViolationKind::HeaderNotAllowed,
                format!(
                    "status {} must not carry a nonzero Content-Length, got {}",
                    code, declared
                ),
            ));
        }
        return Ok(());
    }

    if content_type.is_none() {
        return Err(Violation::new(
            ViolationKind::MissingContentType,
            format!("no Content-Type header found for status {}", code),
        ));
    }
    Ok(())
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Url-decodes `%XX` escapes, leaving malformed escapes literal.
pub(crate) fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(high * 16 + low);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn required_text<'a>(context: &'a Context, key: &'static str) -> Result<&'a str, Violation> {
    match context.get(key) {
        None => Err(Violation::new(
            ViolationKind::MissingKey { key },
            format!("required key '{}' is missing", key),
        )),
        Some(value) => value.as_text().ok_or_else(|| {
            Violation::new(
                ViolationKind::InvalidKey { key },
                format!("'{}' must be text, got {:?}", key, value),
            )
        }),
    }
}

fn optional_text<'a>(context: &'a Context, key: &'static str) -> Result<Option<&'a str>, Violation> {
    match context.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_text()
            .map(Some)
            .ok_or_else(|| {
                Violation::new(
                    ViolationKind::InvalidKey { key },
                    format!("'{}' must be text, got {:?}", key, value),
                )
            }),
    }
}

fn check_path_shape(key: &'static str, path: &str, allow_bare_slash: bool) -> Result<(), Violation> {
    if path.is_empty() || path.starts_with('/') {
        if !allow_bare_slash && path == "/" {
            return Err(Violation::new(
                ViolationKind::InvalidKey { key },
                format!("'{}' must not be a bare '/'", key),
            ));
        }
        return Ok(());
    }
    Err(Violation::new(
        ViolationKind::InvalidKey { key },
        format!("'{}' must be empty or start with '/', got {:?}", key, path),
    ))
}

/// Validates the inbound context: required keys present with the right
/// types and shapes, optional keys well-formed when present, and the path
/// reconstruction cross-check. Emits warnings for recommended-but-optional
/// keys and unusual methods; never mutates the context.
pub fn check_context(context: &Context) -> Result<Vec<ProtocolWarning>, Violation> {
    let mut warnings = Vec::new();

    let method = required_text(context, keys::REQUEST_METHOD)?;
    if method.is_empty() {
        return Err(Violation::new(
            ViolationKind::InvalidKey {
                key: keys::REQUEST_METHOD,
            },
            "request method must not be empty",
        ));
    }
    if !COMMON_METHODS.contains(&method) {
        warnings.push(ProtocolWarning::new(
            WarningKind::UnusualMethod,
            format!(
                "unknown value for '{}': {:?}",
                keys::REQUEST_METHOD,
                method
            ),
        ));
    }

    if let Some(script) = optional_text(context, keys::SCRIPT_NAME)? {
        check_path_shape(keys::SCRIPT_NAME, script, false)?;
    }
    let path = required_text(context, keys::PATH_INFO)?;
    check_path_shape(keys::PATH_INFO, path, true)?;

    match optional_text(context, keys::QUERY_STRING)? {
        Some(_) => {}
        None => warnings.push(ProtocolWarning::new(
            WarningKind::MissingKey {
                key: keys::QUERY_STRING,
            },
            format!(
                "'{}' is not in the context; it is recommended even when empty",
                keys::QUERY_STRING
            ),
        )),
    }

    optional_text(context, keys::CONTENT_TYPE)?;
    if let Some(length) = optional_text(context, keys::CONTENT_LENGTH)? {
        if length.is_empty() || !length.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Violation::new(
                ViolationKind::InvalidKey {
                    key: keys::CONTENT_LENGTH,
                },
                format!("'{}' must be a digit string, got {:?}", keys::CONTENT_LENGTH, length),
            ));
        }
    }

    required_text(context, keys::SERVER_NAME)?;
    let port = required_text(context, keys::SERVER_PORT)?;
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Violation::new(
            ViolationKind::InvalidKey {
                key: keys::SERVER_PORT,
            },
            format!("'{}' must be a numeric string, got {:?}", keys::SERVER_PORT, port),
        ));
    }

    match context.get(keys::PROTOCOL_VERSION) {
        None => {
            return Err(Violation::new(
                ViolationKind::MissingKey {
                    key: keys::PROTOCOL_VERSION,
                },
                format!("required key '{}' is missing", keys::PROTOCOL_VERSION),
            ))
        }
        Some(value) => match value.as_version() {
            Some((1, _)) => {}
            Some((major, minor)) => {
                return Err(Violation::new(
                    ViolationKind::InvalidKey {
                        key: keys::PROTOCOL_VERSION,
                    },
                    format!("protocol major version must be 1, got ({}, {})", major, minor),
                ))
            }
            None => {
                return Err(Violation::new(
                    ViolationKind::InvalidKey {
                        key: keys::PROTOCOL_VERSION,
                    },
                    format!("'{}' must be a version pair, got {:?}", keys::PROTOCOL_VERSION, value),
                ))
            }
        },
    }

    let scheme = required_text(context, keys::URL_SCHEME)?;
    if !SCHEMES.contains(&scheme) {
        return Err(Violation::new(
            ViolationKind::InvalidKey {
                key: keys::URL_SCHEME,
            },
            format!("'{}' must be one of {:?}, got {:?}", keys::URL_SCHEME, SCHEMES, scheme),
        ));
    }

    for key in [keys::MULTITHREAD, keys::MULTIPROCESS, keys::RUN_ONCE] {
        match context.get(key) {
            None => warnings.push(ProtocolWarning::new(
                WarningKind::MissingKey { key },
                format!("'{}' is not in the context; handlers may rely on it", key),
            )),
            Some(value) if value.as_bool().is_some() => {}
            Some(value) => {
                return Err(Violation::new(
                    ViolationKind::InvalidKey { key },
                    format!("'{}' must be a boolean, got {:?}", key, value),
                ))
            }
        }
    }

    if let Some(value) = context.get(keys::EXTENSIONS) {
        if value.as_map().is_none() {
            return Err(Violation::new(
                ViolationKind::InvalidKey {
                    key: keys::EXTENSIONS,
                },
                format!("'{}' must be a mapping, got {:?}", keys::EXTENSIONS, value),
            ));
        }
    }

    if !context.has_input() {
        return Err(Violation::new(
            ViolationKind::MissingKey {
                key: keys::INPUT_STREAM,
            },
            "no input stream is installed in the context",
        ));
    }
    if !context.has_errors() {
        return Err(Violation::new(
            ViolationKind::MissingKey {
                key: keys::ERROR_STREAM,
            },
            "no error stream is installed in the context",
        ));
    }

    if let (Some(raw), Some(script)) = (
        optional_text(context, keys::REQUEST_PATH)?,
        optional_text(context, keys::SCRIPT_NAME)?,
    ) {
        let mut rebuilt = percent_decode(script);
        rebuilt.extend(percent_decode(path));
        if rebuilt != percent_decode(raw) {
            return Err(Violation::new(
                ViolationKind::PathMismatch,
                format!(
                    "decoded '{}' + '{}' ({:?} + {:?}) does not reconstruct '{}' ({:?})",
                    keys::SCRIPT_NAME,
                    keys::PATH_INFO,
                    script,
                    path,
                    keys::REQUEST_PATH,
                    raw
                ),
            ));
        }
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_parses_common_lines() {
        assert_eq!(status_code(&RawValue::text("200 OK")).ok(), Some(200));
        assert_eq!(
            status_code(&RawValue::bytes(b"404 Not Found".to_vec())).ok(),
            Some(404)
        );
    }

    #[test]
    fn status_code_rejects_short_and_out_of_range() {
        assert!(status_code(&RawValue::text("99 Low")).is_err());
        assert!(status_code(&RawValue::text("600 High")).is_err());
        assert!(status_code(&RawValue::text("abc Nope")).is_err());
        assert!(status_code(&RawValue::text("")).is_err());
    }

    #[test]
    fn status_without_reason_warns() {
        let warnings = check_status(&RawValue::text("200")).expect("valid code");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::NoReasonPhrase);

        let warnings = check_status(&RawValue::text("200 ")).expect("valid code");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn header_token_shapes() {
        assert!(is_header_token("Content-Type"));
        assert!(is_header_token("X_Custom-1"));
        assert!(!is_header_token("1-Leading-Digit"));
        assert!(!is_header_token(""));
        assert!(!is_header_token("Has Space"));
    }

    #[test]
    fn headers_reject_status_header() {
        let headers = vec![(RawValue::text("Status"), RawValue::text("200 OK"))];
        let err = check_headers(&headers).expect_err("Status header is forbidden");
        assert_eq!(err.kind, ViolationKind::MalformedHeader);
    }

    #[test]
    fn headers_reject_control_characters() {
        let headers = vec![(RawValue::text("X-Note"), RawValue::text("a\r\nb"))];
        assert!(check_headers(&headers).is_err());
    }

    #[test]
    fn headers_reject_duplicate_content_length() {
        let headers = vec![
            (RawValue::text("Content-Length"), RawValue::text("1")),
            (RawValue::text("content-length"), RawValue::text("2")),
        ];
        let err = check_headers(&headers).expect_err("duplicate");
        assert_eq!(err.kind, ViolationKind::DuplicateHeader);
    }

    #[test]
    fn content_length_zero_is_tolerated_on_no_content() {
        let headers = vec![(RawValue::text("Content-Length"), RawValue::text("0"))];
        assert!(check_content_type(&RawValue::text("204 No Content"), &headers).is_ok());
    }

    #[test]
    fn informational_statuses_forbid_body_headers() {
        let headers = vec![(RawValue::text("Content-Type"), RawValue::text("text/plain"))];
        let err = check_content_type(&RawValue::text("100 Continue"), &headers)
            .expect_err("1xx forbids Content-Type");
        assert_eq!(err.kind, ViolationKind::HeaderNotAllowed);
    }

    #[test]
    fn percent_decode_handles_escapes_and_literals() {
        assert_eq!(percent_decode("/a%20b"), b"/a b".to_vec());
        assert_eq!(percent_decode("/a%2Gb"), b"/a%2Gb".to_vec());
        assert_eq!(percent_decode("%"), b"%".to_vec());
        assert_eq!(percent_decode("100%25"), b"100%".to_vec());
    }
}
