//! A conformant example handler for exercising the checker.
//!
//! `DebugHandler` echoes the request environment back as plain text and
//! supports a few query knobs that make it easy to drive the interesting
//! corners of the envelope contract from tests and demos:
//!
//! - `status=<line>` overrides the response status (204/304 drop the body
//!   and the body-describing headers)
//! - `errorlog=<text>` writes the text to the error stream
//! - `header-<name>=<value>` injects an extra response header
//! - `error` makes the handler fail mid-response and restart it with
//!   failure info, exercising the raise-then-recall protocol

use crate::checks::percent_decode;
use crate::context::{keys, Context, Value};
use crate::contract::{BoxedBody, ErrorStream, FailureInfo, Handler, InputStream};
use crate::error::Violation;
use crate::field::RawValue;
use crate::guard::Responder;
use crate::memory::MemoryBody;

/// The example application: displays the request environment and does
/// nothing else. Useful for debugging and for exercising the checker.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugHandler;

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(name), decode_component(value))
        })
        .collect()
}

fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    String::from_utf8_lossy(&percent_decode(&spaced)).into_owned()
}

fn lookup<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn title_case(name: &str) -> String {
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

impl DebugHandler {
    fn render_environment(&self, context: &Context) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in context.fields() {
            out.extend(format!("{}: {}\n", name, value).into_bytes());
        }
        out
    }
}

impl Handler for DebugHandler {
    fn call(
        &mut self,
        context: &mut Context,
        responder: &mut Responder<'_>,
    ) -> Result<Option<BoxedBody>, Violation> {
        let query = context
            .get(keys::QUERY_STRING)
            .and_then(Value::as_text)
            .unwrap_or("")
            .to_string();
        let params = parse_query(&query);

        if let Some(log) = lookup(&params, "errorlog") {
            let message = log.as_bytes().to_vec();
            if let Some(errors) = context.errors() {
                errors.write(&message)?;
                errors.flush()?;
            }
        }

        if lookup(&params, "error").is_some() {
            // Start normally, then restart with failure info, the way a
            // handler recovering from its own mid-response error would.
            let headers = vec![
                (RawValue::text("Content-Type"), RawValue::text("text/plain")),
            ];
            responder.start(&RawValue::text("200 OK"), &headers, None)?;

            let body = b"internal error\n".to_vec();
            let failure = FailureInfo::new("error requested", "the 'error' query knob was supplied");
            let headers = vec![
                (RawValue::text("Content-Type"), RawValue::text("text/plain")),
                (
                    RawValue::text("Content-Length"),
                    RawValue::text(body.len().to_string()),
                ),
            ];
            responder.start(
                &RawValue::text("500 Internal Server Error"),
                &headers,
                Some(&failure),
            )?;
            return Ok(Some(Box::new(MemoryBody::new(vec![RawValue::bytes(body)]))));
        }

        let status = lookup(&params, "status").unwrap_or("200 OK").to_string();
        let no_body = status.starts_with("204") || status.starts_with("304");

        let mut body = self.render_environment(context);
        let declared_length: Option<i64> = context
            .get(keys::CONTENT_LENGTH)
            .and_then(Value::as_text)
            .and_then(|s| s.parse().ok());
        if let Some(length) = declared_length {
            if length > 0 {
                if let Some(input) = context.input() {
                    let payload = input.read(Some(length))?;
                    body.extend_from_slice(b"-- Body ----------\n");
                    body.extend(payload);
                }
            }
        }

        let mut headers = Vec::new();
        if no_body {
            body.clear();
        } else {
            headers.push((RawValue::text("Content-Type"), RawValue::text("text/plain")));
            headers.push((
                RawValue::text("Content-Length"),
                RawValue::text(body.len().to_string()),
            ));
        }
        for (name, value) in &params {
            if let Some(header_name) = name.strip_prefix("header-") {
                headers.push((
                    RawValue::text(title_case(header_name)),
                    RawValue::text(value.clone()),
                ));
            }
        }

        responder.start(&RawValue::text(status), &headers, None)?;

        let chunks = if body.is_empty() {
            Vec::new()
        } else {
            vec![RawValue::bytes(body)]
        };
        Ok(Some(Box::new(MemoryBody::new(chunks))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parsing_decodes_components() {
        let params = parse_query("status=204%20No%20Content&flag&x=a+b");
        assert_eq!(lookup(&params, "status"), Some("204 No Content"));
        assert_eq!(lookup(&params, "flag"), Some(""));
        assert_eq!(lookup(&params, "x"), Some("a b"));
    }

    #[test]
    fn title_case_normalizes_header_names() {
        assert_eq!(title_case("x-color"), "X-Color");
        assert_eq!(title_case("ACCEPT"), "Accept");
    }
}
