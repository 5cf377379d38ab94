//! Tour of the contract violations the checker catches.
//!
//! Run with: cargo run --example violation_tour

use envelope_lint::{
    check_content_type, check_headers, check_status, wrap, BoxedBody, Context, Handler,
    Invocation, MemoryBody, RawValue, Responder, TestHarness, Violation,
};

/// A handler that forgets to return a body.
struct Forgetful;

impl Handler for Forgetful {
    fn call(
        &mut self,
        _context: &mut Context,
        responder: &mut Responder<'_>,
    ) -> Result<Option<BoxedBody>, Violation> {
        let headers = vec![(RawValue::text("Content-Type"), RawValue::text("text/plain"))];
        responder.start(&RawValue::text("200 OK"), &headers, None)?;
        Ok(None)
    }
}

/// A handler that yields text where bytes are required.
struct TextYielder;

impl Handler for TextYielder {
    fn call(
        &mut self,
        _context: &mut Context,
        responder: &mut Responder<'_>,
    ) -> Result<Option<BoxedBody>, Violation> {
        let headers = vec![(RawValue::text("Content-Type"), RawValue::text("text/plain"))];
        responder.start(&RawValue::text("200 OK"), &headers, None)?;
        Ok(Some(Box::new(MemoryBody::new(vec![RawValue::text(
            "oops, text",
        )]))))
    }
}

fn main() {
    println!("--- bad calling convention ---");
    let mut checked = wrap(Forgetful);
    let violation = checked.invoke(Invocation::empty()).unwrap_err();
    println!("{}", violation);

    println!("--- missing body iterator ---");
    let mut app = TestHarness::new(Forgetful);
    println!("{}", app.get("/").unwrap_err());

    println!("--- text body chunk ---");
    let mut app = TestHarness::new(TextYielder);
    println!("{}", app.get("/").unwrap_err());

    println!("--- malformed status ---");
    println!("{}", check_status(&RawValue::text("99 Too Low")).unwrap_err());

    println!("--- header outside Latin-1 ---");
    let headers = vec![(RawValue::text("X-Price"), RawValue::text("100€"))];
    println!("{}", check_headers(&headers).unwrap_err());

    println!("--- body headers on a no-content status ---");
    let headers = vec![
        (RawValue::text("Content-Type"), RawValue::text("text/plain")),
        (RawValue::text("Content-Length"), RawValue::text("4")),
    ];
    println!(
        "{}",
        check_content_type(&RawValue::text("204 No Content"), &headers).unwrap_err()
    );
}
