//! The wrapping middleware.
//!
//! [`wrap`] turns a [`Handler`] into a [`CheckedHandler`] with the same
//! external calling convention: a drop-in replacement that audits the
//! envelope contract on every invocation and otherwise forwards everything
//! unchanged.
//!
//! The entry guard's arity and keyword checks are only meaningful against a
//! dynamic calling convention, so the audited surface is
//! [`CheckedHandler::invoke`] over an [`Invocation`]; the typed
//! [`CheckedHandler::call`] convenience builds the well-formed two-argument
//! form.

use std::sync::Arc;

use crate::checks::check_context;
use crate::context::{keys, Context, Value};
use crate::contract::{Handler, StartResponse};
use crate::error::{Violation, ViolationKind};
use crate::guard::state::InvocationState;
use crate::guard::{BodyGuard, ErrorGuard, InputGuard, Responder};
use crate::warning::{TracingSink, WarningSink};

/// Configuration for a [`CheckedHandler`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use envelope_lint::{CollectingSink, LintConfig};
///
/// let sink = CollectingSink::new();
/// let config = LintConfig::new()
///     .revalidate_on_restart(false)
///     .warnings_to(Arc::new(sink.clone()));
/// ```
#[derive(Clone)]
pub struct LintConfig {
    pub(crate) revalidate_on_restart: bool,
    pub(crate) sink: Arc<dyn WarningSink>,
}

impl LintConfig {
    /// Default configuration: strict restart re-validation, warnings to
    /// `tracing`.
    pub fn new() -> Self {
        Self {
            revalidate_on_restart: true,
            sink: Arc::new(TracingSink),
        }
    }

    /// Sets whether status/headers are validated again when a handler
    /// restarts the response with failure info.
    pub fn revalidate_on_restart(mut self, yes: bool) -> Self {
        self.revalidate_on_restart = yes;
        self
    }

    /// Routes warnings to the given sink instead of `tracing`.
    pub fn warnings_to(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl Default for LintConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One positional or keyword argument of a dynamic invocation.
pub enum CallArg {
    /// The request context
    Context(Context),
    /// The response starter
    Responder(Box<dyn StartResponse>),
    /// Anything else — present so wrong-type invocations stay expressible
    Value(Value),
}

/// The dynamic calling convention the entry guard audits: positional
/// arguments plus keyword arguments.
pub struct Invocation {
    positional: Vec<CallArg>,
    keywords: Vec<(String, CallArg)>,
}

impl Invocation {
    /// The well-formed two-argument invocation.
    pub fn new(context: Context, responder: Box<dyn StartResponse>) -> Self {
        Self::empty()
            .positional(CallArg::Context(context))
            .positional(CallArg::Responder(responder))
    }

    /// An invocation with no arguments at all.
    pub fn empty() -> Self {
        Self {
            positional: Vec::new(),
            keywords: Vec::new(),
        }
    }

    /// Appends a positional argument.
    pub fn positional(mut self, arg: CallArg) -> Self {
        self.positional.push(arg);
        self
    }

    /// Appends a keyword argument.
    pub fn keyword(mut self, name: impl Into<String>, arg: CallArg) -> Self {
        self.keywords.push((name.into(), arg));
        self
    }
}

/// Wraps a handler so every invocation is audited.
///
/// # Examples
///
/// ```
/// use envelope_lint::demo::DebugHandler;
/// use envelope_lint::{wrap, Invocation};
///
/// let mut checked = wrap(DebugHandler::default());
/// let violation = checked.invoke(Invocation::empty()).unwrap_err();
/// assert!(violation.message.contains("two arguments required"));
/// ```
pub fn wrap<H: Handler>(handler: H) -> CheckedHandler<H> {
    wrap_with(handler, LintConfig::default())
}

/// Like [`wrap`], with explicit configuration.
pub fn wrap_with<H: Handler>(handler: H, config: LintConfig) -> CheckedHandler<H> {
    CheckedHandler { handler, config }
}

/// The drop-in replacement produced by [`wrap`].
pub struct CheckedHandler<H> {
    handler: H,
    config: LintConfig,
}

impl<H: Handler> CheckedHandler<H> {
    /// Invokes the wrapped handler with the conventional two arguments.
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] detected anywhere in the invocation.
    pub fn call(
        &mut self,
        context: Context,
        responder: Box<dyn StartResponse>,
    ) -> Result<BodyGuard, Violation> {
        self.invoke(Invocation::new(context, responder))
    }

    /// Invokes the wrapped handler with an arbitrary argument shape.
    ///
    /// The entry guard runs first: exactly two positional arguments, no
    /// keyword arguments, context then responder. The context is then
    /// validated, its streams are wrapped, the handler runs against the
    /// auditing responder, and whatever body it returns comes back wrapped
    /// in a [`BodyGuard`].
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] detected anywhere in the invocation.
    pub fn invoke(&mut self, invocation: Invocation) -> Result<BodyGuard, Violation> {
        let (mut context, mut starter) = entry_check(invocation)?;

        for warning in check_context(&context)? {
            self.config.sink.emit(warning);
        }

        let declared_length = context
            .get(keys::CONTENT_LENGTH)
            .and_then(Value::as_text)
            .and_then(|s| s.parse().ok());

        let input = match context.take_input() {
            Some(input) => input,
            None => {
                return Err(Violation::new(
                    ViolationKind::MissingKey {
                        key: keys::INPUT_STREAM,
                    },
                    "no input stream is installed in the context",
                ))
            }
        };
        context.set_input(Box::new(InputGuard::with_state(
            input,
            declared_length,
            self.config.sink.clone(),
        )));

        let errors = match context.take_errors() {
            Some(errors) => errors,
            None => {
                return Err(Violation::new(
                    ViolationKind::MissingKey {
                        key: keys::ERROR_STREAM,
                    },
                    "no error stream is installed in the context",
                ))
            }
        };
        context.set_errors(Box::new(ErrorGuard::new(errors)));

        let state = InvocationState::shared();
        let mut responder = Responder::new(
            &mut *starter,
            state.clone(),
            self.config.sink.clone(),
            self.config.revalidate_on_restart,
        );

        let body = self.handler.call(&mut context, &mut responder)?;
        // The context is dropped here; nothing of it outlives the call.
        BodyGuard::with_state(body, state, self.config.sink.clone())
    }
}

fn entry_check(
    invocation: Invocation,
) -> Result<(Context, Box<dyn StartResponse>), Violation> {
    if invocation.positional.len() != 2 {
        return Err(Violation::new(
            ViolationKind::Invocation,
            format!(
                "two arguments required, got {}",
                invocation.positional.len()
            ),
        ));
    }
    if !invocation.keywords.is_empty() {
        return Err(Violation::new(
            ViolationKind::Invocation,
            format!(
                "no keyword arguments allowed, got {}",
                invocation.keywords.len()
            ),
        ));
    }

    let mut args = invocation.positional.into_iter();
    let context = match args.next() {
        Some(CallArg::Context(context)) => context,
        _ => {
            return Err(Violation::new(
                ViolationKind::Invocation,
                "first argument must be the request context",
            ))
        }
    };
    let responder = match args.next() {
        Some(CallArg::Responder(responder)) => responder,
        _ => {
            return Err(Violation::new(
                ViolationKind::Invocation,
                "second argument must be the response starter",
            ))
        }
    };
    Ok((context, responder))
}
