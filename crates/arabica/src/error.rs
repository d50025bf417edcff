//! Diagnostics and the runtime unwind channel.
//!
//! Compile errors (lexer + parser) and runtime errors flow through a single
//! [`Diagnostics`] sink owning the `had_error` / `had_runtime_error` flags.
//! Non-local control flow (`break`, `continue`, `return`) shares the runtime
//! error channel as [`Unwind`] variants so the evaluator propagates all four
//! with `?` and each catch site accepts only the discriminant it wants.

use std::fmt::Display;

use crate::value::Value;

/// Result alias for everything the statement executor and expression
/// evaluator return.
pub(crate) type Exec<T> = Result<T, Unwind>;

/// A runtime error anchored to the source position that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    /// The lexeme the error is reported on (operator glyph, variable name,
    /// class name, ...).
    pub lexeme: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl RuntimeError {
    pub fn new(lexeme: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            lexeme: lexeme.into(),
            line,
            column,
            message: message.into(),
        }
    }
}

/// Non-local exit carrier.
///
/// `Break` and `Continue` unwind to the nearest enclosing `while`; `Return`
/// unwinds to the function call that executed the body; `Error` unwinds all
/// the way to `interpret`, which reports it and leaves the interpreter
/// reusable.
#[derive(Debug)]
pub(crate) enum Unwind {
    Error(RuntimeError),
    Break,
    Continue,
    Return(Value),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Self::Error(error)
    }
}

/// Diagnostic sink shared by the lexer, parser and interpreter.
///
/// Every diagnostic is printed to stderr (followed by a blank line) and kept
/// in an in-memory log so embedders and tests can inspect what was reported.
#[derive(Debug, Default)]
pub struct Diagnostics {
    had_error: bool,
    had_runtime_error: bool,
    messages: Vec<String>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    #[must_use]
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Every diagnostic reported so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Clears the error flags ahead of a fresh run. The message log is kept;
    /// a REPL session accumulates it across lines.
    pub fn reset_flags(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    /// Reports a position-only compile error: `Error at [line:column]: message`.
    pub fn error_at(&mut self, line: u32, column: u32, message: impl Display) {
        self.had_error = true;
        self.report(format!("Error at [{line}:{column}]: {message}"));
    }

    /// Reports a token-anchored compile error:
    /// `Error at '<lexeme>' on [line:column]: message`.
    pub fn error_at_token(&mut self, lexeme: &str, line: u32, column: u32, message: impl Display) {
        self.had_error = true;
        self.report(format!("Error at '{lexeme}' on [{line}:{column}]: {message}"));
    }

    /// Reports a runtime error in the token-anchored format.
    pub fn runtime_error(&mut self, error: &RuntimeError) {
        self.had_runtime_error = true;
        self.report(format!(
            "Error at '{}' on [{}:{}]: {}",
            error.lexeme, error.line, error.column, error.message
        ));
    }

    fn report(&mut self, text: String) {
        // A blank line follows each diagnostic.
        eprintln!("{text}\n");
        self.messages.push(text);
    }
}
