//! Persistent interpreter sessions.
//!
//! A [`Session`] runs source snippets against one long-lived interpreter:
//! variables, functions and classes defined by one `execute` call are
//! visible to the next, and a runtime error aborts only the offending run.
//! The CLI uses a session for both file mode (one `execute` over the whole
//! buffer) and the interactive prompt.

use std::{fmt, rc::Rc};

use ahash::AHashSet;

use crate::{
    error::Diagnostics,
    interpreter::Interpreter,
    io::PrintWriter,
    lexer::Lexer,
    parser::Parser,
    value::Value,
};

/// Why a session run failed. The diagnostics have already been reported
/// through the session's sink by the time this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Lexing or parsing failed; nothing was executed.
    Compile,
    /// Execution raised a runtime error and the run was aborted.
    Runtime,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile => write!(f, "compile error"),
            Self::Runtime => write!(f, "runtime error"),
        }
    }
}

pub struct Session<W: PrintWriter> {
    interpreter: Interpreter<W>,
    diagnostics: Diagnostics,
    /// Class names learned by earlier lines, seeded into each new parser so
    /// `Name x = ...;` keeps parsing as a declaration across lines.
    class_names: AHashSet<Rc<str>>,
}

impl<W: PrintWriter> Session<W> {
    pub fn new(writer: W) -> Self {
        Self {
            interpreter: Interpreter::new(writer),
            diagnostics: Diagnostics::new(),
            class_names: AHashSet::new(),
        }
    }

    /// Lexes, parses and interprets one source snippet with persistent
    /// state. Returns the value of the snippet's last top-level expression
    /// statement, for prompt echo.
    pub fn execute(&mut self, source: &str) -> Result<Option<Value>, SessionError> {
        self.diagnostics.reset_flags();

        let tokens = Lexer::new(source, &mut self.diagnostics).scan();
        if self.diagnostics.had_error() {
            return Err(SessionError::Compile);
        }

        let mut parser =
            Parser::new(tokens, &mut self.diagnostics).with_class_names(std::mem::take(&mut self.class_names));
        let statements = parser.parse_statements();
        self.class_names = parser.take_class_names();
        if self.diagnostics.had_error() {
            return Err(SessionError::Compile);
        }

        let value = self.interpreter.interpret(&statements, &mut self.diagnostics);
        if self.diagnostics.had_runtime_error() {
            return Err(SessionError::Runtime);
        }
        Ok(value)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn writer(&self) -> &W {
        self.interpreter.writer()
    }

    pub fn writer_mut(&mut self) -> &mut W {
        self.interpreter.writer_mut()
    }
}
