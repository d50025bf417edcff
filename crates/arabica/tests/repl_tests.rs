//! Session persistence: state carries across `execute` calls, runtime
//! errors don't tear the interpreter down, and class names learned on one
//! line keep parsing as types on the next.

use arabica::{CollectStringPrint, NoPrint, Session, SessionError, Value};
use pretty_assertions::assert_eq;

// =============================================================================
// Persistence
// =============================================================================

/// Variables defined in one execute() call persist to the next.
#[test]
fn variables_persist_across_lines() {
    let mut session = Session::new(NoPrint);
    session.execute("int a = 10;").unwrap();
    session.execute("int b = 20;").unwrap();
    assert_eq!(session.execute("a + b;").unwrap(), Some(Value::Long(30)));
}

/// A function defined on one line can be called on a later one.
#[test]
fn functions_persist_across_lines() {
    let mut session = Session::new(NoPrint);
    session.execute("long twice(long n) { return n * 2; }").unwrap();
    assert_eq!(session.execute("twice(21);").unwrap(), Some(Value::Long(42)));
}

/// A class defined on one line still parses as a type on later lines.
#[test]
fn class_names_persist_across_lines() {
    let mut session = Session::new(NoPrint);
    session.execute("class A { int x = 1; }").unwrap();
    session.execute("A a = new A();").unwrap();
    assert_eq!(session.execute("a.x;").unwrap(), Some(Value::Int(1)));
}

// =============================================================================
// Echo values
// =============================================================================

/// A bare expression statement yields its value for prompt echo.
#[test]
fn expression_statements_echo() {
    let mut session = Session::new(NoPrint);
    assert_eq!(session.execute("1 + 2;").unwrap(), Some(Value::Long(3)));
}

/// Declarations yield nothing.
#[test]
fn declarations_do_not_echo() {
    let mut session = Session::new(NoPrint);
    assert_eq!(session.execute("int x = 5;").unwrap(), None);
}

/// Void-valued calls yield nothing either.
#[test]
fn void_calls_do_not_echo() {
    let mut session = Session::new(NoPrint);
    session.execute("void noop() { }").unwrap();
    assert_eq!(session.execute("noop();").unwrap(), None);
}

/// The last expression statement of a multi-statement line wins.
#[test]
fn last_expression_wins() {
    let mut session = Session::new(NoPrint);
    assert_eq!(session.execute("1; 2; 3;").unwrap(), Some(Value::Long(3)));
}

// =============================================================================
// Error recovery
// =============================================================================

/// A runtime error aborts the line but not the session.
#[test]
fn session_survives_runtime_errors() {
    let mut session = Session::new(NoPrint);
    session.execute("int x = 1;").unwrap();
    assert_eq!(session.execute("missing;"), Err(SessionError::Runtime));
    assert_eq!(session.execute("x;").unwrap(), Some(Value::Int(1)));
}

/// A compile error never executes anything.
#[test]
fn compile_errors_leave_state_untouched() {
    let mut session = Session::new(NoPrint);
    session.execute("int x = 1;").unwrap();
    assert_eq!(session.execute("int x = ;"), Err(SessionError::Compile));
    assert_eq!(session.execute("x;").unwrap(), Some(Value::Int(1)));
}

/// Statements before the failure point have already run when a later
/// statement raises: the error aborts the rest of the line only.
#[test]
fn earlier_statements_of_a_failed_line_stick() {
    let mut session = Session::new(NoPrint);
    assert_eq!(session.execute("int y = 7; missing;"), Err(SessionError::Runtime));
    assert_eq!(session.execute("y;").unwrap(), Some(Value::Int(7)));
}

/// The error flags reset per line; earlier failures don't poison later runs.
#[test]
fn error_flags_reset_between_lines() {
    let mut session = Session::new(NoPrint);
    assert_eq!(session.execute("missing;"), Err(SessionError::Runtime));
    assert!(session.diagnostics().had_runtime_error());
    session.execute("int ok = 1;").unwrap();
    assert!(!session.diagnostics().had_runtime_error());
    assert!(!session.diagnostics().had_error());
}

// =============================================================================
// Output across lines
// =============================================================================

#[test]
fn print_output_accumulates_in_the_writer() {
    let mut session = Session::new(CollectStringPrint::new());
    session.execute("sout(1);").unwrap();
    session.execute("soutln(2);").unwrap();
    assert_eq!(session.writer().output(), "12\n");
}
