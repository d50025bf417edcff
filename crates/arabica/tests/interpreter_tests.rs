//! End-to-end interpreter semantics driven through a `Session`: widening
//! arithmetic, casts, control flow, closures, built-ins and print formats.

use arabica::{CollectStringPrint, NoPrint, Session, SessionError, Value};
use pretty_assertions::assert_eq;

/// Runs one snippet and returns the value of its last expression statement.
fn eval(source: &str) -> Option<Value> {
    let mut session = Session::new(NoPrint);
    session.execute(source).expect("snippet should run cleanly")
}

/// Runs one snippet and returns everything it printed.
fn output(source: &str) -> String {
    let mut session = Session::new(CollectStringPrint::new());
    session.execute(source).expect("snippet should run cleanly");
    session.writer().output().to_owned()
}

/// Runs a snippet expected to raise a runtime error and returns the last
/// reported diagnostic.
fn runtime_error(source: &str) -> String {
    let mut session = Session::new(NoPrint);
    let result = session.execute(source);
    assert_eq!(result, Err(SessionError::Runtime), "expected a runtime error");
    assert!(session.diagnostics().had_runtime_error());
    session.diagnostics().messages().last().cloned().unwrap_or_default()
}

// =============================================================================
// Arithmetic and widening
// =============================================================================

/// Bare integer literals are longs; arithmetic on them stays long.
#[test]
fn integer_literals_are_longs() {
    assert_eq!(eval("1 + 2;"), Some(Value::Long(3)));
}

/// The result of a mixed-width operation carries the bigger operand's type.
#[test]
fn widening_picks_the_bigger_operand() {
    assert_eq!(eval("int x = 1; long y = 2; x + y;"), Some(Value::Long(3)));
    assert_eq!(eval("int x = 3; double y = 0.5; x * y;"), Some(Value::Double(1.5)));
    assert_eq!(eval("1.5f + 1;"), Some(Value::Float(2.5)));
}

/// `(int)1 + (long)2` prints as a long decimal.
#[test]
fn cast_operands_widen_in_addition() {
    assert_eq!(output("soutln((int)1 + (long)2);"), "3\n");
}

/// Char participates in arithmetic as an unsigned 16-bit whole number.
#[test]
fn char_is_a_whole_number() {
    assert_eq!(eval("char c = 'a'; c + 1;"), Some(Value::Long(98)));
    assert_eq!(eval("'a' < 'b';"), Some(Value::Boolean(true)));
}

/// Strings don't participate in arithmetic at all.
#[test]
fn string_operands_are_rejected() {
    let message = runtime_error("\"a\" + 1;");
    assert!(message.contains("Only numbers."), "got: {message}");
}

/// Comparing two booleans with `==` is also a numeric-only error.
#[test]
fn equality_is_numeric_only() {
    let message = runtime_error("true == false;");
    assert!(message.contains("Only numbers."), "got: {message}");
}

#[test]
fn whole_number_operators() {
    assert_eq!(eval("10 % 3;"), Some(Value::Long(1)));
    assert_eq!(eval("1 << 3;"), Some(Value::Long(8)));
    assert_eq!(eval("7 & 3;"), Some(Value::Long(3)));
    assert_eq!(eval("5 | 2;"), Some(Value::Long(7)));
    assert_eq!(eval("6 ^ 3;"), Some(Value::Long(5)));
}

/// `%` on the float band is rejected.
#[test]
fn modulo_requires_whole_numbers() {
    let message = runtime_error("5.5 % 2;");
    assert!(message.contains("Only whole numbers."), "got: {message}");
}

/// Whole-number division by zero is a runtime error...
#[test]
fn integer_division_by_zero_is_an_error() {
    let message = runtime_error("1 / 0;");
    assert!(message.contains("Right hand side can't be zero"), "got: {message}");
    let message = runtime_error("byte a = 10; byte b = 0; a / b;");
    assert!(message.contains("Right hand side can't be zero"), "got: {message}");
}

/// ...but float division follows IEEE 754.
#[test]
fn float_division_by_zero_is_infinity() {
    assert_eq!(eval("1.0 / 0.0;"), Some(Value::Double(f64::INFINITY)));
}

/// Implementation-defined but must not crash.
#[test]
fn oversized_shift_does_not_crash() {
    let mut session = Session::new(NoPrint);
    session
        .execute("int x = (long) 1 << 31; x;")
        .expect("shift into an int must not crash");
}

#[test]
fn unary_operators() {
    assert_eq!(eval("-5;"), Some(Value::Long(-5)));
    assert_eq!(eval("~0;"), Some(Value::Long(-1)));
    assert_eq!(eval("!true;"), Some(Value::Boolean(false)));
    assert_eq!(eval("!!true;"), Some(Value::Boolean(true)));
    assert_eq!(eval("!!false;"), Some(Value::Boolean(false)));
}

#[test]
fn bitwise_not_rejects_floats() {
    let message = runtime_error("~1.5;");
    assert!(message.contains("Only whole numbers."), "got: {message}");
}

// =============================================================================
// Casts
// =============================================================================

/// Explicit casts narrow with truncation.
#[test]
fn casts_narrow() {
    assert_eq!(eval("(int) 3.9;"), Some(Value::Int(3)));
    assert_eq!(eval("(byte) 200;"), Some(Value::Byte(-56)));
    assert_eq!(eval("(char) 97;"), Some(Value::Char(97)));
    assert_eq!(eval("(float) 1;"), Some(Value::Float(1.0)));
}

/// `(T)((T)x) == (T)x` for every numeric T.
#[test]
fn casts_are_idempotent() {
    assert_eq!(eval("(byte)((byte) 200);"), eval("(byte) 200;"));
    assert_eq!(eval("(int)((int) 2.75);"), eval("(int) 2.75;"));
    assert_eq!(eval("(float)((float) 2.75);"), eval("(float) 2.75;"));
}

/// `(boolean)` parses as a cast but is rejected at runtime.
#[test]
fn boolean_cast_target_is_invalid() {
    let message = runtime_error("(boolean) 1;");
    assert!(message.contains("Invalid type to cast."), "got: {message}");
}

/// Only numbers can be cast.
#[test]
fn cast_source_must_be_a_number() {
    let message = runtime_error("(int) true;");
    assert!(message.contains("Only numbers can be cast."), "got: {message}");
}

// =============================================================================
// Variables and assignment
// =============================================================================

/// Declared primitive slots keep their declared width across assignments.
#[test]
fn assignment_coerces_to_the_declared_type() {
    assert_eq!(eval("int x = 5; x;"), Some(Value::Int(5)));
    assert_eq!(eval("int x = 0; x = 3.9; x;"), Some(Value::Int(3)));
    assert_eq!(eval("double d = 1; d;"), Some(Value::Double(1.0)));
}

#[test]
fn assignment_returns_the_assigned_value() {
    assert_eq!(eval("int x = 0; x = 41 + 1;"), Some(Value::Long(42)));
}

#[test]
fn multi_name_declarations() {
    assert_eq!(eval("int a = 1, b = 2; a + b;"), Some(Value::Long(3)));
}

/// A final slot never changes after its initializer.
#[test]
fn final_reassignment_is_rejected() {
    let message = runtime_error("final int x = 1; x = 2;");
    assert!(message.contains("Variable 'x' is final."), "got: {message}");
}

#[test]
fn uninitialized_reads_are_rejected() {
    let message = runtime_error("int x; x;");
    assert!(message.contains("Variable is uninitialized."), "got: {message}");
}

#[test]
fn uninitialized_slots_accept_assignment() {
    assert_eq!(eval("int x; x = 3; x;"), Some(Value::Int(3)));
}

#[test]
fn undefined_variable_is_rejected() {
    let message = runtime_error("missing;");
    assert!(message.contains("Undefined variable 'missing'."), "got: {message}");
}

#[test]
fn duplicate_definition_in_one_scope_is_rejected() {
    let message = runtime_error("int x = 1; int x = 2;");
    assert!(message.contains("already defined in this scope"), "got: {message}");
}

/// Shadowing requires a nested frame; the first enclosing frame containing
/// the name decides a lookup.
#[test]
fn block_scoping_shadows_and_restores() {
    assert_eq!(output("int x = 1; { int x = 2; soutln(x); } soutln(x);"), "2\n1\n");
}

#[test]
fn primitives_cannot_be_null() {
    let message = runtime_error("int x = null;");
    assert!(message.contains("Primitives can't be null."), "got: {message}");
    let message = runtime_error("int x = 0; x = null;");
    assert!(message.contains("Only objects can be null."), "got: {message}");
}

#[test]
fn strings_are_nullable() {
    assert_eq!(eval("String s = \"hi\"; s = null; s;"), Some(Value::Str(None)));
    assert_eq!(output("String s = null; soutln(s);"), "null\n");
}

#[test]
fn number_to_string_mismatch_is_rejected() {
    let message = runtime_error("String s = 5;");
    assert!(message.contains("Can't do an implicit cast"), "got: {message}");
}

/// `ArrayList` is reserved and lexes as a type keyword, but declaring with it
/// fails the declaration-time validity check.
#[test]
fn arraylist_is_reserved_but_not_a_valid_type() {
    let message = runtime_error("ArrayList x = 1;");
    assert!(message.contains("Token 'ArrayList' is an invalid type."), "got: {message}");
}

// =============================================================================
// Control flow
// =============================================================================

#[test]
fn if_else_if_else() {
    let source = "
        int x = 2;
        if (x == 1) { soutln(\"one\"); }
        else if (x == 2) { soutln(\"two\"); }
        else { soutln(\"many\"); }
    ";
    assert_eq!(output(source), "two\n");
}

#[test]
fn non_boolean_condition_is_rejected() {
    let message = runtime_error("if (1) { }");
    assert!(message.contains("Condition must be boolean"), "got: {message}");
    let message = runtime_error("while (1) { }");
    assert!(message.contains("Expected boolean condition."), "got: {message}");
}

#[test]
fn while_loop_runs_to_condition() {
    assert_eq!(output("int i = 0; while (i < 3) { sout(i); i = i + 1; }"), "012");
}

#[test]
fn break_stops_the_loop() {
    assert_eq!(output("int i = 0; while (true) { if (i == 2) break; sout(i); i = i + 1; }"), "01");
}

/// `continue` in a `for` still runs the increment.
#[test]
fn for_continue_still_increments() {
    assert_eq!(
        output("for (int i = 0; i < 5; i = i + 1) { if (i == 2) continue; sout(i); }"),
        "0134"
    );
}

#[test]
fn for_without_clauses_desugars_to_while_true() {
    assert_eq!(output("int i = 0; for (;;) { if (i == 3) break; sout(i); i = i + 1; }"), "012");
}

#[test]
fn ternary_selects_a_branch() {
    assert_eq!(eval("true ? 1 : 2;"), Some(Value::Long(1)));
    assert_eq!(eval("false ? 1 : 2;"), Some(Value::Long(2)));
    let message = runtime_error("1 ? 2 : 3;");
    assert!(message.contains("Only booleans."), "got: {message}");
}

/// The comma operator discards the left result.
#[test]
fn comma_operator_keeps_the_right_result() {
    assert_eq!(eval("1, 2;"), Some(Value::Long(2)));
}

#[test]
fn increment_and_decrement_apply_at_the_variable_type() {
    assert_eq!(eval("int i = 5; i++;"), Some(Value::Int(6)));
    assert_eq!(eval("int i = 5; --i;"), Some(Value::Int(4)));
    assert_eq!(eval("char c = 'a'; c++;"), Some(Value::Char(98)));
    let message = runtime_error("String s = \"x\"; s++;");
    assert!(message.contains("Expected a number operand."), "got: {message}");
}

// =============================================================================
// Logical operators
// =============================================================================

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(eval("true || false;"), Some(Value::Boolean(true)));
    assert_eq!(eval("false && true;"), Some(Value::Boolean(false)));
}

/// Pinned: the right operand is type-checked only when short-circuiting
/// didn't happen.
#[test]
fn logical_short_circuit_skips_right_type_check() {
    assert_eq!(eval("false && 1;"), Some(Value::Boolean(false)));
    assert_eq!(eval("true || 1;"), Some(Value::Boolean(true)));
    let message = runtime_error("true && 1;");
    assert!(message.contains("right hand side"), "got: {message}");
}

#[test]
fn logical_left_operand_must_be_boolean() {
    let message = runtime_error("1 && true;");
    assert!(message.contains("left hand side"), "got: {message}");
}

// =============================================================================
// Functions
// =============================================================================

/// A function closes over the global scope.
#[test]
fn functions_capture_globals() {
    let source = "
        int counter = 0;
        void bump() { counter = counter + 1; }
        bump(); bump(); bump();
        soutln(counter);
    ";
    assert_eq!(output(source), "3\n");
}

#[test]
fn return_value_coerces_to_the_declared_type() {
    assert_eq!(eval("int half(int n) { return n / 2; } half(9);"), Some(Value::Int(4)));
    assert_eq!(eval("double one() { return 1; } one();"), Some(Value::Double(1.0)));
}

#[test]
fn return_type_mismatch_is_rejected() {
    let message = runtime_error("int wrong() { return \"s\"; } wrong();");
    assert!(message.contains("Return type 'int' doesn't match with 'String'."), "got: {message}");
}

#[test]
fn call_arity_is_enforced() {
    let message = runtime_error("void f(int a) { } f();");
    assert!(message.contains("Expected 1 arguments but received 0."), "got: {message}");
}

#[test]
fn only_functions_and_classes_are_callable() {
    let message = runtime_error("int x = 1; x();");
    assert!(message.contains("Can only call functions and classes."), "got: {message}");
}

#[test]
fn void_is_not_a_value() {
    let message = runtime_error("void f() { } int x = f();");
    assert!(message.contains("Void isn't a valid value"), "got: {message}");
    let message = runtime_error("void f() { } sout(f());");
    assert!(message.contains("Can't print void."), "got: {message}");
}

#[test]
fn parameters_shadow_only_inside_the_call() {
    let source = "
        int x = 10;
        int twice(int x) { return x * 2; }
        soutln(twice(3));
        soutln(x);
    ";
    assert_eq!(output(source), "6\n10\n");
}

#[test]
fn recursion_works() {
    assert_eq!(eval("long fib(int n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); } fib(10);"), Some(Value::Long(55)));
}

// =============================================================================
// Built-ins
// =============================================================================

#[test]
fn builtin_sqrt_and_pow_return_doubles() {
    assert_eq!(eval("sqrt(16);"), Some(Value::Double(4.0)));
    assert_eq!(eval("pow(2, 10);"), Some(Value::Double(1024.0)));
    assert_eq!(eval("sqrt(2.25f);"), Some(Value::Double(1.5)));
}

#[test]
fn builtin_clock_returns_a_long() {
    let value = eval("clock();").expect("clock() yields a value");
    match value {
        Value::Long(millis) => assert!(millis > 0),
        other => panic!("clock() should return a long, got {other:?}"),
    }
}

#[test]
fn builtin_arguments_must_be_numbers() {
    let message = runtime_error("sqrt(true);");
    assert!(message.contains("Expected a number as an argument."), "got: {message}");
}

#[test]
fn builtin_arity_is_enforced() {
    let message = runtime_error("pow(2);");
    assert!(message.contains("Expected 2 arguments but received 1."), "got: {message}");
}

// =============================================================================
// Print formats
// =============================================================================

#[test]
fn print_formats_per_tag() {
    assert_eq!(output("soutln(true);"), "true\n");
    assert_eq!(output("soutln(127);"), "127\n");
    assert_eq!(output("byte b = 100; soutln(b);"), "0x64\n");
    // negative bytes print sign-extended, like C's %x after promotion
    assert_eq!(output("soutln((byte) 200);"), "0xffffffc8\n");
    assert_eq!(output("soutln('x');"), "'x'\n");
    assert_eq!(output("soutln(1.5f);"), "1.500000f\n");
    assert_eq!(output("soutln(2.25);"), "2.250000\n");
    assert_eq!(output("soutln(\"text\");"), "text\n");
    assert_eq!(output("soutln(null);"), "null\n");
}

#[test]
fn sout_omits_the_newline() {
    assert_eq!(output("sout(1); sout(2);"), "12");
}

#[test]
fn function_values_print_their_repr() {
    assert_eq!(output("void f() { } soutln(f);"), "<fn f>\n");
    assert_eq!(output("soutln(clock);"), "<native_fn clock>\n");
}
