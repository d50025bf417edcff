//! Parser behavior: grammar shapes via the s-expression printer, compile
//! error reporting, and recovery at statement boundaries.

use arabica::{Diagnostics, Lexer, NoPrint, Parser, Session, SessionError};

/// Parses one expression and renders it as an s-expression.
fn shape(source: &str) -> String {
    let mut diagnostics = Diagnostics::new();
    let tokens = Lexer::new(source, &mut diagnostics).scan();
    assert!(!diagnostics.had_error(), "lexing {source:?} failed");
    let mut parser = Parser::new(tokens, &mut diagnostics);
    let expr = parser.parse_expression().expect("expression should parse");
    expr.to_string()
}

/// Runs a snippet expected to fail at compile time; returns the diagnostics.
fn compile_error(source: &str) -> Vec<String> {
    let mut session = Session::new(NoPrint);
    let result = session.execute(source);
    assert_eq!(result, Err(SessionError::Compile), "expected a compile error for {source:?}");
    assert!(session.diagnostics().had_error());
    session.diagnostics().messages().to_vec()
}

fn first_error(source: &str) -> String {
    compile_error(source).first().cloned().unwrap_or_default()
}

// =============================================================================
// Grammar shapes
// =============================================================================

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(shape("1 + 2 * 3"), "(+ 1 (* 2 3))");
    assert_eq!(shape("(1 + 2) * 3"), "(* (group (+ 1 2)) 3)");
}

#[test]
fn comparison_binds_looser_than_bitwise_or() {
    assert_eq!(shape("1 < 2 | 4"), "(< 1 (| 2 4))");
}

#[test]
fn shift_binds_tighter_than_bitwise_and() {
    assert_eq!(shape("1 & 2 << 3"), "(& 1 (<< 2 3))");
}

#[test]
fn ternary_is_right_associative() {
    assert_eq!(shape("true ? 1 : false ? 2 : 3"), "(? true 1 (? false 2 3))");
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(shape("a = b = 1"), "(= a (= b 1))");
}

#[test]
fn unary_chains() {
    assert_eq!(shape("!!a"), "(! (! a))");
    assert_eq!(shape("-~1"), "(- (~ 1))");
}

#[test]
fn cast_applies_to_the_unary_operand() {
    assert_eq!(shape("(int) 1 + 2"), "(+ (cast int 1) 2)");
}

#[test]
fn parenthesized_non_type_is_a_grouping() {
    assert_eq!(shape("(a) + 2"), "(+ (group a) 2)");
}

#[test]
fn calls_and_gets_are_left_associative() {
    assert_eq!(shape("a.b.c"), "(get (get a b) c)");
    assert_eq!(shape("f(1)(2)"), "(call (call f 1) 2)");
    assert_eq!(shape("f(1, 2)"), "(call f 1 2)");
}

#[test]
fn comma_discards_the_left_expression() {
    assert_eq!(shape("1, 2, 3"), "3");
}

#[test]
fn increment_forms() {
    assert_eq!(shape("++a"), "(++ a)");
    assert_eq!(shape("a--"), "(-- a)");
}

// =============================================================================
// Compile errors
// =============================================================================

#[test]
fn break_outside_a_loop() {
    assert!(first_error("break;").contains("Can't use break statement outside a loop"));
}

#[test]
fn continue_outside_a_loop() {
    assert!(first_error("continue;").contains("Can't use continue statement outside a loop"));
}

#[test]
fn return_outside_a_function() {
    assert!(first_error("return 1;").contains("Expected return statement in a function body."));
}

#[test]
fn nested_classes_are_rejected() {
    assert!(first_error("class A { class B { } }").contains("Can't have nested classes."));
}

#[test]
fn nested_functions_are_rejected() {
    assert!(first_error("void f() { void g() { } }").contains("Can't have nested functions."));
}

#[test]
fn this_outside_a_class() {
    assert!(first_error("this;").contains("Can't use 'this' outside a class."));
}

#[test]
fn redefined_class_name() {
    assert!(first_error("class A { } class A { }").contains("Class is already defined."));
}

/// `extends` is lexed but has no semantics; using it fails to parse.
#[test]
fn extends_is_rejected() {
    assert!(first_error("class A extends B { }").contains("Expected '{' after class name."));
}

#[test]
fn invalid_assignment_target() {
    assert!(first_error("1 = 2;").contains("Invalid assignment target."));
}

#[test]
fn finals_need_initializers() {
    assert!(first_error("final int x;").contains("Constant must have an initializer."));
}

#[test]
fn void_variables_are_rejected() {
    assert!(first_error("void x = 1;").contains("Type can't be void in variable definition."));
}

#[test]
fn repeated_modifiers_are_rejected() {
    assert!(first_error("public public int x = 1;").contains("Modifiers must appear only once."));
    assert!(first_error("static final static int x = 1;").contains("Modifiers must appear only once."));
}

#[test]
fn constructor_must_be_public() {
    assert!(
        first_error("class A { private __init__() { } }")
            .contains("Constructor must have a visibility of public or package.")
    );
}

#[test]
fn duplicate_parameter_names_are_rejected() {
    assert!(first_error("void f(int a, int a) { }").contains("Function argument names can't repeat!"));
}

#[test]
fn missing_semicolon_after_expression() {
    assert!(first_error("1 + 2").contains("Expected ';' after value in expression statement."));
}

#[test]
fn class_bodies_only_take_members() {
    assert!(
        first_error("class A { sout(1); }")
            .contains("Expected only variable and method declarations inside class body.")
    );
}

/// Class names never register retroactively: a use before the class
/// declaration is not a type.
#[test]
fn class_names_do_not_register_retroactively() {
    let messages = compile_error("Name x; class Name { }");
    assert!(
        messages.iter().any(|m| m.contains("Expected ';'")),
        "`Name x;` must parse as an expression statement, got: {messages:?}"
    );
}

// =============================================================================
// Recovery
// =============================================================================

/// One run surfaces several independent errors.
#[test]
fn parser_recovers_and_reports_multiple_errors() {
    let messages = compile_error("int 1; float 2;");
    assert!(messages.len() >= 2, "expected two diagnostics, got: {messages:?}");
    assert!(messages.iter().all(|m| m.contains("Expected variable name")));
}

#[test]
fn recovery_anchors_on_statement_keywords() {
    let messages = compile_error("int 1; while (true) break");
    // the bad declaration and the missing ';' after break both surface
    assert!(messages.len() >= 2, "got: {messages:?}");
    assert!(messages.iter().any(|m| m.contains("Expected ';' after break statement.")));
}

#[test]
fn eof_inside_a_block_is_reported() {
    assert!(compile_error("{ int x = 1;").iter().any(|m| m.contains("Expect '}'")));
}
