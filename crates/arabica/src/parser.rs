//! Recursive-descent parser over a precedence-climbing expression grammar.
//!
//! The parser tracks lexical context (loop, function and class nesting) to
//! reject misplaced `break`/`continue`/`return` and nested classes or
//! functions at parse time, and maintains a set of class names learned on
//! first sight so a later use of the name in type position is recognized as
//! a user-defined type. Registration is never retroactive: `Name x;` before
//! `class Name {}` does not parse as a declaration.
//!
//! On error the offending subtree is dropped by ownership, a diagnostic is
//! emitted, and the parser synchronizes to the next statement boundary (a
//! semicolon or one of the anchor token kinds) and keeps going.

use std::rc::Rc;

use ahash::AHashSet;

use crate::{
    ast::{
        Argument, ClassDecl, ElseIf, Expr, FunctionDecl, Identifier, OpSpan, Stmt, TypeDecl, VarDecl, Visibility,
    },
    error::Diagnostics,
    token::{Literal, Token, TokenKind},
    value::{TypeTag, Value},
};

/// Marker for a parse failure whose diagnostic has already been emitted.
pub(crate) struct ParseError;

type Parse<T> = Result<T, ParseError>;

const STATIC: usize = 0;
const VISIBILITY: usize = 1;
const FINAL: usize = 2;

fn modifier_slot(kind: TokenKind) -> usize {
    match kind {
        TokenKind::Static => STATIC,
        TokenKind::Final => FINAL,
        _ => VISIBILITY,
    }
}

pub struct Parser<'src, 'd> {
    tokens: Vec<Token<'src>>,
    current: usize,
    class_names: AHashSet<Rc<str>>,
    loop_level: u32,
    func_level: u32,
    class_level: u32,
    diagnostics: &'d mut Diagnostics,
}

impl<'src, 'd> Parser<'src, 'd> {
    pub fn new(tokens: Vec<Token<'src>>, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            tokens,
            current: 0,
            class_names: AHashSet::new(),
            loop_level: 0,
            func_level: 0,
            class_level: 0,
            diagnostics,
        }
    }

    /// Seeds the registered-class-name set, e.g. with names learned by
    /// earlier lines of a REPL session.
    #[must_use]
    pub fn with_class_names(mut self, class_names: AHashSet<Rc<str>>) -> Self {
        self.class_names = class_names;
        self
    }

    /// Hands back the registered class names for the next session line.
    pub fn take_class_names(&mut self) -> AHashSet<Rc<str>> {
        std::mem::take(&mut self.class_names)
    }

    /// Parses the token stream as a statement sequence, recovering at
    /// statement boundaries so one run can report several errors. The caller
    /// decides whether the result is usable by checking the diagnostics
    /// sink's `had_error` flag.
    pub fn parse_statements(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(statement) => statements.push(statement),
                Err(ParseError) => self.synchronize(),
            }
        }
        statements
    }

    /// Parses a single expression, for REPL echo and tooling.
    pub fn parse_expression(&mut self) -> Option<Expr> {
        self.expression().ok()
    }

    // === declarations ===

    fn declaration(&mut self) -> Parse<Stmt> {
        if self.match_kind(TokenKind::Abstract) {
            return self.class_declaration(true);
        }
        if self.match_kind(TokenKind::Class) {
            return self.class_declaration(false);
        }
        if let Some(visibility) = self.match_constructor()? {
            let init_token = self.tokens[self.current - 2];
            let return_type = TypeDecl {
                tag: TypeTag::Void,
                name: Rc::from("void"),
                line: init_token.line,
                column: init_token.column,
            };
            return self.function_declaration(return_type, Identifier::from_token(&init_token), visibility, false);
        }
        if self.check_type()
            && self.peek_next().kind != TokenKind::ParenLeft
            && self.peek_next().kind != TokenKind::Dot
        {
            let type_token = self.advance();
            return self.var_declaration(type_token, Visibility::Package, false, false);
        }
        if self.match_any_modifier() {
            let first_modifier = self.previous().kind;
            return self.complex_declaration(first_modifier);
        }

        self.statement()
    }

    fn class_declaration(&mut self, is_abstract: bool) -> Parse<Stmt> {
        if is_abstract {
            self.consume(TokenKind::Class, "Expected 'class' after keyword 'abstract'.")?;
        }
        let name_token = self.consume(TokenKind::Identifier, "Expected class name.")?;
        if self.class_level != 0 {
            return Err(self.error(name_token, "Can't have nested classes."));
        }
        if self.class_names.contains(name_token.lexeme) {
            return Err(self.error(name_token, "Class is already defined."));
        }
        self.class_names.insert(Rc::from(name_token.lexeme));

        self.consume(TokenKind::CurlyLeft, "Expected '{' after class name.")?;
        self.class_level += 1;

        let mut attributes = Vec::new();
        let mut methods = Vec::new();
        while !self.check(TokenKind::CurlyRight) && !self.is_at_end() {
            match self.declaration()? {
                Stmt::Var(attribute) => attributes.push(attribute),
                Stmt::Function(method) => methods.push(method),
                _ => {
                    let previous = self.previous();
                    return Err(self.error(previous, "Expected only variable and method declarations inside class body."));
                }
            }
        }

        self.consume(TokenKind::CurlyRight, "Expected '}' after class body.")?;
        self.class_level -= 1;

        Ok(Stmt::Class(Rc::new(ClassDecl {
            name: Identifier::from_token(&name_token),
            is_abstract,
            attributes,
            methods,
        })))
    }

    /// Consumes a run of modifiers (each category at most once), then the
    /// type, then dispatches to a variable or function declaration.
    fn complex_declaration(&mut self, first_modifier: TokenKind) -> Parse<Stmt> {
        let mut counts = [0usize; 3];
        let mut visibility = if first_modifier.is_visibility() {
            Visibility::from_token(first_modifier)
        } else {
            Visibility::Package
        };
        counts[modifier_slot(first_modifier)] = 1;

        while !self.check_type() {
            if self.match_any_modifier() {
                let kind = self.previous().kind;
                if kind.is_visibility() {
                    visibility = Visibility::from_token(kind);
                }
                counts[modifier_slot(kind)] += 1;
                if counts.iter().any(|&count| count > 1) {
                    let previous = self.previous();
                    return Err(self.error(previous, "Modifiers must appear only once."));
                }
            } else {
                let unexpected = self.peek();
                return Err(self.error(unexpected, "Unexpected token in the modifiers."));
            }
        }

        let type_token = self.advance();
        self.var_declaration(type_token, visibility, counts[STATIC] == 1, counts[FINAL] == 1)
    }

    fn var_declaration(
        &mut self,
        type_token: Token<'src>,
        visibility: Visibility,
        is_static: bool,
        is_final: bool,
    ) -> Parse<Stmt> {
        let first_name = self.consume(TokenKind::Identifier, "Expected variable name in variable declaration.")?;

        if self.match_kind(TokenKind::ParenLeft) {
            if is_final {
                // reported but recoverable: parsing continues past it
                let previous = self.previous();
                self.diagnostics
                    .error_at_token(previous.describe(), previous.line, previous.column, "Method can't be final.");
            }
            return self.function_declaration(
                TypeDecl::from_token(&type_token),
                Identifier::from_token(&first_name),
                visibility,
                is_static,
            );
        }

        // now it's certain that it's a variable and not a function
        if type_token.kind == TokenKind::VoidType {
            return Err(self.error(type_token, "Type can't be void in variable definition."));
        }

        let mut names = vec![Identifier::from_token(&first_name)];
        let mut initializers = Vec::new();

        // always parse one level of precedence above the comma operator
        let first_initializer = if self.match_kind(TokenKind::Equal) {
            Some(self.ternary_conditional()?)
        } else {
            None
        };
        if first_initializer.is_none() && is_final {
            let previous = self.previous();
            return Err(self.error(previous, "Constant must have an initializer."));
        }
        initializers.push(first_initializer);

        while self.match_kind(TokenKind::Comma) {
            let name = self.consume(TokenKind::Identifier, "Expected variable name in variable declaration.")?;
            names.push(Identifier::from_token(&name));

            let initializer = if self.match_kind(TokenKind::Equal) {
                Some(self.ternary_conditional()?)
            } else {
                None
            };
            if initializer.is_none() && is_final {
                let previous = self.previous();
                return Err(self.error(previous, "Constant must have an initializer."));
            }
            initializers.push(initializer);
        }

        self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration.")?;

        Ok(Stmt::Var(Rc::new(VarDecl {
            declared: TypeDecl::from_token(&type_token),
            names,
            initializers,
            visibility,
            is_static,
            is_final,
        })))
    }

    /// Parses a function declaration; the opening `(` is already consumed.
    fn function_declaration(
        &mut self,
        return_type: TypeDecl,
        name: Identifier,
        visibility: Visibility,
        is_static: bool,
    ) -> Parse<Stmt> {
        if self.func_level != 0 {
            let previous = self.previous();
            return Err(self.error(previous, "Can't have nested functions."));
        }
        if return_type.tag == TypeTag::None {
            self.diagnostics
                .error_at_token(&return_type.name, return_type.line, return_type.column, "Invalid return type.");
            return Err(ParseError);
        }
        self.func_level += 1;

        let mut params: Vec<(TypeDecl, Identifier)> = Vec::new();
        if !self.check(TokenKind::ParenRight) {
            loop {
                if params.len() >= 255 {
                    let at = self.peek();
                    return Err(self.error(at, "Can't have more than 255 parameters."));
                }
                let param_type = self.consume_type("Expected parameter type.")?;
                let param_name = self.consume(TokenKind::Identifier, "Expected parameter name.")?;
                params.push((TypeDecl::from_token(&param_type), Identifier::from_token(&param_name)));
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::ParenRight, "Expected ')' in function declaration.")?;

        for i in 0..params.len() {
            for j in i + 1..params.len() {
                if params[i].1.name == params[j].1.name {
                    let previous = self.previous();
                    return Err(self.error(previous, "Function argument names can't repeat!"));
                }
            }
        }

        self.consume(TokenKind::CurlyLeft, "Expected '{' in function declaration.")?;
        let body = self.block_statements()?;
        self.func_level -= 1;

        Ok(Stmt::Function(Rc::new(FunctionDecl {
            return_type,
            name,
            visibility,
            is_static,
            params,
            body,
        })))
    }

    // === statements ===

    fn statement(&mut self) -> Parse<Stmt> {
        if self.match_kind(TokenKind::Sout) {
            return self.print_statement(false);
        }
        if self.match_kind(TokenKind::Soutln) {
            return self.print_statement(true);
        }
        if self.match_kind(TokenKind::Return) {
            return self.return_statement();
        }
        if self.match_kind(TokenKind::CurlyLeft) {
            return Ok(Stmt::Block(self.block_statements()?));
        }
        if self.match_kind(TokenKind::If) {
            return self.if_statement();
        }
        if self.match_kind(TokenKind::While) {
            return self.while_statement();
        }
        if self.match_kind(TokenKind::For) {
            return self.for_statement();
        }
        if self.match_kind(TokenKind::Break) {
            return self.break_statement();
        }
        if self.match_kind(TokenKind::Continue) {
            return self.continue_statement();
        }

        self.expression_statement()
    }

    fn block_statements(&mut self) -> Parse<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::CurlyRight) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        self.consume(TokenKind::CurlyRight, "Expect '}' at the end of the block.")?;
        Ok(statements)
    }

    fn print_statement(&mut self, newline: bool) -> Parse<Stmt> {
        let token = OpSpan::from_token(&self.previous());
        self.consume(TokenKind::ParenLeft, "Expected '(' before expression in print statement.")?;
        let expression = self.expression()?;
        self.consume(TokenKind::ParenRight, "Expected ')' after expression in print statement.")?;
        self.consume(TokenKind::Semicolon, "Expected ';' after ')' in print statement.")?;
        Ok(Stmt::Print {
            token,
            expression,
            newline,
        })
    }

    fn return_statement(&mut self) -> Parse<Stmt> {
        if self.func_level != 1 {
            let previous = self.previous();
            return Err(self.error(previous, "Expected return statement in a function body."));
        }
        let keyword = OpSpan::from_token(&self.previous());

        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expected ';' in return statement.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn break_statement(&mut self) -> Parse<Stmt> {
        if self.loop_level == 0 {
            let previous = self.previous();
            return Err(self.error(previous, "Can't use break statement outside a loop"));
        }
        self.consume(TokenKind::Semicolon, "Expected ';' after break statement.")?;
        Ok(Stmt::Break)
    }

    fn continue_statement(&mut self) -> Parse<Stmt> {
        if self.loop_level == 0 {
            let previous = self.previous();
            return Err(self.error(previous, "Can't use continue statement outside a loop"));
        }
        self.consume(TokenKind::Semicolon, "Expected ';' after continue statement.")?;
        Ok(Stmt::Continue)
    }

    fn if_statement(&mut self) -> Parse<Stmt> {
        let token = OpSpan::from_token(&self.previous());

        self.consume(TokenKind::ParenLeft, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::ParenRight, "Expect ')' after condition in 'if'.")?;
        if self.is_at_end() {
            let at = self.peek();
            return Err(self.error(at, "Expect statement after ')' in 'if'."));
        }
        let then_branch = Box::new(self.statement()?);

        let mut else_ifs = Vec::new();
        while self.check(TokenKind::Else) && self.check_next(TokenKind::If) {
            self.advance(); // else
            let else_if_token = OpSpan::from_token(&self.advance()); // if
            self.consume(TokenKind::ParenLeft, "Expected '(' after 'else if'.")?;
            let else_if_condition = self.expression()?;
            self.consume(TokenKind::ParenRight, "Expected ')' after condition in 'else if'.")?;
            if self.is_at_end() {
                let at = self.peek();
                return Err(self.error(at, "Expected statement after ')' in 'else if'."));
            }
            let else_if_then = self.statement()?;
            else_ifs.push(ElseIf {
                token: else_if_token,
                condition: else_if_condition,
                then_branch: else_if_then,
            });
        }

        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            token,
            condition,
            then_branch,
            else_ifs,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Parse<Stmt> {
        let token = OpSpan::from_token(&self.previous());
        self.loop_level += 1;
        self.consume(TokenKind::ParenLeft, "Expect '(' before 'while' condition.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::ParenRight, "Expect ')' after 'while' condition.")?;
        let body = self.statement()?;
        self.loop_level -= 1;

        Ok(Stmt::While {
            token,
            condition,
            body: Box::new(body),
            has_increment: false,
        })
    }

    /// `for(init; cond; incr) body` desugars into
    /// `{ init; while (cond) { body...; incr; } }` with the while flagged so
    /// `continue` still runs the increment.
    fn for_statement(&mut self) -> Parse<Stmt> {
        let token = OpSpan::from_token(&self.previous());
        self.loop_level += 1;
        self.consume(TokenKind::ParenLeft, "Expect '(' before 'for' initializer.")?;

        let initializer = if self.match_kind(TokenKind::Semicolon) {
            None
        } else if self.match_type() {
            let type_token = self.previous();
            Some(self.var_declaration(type_token, Visibility::Local, false, false)?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after 'for' condition.")?;

        let increment = if self.check(TokenKind::ParenRight) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::ParenRight, "Expected ')' after 'for' increment.")?;

        let mut body = self.statement()?;
        self.loop_level -= 1;

        let has_increment = increment.is_some();
        if let Some(increment) = increment {
            let increment_statement = Stmt::Expression(increment);
            body = match body {
                Stmt::Block(mut statements) => {
                    statements.push(increment_statement);
                    Stmt::Block(statements)
                }
                other => Stmt::Block(vec![other, increment_statement]),
            };
        }

        let condition = condition.unwrap_or(Expr::Literal(Value::Boolean(true)));
        let lowered = Stmt::While {
            token,
            condition,
            body: Box::new(body),
            has_increment,
        };

        Ok(match initializer {
            Some(initializer) => Stmt::Block(vec![initializer, lowered]),
            None => lowered,
        })
    }

    fn expression_statement(&mut self) -> Parse<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after value in expression statement.")?;
        Ok(Stmt::Expression(value))
    }

    // === expressions, loosest to tightest ===

    fn expression(&mut self) -> Parse<Expr> {
        self.comma_operator()
    }

    fn comma_operator(&mut self) -> Parse<Expr> {
        let mut expr = self.ternary_conditional()?;
        while self.match_kind(TokenKind::Comma) {
            // C comma semantics: the discarded left operand is released here
            expr = self.ternary_conditional()?;
        }
        Ok(expr)
    }

    fn ternary_conditional(&mut self) -> Parse<Expr> {
        let expr = self.assignment()?;

        if self.match_kind(TokenKind::Question) {
            let question = OpSpan::from_token(&self.previous());
            if self.is_at_end() {
                let at = self.peek();
                return Err(self.error(at, "Expected then branch after '?' in ternary."));
            }
            let then = self.expression()?;
            self.consume(TokenKind::Colon, "Expected ':' after then branch in ternary operator.")?;
            let otherwise = self.ternary_conditional()?;
            return Ok(Expr::Ternary {
                question,
                condition: Box::new(expr),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }

        Ok(expr)
    }

    fn assignment(&mut self) -> Parse<Expr> {
        let expr = self.logical_or()?;

        if self.match_kind(TokenKind::Equal) {
            let equals = self.previous();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    name,
                    value: Box::new(value),
                }),
                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                }),
                _ => Err(self.error(equals, "Invalid assignment target.")),
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Parse<Expr> {
        let mut expr = self.logical_and()?;
        while self.match_kind(TokenKind::Or) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.logical_and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> Parse<Expr> {
        let mut expr = self.equality()?;
        while self.match_kind(TokenKind::And) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Parse<Expr> {
        let mut expr = self.comparison()?;
        while self.match_any(&[TokenKind::NotEqual, TokenKind::EqualEqual]) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Parse<Expr> {
        let mut expr = self.bitwise_or()?;
        while self.match_any(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.bitwise_or()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn bitwise_or(&mut self) -> Parse<Expr> {
        let mut expr = self.bitwise_xor()?;
        while self.match_kind(TokenKind::BitwiseOr) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.bitwise_xor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn bitwise_xor(&mut self) -> Parse<Expr> {
        let mut expr = self.bitwise_and()?;
        while self.match_kind(TokenKind::BitwiseXor) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.bitwise_and()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn bitwise_and(&mut self) -> Parse<Expr> {
        let mut expr = self.bitwise_shift()?;
        while self.match_kind(TokenKind::BitwiseAnd) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.bitwise_shift()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn bitwise_shift(&mut self) -> Parse<Expr> {
        let mut expr = self.term()?;
        while self.match_any(&[TokenKind::LeftShift, TokenKind::RightShift]) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> Parse<Expr> {
        let mut expr = self.factor()?;
        while self.match_any(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Parse<Expr> {
        let mut expr = self.unary()?;
        while self.match_any(&[TokenKind::Slash, TokenKind::Star, TokenKind::Percent]) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Parse<Expr> {
        if self.match_any(&[TokenKind::Not, TokenKind::Minus, TokenKind::BitwiseNot]) {
            let op = OpSpan::from_token(&self.previous());
            let right = self.unary()?;
            return Ok(Expr::Unary {
                op,
                right: Box::new(right),
            });
        }

        // prefix ++ --
        if self.match_any(&[TokenKind::PlusPlus, TokenKind::MinusMinus]) {
            let op = self.previous();
            let is_increment = op.kind == TokenKind::PlusPlus;
            let message = format!("Expected identifier after prefix '{}'.", op.lexeme);
            let name = self.consume(TokenKind::Identifier, &message)?;
            return Ok(Expr::Increment {
                name: Identifier::from_token(&name),
                is_increment,
            });
        }

        // postfix ++ --
        if self.check(TokenKind::Identifier)
            && (self.check_next(TokenKind::PlusPlus) || self.check_next(TokenKind::MinusMinus))
        {
            let name = self.advance();
            let is_increment = self.advance().kind == TokenKind::PlusPlus;
            return Ok(Expr::Increment {
                name: Identifier::from_token(&name),
                is_increment,
            });
        }

        // cast or grouping: one-token lookahead past the '('
        if self.match_kind(TokenKind::ParenLeft) {
            if self.peek().kind.is_cast_type_keyword() {
                let type_token = self.advance();
                self.consume(TokenKind::ParenRight, "Expected ')' after type in cast")?;
                let right = self.unary()?;
                return Ok(Expr::Cast {
                    target: type_token.kind.to_type_tag(),
                    line: type_token.line,
                    column: type_token.column,
                    right: Box::new(right),
                });
            }
            self.current -= 1;
        }

        self.call()
    }

    fn call(&mut self) -> Parse<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_kind(TokenKind::ParenLeft) {
                let mut arguments = Vec::new();
                if !self.check(TokenKind::ParenRight) {
                    loop {
                        if arguments.len() >= 255 {
                            let at = self.peek();
                            return Err(self.error(at, "Can't have more than 255 arguments."));
                        }
                        let at = self.peek();
                        // always parse one level of precedence above the comma operator
                        let argument = self.ternary_conditional()?;
                        arguments.push(Argument {
                            expr: argument,
                            line: at.line,
                            column: at.column,
                        });
                        if !self.match_kind(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let paren = self.consume(TokenKind::ParenRight, "Expected ')' after function call.")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    paren: OpSpan::from_token(&paren),
                    arguments,
                };
            } else if self.match_kind(TokenKind::Dot) {
                let name = self.consume(TokenKind::Identifier, "Expected property name after '.'.")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name: Identifier::from_token(&name),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn primary(&mut self) -> Parse<Expr> {
        if self.match_kind(TokenKind::False) {
            return Ok(Expr::Literal(Value::Boolean(false)));
        }
        if self.match_kind(TokenKind::True) {
            return Ok(Expr::Literal(Value::Boolean(true)));
        }
        if self.match_kind(TokenKind::Null) {
            return Ok(Expr::Literal(Value::Null));
        }

        if self.match_any(&[TokenKind::Number, TokenKind::StringLit, TokenKind::CharLit]) {
            let token = self.previous();
            let value = match token.literal {
                Some(Literal::Long(v)) => Value::Long(v),
                Some(Literal::Float(v)) => Value::Float(v),
                Some(Literal::Double(v)) => Value::Double(v),
                Some(Literal::Char(v)) => Value::Char(v),
                Some(Literal::Str(s)) => Value::Str(Some(Rc::from(s))),
                None => Value::None,
            };
            return Ok(Expr::Literal(value));
        }

        if self.match_kind(TokenKind::This) {
            let token = self.previous();
            if self.class_level == 0 {
                return Err(self.error(token, "Can't use 'this' outside a class."));
            }
            return Ok(Expr::This(Identifier::from_token(&token)));
        }

        // optional instantiation sugar: `new X(...)` is `X(...)`
        if self.match_kind(TokenKind::New) {
            return self.call();
        }

        if self.match_any(&[TokenKind::Identifier, TokenKind::UserType]) {
            let token = self.previous();
            let followed_by_paren = self.check(TokenKind::ParenLeft);
            return Ok(Expr::Variable {
                name: Identifier::from_token(&token),
                followed_by_paren,
            });
        }

        if self.match_kind(TokenKind::ParenLeft) {
            let expr = self.expression()?;
            self.consume(TokenKind::ParenRight, "Expected closing ')'.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        let at = self.peek();
        Err(self.error(at, "Expected expression."))
    }

    // === recovery ===

    fn error(&mut self, token: Token<'src>, message: &str) -> ParseError {
        self.diagnostics
            .error_at_token(token.describe(), token.line, token.column, message);
        ParseError
    }

    /// Skips to the next statement boundary: just past a semicolon, or at one
    /// of the anchor token kinds. Depth counters are reset because the
    /// recovery point is a top-level boundary.
    fn synchronize(&mut self) {
        self.loop_level = 0;
        self.func_level = 0;
        self.class_level = 0;

        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Static
                | TokenKind::Public
                | TokenKind::Private
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue => return,
                kind if kind.is_type_keyword() => return,
                _ => {}
            }
            self.advance();
        }
    }

    // === token helpers ===

    /// Matches a constructor head and returns its visibility: `Package` for
    /// the bare `__init__(` form, `Public` for `public __init__(`. Any other
    /// modifier before `__init__` is rejected.
    fn match_constructor(&mut self) -> Parse<Option<Visibility>> {
        if self.peek().kind == TokenKind::Init {
            self.advance();
            self.consume(TokenKind::ParenLeft, "Expected '(' after '__init__'.")?;
            return Ok(Some(Visibility::Package));
        }
        if self.peek().kind.is_modifier() && self.peek_next().kind == TokenKind::Init {
            if self.peek().kind != TokenKind::Public {
                let at = self.peek();
                return Err(self.error(at, "Constructor must have a visibility of public or package."));
            }
            self.advance(); // public
            self.advance(); // __init__
            self.consume(TokenKind::ParenLeft, "Expected '(' after '__init__'.")?;
            return Ok(Some(Visibility::Public));
        }
        Ok(None)
    }

    fn match_any_modifier(&mut self) -> bool {
        if self.peek().kind.is_modifier() {
            self.advance();
            return true;
        }
        false
    }

    /// True when the next token opens a type position. Identifiers naming a
    /// registered class are re-tagged as user types on the way.
    fn check_type(&mut self) -> bool {
        if self.is_at_end() {
            return false;
        }
        if self.peek().kind == TokenKind::Identifier && self.class_names.contains(self.peek().lexeme) {
            self.tokens[self.current].kind = TokenKind::UserType;
            return true;
        }
        self.peek().kind.is_type_keyword()
    }

    fn match_type(&mut self) -> bool {
        if self.check_type() {
            self.advance();
            return true;
        }
        false
    }

    fn consume_type(&mut self, message: &str) -> Parse<Token<'src>> {
        if self.check_type() {
            return Ok(self.advance());
        }
        let at = self.peek();
        Err(self.error(at, message))
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Parse<Token<'src>> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let at = self.peek();
        Err(self.error(at, message))
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        let next = self.peek_next().kind;
        next != TokenKind::Eof && next == kind
    }

    fn advance(&mut self) -> Token<'src> {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> Token<'src> {
        self.tokens[self.current]
    }

    fn peek_next(&self) -> Token<'src> {
        let index = (self.current + 1).min(self.tokens.len() - 1);
        self.tokens[index]
    }

    fn previous(&self) -> Token<'src> {
        self.tokens[self.current.saturating_sub(1)]
    }
}
