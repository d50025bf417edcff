//! The tree walker: statement execution and expression evaluation.
//!
//! The interpreter owns the global environment (built-ins plus top-level
//! definitions), a current-environment pointer pushed and popped around
//! blocks and calls, and the instance registry drained at shutdown.
//! `break`/`continue`/`return` travel as [`Unwind`] variants: the loop
//! executor catches the first two, function calls catch the third, and
//! `interpret` catches runtime errors so a REPL session survives them.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    ast::{Argument, Expr, Identifier, OpSpan, Stmt, VarDecl, Visibility},
    builtins,
    callable::{ArgumentValue, ArgumentValues, Callable, UserFunction},
    class::{ClassInfo, Instance},
    environment::{EnvRef, Environment, Variable},
    error::{Diagnostics, Exec, RuntimeError, Unwind},
    io::PrintWriter,
    token::TokenKind,
    value::{TypeTag, Value},
};

pub struct Interpreter<W> {
    globals: EnvRef,
    environment: EnvRef,
    instances: Vec<Rc<Instance>>,
    writer: W,
}

impl<W: PrintWriter> Interpreter<W> {
    pub fn new(writer: W) -> Self {
        let globals = Environment::new();
        builtins::install(&globals);
        Self {
            environment: globals.clone(),
            globals,
            instances: Vec::new(),
            writer,
        }
    }

    pub(crate) fn globals(&self) -> EnvRef {
        self.globals.clone()
    }

    pub(crate) fn register_instance(&mut self, instance: Rc<Instance>) {
        self.instances.push(instance);
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Executes a statement sequence. A runtime error aborts the current run,
    /// is reported through the diagnostics sink, and leaves the interpreter
    /// reusable. Returns the value of the last top-level expression statement
    /// that produced one, for REPL echo.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) -> Option<Value> {
        let mut last = None;
        for statement in statements {
            let result = match statement {
                Stmt::Expression(expression) => match self.evaluate(expression) {
                    Ok(value) => {
                        if !matches!(value, Value::Void | Value::None) {
                            last = Some(value);
                        }
                        Ok(())
                    }
                    Err(unwind) => Err(unwind),
                },
                other => self.execute(other),
            };
            if let Err(unwind) = result {
                // break/continue/return can't reach the top level; the parser
                // rejects them outside their contexts
                if let Unwind::Error(error) = unwind {
                    diagnostics.runtime_error(&error);
                }
                return None;
            }
        }
        last
    }

    // === statements ===

    fn execute(&mut self, statement: &Stmt) -> Exec<()> {
        match statement {
            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(self.environment.clone());
                self.execute_block(statements, environment)
            }

            Stmt::Break => Err(Unwind::Break),
            Stmt::Continue => Err(Unwind::Continue),

            Stmt::Class(decl) => {
                let class_info = ClassInfo::new(self, decl.clone())?;
                let variable = Variable {
                    value: Value::Class(class_info),
                    visibility: Visibility::Public,
                    is_static: false,
                    is_final: true,
                    is_uninitialized: false,
                };
                self.environment
                    .borrow_mut()
                    .define(&decl.name.name, decl.name.line, decl.name.column, variable)?;
                Ok(())
            }

            Stmt::Expression(expression) => {
                self.evaluate(expression)?;
                Ok(())
            }

            Stmt::Function(decl) => {
                let function = UserFunction {
                    decl: decl.clone(),
                    closure: self.globals.clone(),
                };
                let variable = Variable {
                    value: Value::Function(Rc::new(Callable::Function(function))),
                    visibility: decl.visibility,
                    is_static: decl.is_static,
                    is_final: true,
                    is_uninitialized: false,
                };
                self.globals
                    .borrow_mut()
                    .define(&decl.name.name, decl.name.line, decl.name.column, variable)?;
                Ok(())
            }

            Stmt::If {
                token,
                condition,
                then_branch,
                else_ifs,
                else_branch,
            } => {
                let Value::Boolean(truth) = self.evaluate(condition)? else {
                    return Err(span_error(token, "Condition must be boolean"));
                };
                if truth {
                    return self.execute(then_branch);
                }
                for else_if in else_ifs {
                    let Value::Boolean(truth) = self.evaluate(&else_if.condition)? else {
                        return Err(span_error(&else_if.token, "Condition must be boolean"));
                    };
                    if truth {
                        return self.execute(&else_if.then_branch);
                    }
                }
                if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
                Ok(())
            }

            Stmt::Print {
                token,
                expression,
                newline,
            } => {
                let value = self.evaluate(expression)?;
                if value.tag() == TypeTag::Void {
                    return Err(span_error(token, "Can't print void."));
                }
                let text = value.to_print_string();
                self.writer.write_str(&text);
                if *newline {
                    self.writer.write_char('\n');
                }
                Ok(())
            }

            Stmt::Return { value, .. } => {
                let result = match value {
                    Some(expression) => self.evaluate(expression)?,
                    None => Value::Void,
                };
                Err(Unwind::Return(result))
            }

            Stmt::Var(decl) => {
                for (name, initializer) in decl.names.iter().zip(&decl.initializers) {
                    let variable = self.validate_variable(decl, name, initializer.as_ref())?;
                    self.environment
                        .borrow_mut()
                        .define(&name.name, name.line, name.column, variable)?;
                }
                Ok(())
            }

            Stmt::While {
                token,
                condition,
                body,
                has_increment,
            } => self.execute_while(token, condition, body, *has_increment),
        }
    }

    /// Executes statements in the given environment, restoring the previous
    /// one on every exit path, including unwinds.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Exec<()> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let mut result = Ok(());
        for statement in statements {
            result = self.execute(statement);
            if result.is_err() {
                break;
            }
        }
        self.environment = previous;
        result
    }

    fn execute_while(&mut self, token: &OpSpan, condition: &Expr, body: &Stmt, has_increment: bool) -> Exec<()> {
        loop {
            let Value::Boolean(truth) = self.evaluate(condition)? else {
                return Err(span_error(token, "Expected boolean condition."));
            };
            if !truth {
                return Ok(());
            }
            match self.execute(body) {
                Ok(()) => {}
                Err(Unwind::Break) => return Ok(()),
                Err(Unwind::Continue) => {
                    // a for-desugared loop still runs its increment (the
                    // block body's last statement) before retesting
                    if has_increment
                        && let Stmt::Block(statements) = body
                        && let Some(increment) = statements.last()
                    {
                        self.execute(increment)?;
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Declaration-time validity rules shared by variable statements, class
    /// statics and instance fields: the declared type must be real, void is
    /// never a value, primitives can't be null, and number/non-number
    /// mismatches are diagnostics. The initializer's payload is coerced to
    /// the declared type.
    pub(crate) fn validate_variable(
        &mut self,
        decl: &VarDecl,
        name: &Identifier,
        initializer: Option<&Expr>,
    ) -> Exec<Variable> {
        let declared = &decl.declared;
        if declared.tag == TypeTag::None {
            return Err(RuntimeError::new(
                declared.name.as_ref(),
                declared.line,
                declared.column,
                format!("Token '{}' is an invalid type.", declared.name),
            )
            .into());
        }

        let (value, is_uninitialized) = match initializer {
            Some(expression) => {
                let value = self.evaluate(expression)?;
                if value.tag() == TypeTag::Void {
                    return Err(RuntimeError::new(
                        name.name.as_ref(),
                        name.line,
                        name.column,
                        "Void isn't a valid value, as it is a zero-byte type.",
                    )
                    .into());
                }
                if declared.tag.is_primitive() && value.tag() == TypeTag::Null {
                    return Err(RuntimeError::new(
                        declared.name.as_ref(),
                        declared.line,
                        declared.column,
                        "Primitives can't be null.",
                    )
                    .into());
                }
                if declared.tag.is_number() != value.tag().is_number() {
                    return Err(RuntimeError::new(
                        declared.name.as_ref(),
                        declared.line,
                        declared.column,
                        format!(
                            "Can't do an implicit cast between '{}' and '{}'.",
                            value.type_name(),
                            declared.name
                        ),
                    )
                    .into());
                }
                let value = value.coerce_to_declared(declared).map_err(|message| {
                    RuntimeError::new(declared.name.as_ref(), declared.line, declared.column, message)
                })?;
                (value, false)
            }
            None => (Value::default_for(declared), true),
        };

        Ok(Variable {
            value,
            visibility: decl.visibility,
            is_static: decl.is_static,
            is_final: decl.is_final,
            is_uninitialized,
        })
    }

    /// Like [`Self::validate_variable`], but initializers are evaluated in
    /// the global environment. Used when populating instance fields.
    pub(crate) fn validate_variable_in_globals(
        &mut self,
        decl: &VarDecl,
        name: &Identifier,
        initializer: Option<&Expr>,
    ) -> Exec<Variable> {
        let previous = std::mem::replace(&mut self.environment, self.globals.clone());
        let result = self.validate_variable(decl, name, initializer);
        self.environment = previous;
        result
    }

    /// True when reading `visibility` members of `instance` is not allowed
    /// from the current scope: private members are accessible only if the
    /// executing scope chain holds a `this` bound to an instance of the same
    /// class.
    pub(crate) fn private_access_blocked(&self, instance: &Instance, visibility: Visibility) -> bool {
        if visibility != Visibility::Private {
            return false;
        }
        match Environment::lookup_this(&self.environment) {
            Some(Value::Instance(Some(this_instance))) => this_instance.class_name() != instance.class_name(),
            _ => true,
        }
    }

    // === expressions ===

    fn evaluate(&mut self, expression: &Expr) -> Exec<Value> {
        match expression {
            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;
                Environment::assign(&self.environment, &name.name, name.line, name.column, value.clone())?;
                Ok(value)
            }

            Expr::Binary { left, op, right } => self.eval_binary(left, *op, right),

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.eval_call(callee, *paren, arguments),

            Expr::Cast {
                target,
                line,
                column,
                right,
            } => self.eval_cast(*target, *line, *column, right),

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                match object {
                    Value::Instance(Some(instance)) => {
                        Ok(instance.get(self, &name.name, name.line, name.column)?)
                    }
                    Value::Class(class) => Ok(class.get_static(&name.name, name.line, name.column)?),
                    _ => Err(RuntimeError::new(
                        name.name.as_ref(),
                        name.line,
                        name.column,
                        "Only instances and classes have properties.",
                    )
                    .into()),
                }
            }

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Increment { name, is_increment } => self.eval_increment(name, *is_increment),

            Expr::Literal(value) => Ok(value.clone()),

            Expr::Logical { left, op, right } => self.eval_logical(left, *op, right),

            Expr::Set { object, name, value } => {
                let target = self.evaluate(object)?;
                match target {
                    Value::Instance(Some(instance)) => {
                        let value = self.evaluate(value)?;
                        instance.set(&name.name, name.line, name.column, value.clone())?;
                        Ok(value)
                    }
                    Value::Class(class) => {
                        let value = self.evaluate(value)?;
                        class.set_static(&name.name, name.line, name.column, value.clone())?;
                        Ok(value)
                    }
                    _ => Err(RuntimeError::new(
                        name.name.as_ref(),
                        name.line,
                        name.column,
                        "Only instances have fields.",
                    )
                    .into()),
                }
            }

            Expr::Ternary {
                question,
                condition,
                then,
                otherwise,
            } => {
                let Value::Boolean(truth) = self.evaluate(condition)? else {
                    return Err(span_error(question, "Only booleans."));
                };
                if truth { self.evaluate(then) } else { self.evaluate(otherwise) }
            }

            Expr::This(name) => Ok(Environment::get(&self.environment, "this", name.line, name.column)?),

            Expr::Unary { op, right } => self.eval_unary(*op, right),

            Expr::Variable { name, .. } => {
                Ok(Environment::get(&self.environment, &name.name, name.line, name.column)?)
            }
        }
    }

    fn eval_binary(&mut self, left: &Expr, op: OpSpan, right: &Expr) -> Exec<Value> {
        let lhs = self.evaluate(left)?;
        let rhs = self.evaluate(right)?;

        let smaller = lhs.tag().min(rhs.tag());
        let bigger = lhs.tag().max(rhs.tag());

        match op.kind {
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                arithmetic(op, &lhs, &rhs, smaller, bigger)
            }
            TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::EqualEqual
            | TokenKind::NotEqual => comparison(op, &lhs, &rhs, smaller, bigger),
            _ => whole_number(op, &lhs, &rhs, smaller, bigger),
        }
    }

    fn eval_unary(&mut self, op: OpSpan, right: &Expr) -> Exec<Value> {
        let value = self.evaluate(right)?;
        match op.kind {
            TokenKind::Minus => Ok(match value {
                Value::Byte(v) => Value::Byte(v.wrapping_neg()),
                Value::Int(v) => Value::Int(v.wrapping_neg()),
                Value::Long(v) => Value::Long(v.wrapping_neg()),
                Value::Float(v) => Value::Float(-v),
                Value::Double(v) => Value::Double(-v),
                _ => return Err(span_error(&op, "Only numbers.")),
            }),
            TokenKind::BitwiseNot => Ok(match value {
                Value::Byte(v) => Value::Byte(!v),
                Value::Int(v) => Value::Int(!v),
                Value::Long(v) => Value::Long(!v),
                _ => return Err(span_error(&op, "Only whole numbers.")),
            }),
            _ => match value {
                Value::Boolean(v) => Ok(Value::Boolean(!v)),
                _ => Err(span_error(&op, "Only booleans.")),
            },
        }
    }

    fn eval_logical(&mut self, left: &Expr, op: OpSpan, right: &Expr) -> Exec<Value> {
        let Value::Boolean(left_truth) = self.evaluate(left)? else {
            return Err(span_error(&op, "Expected boolean operand on the left hand side."));
        };

        // short-circuit: the right operand is neither evaluated nor
        // type-checked when the left side decides the result
        match op.kind {
            TokenKind::Or if left_truth => Ok(Value::Boolean(true)),
            TokenKind::And if !left_truth => Ok(Value::Boolean(false)),
            _ => {
                let Value::Boolean(right_truth) = self.evaluate(right)? else {
                    return Err(span_error(&op, "Expected boolean operand on the right hand side."));
                };
                Ok(Value::Boolean(right_truth))
            }
        }
    }

    fn eval_increment(&mut self, name: &Identifier, is_increment: bool) -> Exec<Value> {
        let current = Environment::get(&self.environment, &name.name, name.line, name.column)?;

        let updated = match current {
            Value::Byte(v) => Value::Byte(if is_increment { v.wrapping_add(1) } else { v.wrapping_sub(1) }),
            Value::Char(v) => Value::Char(if is_increment { v.wrapping_add(1) } else { v.wrapping_sub(1) }),
            Value::Int(v) => Value::Int(if is_increment { v.wrapping_add(1) } else { v.wrapping_sub(1) }),
            Value::Long(v) => Value::Long(if is_increment { v.wrapping_add(1) } else { v.wrapping_sub(1) }),
            Value::Float(v) => Value::Float(if is_increment { v + 1.0 } else { v - 1.0 }),
            Value::Double(v) => Value::Double(if is_increment { v + 1.0 } else { v - 1.0 }),
            _ => {
                return Err(RuntimeError::new(
                    name.name.as_ref(),
                    name.line,
                    name.column,
                    "Expected a number operand.",
                )
                .into());
            }
        };

        Environment::assign(&self.environment, &name.name, name.line, name.column, updated.clone())?;
        Ok(updated)
    }

    fn eval_cast(&mut self, target: TypeTag, line: u32, column: u32, right: &Expr) -> Exec<Value> {
        let value = self.evaluate(right)?;
        let target_name: &'static str = target.into();
        if !target.is_number() {
            return Err(RuntimeError::new(target_name, line, column, "Invalid type to cast.").into());
        }
        if !value.tag().is_number() {
            return Err(RuntimeError::new(target_name, line, column, "Only numbers can be cast.").into());
        }
        Ok(value.convert_numeric(target))
    }

    fn eval_call(&mut self, callee: &Expr, paren: OpSpan, arguments: &[Argument]) -> Exec<Value> {
        let callee_value = self.evaluate(callee)?;

        // strictly left-to-right, positional order
        let mut evaluated: ArgumentValues = SmallVec::new();
        for argument in arguments {
            evaluated.push(ArgumentValue {
                value: self.evaluate(&argument.expr)?,
                line: argument.line,
                column: argument.column,
            });
        }

        match callee_value {
            Value::Function(callable) => {
                if evaluated.len() != callable.arity() {
                    return Err(RuntimeError::new(
                        callable.name(),
                        paren.line,
                        paren.column,
                        format!(
                            "Expected {} arguments but received {}.",
                            callable.arity(),
                            evaluated.len()
                        ),
                    )
                    .into());
                }
                callable.call(self, paren.line, paren.column, &evaluated)
            }
            Value::Class(class) => class.instantiate(self, paren.line, paren.column, &evaluated),
            _ => Err(RuntimeError::new(
                paren.symbol(),
                paren.line,
                paren.column,
                "Can only call functions and classes.",
            )
            .into()),
        }
    }
}

impl<W> Drop for Interpreter<W> {
    fn drop(&mut self) {
        // Bound methods close over an environment holding their instance, a
        // reference cycle the registry breaks at shutdown so teardown
        // actually frees the instances.
        for instance in &self.instances {
            instance.release_fields();
        }
    }
}

fn span_error(span: &OpSpan, message: &str) -> Unwind {
    RuntimeError::new(span.symbol(), span.line, span.column, message).into()
}

/// `+ - * /` at the width of the bigger operand; whole-number division by
/// zero is a runtime error, float division follows IEEE 754.
fn arithmetic(op: OpSpan, lhs: &Value, rhs: &Value, smaller: TypeTag, bigger: TypeTag) -> Exec<Value> {
    if smaller < TypeTag::Byte {
        return Err(span_error(&op, "Only numbers."));
    }

    macro_rules! integer_arm {
        ($widen:ident, $variant:ident) => {{
            let (a, b) = (lhs.$widen(), rhs.$widen());
            match op.kind {
                TokenKind::Plus => Value::$variant(a.wrapping_add(b)),
                TokenKind::Minus => Value::$variant(a.wrapping_sub(b)),
                TokenKind::Star => Value::$variant(a.wrapping_mul(b)),
                _ => {
                    if b == 0 {
                        return Err(span_error(&op, "Right hand side can't be zero"));
                    }
                    Value::$variant(a.wrapping_div(b))
                }
            }
        }};
    }
    macro_rules! float_arm {
        ($widen:ident, $variant:ident) => {{
            let (a, b) = (lhs.$widen(), rhs.$widen());
            match op.kind {
                TokenKind::Plus => Value::$variant(a + b),
                TokenKind::Minus => Value::$variant(a - b),
                TokenKind::Star => Value::$variant(a * b),
                _ => Value::$variant(a / b),
            }
        }};
    }

    Ok(match bigger {
        TypeTag::Byte => integer_arm!(widen_to_byte, Byte),
        TypeTag::Char => integer_arm!(widen_to_char, Char),
        TypeTag::Int => integer_arm!(widen_to_int, Int),
        TypeTag::Long => integer_arm!(widen_to_long, Long),
        TypeTag::Float => float_arm!(widen_to_float, Float),
        TypeTag::Double => float_arm!(widen_to_double, Double),
        _ => return Err(span_error(&op, "Only numbers.")),
    })
}

/// `< <= > >= == !=` as a widened numeric comparison yielding a boolean.
fn comparison(op: OpSpan, lhs: &Value, rhs: &Value, smaller: TypeTag, bigger: TypeTag) -> Exec<Value> {
    if smaller < TypeTag::Byte {
        return Err(span_error(&op, "Only numbers."));
    }

    macro_rules! compare_arm {
        ($widen:ident) => {{
            let (a, b) = (lhs.$widen(), rhs.$widen());
            match op.kind {
                TokenKind::Greater => a > b,
                TokenKind::GreaterEqual => a >= b,
                TokenKind::Less => a < b,
                TokenKind::LessEqual => a <= b,
                TokenKind::EqualEqual => a == b,
                _ => a != b,
            }
        }};
    }

    let result = match bigger {
        TypeTag::Byte => compare_arm!(widen_to_byte),
        TypeTag::Char => compare_arm!(widen_to_char),
        TypeTag::Int => compare_arm!(widen_to_int),
        TypeTag::Long => compare_arm!(widen_to_long),
        TypeTag::Float => compare_arm!(widen_to_float),
        TypeTag::Double => compare_arm!(widen_to_double),
        _ => return Err(span_error(&op, "Only numbers.")),
    };
    Ok(Value::Boolean(result))
}

/// `% << >> | ^ &` on the whole-number band; `%` rejects a zero divisor.
fn whole_number(op: OpSpan, lhs: &Value, rhs: &Value, smaller: TypeTag, bigger: TypeTag) -> Exec<Value> {
    if smaller < TypeTag::Byte {
        return Err(span_error(&op, "Only numbers."));
    }

    macro_rules! whole_arm {
        ($widen:ident, $variant:ident) => {{
            let (a, b) = (lhs.$widen(), rhs.$widen());
            match op.kind {
                TokenKind::Percent => {
                    if b == 0 {
                        return Err(span_error(&op, "Right hand side can't be zero"));
                    }
                    Value::$variant(a.wrapping_rem(b))
                }
                TokenKind::LeftShift => Value::$variant(a.wrapping_shl(b as u32)),
                TokenKind::RightShift => Value::$variant(a.wrapping_shr(b as u32)),
                TokenKind::BitwiseOr => Value::$variant(a | b),
                TokenKind::BitwiseXor => Value::$variant(a ^ b),
                _ => Value::$variant(a & b),
            }
        }};
    }

    Ok(match bigger {
        TypeTag::Byte => whole_arm!(widen_to_byte, Byte),
        TypeTag::Char => whole_arm!(widen_to_char, Char),
        TypeTag::Int => whole_arm!(widen_to_int, Int),
        TypeTag::Long => whole_arm!(widen_to_long, Long),
        _ => return Err(span_error(&op, "Only whole numbers.")),
    })
}
