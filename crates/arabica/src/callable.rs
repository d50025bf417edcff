//! Callables: built-in functions and user-defined functions.
//!
//! Classes are also callable (as their own constructor) but dispatch through
//! `Value::Class`; see `class.rs`.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    ast::FunctionDecl,
    environment::{EnvRef, Environment, Variable},
    error::{Exec, RuntimeError, Unwind},
    interpreter::Interpreter,
    io::PrintWriter,
    value::{TypeTag, Value},
};

/// What kind of callable a value holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Builtin,
    UserDefined,
    Constructor,
}

/// An evaluated call argument with its source position for per-argument
/// diagnostics.
#[derive(Debug, Clone)]
pub struct ArgumentValue {
    pub value: Value,
    pub line: u32,
    pub column: u32,
}

/// Evaluated argument buffer; calls are capped at 255 arguments and nearly
/// always tiny.
pub(crate) type ArgumentValues = SmallVec<[ArgumentValue; 8]>;

pub type NativeArityFn = fn() -> usize;
pub type NativeCallFn = fn(u32, u32, &[ArgumentValue]) -> Result<Value, RuntimeError>;
pub type NativeReprFn = fn() -> String;

/// A built-in function: a name and three callbacks supplied at registration.
pub struct NativeFunction {
    name: &'static str,
    arity: NativeArityFn,
    call: NativeCallFn,
    repr: NativeReprFn,
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).finish()
    }
}

impl NativeFunction {
    pub(crate) fn new(name: &'static str, arity: NativeArityFn, call: NativeCallFn, repr: NativeReprFn) -> Self {
        Self { name, arity, call, repr }
    }
}

/// A user-defined function value: the shared declaration plus the captured
/// closure environment. Bound methods are user functions whose closure frame
/// pre-binds `this`.
pub struct UserFunction {
    pub decl: Rc<FunctionDecl>,
    pub closure: EnvRef,
}

// The closure is omitted: a bound method's closure leads back to its
// instance, and Debug must not follow that cycle.
impl std::fmt::Debug for UserFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserFunction").field("name", &self.decl.name.name).finish()
    }
}

#[derive(Debug)]
pub enum Callable {
    Native(NativeFunction),
    Function(UserFunction),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Self::Native(native) => (native.arity)(),
            Self::Function(function) => function.decl.params.len(),
        }
    }

    pub fn kind(&self) -> CallableKind {
        match self {
            Self::Native(_) => CallableKind::Builtin,
            Self::Function(_) => CallableKind::UserDefined,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Native(native) => native.name,
            Self::Function(function) => &function.decl.name.name,
        }
    }

    pub fn repr(&self) -> String {
        match self {
            Self::Native(native) => (native.repr)(),
            Self::Function(function) => format!("<fn {}>", function.decl.name.name),
        }
    }

    pub(crate) fn call<W: PrintWriter>(
        &self,
        interpreter: &mut Interpreter<W>,
        line: u32,
        column: u32,
        arguments: &[ArgumentValue],
    ) -> Exec<Value> {
        match self {
            Self::Native(native) => Ok((native.call)(line, column, arguments)?),
            Self::Function(function) => function.call(interpreter, line, column, arguments),
        }
    }
}

impl UserFunction {
    /// Calls the function: binds parameters as locals in a fresh frame whose
    /// parent is the closure, executes the body, catches the return signal,
    /// and coerces the result to the declared return type.
    fn call<W: PrintWriter>(
        &self,
        interpreter: &mut Interpreter<W>,
        line: u32,
        column: u32,
        arguments: &[ArgumentValue],
    ) -> Exec<Value> {
        let frame = Environment::with_enclosing(self.closure.clone());
        {
            let mut borrowed = frame.borrow_mut();
            for ((_, param_name), argument) in self.decl.params.iter().zip(arguments) {
                borrowed.define_raw(param_name.name.clone(), Variable::local(argument.value.clone()));
            }
        }

        match interpreter.execute_block(&self.decl.body, frame) {
            Err(Unwind::Return(value)) => self.coerce_return(value, line, column),
            Ok(()) => Ok(if self.decl.return_type.tag == TypeTag::Void {
                Value::Void
            } else {
                // falling off the end of a non-void function yields no value
                Value::None
            }),
            Err(other) => Err(other),
        }
    }

    fn coerce_return(&self, value: Value, line: u32, column: u32) -> Exec<Value> {
        let declared = &self.decl.return_type;
        let value_tag = value.tag();

        if value_tag == TypeTag::Void || value_tag == declared.tag {
            return Ok(value);
        }
        if declared.tag.is_number() && value_tag.is_number() {
            return Ok(value.convert_numeric(declared.tag));
        }
        match (declared.tag, value) {
            (TypeTag::String, Value::Null) => Ok(Value::Str(None)),
            (TypeTag::UserDefined, Value::Null | Value::Instance(None)) => Ok(Value::Instance(None)),
            (TypeTag::UserDefined, Value::Instance(Some(instance)))
                if instance.class_name().as_ref() == declared.name.as_ref() =>
            {
                Ok(Value::Instance(Some(instance)))
            }
            _ => Err(RuntimeError::new(
                self.decl.name.name.as_ref(),
                line,
                column,
                format!("Return type '{}' doesn't match with '{}'.", declared.name, value_tag),
            )
            .into()),
        }
    }
}
