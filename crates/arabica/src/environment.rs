//! Chained name→slot environments.
//!
//! Frames are shared through `Rc<RefCell<_>>`: blocks and calls push fresh
//! children, closures keep their captured frame alive, and a frame is
//! released when its last holder drops. Lookup walks the parent chain; the
//! first enclosing frame containing the name decides the result. Definition
//! only ever touches the innermost frame.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;

use crate::{
    ast::Visibility,
    callable::{Callable, NativeArityFn, NativeCallFn, NativeFunction, NativeReprFn},
    error::RuntimeError,
    value::{TypeTag, Value},
};

/// A variable slot.
#[derive(Debug, Clone)]
pub struct Variable {
    pub value: Value,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_uninitialized: bool,
}

impl Variable {
    /// A plain local: the slot shape parameters are bound with.
    pub(crate) fn local(value: Value) -> Self {
        Self {
            value,
            visibility: Visibility::Local,
            is_static: false,
            is_final: false,
            is_uninitialized: false,
        }
    }
}

pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: AHashMap<Rc<str>, Variable>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_enclosing(enclosing: EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            values: AHashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    /// Defines a slot in this frame. Fails on a duplicate name in the same
    /// frame or a void payload; shadowing requires a nested frame.
    pub fn define(&mut self, name: &str, line: u32, column: u32, variable: Variable) -> Result<(), RuntimeError> {
        if variable.value.tag() == TypeTag::Void {
            return Err(RuntimeError::new(
                name,
                line,
                column,
                format!("Can't define '{name}' as void."),
            ));
        }
        if self.values.contains_key(name) {
            return Err(RuntimeError::new(
                name,
                line,
                column,
                format!("Variable '{name}' is already defined in this scope."),
            ));
        }
        self.values.insert(Rc::from(name), variable);
        Ok(())
    }

    /// Inserts without the definition checks. Used for parameter binding and
    /// the `this` slot of bound methods, which overwrite freely.
    pub(crate) fn define_raw(&mut self, name: Rc<str>, variable: Variable) {
        self.values.insert(name, variable);
    }

    /// Installs a built-in callable as a public, static, final, initialized
    /// slot in this frame.
    pub fn define_native(&mut self, name: &'static str, arity: NativeArityFn, call: NativeCallFn, repr: NativeReprFn) {
        let native = NativeFunction::new(name, arity, call, repr);
        self.values.insert(
            Rc::from(name),
            Variable {
                value: Value::Function(Rc::new(Callable::Native(native))),
                visibility: Visibility::Public,
                is_static: true,
                is_final: true,
                is_uninitialized: false,
            },
        );
    }

    /// Assigns to the first frame of the chain containing `name`, coercing
    /// the value to the slot's declared type.
    pub fn assign(env: &EnvRef, name: &str, line: u32, column: u32, value: Value) -> Result<(), RuntimeError> {
        if value.tag() == TypeTag::Void {
            return Err(RuntimeError::new(
                name,
                line,
                column,
                format!("Can't assign void to '{name}'."),
            ));
        }

        let mut frame = env.clone();
        loop {
            let enclosing = {
                let mut borrowed = frame.borrow_mut();
                if let Some(variable) = borrowed.values.get_mut(name) {
                    if variable.is_final {
                        return Err(RuntimeError::new(
                            name,
                            line,
                            column,
                            format!("Variable '{name}' is final."),
                        ));
                    }

                    let slot_tag = variable.value.tag();
                    let value_tag = value.tag();
                    if slot_tag == value_tag {
                        variable.value = value;
                    } else if value_tag != TypeTag::Null {
                        if slot_tag.is_number() && value_tag.is_number() {
                            variable.value = value.convert_numeric(slot_tag);
                        } else {
                            return Err(RuntimeError::new(
                                name,
                                line,
                                column,
                                format!("Can't implicitly cast '{value_tag}' to '{slot_tag}'."),
                            ));
                        }
                    } else {
                        match slot_tag {
                            TypeTag::String => variable.value = Value::Str(None),
                            TypeTag::Instance => variable.value = Value::Instance(None),
                            _ => {
                                return Err(RuntimeError::new(name, line, column, "Only objects can be null."));
                            }
                        }
                    }
                    variable.is_uninitialized = false;
                    return Ok(());
                }
                borrowed.enclosing.clone()
            };

            match enclosing {
                Some(parent) => frame = parent,
                None => {
                    return Err(RuntimeError::new(
                        name,
                        line,
                        column,
                        format!("Undefined variable '{name}'."),
                    ));
                }
            }
        }
    }

    /// Reads the first slot named `name` along the chain.
    pub fn get(env: &EnvRef, name: &str, line: u32, column: u32) -> Result<Value, RuntimeError> {
        let mut frame = env.clone();
        loop {
            let enclosing = {
                let borrowed = frame.borrow();
                if let Some(variable) = borrowed.values.get(name) {
                    if variable.is_uninitialized {
                        return Err(RuntimeError::new(name, line, column, "Variable is uninitialized."));
                    }
                    return Ok(variable.value.clone());
                }
                borrowed.enclosing.clone()
            };

            match enclosing {
                Some(parent) => frame = parent,
                None => {
                    return Err(RuntimeError::new(
                        name,
                        line,
                        column,
                        format!("Undefined variable '{name}'."),
                    ));
                }
            }
        }
    }

    /// Walks the chain for a `this` binding, used by the private-member
    /// access check.
    pub(crate) fn lookup_this(env: &EnvRef) -> Option<Value> {
        let mut frame = env.clone();
        loop {
            let enclosing = {
                let borrowed = frame.borrow();
                if let Some(variable) = borrowed.values.get("this") {
                    return Some(variable.value.clone());
                }
                borrowed.enclosing.clone()
            };
            frame = enclosing?;
        }
    }
}
