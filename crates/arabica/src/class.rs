//! Class descriptors and instances.
//!
//! A class statement builds a [`ClassInfo`]: statics (fields and methods)
//! are populated eagerly, the `__init__` method is remembered as the
//! constructor, and the class value itself is the constructor callable.
//! Instantiation builds an [`Instance`], populating fields from the
//! non-static attribute declarations and binding every non-static method to
//! a closure frame with `this` pre-bound.

use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::{ClassDecl, FunctionDecl, Visibility},
    callable::{ArgumentValue, Callable, UserFunction},
    environment::{Environment, Variable},
    error::{Exec, RuntimeError},
    interpreter::Interpreter,
    io::PrintWriter,
    value::Value,
};

#[derive(Debug)]
pub struct ClassInfo {
    decl: Rc<ClassDecl>,
    constructor: Option<Rc<FunctionDecl>>,
    static_fields: RefCell<IndexMap<Rc<str>, Variable>>,
}

impl ClassInfo {
    /// Builds the class descriptor, eagerly populating static methods and
    /// static fields. Static attribute initializers are evaluated in the
    /// environment the class statement executes in.
    pub(crate) fn new<W: PrintWriter>(interpreter: &mut Interpreter<W>, decl: Rc<ClassDecl>) -> Exec<Rc<Self>> {
        let mut constructor = None;
        let mut static_fields: IndexMap<Rc<str>, Variable> = IndexMap::new();

        for method in &decl.methods {
            if method.name.name.as_ref() == "__init__" {
                constructor = Some(method.clone());
                continue;
            }
            if !method.is_static {
                continue;
            }

            let function = UserFunction {
                decl: method.clone(),
                closure: interpreter.globals(),
            };
            let variable = Variable {
                value: Value::Function(Rc::new(Callable::Function(function))),
                visibility: method.visibility,
                is_static: true,
                is_final: true,
                is_uninitialized: false,
            };
            if static_fields.contains_key(method.name.name.as_ref()) {
                return Err(RuntimeError::new(
                    method.name.name.as_ref(),
                    method.name.line,
                    method.name.column,
                    format!(
                        "In class '{}' the method '{}' is already defined.",
                        decl.name.name, method.name.name
                    ),
                )
                .into());
            }
            static_fields.insert(method.name.name.clone(), variable);
        }

        for attribute in &decl.attributes {
            if !attribute.is_static {
                continue;
            }
            for (name, initializer) in attribute.names.iter().zip(&attribute.initializers) {
                let mut variable = interpreter.validate_variable(attribute, name, initializer.as_ref())?;
                variable.is_uninitialized = false;

                if static_fields.contains_key(name.name.as_ref()) {
                    return Err(RuntimeError::new(
                        name.name.as_ref(),
                        name.line,
                        name.column,
                        format!(
                            "In class '{}' the field '{}' is already defined.",
                            decl.name.name, name.name
                        ),
                    )
                    .into());
                }
                static_fields.insert(name.name.clone(), variable);
            }
        }

        Ok(Rc::new(Self {
            decl,
            constructor,
            static_fields: RefCell::new(static_fields),
        }))
    }

    pub fn name(&self) -> &Rc<str> {
        &self.decl.name.name
    }

    pub fn is_abstract(&self) -> bool {
        self.decl.is_abstract
    }

    /// The declared constructor's parameter count, 0 without a constructor.
    pub fn arity(&self) -> usize {
        self.constructor.as_ref().map_or(0, |constructor| constructor.params.len())
    }

    pub(crate) fn has_static(&self, name: &str) -> bool {
        self.static_fields.borrow().contains_key(name)
    }

    pub(crate) fn get_static(&self, name: &str, line: u32, column: u32) -> Result<Value, RuntimeError> {
        if let Some(variable) = self.static_fields.borrow().get(name) {
            return Ok(variable.value.clone());
        }
        Err(RuntimeError::new(
            name,
            line,
            column,
            format!("Class '{}' doesn't have static field '{}'.", self.name(), name),
        ))
    }

    pub(crate) fn set_static(&self, name: &str, line: u32, column: u32, value: Value) -> Result<(), RuntimeError> {
        if let Some(variable) = self.static_fields.borrow_mut().get_mut(name) {
            variable.value = value;
            return Ok(());
        }
        Err(RuntimeError::new(
            name,
            line,
            column,
            format!("Class '{}' doesn't have static field '{}'.", self.name(), name),
        ))
    }

    /// Calls the class as its constructor.
    pub(crate) fn instantiate<W: PrintWriter>(
        self: &Rc<Self>,
        interpreter: &mut Interpreter<W>,
        line: u32,
        column: u32,
        arguments: &[ArgumentValue],
    ) -> Exec<Value> {
        if self.is_abstract() {
            return Err(RuntimeError::new(
                self.name().as_ref(),
                line,
                column,
                "Abstract class can't be instantiated.",
            )
            .into());
        }
        if arguments.len() != self.arity() {
            return Err(RuntimeError::new(
                self.name().as_ref(),
                line,
                column,
                format!(
                    "Expected {} arguments in the constructor, but received {}.",
                    self.arity(),
                    arguments.len()
                ),
            )
            .into());
        }

        let instance = Instance::new(interpreter, self)?;
        interpreter.register_instance(instance.clone());

        if self.constructor.is_some() {
            let member = instance.get(interpreter, "__init__", line, column)?;
            if let Value::Function(callable) = member {
                callable.call(interpreter, line, column, arguments)?;
            }
        }

        Ok(Value::Instance(Some(instance)))
    }
}

pub struct Instance {
    class: Rc<ClassInfo>,
    fields: RefCell<IndexMap<Rc<str>, Variable>>,
}

// Fields are omitted: bound methods in the field map lead back to this
// instance, and Debug must not follow that cycle.
impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance").field("class", self.class.name()).finish()
    }
}

impl Instance {
    /// Allocates an instance: populates fields from the class's non-static
    /// attribute declarations (initializers are evaluated in the global
    /// environment) and installs every non-static method as a callable bound
    /// to this instance.
    fn new<W: PrintWriter>(interpreter: &mut Interpreter<W>, class: &Rc<ClassInfo>) -> Exec<Rc<Self>> {
        let instance = Rc::new(Self {
            class: class.clone(),
            fields: RefCell::new(IndexMap::new()),
        });

        for attribute in &class.decl.attributes {
            if attribute.is_static {
                continue;
            }
            for (name, initializer) in attribute.names.iter().zip(&attribute.initializers) {
                let mut variable = interpreter.validate_variable_in_globals(attribute, name, initializer.as_ref())?;
                variable.is_uninitialized = false;

                let mut fields = instance.fields.borrow_mut();
                if fields.contains_key(name.name.as_ref()) {
                    return Err(RuntimeError::new(
                        name.name.as_ref(),
                        name.line,
                        name.column,
                        format!(
                            "In class '{}' the field '{}' is already defined.",
                            class.name(),
                            name.name
                        ),
                    )
                    .into());
                }
                fields.insert(name.name.clone(), variable);
            }
        }

        for method in &class.decl.methods {
            if method.is_static {
                continue;
            }

            // a fresh closure frame with `this` pre-bound to the new instance
            let closure = Environment::with_enclosing(interpreter.globals());
            closure.borrow_mut().define_raw(
                Rc::from("this"),
                Variable {
                    value: Value::Instance(Some(instance.clone())),
                    visibility: Visibility::Public,
                    is_static: false,
                    is_final: false,
                    is_uninitialized: false,
                },
            );
            let function = UserFunction {
                decl: method.clone(),
                closure,
            };
            let variable = Variable {
                value: Value::Function(Rc::new(Callable::Function(function))),
                visibility: method.visibility,
                is_static: false,
                is_final: true,
                is_uninitialized: false,
            };

            let mut fields = instance.fields.borrow_mut();
            if fields.contains_key(method.name.name.as_ref()) {
                return Err(RuntimeError::new(
                    method.name.name.as_ref(),
                    method.name.line,
                    method.name.column,
                    format!(
                        "In class '{}' the method '{}' is already defined.",
                        class.name(),
                        method.name.name
                    ),
                )
                .into());
            }
            fields.insert(method.name.name.clone(), variable);
        }

        Ok(instance)
    }

    pub fn class_name(&self) -> &Rc<str> {
        self.class.name()
    }

    /// Drops every field, releasing the bound methods whose closures hold
    /// this instance. Called by the interpreter's registry at shutdown.
    pub(crate) fn release_fields(&self) {
        self.fields.borrow_mut().clear();
    }

    /// Reads a field or bound method, falling through to the class's statics.
    /// Private members are readable only when the executing scope chain holds
    /// a `this` bound to an instance of the same class.
    pub(crate) fn get<W: PrintWriter>(
        &self,
        interpreter: &Interpreter<W>,
        name: &str,
        line: u32,
        column: u32,
    ) -> Result<Value, RuntimeError> {
        if let Some(variable) = self.fields.borrow().get(name) {
            if interpreter.private_access_blocked(self, variable.visibility) {
                return Err(RuntimeError::new(
                    name,
                    line,
                    column,
                    format!("In class '{}' the field '{}' is private.", self.class_name(), name),
                ));
            }
            return Ok(variable.value.clone());
        }
        if self.class.has_static(name) {
            return self.class.get_static(name, line, column);
        }
        Err(RuntimeError::new(
            name,
            line,
            column,
            format!("Class '{}' doesn't have field '{}'.", self.class_name(), name),
        ))
    }

    /// Writes a field, falling through to the class's statics.
    pub(crate) fn set(&self, name: &str, line: u32, column: u32, value: Value) -> Result<(), RuntimeError> {
        if let Some(variable) = self.fields.borrow_mut().get_mut(name) {
            variable.value = value;
            return Ok(());
        }
        if self.class.has_static(name) {
            return self.class.set_static(name, line, column, value);
        }
        Err(RuntimeError::new(
            name,
            line,
            column,
            format!("Class '{}' doesn't have field '{}'.", self.class_name(), name),
        ))
    }
}
