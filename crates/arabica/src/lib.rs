//! Arabica: a tree-walking interpreter for a statically typed, class-based
//! Java-flavored language.
//!
//! Source text is lexed into tokens, parsed into expression/statement trees,
//! then evaluated against a chain of lexically scoped environments with
//! runtime type checking and implicit numeric widening. The library exposes
//! a persistent [`Session`] for embedding (used by the `arabica` CLI for
//! both file and REPL modes) plus the individual pipeline stages.

#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is the language's cast semantics")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts are intentional")]
#![expect(clippy::float_cmp, reason = "numeric comparison operators compare floats exactly")]

mod ast;
mod builtins;
mod callable;
mod class;
mod environment;
mod error;
mod interpreter;
mod io;
mod lexer;
mod parser;
mod repl;
mod token;
mod value;

pub use crate::{
    ast::{
        Argument, ClassDecl, ElseIf, Expr, FunctionDecl, Identifier, OpSpan, Stmt, TypeDecl, VarDecl, Visibility,
    },
    callable::{
        ArgumentValue, Callable, CallableKind, NativeArityFn, NativeCallFn, NativeFunction, NativeReprFn,
        UserFunction,
    },
    class::{ClassInfo, Instance},
    environment::{EnvRef, Environment, Variable},
    error::{Diagnostics, RuntimeError},
    interpreter::Interpreter,
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint},
    lexer::Lexer,
    parser::Parser,
    repl::{Session, SessionError},
    token::{Literal, Token, TokenKind},
    value::{TypeTag, Value},
};
