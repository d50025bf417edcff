//! Expression and statement trees.
//!
//! Both trees are plain tagged enums dispatched by `match`; recursive
//! destruction is ownership. Declaration records (`VarDecl`, `FunctionDecl`,
//! `ClassDecl`) are `Rc`-shared because runtime values outlive the statement
//! that introduced them: a defined function keeps its declaration alive from
//! the global table, a class keeps its attribute and method declarations
//! alive from the class descriptor.

use std::{fmt, rc::Rc};

use strum::Display;

use crate::{
    token::{Token, TokenKind},
    value::{TypeTag, Value},
};

/// Member and variable visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Visibility {
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "local")]
    Local,
    #[strum(serialize = "private")]
    Private,
    #[strum(serialize = "protected")]
    Protected,
    #[strum(serialize = "package")]
    Package,
    #[strum(serialize = "public")]
    Public,
}

impl Visibility {
    pub(crate) fn from_token(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Private => Self::Private,
            TokenKind::Protected => Self::Protected,
            TokenKind::Public => Self::Public,
            _ => Self::None,
        }
    }
}

/// A name with the source position it was written at.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: Rc<str>,
    pub line: u32,
    pub column: u32,
}

impl Identifier {
    pub(crate) fn from_token(token: &Token<'_>) -> Self {
        Self {
            name: Rc::from(token.lexeme),
            line: token.line,
            column: token.column,
        }
    }
}

/// An operator (or other structural token) anchor used for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct OpSpan {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

impl OpSpan {
    pub(crate) fn from_token(token: &Token<'_>) -> Self {
        Self {
            kind: token.kind,
            line: token.line,
            column: token.column,
        }
    }

    pub(crate) fn symbol(self) -> &'static str {
        self.kind.into()
    }
}

/// A declared type: the runtime tag plus the source lexeme (which for a
/// user-defined type is the class name).
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub tag: TypeTag,
    pub name: Rc<str>,
    pub line: u32,
    pub column: u32,
}

impl TypeDecl {
    pub(crate) fn from_token(token: &Token<'_>) -> Self {
        Self {
            tag: token.kind.to_type_tag(),
            name: Rc::from(token.lexeme),
            line: token.line,
            column: token.column,
        }
    }
}

/// One call argument with its source position for per-argument diagnostics.
#[derive(Debug, Clone)]
pub struct Argument {
    pub expr: Expr,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Assign {
        name: Identifier,
        value: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: OpSpan,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: OpSpan,
        arguments: Vec<Argument>,
    },
    Cast {
        target: TypeTag,
        line: u32,
        column: u32,
        right: Box<Expr>,
    },
    Get {
        object: Box<Expr>,
        name: Identifier,
    },
    Grouping(Box<Expr>),
    /// `++x` / `x--`; prefix and postfix are not distinguished semantically.
    Increment {
        name: Identifier,
        is_increment: bool,
    },
    Literal(Value),
    Logical {
        left: Box<Expr>,
        op: OpSpan,
        right: Box<Expr>,
    },
    Set {
        object: Box<Expr>,
        name: Identifier,
        value: Box<Expr>,
    },
    Ternary {
        question: OpSpan,
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    This(Identifier),
    Unary {
        op: OpSpan,
        right: Box<Expr>,
    },
    Variable {
        name: Identifier,
        /// Lookahead hint recorded by the parser: the next token was `(`.
        followed_by_paren: bool,
    },
}

#[derive(Debug, Clone)]
pub struct ElseIf {
    pub token: OpSpan,
    pub condition: Expr,
    pub then_branch: Stmt,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Break,
    Class(Rc<ClassDecl>),
    Continue,
    Expression(Expr),
    Function(Rc<FunctionDecl>),
    If {
        token: OpSpan,
        condition: Expr,
        then_branch: Box<Stmt>,
        else_ifs: Vec<ElseIf>,
        else_branch: Option<Box<Stmt>>,
    },
    Print {
        token: OpSpan,
        expression: Expr,
        newline: bool,
    },
    Return {
        keyword: OpSpan,
        value: Option<Expr>,
    },
    Var(Rc<VarDecl>),
    While {
        token: OpSpan,
        condition: Expr,
        body: Box<Stmt>,
        /// Set when this loop came from `for` desugaring: on `continue` the
        /// block body's last statement (the increment) runs before retesting.
        has_increment: bool,
    },
}

/// A variable declaration: one declared type, parallel lists of names and
/// optional initializers.
#[derive(Debug)]
pub struct VarDecl {
    pub declared: TypeDecl,
    pub names: Vec<Identifier>,
    pub initializers: Vec<Option<Expr>>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub return_type: TypeDecl,
    pub name: Identifier,
    pub visibility: Visibility,
    pub is_static: bool,
    pub params: Vec<(TypeDecl, Identifier)>,
    pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub struct ClassDecl {
    pub name: Identifier,
    pub is_abstract: bool,
    pub attributes: Vec<Rc<VarDecl>>,
    pub methods: Vec<Rc<FunctionDecl>>,
}

/// Renders expressions as s-expressions, e.g. `(+ 1 (* 2 3))`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign { name, value } => write!(f, "(= {} {value})", name.name),
            Self::Binary { left, op, right } => write!(f, "({} {left} {right})", op.symbol()),
            Self::Call { callee, arguments, .. } => {
                write!(f, "(call {callee}")?;
                for argument in arguments {
                    write!(f, " {}", argument.expr)?;
                }
                write!(f, ")")
            }
            Self::Cast { target, right, .. } => write!(f, "(cast {target} {right})"),
            Self::Get { object, name } => write!(f, "(get {object} {})", name.name),
            Self::Grouping(inner) => write!(f, "(group {inner})"),
            Self::Increment { name, is_increment } => {
                write!(f, "({} {})", if *is_increment { "++" } else { "--" }, name.name)
            }
            Self::Literal(value) => value.print_fmt(f),
            Self::Logical { left, op, right } => write!(f, "({} {left} {right})", op.symbol()),
            Self::Set { object, name, value } => write!(f, "(set {object} {} {value})", name.name),
            Self::Ternary {
                condition, then, otherwise, ..
            } => write!(f, "(? {condition} {then} {otherwise})"),
            Self::This(_) => write!(f, "this"),
            Self::Unary { op, right } => write!(f, "({} {right})", op.symbol()),
            Self::Variable { name, .. } => write!(f, "{}", name.name),
        }
    }
}
