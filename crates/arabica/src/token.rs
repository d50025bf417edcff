use strum::IntoStaticStr;

use crate::value::TypeTag;

/// Every token kind the scanner can emit.
///
/// The strum `Display` string is what diagnostics fall back to when a token
/// has no lexeme of its own (only `Eof` in practice) and is the operator
/// glyph used by the s-expression printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum TokenKind {
    #[strum(serialize = "(")]
    ParenLeft,
    #[strum(serialize = ")")]
    ParenRight,
    #[strum(serialize = "{")]
    CurlyLeft,
    #[strum(serialize = "}")]
    CurlyRight,
    #[strum(serialize = "[")]
    SquareLeft,
    #[strum(serialize = "]")]
    SquareRight,

    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "=")]
    Equal,

    #[strum(serialize = "++")]
    PlusPlus,
    #[strum(serialize = "--")]
    MinusMinus,

    #[strum(serialize = "%")]
    Percent,

    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = "==")]
    EqualEqual,
    #[strum(serialize = "!=")]
    NotEqual,

    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = "?")]
    Question,

    #[strum(serialize = "~")]
    BitwiseNot,
    #[strum(serialize = "&")]
    BitwiseAnd,
    #[strum(serialize = "^")]
    BitwiseXor,
    #[strum(serialize = "|")]
    BitwiseOr,
    #[strum(serialize = "<<")]
    LeftShift,
    #[strum(serialize = ">>")]
    RightShift,

    #[strum(serialize = "identifier")]
    Identifier,
    #[strum(serialize = "string")]
    StringLit,
    #[strum(serialize = "number")]
    Number,
    #[strum(serialize = "character")]
    CharLit,

    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "!")]
    Not,

    #[strum(serialize = "for")]
    For,
    #[strum(serialize = "while")]
    While,
    #[strum(serialize = "break")]
    Break,
    #[strum(serialize = "continue")]
    Continue,
    #[strum(serialize = "return")]
    Return,

    #[strum(serialize = "if")]
    If,
    #[strum(serialize = "else")]
    Else,

    #[strum(serialize = "true")]
    True,
    #[strum(serialize = "false")]
    False,
    #[strum(serialize = "null")]
    Null,

    #[strum(serialize = "super")]
    Super,
    #[strum(serialize = "this")]
    This,
    #[strum(serialize = "extends")]
    Extends,
    #[strum(serialize = "abstract")]
    Abstract,
    #[strum(serialize = "class")]
    Class,
    #[strum(serialize = "new")]
    New,

    #[strum(serialize = "sout")]
    Sout,
    #[strum(serialize = "soutln")]
    Soutln,

    #[strum(serialize = "final")]
    Final,
    #[strum(serialize = "static")]
    Static,
    #[strum(serialize = "private")]
    Private,
    #[strum(serialize = "protected")]
    Protected,
    #[strum(serialize = "public")]
    Public,

    #[strum(serialize = "void")]
    VoidType,
    #[strum(serialize = "boolean")]
    BooleanType,
    #[strum(serialize = "byte")]
    ByteType,
    #[strum(serialize = "char")]
    CharType,
    #[strum(serialize = "int")]
    IntType,
    #[strum(serialize = "long")]
    LongType,
    #[strum(serialize = "float")]
    FloatType,
    #[strum(serialize = "double")]
    DoubleType,
    #[strum(serialize = "String")]
    StringType,
    #[strum(serialize = "ArrayList")]
    ArrayListType,
    /// An identifier re-tagged by the parser because it names a registered class.
    #[strum(serialize = "type")]
    UserType,

    /// The `__init__` constructor keyword.
    #[strum(serialize = "__init__")]
    Init,

    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = ";")]
    Semicolon,
    #[strum(serialize = "end of file")]
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: &'static str = (*self).into();
        f.write_str(s)
    }
}

impl TokenKind {
    /// Kinds that may open a declaration's type position.
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            Self::VoidType
                | Self::BooleanType
                | Self::ByteType
                | Self::CharType
                | Self::IntType
                | Self::LongType
                | Self::FloatType
                | Self::DoubleType
                | Self::StringType
                | Self::ArrayListType
                | Self::UserType
        )
    }

    /// The primitive type keywords admissible inside a cast `(T)expr`.
    pub fn is_cast_type_keyword(self) -> bool {
        matches!(
            self,
            Self::BooleanType
                | Self::ByteType
                | Self::CharType
                | Self::IntType
                | Self::LongType
                | Self::FloatType
                | Self::DoubleType
        )
    }

    pub fn is_visibility(self) -> bool {
        matches!(self, Self::Public | Self::Private | Self::Protected)
    }

    pub fn is_modifier(self) -> bool {
        matches!(self, Self::Static | Self::Final) || self.is_visibility()
    }

    /// Maps a type keyword to the runtime type tag it declares.
    ///
    /// `ArrayList` deliberately maps to `None`: the keyword is reserved and
    /// lexed, but declaring with it fails the declaration-time validity check.
    pub fn to_type_tag(self) -> TypeTag {
        match self {
            Self::VoidType => TypeTag::Void,
            Self::BooleanType => TypeTag::Boolean,
            Self::ByteType => TypeTag::Byte,
            Self::CharType => TypeTag::Char,
            Self::IntType => TypeTag::Int,
            Self::LongType => TypeTag::Long,
            Self::FloatType => TypeTag::Float,
            Self::DoubleType => TypeTag::Double,
            Self::StringType => TypeTag::String,
            Self::UserType => TypeTag::UserDefined,
            _ => TypeTag::None,
        }
    }
}

/// Literal payload decoded by the scanner.
///
/// String payloads alias the slice between the quotes; escape sequences are
/// validated during scanning but kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'src> {
    Long(i64),
    Float(f32),
    Double(f64),
    Char(u16),
    Str(&'src str),
}

/// A scanned token. The lexeme is a zero-copy view into the source buffer,
/// which must outlive the token stream.
#[derive(Debug, Clone, Copy)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    pub line: u32,
    pub column: u32,
    pub literal: Option<Literal<'src>>,
}

impl Token<'_> {
    /// The text diagnostics should anchor on: the lexeme, or the kind's
    /// display name when the token has no lexeme (the EOF sentinel).
    pub fn describe(&self) -> &str {
        if self.lexeme.is_empty() {
            self.kind.into()
        } else {
            self.lexeme
        }
    }
}
