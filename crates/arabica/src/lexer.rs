//! The hand-written scanner: byte buffer in, token stream out.
//!
//! Scanning is byte-oriented; lexemes are slices into the source buffer.
//! Every error is reported through the diagnostics sink and scanning
//! continues, so a single run surfaces as many errors as reasonable.

use crate::{
    error::Diagnostics,
    token::{Literal, Token, TokenKind},
};

pub struct Lexer<'src, 'd> {
    source: &'src str,
    bytes: &'src [u8],
    tokens: Vec<Token<'src>>,
    start: usize,
    current: usize,
    line: u32,
    column: u32,
    token_line: u32,
    token_column: u32,
    diagnostics: &'d mut Diagnostics,
}

enum NumberKind {
    Long,
    Float,
    Double,
}

fn is_digit(byte: u8) -> bool {
    byte.is_ascii_digit()
}

fn is_alpha(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_alpha_numeric(byte: u8) -> bool {
    is_digit(byte) || is_alpha(byte)
}

/// The fixed keyword table.
fn keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "return" => TokenKind::Return,
        "public" => TokenKind::Public,
        "protected" => TokenKind::Protected,
        "private" => TokenKind::Private,
        "final" => TokenKind::Final,
        "static" => TokenKind::Static,
        "abstract" => TokenKind::Abstract,
        "extends" => TokenKind::Extends,
        "class" => TokenKind::Class,
        "new" => TokenKind::New,
        "sout" => TokenKind::Sout,
        "soutln" => TokenKind::Soutln,
        "super" => TokenKind::Super,
        "this" => TokenKind::This,
        "__init__" => TokenKind::Init,
        "boolean" => TokenKind::BooleanType,
        "byte" => TokenKind::ByteType,
        "char" => TokenKind::CharType,
        "int" => TokenKind::IntType,
        "long" => TokenKind::LongType,
        "float" => TokenKind::FloatType,
        "double" => TokenKind::DoubleType,
        "String" => TokenKind::StringType,
        "ArrayList" => TokenKind::ArrayListType,
        "void" => TokenKind::VoidType,
        _ => return None,
    };
    Some(kind)
}

impl<'src, 'd> Lexer<'src, 'd> {
    pub fn new(source: &'src str, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            token_line: 1,
            token_column: 1,
            diagnostics,
        }
    }

    /// Scans the whole buffer and returns the token stream, terminated by an
    /// EOF sentinel.
    pub fn scan(mut self) -> Vec<Token<'src>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.token_line = self.line;
            self.token_column = self.column;
            self.scan_token();
        }

        self.start = self.current;
        self.token_line = self.line;
        self.token_column = self.column;
        self.add_token(TokenKind::Eof);
        self.tokens
    }

    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            b'(' => self.add_token(TokenKind::ParenLeft),
            b')' => self.add_token(TokenKind::ParenRight),
            b'{' => self.add_token(TokenKind::CurlyLeft),
            b'}' => self.add_token(TokenKind::CurlyRight),
            b'[' => self.add_token(TokenKind::SquareLeft),
            b']' => self.add_token(TokenKind::SquareRight),
            b'&' => {
                let kind = if self.match_byte(b'&') {
                    TokenKind::And
                } else {
                    TokenKind::BitwiseAnd
                };
                self.add_token(kind);
            }
            b'|' => {
                let kind = if self.match_byte(b'|') {
                    TokenKind::Or
                } else {
                    TokenKind::BitwiseOr
                };
                self.add_token(kind);
            }
            b'^' => self.add_token(TokenKind::BitwiseXor),
            b'~' => self.add_token(TokenKind::BitwiseNot),
            b',' => self.add_token(TokenKind::Comma),
            b'.' => {
                if is_digit(self.peek()) {
                    self.error("There must be a number before the dot in the double or float literal.");
                } else {
                    self.add_token(TokenKind::Dot);
                }
            }
            b'-' => {
                let kind = if self.match_byte(b'-') {
                    TokenKind::MinusMinus
                } else {
                    TokenKind::Minus
                };
                self.add_token(kind);
            }
            b'+' => {
                let kind = if self.match_byte(b'+') {
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                };
                self.add_token(kind);
            }
            b'*' => self.add_token(TokenKind::Star),
            b'%' => self.add_token(TokenKind::Percent),
            b';' => self.add_token(TokenKind::Semicolon),
            b':' => self.add_token(TokenKind::Colon),
            b'?' => self.add_token(TokenKind::Question),
            b'=' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            b'!' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::NotEqual
                } else {
                    TokenKind::Not
                };
                self.add_token(kind);
            }
            b'<' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::LessEqual
                } else if self.match_byte(b'<') {
                    TokenKind::LeftShift
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            b'>' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::GreaterEqual
                } else if self.match_byte(b'>') {
                    TokenKind::RightShift
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            b'/' => {
                if self.match_byte(b'/') {
                    // single line comment
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_byte(b'*') {
                    self.scan_block_comment();
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }

            // whitespace
            b' ' | b'\0' | b'\t' | b'\r' | b'\n' => {}

            b'"' => self.scan_string_literal(),
            b'\'' => self.scan_char_literal(),

            _ => {
                if is_digit(c) {
                    self.scan_number_literal();
                } else if is_alpha(c) {
                    self.scan_identifier();
                } else {
                    self.error(format!("Unexpected ascii character '{}' ({}).", c as char, c));
                }
            }
        }
    }

    fn scan_identifier(&mut self) {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }
        let text = &self.source[self.start..self.current];
        self.add_token(keyword(text).unwrap_or(TokenKind::Identifier));
    }

    fn scan_number_literal(&mut self) {
        let mut kind = NumberKind::Long;

        while is_digit(self.peek()) {
            self.advance();
        }

        if self.peek() == b'.' && is_digit(self.peek_next()) {
            kind = NumberKind::Double;
            self.advance();
            while is_digit(self.peek()) {
                self.advance();
            }
            if self.peek() == b'f' {
                kind = NumberKind::Float;
                self.advance();
            }
        } else if self.peek() == b'.' && self.peek_next() == b'f' {
            self.error("There must be a number between the dot and the 'f' in the float literal.");
            self.advance();
            self.advance();
            return;
        } else if self.peek() == b'.' {
            self.error("There must be a number after the dot in the double literal.");
            self.advance();
            return;
        }

        let text = &self.source[self.start..self.current];
        match kind {
            NumberKind::Long => match text.parse::<i64>() {
                Ok(value) => self.add_literal_token(TokenKind::Number, Literal::Long(value)),
                Err(_) => self.error("Number literal doesn't fit in a long."),
            },
            NumberKind::Float => {
                let value = text.trim_end_matches('f').parse::<f32>().unwrap_or(0.0);
                self.add_literal_token(TokenKind::Number, Literal::Float(value));
            }
            NumberKind::Double => {
                let value = text.parse::<f64>().unwrap_or(0.0);
                self.add_literal_token(TokenKind::Number, Literal::Double(value));
            }
        }
    }

    fn scan_string_literal(&mut self) {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
                match self.peek() {
                    b'0'..=b'9' | b't' | b'b' | b'n' | b'r' | b'f' | b'\'' | b'"' | b'\\' => {}
                    other => {
                        self.error(format!("Unrecognized escape sequence \\{}.", other as char));
                    }
                }
            }
            self.advance();
        }

        if self.is_at_end() {
            self.error("Unterminated string.");
            return;
        }

        self.advance(); // closing "

        // The payload aliases the slice between the quotes; escapes stay raw.
        let interior = &self.source[self.start + 1..self.current - 1];
        self.add_literal_token(TokenKind::StringLit, Literal::Str(interior));
    }

    fn scan_char_literal(&mut self) {
        // '' is the zero character
        if self.peek() == b'\'' {
            self.advance();
            self.add_literal_token(TokenKind::CharLit, Literal::Char(0));
            return;
        }

        if self.is_at_end() {
            self.error("Unterminated character literal.");
            return;
        }

        let value: u16;
        if self.peek() == b'\\' {
            self.advance();
            let code = self.advance();
            value = match code {
                b't' => u16::from(b'\t'),
                b'b' => 8,
                b'n' => u16::from(b'\n'),
                b'r' => u16::from(b'\r'),
                b'f' => 12,
                b'\'' => u16::from(b'\''),
                b'"' => u16::from(b'"'),
                b'\\' => u16::from(b'\\'),
                other => {
                    self.error(format!("Unrecognized escape sequence \\{}.", other as char));
                    0
                }
            };
        } else {
            value = u16::from(self.advance());
        }

        if self.is_at_end() {
            self.error("Unterminated character literal.");
            return;
        }
        if self.advance() != b'\'' {
            while !self.is_at_end() && self.peek() != b'\'' {
                self.advance();
            }
            if !self.is_at_end() {
                self.advance();
            }
            self.error("Character literal only supports a single character or escape sequence.");
            return;
        }
        self.add_literal_token(TokenKind::CharLit, Literal::Char(value));
    }

    fn scan_block_comment(&mut self) {
        let mut nested_count: u32 = 1;

        while !self.is_at_end() {
            if self.peek() == b'/' && self.peek_next() == b'*' {
                nested_count += 1;
                self.advance();
            } else if self.peek() == b'*' && self.peek_next() == b'/' {
                nested_count -= 1;
                self.advance();
                if nested_count == 0 {
                    self.advance();
                    return;
                }
            }
            self.advance();
        }

        self.error("Unterminated block comment.");
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = &self.source[self.start..self.current];
        self.tokens.push(Token {
            kind,
            lexeme,
            line: self.token_line,
            column: self.token_column,
            literal: None,
        });
    }

    fn add_literal_token(&mut self, kind: TokenKind, literal: Literal<'src>) {
        let lexeme = &self.source[self.start..self.current];
        self.tokens.push(Token {
            kind,
            lexeme,
            line: self.token_line,
            column: self.token_column,
            literal: Some(literal),
        });
    }

    fn error(&mut self, message: impl std::fmt::Display) {
        self.diagnostics.error_at(self.line, self.column, message);
    }

    fn advance(&mut self) -> u8 {
        let c = self.bytes[self.current];
        self.current += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.bytes[self.current] != expected {
            return false;
        }
        self.advance();
        true
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.bytes[self.current] }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.bytes.len() {
            0
        } else {
            self.bytes[self.current + 1]
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> (Vec<TokenKind>, bool) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Lexer::new(source, &mut diagnostics).scan();
        (tokens.iter().map(|t| t.kind).collect(), diagnostics.had_error())
    }

    #[test]
    fn folds_double_character_operators() {
        let (kinds, had_error) = scan("++ -- <= >= == != << >> && || & |");
        assert!(!had_error);
        assert_eq!(
            kinds,
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::EqualEqual,
                TokenKind::NotEqual,
                TokenKind::LeftShift,
                TokenKind::RightShift,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::BitwiseAnd,
                TokenKind::BitwiseOr,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn nested_block_comments_are_skipped() {
        let (kinds, had_error) = scan("1 /* outer /* inner */ still outer */ 2");
        assert!(!had_error);
        assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn number_literal_kinds() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Lexer::new("42 4.5 4.5f", &mut diagnostics).scan();
        assert!(!diagnostics.had_error());
        assert_eq!(tokens[0].literal, Some(Literal::Long(42)));
        assert_eq!(tokens[1].literal, Some(Literal::Double(4.5)));
        assert_eq!(tokens[2].literal, Some(Literal::Float(4.5)));
    }

    #[test]
    fn dot_without_digits_is_an_error() {
        let (_, had_error) = scan("1.;");
        assert!(had_error);
        let (_, had_error) = scan(".5;");
        assert!(had_error);
        let (_, had_error) = scan("1.f;");
        assert!(had_error);
    }

    #[test]
    fn empty_char_literal_is_the_zero_character() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Lexer::new("''", &mut diagnostics).scan();
        assert!(!diagnostics.had_error());
        assert_eq!(tokens[0].literal, Some(Literal::Char(0)));
    }

    #[test]
    fn char_escapes_decode() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Lexer::new(r"'\n' '\\' '\'' 'a'", &mut diagnostics).scan();
        assert!(!diagnostics.had_error());
        assert_eq!(tokens[0].literal, Some(Literal::Char(u16::from(b'\n'))));
        assert_eq!(tokens[1].literal, Some(Literal::Char(u16::from(b'\\'))));
        assert_eq!(tokens[2].literal, Some(Literal::Char(u16::from(b'\''))));
        assert_eq!(tokens[3].literal, Some(Literal::Char(u16::from(b'a'))));
    }

    #[test]
    fn multi_character_char_literal_resynchronizes() {
        let (kinds, had_error) = scan("'ab' 7");
        assert!(had_error);
        // the scanner must recover past the closing quote and keep going
        assert_eq!(*kinds.last().unwrap(), TokenKind::Eof);
        assert!(kinds.contains(&TokenKind::Number));
    }

    #[test]
    fn string_payload_aliases_the_interior() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Lexer::new("\"hello\\nworld\"", &mut diagnostics).scan();
        assert!(!diagnostics.had_error());
        assert_eq!(tokens[0].literal, Some(Literal::Str("hello\\nworld")));
    }

    #[test]
    fn unsupported_string_escape_reports_but_scan_continues() {
        let (kinds, had_error) = scan("\"bad\\q\" 1");
        assert!(had_error);
        assert!(kinds.contains(&TokenKind::StringLit));
        assert!(kinds.contains(&TokenKind::Number));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let (_, had_error) = scan("\"never closed");
        assert!(had_error);
    }

    #[test]
    fn keywords_and_identifiers() {
        let (kinds, had_error) = scan("class Foo extends sout soutln __init__ new");
        assert!(!had_error);
        assert_eq!(
            kinds,
            vec![
                TokenKind::Class,
                TokenKind::Identifier,
                TokenKind::Extends,
                TokenKind::Sout,
                TokenKind::Soutln,
                TokenKind::Init,
                TokenKind::New,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newline_advances_line_and_resets_column() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Lexer::new("a\n  b", &mut diagnostics).scan();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn unexpected_character_reports_and_continues() {
        let (kinds, had_error) = scan("@ 1");
        assert!(had_error);
        assert!(kinds.contains(&TokenKind::Number));
    }
}
