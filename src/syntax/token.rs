//! Token definitions for Omni source.

use std::fmt;
use std::ops::Range;

/// Reserved words recognized by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    For,
    Var,
    Import,
    Try,
    Catch,
    Finally,
    Throw,
    Break,
    Continue,
    In,
    As,
    Class,
    Interface,
    Extends,
    Implements,
    New,
    Public,
    Private,
    Protected,
    Static,
    SelfKw,
    This,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Char,
    Void,
    String,
}

/// Spelling ↔ keyword table. `true`, `false` and `null` are plain identifiers.
pub static KEYWORDS: &[(&str, Keyword)] = &[
    ("def", Keyword::Def),
    ("return", Keyword::Return),
    ("if", Keyword::If),
    ("elif", Keyword::Elif),
    ("else", Keyword::Else),
    ("while", Keyword::While),
    ("for", Keyword::For),
    ("var", Keyword::Var),
    ("import", Keyword::Import),
    ("try", Keyword::Try),
    ("catch", Keyword::Catch),
    ("finally", Keyword::Finally),
    ("throw", Keyword::Throw),
    ("break", Keyword::Break),
    ("continue", Keyword::Continue),
    ("in", Keyword::In),
    ("as", Keyword::As),
    ("class", Keyword::Class),
    ("interface", Keyword::Interface),
    ("extends", Keyword::Extends),
    ("implements", Keyword::Implements),
    ("new", Keyword::New),
    ("public", Keyword::Public),
    ("private", Keyword::Private),
    ("protected", Keyword::Protected),
    ("static", Keyword::Static),
    ("self", Keyword::SelfKw),
    ("this", Keyword::This),
    ("int", Keyword::Int),
    ("long", Keyword::Long),
    ("float", Keyword::Float),
    ("double", Keyword::Double),
    ("bool", Keyword::Bool),
    ("char", Keyword::Char),
    ("void", Keyword::Void),
    ("String", Keyword::String),
];

impl Keyword {
    pub fn from_ident(text: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(spelling, _)| *spelling == text)
            .map(|(_, kw)| *kw)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map(|(spelling, _)| *spelling)
            .unwrap_or("")
    }

    /// Keywords that name a type and can lead a C-style declaration
    /// (`int add(a, b)`, `String name`).
    pub fn is_type_name(self) -> bool {
        matches!(
            self,
            Keyword::Int
                | Keyword::Long
                | Keyword::Float
                | Keyword::Double
                | Keyword::Bool
                | Keyword::Char
                | Keyword::Void
                | Keyword::String
        )
    }

    pub fn is_access_modifier(self) -> bool {
        matches!(
            self,
            Keyword::Public | Keyword::Private | Keyword::Protected | Keyword::Static
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Keyword(Keyword),
    Number,
    Str,
    FStr,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,
    /// Arithmetic, comparison, logical and assignment operators.
    Operator,
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Layout tokens carry no source text of their own.
    pub fn is_layout(self) -> bool {
        matches!(
            self,
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent | TokenKind::Eof
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Ident => "IDENT",
            TokenKind::Keyword(_) => "KEYWORD",
            TokenKind::Number => "NUMBER",
            TokenKind::Str => "STRING",
            TokenKind::FStr => "FSTRING",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBracket => "LBRACKET",
            TokenKind::RBracket => "RBRACKET",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::Comma => "COMMA",
            TokenKind::Colon => "COLON",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Dot => "DOT",
            TokenKind::Arrow => "ARROW",
            TokenKind::Operator => "OP",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Indent => "INDENT",
            TokenKind::Dedent => "DEDENT",
            TokenKind::Eof => "EOF",
        }
    }
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.span.clone()).unwrap_or("")
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_round_trips_spelling() {
        assert_eq!(Keyword::from_ident("interface"), Some(Keyword::Interface));
        assert_eq!(Keyword::Interface.as_str(), "interface");
        assert_eq!(Keyword::from_ident("self"), Some(Keyword::SelfKw));
    }

    #[test]
    fn literals_are_not_keywords() {
        assert_eq!(Keyword::from_ident("true"), None);
        assert_eq!(Keyword::from_ident("null"), None);
        assert_eq!(Keyword::from_ident("string"), None);
    }

    #[test]
    fn type_names() {
        assert!(Keyword::String.is_type_name());
        assert!(Keyword::Void.is_type_name());
        assert!(!Keyword::Def.is_type_name());
    }
}
