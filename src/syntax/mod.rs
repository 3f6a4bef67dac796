//! Lexical layer: tokens, the lexer, and source position mapping.

pub mod lexer;
pub mod source;
pub mod token;

pub use lexer::{lex, LexError, LexErrorKind, Lexed};
pub use source::SourceText;
pub use token::{Keyword, Token, TokenKind};
