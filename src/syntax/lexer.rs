//! Omni lexer.
//!
//! Produces a flat token stream with Python-style layout tokens
//! (`Newline`, `Indent`, `Dedent`). Lexing never fails: problems are
//! collected as [`LexError`]s next to the tokens so the editor can keep
//! working on broken input.

use std::ops::Range;

use thiserror::Error;

use super::token::{Keyword, Token, TokenKind};

/// Columns a tab advances the indentation width by.
const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated block comment")]
    UnterminatedComment,

    #[error("unindent does not match any outer indentation level")]
    InconsistentDedent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Range<usize>,
}

/// Output of [`lex`].
#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// Tokenize Omni source.
pub fn lex(source: &str) -> Lexed {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    indent_stack: Vec<usize>,
    /// Open `(`, `[` and `{` count. Layout is suspended while non-zero.
    nesting: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            indent_stack: vec![0],
            nesting: 0,
            at_line_start: true,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Lexed {
        loop {
            if self.at_line_start {
                self.at_line_start = false;
                if self.nesting == 0 {
                    self.indentation();
                }
            }

            let Some(c) = self.peek_char() else { break };
            let start = self.pos;

            match c {
                '\n' => {
                    self.pos += 1;
                    if self.nesting == 0 {
                        self.newline(start);
                    }
                    self.at_line_start = true;
                }
                '#' => self.skip_line_comment(),
                '/' if self.peek_byte(1) == Some(b'/') => self.skip_line_comment(),
                '/' if self.peek_byte(1) == Some(b'*') => self.block_comment(),
                'f' if matches!(self.peek_byte(1), Some(b'"') | Some(b'\'')) => {
                    self.pos += 1;
                    self.string(start, TokenKind::FStr);
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
                c if c.is_ascii_digit() => self.number(),
                '"' | '\'' => self.string(start, TokenKind::Str),
                c if c.is_whitespace() => self.pos += c.len_utf8(),
                _ => self.punctuation(c),
            }
        }

        self.finish()
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, span: Range<usize>) {
        self.tokens.push(Token::new(kind, span));
    }

    fn error(&mut self, kind: LexErrorKind, span: Range<usize>) {
        self.errors.push(LexError { kind, span });
    }

    /// Emit a `Newline` unless the previous token already ended a line.
    fn newline(&mut self, at: usize) {
        let ends_line = match self.tokens.last() {
            None => true,
            Some(t) => t.kind.is_layout(),
        };
        if !ends_line {
            self.push(TokenKind::Newline, at..at + 1);
        }
    }

    fn indentation(&mut self) {
        let line_start = self.pos;
        let mut width = 0;
        while let Some(b) = self.peek_byte(0) {
            match b {
                b' ' => width += 1,
                b'\t' => width += TAB_WIDTH,
                _ => break,
            }
            self.pos += 1;
        }

        // Blank and comment-only lines don't affect layout.
        match self.peek_byte(0) {
            None | Some(b'\n') | Some(b'\r') | Some(b'#') => return,
            Some(b'/') if self.peek_byte(1) == Some(b'/') => return,
            Some(b'/') if self.peek_byte(1) == Some(b'*') && self.block_comment_fills_line() => {
                return
            }
            _ => {}
        }

        let here = self.pos..self.pos;
        let top = self.current_indent();
        if width > top {
            self.indent_stack.push(width);
            self.push(TokenKind::Indent, here);
        } else if width < top {
            while width < self.current_indent() {
                self.indent_stack.pop();
                self.push(TokenKind::Dedent, here.clone());
            }
            if width != self.current_indent() {
                self.error(LexErrorKind::InconsistentDedent, line_start..self.pos);
                self.indent_stack.push(width);
                self.push(TokenKind::Indent, here);
            }
        }
    }

    /// Whether the `/* ... */` at `pos` closes on this line with only
    /// whitespace or a line comment after it.
    fn block_comment_fills_line(&self) -> bool {
        let rest = &self.src[self.pos + 2..];
        let line = rest.split('\n').next().unwrap_or(rest);
        match line.find("*/") {
            Some(end) => {
                let tail = line[end + 2..].trim_start();
                tail.is_empty() || tail.starts_with('#') || tail.starts_with("//")
            }
            None => false,
        }
    }

    fn current_indent(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek_byte(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn block_comment(&mut self) {
        let start = self.pos;
        self.pos += 2;
        match self.src[self.pos..].find("*/") {
            Some(rel) => self.pos += rel + 2,
            None => {
                self.pos = self.src.len();
                self.error(LexErrorKind::UnterminatedComment, start..self.pos);
            }
        }
    }

    fn identifier(&mut self) {
        let start = self.pos;
        while let Some(b) = self.peek_byte(0) {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let kind = match Keyword::from_ident(&self.src[start..self.pos]) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident,
        };
        self.push(kind, start..self.pos);
    }

    fn number(&mut self) {
        let start = self.pos;
        self.eat_digits();
        if self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            self.eat_digits();
        }
        if matches!(self.peek_byte(0), Some(b'f') | Some(b'F')) {
            self.pos += 1;
        }
        self.push(TokenKind::Number, start..self.pos);
    }

    fn eat_digits(&mut self) {
        while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    /// Lex a quoted literal. `start` is where the token begins (the `f` of
    /// an f-string); `self.pos` sits on the opening quote.
    fn string(&mut self, start: usize, kind: TokenKind) {
        let Some(quote) = self.peek_char() else { return };
        self.pos += 1;
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    self.error(LexErrorKind::UnterminatedString, start..self.pos);
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    if let Some(escaped) = self.peek_char() {
                        if escaped != '\n' {
                            self.pos += escaped.len_utf8();
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some(c) => self.pos += c.len_utf8(),
            }
        }
        self.push(kind, start..self.pos);
    }

    fn punctuation(&mut self, c: char) {
        let start = self.pos;
        let next = self.peek_byte(1);
        let (kind, len) = match c {
            '(' => (TokenKind::LParen, 1),
            ')' => (TokenKind::RParen, 1),
            '[' => (TokenKind::LBracket, 1),
            ']' => (TokenKind::RBracket, 1),
            '{' => (TokenKind::LBrace, 1),
            '}' => (TokenKind::RBrace, 1),
            ',' => (TokenKind::Comma, 1),
            ':' => (TokenKind::Colon, 1),
            ';' => (TokenKind::Semicolon, 1),
            '.' => (TokenKind::Dot, 1),
            '-' if next == Some(b'>') => (TokenKind::Arrow, 2),
            '+' if matches!(next, Some(b'+') | Some(b'=')) => (TokenKind::Operator, 2),
            '-' if matches!(next, Some(b'-') | Some(b'=')) => (TokenKind::Operator, 2),
            '=' | '!' | '<' | '>' if next == Some(b'=') => (TokenKind::Operator, 2),
            '&' if next == Some(b'&') => (TokenKind::Operator, 2),
            '|' if next == Some(b'|') => (TokenKind::Operator, 2),
            '+' | '-' | '*' | '/' | '%' | '=' | '!' | '<' | '>' | '&' | '|' => {
                (TokenKind::Operator, 1)
            }
            other => {
                self.pos += other.len_utf8();
                self.error(LexErrorKind::UnexpectedChar(other), start..self.pos);
                return;
            }
        };

        match kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => self.nesting += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                self.nesting = self.nesting.saturating_sub(1)
            }
            _ => {}
        }

        self.pos += len;
        self.push(kind, start..self.pos);
    }

    fn finish(mut self) -> Lexed {
        let end = self.src.len();
        if self.tokens.last().is_some_and(|t| !t.kind.is_layout()) {
            self.push(TokenKind::Newline, end..end);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokenKind::Dedent, end..end);
        }
        self.push(TokenKind::Eof, end..end);

        Lexed {
            tokens: self.tokens,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).tokens.into_iter().map(|t| t.kind).collect()
    }

    fn texts(src: &str) -> Vec<String> {
        lex(src)
            .tokens
            .iter()
            .filter(|t| !t.kind.is_layout())
            .map(|t| t.text(src).to_string())
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("def add"),
            vec![
                TokenKind::Keyword(Keyword::Def),
                TokenKind::Ident,
                TokenKind::Newline,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn indentation_blocks() {
        let src = "class A:\n    def f(self):\n        return 1\nx = 2\n";
        let k = kinds(src);
        assert_eq!(k.iter().filter(|k| **k == TokenKind::Indent).count(), 2);
        assert_eq!(k.iter().filter(|k| **k == TokenKind::Dedent).count(), 2);
        assert_eq!(k.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn tabs_count_as_four_spaces() {
        let src = "def f():\n\tx = 1\n    y = 2\n";
        let lexed = lex(src);
        assert!(lexed.errors.is_empty());
        let indents = lexed.tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
        assert_eq!(indents, 1);
    }

    #[test]
    fn blank_and_comment_lines_keep_layout() {
        let src = "def f():\n    x = 1\n\n# note\n    y = 2\n";
        let k = kinds(src);
        assert_eq!(k.iter().filter(|k| **k == TokenKind::Indent).count(), 1);
        assert_eq!(k.iter().filter(|k| **k == TokenKind::Dedent).count(), 1);
    }

    #[test]
    fn block_comment_line_keeps_layout() {
        let src = "def f():\n    x = 1\n/* note */\n    y = 2\n";
        let lexed = lex(src);
        assert!(lexed.errors.is_empty());
        let k: Vec<_> = lexed.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(k.iter().filter(|k| **k == TokenKind::Indent).count(), 1);
        assert_eq!(k.iter().filter(|k| **k == TokenKind::Dedent).count(), 1);
        let y = lexed.tokens.iter().position(|t| t.text(src) == "y").unwrap();
        assert_eq!(k[y - 1], TokenKind::Newline);

        let source = crate::syntax::SourceText::new(src);
        let defs = crate::outline::definitions(&source, &lexed.tokens);
        let f = defs.iter().find(|d| d.name == "f").unwrap();
        assert!(f.range.end.line >= 3);
    }

    #[test]
    fn block_comment_followed_by_code_counts() {
        let src = "def f():\n    x = 1\n/* note */ y = 2\n";
        let k = kinds(src);
        assert_eq!(k.iter().filter(|k| **k == TokenKind::Dedent).count(), 1);
        let y = lex(src).tokens.iter().position(|t| t.text(src) == "y").unwrap();
        assert_eq!(k[y - 1], TokenKind::Dedent);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(texts("a // one\nb # two\n/* three\n */ c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn strings_and_fstrings() {
        let src = r#"print("a\"b", f"hi {name}", 'c')"#;
        let lexed = lex(src);
        assert!(lexed.errors.is_empty());
        let kinds: Vec<_> = lexed.tokens.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::FStr));
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Str).count(), 2);
        assert_eq!(texts(src)[2], r#""a\"b""#);
    }

    #[test]
    fn numbers_with_fraction_and_suffix() {
        assert_eq!(texts("1 3.14 2.5f 7.x"), vec!["1", "3.14", "2.5f", "7", ".", "x"]);
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            texts("a += 1 -> b != c && d || e++"),
            vec!["a", "+=", "1", "->", "b", "!=", "c", "&&", "d", "||", "e", "++"]
        );
    }

    #[test]
    fn brackets_suspend_layout() {
        let src = "x = foo(1,\n        2)\ny = 3\n";
        let lexed = lex(src);
        assert!(lexed.errors.is_empty());
        assert!(!lexed.tokens.iter().any(|t| t.kind == TokenKind::Indent));
        let newlines = lexed.tokens.iter().filter(|t| t.kind == TokenKind::Newline).count();
        assert_eq!(newlines, 2);
    }

    #[test]
    fn unexpected_character_is_reported() {
        let lexed = lex("x = 1 @ 2");
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].kind, LexErrorKind::UnexpectedChar('@'));
        assert_eq!(lexed.errors[0].span, 6..7);
    }

    #[test]
    fn unterminated_string_stops_at_line_end() {
        let lexed = lex("s = \"abc\nt = 1\n");
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].kind, LexErrorKind::UnterminatedString);
        assert_eq!(lexed.errors[0].span, 4..8);
        assert!(lexed.tokens.iter().any(|t| t.text("s = \"abc\nt = 1\n") == "t"));
    }

    #[test]
    fn unterminated_block_comment() {
        let lexed = lex("a /* never closed");
        assert_eq!(lexed.errors[0].kind, LexErrorKind::UnterminatedComment);
    }

    #[test]
    fn inconsistent_dedent() {
        let src = "def f():\n        x = 1\n    y = 2\n";
        let lexed = lex(src);
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].kind, LexErrorKind::InconsistentDedent);
        let indents = lexed.tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let dedents = lexed.tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        assert_eq!(indents, dedents);
    }

    #[test]
    fn non_ascii_inside_strings_is_fine() {
        let lexed = lex("s = \"héllo ✓\"");
        assert!(lexed.errors.is_empty());
    }
}
