//! Definition extraction: classes, interfaces, functions and methods.
//!
//! Works on the token stream rather than a full parse. Layout tokens give
//! the nesting, so a `def` inside a class body becomes a method and the
//! outline comes out as a tree.

use lsp_types::{DocumentSymbol, SymbolKind};
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use tracing::warn;

use crate::syntax::{Keyword, SourceText, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Class,
    Interface,
    Function,
    Method,
    Constructor,
}

impl DefinitionKind {
    pub fn symbol_kind(self) -> SymbolKind {
        match self {
            DefinitionKind::Class => SymbolKind::CLASS,
            DefinitionKind::Interface => SymbolKind::INTERFACE,
            DefinitionKind::Function => SymbolKind::FUNCTION,
            DefinitionKind::Method => SymbolKind::METHOD,
            DefinitionKind::Constructor => SymbolKind::CONSTRUCTOR,
        }
    }

    /// Classes and interfaces: things that can appear before a `.`.
    pub fn is_type(self) -> bool {
        matches!(self, DefinitionKind::Class | DefinitionKind::Interface)
    }

    pub fn is_callable(self) -> bool {
        !self.is_type()
    }
}

/// A definition found in a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub name: String,
    pub kind: DefinitionKind,
    /// Index of the enclosing definition in the same list.
    pub container: Option<usize>,
    /// Parameter names, without `self`/`this`.
    pub params: Vec<String>,
    /// Parent class, for `class Dog(Animal)` and `class Dog extends Animal`.
    pub extends: Option<String>,
    /// From the leading keyword to the end of the body.
    pub range: lsp_types::Range,
    /// The name itself.
    pub selection_range: lsp_types::Range,
}

impl Definition {
    /// `name(a, b)`
    pub fn call_label(&self) -> String {
        format!("{}({})", self.name, self.params.join(", "))
    }

    /// Declaration as it would be written, for hover text.
    pub fn signature(&self) -> String {
        match self.kind {
            DefinitionKind::Class => match &self.extends {
                Some(parent) => format!("class {}({parent})", self.name),
                None => format!("class {}", self.name),
            },
            DefinitionKind::Interface => format!("interface {}", self.name),
            _ => format!("def {}", self.call_label()),
        }
    }

    fn detail(&self) -> Option<String> {
        match self.kind {
            DefinitionKind::Class | DefinitionKind::Interface => {
                self.extends.as_ref().map(|p| format!("extends {p}"))
            }
            _ => Some(format!("({})", self.params.join(", "))),
        }
    }
}

/// Definitions in source order. Containers precede their members.
pub fn definitions(source: &SourceText, tokens: &[Token]) -> Vec<Definition> {
    Extractor {
        source,
        tokens,
        defs: Vec::new(),
        open: Vec::new(),
        last_end: 0,
    }
    .run()
}

struct OpenDef {
    index: usize,
    start: usize,
    body_depth: usize,
}

struct Header {
    kind: DefinitionKind,
    name: usize,
    params: Vec<String>,
    extends: Option<String>,
}

struct Extractor<'a> {
    source: &'a SourceText,
    tokens: &'a [Token],
    defs: Vec<Definition>,
    open: Vec<OpenDef>,
    /// End of the last non-layout token seen.
    last_end: usize,
}

impl<'a> Extractor<'a> {
    fn run(mut self) -> Vec<Definition> {
        let mut depth = 0usize;
        let mut stmt_start = true;

        let tokens = self.tokens;
        for (i, tok) in tokens.iter().enumerate() {
            match tok.kind {
                TokenKind::Indent => {
                    depth += 1;
                    stmt_start = true;
                    continue;
                }
                TokenKind::Dedent => {
                    depth = depth.saturating_sub(1);
                    self.close(depth);
                    stmt_start = true;
                    continue;
                }
                TokenKind::Newline => {
                    // A header with no indented body ends with its line.
                    if self.kind_at(i + 1) != Some(TokenKind::Indent) {
                        self.close(depth);
                    }
                    stmt_start = true;
                    continue;
                }
                TokenKind::Eof => break,
                _ => {}
            }

            if stmt_start {
                stmt_start = false;
                let mut j = i;
                while matches!(self.kind_at(j), Some(TokenKind::Keyword(kw)) if kw.is_access_modifier()) {
                    j += 1;
                }
                if let Some(header) = self.header_at(j) {
                    self.close(depth);
                    self.open_definition(header, tok.span.start, depth);
                }
            }

            self.last_end = tok.span.end;
        }

        self.close_all();
        self.defs
    }

    fn kind_at(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|t| t.kind)
    }

    fn text_at(&self, i: usize) -> &'a str {
        self.tokens
            .get(i)
            .map(|t| t.text(self.source.as_str()))
            .unwrap_or("")
    }

    fn header_at(&self, j: usize) -> Option<Header> {
        match self.kind_at(j)? {
            TokenKind::Keyword(Keyword::Class) => {
                let name = j + 1;
                if self.kind_at(name)? != TokenKind::Ident {
                    return None;
                }
                let extends = match (self.kind_at(name + 1), self.kind_at(name + 2)) {
                    (Some(TokenKind::LParen), Some(TokenKind::Ident))
                    | (Some(TokenKind::Keyword(Keyword::Extends)), Some(TokenKind::Ident)) => {
                        Some(self.text_at(name + 2).to_string())
                    }
                    _ => None,
                };
                Some(Header {
                    kind: DefinitionKind::Class,
                    name,
                    params: Vec::new(),
                    extends,
                })
            }
            TokenKind::Keyword(Keyword::Interface) => {
                (self.kind_at(j + 1)? == TokenKind::Ident).then(|| Header {
                    kind: DefinitionKind::Interface,
                    name: j + 1,
                    params: Vec::new(),
                    extends: None,
                })
            }
            TokenKind::Keyword(Keyword::Def) => self.function_header(j + 1),
            // C-style: `int add(a, b)`
            TokenKind::Keyword(kw) if kw.is_type_name() => self.function_header(j + 1),
            _ => None,
        }
    }

    fn function_header(&self, name: usize) -> Option<Header> {
        if self.kind_at(name)? != TokenKind::Ident || self.kind_at(name + 1)? != TokenKind::LParen {
            return None;
        }
        Some(Header {
            kind: DefinitionKind::Function,
            name,
            params: self.params(name + 2),
            extends: None,
        })
    }

    /// Parameter names from the token after `(` up to the matching `)`.
    fn params(&self, from: usize) -> Vec<String> {
        let mut params = Vec::new();
        let mut group: Vec<&Token> = Vec::new();
        let mut nesting = 0usize;

        for tok in self.tokens.get(from..).unwrap_or(&[]) {
            match tok.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => nesting += 1,
                TokenKind::RParen if nesting == 0 => break,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    nesting = nesting.saturating_sub(1)
                }
                TokenKind::Comma if nesting == 0 => {
                    params.extend(self.param_name(&group));
                    group.clear();
                    continue;
                }
                kind if kind.is_layout() => break,
                _ => {}
            }
            group.push(tok);
        }
        params.extend(self.param_name(&group));
        params
    }

    /// `name`, `name: type`, `type name`, `name = default`, `...name`.
    fn param_name(&self, group: &[&Token]) -> Option<String> {
        let src = self.source.as_str();
        let variadic = group.first().is_some_and(|t| t.kind == TokenKind::Dot);
        let rest: Vec<&Token> = group
            .iter()
            .copied()
            .skip_while(|t| t.kind == TokenKind::Dot)
            .collect();
        let first = rest.first()?;

        if first.is_keyword(Keyword::SelfKw) || first.is_keyword(Keyword::This) {
            return None;
        }

        let name = match rest.get(1) {
            Some(second) if second.kind == TokenKind::Ident => second.text(src),
            _ => first.text(src),
        };
        Some(if variadic {
            format!("...{name}")
        } else {
            name.to_string()
        })
    }

    fn open_definition(&mut self, header: Header, start: usize, depth: usize) {
        let container = self.open.last().map(|o| o.index);
        let in_type = container.is_some_and(|c| self.defs[c].kind.is_type());
        let name = self.text_at(header.name).to_string();

        let kind = match header.kind {
            DefinitionKind::Function if in_type && name == "__init__" => DefinitionKind::Constructor,
            DefinitionKind::Function if in_type => DefinitionKind::Method,
            other => other,
        };

        let name_span = self.tokens[header.name].span.clone();
        let selection_range = self.source.range(name_span);
        self.defs.push(Definition {
            name,
            kind,
            container,
            params: header.params,
            extends: header.extends,
            range: selection_range,
            selection_range,
        });
        self.open.push(OpenDef {
            index: self.defs.len() - 1,
            start,
            body_depth: depth + 1,
        });
    }

    /// Close definitions whose body is deeper than `depth`.
    fn close(&mut self, depth: usize) {
        while self.open.last().is_some_and(|o| o.body_depth > depth) {
            self.pop();
        }
    }

    fn close_all(&mut self) {
        while !self.open.is_empty() {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if let Some(open) = self.open.pop() {
            let end = self.last_end.max(open.start);
            self.defs[open.index].range = self.source.range(open.start..end);
        }
    }
}

/// Nest definitions into an outline tree.
#[allow(deprecated)]
pub fn document_symbols(defs: &[Definition]) -> Vec<DocumentSymbol> {
    let mut nodes: Vec<Option<DocumentSymbol>> = defs
        .iter()
        .map(|d| {
            Some(DocumentSymbol {
                name: d.name.clone(),
                detail: d.detail(),
                kind: d.kind.symbol_kind(),
                tags: None,
                deprecated: None,
                range: d.range,
                selection_range: d.selection_range,
                children: None,
            })
        })
        .collect();

    // Children always follow their container, so walking backwards attaches
    // grandchildren before their parent is moved.
    for i in (0..defs.len()).rev() {
        let Some(parent) = defs[i].container else { continue };
        let Some(child) = nodes[i].take() else { continue };
        if let Some(Some(p)) = nodes.get_mut(parent) {
            p.children.get_or_insert_with(Vec::new).insert(0, child);
        }
    }

    nodes.into_iter().flatten().collect()
}

/// Byte spans of `name` in `class name`, `def name` or `interface name`.
///
/// Plain text search with no layout awareness. Used when the index has no
/// answer, e.g. for files that were never indexed.
pub fn scan_definitions(text: &str, name: &str) -> Vec<Range<usize>> {
    let pattern = format!(r"\b(?:class|def|interface)\s+({})\b", regex::escape(name));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(name, error = %e, "definition scan pattern rejected");
            return Vec::new();
        }
    };
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.range())
        .collect()
}
