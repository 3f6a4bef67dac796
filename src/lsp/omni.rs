//! Language service for Omni source files.
//!
//! Completion, hover and signature help come from the static catalog plus
//! whatever the document (and optionally the workspace index) defines.
//! All entry points re-lex the content they are given; documents are small
//! and the lexer is linear.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lsp_types::{
    CompletionItem, CompletionItemKind, Diagnostic, DiagnosticSeverity, DocumentSymbol,
    Documentation, MarkupContent, MarkupKind, ParameterInformation, ParameterLabel, Position,
    Range, SignatureHelp, SignatureInformation,
};

use super::{HoverInfo, LanguageService};
use crate::catalog::{self, MemberKind};
use crate::index::{SymbolLocation, WorkspaceIndex};
use crate::outline::{self, Definition, DefinitionKind};
use crate::syntax::{lex, LexError, SourceText};

const DIAGNOSTIC_SOURCE: &str = "omnils";

/// What the cursor is completing.
#[derive(Debug, PartialEq)]
pub enum CompletionContext<'a> {
    /// After `receiver.`, with a possibly empty partial member name.
    Member { receiver: &'a str, prefix: &'a str },
    /// Anywhere else code is expected.
    TopLevel { prefix: &'a str },
    /// Inside a string or comment, or after a `.` with no usable receiver.
    Suppressed,
}

/// The call enclosing the cursor.
#[derive(Debug, PartialEq)]
pub struct CallSite<'a> {
    pub receiver: Option<&'a str>,
    pub name: &'a str,
    /// Number of top-level commas between `(` and the cursor.
    pub active_arg: u32,
}

/// Where a go-to-definition request leads.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionTarget {
    /// `None` for the document the request came from.
    pub path: Option<PathBuf>,
    pub range: Range,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn trailing_ident(s: &str) -> &str {
    let start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[start..]
}

/// Whether the end of `line_prefix` is inside a string literal or comment.
fn in_string_or_comment(line_prefix: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut in_block = false;
    let mut chars = line_prefix.chars().peekable();
    while let Some(c) = chars.next() {
        if in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block = false;
            }
            continue;
        }
        match quote {
            Some(q) => {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '#' => return true,
                '/' if chars.peek() == Some(&'/') => return true,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    in_block = true;
                }
                _ => {}
            },
        }
    }
    in_block || quote.is_some()
}

/// Classify the text between the start of the line and the cursor.
pub fn completion_context(line_prefix: &str) -> CompletionContext<'_> {
    if in_string_or_comment(line_prefix) {
        return CompletionContext::Suppressed;
    }
    let prefix = trailing_ident(line_prefix);
    let before = &line_prefix[..line_prefix.len() - prefix.len()];
    match before.strip_suffix('.') {
        Some(head) => {
            let receiver = trailing_ident(head);
            if receiver.is_empty() || receiver.starts_with(|c: char| c.is_ascii_digit()) {
                CompletionContext::Suppressed
            } else {
                CompletionContext::Member { receiver, prefix }
            }
        }
        None => CompletionContext::TopLevel { prefix },
    }
}

/// Find the innermost unclosed call on the line before the cursor.
pub fn call_site(line_prefix: &str) -> Option<CallSite<'_>> {
    enum Frame {
        Call { open: usize, commas: u32 },
        Group,
    }

    let mut frames = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut in_block = false;
    let mut skip = false;

    for (i, c) in line_prefix.char_indices() {
        if skip {
            skip = false;
            continue;
        }
        if in_block {
            if c == '*' && line_prefix[i + 1..].starts_with('/') {
                in_block = false;
                skip = true;
            }
            continue;
        }
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '#' => return None,
            '/' if line_prefix[i + 1..].starts_with('/') => return None,
            '/' if line_prefix[i + 1..].starts_with('*') => {
                in_block = true;
                skip = true;
            }
            '(' => frames.push(Frame::Call { open: i, commas: 0 }),
            '[' | '{' => frames.push(Frame::Group),
            ')' | ']' | '}' => {
                frames.pop();
            }
            ',' => {
                if let Some(Frame::Call { commas, .. }) = frames.last_mut() {
                    *commas += 1;
                }
            }
            _ => {}
        }
    }

    if in_block {
        return None;
    }
    let (open, commas) = frames.iter().rev().find_map(|f| match f {
        Frame::Call { open, commas } => Some((*open, *commas)),
        Frame::Group => None,
    })?;

    let head = line_prefix[..open].trim_end();
    let name = trailing_ident(head);
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let rest = &head[..head.len() - name.len()];
    let receiver = rest
        .strip_suffix('.')
        .map(trailing_ident)
        .filter(|r| !r.is_empty());

    Some(CallSite {
        receiver,
        name,
        active_arg: commas,
    })
}

fn markdown(value: String) -> Documentation {
    Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    })
}

fn matches_prefix(label: &str, prefix: &str) -> bool {
    label
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn render_definition(def: &Definition, path: Option<&Path>) -> String {
    let mut text = format!("```omni\n{}\n```", def.signature());
    if let Some(path) = path {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        text.push_str(&format!("\n\nDefined in `{name}`"));
    }
    text
}

fn definition_item_kind(kind: DefinitionKind) -> CompletionItemKind {
    match kind {
        DefinitionKind::Class => CompletionItemKind::CLASS,
        DefinitionKind::Interface => CompletionItemKind::INTERFACE,
        DefinitionKind::Function => CompletionItemKind::FUNCTION,
        DefinitionKind::Method => CompletionItemKind::METHOD,
        DefinitionKind::Constructor => CompletionItemKind::CONSTRUCTOR,
    }
}

/// Lexed document plus the definitions found in it.
struct Analysis {
    source: SourceText,
    lex_errors: Vec<LexError>,
    defs: Vec<Definition>,
}

impl Analysis {
    fn new(content: &str) -> Self {
        let source = SourceText::new(content);
        let lexed = lex(content);
        let defs = outline::definitions(&source, &lexed.tokens);
        Self {
            source,
            lex_errors: lexed.errors,
            defs,
        }
    }
}

/// Language service for Omni files.
#[derive(Debug, Default, Clone, Copy)]
pub struct OmniService<'a> {
    index: Option<&'a WorkspaceIndex>,
    /// Path of the document being served. Its index entries are ignored in
    /// favor of the content passed to each call.
    current: Option<&'a Path>,
}

impl<'a> OmniService<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: &'a WorkspaceIndex) -> Self {
        Self {
            index: Some(index),
            current: None,
        }
    }

    pub fn for_file(mut self, path: &'a Path) -> Self {
        self.current = Some(path);
        self
    }

    fn workspace_lookup(&self, name: &str) -> Vec<SymbolLocation<'a>> {
        let Some(index) = self.index else {
            return Vec::new();
        };
        index
            .lookup(name)
            .into_iter()
            .filter(|loc| Some(loc.path) != self.current)
            .collect()
    }

    /// Members of user classes named `type_name`, document first.
    fn user_members<'b>(&'b self, analysis: &'b Analysis, type_name: &str) -> Vec<&'b Definition> {
        let mut members = Vec::new();
        for (i, def) in analysis.defs.iter().enumerate() {
            if def.name == type_name && def.kind.is_type() {
                members.extend(analysis.defs.iter().filter(|m| m.container == Some(i)));
            }
        }
        if let Some(index) = self.index {
            members.extend(
                index
                    .members_of(type_name)
                    .into_iter()
                    .filter(|loc| Some(loc.path) != self.current)
                    .map(|loc| loc.definition),
            );
        }
        members
    }

    fn member_completions(&self, analysis: &Analysis, receiver: &str, prefix: &str) -> Vec<CompletionItem> {
        if let Some(class) = catalog::class(receiver) {
            return class
                .members
                .iter()
                .filter(|m| matches_prefix(m.name, prefix))
                .map(|m| CompletionItem {
                    label: m.name.to_string(),
                    kind: Some(match m.kind {
                        MemberKind::Function => CompletionItemKind::METHOD,
                        MemberKind::Constant => CompletionItemKind::CONSTANT,
                    }),
                    detail: Some(m.signature.to_string()),
                    documentation: catalog::hover_doc(&format!("{}.{}", class.name, m.name))
                        .map(markdown),
                    ..Default::default()
                })
                .collect();
        }

        let mut seen = HashSet::new();
        self.user_members(analysis, receiver)
            .into_iter()
            .filter(|d| d.kind != DefinitionKind::Constructor)
            .filter(|d| matches_prefix(&d.name, prefix))
            .filter(|d| seen.insert(d.name.clone()))
            .map(|d| CompletionItem {
                label: d.name.clone(),
                kind: Some(definition_item_kind(d.kind)),
                detail: Some(d.call_label()),
                documentation: Some(markdown(render_definition(d, None))),
                ..Default::default()
            })
            .collect()
    }

    fn top_level_completions(&self, analysis: &Analysis, prefix: &str) -> Vec<CompletionItem> {
        let mut items = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for k in catalog::KEYWORDS {
            seen.insert(k.name.to_string());
            if matches_prefix(k.name, prefix) {
                items.push(CompletionItem {
                    label: k.name.to_string(),
                    kind: Some(CompletionItemKind::KEYWORD),
                    documentation: catalog::hover_doc(k.name).map(markdown),
                    ..Default::default()
                });
            }
        }

        for c in catalog::CLASSES {
            seen.insert(c.name.to_string());
            if matches_prefix(c.name, prefix) {
                items.push(CompletionItem {
                    label: c.name.to_string(),
                    kind: Some(CompletionItemKind::CLASS),
                    documentation: Some(markdown(c.summary.to_string())),
                    // Typing '.' accepts the class name and opens member completion.
                    commit_characters: Some(vec![".".into()]),
                    ..Default::default()
                });
            }
        }

        for f in catalog::FUNCTIONS {
            seen.insert(f.name.to_string());
            if matches_prefix(f.name, prefix) {
                items.push(CompletionItem {
                    label: f.name.to_string(),
                    kind: Some(CompletionItemKind::FUNCTION),
                    detail: Some(f.signature.to_string()),
                    documentation: catalog::hover_doc(f.name).map(markdown),
                    ..Default::default()
                });
            }
        }

        let local = analysis
            .defs
            .iter()
            .filter(|d| d.container.is_none())
            .map(|d| (d, None));
        let workspace = self
            .index
            .map(|index| {
                let mut found = index.classes();
                found.extend(index.functions());
                found
            })
            .unwrap_or_default()
            .into_iter()
            .filter(|loc| Some(loc.path) != self.current)
            .map(|loc| (loc.definition, Some(loc.path)));

        for (def, path) in local.chain(workspace) {
            if !matches_prefix(&def.name, prefix) || !seen.insert(def.name.clone()) {
                continue;
            }
            items.push(CompletionItem {
                label: def.name.clone(),
                kind: Some(definition_item_kind(def.kind)),
                detail: Some(def.signature()),
                documentation: Some(markdown(render_definition(def, path))),
                commit_characters: def.kind.is_type().then(|| vec![".".into()]),
                ..Default::default()
            });
        }

        items
    }

    /// Label, parameter labels and documentation for a call.
    fn resolve_call(&self, analysis: &Analysis, site: &CallSite<'_>) -> Option<(String, Vec<String>, String)> {
        let qualified = match site.receiver {
            Some(r) => format!("{r}.{}", site.name),
            None => site.name.to_string(),
        };

        if let Some(m) = catalog::lookup(&qualified).filter(|m| m.kind == MemberKind::Function) {
            let label = match site.receiver {
                Some(r) => format!("{r}.{}", m.signature),
                None => m.signature.to_string(),
            };
            let params = catalog::parameters(m.signature)
                .into_iter()
                .map(String::from)
                .collect();
            let doc = catalog::hover_doc(&qualified).unwrap_or_else(|| m.summary.to_string());
            return Some((label, params, doc));
        }

        let def = match site.receiver {
            Some(r) => self
                .user_members(analysis, r)
                .into_iter()
                .find(|d| d.name == site.name)?,
            None => analysis
                .defs
                .iter()
                .find(|d| d.name == site.name && d.container.is_none())
                .or_else(|| {
                    self.workspace_lookup(site.name)
                        .into_iter()
                        .map(|loc| loc.definition)
                        .find(|d| d.container.is_none())
                })?,
        };

        // Calling a class runs its constructor.
        if def.kind.is_type() {
            let ctor = self
                .user_members(analysis, &def.name)
                .into_iter()
                .find(|d| d.kind == DefinitionKind::Constructor);
            let params = ctor.map(|c| c.params.clone()).unwrap_or_default();
            let label = format!("{}({})", def.name, params.join(", "));
            return Some((label, params, render_definition(def, None)));
        }

        Some((def.call_label(), def.params.clone(), render_definition(def, None)))
    }

    /// Definitions of the identifier under the cursor: the document's own,
    /// then the workspace's. Falls back to a plain text scan.
    pub fn goto_definition(&self, content: &str, pos: Position) -> Vec<DefinitionTarget> {
        let analysis = Analysis::new(content);
        let Some((word, _)) = analysis.source.word_at(pos) else {
            return Vec::new();
        };

        let mut targets: Vec<DefinitionTarget> = analysis
            .defs
            .iter()
            .filter(|d| d.name == word)
            .map(|d| DefinitionTarget {
                path: None,
                range: d.selection_range,
            })
            .collect();
        targets.extend(self.workspace_lookup(word).into_iter().map(|loc| DefinitionTarget {
            path: Some(loc.path.to_path_buf()),
            range: loc.definition.selection_range,
        }));

        if targets.is_empty() {
            targets.extend(
                outline::scan_definitions(content, word)
                    .into_iter()
                    .map(|span| DefinitionTarget {
                        path: None,
                        range: analysis.source.range(span),
                    }),
            );
        }
        targets
    }
}

impl LanguageService for OmniService<'_> {
    fn diagnostics(&self, content: &str) -> Vec<Diagnostic> {
        let analysis = Analysis::new(content);

        let mut diags: Vec<Diagnostic> = analysis
            .lex_errors
            .iter()
            .map(|e| Diagnostic {
                range: analysis.source.range(e.span.clone()),
                severity: Some(DiagnosticSeverity::ERROR),
                source: Some(DIAGNOSTIC_SOURCE.into()),
                message: e.kind.to_string(),
                ..Default::default()
            })
            .collect();

        let mut seen = HashSet::new();
        for def in &analysis.defs {
            if !seen.insert((def.container, def.name.as_str())) {
                diags.push(Diagnostic {
                    range: def.selection_range,
                    severity: Some(DiagnosticSeverity::WARNING),
                    source: Some(DIAGNOSTIC_SOURCE.into()),
                    message: format!("duplicate definition of `{}`", def.name),
                    ..Default::default()
                });
            }
        }

        diags
    }

    fn completions(&self, content: &str, pos: Position) -> Vec<CompletionItem> {
        let analysis = Analysis::new(content);
        let line_prefix = analysis.source.line_prefix(pos);
        match completion_context(line_prefix) {
            CompletionContext::Member { receiver, prefix } => {
                self.member_completions(&analysis, receiver, prefix)
            }
            CompletionContext::TopLevel { prefix } => self.top_level_completions(&analysis, prefix),
            CompletionContext::Suppressed => Vec::new(),
        }
    }

    fn hover(&self, content: &str, pos: Position) -> Option<HoverInfo> {
        let analysis = Analysis::new(content);
        let (word, span) = analysis.source.word_at(pos)?;
        let range = Some(analysis.source.range(span.clone()));

        let receiver = analysis.source.as_str()[..span.start]
            .strip_suffix('.')
            .map(trailing_ident)
            .filter(|r| !r.is_empty());

        if let Some(receiver) = receiver {
            if let Some(doc) = catalog::hover_doc(&format!("{receiver}.{word}")) {
                return Some(HoverInfo { content: doc, range });
            }
            if let Some(def) = self
                .user_members(&analysis, receiver)
                .into_iter()
                .find(|d| d.name == word)
            {
                return Some(HoverInfo {
                    content: render_definition(def, None),
                    range,
                });
            }
        }

        if let Some(doc) = catalog::hover_doc(word) {
            return Some(HoverInfo { content: doc, range });
        }

        if let Some(def) = analysis.defs.iter().find(|d| d.name == word) {
            return Some(HoverInfo {
                content: render_definition(def, None),
                range,
            });
        }

        let loc = self.workspace_lookup(word).into_iter().next()?;
        Some(HoverInfo {
            content: render_definition(loc.definition, Some(loc.path)),
            range,
        })
    }

    fn signature_help(&self, content: &str, pos: Position) -> Option<SignatureHelp> {
        let analysis = Analysis::new(content);
        let site = call_site(analysis.source.line_prefix(pos))?;
        let (label, params, doc) = self.resolve_call(&analysis, &site)?;

        let active = match params.len() {
            0 => None,
            n => Some(site.active_arg.min(n as u32 - 1)),
        };

        Some(SignatureHelp {
            signatures: vec![SignatureInformation {
                label,
                documentation: Some(markdown(doc)),
                parameters: Some(
                    params
                        .into_iter()
                        .map(|p| ParameterInformation {
                            label: ParameterLabel::Simple(p),
                            documentation: None,
                        })
                        .collect(),
                ),
                active_parameter: active,
            }],
            active_signature: Some(0),
            active_parameter: active,
        })
    }

    fn document_symbols(&self, content: &str) -> Vec<DocumentSymbol> {
        let analysis = Analysis::new(content);
        outline::document_symbols(&analysis.defs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    /// Position at the end of the last line of `content`.
    fn end_of(content: &str) -> Position {
        let line = content.lines().count().saturating_sub(1);
        let col = content.lines().last().unwrap_or("").encode_utf16().count();
        Position::new(line as u32, col as u32)
    }

    // ── context parsing ──

    #[test]
    fn context_after_dot() {
        assert_eq!(
            completion_context("    x = Math."),
            CompletionContext::Member { receiver: "Math", prefix: "" }
        );
        assert_eq!(
            completion_context("x = String.sub"),
            CompletionContext::Member { receiver: "String", prefix: "sub" }
        );
    }

    #[test]
    fn context_top_level() {
        assert_eq!(completion_context("    pr"), CompletionContext::TopLevel { prefix: "pr" });
        assert_eq!(completion_context(""), CompletionContext::TopLevel { prefix: "" });
    }

    #[test]
    fn context_suppressed() {
        assert_eq!(completion_context("print(\"Math."), CompletionContext::Suppressed);
        assert_eq!(completion_context("x = 1 # Math."), CompletionContext::Suppressed);
        assert_eq!(completion_context("x = 1 // Math."), CompletionContext::Suppressed);
        assert_eq!(completion_context("x = 3."), CompletionContext::Suppressed);
        assert_eq!(completion_context("foo()."), CompletionContext::Suppressed);
    }

    #[test]
    fn context_block_comments() {
        assert_eq!(completion_context("x = 1 /* Math."), CompletionContext::Suppressed);
        assert_eq!(
            completion_context("/* a */ Math."),
            CompletionContext::Member { receiver: "Math", prefix: "" }
        );
        assert_eq!(completion_context("/*/ Math."), CompletionContext::Suppressed);
        assert_eq!(call_site("/* f("), None);
        assert_eq!(
            call_site("/* (x */ f(a, "),
            Some(CallSite { receiver: None, name: "f", active_arg: 1 })
        );
    }

    #[test]
    fn call_site_simple_and_qualified() {
        assert_eq!(
            call_site("print(a, "),
            Some(CallSite { receiver: None, name: "print", active_arg: 1 })
        );
        assert_eq!(
            call_site("y = Math.pow(2"),
            Some(CallSite { receiver: Some("Math"), name: "pow", active_arg: 0 })
        );
    }

    #[test]
    fn call_site_innermost_and_nested_groups() {
        assert_eq!(
            call_site("f(a, g(b, [1, 2], "),
            Some(CallSite { receiver: None, name: "g", active_arg: 2 })
        );
        assert_eq!(
            call_site("f(a, g(b), "),
            Some(CallSite { receiver: None, name: "f", active_arg: 2 })
        );
        assert_eq!(
            call_site("f(\"a, b\", "),
            Some(CallSite { receiver: None, name: "f", active_arg: 1 })
        );
    }

    #[test]
    fn call_site_none() {
        assert_eq!(call_site("x = 1"), None);
        assert_eq!(call_site("f(a)"), None);
        assert_eq!(call_site("(1 + "), None);
        assert_eq!(call_site("# f("), None);
    }

    // ── completions ──

    #[test]
    fn completes_builtin_members_after_dot() {
        let svc = OmniService::new();
        let content = "x = Math.";
        let items = svc.completions(content, end_of(content));
        let l = labels(&items);
        assert!(l.contains(&"sqrt"));
        assert!(l.contains(&"PI"));
        assert_eq!(items.len(), catalog::class("Math").unwrap().members.len());
        let pi = items.iter().find(|i| i.label == "PI").unwrap();
        assert_eq!(pi.kind, Some(CompletionItemKind::CONSTANT));
        let sqrt = items.iter().find(|i| i.label == "sqrt").unwrap();
        assert_eq!(sqrt.detail.as_deref(), Some("sqrt(x)"));
        assert!(sqrt.documentation.is_some());
    }

    #[test]
    fn member_completion_filters_by_prefix() {
        let svc = OmniService::new();
        let content = "s = String.to";
        let items = svc.completions(content, end_of(content));
        assert_eq!(labels(&items), vec!["toUpperCase", "toLowerCase"]);
    }

    #[test]
    fn unknown_receiver_gives_nothing() {
        let svc = OmniService::new();
        let content = "x = thing.";
        assert!(svc.completions(content, end_of(content)).is_empty());
    }

    #[test]
    fn top_level_has_keywords_classes_and_functions() {
        let svc = OmniService::new();
        let items = svc.completions("", Position::new(0, 0));
        let l = labels(&items);
        for expected in ["def", "class", "while", "Math", "CSV", "Path", "print", "len"] {
            assert!(l.contains(&expected), "missing {expected}");
        }
        let math = items.iter().find(|i| i.label == "Math").unwrap();
        assert_eq!(math.kind, Some(CompletionItemKind::CLASS));
        assert_eq!(math.commit_characters, Some(vec![".".to_string()]));
    }

    #[test]
    fn top_level_prefix_is_case_insensitive() {
        let svc = OmniService::new();
        let content = "x = ma";
        let items = svc.completions(content, end_of(content));
        assert_eq!(labels(&items), vec!["Math", "Map"]);
    }

    #[test]
    fn document_definitions_are_completed() {
        let svc = OmniService::new();
        let content = "class Account:\n    def deposit(self, amount):\n        pass\ndef audit():\n    pass\n\nacc";
        let items = svc.completions(content, end_of(content));
        assert_eq!(labels(&items), vec!["Account"]);
        let content = format!("{content}\nAccount.");
        let items = svc.completions(&content, end_of(&content));
        assert_eq!(labels(&items), vec!["deposit"]);
        assert_eq!(items[0].detail.as_deref(), Some("deposit(amount)"));
    }

    #[test]
    fn no_completion_in_strings() {
        let svc = OmniService::new();
        let content = "print(\"Math.";
        assert!(svc.completions(content, end_of(content)).is_empty());
    }

    #[test]
    fn no_completion_in_block_comments() {
        let svc = OmniService::new();
        let content = "x = 1 /* Math.";
        assert!(svc.completions(content, end_of(content)).is_empty());
    }

    #[test]
    fn type_keywords_are_completed() {
        let svc = OmniService::new();
        let content = "vo";
        let items = svc.completions(content, end_of(content));
        assert_eq!(labels(&items), vec!["void"]);
        assert_eq!(items[0].kind, Some(CompletionItemKind::KEYWORD));
        let content = "lo";
        assert_eq!(labels(&svc.completions(content, end_of(content))), vec!["long"]);
    }

    #[test]
    fn workspace_definitions_are_completed() {
        let mut index = WorkspaceIndex::new();
        index.update_file(
            PathBuf::from("/w/lib.omni"),
            "class Logger:\n    def info(self, msg):\n        pass\ndef helper():\n    pass\n",
        );
        let svc = OmniService::with_index(&index).for_file(Path::new("/w/main.omni"));
        let content = "he";
        let items = svc.completions(content, end_of(content));
        assert_eq!(labels(&items), vec!["helper"]);
        let content = "Logger.";
        let items = svc.completions(content, end_of(content));
        assert_eq!(labels(&items), vec!["info"]);
    }

    // ── hover ──

    #[test]
    fn hover_builtin_member() {
        let svc = OmniService::new();
        let hover = svc.hover("y = Math.sqrt(16)", Position::new(0, 11)).unwrap();
        assert!(hover.content.starts_with("**Math.sqrt(x)**"));
        assert_eq!(
            hover.range,
            Some(Range::new(Position::new(0, 9), Position::new(0, 13)))
        );
    }

    #[test]
    fn hover_keyword_function_and_class() {
        let svc = OmniService::new();
        assert!(svc.hover("def f():", Position::new(0, 1)).unwrap().content.contains("Define a new function"));
        assert!(svc.hover("len(x)", Position::new(0, 1)).unwrap().content.contains("len(obj)"));
        assert!(svc.hover("File.exists(p)", Position::new(0, 2)).unwrap().content.contains("File I/O"));
    }

    #[test]
    fn hover_generated_member_doc() {
        let svc = OmniService::new();
        let hover = svc.hover("Date.now()", Position::new(0, 6)).unwrap();
        assert_eq!(hover.content, "**Date.now()**\n\nCurrent timestamp");
    }

    #[test]
    fn hover_user_definitions() {
        let svc = OmniService::new();
        let content = "def area(w, h):\n    return w * h\nprint(area(1, 2))\n";
        let hover = svc.hover(content, Position::new(2, 8)).unwrap();
        assert_eq!(hover.content, "```omni\ndef area(w, h)\n```");
    }

    #[test]
    fn hover_workspace_definition_names_file() {
        let mut index = WorkspaceIndex::new();
        index.update_file(PathBuf::from("/w/geo.omni"), "class Point(Base):\n    pass\n");
        let svc = OmniService::with_index(&index);
        let hover = svc.hover("p = new Point()", Position::new(0, 9)).unwrap();
        assert!(hover.content.contains("class Point(Base)"));
        assert!(hover.content.contains("Defined in `geo.omni`"));
    }

    #[test]
    fn hover_nothing() {
        let svc = OmniService::new();
        assert!(svc.hover("x = 1 + 2", Position::new(0, 4)).is_none());
        assert!(svc.hover("unknown_name", Position::new(0, 3)).is_none());
    }

    // ── signature help ──

    #[test]
    fn signature_for_builtin_member() {
        let svc = OmniService::new();
        let content = "s = String.substring(name, 1, ";
        let help = svc.signature_help(content, end_of(content)).unwrap();
        let sig = &help.signatures[0];
        assert_eq!(sig.label, "String.substring(s, start, [end])");
        assert_eq!(sig.parameters.as_ref().unwrap().len(), 3);
        assert_eq!(help.active_parameter, Some(2));
    }

    #[test]
    fn active_parameter_is_clamped() {
        let svc = OmniService::new();
        let content = "print(a, b, c, ";
        let help = svc.signature_help(content, end_of(content)).unwrap();
        assert_eq!(help.signatures[0].label, "print(...args)");
        assert_eq!(help.active_parameter, Some(0));
    }

    #[test]
    fn signature_without_parameters() {
        let svc = OmniService::new();
        let content = "x = Math.random(";
        let help = svc.signature_help(content, end_of(content)).unwrap();
        assert_eq!(help.active_parameter, None);
        assert!(help.signatures[0].parameters.as_ref().unwrap().is_empty());
    }

    #[test]
    fn signature_for_user_function_and_constructor() {
        let svc = OmniService::new();
        let content = "class Box:\n    def __init__(self, w, h):\n        pass\ndef scale(b, k):\n    pass\nscale(x, ";
        let help = svc.signature_help(content, end_of(content)).unwrap();
        assert_eq!(help.signatures[0].label, "scale(b, k)");
        assert_eq!(help.active_parameter, Some(1));

        let content = format!("{content}\nb = new Box(");
        let help = svc.signature_help(&content, end_of(&content)).unwrap();
        assert_eq!(help.signatures[0].label, "Box(w, h)");
    }

    #[test]
    fn no_signature_for_keywords_or_constants() {
        let svc = OmniService::new();
        assert!(svc.signature_help("if (", Position::new(0, 4)).is_none());
        assert!(svc.signature_help("Math.PI(", Position::new(0, 8)).is_none());
    }

    // ── diagnostics ──

    #[test]
    fn lexical_errors_become_diagnostics() {
        let svc = OmniService::new();
        let diags = svc.diagnostics("x = 1 @ 2\ns = \"open\n");
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.severity == Some(DiagnosticSeverity::ERROR)));
        assert_eq!(diags[0].message, "unexpected character '@'");
        assert_eq!(diags[0].range, Range::new(Position::new(0, 6), Position::new(0, 7)));
        assert_eq!(diags[1].message, "unterminated string literal");
        assert_eq!(diags[0].source.as_deref(), Some("omnils"));
    }

    #[test]
    fn duplicate_definitions_warn() {
        let svc = OmniService::new();
        let content = "def f():\n    pass\ndef f():\n    pass\nclass A:\n    def f(self):\n        pass\n";
        let diags = svc.diagnostics(content);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diags[0].range.start, Position::new(2, 4));
    }

    #[test]
    fn clean_file_has_no_diagnostics() {
        let svc = OmniService::new();
        assert!(svc.diagnostics("def main():\n    print(\"hi\")\n").is_empty());
    }

    // ── symbols & definition ──

    #[test]
    fn document_symbols_nested() {
        let svc = OmniService::new();
        let symbols = svc.document_symbols("class A:\n    def m(self):\n        pass\n");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].children.as_ref().unwrap()[0].name, "m");
    }

    #[test]
    fn goto_local_and_workspace_definitions() {
        let mut index = WorkspaceIndex::new();
        index.update_file(PathBuf::from("/w/util.omni"), "def helper():\n    pass\n");
        // Stale entry for the current file must not be reported.
        index.update_file(PathBuf::from("/w/main.omni"), "def helper():\n    pass\n");

        let svc = OmniService::with_index(&index).for_file(Path::new("/w/main.omni"));
        let content = "def helper(x):\n    pass\nhelper(1)\n";
        let targets = svc.goto_definition(content, Position::new(2, 2));
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].path, None);
        assert_eq!(targets[0].range.start, Position::new(0, 4));
        assert_eq!(targets[1].path, Some(PathBuf::from("/w/util.omni")));
    }

    #[test]
    fn goto_falls_back_to_text_scan() {
        let svc = OmniService::new();
        // A definition after `;` is not at statement start for the outline.
        let content = "x = 1; def late():\n    pass\nlate()\n";
        let targets = svc.goto_definition(content, Position::new(2, 1));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].range.start, Position::new(0, 11));
    }

    #[test]
    fn goto_nothing_under_cursor() {
        let svc = OmniService::new();
        assert!(svc.goto_definition("x = 1", Position::new(0, 2)).is_empty());
    }
}
