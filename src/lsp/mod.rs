//! In-process language intelligence.
//!
//! Pure functions that operate directly on document content.
//! Uses `lsp-types` for the standard data structures (Diagnostic,
//! CompletionItem, ...) but calls them synchronously. The stdio server in
//! [`crate::server`] and the CLI both drive the same service.

pub mod omni;

use lsp_types::{
    CompletionItem, Diagnostic, DocumentSymbol, Hover, HoverContents, MarkupContent, MarkupKind,
    Position, SignatureHelp,
};

pub use omni::{DefinitionTarget, OmniService};

/// Hover information for a position in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverInfo {
    /// Markdown content to display.
    pub content: String,
    /// Optional range the hover applies to.
    pub range: Option<lsp_types::Range>,
}

impl HoverInfo {
    pub fn into_hover(self) -> Hover {
        Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: self.content,
            }),
            range: self.range,
        }
    }
}

/// In-process language service. Pure functions, no transport.
pub trait LanguageService {
    /// Compute diagnostics for the given content.
    fn diagnostics(&self, content: &str) -> Vec<Diagnostic>;

    /// Compute completions at the given position.
    fn completions(&self, content: &str, pos: Position) -> Vec<CompletionItem>;

    /// Compute hover information at the given position.
    fn hover(&self, content: &str, pos: Position) -> Option<HoverInfo>;

    /// Parameter hints for the call surrounding the position.
    fn signature_help(&self, content: &str, pos: Position) -> Option<SignatureHelp>;

    /// Outline of the document.
    fn document_symbols(&self, content: &str) -> Vec<DocumentSymbol>;
}
