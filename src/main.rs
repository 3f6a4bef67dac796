use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lsp_types::{DiagnosticSeverity, Position};
use serde::Serialize;
use tracing::info;

use omnils::config::OmniConfig;
use omnils::index::WorkspaceIndex;
use omnils::lsp::{LanguageService, OmniService};
use omnils::server::Server;
use omnils::syntax::{lex, SourceText};

#[derive(Parser)]
#[command(name = "omnils", version, about = "Language server and query tool for Omni.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

/// LINE and COL are 1-based. Ranges in the JSON output are LSP ranges
/// (0-based, UTF-16 columns).
#[derive(Subcommand)]
enum Command {
    /// Run the language server on stdio (default)
    Serve,
    /// Print the outline of a file
    Symbols { file: PathBuf },
    /// Completions at a position
    Complete { file: PathBuf, line: u32, col: u32 },
    /// Hover documentation at a position
    Hover { file: PathBuf, line: u32, col: u32 },
    /// Signature help at a position
    Signature { file: PathBuf, line: u32, col: u32 },
    /// Definitions of the identifier at a position
    Definition {
        file: PathBuf,
        line: u32,
        col: u32,
        /// Workspace to index for cross-file definitions
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Diagnostics for files; exits non-zero if any has errors
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Dump the token stream of a file
    Tokens { file: PathBuf },
}

#[derive(Serialize)]
struct FoundDefinition {
    path: PathBuf,
    range: lsp_types::Range,
}

#[derive(Serialize)]
struct FileDiagnostics {
    path: PathBuf,
    diagnostics: Vec<lsp_types::Diagnostic>,
}

#[derive(Serialize)]
struct TokenDump<'a> {
    kind: &'static str,
    text: &'a str,
    line: u32,
    character: u32,
}

fn read(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
}

fn position(line: u32, col: u32) -> Position {
    Position::new(line.saturating_sub(1), col.saturating_sub(1))
}

fn write_json<T: Serialize>(mut out: impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    write_json(std::io::stdout().lock(), value)
}

async fn serve() -> Result<ExitCode> {
    info!(version = env!("CARGO_PKG_VERSION"), "omnils starting on stdio");
    let clean = Server::new()
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await?;
    Ok(if clean { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn definition(file: &Path, pos: Position, root: Option<&Path>) -> Result<()> {
    let content = read(file)?;
    let file = std::fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());

    let mut index = WorkspaceIndex::new();
    if let Some(root) = root {
        let root = std::fs::canonicalize(root).with_context(|| format!("resolving {}", root.display()))?;
        let config = OmniConfig::load(Some(&root));
        index.index_directory(&root, &config)?;
    }

    let found: Vec<FoundDefinition> = OmniService::with_index(&index)
        .for_file(&file)
        .goto_definition(&content, pos)
        .into_iter()
        .map(|t| FoundDefinition {
            path: t.path.unwrap_or_else(|| file.clone()),
            range: t.range,
        })
        .collect();
    print_json(&found)
}

/// Write a diagnostics report for `files`. Returns whether none of them
/// has an error.
fn check(files: &[PathBuf], out: impl Write) -> Result<bool> {
    let service = OmniService::new();
    let mut report = Vec::new();
    let mut failed = false;
    for file in files {
        let diagnostics = service.diagnostics(&read(file)?);
        failed |= diagnostics
            .iter()
            .any(|d| d.severity == Some(DiagnosticSeverity::ERROR));
        report.push(FileDiagnostics {
            path: file.clone(),
            diagnostics,
        });
    }
    write_json(out, &report)?;
    Ok(!failed)
}

fn token_dump(content: &str) -> Vec<TokenDump<'_>> {
    let source = SourceText::new(content);
    lex(content)
        .tokens
        .iter()
        .map(|t| {
            let start = source.position_at(t.span.start);
            TokenDump {
                kind: t.kind.name(),
                text: t.text(content),
                line: start.line,
                character: start.character,
            }
        })
        .collect()
}

fn tokens(file: &Path, out: impl Write) -> Result<()> {
    let content = read(file)?;
    write_json(out, &token_dump(&content))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("omnils=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let service = OmniService::new();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => return serve().await,
        Command::Symbols { file } => print_json(&service.document_symbols(&read(&file)?))?,
        Command::Complete { file, line, col } => {
            print_json(&service.completions(&read(&file)?, position(line, col)))?
        }
        Command::Hover { file, line, col } => {
            let hover = service
                .hover(&read(&file)?, position(line, col))
                .map(|h| h.into_hover());
            print_json(&hover)?
        }
        Command::Signature { file, line, col } => {
            print_json(&service.signature_help(&read(&file)?, position(line, col)))?
        }
        Command::Definition { file, line, col, root } => {
            definition(&file, position(line, col), root.as_deref())?
        }
        Command::Check { files } => {
            if !check(&files, std::io::stdout().lock())? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Tokens { file } => tokens(&file, std::io::stdout().lock())?,
    }

    Ok(ExitCode::SUCCESS)
}
