//! Language server over stdio.
//!
//! One task reads framed messages and forwards them on a channel; the main
//! loop owns all state and answers requests in arrival order. Workspace
//! indexing runs on the blocking pool and is swapped in when it finishes.

pub mod transport;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DidChangeTextDocumentParams,
    DidChangeWatchedFilesParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams, DocumentSymbolParams, DocumentSymbolResponse, FileChangeType,
    GotoDefinitionParams, GotoDefinitionResponse, HoverParams, HoverProviderCapability,
    InitializeParams, InitializeResult, Location, OneOf, PublishDiagnosticsParams,
    ServerCapabilities, ServerInfo, SignatureHelpOptions, SignatureHelpParams, SymbolInformation,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions, Uri, WorkspaceSymbolParams, WorkspaceSymbolResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::OmniConfig;
use crate::error::{OmniError, OmniResult};
use crate::index::{self, IndexStats, WorkspaceIndex};
use crate::lsp::{LanguageService, OmniService};
use crate::outline::scan_definitions;
use crate::syntax::SourceText;
use transport::{read_message, write_message};

/// Upper bound on `workspace/symbol` results.
const WORKSPACE_SYMBOL_LIMIT: usize = 256;

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_NOT_INITIALIZED: i64 = -32002;

    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_json(&self) -> Value {
        json!({ "code": self.code, "message": self.message })
    }
}

/// Whether the main loop keeps going after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

type IndexTask = JoinHandle<OmniResult<(WorkspaceIndex, IndexStats)>>;

struct Document {
    uri: Uri,
    /// `None` for non-`file:` URIs (untitled buffers and the like).
    path: Option<PathBuf>,
    version: Option<i32>,
    text: String,
}

pub struct Server {
    /// Open documents keyed by URI string.
    documents: BTreeMap<String, Document>,
    index: WorkspaceIndex,
    config: OmniConfig,
    root: Option<PathBuf>,
    initialized: bool,
    shutdown_requested: bool,
    indexing: Option<IndexTask>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

pub fn uri_to_path(uri: &Uri) -> Option<PathBuf> {
    url::Url::parse(uri.as_str()).ok()?.to_file_path().ok()
}

pub fn path_to_uri(path: &Path) -> Option<Uri> {
    let url = url::Url::from_file_path(path).ok()?;
    Uri::from_str(url.as_str()).ok()
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::new(RpcError::INVALID_PARAMS, e.to_string()))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::new(RpcError::INTERNAL_ERROR, e.to_string()))
}

fn notification(method: &str, params: impl Serialize) -> Value {
    json!({ "jsonrpc": "2.0", "method": method, "params": params })
}

fn response(id: Value, result: Result<Value, RpcError>) -> Value {
    match result {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(err) => json!({ "jsonrpc": "2.0", "id": id, "error": err.to_json() }),
    }
}

fn capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
            open_close: Some(true),
            change: Some(TextDocumentSyncKind::FULL),
            save: Some(TextDocumentSyncSaveOptions::Supported(true)),
            ..Default::default()
        })),
        completion_provider: Some(CompletionOptions {
            trigger_characters: Some(vec![".".into()]),
            ..Default::default()
        }),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        signature_help_provider: Some(SignatureHelpOptions {
            trigger_characters: Some(vec!["(".into(), ",".into()]),
            ..Default::default()
        }),
        document_symbol_provider: Some(OneOf::Left(true)),
        definition_provider: Some(OneOf::Left(true)),
        workspace_symbol_provider: Some(OneOf::Left(true)),
        ..Default::default()
    }
}

async fn join_indexing(task: &mut Option<IndexTask>) -> Result<OmniResult<(WorkspaceIndex, IndexStats)>, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

impl Server {
    pub fn new() -> Self {
        Self {
            documents: BTreeMap::new(),
            index: WorkspaceIndex::new(),
            config: OmniConfig::default(),
            root: None,
            initialized: false,
            shutdown_requested: false,
            indexing: None,
        }
    }

    /// Serve until `exit` or end of input. Returns whether `shutdown` was
    /// received before the session ended.
    pub async fn run<R, W>(mut self, reader: R, mut writer: W) -> OmniResult<bool>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::channel::<OmniResult<Option<Value>>>(32);
        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut buf = String::new();
            loop {
                let msg = read_message(&mut reader, &mut buf).await;
                // A body that is not JSON is reported; the stream is still in sync.
                let fatal = !matches!(msg, Ok(Some(_)) | Err(OmniError::Json(_)));
                if tx.send(msg).await.is_err() || fatal {
                    break;
                }
            }
        });

        let result = loop {
            tokio::select! {
                incoming = rx.recv() => {
                    let msg = match incoming {
                        Some(Ok(Some(msg))) => msg,
                        Some(Ok(None)) | None => {
                            info!("input closed");
                            break Ok(self.shutdown_requested);
                        }
                        Some(Err(OmniError::Json(e))) => {
                            warn!(error = %e, "unparseable message");
                            let err = RpcError::new(RpcError::PARSE_ERROR, e.to_string());
                            write_message(&mut writer, &response(Value::Null, Err(err))).await?;
                            continue;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "transport failure");
                            break Err(e);
                        }
                    };

                    let mut outgoing = Vec::new();
                    let flow = self.handle(msg, &mut outgoing);
                    for out in &outgoing {
                        write_message(&mut writer, out).await?;
                    }
                    if flow == Flow::Exit {
                        break Ok(self.shutdown_requested);
                    }
                }
                done = join_indexing(&mut self.indexing) => {
                    self.indexing = None;
                    self.finish_indexing(done);
                }
            }
        };

        reader_task.abort();
        result
    }

    /// Handle one incoming message, queueing responses and notifications.
    pub fn handle(&mut self, msg: Value, out: &mut Vec<Value>) -> Flow {
        let id = msg.get("id").cloned();
        let Some(method) = msg.get("method").and_then(Value::as_str) else {
            match id {
                // A reply to something we sent; we never send requests.
                Some(id) => debug!(%id, "ignoring response"),
                None => out.push(response(
                    Value::Null,
                    Err(RpcError::new(RpcError::INVALID_REQUEST, "message has no method")),
                )),
            }
            return Flow::Continue;
        };
        let params = msg.get("params").cloned().unwrap_or(Value::Null);

        match id {
            Some(id) => {
                debug!(method, %id, "request");
                let result = self.handle_request(method, params);
                if let Err(e) = &result {
                    debug!(method, code = e.code, message = %e.message, "request failed");
                }
                out.push(response(id, result));
                Flow::Continue
            }
            None => {
                debug!(method, "notification");
                self.handle_notification(method, params, out)
            }
        }
    }

    fn handle_request(&mut self, method: &str, params: Value) -> Result<Value, RpcError> {
        if self.shutdown_requested {
            return Err(RpcError::new(RpcError::INVALID_REQUEST, "server is shutting down"));
        }
        if method == "initialize" {
            return self.initialize(parse_params(params)?);
        }
        if !self.initialized {
            return Err(RpcError::new(RpcError::SERVER_NOT_INITIALIZED, "server not initialized"));
        }

        match method {
            "shutdown" => {
                info!("shutdown requested");
                self.shutdown_requested = true;
                Ok(Value::Null)
            }
            "textDocument/completion" => self.completion(parse_params(params)?),
            "textDocument/hover" => self.hover(parse_params(params)?),
            "textDocument/signatureHelp" => self.signature_help(parse_params(params)?),
            "textDocument/documentSymbol" => self.document_symbols(parse_params(params)?),
            "textDocument/definition" => self.definition(parse_params(params)?),
            "workspace/symbol" => self.workspace_symbols(parse_params(params)?),
            _ => Err(RpcError::new(RpcError::METHOD_NOT_FOUND, format!("unknown method: {method}"))),
        }
    }

    fn handle_notification(&mut self, method: &str, params: Value, out: &mut Vec<Value>) -> Flow {
        if method == "exit" {
            info!(clean = self.shutdown_requested, "exit");
            return Flow::Exit;
        }
        if !self.initialized || self.shutdown_requested {
            debug!(method, "dropping notification");
            return Flow::Continue;
        }

        let result = match method {
            "initialized" => {
                self.start_indexing();
                Ok(())
            }
            "textDocument/didOpen" => parse_params(params).map(|p| self.did_open(p, out)),
            "textDocument/didChange" => parse_params(params).map(|p| self.did_change(p, out)),
            "textDocument/didSave" => parse_params(params).map(|p| self.did_save(p, out)),
            "textDocument/didClose" => parse_params(params).map(|p| self.did_close(p, out)),
            "workspace/didChangeWatchedFiles" => parse_params(params).map(|p| self.did_change_watched_files(p)),
            _ => {
                debug!(method, "ignoring unknown notification");
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(method, error = %e.message, "bad notification params");
        }
        Flow::Continue
    }

    // ── Lifecycle ──

    #[allow(deprecated)]
    fn initialize(&mut self, params: InitializeParams) -> Result<Value, RpcError> {
        if self.initialized {
            return Err(RpcError::new(RpcError::INVALID_REQUEST, "already initialized"));
        }

        let root_uri = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| &folder.uri)
            .or(params.root_uri.as_ref());
        self.root = root_uri.and_then(uri_to_path);

        self.config = OmniConfig::load(self.root.as_deref());
        if let Some(options) = params.initialization_options {
            if let Err(e) = self.config.apply_json(options) {
                warn!(error = %e, "ignoring malformed initializationOptions");
            }
        }

        info!(
            root = ?self.root,
            client = params.client_info.as_ref().map(|c| c.name.as_str()),
            "initialize"
        );
        self.initialized = true;

        to_json(InitializeResult {
            capabilities: capabilities(),
            server_info: Some(ServerInfo {
                name: "omnils".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
            ..Default::default()
        })
    }

    fn start_indexing(&mut self) {
        let Some(root) = self.root.clone() else {
            debug!("no workspace root; skipping indexing");
            return;
        };
        let config = self.config.clone();
        self.indexing = Some(tokio::task::spawn_blocking(move || {
            let mut index = WorkspaceIndex::new();
            let stats = index.index_directory(&root, &config)?;
            Ok((index, stats))
        }));
    }

    fn finish_indexing(&mut self, done: Result<OmniResult<(WorkspaceIndex, IndexStats)>, JoinError>) {
        match done {
            Ok(Ok((index, stats))) => {
                self.index = index;
                // Open buffers are newer than what is on disk.
                for doc in self.documents.values() {
                    if let Some(path) = doc.path.as_deref().filter(|p| self.indexable(p)) {
                        self.index.update_file(path.to_path_buf(), &doc.text);
                    }
                }
                debug!(files = stats.files_indexed, "index installed");
            }
            Ok(Err(e)) => warn!(error = %e, "workspace indexing failed"),
            Err(e) => error!(error = %e, "indexing task panicked"),
        }
    }

    // ── Document sync ──

    fn did_open(&mut self, params: DidOpenTextDocumentParams, out: &mut Vec<Value>) {
        let item = params.text_document;
        let doc = Document {
            path: uri_to_path(&item.uri),
            uri: item.uri,
            version: Some(item.version),
            text: item.text,
        };
        self.store(doc, out);
    }

    fn did_change(&mut self, params: DidChangeTextDocumentParams, out: &mut Vec<Value>) {
        // Full sync: the last change carries the whole text.
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        let id = params.text_document;
        let doc = Document {
            path: uri_to_path(&id.uri),
            uri: id.uri,
            version: Some(id.version),
            text: change.text,
        };
        self.store(doc, out);
    }

    fn did_save(&mut self, params: DidSaveTextDocumentParams, out: &mut Vec<Value>) {
        let Some(text) = params.text else {
            return;
        };
        let uri = params.text_document.uri;
        let version = self.documents.get(uri.as_str()).and_then(|d| d.version);
        let doc = Document {
            path: uri_to_path(&uri),
            uri,
            version,
            text,
        };
        self.store(doc, out);
    }

    fn did_close(&mut self, params: DidCloseTextDocumentParams, out: &mut Vec<Value>) {
        let uri = params.text_document.uri;
        let Some(doc) = self.documents.remove(uri.as_str()) else {
            return;
        };
        out.push(notification(
            "textDocument/publishDiagnostics",
            PublishDiagnosticsParams {
                uri,
                diagnostics: Vec::new(),
                version: None,
            },
        ));

        // The buffer may have been discarded; go back to the disk contents.
        if let Some(path) = doc.path {
            if self.indexable(&path) {
                self.reindex_from_disk(&path);
            } else {
                self.index.remove_file(&path);
            }
        }
    }

    fn did_change_watched_files(&mut self, params: DidChangeWatchedFilesParams) {
        for change in params.changes {
            if self.documents.contains_key(change.uri.as_str()) {
                continue;
            }
            let Some(path) = uri_to_path(&change.uri) else {
                continue;
            };
            if change.typ == FileChangeType::DELETED {
                self.index.remove_file(&path);
            } else if self.indexable(&path) {
                self.reindex_from_disk(&path);
            }
        }
    }

    /// Whether `path` belongs in the workspace index.
    fn indexable(&self, path: &Path) -> bool {
        index::accepts(self.root.as_deref(), path, &self.config)
    }

    fn reindex_from_disk(&mut self, path: &Path) {
        if let Err(e) = self.index.index_file(path, &self.config) {
            debug!(path = %path.display(), error = %e, "dropping file from index");
            self.index.remove_file(path);
        }
    }

    fn store(&mut self, doc: Document, out: &mut Vec<Value>) {
        // Files outside the workspace are still analyzed, just not indexed.
        if let Some(path) = doc.path.as_deref().filter(|p| self.indexable(p)) {
            self.index.update_file(path.to_path_buf(), &doc.text);
        }
        if self.config.diagnostics {
            let diagnostics = OmniService::new().diagnostics(&doc.text);
            out.push(notification(
                "textDocument/publishDiagnostics",
                PublishDiagnosticsParams {
                    uri: doc.uri.clone(),
                    diagnostics,
                    version: doc.version,
                },
            ));
        }
        self.documents.insert(doc.uri.as_str().to_string(), doc);
    }

    // ── Features ──

    /// Run `f` over the text of `uri`: the open buffer, or the file on disk.
    fn with_document<T>(&self, uri: &Uri, f: impl FnOnce(OmniService<'_>, &str) -> T) -> Option<T> {
        let path = uri_to_path(uri);
        let from_disk;
        let text = match self.documents.get(uri.as_str()) {
            Some(doc) => doc.text.as_str(),
            None => {
                from_disk = std::fs::read_to_string(path.as_ref()?).ok()?;
                from_disk.as_str()
            }
        };
        let mut service = OmniService::with_index(&self.index);
        if let Some(path) = &path {
            service = service.for_file(path);
        }
        Some(f(service, text))
    }

    fn completion(&self, params: CompletionParams) -> Result<Value, RpcError> {
        let pos = params.text_document_position;
        let items = self
            .with_document(&pos.text_document.uri, |svc, text| svc.completions(text, pos.position))
            .unwrap_or_default();
        to_json(CompletionResponse::Array(items))
    }

    fn hover(&self, params: HoverParams) -> Result<Value, RpcError> {
        let pos = params.text_document_position_params;
        let hover = self
            .with_document(&pos.text_document.uri, |svc, text| svc.hover(text, pos.position))
            .flatten()
            .map(|h| h.into_hover());
        to_json(hover)
    }

    fn signature_help(&self, params: SignatureHelpParams) -> Result<Value, RpcError> {
        let pos = params.text_document_position_params;
        let help = self
            .with_document(&pos.text_document.uri, |svc, text| svc.signature_help(text, pos.position))
            .flatten();
        to_json(help)
    }

    fn document_symbols(&self, params: DocumentSymbolParams) -> Result<Value, RpcError> {
        let symbols = self
            .with_document(&params.text_document.uri, |svc, text| svc.document_symbols(text))
            .unwrap_or_default();
        to_json(DocumentSymbolResponse::Nested(symbols))
    }

    fn definition(&self, params: GotoDefinitionParams) -> Result<Value, RpcError> {
        let pos = params.text_document_position_params;
        let uri = pos.text_document.uri;
        let Some((targets, word)) = self.with_document(&uri, |svc, text| {
            let word = SourceText::new(text)
                .word_at(pos.position)
                .map(|(w, _)| w.to_string());
            (svc.goto_definition(text, pos.position), word)
        }) else {
            return Ok(Value::Null);
        };

        let mut locations: Vec<Location> = targets
            .into_iter()
            .filter_map(|t| {
                let uri = match t.path {
                    None => uri.clone(),
                    Some(path) => path_to_uri(&path)?,
                };
                Some(Location { uri, range: t.range })
            })
            .collect();

        // Last resort: a text scan of the other open buffers.
        if locations.is_empty() {
            if let Some(word) = word {
                for doc in self.documents.values().filter(|d| d.uri != uri) {
                    let source = SourceText::new(&doc.text);
                    locations.extend(scan_definitions(&doc.text, &word).into_iter().map(|span| Location {
                        uri: doc.uri.clone(),
                        range: source.range(span),
                    }));
                }
            }
        }

        if locations.is_empty() {
            return Ok(Value::Null);
        }
        to_json(GotoDefinitionResponse::Array(locations))
    }

    #[allow(deprecated)]
    fn workspace_symbols(&self, params: WorkspaceSymbolParams) -> Result<Value, RpcError> {
        let symbols: Vec<SymbolInformation> = self
            .index
            .search(&params.query, WORKSPACE_SYMBOL_LIMIT)
            .into_iter()
            .filter_map(|loc| {
                let def = loc.definition;
                let container_name = def
                    .container
                    .and_then(|c| self.index.file_definitions(loc.path)?.get(c))
                    .map(|parent| parent.name.clone());
                Some(SymbolInformation {
                    name: def.name.clone(),
                    kind: def.kind.symbol_kind(),
                    tags: None,
                    deprecated: None,
                    location: Location {
                        uri: path_to_uri(loc.path)?,
                        range: def.range,
                    },
                    container_name,
                })
            })
            .collect();
        to_json(WorkspaceSymbolResponse::Flat(symbols))
    }
}
