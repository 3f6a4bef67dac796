//! Workspace symbol index.
//!
//! Holds the definitions of every Omni file in the workspace, keyed by
//! path, plus a name → files map for go-to-definition. Files are replaced
//! wholesale on every update, so the index stays consistent with whatever
//! text it was last given (disk contents or an unsaved editor buffer).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::OmniConfig;
use crate::error::{OmniError, OmniResult};
use crate::outline::{definitions, Definition};
use crate::syntax::{lex, SourceText};

/// Summary of a directory indexing pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub total_symbols: usize,
}

/// A definition and the file it lives in.
#[derive(Debug, Clone, Copy)]
pub struct SymbolLocation<'a> {
    pub path: &'a Path,
    pub definition: &'a Definition,
}

#[derive(Debug, Default)]
pub struct WorkspaceIndex {
    files: HashMap<PathBuf, Vec<Definition>>,
    names: HashMap<String, BTreeSet<PathBuf>>,
}

impl WorkspaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Index every file under `root` matched by the config's include
    /// globs and not excluded.
    pub fn index_directory(&mut self, root: &Path, config: &OmniConfig) -> OmniResult<IndexStats> {
        let excludes = config
            .exclude
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        // The root is a literal path; only the include pattern is a glob.
        let base = glob::Pattern::escape(&root.to_string_lossy());
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for pattern in &config.include {
            let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
            for entry in glob::glob(&full)? {
                let path = match entry {
                    Ok(p) => p,
                    Err(e) => {
                        debug!(error = %e, "unreadable glob entry");
                        continue;
                    }
                };
                if path.is_file() && seen.insert(path.clone()) {
                    candidates.push(path);
                }
            }
        }
        candidates.sort();

        let mut stats = IndexStats::default();
        for path in candidates {
            let rel = path.strip_prefix(root).unwrap_or(&path);
            if is_hidden(rel) || excludes.iter().any(|p| p.matches_path(rel)) {
                continue;
            }
            if stats.files_indexed >= config.max_files {
                stats.files_skipped += 1;
                continue;
            }
            match self.index_file(&path, config) {
                Ok(count) => {
                    stats.files_indexed += 1;
                    stats.total_symbols += count;
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping file");
                    stats.files_skipped += 1;
                }
            }
        }

        info!(
            root = %root.display(),
            files = stats.files_indexed,
            skipped = stats.files_skipped,
            symbols = stats.total_symbols,
            "workspace indexed"
        );
        Ok(stats)
    }

    /// Read `path` from disk and index it.
    pub fn index_file(&mut self, path: &Path, config: &OmniConfig) -> OmniResult<usize> {
        let size = std::fs::metadata(path)?.len();
        if size > config.max_file_bytes {
            return Err(OmniError::FileTooLarge {
                path: path.display().to_string(),
                size,
                limit: config.max_file_bytes,
            });
        }
        let text = std::fs::read_to_string(path)?;
        Ok(self.update_file(path.to_path_buf(), &text))
    }

    /// Replace everything known about `path` with the definitions in
    /// `text`. Returns the number of definitions.
    pub fn update_file(&mut self, path: PathBuf, text: &str) -> usize {
        self.remove_file(&path);

        let source = SourceText::new(text);
        let lexed = lex(text);
        let defs = definitions(&source, &lexed.tokens);
        for def in &defs {
            self.names
                .entry(def.name.clone())
                .or_default()
                .insert(path.clone());
        }
        let count = defs.len();
        self.files.insert(path, defs);
        count
    }

    /// Forget `path`. Returns whether it was indexed.
    pub fn remove_file(&mut self, path: &Path) -> bool {
        let Some(old) = self.files.remove(path) else {
            return false;
        };
        for def in &old {
            if let Some(paths) = self.names.get_mut(&def.name) {
                paths.remove(path);
                if paths.is_empty() {
                    self.names.remove(&def.name);
                }
            }
        }
        true
    }

    pub fn file_definitions(&self, path: &Path) -> Option<&[Definition]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Every definition named `name`, ordered by path then position.
    pub fn lookup(&self, name: &str) -> Vec<SymbolLocation<'_>> {
        let Some(paths) = self.names.get(name) else {
            return Vec::new();
        };
        paths
            .iter()
            .filter_map(|p| self.files.get_key_value(p))
            .flat_map(|(path, defs)| {
                defs.iter()
                    .filter(move |d| d.name == name)
                    .map(move |d| SymbolLocation {
                        path: path.as_path(),
                        definition: d,
                    })
            })
            .collect()
    }

    /// Case-insensitive substring search over all definition names.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SymbolLocation<'_>> {
        let query = query.to_lowercase();
        self.sorted_files()
            .into_iter()
            .flat_map(|(path, defs)| {
                defs.iter().map(move |d| SymbolLocation {
                    path,
                    definition: d,
                })
            })
            .filter(|loc| loc.definition.name.to_lowercase().contains(&query))
            .take(limit)
            .collect()
    }

    /// Top-level definitions (no container) across the workspace.
    pub fn top_level(&self) -> Vec<SymbolLocation<'_>> {
        self.sorted_files()
            .into_iter()
            .flat_map(|(path, defs)| {
                defs.iter()
                    .filter(|d| d.container.is_none())
                    .map(move |d| SymbolLocation {
                        path,
                        definition: d,
                    })
            })
            .collect()
    }

    /// Top-level classes and interfaces.
    pub fn classes(&self) -> Vec<SymbolLocation<'_>> {
        let mut found = self.top_level();
        found.retain(|loc| loc.definition.kind.is_type());
        found
    }

    /// Top-level functions.
    pub fn functions(&self) -> Vec<SymbolLocation<'_>> {
        let mut found = self.top_level();
        found.retain(|loc| loc.definition.kind.is_callable());
        found
    }

    /// Members of every class or interface named `type_name`.
    pub fn members_of(&self, type_name: &str) -> Vec<SymbolLocation<'_>> {
        self.lookup(type_name)
            .into_iter()
            .filter(|loc| loc.definition.kind.is_type())
            .flat_map(|loc| {
                let defs = self.files.get(loc.path).map(Vec::as_slice).unwrap_or(&[]);
                let owner = defs
                    .iter()
                    .position(|d| std::ptr::eq(d, loc.definition));
                defs.iter()
                    .filter(move |d| owner.is_some() && d.container == owner)
                    .map(move |d| SymbolLocation {
                        path: loc.path,
                        definition: d,
                    })
            })
            .collect()
    }

    fn sorted_files(&self) -> Vec<(&Path, &Vec<Definition>)> {
        let mut files: Vec<_> = self
            .files
            .iter()
            .map(|(p, d)| (p.as_path(), d))
            .collect();
        files.sort_by_key(|(p, _)| *p);
        files
    }
}

/// Whether `path` is a file the config asks to index. Used for single-file
/// updates. With a root, paths outside it are rejected and patterns match
/// the path relative to it; without one they match the full path.
pub fn accepts(root: Option<&Path>, path: &Path, config: &OmniConfig) -> bool {
    let (rel, hidden) = match root {
        Some(root) => match path.strip_prefix(root) {
            Ok(rel) => (rel, is_hidden(rel)),
            Err(_) => return false,
        },
        None => {
            let hidden = path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('.'));
            (path, hidden)
        }
    };
    let matches = |patterns: &[String]| {
        patterns.iter().any(|p| match glob::Pattern::new(p) {
            Ok(pattern) => pattern.matches_path(rel),
            Err(e) => {
                debug!(pattern = %p, error = %e, "ignoring bad pattern");
                false
            }
        })
    };
    !hidden && matches(&config.include) && !matches(&config.exclude)
}

fn is_hidden(rel: &Path) -> bool {
    rel.components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}
