//! Core [`RuleLoader`] struct: filesystem-backed document loading with optional hot-reload.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use indexmap::IndexMap;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::ruleset::RuleSet;
use crate::schema::{RuleDocument, RuleEnvelope};
use crate::scoring::ScoringConfig;
use crate::validation::validate_document;

use super::error::{LoadResult, LoadStatus, Result, RuleError};
use super::watcher::handle_fs_event;

/// In-memory documents keyed by `metadata.id`, plus the file each came from.
#[derive(Debug, Default)]
pub(super) struct Registry {
    pub(super) documents: IndexMap<String, RuleDocument>,
    paths: HashMap<PathBuf, String>,
}

impl Registry {
    /// Insert or replace the document loaded from `path`.
    ///
    /// Fails when another file already provides a document with the same id.
    pub(super) fn upsert(
        &mut self,
        path: &Path,
        doc: RuleDocument,
    ) -> std::result::Result<(), String> {
        let id = doc.metadata().id.clone();

        if let Some((other, _)) = self
            .paths
            .iter()
            .find(|(p, i)| **i == id && p.as_path() != path)
        {
            return Err(format!(
                "duplicate document id '{}' (already loaded from {})",
                id,
                other.display()
            ));
        }

        // The file may have been edited to carry a different id.
        if let Some(previous) = self.paths.insert(path.to_path_buf(), id.clone()) {
            if previous != id {
                self.documents.shift_remove(&previous);
            }
        }
        self.documents.insert(id, doc);
        Ok(())
    }

    /// Drop the document that `path` provided, returning its id.
    pub(super) fn remove_path(&mut self, path: &Path) -> Option<String> {
        let id = self.paths.remove(path)?;
        self.documents.shift_remove(&id);
        Some(id)
    }
}

/// Parse a single YAML file into a validated [`RuleDocument`].
///
/// First pass: deserialize as [`RuleEnvelope`] to read the `kind` field.
/// Second pass: reconstruct and deserialize into the kind-specific type.
/// Validation errors reject the document; warnings are logged.
pub(super) fn read_document(path: &Path) -> Result<RuleDocument> {
    let contents = fs::read_to_string(path)?;

    let envelope: RuleEnvelope = serde_yaml::from_str(&contents)?;

    if envelope.metadata.id.is_empty() {
        return Err(RuleError::Validation(
            "metadata.id must not be empty".to_string(),
        ));
    }

    let doc = envelope.parse_full().map_err(|e| {
        RuleError::Validation(format!(
            "failed to parse document '{}': {}",
            envelope.metadata.id, e
        ))
    })?;

    let report = validate_document(&doc);
    for w in &report.warnings {
        warn!(
            id = %doc.metadata().id,
            path = %w.path,
            suggestion = w.suggestion.as_deref().unwrap_or(""),
            "{}",
            w.message
        );
    }
    if !report.valid {
        return Err(RuleError::Validation(format!(
            "document '{}' is invalid: {}",
            doc.metadata().id,
            report.error_summary()
        )));
    }

    Ok(doc)
}

pub(super) fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false)
}

pub(super) fn is_dotfile(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Filesystem-backed document loader with optional hot-reload.
///
/// Scans a directory (recursively) for `*.yml` / `*.yaml` files, deserializes
/// them into [`RuleDocument`] instances via two-pass deserialization, and
/// maintains an in-memory registry keyed by document ID.
pub struct RuleLoader {
    /// Root directory containing rule YAML files.
    rules_dir: PathBuf,
    registry: Arc<RwLock<Registry>>,
    /// Active filesystem watcher (held to keep it alive).
    _watcher: Option<RecommendedWatcher>,
}

impl RuleLoader {
    /// Create a new loader for the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        let rules_dir = rules_dir.into();
        if !rules_dir.exists() {
            if let Err(e) = fs::create_dir_all(&rules_dir) {
                warn!(path = %rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        // Watcher events carry canonical paths; scanned paths must match them.
        let rules_dir = fs::canonicalize(&rules_dir).unwrap_or(rules_dir);
        Self {
            rules_dir,
            registry: Arc::new(RwLock::new(Registry::default())),
            _watcher: None,
        }
    }

    /// Recursively scan the rules directory and load all YAML files.
    ///
    /// Replaces the registry contents in one step. Dotfiles and non-YAML
    /// files are skipped; files are visited in sorted path order. Parse
    /// and validation errors are reported per-file but do not abort the
    /// scan.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut registry = Registry::default();
        let mut results = Vec::new();
        scan_dir_recursive(&self.rules_dir, &mut registry, &mut results)?;

        let loaded = results.iter().filter(|r| r.is_loaded()).count();
        let failed = results.iter().filter(|r| r.is_failed()).count();
        info!(
            path = %self.rules_dir.display(),
            loaded,
            failed,
            "loaded rules directory"
        );

        *self.registry.write().expect("registry lock poisoned") = registry;
        Ok(results)
    }

    /// Parse and validate a single file without adding it to the registry.
    pub fn load_file(&self, path: &Path) -> Result<RuleDocument> {
        read_document(path)
    }

    /// Start a filesystem watcher with 500ms poll interval.
    ///
    /// On file create/modify the document is re-parsed and upserted.
    /// On file delete the document is removed from the registry.
    /// Parse errors are logged as warnings; the previous version is kept.
    pub fn watch(&mut self) -> Result<()> {
        let registry = Arc::clone(&self.registry);

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => handle_fs_event(&event, &registry),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
        )?;

        watcher.watch(&self.rules_dir, RecursiveMode::Recursive)?;

        let _ = watcher
            .configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        info!(path = %self.rules_dir.display(), "watching rules directory for changes (recursive)");
        self._watcher = Some(watcher);
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self._watcher.is_some()
    }

    /// Get the rules directory path.
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Snapshot of all loaded documents in load order.
    pub fn documents(&self) -> Vec<RuleDocument> {
        self.registry
            .read()
            .expect("registry lock poisoned")
            .documents
            .values()
            .cloned()
            .collect()
    }

    pub fn document(&self, id: &str) -> Option<RuleDocument> {
        self.registry
            .read()
            .expect("registry lock poisoned")
            .documents
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.registry.read().expect("registry lock poisoned").documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compile the automation rule set with this id.
    pub fn rule_set(&self, id: &str) -> Result<RuleSet> {
        let registry = self.registry.read().expect("registry lock poisoned");
        let doc = registry
            .documents
            .get(id)
            .and_then(RuleDocument::as_rule_set)
            .ok_or_else(|| RuleError::NotFound {
                kind: "rule set",
                id: id.to_string(),
            })?;
        RuleSet::compile(doc).map_err(RuleError::Validation)
    }

    /// The scoring config with this id.
    pub fn scoring_config(&self, id: &str) -> Result<ScoringConfig> {
        let registry = self.registry.read().expect("registry lock poisoned");
        registry
            .documents
            .get(id)
            .and_then(RuleDocument::as_scoring_config)
            .map(|rule| rule.compile())
            .ok_or_else(|| RuleError::NotFound {
                kind: "scoring config",
                id: id.to_string(),
            })
    }

    #[cfg(test)]
    pub(super) fn registry(&self) -> Arc<RwLock<Registry>> {
        Arc::clone(&self.registry)
    }
}

/// Recursively scan a directory for YAML rule files.
fn scan_dir_recursive(
    dir: &Path,
    registry: &mut Registry,
    results: &mut Vec<LoadResult>,
) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "failed to read directory");
            return Ok(());
        }
    };

    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry?.path());
    }
    paths.sort();

    for path in paths {
        if is_dotfile(&path) {
            if path.is_file() {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "dotfile".to_string(),
                    },
                });
            }
            continue;
        }

        if path.is_dir() {
            scan_dir_recursive(&path, registry, results)?;
            continue;
        }

        if !is_yaml(&path) {
            results.push(LoadResult {
                path,
                status: LoadStatus::Skipped {
                    reason: "not a YAML file".to_string(),
                },
            });
            continue;
        }

        let loaded = read_document(&path).and_then(|doc| {
            let id = doc.metadata().id.clone();
            let kind = doc.kind().to_string();
            registry
                .upsert(&path, doc)
                .map_err(RuleError::Validation)?;
            Ok((id, kind))
        });

        match loaded {
            Ok((id, kind)) => {
                info!(id = %id, kind = %kind, path = %path.display(), "loaded rule document");
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Loaded { id, kind },
                });
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load rule file");
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Failed {
                        error: e.to_string(),
                    },
                });
            }
        }
    }

    Ok(())
}
