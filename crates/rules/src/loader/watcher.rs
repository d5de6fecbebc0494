//! Filesystem event handler for the notify watcher (hot-reload).

use std::path::Path;
use std::sync::{Arc, RwLock};

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind};
use tracing::{info, warn};

use super::core::{is_dotfile, is_yaml, read_document, Registry};

/// Handle a single filesystem event from the notify watcher.
pub(super) fn handle_fs_event(event: &Event, registry: &Arc<RwLock<Registry>>) {
    for path in &event.paths {
        if !is_yaml(path) || is_dotfile(path) {
            continue;
        }

        match &event.kind {
            EventKind::Create(CreateKind::File)
            | EventKind::Create(CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(_)) => {
                // A rename reports the old path too; it no longer exists.
                if !path.exists() {
                    remove_by_path(registry, path);
                    continue;
                }
                reload_path(registry, path);
            }
            EventKind::Remove(RemoveKind::File) | EventKind::Remove(RemoveKind::Any) => {
                remove_by_path(registry, path);
            }
            _ => {}
        }
    }
}

/// Re-parse a file and upsert it. On failure the previous version is kept.
pub(super) fn reload_path(registry: &Arc<RwLock<Registry>>, path: &Path) {
    let doc = match read_document(path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "failed to reload rule file, keeping previous version"
            );
            return;
        }
    };

    let id = doc.metadata().id.clone();
    let kind = doc.kind();
    let outcome = registry
        .write()
        .expect("registry lock poisoned")
        .upsert(path, doc);

    match outcome {
        Ok(()) => info!(
            id = %id,
            kind = %kind,
            path = %path.display(),
            "hot-reloaded rule document"
        ),
        Err(e) => warn!(path = %path.display(), error = %e, "rejected hot-reloaded rule file"),
    }
}

pub(super) fn remove_by_path(registry: &Arc<RwLock<Registry>>, path: &Path) {
    let removed = registry
        .write()
        .expect("registry lock poisoned")
        .remove_path(path);
    if let Some(id) = removed {
        info!(id = %id, path = %path.display(), "removed rule document after file deletion");
    }
}
