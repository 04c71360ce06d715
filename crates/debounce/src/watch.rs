// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Platform file-notification source.
//!
//! Adapts `notify` events into [`ChangeEvent`]s and offers them to the
//! debouncer ingress. Events for paths outside the registered roots are
//! discarded; containment is decided by canonicalized path components, never
//! by raw string prefix, so `/srv/app-data` is not mistaken for a child of
//! `/srv/app`.

use crate::debouncer::DebouncerHandle;
use crate::error::Error;
use crate::event::{ChangeEvent, ChangeKind};
use chrono::{DateTime, Utc};
use notify::event::ModifyKind;
use notify::{EventKind, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Watches directory roots and feeds the debouncer.
pub struct PathWatcher {
    watcher: notify::RecommendedWatcher,
    roots: Arc<RwLock<Vec<PathBuf>>>,
}

impl std::fmt::Debug for PathWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathWatcher")
            .field("roots", &*self.roots.read())
            .finish()
    }
}

impl PathWatcher {
    /// Creates a watcher delivering into the given debouncer handle.
    pub fn new(handle: DebouncerHandle) -> Result<Self, Error> {
        let roots: Arc<RwLock<Vec<PathBuf>>> = Arc::new(RwLock::new(Vec::new()));
        let callback_roots = roots.clone();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => deliver(&event, &callback_roots, &handle),
                Err(e) => tracing::warn!(error = %e, "filesystem watcher error"),
            }
        })
        .map_err(|e| Error::WatcherInit {
            details: e.to_string(),
        })?;

        Ok(Self { watcher, roots })
    }

    /// Registers a directory root for recursive watching.
    ///
    /// The root is resolved to a canonical absolute path before registration.
    pub fn watch(&mut self, root: &Path) -> Result<(), Error> {
        let canonical = root.canonicalize().map_err(|e| Error::Canonicalize {
            path: root.to_path_buf(),
            details: e.to_string(),
        })?;
        self.watcher
            .watch(&canonical, RecursiveMode::Recursive)
            .map_err(|e| Error::WatchPath {
                path: canonical.clone(),
                details: e.to_string(),
            })?;
        self.roots.write().push(canonical);
        Ok(())
    }

    /// Deregisters a previously watched root.
    pub fn unwatch(&mut self, root: &Path) -> Result<(), Error> {
        let canonical = root.canonicalize().map_err(|e| Error::Canonicalize {
            path: root.to_path_buf(),
            details: e.to_string(),
        })?;
        self.watcher
            .unwatch(&canonical)
            .map_err(|e| Error::WatchPath {
                path: canonical.clone(),
                details: e.to_string(),
            })?;
        self.roots.write().retain(|r| r != &canonical);
        Ok(())
    }
}

fn deliver(event: &notify::Event, roots: &RwLock<Vec<PathBuf>>, handle: &DebouncerHandle) {
    let Some(kind) = map_kind(&event.kind) else {
        return;
    };
    for path in &event.paths {
        if !within_roots(path, &roots.read()) {
            continue;
        }
        let mut change = ChangeEvent::new(kind, path.clone());
        if kind != ChangeKind::Deleted {
            if let Ok(meta) = std::fs::metadata(path) {
                change.size = Some(meta.len());
                change.mtime = meta
                    .modified()
                    .ok()
                    .map(|mtime| DateTime::<Utc>::from(mtime));
            }
        }
        let _ = handle.offer(change);
    }
}

/// Component-wise containment check against the canonical roots.
fn within_roots(path: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}

fn map_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_component_wise() {
        let roots = vec![PathBuf::from("/srv/app")];
        assert!(within_roots(Path::new("/srv/app/src/main.rs"), &roots));
        assert!(within_roots(Path::new("/srv/app"), &roots));
        assert!(!within_roots(Path::new("/srv/app-data/file"), &roots));
        assert!(!within_roots(Path::new("/srv"), &roots));
    }

    #[test]
    fn modify_metadata_and_access_are_ignored() {
        use notify::event::{AccessKind, MetadataKind};
        assert_eq!(
            map_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
            None
        );
        assert_eq!(map_kind(&EventKind::Access(AccessKind::Any)), None);
        assert_eq!(
            map_kind(&EventKind::Create(notify::event::CreateKind::File)),
            Some(ChangeKind::Created)
        );
    }
}
