// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Change events flowing through the debouncer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The path came into existence.
    Created,
    /// The path's contents or metadata changed.
    Modified,
    /// The path was removed.
    Deleted,
    /// The path was renamed.
    Renamed,
}

/// One filesystem change.
///
/// Two events are equivalent for deduplication iff their paths are equal;
/// within a debounce window the later event wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,
    /// The affected path.
    pub path: PathBuf,
    /// Modification time, when the path still existed and was readable.
    pub mtime: Option<DateTime<Utc>>,
    /// Size in bytes, when the path still existed and was readable.
    pub size: Option<u64>,
}

impl ChangeEvent {
    /// Creates an event with no filesystem metadata attached.
    #[must_use]
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            mtime: None,
            size: None,
        }
    }

    /// Attaches modification time and size.
    #[must_use]
    pub fn with_metadata(mut self, mtime: DateTime<Utc>, size: u64) -> Self {
        self.mtime = Some(mtime);
        self.size = Some(size);
        self
    }
}
