// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the debouncer and its watch source.

use std::path::PathBuf;

/// Errors that can occur in the debouncer crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The platform watcher could not be created.
    #[error("Failed to create filesystem watcher: {details}")]
    WatcherInit {
        /// Human-readable details of the failure.
        details: String,
    },

    /// A root path could not be watched.
    #[error("Failed to watch '{path}': {details}")]
    WatchPath {
        /// The path that failed to register.
        path: PathBuf,
        /// Human-readable details of the failure.
        details: String,
    },

    /// A root path could not be resolved to a canonical absolute path.
    #[error("Failed to canonicalize '{path}': {details}")]
    Canonicalize {
        /// The path that failed to resolve.
        path: PathBuf,
        /// Human-readable details of the failure.
        details: String,
    },
}
