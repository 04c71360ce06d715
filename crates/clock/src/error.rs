// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for deadline-bounded scopes.

use std::time::Duration;

/// Why a [`crate::BoundedScope`] did not run its work to completion.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// The scope's deadline expired before the work finished.
    #[error("deadline of {timeout:?} elapsed")]
    Elapsed {
        /// The timeout the scope was created with.
        timeout: Duration,
    },

    /// The parent cancellation signal fired before the work finished.
    #[error("scope cancelled")]
    Cancelled,
}

impl ScopeError {
    /// Returns `true` for deadline expiry (as opposed to cancellation).
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Elapsed { .. })
    }
}
