// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the recovery engine.

/// Errors that can occur registering recovery rules.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A rule was registered against an empty check name.
    #[error("Recovery rules must name a health check")]
    EmptyCheckName,

    /// A rule was registered with no actions to run.
    #[error("Recovery rule for '{check}' has no actions")]
    NoActions {
        /// The check the rule was registered against.
        check: String,
    },
}
