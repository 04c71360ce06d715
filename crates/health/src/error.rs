// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the health crate.

/// Errors that can occur registering or running health checks.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A check was registered with an empty name.
    #[error("Health check names must not be empty")]
    EmptyName,
}
