// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Filesystem writability check.

use crate::check::{CheckOutcome, HealthCheck};
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Verifies that a target directory accepts writes.
///
/// Each probe writes and removes a uniquely named temporary file under the
/// target directory, so two concurrent probes never collide.
#[derive(Debug, Clone)]
pub struct FilesystemCheck {
    name: String,
    dir: PathBuf,
    critical: bool,
    timeout: Duration,
}

impl FilesystemCheck {
    /// Creates a check probing `dir`, critical by default.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "filesystem".to_string(),
            dir: dir.into(),
            critical: true,
            timeout: Duration::from_secs(5),
        }
    }

    /// Overrides the registry name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the critical flag.
    #[must_use]
    pub fn critical_flag(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// Overrides the per-check timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HealthCheck for FilesystemCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn check(&self) -> CheckOutcome {
        let dir = self.dir.clone();
        let probe = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut file = tempfile::Builder::new()
                .prefix(".vitals-probe-")
                .tempfile_in(&dir)?;
            file.write_all(b"probe")?;
            file.flush()?;
            // Dropping the handle removes the file.
            Ok(())
        })
        .await;

        match probe {
            Ok(Ok(())) => {
                CheckOutcome::healthy("directory is writable").meta("dir", self.dir.display().to_string())
            }
            Ok(Err(e)) => CheckOutcome::unhealthy(format!(
                "write probe under '{}' failed: {e}",
                self.dir.display()
            )),
            Err(e) => CheckOutcome::unhealthy(format!("write probe task failed: {e}")),
        }
    }
}
