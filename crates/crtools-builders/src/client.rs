//! # Buildbucket Client
//!
//! Access to the build-orchestration service. The production client shells
//! out to the `bb` CLI; tests substitute their own [`BuildbucketClient`].

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::error::{BuilderError, BuilderResult};
use crate::types::BuilderEntry;

/// Source of build information for CI builders.
pub trait BuildbucketClient: Sync
{
    /// JSON description (with output properties) of the most recent completed
    /// build of `builder`, or `None` if the service returned nothing.
    ///
    /// ## Errors
    ///
    /// Implementations report authentication, process and I/O failures.
    fn latest_build_json(&self, builder: &BuilderEntry) -> BuilderResult<Option<String>>;
}

/// [`BuildbucketClient`] backed by the `bb` command-line tool.
///
/// The login check (`bb auth-info`) runs once per client, on first use.
#[derive(Debug)]
pub struct BbCli
{
    binary: PathBuf,
    authenticated: AtomicBool,
}

impl Default for BbCli
{
    fn default() -> Self
    {
        Self::new("bb")
    }
}

impl BbCli
{
    /// Use the `bb` binary at `binary` (looked up on `PATH` if relative).
    pub fn new(binary: impl Into<PathBuf>) -> Self
    {
        Self {
            binary: binary.into(),
            authenticated: AtomicBool::new(false),
        }
    }

    fn ensure_authenticated(&self) -> BuilderResult<()>
    {
        if self.authenticated.load(Ordering::Acquire) {
            return Ok(());
        }

        let status = Command::new(&self.binary)
            .arg("auth-info")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if !status.success() {
            return Err(BuilderError::NotAuthenticated);
        }

        self.authenticated.store(true, Ordering::Release);
        Ok(())
    }
}

impl BuildbucketClient for BbCli
{
    fn latest_build_json(&self, builder: &BuilderEntry) -> BuilderResult<Option<String>>
    {
        self.ensure_authenticated()?;

        // The ID of the most recent completed build, fed into `bb get`.
        let path = builder.buildbucket_path();
        let mut ls = Command::new(&self.binary)
            .args(["ls", "-id", "-1", "-status", "ended", &path])
            .stdout(Stdio::piped())
            .spawn()?;
        let ids = ls
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("bb ls produced no stdout handle"))?;

        let output = Command::new(&self.binary)
            .args(["get", "-A", "-json"])
            .stdin(Stdio::from(ids))
            .stderr(Stdio::inherit())
            .output()?;
        let ls_status = ls.wait()?;
        if !ls_status.success() {
            warn!(builder = %builder, status = %ls_status, "bb ls failed");
        }
        if !output.status.success() {
            return Err(BuilderError::CommandFailed {
                command: format!("{} get -A -json", self.binary.display()),
                status: output.status,
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(builder = %builder, bytes = text.len(), "Got Buildbucket output");
        Ok((!text.is_empty()).then_some(text))
    }
}
