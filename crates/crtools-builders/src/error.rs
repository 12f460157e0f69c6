//! # Error Types
//!
//! Error handling for builder discovery.

use std::process::ExitStatus;

use thiserror::Error;

/// Main error type for builder discovery
///
/// ## Error Categories
///
/// 1. **Build-orchestration errors**: NotAuthenticated, CommandFailed, MissingBuildbucketOutput
/// 2. **Input errors**: InvalidManifest, Json
/// 3. **I/O errors**: Io (buildbot directories, spawning `bb`)
#[derive(Error, Debug)]
pub enum BuilderError
{
    /// The `bb` CLI is not logged in
    ///
    /// ## Solution
    ///
    /// Run `bb auth-login`.
    #[error("You are not logged into bb - run `bb auth-login`.")]
    NotAuthenticated,

    /// A `bb` invocation exited unsuccessfully
    #[error("Command `{command}` failed: {status}")]
    CommandFailed
    {
        /// The command line that was run
        command: String,
        /// Its exit status
        status: ExitStatus,
    },

    /// No build output was found for some CI builders
    ///
    /// These builders may need to be listed as fake CI builders or as
    /// non-Chromium builders in the provider.
    #[error(
        "Did not get Buildbucket output for the following builders. They may need to be added to the fake CI \
         builders or the non-Chromium builders.\n{}",
        .0.join("\n")
    )]
    MissingBuildbucketOutput(Vec<String>),

    /// A provider manifest is inconsistent
    #[error("Invalid builder manifest: {0}")]
    InvalidManifest(String),

    /// JSON input (buildbot files, manifests, `bb` output) could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (reading buildbot directories, running `bb`)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, BuilderError>`
pub type BuilderResult<T> = std::result::Result<T, BuilderError>;
