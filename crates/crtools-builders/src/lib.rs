//! # crtools-builders
//!
//! CI and try builder discovery for crtools.
//!
//! A [`Builders`] context bundles everything discovery needs:
//! - a [`BuilderProvider`] with the harness-specific rules (which tests are of
//!   interest, which builders need special handling)
//! - a [`BuildbucketClient`] for the build-orchestration service
//! - the [`BuilderOptions`] naming the buildbot JSON directories
//!
//! ```rust,no_run
//! use crtools_builders::{BbCli, BuilderOptions, Builders, ManifestProvider};
//!
//! let provider = ManifestProvider::load("gpu_builders.json")?;
//! let builders = Builders::new(provider, BbCli::default(), BuilderOptions::public("testing/buildbot"));
//! let ci = builders.ci_builders(Some("webgl_conformance"))?;
//! let try_builders = builders.try_builders(&ci)?;
//! println!("{} CI builders, {} try builders", ci.len(), try_builders.len());
//! # Ok::<(), crtools_builders::BuilderError>(())
//! ```

pub mod client;
pub mod discovery;
pub mod error;
pub mod provider;
pub mod types;

pub use client::{BbCli, BuildbucketClient};
pub use discovery::{parse_mirrored_builders, BuilderOptions, Builders, AUTOGENERATED_JSON_KEY};
// Re-export commonly used types
pub use error::{BuilderError, BuilderResult};
pub use provider::{BuilderProvider, ManifestProvider};
pub use types::{BuilderEntry, BuilderType};
