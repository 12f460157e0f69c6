//! # Builder Discovery
//!
//! Finds the CI builders that run a suite of interest and the try builders
//! that mirror them.
//!
//! CI builders come from the autogenerated `//testing/buildbot` JSON files.
//! Try builders come from the `mirrored_builders` output property of each CI
//! builder's latest build, fetched through a [`BuildbucketClient`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::BuildbucketClient;
use crate::error::{BuilderError, BuilderResult};
use crate::provider::BuilderProvider;
use crate::types::{BuilderEntry, BuilderType};

/// Key present in every autogenerated buildbot JSON file.
pub const AUTOGENERATED_JSON_KEY: &str = "AAAAA1 AUTOGENERATED FILE DO NOT EDIT";

/// Where to look for buildbot JSON files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderOptions
{
    /// Directory of the public buildbot JSON files.
    pub buildbot_dir: PathBuf,
    /// Directory of the internal buildbot JSON files; internal builders are
    /// only included when this is set.
    pub internal_buildbot_dir: Option<PathBuf>,
}

impl BuilderOptions
{
    /// Public builders only.
    pub fn public(buildbot_dir: impl Into<PathBuf>) -> Self
    {
        Self {
            buildbot_dir: buildbot_dir.into(),
            internal_buildbot_dir: None,
        }
    }

    /// Public and internal builders.
    #[must_use]
    pub fn with_internal(mut self, internal_buildbot_dir: impl Into<PathBuf>) -> Self
    {
        self.internal_buildbot_dir = Some(internal_buildbot_dir.into());
        self
    }
}

enum Mirrors
{
    Found(HashSet<BuilderEntry>),
    Missing(BuilderEntry),
}

/// Builder discovery context.
///
/// Owns the harness-specific [`BuilderProvider`] and the [`BuildbucketClient`]
/// used to talk to the build-orchestration service. Construct one per run and
/// pass it to whatever needs builder information.
#[derive(Debug)]
pub struct Builders<P, C>
{
    provider: P,
    client: C,
    options: BuilderOptions,
}

impl<P, C> Builders<P, C>
where
    P: BuilderProvider,
    C: BuildbucketClient,
{
    /// Create a discovery context.
    pub fn new(provider: P, client: C, options: BuilderOptions) -> Self
    {
        Self {
            provider,
            client,
            options,
        }
    }

    /// The harness-specific provider.
    pub fn provider(&self) -> &P
    {
        &self.provider
    }

    /// The client used for build lookups.
    pub fn client(&self) -> &C
    {
        &self.client
    }

    /// CI builders that run `suite` (or any test of interest if `None`).
    ///
    /// ## Errors
    ///
    /// Returns `Io` if a buildbot directory or file cannot be read and `Json`
    /// if a `.json` file in it is malformed.
    pub fn ci_builders(&self, suite: Option<&str>) -> BuilderResult<HashSet<BuilderEntry>>
    {
        info!("Getting CI builders");
        let mut ci_builders = HashSet::new();
        self.collect_ci_builders(&self.options.buildbot_dir, false, suite, &mut ci_builders)?;
        if let Some(internal) = &self.options.internal_buildbot_dir {
            self.collect_ci_builders(internal, true, suite, &mut ci_builders)?;
        }

        let mut names: Vec<&str> = ci_builders.iter().map(|b| b.name.as_str()).collect();
        names.sort_unstable();
        debug!("Got {} CI builders after trimming: {}", ci_builders.len(), names.join(", "));
        Ok(ci_builders)
    }

    fn collect_ci_builders(
        &self,
        dir: &Path,
        is_internal: bool,
        suite: Option<&str>,
        ci_builders: &mut HashSet<BuilderEntry>,
    ) -> BuilderResult<()>
    {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        files.retain(|path| path.extension().is_some_and(|ext| ext == "json"));
        files.sort();

        for path in files {
            let buildbot_json: Value = serde_json::from_slice(&fs::read(&path)?)?;
            let Some(builders) = buildbot_json.as_object() else {
                continue;
            };
            // Skip any JSON files that don't contain builder information.
            if !builders.contains_key(AUTOGENERATED_JSON_KEY) {
                continue;
            }

            for (builder, test_map) in builders {
                // Autogenerated comment keys.
                if builder.contains("AAAA") {
                    continue;
                }
                if self.provider.runs_test_of_interest(test_map, suite) {
                    ci_builders.insert(BuilderEntry::new(builder.clone(), BuilderType::Ci, is_internal));
                }
            }
        }
        Ok(())
    }

    /// Try builders that mirror any of `ci_builders`.
    ///
    /// Lookups run in parallel, one per CI builder.
    ///
    /// ## Errors
    ///
    /// Returns `MissingBuildbucketOutput` naming every CI builder that is
    /// neither fake nor non-Chromium and produced no build output, plus any
    /// error reported by the client.
    ///
    /// ## Panics
    ///
    /// Panics if a mirrored builder name is not of the form `group:name`.
    pub fn try_builders(&self, ci_builders: &HashSet<BuilderEntry>) -> BuilderResult<HashSet<BuilderEntry>>
    {
        info!("Getting try builders");
        let non_chromium = self.provider.non_chromium_builders();
        let fake = self.provider.fake_ci_builders();

        let lookups: Vec<Mirrors> = ci_builders
            .par_iter()
            .map(|ci_builder| self.mirrored_builders_for(ci_builder, &non_chromium, &fake))
            .collect::<BuilderResult<_>>()?;

        let mut mirrored = HashSet::new();
        let mut missing = Vec::new();
        for lookup in lookups {
            match lookup {
                Mirrors::Found(builders) => mirrored.extend(builders),
                Mirrors::Missing(builder) => missing.push(builder.name),
            }
        }

        if !missing.is_empty() {
            missing.sort();
            return Err(BuilderError::MissingBuildbucketOutput(missing));
        }
        debug!("Got {} try builders", mirrored.len());
        Ok(mirrored)
    }

    fn mirrored_builders_for(
        &self,
        ci_builder: &BuilderEntry,
        non_chromium: &HashSet<BuilderEntry>,
        fake: &HashMap<BuilderEntry, HashSet<BuilderEntry>>,
    ) -> BuilderResult<Mirrors>
    {
        if non_chromium.contains(ci_builder) {
            debug!("{} is a non-Chromium CI builder", ci_builder.name);
            return Ok(Mirrors::Found(HashSet::new()));
        }

        if let Some(mirrors) = fake.get(ci_builder) {
            debug!("{} is a fake CI builder mirrored by {} try builders", ci_builder.name, mirrors.len());
            return Ok(Mirrors::Found(mirrors.clone()));
        }

        let Some(output) = self.client.latest_build_json(ci_builder)? else {
            debug!("Did not get Buildbucket output for builder {}", ci_builder.name);
            return Ok(Mirrors::Missing(ci_builder.clone()));
        };

        Ok(Mirrors::Found(parse_mirrored_builders(ci_builder, &output)?))
    }
}

/// Extract the try builders listed in a build's `mirrored_builders` output
/// property. Mirrors inherit `ci_builder`'s internal flag.
///
/// ## Errors
///
/// Returns `Json` if `output` is not JSON.
///
/// ## Panics
///
/// Panics if a mirror is not of the form `group:name`, e.g.
/// `tryserver.chromium.android:android-marshmallow-arm64-rel`.
pub fn parse_mirrored_builders(ci_builder: &BuilderEntry, output: &str) -> BuilderResult<HashSet<BuilderEntry>>
{
    let build: Value = serde_json::from_str(output)?;
    let mirrors = build
        .pointer("/output/properties/mirrored_builders")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut builders = HashSet::new();
    for mirror in mirrors.iter().filter_map(Value::as_str) {
        let split: Vec<&str> = mirror.split(':').collect();
        assert_eq!(split.len(), 2, "mirrored builder {mirror:?} is not of the form group:name");
        debug!("Got mirrored builder for {}: {}", ci_builder.name, split[1]);
        builders.insert(BuilderEntry::new(split[1], BuilderType::Try, ci_builder.is_internal));
    }
    Ok(builders)
}
