//! # Builder Providers
//!
//! The parts of builder discovery that depend on which tests are being
//! looked at: which builders run them, and which builders need special
//! handling because the build-orchestration service cannot describe them.
//!
//! Implement [`BuilderProvider`] for a new test harness and hand it to
//! [`crate::Builders::new`].

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{BuilderError, BuilderResult};
use crate::types::{BuilderEntry, BuilderType};

/// Test lists of a builder's test spec that can hold tests of interest.
const TEST_LISTS: &[&str] = &["isolated_scripts", "gtest_tests"];

fn entry_runs_test(entry: &Value, isolates: &HashSet<String>, suite: Option<&str>) -> bool
{
    let isolate = entry
        .get("isolate_name")
        .or_else(|| entry.get("test"))
        .and_then(Value::as_str);
    if !isolate.is_some_and(|name| isolates.contains(name)) {
        return false;
    }

    let Some(suite) = suite else {
        return true;
    };
    let named = |field: &str| entry.get(field).and_then(Value::as_str) == Some(suite);
    let in_args = entry
        .get("args")
        .and_then(Value::as_array)
        .is_some_and(|args| args.iter().any(|arg| arg.as_str() == Some(suite)));
    named("name") || named("telemetry_test_name") || in_args
}

/// Harness-specific knowledge used during builder discovery.
pub trait BuilderProvider: Sync
{
    /// Whether a builder's test spec (one value of a buildbot JSON file)
    /// runs a test this provider cares about.
    ///
    /// `suite` narrows the check to one suite, e.g. a Telemetry benchmark.
    ///
    /// By default a builder qualifies when one of its `isolated_scripts` or
    /// `gtest_tests` entries uses an isolate from
    /// [`BuilderProvider::isolate_names`] (by `isolate_name`, falling back to
    /// `test`) and, if a suite is requested, names that suite as its `name`,
    /// its `telemetry_test_name` or one of its `args`.
    fn runs_test_of_interest(&self, test_map: &Value, suite: Option<&str>) -> bool
    {
        let isolates = self.isolate_names();
        TEST_LISTS
            .iter()
            .filter_map(|list| test_map.get(*list).and_then(Value::as_array))
            .flatten()
            .any(|entry| entry_runs_test(entry, &isolates, suite))
    }

    /// Names of the isolates this provider cares about.
    fn isolate_names(&self) -> HashSet<String>;

    /// CI builders that do not exist, mapped to the try builders that mirror
    /// them and do exist.
    fn fake_ci_builders(&self) -> HashMap<BuilderEntry, HashSet<BuilderEntry>>;

    /// Builders listed in the buildbot files that are not under the Chromium
    /// projects and therefore have no mirror information.
    fn non_chromium_builders(&self) -> HashSet<BuilderEntry>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ManifestBuilder
{
    Name(String),
    Entry
    {
        name: String,
        #[serde(default)]
        internal: bool,
    },
}

impl ManifestBuilder
{
    fn into_entry(self, builder_type: BuilderType) -> BuilderEntry
    {
        match self {
            Self::Name(name) => BuilderEntry::new(name, builder_type, false),
            Self::Entry { name, internal } => BuilderEntry::new(name, builder_type, internal),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestFile
{
    isolate_names: Vec<String>,
    #[serde(default)]
    fake_ci_builders: Vec<FakeCiBuilder>,
    #[serde(default)]
    non_chromium_builders: Vec<ManifestBuilder>,
}

#[derive(Debug, Clone, Deserialize)]
struct FakeCiBuilder
{
    builder: ManifestBuilder,
    mirrors: Vec<ManifestBuilder>,
}

/// [`BuilderProvider`] driven by a JSON manifest.
///
/// ```json
/// {
///   "isolate_names": ["telemetry_gpu_integration_test"],
///   "fake_ci_builders": [
///     { "builder": "Optional Android Release (Nexus 5X)",
///       "mirrors": ["android_optional_gpu_tests_rel"] }
///   ],
///   "non_chromium_builders": ["Win V8 FYI Release (NVIDIA)", { "name": "Internal FYI", "internal": true }]
/// }
/// ```
///
/// Tests of interest are found with the default
/// [`BuilderProvider::runs_test_of_interest`] over the listed isolates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestProvider
{
    isolate_names: HashSet<String>,
    fake_ci_builders: HashMap<BuilderEntry, HashSet<BuilderEntry>>,
    non_chromium_builders: HashSet<BuilderEntry>,
}

impl ManifestProvider
{
    /// Parse a manifest.
    ///
    /// ## Errors
    ///
    /// - `Json`: the manifest is not valid JSON of the expected shape
    /// - `InvalidManifest`: no isolate names, or a fake CI builder without mirrors
    pub fn from_reader(reader: impl Read) -> BuilderResult<Self>
    {
        let manifest: ManifestFile = serde_json::from_reader(reader)?;
        if manifest.isolate_names.is_empty() {
            return Err(BuilderError::InvalidManifest("no isolate names listed".to_string()));
        }

        let mut fake_ci_builders = HashMap::new();
        for fake in manifest.fake_ci_builders {
            let builder = fake.builder.into_entry(BuilderType::Ci);
            if fake.mirrors.is_empty() {
                return Err(BuilderError::InvalidManifest(format!(
                    "fake CI builder {builder} has no mirrors"
                )));
            }
            let mirrors = fake
                .mirrors
                .into_iter()
                .map(|m| m.into_entry(BuilderType::Try))
                .collect();
            fake_ci_builders.insert(builder, mirrors);
        }

        Ok(Self {
            isolate_names: manifest.isolate_names.into_iter().collect(),
            fake_ci_builders,
            non_chromium_builders: manifest
                .non_chromium_builders
                .into_iter()
                .map(|b| b.into_entry(BuilderType::Ci))
                .collect(),
        })
    }

    /// Load a manifest from disk.
    ///
    /// ## Errors
    ///
    /// Returns `Io` if the file cannot be opened, plus the errors of
    /// [`ManifestProvider::from_reader`].
    pub fn load(path: impl AsRef<Path>) -> BuilderResult<Self>
    {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

impl BuilderProvider for ManifestProvider
{
    fn isolate_names(&self) -> HashSet<String>
    {
        self.isolate_names.clone()
    }

    fn fake_ci_builders(&self) -> HashMap<BuilderEntry, HashSet<BuilderEntry>>
    {
        self.fake_ci_builders.clone()
    }

    fn non_chromium_builders(&self) -> HashSet<BuilderEntry>
    {
        self.non_chromium_builders.clone()
    }
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::*;

    const MANIFEST: &str = r#"{
        "isolate_names": ["telemetry_gpu_integration_test"],
        "fake_ci_builders": [{ "builder": "Fake CI", "mirrors": ["try-a", { "name": "try-b", "internal": true }] }],
        "non_chromium_builders": ["ANGLE Linux"]
    }"#;

    fn provider() -> ManifestProvider
    {
        ManifestProvider::from_reader(MANIFEST.as_bytes()).unwrap()
    }

    #[test]
    fn test_manifest_parses_mixed_builder_forms()
    {
        let provider = provider();
        let fake = provider.fake_ci_builders();
        let mirrors = &fake[&BuilderEntry::new("Fake CI", BuilderType::Ci, false)];
        assert!(mirrors.contains(&BuilderEntry::new("try-a", BuilderType::Try, false)));
        assert!(mirrors.contains(&BuilderEntry::new("try-b", BuilderType::Try, true)));
        assert!(provider
            .non_chromium_builders()
            .contains(&BuilderEntry::new("ANGLE Linux", BuilderType::Ci, false)));
    }

    #[test]
    fn test_runs_test_of_interest_by_isolate()
    {
        let provider = provider();
        let gpu = json!({
            "isolated_scripts": [{ "isolate_name": "telemetry_gpu_integration_test", "name": "webgl_conformance" }]
        });
        let other = json!({ "gtest_tests": [{ "test": "base_unittests" }] });
        assert!(provider.runs_test_of_interest(&gpu, None));
        assert!(!provider.runs_test_of_interest(&other, None));
    }

    #[test]
    fn test_runs_test_of_interest_by_suite()
    {
        let provider = provider();
        let test_map = json!({
            "isolated_scripts": [{
                "isolate_name": "telemetry_gpu_integration_test",
                "name": "webgl2_conformance_tests",
                "args": ["webgl_conformance", "--webgl-version=2"]
            }]
        });
        assert!(provider.runs_test_of_interest(&test_map, Some("webgl_conformance")));
        assert!(provider.runs_test_of_interest(&test_map, Some("webgl2_conformance_tests")));
        assert!(!provider.runs_test_of_interest(&test_map, Some("pixel")));
    }

    struct GtestProvider;

    impl BuilderProvider for GtestProvider
    {
        fn isolate_names(&self) -> HashSet<String>
        {
            HashSet::from(["base_unittests".to_string()])
        }

        fn fake_ci_builders(&self) -> HashMap<BuilderEntry, HashSet<BuilderEntry>>
        {
            HashMap::new()
        }

        fn non_chromium_builders(&self) -> HashSet<BuilderEntry>
        {
            HashSet::new()
        }
    }

    #[test]
    fn test_default_matching_uses_isolate_names()
    {
        let provider = GtestProvider;
        let base = json!({ "gtest_tests": [{ "test": "base_unittests", "name": "base_unittests" }] });
        let gpu = json!({
            "isolated_scripts": [{ "isolate_name": "telemetry_gpu_integration_test", "name": "pixel" }]
        });
        assert!(provider.runs_test_of_interest(&base, None));
        assert!(provider.runs_test_of_interest(&base, Some("base_unittests")));
        assert!(!provider.runs_test_of_interest(&gpu, None));
    }

    #[test]
    fn test_manifest_without_isolates_rejected()
    {
        let err = ManifestProvider::from_reader(r#"{ "isolate_names": [] }"#.as_bytes()).unwrap_err();
        assert!(matches!(err, BuilderError::InvalidManifest(_)));
    }

    #[test]
    fn test_fake_builder_without_mirrors_rejected()
    {
        let manifest = r#"{ "isolate_names": ["x"], "fake_ci_builders": [{ "builder": "Fake", "mirrors": [] }] }"#;
        let err = ManifestProvider::from_reader(manifest.as_bytes()).unwrap_err();
        assert!(matches!(err, BuilderError::InvalidManifest(msg) if msg.contains("Fake")));
    }
}
