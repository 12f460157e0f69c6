//! Builder identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a builder runs post-submit or on pending changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuilderType
{
    /// Continuous-integration builder.
    Ci,
    /// Try builder.
    Try,
}

impl fmt::Display for BuilderType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            BuilderType::Ci => "ci",
            BuilderType::Try => "try",
        };
        write!(f, "{label}")
    }
}

/// A builder to query results from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuilderEntry
{
    /// Builder name, without its group.
    pub name: String,
    /// CI or try.
    pub builder_type: BuilderType,
    /// Whether the builder lives in the internal project.
    pub is_internal: bool,
}

impl BuilderEntry
{
    /// Create an entry.
    pub fn new(name: impl Into<String>, builder_type: BuilderType, is_internal: bool) -> Self
    {
        Self {
            name: name.into(),
            builder_type,
            is_internal,
        }
    }

    /// Build-orchestration project the builder belongs to.
    #[must_use]
    pub fn project(&self) -> &'static str
    {
        if self.is_internal {
            "chrome"
        } else {
            "chromium"
        }
    }

    /// `project/bucket/name` path understood by `bb`.
    #[must_use]
    pub fn buildbucket_path(&self) -> String
    {
        format!("{}/{}/{}", self.project(), self.builder_type, self.name)
    }
}

impl fmt::Display for BuilderEntry
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.name)
    }
}
