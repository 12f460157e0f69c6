//! Containers: the binaries or libraries that own symbols.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Named grouping of symbols, e.g. `libchrome.so` inside an APK.
///
/// The name is the stable join key used to line containers up across two
/// snapshots; the short name is a compact label for reports and gets
/// reassigned whenever a new list of containers is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container
{
    /// Stable name.
    pub name: String,
    /// Compact label used in reports.
    #[serde(default)]
    pub short_name: String,
    /// Free-form build metadata (gn args, toolchain, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Container
{
    /// Create a container with no metadata.
    pub fn new(name: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            short_name: String::new(),
            metadata: BTreeMap::new(),
        }
    }
}

/// A container as it appears in both snapshots of a diff.
///
/// At least one side is present. An unnamed container is a real container,
/// not a missing one.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaContainer
{
    /// Name shared by both sides.
    pub name: String,
    /// Compact label for this delta.
    pub short_name: String,
    /// Container in the "before" snapshot, if it existed then.
    pub before: Option<Arc<Container>>,
    /// Container in the "after" snapshot, if it exists now.
    pub after: Option<Arc<Container>>,
}

impl DeltaContainer
{
    /// Whether the container only exists in the "after" snapshot.
    #[must_use]
    pub fn is_added(&self) -> bool
    {
        self.before.is_none()
    }

    /// Whether the container only exists in the "before" snapshot.
    #[must_use]
    pub fn is_removed(&self) -> bool
    {
        self.after.is_none()
    }
}

/// Assign positional short names (`"0"`, `"1"`, ...) in list order.
pub fn assign_short_names(containers: &mut [DeltaContainer])
{
    for (index, container) in containers.iter_mut().enumerate() {
        container.short_name = index.to_string();
    }
}
