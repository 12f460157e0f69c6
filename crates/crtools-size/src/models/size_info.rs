//! Size snapshots.
//!
//! A [`SizeInfo`] is everything known about the size of one build: the
//! containers it produced and every symbol inside them. Snapshots are stored
//! as JSON:
//!
//! ```json
//! {
//!   "metadata": { "git_revision": "abc123" },
//!   "containers": [{ "name": "libchrome.so" }],
//!   "symbols": [
//!     { "container_name": "libchrome.so", "section_name": ".text", "size": 64,
//!       "padding": 2, "full_name": "Foo::Bar()", "name": "Bar", "source_path": "foo.cc" }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Container, Symbol};
use crate::error::{SizeError, SizeResult};

#[derive(Serialize, Deserialize)]
struct SnapshotFile
{
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    containers: Vec<Container>,
    #[serde(default)]
    symbols: Vec<Symbol>,
}

/// Immutable snapshot of one build.
#[derive(Debug, Clone, Default)]
pub struct SizeInfo
{
    /// Containers in build order.
    pub containers: Vec<Arc<Container>>,
    /// Every symbol of every container, in snapshot order.
    pub raw_symbols: Vec<Arc<Symbol>>,
    /// Free-form build metadata.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl SizeInfo
{
    /// Build a snapshot, checking that symbols are well formed.
    ///
    /// ## Errors
    ///
    /// - `UnknownContainer`: a symbol names a container not in `containers`
    /// - `InvalidSymbol`: `num_aliases` is zero or padding is out of range
    pub fn new(containers: Vec<Container>, symbols: Vec<Symbol>) -> SizeResult<Self>
    {
        let names: HashSet<&str> = containers.iter().map(|c| c.name.as_str()).collect();
        for sym in &symbols {
            validate_symbol(sym, &names)?;
        }

        Ok(Self {
            containers: containers.into_iter().map(Arc::new).collect(),
            raw_symbols: symbols.into_iter().map(Arc::new).collect(),
            metadata: BTreeMap::new(),
        })
    }

    /// Parse a JSON snapshot.
    ///
    /// ## Errors
    ///
    /// Returns `Json` for malformed input and the validation errors of
    /// [`SizeInfo::new`].
    pub fn from_reader(reader: impl Read) -> SizeResult<Self>
    {
        let file: SnapshotFile = serde_json::from_reader(reader)?;
        let mut info = Self::new(file.containers, file.symbols)?;
        info.metadata = file.metadata;
        Ok(info)
    }

    /// Load a JSON snapshot from disk.
    ///
    /// ## Errors
    ///
    /// Returns `Io` if the file cannot be opened, plus the errors of
    /// [`SizeInfo::from_reader`].
    pub fn load(path: impl AsRef<Path>) -> SizeResult<Self>
    {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading size snapshot");
        let info = Self::from_reader(BufReader::new(File::open(path)?))?;
        debug!(
            containers = info.containers.len(),
            symbols = info.raw_symbols.len(),
            "Loaded size snapshot"
        );
        Ok(info)
    }

    /// Write this snapshot as JSON.
    ///
    /// ## Errors
    ///
    /// Returns `Json` or `Io` if serialization or writing fails.
    pub fn to_writer(&self, writer: impl Write) -> SizeResult<()>
    {
        let file = SnapshotFile {
            metadata: self.metadata.clone(),
            containers: self.containers.iter().map(|c| Container::clone(c)).collect(),
            symbols: self.raw_symbols.iter().map(|s| Symbol::clone(s)).collect(),
        };
        serde_json::to_writer_pretty(writer, &file)?;
        Ok(())
    }

    /// Save this snapshot to disk as JSON.
    ///
    /// ## Errors
    ///
    /// Returns `Io` if the file cannot be created, plus the errors of
    /// [`SizeInfo::to_writer`].
    pub fn save(&self, path: impl AsRef<Path>) -> SizeResult<()>
    {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Look up a container by name.
    #[must_use]
    pub fn container(&self, name: &str) -> Option<&Arc<Container>>
    {
        self.containers.iter().find(|c| c.name == name)
    }
}

fn validate_symbol(sym: &Symbol, containers: &HashSet<&str>) -> SizeResult<()>
{
    if !containers.contains(sym.container_name.as_str()) {
        return Err(SizeError::UnknownContainer(sym.container_name.clone()));
    }
    if sym.num_aliases == 0 {
        return Err(SizeError::InvalidSymbol {
            name: sym.full_name.clone(),
            reason: "num_aliases must be at least 1".to_string(),
        });
    }
    if !sym.is_overhead() && (sym.padding < 0 || sym.padding > sym.size) {
        return Err(SizeError::InvalidSymbol {
            name: sym.full_name.clone(),
            reason: format!("padding {} outside of 0..={}", sym.padding, sym.size),
        });
    }
    Ok(())
}
