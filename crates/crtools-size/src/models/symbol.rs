//! Symbol and section types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix shared by every synthetic symbol that accounts for bytes which do
/// not belong to any real symbol.
pub const OVERHEAD_PREFIX: &str = "Overhead: ";

/// Well-known section of a binary.
///
/// Several section names can collapse onto one `Section` (clang emits
/// `.data.rel.ro` where gcc emits `.data.rel.ro.local`), which is why matching
/// always compares sections rather than raw section names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Section
{
    /// Zero-initialized data (`.bss`, `.bss.rel.ro`).
    Bss,
    /// Initialized data (`.data`).
    Data,
    /// Relocated read-only data (`.data.rel.ro`, `.data.rel.ro.local`).
    DataRelRo,
    /// Read-only data (`.rodata`).
    Rodata,
    /// Machine code (`.text`).
    Text,
    /// Dex file overhead (`.dex`).
    Dex,
    /// Dex methods (`.dex.method`).
    DexMethod,
    /// Untranslated pak resources (`.pak.nontranslated`).
    PakNontranslated,
    /// Translated pak resources (`.pak.translations`).
    PakTranslations,
    /// Everything else.
    Other,
}

impl Section
{
    /// Classify a raw section name.
    #[must_use]
    pub fn from_name(section_name: &str) -> Self
    {
        match section_name {
            ".bss" | ".bss.rel.ro" => Self::Bss,
            ".data" => Self::Data,
            ".data.rel.ro" | ".data.rel.ro.local" => Self::DataRelRo,
            ".rodata" => Self::Rodata,
            ".text" => Self::Text,
            ".dex" => Self::Dex,
            ".dex.method" => Self::DexMethod,
            ".pak.nontranslated" => Self::PakNontranslated,
            ".pak.translations" => Self::PakTranslations,
            _ => Self::Other,
        }
    }

    /// Single-character code used in compact reports.
    #[must_use]
    pub const fn as_char(self) -> char
    {
        match self {
            Self::Bss => 'b',
            Self::Data => 'd',
            Self::DataRelRo => 'R',
            Self::Rodata => 'r',
            Self::Text => 't',
            Self::Dex => 'x',
            Self::DexMethod => 'm',
            Self::PakNontranslated => 'P',
            Self::PakTranslations => 'p',
            Self::Other => 'o',
        }
    }
}

impl fmt::Display for Section
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.as_char())
    }
}

/// Bit set of per-symbol attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolFlags(u32);

impl SymbolFlags
{
    /// Symbol lives in an anonymous namespace.
    pub const ANONYMOUS: Self = Self(1);
    /// Symbol is placed in the startup section.
    pub const STARTUP: Self = Self(1 << 1);
    /// Symbol is placed in the unlikely-executed section.
    pub const UNLIKELY: Self = Self(1 << 2);
    /// Symbol lives in a `.rel` section.
    pub const REL: Self = Self(1 << 3);
    /// Symbol lives in a `.rel.local` section.
    pub const REL_LOCAL: Self = Self(1 << 4);
    /// Symbol comes from a generated source file.
    pub const GENERATED_SOURCE: Self = Self(1 << 5);
    /// Symbol is a compiler-generated clone.
    pub const CLONE: Self = Self(1 << 6);
    /// Symbol is placed in the hot section.
    pub const HOT: Self = Self(1 << 7);
    /// Several symbols share this symbol's full name.
    pub const NOT_UNIQUE: Self = Self(1 << 8);

    /// No flags set.
    #[must_use]
    pub const fn empty() -> Self
    {
        Self(0)
    }

    /// Build from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self
    {
        Self(bits)
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32
    {
        self.0
    }

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool
    {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SymbolFlags
{
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self
    {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for SymbolFlags
{
    fn bitor_assign(&mut self, rhs: Self)
    {
        self.0 |= rhs.0;
    }
}

const fn default_num_aliases() -> u32
{
    1
}

/// A named, sized unit of compiled output.
///
/// Sizes are signed: synthetic overhead symbols created by a diff can carry a
/// negative size when padding shrank between two builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol
{
    /// Name of the container (binary or library) that owns this symbol.
    #[serde(default)]
    pub container_name: String,
    /// Raw section name, e.g. `.text` or `.data.rel.ro.local`.
    pub section_name: String,
    /// Start address, if the symbol has one.
    #[serde(default)]
    pub address: u64,
    /// Size in bytes, padding included.
    pub size: i64,
    /// Bytes before this symbol that were inserted for alignment.
    #[serde(default)]
    pub padding: i64,
    /// Fully qualified name including the signature.
    #[serde(default)]
    pub full_name: String,
    /// Full name with template arguments and signature removed.
    #[serde(default)]
    pub template_name: String,
    /// Unqualified name.
    #[serde(default)]
    pub name: String,
    /// Path of the source file the symbol was compiled from (empty if unknown).
    #[serde(default)]
    pub source_path: String,
    /// Path of the object file the symbol was linked from (empty if unknown).
    #[serde(default)]
    pub object_path: String,
    /// Attribute bits.
    #[serde(default)]
    pub flags: SymbolFlags,
    /// Number of symbols sharing this symbol's address range (1 when unaliased).
    #[serde(default = "default_num_aliases")]
    pub num_aliases: u32,
}

impl Symbol
{
    /// Create an unnamed symbol in the given section.
    pub fn new(section_name: impl Into<String>, size: i64) -> Self
    {
        Self {
            container_name: String::new(),
            section_name: section_name.into(),
            address: 0,
            size,
            padding: 0,
            full_name: String::new(),
            template_name: String::new(),
            name: String::new(),
            source_path: String::new(),
            object_path: String::new(),
            flags: SymbolFlags::empty(),
            num_aliases: 1,
        }
    }

    /// Set the full, template and short names to the same value.
    pub fn set_name(&mut self, name: impl Into<String>)
    {
        let name = name.into();
        self.full_name.clone_from(&name);
        self.template_name.clone_from(&name);
        self.name = name;
    }

    /// Section classification of [`Symbol::section_name`].
    #[must_use]
    pub fn section(&self) -> Section
    {
        Section::from_name(&self.section_name)
    }

    /// Size in bytes, padding excluded.
    #[must_use]
    pub fn size_without_padding(&self) -> i64
    {
        self.size - self.padding
    }

    /// Size divided evenly among aliases.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pss(&self) -> f64
    {
        self.size as f64 / f64::from(self.num_aliases.max(1))
    }

    /// Padding divided evenly among aliases.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn padding_pss(&self) -> f64
    {
        self.padding as f64 / f64::from(self.num_aliases.max(1))
    }

    /// Source path when known, otherwise the object path.
    ///
    /// Source paths are preferred because object paths embed the build target
    /// name (which can be renamed) and, for Java lambdas, a content hash.
    #[must_use]
    pub fn source_or_object_path(&self) -> &str
    {
        if self.source_path.is_empty() {
            &self.object_path
        } else {
            &self.source_path
        }
    }

    /// Whether this symbol is synthetic overhead rather than real output.
    #[must_use]
    pub fn is_overhead(&self) -> bool
    {
        self.full_name.starts_with(OVERHEAD_PREFIX)
    }

    /// Whether [`Symbol::full_name`] identifies this symbol on its own.
    ///
    /// Star-prefixed placeholders (`** symbol gap 3`) and overhead symbols
    /// repeat across containers and sections by construction.
    #[must_use]
    pub fn is_name_unique(&self) -> bool
    {
        !(self.flags.contains(SymbolFlags::NOT_UNIQUE) || self.full_name.starts_with('*') || self.is_overhead())
    }
}

impl fmt::Display for Symbol
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}@{} {} ({} bytes)", self.container_name, self.section(), self.full_name, self.size)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_section_from_name_collapses_rel_ro_variants()
    {
        assert_eq!(Section::from_name(".data.rel.ro"), Section::DataRelRo);
        assert_eq!(Section::from_name(".data.rel.ro.local"), Section::DataRelRo);
        assert_eq!(Section::from_name(".text"), Section::Text);
        assert_eq!(Section::from_name(".ARM.exidx"), Section::Other);
    }

    #[test]
    fn test_flags_contains()
    {
        let flags = SymbolFlags::ANONYMOUS | SymbolFlags::NOT_UNIQUE;
        assert!(flags.contains(SymbolFlags::NOT_UNIQUE));
        assert!(!flags.contains(SymbolFlags::HOT));
        assert_eq!(flags.bits(), 0b1_0000_0001);
    }

    #[test]
    fn test_path_prefers_source()
    {
        let mut sym = Symbol::new(".text", 10);
        sym.object_path = "obj/base/base/a.o".to_string();
        assert_eq!(sym.source_or_object_path(), "obj/base/base/a.o");

        sym.source_path = "base/a.cc".to_string();
        assert_eq!(sym.source_or_object_path(), "base/a.cc");
    }

    #[test]
    fn test_name_uniqueness()
    {
        let mut sym = Symbol::new(".text", 10);
        sym.set_name("Foo::Bar()");
        assert!(sym.is_name_unique());

        sym.flags |= SymbolFlags::NOT_UNIQUE;
        assert!(!sym.is_name_unique());

        let mut gap = Symbol::new(".text", 4);
        gap.set_name("** symbol gap 2");
        assert!(!gap.is_name_unique());
    }

    #[test]
    fn test_pss_divides_among_aliases()
    {
        let mut sym = Symbol::new(".text", 30);
        sym.padding = 6;
        sym.num_aliases = 3;
        assert!((sym.pss() - 10.0).abs() < f64::EPSILON);
        assert!((sym.padding_pss() - 2.0).abs() < f64::EPSILON);
        assert_eq!(sym.size_without_padding(), 24);
    }
}
