//! # Error Types
//!
//! Error handling for size snapshots and diffs.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

/// Main error type for size snapshot operations
///
/// ## Error Categories
///
/// 1. **Snapshot errors**: UnknownContainer, InvalidSymbol
/// 2. **Serialization errors**: Json
/// 3. **I/O errors**: Io (reading or writing snapshot files)
#[derive(Error, Debug)]
pub enum SizeError
{
    /// A symbol (or an aggregate padding entry) refers to a container that is
    /// not part of the snapshot.
    ///
    /// Every symbol is attributed to a container by name, and that name is the
    /// join key used to line up containers across two snapshots. A dangling
    /// name means the snapshot was produced by a broken tool.
    #[error("Unknown container: {0:?}")]
    UnknownContainer(String),

    /// A symbol record violates one of the model's constraints
    ///
    /// Examples:
    /// - `num_aliases` is zero
    /// - `padding` is larger than `size`
    #[error("Invalid symbol {name:?}: {reason}")]
    InvalidSymbol
    {
        /// Full name of the offending symbol
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// A snapshot could not be parsed or serialized
    #[error("Malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (for snapshot files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, SizeError>`
///
/// ```rust
/// use crtools_size::error::SizeResult;
/// fn foo() -> SizeResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type SizeResult<T> = std::result::Result<T, SizeError>;
