//! # Error Types
//!
//! General error handling for symbol resolution.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::{Address, Architecture};

/// Main error type for resolution and object operations
///
/// This enum represents all the ways a lookup or an object access can fail.
/// Note that a resolver declining a name is *not* an error: that is expressed
/// through [`crate::finder::Resolution::NotApplicable`] and never leaves the
/// dispatcher.
///
/// ## Error Categories
///
/// 1. **Lookup errors**: NotFound
/// 2. **Target errors**: UnsupportedArch, UnsupportedConfig
/// 3. **Memory errors**: Fault, Io
/// 4. **Object errors**: InvalidCast, NoValue
/// 5. **Input errors**: InvalidArgument, Parse
#[derive(Error, Debug)]
pub enum KscopeError
{
    /// No resolver produced an object for the name
    ///
    /// This is the soft, expected outcome of a lookup for a symbol that does
    /// not exist on the target. Use [`KscopeError::is_not_found`] to tell it
    /// apart from hard failures.
    #[error("Symbol not found: {0}")]
    NotFound(String),

    /// The symbol was recognized but cannot be computed for this architecture
    #[error("{symbol} is not supported on {arch}")]
    UnsupportedArch
    {
        /// Name of the symbol being resolved
        symbol: String,
        /// Architecture of the attached target
        arch: Architecture,
    },

    /// The symbol was recognized but the target configuration does not allow
    /// computing it (or the configuration is unknown)
    #[error("{symbol} cannot be derived: {reason}")]
    UnsupportedConfig
    {
        /// Name of the symbol being resolved
        symbol: String,
        /// What is missing from the configuration
        reason: String,
    },

    /// The target address is not mapped or not readable
    ///
    /// Raised by memory backends for holes in a snapshot, unmapped process
    /// pages, or registers that are not available.
    #[error("Memory fault reading {length} bytes at {address}")]
    Fault
    {
        /// First address of the failed read
        address: Address,
        /// Number of bytes requested
        length: usize,
    },

    /// I/O error from a memory backend or an input file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The object cannot be converted to the requested type
    #[error("Invalid cast from {from} to {to}")]
    InvalidCast
    {
        /// Source type name
        from: String,
        /// Target type name
        to: String,
    },

    /// The object exists but has no representable value (optimized out)
    #[error("Object has no value")]
    NoValue,

    /// Invalid argument passed to a core function
    ///
    /// Examples:
    /// - Buffer length does not match the type size
    /// - Member lookup on a non-compound type
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed input (kconfig text, symbol map, object file)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl KscopeError
{
    /// Whether this error means "the symbol does not exist here"
    ///
    /// ```rust
    /// use kscope_core::KscopeError;
    ///
    /// assert!(KscopeError::NotFound("jiffies".into()).is_not_found());
    /// assert!(!KscopeError::NoValue.is_not_found());
    /// ```
    #[must_use]
    pub fn is_not_found(&self) -> bool
    {
        matches!(self, KscopeError::NotFound(_))
    }

    /// Whether this error came from a failed memory access
    #[must_use]
    pub fn is_memory_error(&self) -> bool
    {
        matches!(self, KscopeError::Fault { .. } | KscopeError::Io(_))
    }
}

/// Convenience type alias for `Result<T, KscopeError>`
///
/// ```rust
/// use kscope_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, KscopeError>;
