//! # kscope-core
//!
//! Object and symbol resolution for live and post-mortem kernel introspection.
//!
//! This crate provides:
//! - An ordered chain of resolvers that turn a name into a typed [`Object`]
//! - Synthetic kernel symbols (`PAGE_SIZE`, `jiffies`, `vmemmap`, ...) derived
//!   from the target's architecture and build configuration
//! - The platform context (architecture, word size, byte order, kernel
//!   release and config) every resolver consults
//! - Memory backends for core dumps, live processes and in-memory snapshots
//! - Glue for plugging a debug-info catalog into the chain
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kscope_core::memory::SegmentMemory;
//! use kscope_core::platform::{KernelConfig, PlatformBuilder};
//! use kscope_core::types::Architecture;
//! use kscope_core::Program;
//!
//! let platform = PlatformBuilder::new(Architecture::Ppc64)
//!     .kernel_release("6.6.0")
//!     .kernel_config(KernelConfig::new().with("CONFIG_PPC_64K_PAGES", "y"))
//!     .build()?;
//! let program = Program::new(platform, Arc::new(SegmentMemory::new()));
//! assert_eq!(program.read_unsigned(&program.constant("PAGE_SIZE")?)?, 65536);
//! # Ok::<(), kscope_core::KscopeError>(())
//! ```

pub mod error;
pub mod finder;
pub mod kernel;
pub mod memory;
pub mod object;
pub mod platform;
pub mod prelude;
pub mod program;
pub mod symbols;
pub mod types;

// Re-export commonly used types
pub use error::{KscopeError, Result};
pub use finder::{FindKind, FindRequest, FinderRegistry, Placement, Resolution, Resolver};
pub use object::{Object, ObjectKind};
pub use platform::{Platform, PlatformBuilder};
pub use program::Program;
pub use types::{Address, Architecture, ByteOrder};
