//! Common module for library exports

pub use crate::error::{KscopeError, Result};
pub use crate::finder::{
    CatalogEntry, DebugInfoCatalog, DebugInfoFinder, FindContext, FindKind, FindRequest, FinderRegistry, FnResolver,
    Placement, Resolution, Resolver, StaticCatalog,
};
pub use crate::kernel::{KernelFinder, SyntheticSymbol};
pub use crate::memory::{Location, MemoryReader, SegmentMemory};
pub use crate::object::{Object, ObjectKind};
pub use crate::platform::{KernelConfig, KernelVersion, Platform, PlatformBuilder};
pub use crate::program::Program;
pub use crate::symbols::{Symbol, SymbolKind, SymbolTable};
pub use crate::types::{Address, Architecture, ByteOrder, CPrimitive, Qualifiers, Type, TypeCatalog, TypeKind, TypeMap};
