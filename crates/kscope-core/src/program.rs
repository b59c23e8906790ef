//! # Program
//!
//! A [`Program`] ties one target together: its [`Platform`], a memory backend,
//! the runtime symbol table, the type catalog and the resolver chain. It is
//! the handle everything else takes.
//!
//! Kernel targets get the [`KernelFinder`] registered at the end of the chain
//! on construction. Debug-info resolvers are registered by the caller
//! afterwards, so with [`Placement::Last`] they sit behind the synthetic
//! symbols and with [`Placement::First`] they shadow them.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kscope_core::finder::{CatalogEntry, DebugInfoFinder, FindKind, Placement, StaticCatalog};
//! use kscope_core::memory::SegmentMemory;
//! use kscope_core::object::Object;
//! use kscope_core::platform::PlatformBuilder;
//! use kscope_core::types::{Architecture, CPrimitive};
//! use kscope_core::Program;
//!
//! let platform = PlatformBuilder::new(Architecture::Aarch64).kernel_release("6.1.0").build()?;
//! let mut program = Program::new(platform, Arc::new(SegmentMemory::new()));
//!
//! let hz = Object::from_unsigned(program.primitive(CPrimitive::Int), 250, program.platform().byte_order())?;
//! let catalog = StaticCatalog::new().with(CatalogEntry::constant("HZ", hz));
//! program.register(Arc::new(DebugInfoFinder::new(catalog)), Placement::Last);
//!
//! assert_eq!(program.read_unsigned(&program.constant("HZ")?)?, 250);
//! assert!(program.find("nr_cpu_ids", None, FindKind::ANY)?.is_none());
//! # Ok::<(), kscope_core::KscopeError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{KscopeError, Result};
use crate::finder::{FindContext, FindKind, FindRequest, FinderRegistry, Placement, Resolver};
use crate::kernel::KernelFinder;
use crate::memory::MemoryReader;
use crate::object::Object;
use crate::platform::Platform;
use crate::symbols::SymbolTable;
use crate::types::{CPrimitive, PrimitiveTypes, Type, TypeCatalog, TypeMap};

/// One introspection target
pub struct Program
{
    platform: Platform,
    memory: Arc<dyn MemoryReader>,
    symbols: SymbolTable,
    types: Arc<dyn TypeCatalog>,
    primitives: PrimitiveTypes,
    finders: FinderRegistry,
}

impl fmt::Debug for Program
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Program")
            .field("platform", &self.platform)
            .field("symbols", &self.symbols.len())
            .field("finders", &self.finders)
            .finish_non_exhaustive()
    }
}

impl Program
{
    /// Create a program for `platform` reading from `memory`
    pub fn new(platform: Platform, memory: Arc<dyn MemoryReader>) -> Self
    {
        let primitives = PrimitiveTypes::new(platform.word_size());
        let mut finders = FinderRegistry::new();
        if platform.is_kernel() {
            finders.register(Arc::new(KernelFinder::new()), Placement::Last);
        }
        tracing::info!(%platform, resolvers = finders.len(), "program created");
        Self {
            platform,
            memory,
            symbols: SymbolTable::new(),
            types: Arc::new(TypeMap::new()),
            primitives,
            finders,
        }
    }

    /// Replace the runtime symbol table
    #[must_use]
    pub fn with_symbols(mut self, symbols: SymbolTable) -> Self
    {
        tracing::debug!(count = symbols.len(), "symbol table loaded");
        self.symbols = symbols;
        self
    }

    /// Replace the type catalog
    #[must_use]
    pub fn with_types(mut self, types: Arc<dyn TypeCatalog>) -> Self
    {
        self.types = types;
        self
    }

    /// Add a resolver to the chain; returns its index
    pub fn register(&mut self, resolver: Arc<dyn Resolver>, placement: Placement) -> usize
    {
        self.finders.register(resolver, placement)
    }

    pub fn registry(&self) -> &FinderRegistry
    {
        &self.finders
    }

    pub fn registry_mut(&mut self) -> &mut FinderRegistry
    {
        &mut self.finders
    }

    pub fn platform(&self) -> &Platform
    {
        &self.platform
    }

    pub fn memory(&self) -> &dyn MemoryReader
    {
        &*self.memory
    }

    pub fn symbols(&self) -> &SymbolTable
    {
        &self.symbols
    }

    /// Borrow everything a resolver needs
    pub fn context(&self) -> FindContext<'_>
    {
        FindContext {
            platform: &self.platform,
            memory: &*self.memory,
            symbols: &self.symbols,
            types: &*self.types,
            primitives: &self.primitives,
        }
    }

    /// Run the resolver chain for a request
    ///
    /// ## Errors
    ///
    /// Hard errors from any resolver; "not found" is `Ok(None)`.
    pub fn find_request(&self, request: &FindRequest<'_>) -> Result<Option<Object>>
    {
        self.finders.find(&self.context(), request)
    }

    /// Look up `name` with an optional scope and a set of kinds
    ///
    /// An empty scope string means "no scope".
    ///
    /// ## Errors
    ///
    /// Same as [`Program::find_request`].
    pub fn find(&self, name: &str, scope: Option<&str>, kinds: FindKind) -> Result<Option<Object>>
    {
        self.find_request(&FindRequest::new(name, kinds).scoped(scope))
    }

    /// Like [`Program::find`], unscoped, turning "not found" into an error
    ///
    /// ## Errors
    ///
    /// `NotFound` when no resolver claims the name, plus hard resolver errors.
    pub fn object(&self, name: &str, kinds: FindKind) -> Result<Object>
    {
        self.find(name, None, kinds)?
            .ok_or_else(|| KscopeError::NotFound(name.to_string()))
    }

    /// Look up a constant
    ///
    /// ## Errors
    ///
    /// See [`Program::object`].
    pub fn constant(&self, name: &str) -> Result<Object>
    {
        self.object(name, FindKind::CONSTANT)
    }

    /// Look up a variable
    ///
    /// ## Errors
    ///
    /// See [`Program::object`].
    pub fn variable(&self, name: &str) -> Result<Object>
    {
        self.object(name, FindKind::VARIABLE)
    }

    /// Look up a function
    ///
    /// ## Errors
    ///
    /// See [`Program::object`].
    pub fn function(&self, name: &str) -> Result<Object>
    {
        self.object(name, FindKind::FUNCTION)
    }

    /// Current bytes of an object, reading the target for references
    ///
    /// ## Errors
    ///
    /// `NoValue` for absent objects and memory errors for references.
    pub fn read(&self, object: &Object) -> Result<Vec<u8>>
    {
        Ok(object.materialize(&*self.memory)?.into_owned())
    }

    /// Current value of an integer-like object
    ///
    /// ## Errors
    ///
    /// See [`Object::read_unsigned`].
    pub fn read_unsigned(&self, object: &Object) -> Result<u64>
    {
        object.read_unsigned(&*self.memory)
    }

    /// Current value of an integer-like object, sign-extended
    ///
    /// ## Errors
    ///
    /// See [`Object::read_signed`].
    pub fn read_signed(&self, object: &Object) -> Result<i64>
    {
        object.read_signed(&*self.memory)
    }

    /// Named type from the catalog, falling back to C primitives
    pub fn find_type(&self, name: &str) -> Option<Arc<Type>>
    {
        self.context().find_type(name)
    }

    pub fn primitive(&self, primitive: CPrimitive) -> Arc<Type>
    {
        self.primitives.get(primitive)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::memory::SegmentMemory;
    use crate::platform::PlatformBuilder;
    use crate::types::Architecture;

    fn user_space() -> Platform
    {
        PlatformBuilder::new(Architecture::X86_64).build().unwrap()
    }

    #[test]
    fn test_kernel_finder_registered_for_kernels_only()
    {
        let kernel = PlatformBuilder::new(Architecture::X86_64)
            .kernel_release("6.6.0")
            .build()
            .unwrap();
        let program = Program::new(kernel, Arc::new(SegmentMemory::new()));
        assert_eq!(program.registry().names(), vec![KernelFinder::NAME]);

        let program = Program::new(user_space(), Arc::new(SegmentMemory::new()));
        assert!(program.registry().is_empty());
        assert!(program.constant("PAGE_SIZE").unwrap_err().is_not_found());
    }

    #[test]
    fn test_find_type_falls_back_to_primitives()
    {
        let program = Program::new(user_space(), Arc::new(SegmentMemory::new()));
        assert_eq!(program.find_type("unsigned long").and_then(|t| t.byte_size()), Some(8));
        assert!(program.find_type("struct task_struct").is_none());
    }

    #[test]
    fn test_object_reports_name_when_missing()
    {
        let program = Program::new(user_space(), Arc::new(SegmentMemory::new()));
        let err = program.variable("init_task").unwrap_err();
        assert_eq!(err.to_string(), "Symbol not found: init_task");
    }
}
