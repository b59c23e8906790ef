//! # Finder Registry
//!
//! Name lookups are answered by an ordered chain of [`Resolver`]s. The
//! dispatcher walks the chain in registration order and stops at the first
//! resolver that reaches a verdict:
//!
//! | Resolver returns                | Dispatcher does                            |
//! |---------------------------------|--------------------------------------------|
//! | `Ok(Resolution::Found(obj))`    | returns `Ok(Some(obj))`                    |
//! | `Ok(Resolution::NotApplicable)` | asks the next resolver                     |
//! | `Ok(Resolution::Declined)`      | returns `Ok(None)` (name reserved)         |
//! | `Err(err)`                      | returns `Err(err)`, later resolvers skipped |
//!
//! If every resolver passes, the outcome is `Ok(None)`: the symbol does not
//! exist on this target. `NotApplicable` never leaves the dispatcher.
//!
//! Registration order is explicit ([`Placement`]) and observable
//! ([`FinderRegistry::names`]).

pub mod debug_info;

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
pub use debug_info::{CatalogEntry, DebugInfoCatalog, DebugInfoFinder, StaticCatalog};

use crate::error::Result;
use crate::memory::MemoryReader;
use crate::object::Object;
use crate::platform::Platform;
use crate::symbols::SymbolTable;
use crate::types::{CPrimitive, PrimitiveTypes, Type, TypeCatalog};

bitflags! {
    /// Kinds of objects a lookup accepts
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FindKind: u8 {
        const CONSTANT = 0b001;
        const FUNCTION = 0b010;
        const VARIABLE = 0b100;
        const ANY = Self::CONSTANT.bits() | Self::FUNCTION.bits() | Self::VARIABLE.bits();
    }
}

impl fmt::Display for FindKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if *self == FindKind::ANY {
            return f.write_str("any");
        }
        let names: Vec<&str> = [
            (FindKind::CONSTANT, "constant"),
            (FindKind::FUNCTION, "function"),
            (FindKind::VARIABLE, "variable"),
        ]
        .iter()
        .filter(|(kind, _)| self.contains(*kind))
        .map(|(_, name)| *name)
        .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// A named lookup
///
/// `scope` restricts the match to one module or compilation unit. `None`
/// means any scope, including scope-less synthetic symbols. An empty scope
/// string is treated as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindRequest<'a>
{
    pub name: &'a str,
    pub scope: Option<&'a str>,
    pub kinds: FindKind,
}

impl<'a> FindRequest<'a>
{
    pub fn new(name: &'a str, kinds: FindKind) -> Self
    {
        Self {
            name,
            scope: None,
            kinds,
        }
    }

    #[must_use]
    pub fn scoped(mut self, scope: Option<&'a str>) -> Self
    {
        self.scope = scope.filter(|s| !s.is_empty());
        self
    }
}

impl fmt::Display for FindRequest<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.scope {
            Some(scope) => write!(f, "{} {scope}::{}", self.kinds, self.name),
            None => write!(f, "{} {}", self.kinds, self.name),
        }
    }
}

/// A resolver's verdict for one request
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution
{
    /// The resolver produced the object
    Found(Object),
    /// The resolver has nothing to say; ask the next one
    NotApplicable,
    /// The resolver owns this name but not for the requested kind; the
    /// lookup ends as "not found" without consulting later resolvers
    Declined,
}

/// Everything a resolver may consult, passed explicitly on every call
///
/// Borrowed from one [`crate::Program`]; nothing in it is global.
#[derive(Clone, Copy)]
pub struct FindContext<'a>
{
    pub platform: &'a Platform,
    pub memory: &'a dyn MemoryReader,
    pub symbols: &'a SymbolTable,
    pub types: &'a dyn TypeCatalog,
    pub primitives: &'a PrimitiveTypes,
}

impl FindContext<'_>
{
    pub fn primitive(&self, primitive: CPrimitive) -> Arc<Type>
    {
        self.primitives.get(primitive)
    }

    /// Named type from the catalog, falling back to C primitives
    pub fn find_type(&self, name: &str) -> Option<Arc<Type>>
    {
        self.types.find_type(name).or_else(|| self.primitives.find_type(name))
    }
}

/// One link of the resolution chain
pub trait Resolver: Send + Sync
{
    /// Name used in logs and for [`FinderRegistry::unregister`]
    fn name(&self) -> &str;

    /// Cheap pre-filter; returning `false` is equivalent to `NotApplicable`
    fn applies_to(&self, _name: &str) -> bool
    {
        true
    }

    /// Attempt the lookup
    ///
    /// ## Errors
    ///
    /// Hard failures (memory faults, unsupported targets) abort the chain.
    fn resolve(&self, ctx: &FindContext<'_>, request: &FindRequest<'_>) -> Result<Resolution>;
}

/// Resolver built from a closure
pub struct FnResolver<F>
{
    name: String,
    callback: F,
}

impl<F> FnResolver<F>
where
    F: Fn(&FindContext<'_>, &FindRequest<'_>) -> Result<Resolution> + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self
    {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> Resolver for FnResolver<F>
where
    F: Fn(&FindContext<'_>, &FindRequest<'_>) -> Result<Resolution> + Send + Sync,
{
    fn name(&self) -> &str
    {
        &self.name
    }

    fn resolve(&self, ctx: &FindContext<'_>, request: &FindRequest<'_>) -> Result<Resolution>
    {
        (self.callback)(ctx, request)
    }
}

/// Where to insert a resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement
{
    /// Highest priority
    First,
    /// Lowest priority
    Last,
    /// At this index (clamped to the end)
    At(usize),
}

/// Ordered collection of resolvers plus the dispatcher
#[derive(Default, Clone)]
pub struct FinderRegistry
{
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl fmt::Debug for FinderRegistry
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FinderRegistry
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Insert a resolver; returns its index
    pub fn register(&mut self, resolver: Arc<dyn Resolver>, placement: Placement) -> usize
    {
        let index = match placement {
            Placement::First => 0,
            Placement::Last => self.resolvers.len(),
            Placement::At(index) => index.min(self.resolvers.len()),
        };
        tracing::debug!(resolver = resolver.name(), index, "registering resolver");
        self.resolvers.insert(index, resolver);
        index
    }

    /// Remove the first resolver with this name
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Resolver>>
    {
        let index = self.resolvers.iter().position(|r| r.name() == name)?;
        Some(self.resolvers.remove(index))
    }

    /// Resolver names in priority order
    pub fn names(&self) -> Vec<&str>
    {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize
    {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.resolvers.is_empty()
    }

    /// Walk the chain for one request
    ///
    /// Returns `Ok(None)` when no resolver claims the name.
    ///
    /// ## Errors
    ///
    /// The first hard error any resolver returns, unchanged.
    pub fn find(&self, ctx: &FindContext<'_>, request: &FindRequest<'_>) -> Result<Option<Object>>
    {
        for resolver in &self.resolvers {
            if !resolver.applies_to(request.name) {
                continue;
            }
            match resolver.resolve(ctx, request) {
                Ok(Resolution::Found(object)) => {
                    tracing::debug!(resolver = resolver.name(), %request, kind = ?object.kind(), "resolved");
                    return Ok(Some(object));
                }
                Ok(Resolution::NotApplicable) => {
                    tracing::trace!(resolver = resolver.name(), %request, "not applicable");
                }
                Ok(Resolution::Declined) => {
                    tracing::debug!(resolver = resolver.name(), %request, "name reserved for another kind");
                    return Ok(None);
                }
                Err(err) => {
                    tracing::debug!(resolver = resolver.name(), %request, error = %err, "resolution failed");
                    return Err(err);
                }
            }
        }
        tracing::trace!(%request, "no resolver matched");
        Ok(None)
    }
}
