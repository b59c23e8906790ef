//! Debug-info finder glue.
//!
//! The debug-record parser is an external collaborator: it only has to
//! implement [`DebugInfoCatalog`]. [`DebugInfoFinder`] adapts any catalog to
//! the [`Resolver`] chain. [`StaticCatalog`] is an in-memory catalog for
//! embedding known objects and for tests.

use super::{FindContext, FindKind, FindRequest, Resolution, Resolver};
use crate::error::Result;
use crate::object::Object;

/// Lookup interface of a debug-info backend
///
/// Same contract as [`Resolver::resolve`]: `Found`, `NotApplicable`,
/// `Declined`, or a hard error.
pub trait DebugInfoCatalog: Send + Sync
{
    /// Attempt a lookup
    ///
    /// ## Errors
    ///
    /// Failures decoding the backing records.
    fn lookup(&self, ctx: &FindContext<'_>, request: &FindRequest<'_>) -> Result<Resolution>;
}

/// [`Resolver`] backed by a debug-info catalog
pub struct DebugInfoFinder<C>
{
    name: String,
    catalog: C,
}

impl<C: DebugInfoCatalog> DebugInfoFinder<C>
{
    pub fn new(catalog: C) -> Self
    {
        Self::named("debug-info", catalog)
    }

    pub fn named(name: impl Into<String>, catalog: C) -> Self
    {
        Self {
            name: name.into(),
            catalog,
        }
    }

    pub fn catalog(&self) -> &C
    {
        &self.catalog
    }
}

impl<C: DebugInfoCatalog> Resolver for DebugInfoFinder<C>
{
    fn name(&self) -> &str
    {
        &self.name
    }

    fn resolve(&self, ctx: &FindContext<'_>, request: &FindRequest<'_>) -> Result<Resolution>
    {
        self.catalog.lookup(ctx, request)
    }
}

/// One object known to a [`StaticCatalog`]
#[derive(Debug, Clone)]
pub struct CatalogEntry
{
    name: String,
    scope: Option<String>,
    kind: FindKind,
    object: Object,
}

impl CatalogEntry
{
    fn new(name: impl Into<String>, kind: FindKind, object: Object) -> Self
    {
        Self {
            name: name.into(),
            scope: None,
            kind,
            object,
        }
    }

    pub fn constant(name: impl Into<String>, object: Object) -> Self
    {
        Self::new(name, FindKind::CONSTANT, object)
    }

    pub fn variable(name: impl Into<String>, object: Object) -> Self
    {
        Self::new(name, FindKind::VARIABLE, object)
    }

    pub fn function(name: impl Into<String>, object: Object) -> Self
    {
        Self::new(name, FindKind::FUNCTION, object)
    }

    /// Restrict the entry to a module or compilation unit
    #[must_use]
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self
    {
        self.scope = Some(scope.into());
        self
    }

    fn matches(&self, request: &FindRequest<'_>) -> bool
    {
        self.name == request.name
            && request.kinds.intersects(self.kind)
            && request.scope.is_none_or(|scope| self.scope.as_deref() == Some(scope))
    }
}

/// In-memory catalog with exact name matching
///
/// A scoped request only matches entries in that scope; an unscoped request
/// matches every scope. Entries are searched in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog
{
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn insert(&mut self, entry: CatalogEntry)
    {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn with(mut self, entry: CatalogEntry) -> Self
    {
        self.insert(entry);
        self
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}

impl DebugInfoCatalog for StaticCatalog
{
    fn lookup(&self, _ctx: &FindContext<'_>, request: &FindRequest<'_>) -> Result<Resolution>
    {
        Ok(self
            .entries
            .iter()
            .find(|entry| entry.matches(request))
            .map_or(Resolution::NotApplicable, |entry| Resolution::Found(entry.object.clone())))
    }
}
