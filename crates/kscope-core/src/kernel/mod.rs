//! # Linux Kernel Synthetic Symbols
//!
//! Some values every kernel debugging session needs are macros or
//! configuration-dependent expressions with no debug info behind them:
//! `PAGE_SIZE`, `UTS_RELEASE`, `vmemmap`. [`KernelFinder`] computes them from
//! the [`crate::platform::Platform`] and, where the layout is randomized at
//! boot, from the runtime symbol table and target memory.
//!
//! | Name          | Kind     | Type                      |
//! |---------------|----------|---------------------------|
//! | `PAGE_SHIFT`  | constant | `int`                     |
//! | `PAGE_SIZE`   | constant | `unsigned long`           |
//! | `PAGE_MASK`   | constant | `unsigned long`           |
//! | `PAGE_OFFSET` | constant | `unsigned long`           |
//! | `UTS_RELEASE` | constant | `char [N]`                |
//! | `jiffies`     | variable | `volatile unsigned long`  |
//! | `vmemmap`     | constant | `struct page *`           |
//!
//! A name from this table requested under another kind is reported as not
//! found and later resolvers are not consulted.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kscope_core::finder::FindKind;
//! use kscope_core::memory::SegmentMemory;
//! use kscope_core::platform::PlatformBuilder;
//! use kscope_core::types::Architecture;
//! use kscope_core::Program;
//!
//! let platform = PlatformBuilder::new(Architecture::X86_64).kernel_release("6.1.0").build()?;
//! let program = Program::new(platform, Arc::new(SegmentMemory::new()));
//! let page_size = program.constant("PAGE_SIZE")?;
//! assert_eq!(program.read_unsigned(&page_size)?, 4096);
//! assert!(program.find("PAGE_SIZE", None, FindKind::VARIABLE)?.is_none());
//! # Ok::<(), kscope_core::KscopeError>(())
//! ```

pub mod constants;
mod layout;
pub mod mm;
pub mod page;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

pub use layout::page_shift;

use crate::error::Result;
use crate::finder::{FindContext, FindKind, FindRequest, Resolution, Resolver};
use crate::object::Object;
use crate::types::{ByteOrder, CPrimitive, Qualifiers, Type};

/// Names the kernel finder answers for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntheticSymbol
{
    PageShift,
    PageSize,
    PageMask,
    PageOffset,
    UtsRelease,
    Jiffies,
    Vmemmap,
}

static SYNTHETIC_SYMBOLS: Lazy<HashMap<&'static str, SyntheticSymbol>> = Lazy::new(|| {
    SyntheticSymbol::ALL
        .iter()
        .map(|symbol| (symbol.name(), *symbol))
        .collect()
});

// shortest and longest names in the table
const NAME_LENGTHS: std::ops::RangeInclusive<usize> = 7..=11;

impl SyntheticSymbol
{
    pub const ALL: [SyntheticSymbol; 7] = [
        SyntheticSymbol::PageShift,
        SyntheticSymbol::PageSize,
        SyntheticSymbol::PageMask,
        SyntheticSymbol::PageOffset,
        SyntheticSymbol::UtsRelease,
        SyntheticSymbol::Jiffies,
        SyntheticSymbol::Vmemmap,
    ];

    pub const fn name(self) -> &'static str
    {
        match self {
            SyntheticSymbol::PageShift => "PAGE_SHIFT",
            SyntheticSymbol::PageSize => "PAGE_SIZE",
            SyntheticSymbol::PageMask => "PAGE_MASK",
            SyntheticSymbol::PageOffset => "PAGE_OFFSET",
            SyntheticSymbol::UtsRelease => "UTS_RELEASE",
            SyntheticSymbol::Jiffies => "jiffies",
            SyntheticSymbol::Vmemmap => "vmemmap",
        }
    }

    /// The one kind this name may be requested as
    pub const fn required_kind(self) -> FindKind
    {
        match self {
            SyntheticSymbol::Jiffies => FindKind::VARIABLE,
            _ => FindKind::CONSTANT,
        }
    }

    /// Recognize a synthetic name (case-sensitive)
    ///
    /// ```rust
    /// use kscope_core::kernel::SyntheticSymbol;
    ///
    /// assert_eq!(SyntheticSymbol::lookup("PAGE_SIZE"), Some(SyntheticSymbol::PageSize));
    /// assert_eq!(SyntheticSymbol::lookup("page_size"), None);
    /// ```
    pub fn lookup(name: &str) -> Option<Self>
    {
        if !NAME_LENGTHS.contains(&name.len()) {
            return None;
        }
        SYNTHETIC_SYMBOLS.get(name).copied()
    }
}

impl fmt::Display for SyntheticSymbol
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

/// Resolver for the synthetic kernel symbols
///
/// Registered automatically by [`crate::Program::new`] for kernel targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelFinder;

impl KernelFinder
{
    pub const NAME: &'static str = "linux-kernel";

    pub fn new() -> Self
    {
        Self
    }

    fn build(self, ctx: &FindContext<'_>, symbol: SyntheticSymbol) -> Result<Resolution>
    {
        let platform = ctx.platform;
        let byte_order = platform.byte_order();
        let name = symbol.name();
        let object = match symbol {
            SyntheticSymbol::PageShift => {
                let shift = layout::require_page_shift(name, platform)?;
                Object::from_signed(ctx.primitive(CPrimitive::Int), i64::from(shift), byte_order)?
            }
            SyntheticSymbol::PageSize => {
                let shift = layout::require_page_shift(name, platform)?;
                Object::from_unsigned(ctx.primitive(CPrimitive::UnsignedLong), 1 << shift, byte_order)?
            }
            SyntheticSymbol::PageMask => {
                let shift = layout::require_page_shift(name, platform)?;
                let mask = !((1u64 << shift) - 1) & platform.word_mask();
                Object::from_unsigned(ctx.primitive(CPrimitive::UnsignedLong), mask, byte_order)?
            }
            SyntheticSymbol::PageOffset => {
                let value = layout::page_offset(ctx, name)?;
                Object::from_unsigned(ctx.primitive(CPrimitive::UnsignedLong), value, byte_order)?
            }
            SyntheticSymbol::UtsRelease => {
                let Some(release) = platform.kernel_release() else {
                    return Ok(Resolution::NotApplicable);
                };
                uts_release(ctx, release, byte_order)?
            }
            SyntheticSymbol::Jiffies => {
                let Some(object) = jiffies(ctx) else {
                    return Ok(Resolution::NotApplicable);
                };
                object
            }
            SyntheticSymbol::Vmemmap => {
                let page = ctx
                    .find_type("struct page")
                    .unwrap_or_else(|| Arc::new(Type::incomplete_struct("page")));
                let page_size = page.byte_size().unwrap_or(1 << constants::STRUCT_PAGE_MAX_SHIFT);
                let value = layout::vmemmap(ctx, name, page_size)?;
                let ty = Arc::new(Type::pointer(page, platform.word_size()));
                Object::from_unsigned(ty, value, byte_order)?
            }
        };
        Ok(Resolution::Found(object))
    }
}

fn uts_release(ctx: &FindContext<'_>, release: &str, byte_order: ByteOrder) -> Result<Object>
{
    let mut bytes = Vec::with_capacity(release.len() + 1);
    bytes.extend_from_slice(release.as_bytes());
    bytes.push(0);
    let ty = Arc::new(Type::array(ctx.primitive(CPrimitive::Char), Some(bytes.len() as u64)));
    Object::from_bytes(ty, &bytes, byte_order)
}

/// `jiffies` aliases the low word of `jiffies_64`
fn jiffies(ctx: &FindContext<'_>) -> Option<Object>
{
    let platform = ctx.platform;
    let mut address = ctx.symbols.address_of(constants::JIFFIES_64)?;
    if platform.word_size() == 4 && platform.byte_order() == ByteOrder::Big {
        address = address + 4;
    }
    let ty = Arc::new(ctx.primitive(CPrimitive::UnsignedLong).qualified(Qualifiers::VOLATILE));
    Some(Object::reference(ty, address, platform.byte_order()))
}

impl Resolver for KernelFinder
{
    fn name(&self) -> &str
    {
        Self::NAME
    }

    fn applies_to(&self, name: &str) -> bool
    {
        SyntheticSymbol::lookup(name).is_some()
    }

    fn resolve(&self, ctx: &FindContext<'_>, request: &FindRequest<'_>) -> Result<Resolution>
    {
        let Some(symbol) = SyntheticSymbol::lookup(request.name) else {
            return Ok(Resolution::NotApplicable);
        };
        if request.scope.is_some() || !ctx.platform.is_kernel() {
            return Ok(Resolution::NotApplicable);
        }
        if !request.kinds.contains(symbol.required_kind()) {
            tracing::debug!(%symbol, requested = %request.kinds, "synthetic symbol requested with the wrong kind");
            return Ok(Resolution::Declined);
        }
        self.build(ctx, symbol)
    }
}
