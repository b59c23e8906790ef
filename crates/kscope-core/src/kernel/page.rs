//! # Page Flags and Compound Pages
//!
//! Helpers that look inside a `struct page *`. Flag bit numbers are not
//! hard-coded: every `PG_*` value is resolved through the [`Program`] (usually
//! from the `enum pageflags` constants of the debug info), so a flag that a
//! kernel does not define simply reads as clear.
//!
//! The compound-page helpers follow the kernel's encoding: a tail page has
//! bit 0 set in `compound_head`, and the head page carries `PG_head`. HugeTLB
//! vmemmap optimization (v5.18+) maps several tail `struct page`s onto one
//! that also has `PG_head` set; such a "fake head" is recognized by its
//! successor pointing back at a different head.

use std::fmt;
use std::sync::Arc;

use crate::error::{KscopeError, Result};
use crate::object::Object;
use crate::program::Program;

/// A `PG_*` page flag
///
/// Variants after [`PageFlag::SkipKasanPoison`] are aliases that some kernels
/// define on top of another bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageFlag
{
    Locked,
    Writeback,
    Referenced,
    Uptodate,
    Dirty,
    Lru,
    Head,
    Waiters,
    Active,
    Workingset,
    Error,
    Slab,
    OwnerPriv1,
    Reserved,
    Private,
    Private2,
    MappedToDisk,
    Reclaim,
    SwapBacked,
    Unevictable,
    Mlocked,
    Uncached,
    HwPoison,
    Young,
    Idle,
    SkipKasanPoison,
    Checked,
    Pinned,
    SavePinned,
    Foreign,
    XenRemapped,
    SlobFree,
    DoubleMap,
    HasHwPoisoned,
    Isolated,
    Reported,
    VmemmapSelfHosted,
    Readahead,
}

impl PageFlag
{
    /// Every flag, canonical bits before aliases
    pub const ALL: [PageFlag; 38] = [
        PageFlag::Locked,
        PageFlag::Writeback,
        PageFlag::Referenced,
        PageFlag::Uptodate,
        PageFlag::Dirty,
        PageFlag::Lru,
        PageFlag::Head,
        PageFlag::Waiters,
        PageFlag::Active,
        PageFlag::Workingset,
        PageFlag::Error,
        PageFlag::Slab,
        PageFlag::OwnerPriv1,
        PageFlag::Reserved,
        PageFlag::Private,
        PageFlag::Private2,
        PageFlag::MappedToDisk,
        PageFlag::Reclaim,
        PageFlag::SwapBacked,
        PageFlag::Unevictable,
        PageFlag::Mlocked,
        PageFlag::Uncached,
        PageFlag::HwPoison,
        PageFlag::Young,
        PageFlag::Idle,
        PageFlag::SkipKasanPoison,
        PageFlag::Checked,
        PageFlag::Pinned,
        PageFlag::SavePinned,
        PageFlag::Foreign,
        PageFlag::XenRemapped,
        PageFlag::SlobFree,
        PageFlag::DoubleMap,
        PageFlag::HasHwPoisoned,
        PageFlag::Isolated,
        PageFlag::Reported,
        PageFlag::VmemmapSelfHosted,
        PageFlag::Readahead,
    ];

    /// Name of the kernel constant holding the bit number
    pub const fn name(self) -> &'static str
    {
        match self {
            PageFlag::Locked => "PG_locked",
            PageFlag::Writeback => "PG_writeback",
            PageFlag::Referenced => "PG_referenced",
            PageFlag::Uptodate => "PG_uptodate",
            PageFlag::Dirty => "PG_dirty",
            PageFlag::Lru => "PG_lru",
            PageFlag::Head => "PG_head",
            PageFlag::Waiters => "PG_waiters",
            PageFlag::Active => "PG_active",
            PageFlag::Workingset => "PG_workingset",
            PageFlag::Error => "PG_error",
            PageFlag::Slab => "PG_slab",
            PageFlag::OwnerPriv1 => "PG_owner_priv_1",
            PageFlag::Reserved => "PG_reserved",
            PageFlag::Private => "PG_private",
            PageFlag::Private2 => "PG_private_2",
            PageFlag::MappedToDisk => "PG_mappedtodisk",
            PageFlag::Reclaim => "PG_reclaim",
            PageFlag::SwapBacked => "PG_swapbacked",
            PageFlag::Unevictable => "PG_unevictable",
            PageFlag::Mlocked => "PG_mlocked",
            PageFlag::Uncached => "PG_uncached",
            PageFlag::HwPoison => "PG_hwpoison",
            PageFlag::Young => "PG_young",
            PageFlag::Idle => "PG_idle",
            PageFlag::SkipKasanPoison => "PG_skip_kasan_poison",
            PageFlag::Checked => "PG_checked",
            PageFlag::Pinned => "PG_pinned",
            PageFlag::SavePinned => "PG_savepinned",
            PageFlag::Foreign => "PG_foreign",
            PageFlag::XenRemapped => "PG_xen_remapped",
            PageFlag::SlobFree => "PG_slob_free",
            PageFlag::DoubleMap => "PG_double_map",
            PageFlag::HasHwPoisoned => "PG_has_hwpoisoned",
            PageFlag::Isolated => "PG_isolated",
            PageFlag::Reported => "PG_reported",
            PageFlag::VmemmapSelfHosted => "PG_vmemmap_self_hosted",
            PageFlag::Readahead => "PG_readahead",
        }
    }
}

impl fmt::Display for PageFlag
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

/// Bit number of a flag, `None` if this kernel does not define it
fn flag_bit(program: &Program, flag: PageFlag) -> Result<Option<u64>>
{
    match program.constant(flag.name()) {
        Ok(bit) => program.read_unsigned(&bit).map(Some),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

fn head_bit(program: &Program) -> Result<u64>
{
    program.read_unsigned(&program.constant(PageFlag::Head.name())?)
}

fn bit_set(word: u64, bit: u64) -> bool
{
    u32::try_from(bit)
        .ok()
        .and_then(|bit| 1u64.checked_shl(bit))
        .is_some_and(|mask| word & mask != 0)
}

/// `page->flags`
fn flags_word(program: &Program, page: &Object) -> Result<u64>
{
    let flags = page.deref(program.memory())?.member("flags")?;
    // memdesc_flags_t wraps the word on newer kernels
    let flags = if flags.ty().is_integer_like() { flags } else { flags.member("f")? };
    program.read_unsigned(&flags)
}

fn compound_head_word(program: &Program, page: &Object) -> Result<u64>
{
    program.read_unsigned(&page.deref(program.memory())?.member("compound_head")?)
}

/// `page + 1`
fn next_page(program: &Program, page: &Object) -> Result<Object>
{
    page.pointer_add(program.memory(), 1)
}

fn is_fake_head(program: &Program, page: &Object) -> Result<bool>
{
    let head = compound_head_word(program, &next_page(program, page)?)?;
    Ok(head & 1 == 1 && head - 1 != program.read_unsigned(page)?)
}

/// Whether `flag` is set on a page
///
/// A flag the kernel does not define is reported as clear.
///
/// ## Errors
///
/// Memory errors reading the page, and `InvalidArgument` if `struct page`
/// has no `flags` member.
pub fn page_flag(program: &Program, page: &Object, flag: PageFlag) -> Result<bool>
{
    match flag_bit(program, flag)? {
        Some(bit) => Ok(bit_set(flags_word(program, page)?, bit)),
        None => Ok(false),
    }
}

/// Whether a page is part of a compound page
pub fn page_compound(program: &Program, page: &Object) -> Result<bool>
{
    Ok(bit_set(flags_word(program, page)?, head_bit(program)?) || compound_head_word(program, page)? & 1 == 1)
}

/// Whether a page is the head of a compound page
pub fn page_head(program: &Program, page: &Object) -> Result<bool>
{
    Ok(bit_set(flags_word(program, page)?, head_bit(program)?) && !is_fake_head(program, page)?)
}

/// Whether a page is a tail of a compound page
pub fn page_tail(program: &Program, page: &Object) -> Result<bool>
{
    if compound_head_word(program, page)? & 1 == 1 {
        return Ok(true);
    }
    if bit_set(flags_word(program, page)?, head_bit(program)?) {
        return is_fake_head(program, page);
    }
    Ok(false)
}

/// Head page of the compound page containing `page`, or `page` itself
pub fn compound_head(program: &Program, page: &Object) -> Result<Object>
{
    let pointer = |head: u64| Object::from_unsigned(Arc::clone(page.ty()), head - 1, page.byte_order());
    let head = compound_head_word(program, page)?;
    if head & 1 == 1 {
        return pointer(head);
    }
    if bit_set(flags_word(program, page)?, head_bit(program)?) {
        let head = compound_head_word(program, &next_page(program, page)?)?;
        if head & 1 == 1 {
            return pointer(head);
        }
    }
    Ok(page.clone())
}

/// Allocation order of a page (0 unless it is a compound head)
pub fn compound_order(program: &Program, page: &Object) -> Result<u32>
{
    if !page_head(program, page)? {
        return Ok(0);
    }
    let order = next_page(program, page)?.deref(program.memory())?.member("compound_order")?;
    let order = program.read_unsigned(&order)?;
    u32::try_from(order).map_err(|_| KscopeError::InvalidArgument(format!("compound order {order}")))
}

/// Number of base pages in a potentially compound page
pub fn compound_nr(program: &Program, page: &Object) -> Result<u64>
{
    Ok(1u64 << compound_order(program, page)?)
}

/// Bytes in a potentially compound page (`PAGE_SIZE << compound_order`)
pub fn page_size(program: &Program, page: &Object) -> Result<u64>
{
    let base = program.read_unsigned(&program.constant("PAGE_SIZE")?)?;
    Ok(base << compound_order(program, page)?)
}

/// Readable form of the flags set on a page, e.g. `PG_uptodate|PG_lru`
///
/// Only the low `__NR_PAGEFLAGS` bits are flags; the rest of the word holds
/// the section, node and zone. Each set bit is named by the first matching
/// [`PageFlag`] this kernel defines; unnamed bits are appended in hex. A page
/// without flags decodes to `0`.
pub fn decode_page_flags(program: &Program, page: &Object) -> Result<String>
{
    let nr_flags = program.read_unsigned(&program.constant("__NR_PAGEFLAGS")?)?;
    let mask = u32::try_from(nr_flags)
        .ok()
        .and_then(|bits| 1u64.checked_shl(bits))
        .map_or(u64::MAX, |limit| limit - 1);
    let mut remaining = flags_word(program, page)? & mask;
    if remaining == 0 {
        return Ok("0".to_string());
    }

    let mut defined = Vec::new();
    for flag in PageFlag::ALL {
        if let Some(bit) = flag_bit(program, flag)? {
            defined.push((bit, flag));
        }
    }
    let mut names = Vec::new();
    for bit in 0..64u64 {
        if remaining & (1 << bit) == 0 {
            continue;
        }
        if let Some((_, flag)) = defined.iter().find(|(defined_bit, _)| *defined_bit == bit) {
            names.push(flag.name().to_string());
            remaining &= !(1 << bit);
        }
    }
    if remaining != 0 {
        names.push(format!("0x{remaining:x}"));
    }
    Ok(names.join("|"))
}
