//! # Memory-Management Helpers
//!
//! Conversions between page frame numbers, physical addresses, direct-map
//! virtual addresses and `struct page` pointers. Everything goes through
//! the synthetic kernel symbols (`PAGE_SHIFT`, `PAGE_OFFSET`, `vmemmap`) of
//! the [`Program`], so the helpers work on any architecture the kernel finder
//! supports.
//!
//! Only the direct mapping is handled: `phys_to_virt` and friends are
//! meaningless for vmalloc or module addresses.
//!
//! ## Errors
//!
//! The helpers fail with whatever the underlying lookup fails with, plus
//! `InvalidArgument` when `struct page` is missing from the type catalog
//! (pointer arithmetic needs its size).

use crate::error::{KscopeError, Result};
use crate::object::Object;
use crate::program::Program;
use crate::types::{CPrimitive, Type};

fn page_shift(program: &Program) -> Result<u32>
{
    let shift = program.read_unsigned(&program.constant("PAGE_SHIFT")?)?;
    u32::try_from(shift).map_err(|_| KscopeError::InvalidArgument(format!("PAGE_SHIFT of {shift}")))
}

fn direct_map_offset(program: &Program) -> Result<u64>
{
    program.read_unsigned(&program.constant("PAGE_OFFSET")?)
}

/// Physical address of a page frame
pub fn pfn_phys(program: &Program, pfn: u64) -> Result<u64>
{
    Ok((pfn << page_shift(program)?) & program.platform().word_mask())
}

/// Page frame containing a physical address
pub fn phys_pfn(program: &Program, phys: u64) -> Result<u64>
{
    Ok(phys >> page_shift(program)?)
}

/// `struct page *` for page frame 0
///
/// With `CONFIG_SPARSEMEM_VMEMMAP` this is `vmemmap`. Flat memory models fall
/// back to `contig_page_data.node_mem_map - contig_page_data.node_start_pfn`.
pub fn page0(program: &Program) -> Result<Object>
{
    match program.constant("vmemmap") {
        Ok(vmemmap) => return Ok(vmemmap),
        Err(KscopeError::NotFound(_) | KscopeError::UnsupportedConfig { .. } | KscopeError::UnsupportedArch { .. }) => {}
        Err(err) => return Err(err),
    }
    tracing::debug!("vmemmap unavailable, using contig_page_data");
    let node = program.variable("contig_page_data")?;
    let mem_map = node.member("node_mem_map")?;
    let start_pfn = program.read_unsigned(&node.member("node_start_pfn")?)?;
    mem_map.pointer_add(program.memory(), (start_pfn as i64).wrapping_neg())
}

/// `struct page *` for a page frame
pub fn pfn_to_page(program: &Program, pfn: u64) -> Result<Object>
{
    page0(program)?.pointer_add(program.memory(), pfn as i64)
}

/// Page frame number of a `struct page *`
pub fn page_to_pfn(program: &Program, page: &Object) -> Result<u64>
{
    let page0 = page0(program)?;
    Ok(page.pointer_diff(program.memory(), &page0)? as u64)
}

/// Physical address of a `struct page *`
pub fn page_to_phys(program: &Program, page: &Object) -> Result<u64>
{
    pfn_phys(program, page_to_pfn(program, page)?)
}

/// `struct page *` for a physical address
pub fn phys_to_page(program: &Program, phys: u64) -> Result<Object>
{
    pfn_to_page(program, phys_pfn(program, phys)?)
}

/// Direct-map virtual address (`void *`) of a physical address
pub fn phys_to_virt(program: &Program, phys: u64) -> Result<Object>
{
    let platform = program.platform();
    let virt = phys.wrapping_add(direct_map_offset(program)?) & platform.word_mask();
    let void_pointer = Type::pointer(program.primitive(CPrimitive::Void), platform.word_size());
    Object::from_unsigned(void_pointer.into(), virt, platform.byte_order())
}

/// Physical address of a direct-map virtual address
pub fn virt_to_phys(program: &Program, virt: u64) -> Result<u64>
{
    Ok(virt.wrapping_sub(direct_map_offset(program)?) & program.platform().word_mask())
}

/// Direct-map virtual address of a page frame
pub fn pfn_to_virt(program: &Program, pfn: u64) -> Result<Object>
{
    phys_to_virt(program, pfn_phys(program, pfn)?)
}

/// Page frame of a direct-map virtual address
pub fn virt_to_pfn(program: &Program, virt: u64) -> Result<u64>
{
    phys_pfn(program, virt_to_phys(program, virt)?)
}

/// Direct-map virtual address of a `struct page *`
pub fn page_to_virt(program: &Program, page: &Object) -> Result<Object>
{
    pfn_to_virt(program, page_to_pfn(program, page)?)
}

/// `struct page *` for a direct-map virtual address
pub fn virt_to_page(program: &Program, virt: u64) -> Result<Object>
{
    pfn_to_page(program, virt_to_pfn(program, virt)?)
}

/// Every `struct page *` from `min_low_pfn` up to (not including) `max_pfn`
///
/// Holes in the physical address space have no backing `struct page`, so
/// reading through some of the yielded pointers can fault.
pub fn for_each_page(program: &Program) -> Result<impl Iterator<Item = Result<Object>> + '_>
{
    let page0 = page0(program)?;
    let min_pfn = program.read_unsigned(&program.variable("min_low_pfn")?)?;
    let max_pfn = program.read_unsigned(&program.variable("max_pfn")?)?;
    tracing::debug!(min_pfn, max_pfn, "iterating pages");
    Ok((min_pfn..max_pfn).map(move |pfn| page0.pointer_add(program.memory(), pfn as i64)))
}

/// Number of usable RAM pages
///
/// Kernels since 5.0 keep the count in the atomic `_totalram_pages`; older
/// ones have a plain `totalram_pages` variable.
pub fn totalram_pages(program: &Program) -> Result<u64>
{
    match program.variable("_totalram_pages") {
        Ok(atomic) => program.read_unsigned(&atomic.member("counter")?),
        Err(err) if err.is_not_found() => program.read_unsigned(&program.variable("totalram_pages")?),
        Err(err) => Err(err),
    }
}
