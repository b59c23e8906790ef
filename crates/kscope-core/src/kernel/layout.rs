//! Derivation of kernel memory-layout values from the platform context.

use super::constants::{
    AARCH64_FLIPPED_VA_SINCE, AARCH64_VA_BITS_MIN, AARCH64_VMEMMAP_AT_TOP_SINCE, AARCH64_VMEMMAP_GUARD, MEMSTART_ADDR,
    PAGE_OFFSET_BASE, PAGE_SHIFT_16K, PAGE_SHIFT_256K, PAGE_SHIFT_4K, PAGE_SHIFT_64K, PPC64_PAGE_OFFSET, S390_VMEMMAP,
    STRUCT_PAGE_MAX_SHIFT, VMEMMAP_BASE, X86_64_DYNAMIC_LAYOUT_SINCE, X86_64_PAGE_OFFSET_L4, X86_64_PAGE_OFFSET_L4_LEGACY,
    X86_64_PAGE_OFFSET_L5_LEGACY, X86_64_PAGE_OFFSET_MOVED_IN, X86_64_VMEMMAP_L4, X86_64_VMEMMAP_L5,
};
use crate::error::{KscopeError, Result};
use crate::finder::FindContext;
use crate::platform::{KernelVersion, Platform};
use crate::types::Architecture;

fn unsupported_arch(symbol: &str, platform: &Platform) -> KscopeError
{
    KscopeError::UnsupportedArch {
        symbol: symbol.to_string(),
        arch: platform.arch(),
    }
}

fn unsupported_config(symbol: &str, reason: impl Into<String>) -> KscopeError
{
    KscopeError::UnsupportedConfig {
        symbol: symbol.to_string(),
        reason: reason.into(),
    }
}

/// Whether the target kernel is known to predate `release`
///
/// An unknown version counts as current.
fn older_than(platform: &Platform, (major, minor): (u32, u32)) -> bool
{
    platform
        .kernel_version()
        .is_some_and(|version| version < KernelVersion::new(major, minor, 0))
}

/// Page shift for the target
///
/// `None` if the architecture is unknown or `CONFIG_ARM64_PAGE_SHIFT` is not
/// a valid page shift.
///
/// ```rust
/// use kscope_core::kernel::page_shift;
/// use kscope_core::platform::{KernelConfig, PlatformBuilder};
/// use kscope_core::types::Architecture;
///
/// let arm64 = PlatformBuilder::new(Architecture::Aarch64)
///     .kernel_release("6.6.0")
///     .kernel_config(KernelConfig::new().with("CONFIG_ARM64_64K_PAGES", "y"))
///     .build()?;
/// assert_eq!(page_shift(&arm64), Some(16));
/// # Ok::<(), kscope_core::KscopeError>(())
/// ```
pub fn page_shift(platform: &Platform) -> Option<u32>
{
    match platform.arch() {
        Architecture::X86_64 | Architecture::I386 | Architecture::Arm | Architecture::S390x | Architecture::RiscV64 => {
            Some(PAGE_SHIFT_4K)
        }
        Architecture::Aarch64 => {
            if let Some(shift) = platform.config_number("CONFIG_ARM64_PAGE_SHIFT") {
                return u32::try_from(shift).ok().filter(|shift| (PAGE_SHIFT_4K..=PAGE_SHIFT_64K).contains(shift));
            }
            if platform.has_config("CONFIG_ARM64_64K_PAGES") {
                Some(PAGE_SHIFT_64K)
            } else if platform.has_config("CONFIG_ARM64_16K_PAGES") {
                Some(PAGE_SHIFT_16K)
            } else {
                Some(PAGE_SHIFT_4K)
            }
        }
        Architecture::Ppc64 => {
            if platform.has_config("CONFIG_PPC_256K_PAGES") {
                Some(PAGE_SHIFT_256K)
            } else if platform.has_config("CONFIG_PPC_64K_PAGES") {
                Some(PAGE_SHIFT_64K)
            } else {
                Some(PAGE_SHIFT_4K)
            }
        }
        Architecture::Unknown(_) => None,
    }
}

/// Page shift, or the reason it cannot be known, naming `symbol`
pub(crate) fn require_page_shift(symbol: &str, platform: &Platform) -> Result<u32>
{
    page_shift(platform).ok_or_else(|| match platform.arch() {
        Architecture::Unknown(_) => unsupported_arch(symbol, platform),
        _ => unsupported_config(symbol, "CONFIG_ARM64_PAGE_SHIFT is out of range"),
    })
}

/// Read one target word at the address of `runtime_symbol`
fn read_word(ctx: &FindContext<'_>, symbol: &str, runtime_symbol: &str) -> Result<u64>
{
    let address = ctx
        .symbols
        .address_of(runtime_symbol)
        .ok_or_else(|| unsupported_config(symbol, format!("{runtime_symbol} is not in the symbol table")))?;
    let word = usize::from(ctx.platform.word_size());
    let bytes = ctx.memory.read_memory(address, word)?;
    let value = ctx.platform.byte_order().decode(&bytes);
    tracing::trace!(symbol, runtime_symbol, %address, value, "read layout word");
    Ok(value)
}

/// Where an x86-64 kernel takes its region bases from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum X86Layout
{
    /// Set at boot in `page_offset_base` and `vmemmap_base`
    Dynamic,
    /// 5-level paging forced at build time
    FixedL5,
    FixedL4,
}

fn x86_64_layout(platform: &Platform) -> X86Layout
{
    let five_level = platform.has_config("CONFIG_X86_5LEVEL");
    if platform.has_config("CONFIG_RANDOMIZE_MEMORY")
        || platform.has_config("CONFIG_DYNAMIC_MEMORY_LAYOUT")
        || (five_level && !older_than(platform, X86_64_DYNAMIC_LAYOUT_SINCE))
    {
        X86Layout::Dynamic
    } else if five_level {
        X86Layout::FixedL5
    } else {
        X86Layout::FixedL4
    }
}

fn aarch64_va_bits(symbol: &str, platform: &Platform) -> Result<u32>
{
    platform
        .config_number("CONFIG_ARM64_VA_BITS")
        .and_then(|bits| u32::try_from(bits).ok())
        .filter(|bits| (36..=52).contains(bits))
        .ok_or_else(|| unsupported_config(symbol, "CONFIG_ARM64_VA_BITS is unknown"))
}

/// Base of the kernel direct mapping (`PAGE_OFFSET`)
pub(crate) fn page_offset(ctx: &FindContext<'_>, symbol: &str) -> Result<u64>
{
    let platform = ctx.platform;
    match platform.arch() {
        Architecture::X86_64 => match x86_64_layout(platform) {
            X86Layout::Dynamic => read_word(ctx, symbol, PAGE_OFFSET_BASE),
            X86Layout::FixedL5 => Ok(X86_64_PAGE_OFFSET_L5_LEGACY),
            X86Layout::FixedL4 if older_than(platform, X86_64_PAGE_OFFSET_MOVED_IN) => Ok(X86_64_PAGE_OFFSET_L4_LEGACY),
            X86Layout::FixedL4 => Ok(X86_64_PAGE_OFFSET_L4),
        },
        Architecture::Aarch64 => {
            let va_bits = aarch64_va_bits(symbol, platform)?;
            let span = if older_than(platform, AARCH64_FLIPPED_VA_SINCE) { va_bits - 1 } else { va_bits };
            Ok((1u64 << span).wrapping_neg())
        }
        Architecture::I386 | Architecture::Arm => platform
            .config_number("CONFIG_PAGE_OFFSET")
            .ok_or_else(|| unsupported_config(symbol, "CONFIG_PAGE_OFFSET is unknown")),
        Architecture::Ppc64 => Ok(PPC64_PAGE_OFFSET),
        Architecture::S390x => Ok(0),
        Architecture::RiscV64 | Architecture::Unknown(_) => Err(unsupported_arch(symbol, platform)),
    }
}

/// AArch64 `VMEMMAP_START`, which moved twice
fn aarch64_vmemmap_start(ctx: &FindContext<'_>, symbol: &str, va_bits: u32, shift: u32) -> Result<u64>
{
    let platform = ctx.platform;
    let vmemmap_shift = shift.saturating_sub(STRUCT_PAGE_MAX_SHIFT);
    if older_than(platform, AARCH64_FLIPPED_VA_SINCE) {
        let size = 1u64 << (va_bits - 1 - vmemmap_shift);
        Ok(page_offset(ctx, symbol)?.wrapping_sub(size))
    } else if older_than(platform, AARCH64_VMEMMAP_AT_TOP_SINCE) {
        // (_PAGE_END(VA_BITS_MIN) - PAGE_OFFSET) >> (PAGE_SHIFT - STRUCT_PAGE_MAX_SHIFT)
        let va_bits_min = va_bits.min(AARCH64_VA_BITS_MIN);
        let linear = (1u64 << va_bits) - (1u64 << (va_bits_min - 1));
        let size = linear >> vmemmap_shift;
        Ok(size.wrapping_neg().wrapping_sub(AARCH64_VMEMMAP_GUARD))
    } else {
        Ok((1u64 << (va_bits - vmemmap_shift)).wrapping_neg())
    }
}

/// Address of the `struct page` array (`vmemmap`)
///
/// `struct_page_size` is used where the kernel offsets the array by the
/// first page frame of DRAM.
pub(crate) fn vmemmap(ctx: &FindContext<'_>, symbol: &str, struct_page_size: u64) -> Result<u64>
{
    let platform = ctx.platform;
    if !platform.config_known() {
        return Err(unsupported_config(symbol, "kernel configuration is unknown"));
    }
    match platform.arch() {
        Architecture::X86_64 => {
            if !platform.has_config("CONFIG_SPARSEMEM_VMEMMAP") {
                return Err(unsupported_config(symbol, "CONFIG_SPARSEMEM_VMEMMAP is not enabled"));
            }
            match x86_64_layout(platform) {
                X86Layout::Dynamic => read_word(ctx, symbol, VMEMMAP_BASE),
                X86Layout::FixedL5 => Ok(X86_64_VMEMMAP_L5),
                X86Layout::FixedL4 => Ok(X86_64_VMEMMAP_L4),
            }
        }
        Architecture::Aarch64 => {
            let va_bits = aarch64_va_bits(symbol, platform)?;
            let shift = require_page_shift(symbol, platform)?;
            let start = aarch64_vmemmap_start(ctx, symbol, va_bits, shift)?;
            let memstart = read_word(ctx, symbol, MEMSTART_ADDR)? as i64;
            let first_pfn = (memstart >> shift) as u64;
            Ok(start.wrapping_sub(first_pfn.wrapping_mul(struct_page_size)))
        }
        Architecture::S390x => read_word(ctx, symbol, S390_VMEMMAP),
        _ => Err(unsupported_arch(symbol, platform)),
    }
}
