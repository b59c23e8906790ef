//! # Kernel Layout Constants
//!
//! Fixed addresses and shifts from the Linux architecture headers, used when
//! a value is not randomized at boot and the build configuration pins it.
//!
//! ## Organization
//!
//! - Page geometry
//! - x86-64 direct map and vmemmap bases
//! - AArch64 layout
//! - PowerPC64 layout
//! - Symbol names read at runtime

// ============================================================================
// Page Geometry
// ============================================================================

/// 4 KiB pages, the default everywhere
pub const PAGE_SHIFT_4K: u32 = 12;

/// AArch64 `CONFIG_ARM64_16K_PAGES`
pub const PAGE_SHIFT_16K: u32 = 14;

/// AArch64 `CONFIG_ARM64_64K_PAGES`, PowerPC64 `CONFIG_PPC_64K_PAGES`
pub const PAGE_SHIFT_64K: u32 = 16;

/// PowerPC64 `CONFIG_PPC_256K_PAGES`
pub const PAGE_SHIFT_256K: u32 = 18;

/// `STRUCT_PAGE_MAX_SHIFT`: `struct page` is assumed to be at most 64 bytes
/// when sizing the vmemmap region
pub const STRUCT_PAGE_MAX_SHIFT: u32 = 6;

// ============================================================================
// x86-64
// ============================================================================

/// `__PAGE_OFFSET_BASE_L4` (arch/x86/include/asm/page_64_types.h), since v4.20
pub const X86_64_PAGE_OFFSET_L4: u64 = 0xffff_8880_0000_0000;

/// `__PAGE_OFFSET_BASE_L4` before the LDT remap moved the direct map (v4.20)
pub const X86_64_PAGE_OFFSET_L4_LEGACY: u64 = 0xffff_8800_0000_0000;

/// `__PAGE_OFFSET_BASE_L5` of kernels where `CONFIG_X86_5LEVEL` still forced
/// 5-level paging
pub const X86_64_PAGE_OFFSET_L5_LEGACY: u64 = 0xff10_0000_0000_0000;

/// `__VMEMMAP_BASE_L4` (arch/x86/include/asm/pgtable_64_types.h)
pub const X86_64_VMEMMAP_L4: u64 = 0xffff_ea00_0000_0000;

/// `__VMEMMAP_BASE_L5`
pub const X86_64_VMEMMAP_L5: u64 = 0xffd4_0000_0000_0000;

/// Release that moved the L4 direct map to `X86_64_PAGE_OFFSET_L4`
pub const X86_64_PAGE_OFFSET_MOVED_IN: (u32, u32) = (4, 20);

/// Release that made the paging mode a boot-time choice
/// (`CONFIG_DYNAMIC_MEMORY_LAYOUT`). From then on `CONFIG_X86_5LEVEL` only
/// means 5-level support is built in, and the bases live in
/// `page_offset_base` and `vmemmap_base`.
pub const X86_64_DYNAMIC_LAYOUT_SINCE: (u32, u32) = (4, 17);

// ============================================================================
// AArch64
// ============================================================================

/// Kernel release where the AArch64 linear map moved to the bottom half of
/// the kernel address space ("arm64: mm: Flip kernel VA space", v5.4)
pub const AARCH64_FLIPPED_VA_SINCE: (u32, u32) = (5, 4);

/// Kernel release where `VMEMMAP_START` moved to the top of the address
/// space ("arm64: mm: tidy up top of kernel VA space", v5.11)
pub const AARCH64_VMEMMAP_AT_TOP_SINCE: (u32, u32) = (5, 11);

/// `VA_BITS_MIN` of a 52-bit VA kernel
pub const AARCH64_VA_BITS_MIN: u32 = 48;

/// Guard gap below the vmemmap region on v5.4 to v5.10 (`SZ_2M`)
pub const AARCH64_VMEMMAP_GUARD: u64 = 2 << 20;

// ============================================================================
// PowerPC64
// ============================================================================

/// `PAGE_OFFSET` for Book3S 64-bit kernels
pub const PPC64_PAGE_OFFSET: u64 = 0xc000_0000_0000_0000;

// ============================================================================
// Runtime Symbols
// ============================================================================

/// 64-bit jiffies counter; `jiffies` is a linker alias of (part of) it
pub const JIFFIES_64: &str = "jiffies_64";

/// x86-64 randomized vmemmap base (`CONFIG_RANDOMIZE_MEMORY`)
pub const VMEMMAP_BASE: &str = "vmemmap_base";

/// x86-64 randomized direct map base (`CONFIG_RANDOMIZE_MEMORY`)
pub const PAGE_OFFSET_BASE: &str = "page_offset_base";

/// AArch64 physical start of DRAM
pub const MEMSTART_ADDR: &str = "memstart_addr";

/// s390x vmemmap pointer
pub const S390_VMEMMAP: &str = "vmemmap";
