//! Tests for the synthetic kernel symbols across architectures

use std::sync::Arc;

use kscope_core::finder::FindKind;
use kscope_core::memory::SegmentMemory;
use kscope_core::platform::{KernelConfig, PlatformBuilder};
use kscope_core::symbols::SymbolTable;
use kscope_core::types::{Address, Architecture, ByteOrder};
use kscope_core::{KscopeError, ObjectKind, Program};

fn program(arch: Architecture, config: KernelConfig) -> Program
{
    let platform = PlatformBuilder::new(arch)
        .kernel_release("6.6.0")
        .kernel_config(config)
        .build()
        .unwrap();
    Program::new(platform, Arc::new(SegmentMemory::new()))
}

#[test]
fn test_page_shift_bytes_every_arch()
{
    let cases = [
        (Architecture::X86_64, [12, 0, 0, 0]),
        (Architecture::I386, [12, 0, 0, 0]),
        (Architecture::Aarch64, [12, 0, 0, 0]),
        (Architecture::Arm, [12, 0, 0, 0]),
        (Architecture::RiscV64, [12, 0, 0, 0]),
        (Architecture::Ppc64, [0, 0, 0, 12]),
        (Architecture::S390x, [0, 0, 0, 12]),
    ];
    for (arch, bytes) in cases {
        let program = program(arch, KernelConfig::new());
        let shift = program.constant("PAGE_SHIFT").unwrap();
        assert_eq!(shift.kind(), ObjectKind::Value);
        assert_eq!(program.read(&shift).unwrap(), bytes, "{arch}");
    }
}

#[test]
fn test_page_size_and_mask_agree()
{
    for arch in [Architecture::X86_64, Architecture::Arm, Architecture::S390x] {
        let program = program(arch, KernelConfig::new());
        let size = program.read_unsigned(&program.constant("PAGE_SIZE").unwrap()).unwrap();
        let mask = program.read_unsigned(&program.constant("PAGE_MASK").unwrap()).unwrap();
        assert_eq!(size, 4096);
        assert_eq!(mask & (size - 1), 0, "{arch}");
        assert_eq!(mask | (size - 1), program.platform().word_mask(), "{arch}");
    }
}

#[test]
fn test_page_size_64k_aarch64()
{
    let program = program(Architecture::Aarch64, KernelConfig::new().with("CONFIG_ARM64_64K_PAGES", "y"));
    assert_eq!(program.read_unsigned(&program.constant("PAGE_SIZE").unwrap()).unwrap(), 65536);
    assert_eq!(
        program.read_unsigned(&program.constant("PAGE_MASK").unwrap()).unwrap(),
        0xffff_ffff_ffff_0000
    );
}

#[test]
fn test_page_size_as_variable_is_not_found()
{
    let program = program(Architecture::X86_64, KernelConfig::new());
    assert!(program.variable("PAGE_SIZE").unwrap_err().is_not_found());
}

#[test]
fn test_uts_release_matches_platform()
{
    let platform = PlatformBuilder::new(Architecture::S390x)
        .kernel_release("5.14.0-362.el9.s390x")
        .build()
        .unwrap();
    let program = Program::new(platform, Arc::new(SegmentMemory::new()));
    let release = program.constant("UTS_RELEASE").unwrap();
    let bytes = program.read(&release).unwrap();
    assert_eq!(bytes.len(), "5.14.0-362.el9.s390x".len() + 1);
    assert_eq!(&bytes[..bytes.len() - 1], b"5.14.0-362.el9.s390x");
    assert_eq!(bytes.last(), Some(&0));
}

#[test]
fn test_jiffies_constant_is_not_found()
{
    let program = program(Architecture::X86_64, KernelConfig::new());
    assert!(program.find("jiffies", None, FindKind::CONSTANT).unwrap().is_none());
}

#[test]
fn test_vmemmap_without_config_is_unsupported()
{
    let program = program(Architecture::X86_64, KernelConfig::new());
    assert!(matches!(
        program.constant("vmemmap"),
        Err(KscopeError::UnsupportedConfig { .. })
    ));
}

#[test]
fn test_vmemmap_on_unsupported_arch()
{
    let program = program(Architecture::Ppc64, KernelConfig::new().with("CONFIG_SPARSEMEM_VMEMMAP", "y"));
    match program.constant("vmemmap") {
        Err(KscopeError::UnsupportedArch { symbol, arch }) => {
            assert_eq!(symbol, "vmemmap");
            assert_eq!(arch, Architecture::Ppc64);
        }
        other => panic!("Expected UnsupportedArch, got {other:?}"),
    }
}

#[test]
fn test_vmemmap_s390x_reads_symbol()
{
    let platform = PlatformBuilder::new(Architecture::S390x)
        .kernel_release("6.6.0")
        .kernel_config(KernelConfig::new().with("CONFIG_SPARSEMEM_VMEMMAP", "y"))
        .build()
        .unwrap();
    let mut memory = SegmentMemory::new();
    memory
        .add_segment(Address::from(0x1a0_0000), ByteOrder::Big.encode(0x0000_0400_0000_0000, 8))
        .unwrap();
    let symbols = SymbolTable::parse_system_map("00000000001a0000 D vmemmap\n").unwrap();
    let program = Program::new(platform, Arc::new(memory)).with_symbols(symbols);
    assert_eq!(
        program.read_unsigned(&program.constant("vmemmap").unwrap()).unwrap(),
        0x0000_0400_0000_0000
    );
}

#[test]
fn test_page_offset_from_config_on_32_bit()
{
    let program = program(Architecture::I386, KernelConfig::new().with("CONFIG_PAGE_OFFSET", "0xC0000000"));
    assert_eq!(
        program.read_unsigned(&program.constant("PAGE_OFFSET").unwrap()).unwrap(),
        0xc000_0000
    );

    let unknown = self::program(Architecture::Arm, KernelConfig::new().with("CONFIG_ARM", "y"));
    assert!(matches!(
        unknown.constant("PAGE_OFFSET"),
        Err(KscopeError::UnsupportedConfig { .. })
    ));
}

#[test]
fn test_user_space_target_has_no_synthetic_symbols()
{
    let platform = PlatformBuilder::new(Architecture::X86_64).build().unwrap();
    let program = Program::new(platform, Arc::new(SegmentMemory::new()));
    assert!(program.find("PAGE_SIZE", None, FindKind::ANY).unwrap().is_none());
}
