//! Tests for error handling

use kscope_core::error::{KscopeError, Result};
use kscope_core::types::{Address, Architecture};

#[test]
fn test_not_found_display()
{
    let error = KscopeError::NotFound("jiffies".to_string());
    assert_eq!(format!("{}", error), "Symbol not found: jiffies");
    assert!(error.is_not_found());
    assert!(!error.is_memory_error());
}

#[test]
fn test_unsupported_arch_display()
{
    let error = KscopeError::UnsupportedArch {
        symbol: "vmemmap".to_string(),
        arch: Architecture::RiscV64,
    };
    let message = format!("{}", error);
    assert!(message.contains("vmemmap"));
    assert!(message.contains("riscv64"));
}

#[test]
fn test_unsupported_config_display()
{
    let error = KscopeError::UnsupportedConfig {
        symbol: "PAGE_OFFSET".to_string(),
        reason: "CONFIG_ARM64_VA_BITS is unknown".to_string(),
    };
    assert_eq!(
        format!("{}", error),
        "PAGE_OFFSET cannot be derived: CONFIG_ARM64_VA_BITS is unknown"
    );
}

#[test]
fn test_fault_is_memory_error()
{
    let error = KscopeError::Fault {
        address: Address::from(0xdead_0000),
        length: 8,
    };
    assert!(error.is_memory_error());
    assert_eq!(format!("{}", error), "Memory fault reading 8 bytes at 0xdead0000");
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error: KscopeError = io.into();
    match error {
        KscopeError::Io(_) => {
            // Expected: io::Error converts through #[from]
        }
        _ => panic!("Expected Io variant"),
    }
}

#[test]
fn test_invalid_cast_display()
{
    let error = KscopeError::InvalidCast {
        from: "struct list_head".to_string(),
        to: "int".to_string(),
    };
    assert_eq!(format!("{}", error), "Invalid cast from struct list_head to int");
}

#[test]
fn test_result_type_alias()
{
    fn returns_result() -> Result<u32>
    {
        Ok(42)
    }

    fn returns_error() -> Result<u32>
    {
        Err(KscopeError::NoValue)
    }

    assert_eq!(returns_result().unwrap(), 42);
    assert!(returns_error().is_err());
}
