//! Tests for platform-agnostic types

use std::sync::Arc;

use kscope_core::types::{Address, Architecture, ByteOrder, CPrimitive, Qualifiers, Type, TypeKind};

#[test]
fn test_address_from_u64()
{
    let address = Address::from(0xffff_8880_0000_0000);
    assert_eq!(address.value(), 0xffff_8880_0000_0000);
    let value: u64 = address.into();
    assert_eq!(value, 0xffff_8880_0000_0000);
}

#[test]
fn test_address_display_is_hex()
{
    assert_eq!(format!("{}", Address::from(0x1000)), "0x1000");
}

#[test]
fn test_address_truncates_to_word()
{
    let address = Address::from(0x1_0000_1000);
    assert_eq!(address.truncate(4), Address::from(0x1000));
    assert_eq!(address.truncate(8), address);
}

#[test]
fn test_architecture_word_sizes()
{
    assert_eq!(Architecture::X86_64.word_size(), 8);
    assert_eq!(Architecture::Aarch64.word_size(), 8);
    assert_eq!(Architecture::I386.word_size(), 4);
    assert_eq!(Architecture::Arm.word_size(), 4);
}

#[test]
fn test_architecture_default_byte_order()
{
    assert_eq!(Architecture::X86_64.default_byte_order(), ByteOrder::Little);
    assert_eq!(Architecture::S390x.default_byte_order(), ByteOrder::Big);
    assert_eq!(Architecture::Ppc64.default_byte_order(), ByteOrder::Big);
}

#[test]
fn test_byte_order_encode_decode()
{
    assert_eq!(ByteOrder::Little.encode(0x0102_0304, 4), vec![4, 3, 2, 1]);
    assert_eq!(ByteOrder::Big.encode(0x0102_0304, 4), vec![1, 2, 3, 4]);
    assert_eq!(ByteOrder::Big.decode(&[0, 0, 0x10, 0]), 0x1000);
}

#[test]
fn test_primitive_sizes_follow_word_size()
{
    assert_eq!(CPrimitive::UnsignedLong.build(8).byte_size(), Some(8));
    assert_eq!(CPrimitive::UnsignedLong.build(4).byte_size(), Some(4));
    assert_eq!(CPrimitive::LongLong.build(4).byte_size(), Some(8));
    assert_eq!(CPrimitive::Int.build(8).byte_size(), Some(4));
}

#[test]
fn test_type_display()
{
    let unsigned_long = Arc::new(CPrimitive::UnsignedLong.build(8));
    assert_eq!(unsigned_long.qualified(Qualifiers::VOLATILE).to_string(), "volatile unsigned long");

    let page = Arc::new(Type::incomplete_struct("page"));
    assert_eq!(Type::pointer(page, 8).to_string(), "struct page *");

    let char_ty = Arc::new(CPrimitive::Char.build(8));
    assert_eq!(Type::array(char_ty, Some(7)).to_string(), "char [7]");
}

#[test]
fn test_incomplete_struct_has_no_size()
{
    let page = Type::incomplete_struct("page");
    assert_eq!(page.byte_size(), None);
    assert!(matches!(page.kind(), TypeKind::Struct { .. }));
}
