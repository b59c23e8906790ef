//! Target architecture and byte order.

use std::fmt;
use std::str::FromStr;

/// Byte order of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder
{
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl ByteOrder
{
    /// Decode an unsigned integer of up to 8 bytes
    ///
    /// ```rust
    /// use kscope_core::types::ByteOrder;
    ///
    /// assert_eq!(ByteOrder::Little.decode(&[0x34, 0x12]), 0x1234);
    /// assert_eq!(ByteOrder::Big.decode(&[0x12, 0x34]), 0x1234);
    /// ```
    pub fn decode(self, bytes: &[u8]) -> u64
    {
        let bytes = &bytes[..bytes.len().min(8)];
        match self {
            ByteOrder::Little => bytes.iter().rev().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
            ByteOrder::Big => bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
        }
    }

    /// Encode the low `size` bytes of `value` (size at most 8)
    ///
    /// ```rust
    /// use kscope_core::types::ByteOrder;
    ///
    /// assert_eq!(ByteOrder::Little.encode(0x1234, 4), vec![0x34, 0x12, 0, 0]);
    /// assert_eq!(ByteOrder::Big.encode(0x1234, 2), vec![0x12, 0x34]);
    /// ```
    pub fn encode(self, value: u64, size: usize) -> Vec<u8>
    {
        let size = size.min(8);
        let le = value.to_le_bytes();
        match self {
            ByteOrder::Little => le[..size].to_vec(),
            ByteOrder::Big => le[..size].iter().rev().copied().collect(),
        }
    }
}

impl fmt::Display for ByteOrder
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            ByteOrder::Little => f.write_str("little-endian"),
            ByteOrder::Big => f.write_str("big-endian"),
        }
    }
}

/// CPU architecture of the inspected target
///
/// This is the architecture of the *target* (kernel, process or snapshot),
/// which can differ from the architecture kscope itself runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 64-bit x86 (Intel/AMD)
    X86_64,
    /// 32-bit x86
    I386,
    /// 64-bit ARM
    Aarch64,
    /// 32-bit ARM
    Arm,
    /// 64-bit PowerPC (big-endian by default, little-endian as ppc64le)
    Ppc64,
    /// IBM Z
    S390x,
    /// 64-bit RISC-V
    RiscV64,
    /// Any other architecture
    ///
    /// The `&'static str` contains the architecture name. Synthetic constants
    /// that depend on the architecture fail with `UnsupportedArch` for these.
    Unknown(&'static str),
}

impl Architecture
{
    /// Size of a pointer (and of `unsigned long`) in bytes
    pub const fn word_size(self) -> u8
    {
        match self {
            Architecture::X86_64
            | Architecture::Aarch64
            | Architecture::Ppc64
            | Architecture::S390x
            | Architecture::RiscV64 => 8,
            Architecture::I386 | Architecture::Arm => 4,
            Architecture::Unknown(_) => 8,
        }
    }

    /// Default byte order; PowerPC64 and s390x are big-endian
    pub const fn default_byte_order(self) -> ByteOrder
    {
        match self {
            Architecture::Ppc64 | Architecture::S390x => ByteOrder::Big,
            _ => ByteOrder::Little,
        }
    }

    /// Canonical name, matching the kernel's `uname -m` spelling
    pub const fn name(self) -> &'static str
    {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::I386 => "i386",
            Architecture::Aarch64 => "aarch64",
            Architecture::Arm => "arm",
            Architecture::Ppc64 => "ppc64",
            Architecture::S390x => "s390x",
            Architecture::RiscV64 => "riscv64",
            Architecture::Unknown(name) => name,
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

impl FromStr for Architecture
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "x86_64" | "x86-64" | "amd64" => Ok(Architecture::X86_64),
            "i386" | "i686" | "x86" => Ok(Architecture::I386),
            "aarch64" | "arm64" => Ok(Architecture::Aarch64),
            "arm" | "armv7l" => Ok(Architecture::Arm),
            "ppc64" | "ppc64le" | "powerpc64" => Ok(Architecture::Ppc64),
            "s390x" => Ok(Architecture::S390x),
            "riscv64" => Ok(Architecture::RiscV64),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_architecture_from_str_aliases()
    {
        assert_eq!("arm64".parse::<Architecture>().unwrap(), Architecture::Aarch64);
        assert_eq!("AMD64".parse::<Architecture>().unwrap(), Architecture::X86_64);
        assert_eq!("ppc64le".parse::<Architecture>().unwrap(), Architecture::Ppc64);
        assert!("vax".parse::<Architecture>().is_err());
    }

    #[test]
    fn test_word_sizes()
    {
        assert_eq!(Architecture::X86_64.word_size(), 8);
        assert_eq!(Architecture::Arm.word_size(), 4);
        assert_eq!(Architecture::I386.word_size(), 4);
    }

    #[test]
    fn test_decode_truncates_to_eight_bytes()
    {
        let bytes = [1, 0, 0, 0, 0, 0, 0, 0, 0xff];
        assert_eq!(ByteOrder::Little.decode(&bytes), 1);
    }
}
