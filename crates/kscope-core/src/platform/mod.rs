//! # Platform Context
//!
//! Immutable facts about the attached target: architecture, word size, byte
//! order and, for kernel targets, the release string and build configuration.
//!
//! A [`Platform`] is created once when a target is attached and never changes
//! afterwards. Inspecting a different target means building a new
//! [`crate::Program`] with a new `Platform`; nothing here is global, so two
//! programs (for example two snapshots) stay independent.
//!
//! ## Example
//!
//! ```rust
//! use kscope_core::platform::{KernelConfig, PlatformBuilder};
//! use kscope_core::types::Architecture;
//!
//! let platform = PlatformBuilder::new(Architecture::X86_64)
//!     .kernel_release("6.1.0-13-amd64")
//!     .kernel_config(KernelConfig::new().with("CONFIG_SPARSEMEM_VMEMMAP", "y"))
//!     .build()?;
//!
//! assert_eq!(platform.word_size(), 8);
//! assert_eq!(platform.kernel_version().map(|v| (v.major, v.minor)), Some((6, 1)));
//! assert!(platform.has_config("CONFIG_SPARSEMEM_VMEMMAP"));
//! # Ok::<(), kscope_core::KscopeError>(())
//! ```

pub mod kconfig;

use std::fmt;

pub use kconfig::KernelConfig;
use object::{Object, ReadRef};

use crate::error::{KscopeError, Result};
use crate::types::{Architecture, ByteOrder};

/// Numeric kernel version parsed from a release string
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KernelVersion
{
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl KernelVersion
{
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self
    {
        Self { major, minor, patch }
    }

    /// Parse the leading `X.Y[.Z]` of a release such as `5.15.0-91-generic`
    ///
    /// ```rust
    /// use kscope_core::platform::KernelVersion;
    ///
    /// assert_eq!(KernelVersion::parse("5.15.0-91-generic"), Some(KernelVersion::new(5, 15, 0)));
    /// assert_eq!(KernelVersion::parse("6.8-rc3"), Some(KernelVersion::new(6, 8, 0)));
    /// assert_eq!(KernelVersion::parse("garbage"), None);
    /// ```
    pub fn parse(release: &str) -> Option<Self>
    {
        let mut numbers = release
            .split(|c: char| !c.is_ascii_digit())
            .take(3)
            .map(|part| part.parse::<u32>().ok());
        let major = numbers.next()??;
        let minor = numbers.next()??;
        // a missing or non-numeric third component ("6.8-rc3") is patch 0
        let patch = numbers.next().flatten().unwrap_or(0);
        Some(Self { major, minor, patch })
    }
}

impl fmt::Display for KernelVersion
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Kernel-specific facts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInfo
{
    release: String,
    version: Option<KernelVersion>,
    config: KernelConfig,
}

impl KernelInfo
{
    pub fn release(&self) -> &str
    {
        &self.release
    }

    pub fn version(&self) -> Option<KernelVersion>
    {
        self.version
    }

    pub fn config(&self) -> &KernelConfig
    {
        &self.config
    }
}

/// Immutable per-target platform context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform
{
    arch: Architecture,
    word_size: u8,
    byte_order: ByteOrder,
    kernel: Option<KernelInfo>,
}

impl Platform
{
    pub fn arch(&self) -> Architecture
    {
        self.arch
    }

    /// Pointer and `unsigned long` width in bytes (4 or 8)
    pub fn word_size(&self) -> u8
    {
        self.word_size
    }

    pub fn byte_order(&self) -> ByteOrder
    {
        self.byte_order
    }

    pub fn is_little_endian(&self) -> bool
    {
        self.byte_order == ByteOrder::Little
    }

    /// Whether the target is an operating-system kernel
    pub fn is_kernel(&self) -> bool
    {
        self.kernel.is_some()
    }

    pub fn kernel(&self) -> Option<&KernelInfo>
    {
        self.kernel.as_ref()
    }

    pub fn kernel_release(&self) -> Option<&str>
    {
        self.kernel.as_ref().map(KernelInfo::release)
    }

    pub fn kernel_version(&self) -> Option<KernelVersion>
    {
        self.kernel.as_ref().and_then(KernelInfo::version)
    }

    /// Whether a kconfig option is enabled (`y` or `m`); false for non-kernel targets
    pub fn has_config(&self, flag: &str) -> bool
    {
        self.kernel.as_ref().is_some_and(|k| k.config.has_config(flag))
    }

    /// Raw kconfig value, if known
    pub fn config_value(&self, flag: &str) -> Option<&str>
    {
        self.kernel.as_ref().and_then(|k| k.config.value(flag))
    }

    /// Numeric kconfig value, if known and numeric
    pub fn config_number(&self, flag: &str) -> Option<u64>
    {
        self.kernel.as_ref().and_then(|k| k.config.number(flag))
    }

    /// Whether any build configuration is known for this target
    pub fn config_known(&self) -> bool
    {
        self.kernel.as_ref().is_some_and(|k| !k.config.is_empty())
    }

    /// Mask of the bits addressable with one word
    pub fn word_mask(&self) -> u64
    {
        if self.word_size >= 8 {
            u64::MAX
        } else {
            (1u64 << (u32::from(self.word_size) * 8)) - 1
        }
    }
}

impl fmt::Display for Platform
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} ({}-bit, {})", self.arch, u32::from(self.word_size) * 8, self.byte_order)?;
        if let Some(kernel) = &self.kernel {
            write!(f, ", Linux {}", kernel.release)?;
        }
        Ok(())
    }
}

/// Builder for [`Platform`]
#[derive(Debug, Clone)]
pub struct PlatformBuilder
{
    arch: Architecture,
    word_size: Option<u8>,
    byte_order: Option<ByteOrder>,
    release: Option<String>,
    config: KernelConfig,
}

impl PlatformBuilder
{
    pub fn new(arch: Architecture) -> Self
    {
        Self {
            arch,
            word_size: None,
            byte_order: None,
            release: None,
            config: KernelConfig::new(),
        }
    }

    /// Start from the architecture, class and endianness recorded in an ELF file
    ///
    /// ## Errors
    ///
    /// Returns `Parse` if the data is not a recognizable object file.
    pub fn from_elf(data: &[u8]) -> Result<Self>
    {
        let file = object::File::parse(data).map_err(|err| KscopeError::Parse(format!("object file: {err}")))?;
        let (arch, byte_order, word_size) = describe_object(&file);
        tracing::debug!(%arch, %byte_order, word_size, kind = ?file.kind(), "platform detected from object file");
        Ok(Self::new(arch).byte_order(byte_order).word_size(word_size))
    }

    #[must_use]
    pub fn word_size(mut self, word_size: u8) -> Self
    {
        self.word_size = Some(word_size);
        self
    }

    #[must_use]
    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self
    {
        self.byte_order = Some(byte_order);
        self
    }

    /// Mark the target as a kernel with this release (`uname -r`)
    #[must_use]
    pub fn kernel_release(mut self, release: impl Into<String>) -> Self
    {
        self.release = Some(release.into());
        self
    }

    #[must_use]
    pub fn kernel_config(mut self, config: KernelConfig) -> Self
    {
        self.config = config;
        self
    }

    /// Finish the platform
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument` if the word size is not 4 or 8
    /// - `InvalidArgument` if a kernel config was given without a release
    pub fn build(self) -> Result<Platform>
    {
        let word_size = self.word_size.unwrap_or_else(|| self.arch.word_size());
        if word_size != 4 && word_size != 8 {
            return Err(KscopeError::InvalidArgument(format!("unsupported word size {word_size}")));
        }
        let kernel = match self.release {
            Some(release) => Some(KernelInfo {
                version: KernelVersion::parse(&release),
                release,
                config: self.config,
            }),
            None if !self.config.is_empty() => {
                return Err(KscopeError::InvalidArgument(
                    "kernel config given without a kernel release".to_string(),
                ));
            }
            None => None,
        };
        Ok(Platform {
            arch: self.arch,
            word_size,
            byte_order: self.byte_order.unwrap_or_else(|| self.arch.default_byte_order()),
            kernel,
        })
    }
}

/// Architecture, byte order and word size of a parsed object file
pub(crate) fn describe_object<'data, R: ReadRef<'data>>(file: &object::File<'data, R>) -> (Architecture, ByteOrder, u8)
{
    let arch = match file.architecture() {
        object::Architecture::X86_64 => Architecture::X86_64,
        object::Architecture::I386 => Architecture::I386,
        object::Architecture::Aarch64 => Architecture::Aarch64,
        object::Architecture::Arm => Architecture::Arm,
        object::Architecture::PowerPc64 => Architecture::Ppc64,
        object::Architecture::S390x => Architecture::S390x,
        object::Architecture::Riscv64 => Architecture::RiscV64,
        _ => Architecture::Unknown("unknown"),
    };
    let byte_order = if file.is_little_endian() {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    };
    let word_size = if file.is_64() { 8 } else { 4 };
    (arch, byte_order, word_size)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_defaults_follow_architecture()
    {
        let platform = PlatformBuilder::new(Architecture::S390x).build().unwrap();
        assert_eq!(platform.word_size(), 8);
        assert_eq!(platform.byte_order(), ByteOrder::Big);
        assert!(!platform.is_kernel());
        assert!(!platform.has_config("CONFIG_ANYTHING"));
    }

    #[test]
    fn test_overrides()
    {
        let platform = PlatformBuilder::new(Architecture::Ppc64)
            .byte_order(ByteOrder::Little)
            .build()
            .unwrap();
        assert!(platform.is_little_endian());
    }

    #[test]
    fn test_rejects_bad_word_size()
    {
        let result = PlatformBuilder::new(Architecture::X86_64).word_size(2).build();
        assert!(matches!(result, Err(KscopeError::InvalidArgument(_))));
    }

    #[test]
    fn test_config_requires_kernel()
    {
        let result = PlatformBuilder::new(Architecture::X86_64)
            .kernel_config(KernelConfig::new().with("CONFIG_SMP", "y"))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_word_mask()
    {
        let arm = PlatformBuilder::new(Architecture::Arm).build().unwrap();
        assert_eq!(arm.word_mask(), 0xffff_ffff);
        let x86 = PlatformBuilder::new(Architecture::X86_64).build().unwrap();
        assert_eq!(x86.word_mask(), u64::MAX);
    }

    #[test]
    fn test_kernel_version_ordering()
    {
        assert!(KernelVersion::new(5, 4, 0) > KernelVersion::new(4, 19, 250));
        assert_eq!(KernelVersion::parse("4.19.0").map(|v| v.to_string()), Some("4.19.0".to_string()));
    }
}
