//! # Memory Access
//!
//! The boundary between resolution and the physical target. A backend turns
//! an address (or a register) and a length into bytes, and reports two kinds
//! of failure that callers must keep apart:
//!
//! - [`KscopeError::Fault`]: the address is not mapped or not readable
//! - [`KscopeError::Io`]: the backend itself failed (file gone, device error)
//!
//! Reads are synchronous and happen on the calling thread. Backends provided
//! here:
//!
//! - [`SegmentMemory`]: in-memory segments and registers
//! - [`CoreDump`]: ELF core snapshots, including `/proc/kcore`
//! - [`ProcessMemory`]: a live process through `/proc/<pid>/mem` (Linux)
//!
//! [`KscopeError::Fault`]: crate::error::KscopeError::Fault
//! [`KscopeError::Io`]: crate::error::KscopeError::Io

#[cfg(unix)]
pub mod core_dump;
#[cfg(target_os = "linux")]
pub mod process;
pub mod segments;

use std::fmt;

#[cfg(unix)]
pub use core_dump::CoreDump;
#[cfg(target_os = "linux")]
pub use process::ProcessMemory;
pub use segments::SegmentMemory;

use crate::error::{KscopeError, Result};
use crate::types::Address;

/// Identifier of a register in the target's register file (DWARF numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterId(pub u16);

impl fmt::Display for RegisterId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "r{}", self.0)
    }
}

/// Where a referenced value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location
{
    Memory(Address),
    Register(RegisterId),
}

impl fmt::Display for Location
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Location::Memory(address) => write!(f, "{address}"),
            Location::Register(register) => write!(f, "{register}"),
        }
    }
}

/// Read access to the active target
///
/// Implementations must be usable from several threads, either because the
/// underlying access is thread-safe (positional file reads) or because they
/// serialize internally.
pub trait MemoryReader: Send + Sync
{
    /// Read exactly `length` bytes starting at `address`
    ///
    /// ## Errors
    ///
    /// - `Fault` if any byte of the range is not readable
    /// - `Io` if the backend fails
    fn read_memory(&self, address: Address, length: usize) -> Result<Vec<u8>>;

    /// Read the first `length` bytes of a register
    ///
    /// The default implementation has no register file and faults.
    fn read_register(&self, register: RegisterId, length: usize) -> Result<Vec<u8>>
    {
        tracing::trace!(%register, length, "register read without a register file");
        Err(KscopeError::Fault {
            address: Address::ZERO,
            length,
        })
    }

    /// Read from either kind of location
    fn read(&self, location: Location, length: usize) -> Result<Vec<u8>>
    {
        match location {
            Location::Memory(address) => self.read_memory(address, length),
            Location::Register(register) => self.read_register(register, length),
        }
    }
}

impl<M: MemoryReader + ?Sized> MemoryReader for std::sync::Arc<M>
{
    fn read_memory(&self, address: Address, length: usize) -> Result<Vec<u8>>
    {
        (**self).read_memory(address, length)
    }

    fn read_register(&self, register: RegisterId, length: usize) -> Result<Vec<u8>>
    {
        (**self).read_register(register, length)
    }
}
