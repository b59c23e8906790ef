//! Live process memory through `/proc/<pid>/mem`.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

use super::MemoryReader;
use crate::error::{KscopeError, Result};
use crate::types::Address;

/// Memory backend for a running Linux process
///
/// Requires ptrace access to the target (same user with a permissive
/// `ptrace_scope`, or `CAP_SYS_PTRACE`). Every read goes to the live process;
/// nothing is cached.
#[derive(Debug)]
pub struct ProcessMemory
{
    pid: u32,
    file: File,
}

impl ProcessMemory
{
    /// Open the memory of process `pid`
    ///
    /// ## Errors
    ///
    /// `Io` if `/proc/<pid>/mem` cannot be opened (no such process, no
    /// permission).
    pub fn attach(pid: u32) -> Result<Self>
    {
        let path = PathBuf::from(format!("/proc/{pid}/mem"));
        let file = File::open(&path)?;
        tracing::debug!(pid, "opened process memory");
        Ok(Self { pid, file })
    }

    pub fn pid(&self) -> u32
    {
        self.pid
    }
}

impl MemoryReader for ProcessMemory
{
    fn read_memory(&self, address: Address, length: usize) -> Result<Vec<u8>>
    {
        let mut buf = vec![0u8; length];
        match self.file.read_exact_at(&mut buf, address.value()) {
            Ok(()) => Ok(buf),
            // unmapped pages surface as EIO (or EFAULT on some kernels)
            Err(err) if matches!(err.raw_os_error(), Some(libc::EIO | libc::EFAULT)) => {
                Err(KscopeError::Fault { address, length })
            }
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Err(KscopeError::Fault { address, length }),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_read_own_memory()
    {
        let value: u64 = 0x1122_3344_5566_7788;
        let memory = ProcessMemory::attach(std::process::id()).unwrap();
        let address = Address::from(std::ptr::addr_of!(value) as u64);
        let bytes = memory.read_memory(address, 8).unwrap();
        assert_eq!(bytes, value.to_ne_bytes());
    }

    #[test]
    fn test_unmapped_address_faults()
    {
        let memory = ProcessMemory::attach(std::process::id()).unwrap();
        let err = memory.read_memory(Address::from(8), 8).unwrap_err();
        assert!(matches!(err, KscopeError::Fault { .. }));
    }
}
