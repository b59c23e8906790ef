//! ELF core snapshots.
//!
//! Works for post-mortem dumps (`vmcore`, process cores) and for the live
//! kernel through `/proc/kcore`, which the kernel exposes as an ELF core.
//! Only the program headers are parsed up front; segment contents are read on
//! demand with positional reads, so multi-gigabyte dumps cost nothing to open.

use std::fs::File;
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use object::{Object, ObjectSegment, ReadCache};

use super::MemoryReader;
use crate::error::{KscopeError, Result};
use crate::platform::describe_object;
use crate::types::{Address, Architecture, ByteOrder};

/// One `PT_LOAD` segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CoreSegment
{
    vaddr: u64,
    memsz: u64,
    offset: u64,
    filesz: u64,
}

impl CoreSegment
{
    fn contains(&self, address: u64) -> bool
    {
        address >= self.vaddr && address - self.vaddr < self.memsz
    }
}

/// Memory backend over an ELF core file
#[derive(Debug)]
pub struct CoreDump
{
    path: PathBuf,
    file: File,
    segments: Vec<CoreSegment>,
    arch: Architecture,
    byte_order: ByteOrder,
    word_size: u8,
}

impl CoreDump
{
    /// Open a core file and index its loadable segments
    ///
    /// ## Errors
    ///
    /// - `Io` if the file cannot be opened
    /// - `Parse` if it is not an ELF core
    pub fn open(path: impl AsRef<Path>) -> Result<Self>
    {
        let path = path.as_ref().to_path_buf();
        let cache = ReadCache::new(File::open(&path)?);
        let (segments, (arch, byte_order, word_size)) = {
            let elf = object::File::parse(&cache)
                .map_err(|err| KscopeError::Parse(format!("failed to parse {}: {err}", path.display())))?;
            if elf.kind() != object::ObjectKind::Core {
                return Err(KscopeError::Parse(format!("{} is not a core file", path.display())));
            }
            let mut segments: Vec<CoreSegment> = elf
                .segments()
                .map(|segment| {
                    let (offset, filesz) = segment.file_range();
                    CoreSegment {
                        vaddr: segment.address(),
                        memsz: segment.size().max(filesz),
                        offset,
                        filesz,
                    }
                })
                .filter(|segment| segment.memsz > 0)
                .collect();
            segments.sort_by_key(|segment| segment.vaddr);
            (segments, describe_object(&elf))
        };
        tracing::debug!(path = %path.display(), segments = segments.len(), %arch, "opened core dump");
        Ok(Self {
            path,
            file: cache.into_inner(),
            segments,
            arch,
            byte_order,
            word_size,
        })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn architecture(&self) -> Architecture
    {
        self.arch
    }

    pub fn byte_order(&self) -> ByteOrder
    {
        self.byte_order
    }

    pub fn word_size(&self) -> u8
    {
        self.word_size
    }

    fn segment_for(&self, address: u64) -> Option<&CoreSegment>
    {
        let index = self.segments.partition_point(|segment| segment.vaddr <= address);
        self.segments[..index].iter().rev().find(|segment| segment.contains(address))
    }
}

impl MemoryReader for CoreDump
{
    fn read_memory(&self, address: Address, length: usize) -> Result<Vec<u8>>
    {
        let fault = || KscopeError::Fault { address, length };
        let mut out = vec![0u8; length];
        let mut done = 0usize;
        while done < length {
            let cursor = address.value().checked_add(done as u64).ok_or_else(fault)?;
            let segment = self.segment_for(cursor).ok_or_else(fault)?;
            let offset = cursor - segment.vaddr;
            let available = usize::try_from(segment.memsz - offset).unwrap_or(usize::MAX);
            let take = (length - done).min(available);
            let chunk = &mut out[done..done + take];

            // bytes past p_filesz are zero (already zeroed above)
            if offset < segment.filesz {
                let in_file = usize::try_from(segment.filesz - offset).unwrap_or(usize::MAX).min(take);
                match self.file.read_exact_at(&mut chunk[..in_file], segment.offset + offset) {
                    Ok(()) => {}
                    Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                        tracing::warn!(%address, length, "core dump truncated");
                        return Err(fault());
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            done += take;
        }
        Ok(out)
    }
}
