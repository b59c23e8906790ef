//! In-memory target image.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{MemoryReader, RegisterId};
use crate::error::{KscopeError, Result};
use crate::types::Address;

/// Target memory held entirely in process
///
/// Segments are keyed by base address and must not overlap. A read that
/// touches any byte outside a segment faults, even if the rest of the range is
/// mapped. Also carries an optional register file.
///
/// ## Example
///
/// ```rust
/// use kscope_core::memory::{MemoryReader, SegmentMemory};
/// use kscope_core::types::Address;
///
/// let mut memory = SegmentMemory::new();
/// memory.add_segment(Address::from(0x1000), vec![1, 2, 3, 4])?;
/// assert_eq!(memory.read_memory(Address::from(0x1001), 2)?, vec![2, 3]);
/// assert!(memory.read_memory(Address::from(0x1003), 2).is_err());
/// # Ok::<(), kscope_core::KscopeError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SegmentMemory
{
    segments: BTreeMap<u64, Arc<[u8]>>,
    registers: HashMap<RegisterId, Vec<u8>>,
}

impl SegmentMemory
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Map `data` at `base`
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if the segment is empty, wraps the address space, or
    /// overlaps an existing segment.
    pub fn add_segment(&mut self, base: Address, data: impl Into<Arc<[u8]>>) -> Result<()>
    {
        let data = data.into();
        let start = base.value();
        let end = start
            .checked_add(data.len() as u64)
            .filter(|end| *end > start)
            .ok_or_else(|| KscopeError::InvalidArgument(format!("bad segment at {base}")))?;

        let overlaps_prev = self
            .segments
            .range(..end)
            .next_back()
            .is_some_and(|(prev, bytes)| prev + bytes.len() as u64 > start);
        if overlaps_prev {
            return Err(KscopeError::InvalidArgument(format!("segment at {base} overlaps")));
        }
        self.segments.insert(start, data);
        Ok(())
    }

    /// Set the contents of a register
    pub fn set_register(&mut self, register: RegisterId, bytes: Vec<u8>)
    {
        self.registers.insert(register, bytes);
    }

    pub fn segment_count(&self) -> usize
    {
        self.segments.len()
    }
}

impl MemoryReader for SegmentMemory
{
    fn read_memory(&self, address: Address, length: usize) -> Result<Vec<u8>>
    {
        let fault = || KscopeError::Fault { address, length };
        let mut out = Vec::with_capacity(length);
        let mut cursor = address.value();
        while out.len() < length {
            let (base, bytes) = self.segments.range(..=cursor).next_back().ok_or_else(fault)?;
            let offset = usize::try_from(cursor - base).map_err(|_| fault())?;
            if offset >= bytes.len() {
                return Err(fault());
            }
            let take = (length - out.len()).min(bytes.len() - offset);
            out.extend_from_slice(&bytes[offset..offset + take]);
            cursor = cursor.checked_add(take as u64).ok_or_else(fault)?;
        }
        Ok(out)
    }

    fn read_register(&self, register: RegisterId, length: usize) -> Result<Vec<u8>>
    {
        match self.registers.get(&register) {
            Some(bytes) if bytes.len() >= length => Ok(bytes[..length].to_vec()),
            _ => Err(KscopeError::Fault {
                address: Address::ZERO,
                length,
            }),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_read_spanning_adjacent_segments()
    {
        let mut memory = SegmentMemory::new();
        memory.add_segment(Address::from(0x1000), vec![0xaa; 4]).unwrap();
        memory.add_segment(Address::from(0x1004), vec![0xbb; 4]).unwrap();
        let bytes = memory.read_memory(Address::from(0x1002), 4).unwrap();
        assert_eq!(bytes, vec![0xaa, 0xaa, 0xbb, 0xbb]);
    }

    #[test]
    fn test_hole_faults()
    {
        let mut memory = SegmentMemory::new();
        memory.add_segment(Address::from(0x1000), vec![0; 4]).unwrap();
        memory.add_segment(Address::from(0x2000), vec![0; 4]).unwrap();
        let err = memory.read_memory(Address::from(0x1002), 8).unwrap_err();
        assert!(matches!(err, KscopeError::Fault { address, length: 8 } if address == Address::from(0x1002)));
        assert!(memory.read_memory(Address::from(0x10), 1).is_err());
    }

    #[test]
    fn test_overlap_rejected()
    {
        let mut memory = SegmentMemory::new();
        memory.add_segment(Address::from(0x1000), vec![0; 0x10]).unwrap();
        assert!(memory.add_segment(Address::from(0x1008), vec![0; 4]).is_err());
        assert!(memory.add_segment(Address::from(0x0ff8), vec![0; 0x10]).is_err());
        assert!(memory.add_segment(Address::from(0x1010), vec![0; 4]).is_ok());
        assert_eq!(memory.segment_count(), 2);
    }

    #[test]
    fn test_registers()
    {
        let mut memory = SegmentMemory::new();
        memory.set_register(RegisterId(7), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(memory.read_register(RegisterId(7), 4).unwrap(), vec![1, 2, 3, 4]);
        assert!(memory.read_register(RegisterId(8), 4).is_err());
    }

    #[test]
    fn test_zero_length_read()
    {
        let memory = SegmentMemory::new();
        assert!(memory.read_memory(Address::from(0x1234), 0).unwrap().is_empty());
    }
}
