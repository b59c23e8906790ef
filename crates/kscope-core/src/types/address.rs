//! Target address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed target address
///
/// Wraps a `u64` so that addresses read from a target are never confused with
/// sizes, page frame numbers or raw integer values. Addresses are always held
/// in 64 bits; 32-bit targets simply never set the upper half.
///
/// An `Address` is only meaningful relative to the memory backend that was
/// active when it was produced. Objects referencing an address must not be
/// reused against a different target.
///
/// ## Example
///
/// ```rust
/// use kscope_core::types::Address;
///
/// let base = Address::from(0xffff_8880_0000_0000);
/// let next = base + 0x1000;
/// assert_eq!(next.value(), 0xffff_8880_0000_1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value (usable in const contexts)
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add an offset, returning `None` on overflow
    ///
    /// ```rust
    /// use kscope_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x10), Some(Address::from(0x1010)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Apply a signed displacement with two's-complement wraparound
    ///
    /// Pointer arithmetic on kernel addresses routinely crosses the sign
    /// boundary (e.g. `vmemmap - start_pfn`), so this never fails.
    pub fn wrapping_offset(self, delta: i64) -> Self
    {
        Address(self.0.wrapping_add_signed(delta))
    }

    /// Truncate the address to the given word width in bytes
    ///
    /// ```rust
    /// use kscope_core::types::Address;
    ///
    /// assert_eq!(Address::from(0x1_0000_0010).truncate(4), Address::from(0x10));
    /// assert_eq!(Address::from(0x1_0000_0010).truncate(8), Address::from(0x1_0000_0010));
    /// ```
    #[must_use]
    pub fn truncate(self, word_size: u8) -> Self
    {
        if word_size >= 8 {
            self
        } else {
            Address(self.0 & ((1u64 << (u32::from(word_size) * 8)) - 1))
        }
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
