//! Remote memory address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed address in the *target* process's virtual address space
///
/// Remote addresses are never dereferenced locally, so they are kept as plain
/// integers rather than pointers. Wrapping them in a newtype keeps them from
/// being mixed up with sizes and counts, which share the same integer type.
///
/// The value is 64 bits wide on every host so that a 32-bit tool can still
/// name addresses in a 64-bit target. Backends convert to the native pointer
/// width at the system call boundary and reject addresses that do not fit.
///
/// ## Example
///
/// ```rust
/// use worm_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr + 0x100;
/// assert_eq!(next_addr.value(), 0x1100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address, usable in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Address of a local object, for operating on the caller's own process.
    ///
    /// ```rust
    /// use worm_core::types::Address;
    ///
    /// let value = 5u32;
    /// let addr = Address::of(&value);
    /// assert_eq!(addr.value(), std::ptr::addr_of!(value) as u64);
    /// ```
    pub fn of<T>(value: &T) -> Self
    {
        Address(std::ptr::from_ref(value) as usize as u64)
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use worm_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }

    /// Add an offset to this address, saturating at `u64::MAX`
    pub fn saturating_add(self, offset: u64) -> Self
    {
        Address(self.0.saturating_add(offset))
    }

    /// Convert to the host pointer width, as system calls expect it.
    ///
    /// Returns `None` when the address cannot be represented on this host
    /// (a 64-bit address seen from a 32-bit build).
    pub fn to_usize(self) -> Option<usize>
    {
        usize::try_from(self.0).ok()
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
        write!(f, "0x{:016x}", self.0)
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
