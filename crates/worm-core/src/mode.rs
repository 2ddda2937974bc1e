//! # Capability Modes
//!
//! Type-level encoding of what a [`Handle`](crate::Handle) may do.
//!
//! A handle's mode is a type parameter, fixed when the handle is opened:
//!
//! | marker        | readable | writable |
//! |---------------|----------|----------|
//! | [`Read`]      | yes      | no       |
//! | [`Write`]     | no       | yes      |
//! | [`ReadWrite`] | yes      | yes      |
//!
//! Read operations live in an `impl<M: Readable>` block and write operations
//! in an `impl<M: Writable>` block, so calling one on a handle without the
//! capability is a compile error rather than a runtime failure. The traits are
//! sealed: no other crate can add a mode.

use std::fmt;

mod sealed
{
    pub trait Sealed {}

    impl Sealed for super::Read {}
    impl Sealed for super::Write {}
    impl Sealed for super::ReadWrite {}
}

/// A capability mode. Implemented only by [`Read`], [`Write`] and [`ReadWrite`].
pub trait Mode: sealed::Sealed + Send + Sync + 'static
{
    /// Handles in this mode can read remote memory.
    const READABLE: bool;

    /// Handles in this mode can write remote memory.
    const WRITABLE: bool;

    /// Runtime view of this mode.
    const ACCESS: Access = Access {
        readable: Self::READABLE,
        writable: Self::WRITABLE,
    };
}

/// Modes that permit reading.
pub trait Readable: Mode {}

/// Modes that permit writing.
pub trait Writable: Mode {}

/// Read-only mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Read;

/// Write-only mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Write;

/// Read and write mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReadWrite;

impl Mode for Read
{
    const READABLE: bool = true;
    const WRITABLE: bool = false;
}

impl Mode for Write
{
    const READABLE: bool = false;
    const WRITABLE: bool = true;
}

impl Mode for ReadWrite
{
    const READABLE: bool = true;
    const WRITABLE: bool = true;
}

impl Readable for Read {}
impl Readable for ReadWrite {}
impl Writable for Write {}
impl Writable for ReadWrite {}

/// Runtime projection of a [`Mode`]
///
/// Backends receive this at bind time. The Windows backend turns it into
/// `OpenProcess()` access rights; the Linux backend only records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Access
{
    /// Reads are permitted.
    pub readable: bool,
    /// Writes are permitted.
    pub writable: bool,
}

impl fmt::Display for Access
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match (self.readable, self.writable) {
            (true, true) => f.write_str("rw"),
            (true, false) => f.write_str("r"),
            (false, true) => f.write_str("w"),
            (false, false) => f.write_str("-"),
        }
    }
}
