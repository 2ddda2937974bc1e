//! # Handle
//!
//! The single entry point for cross-process memory access.
//!
//! A [`Handle`] is bound to one target process and carries its capability
//! [`Mode`] as a type parameter. Reads are only defined for
//! [`Readable`] modes and writes only for [`Writable`] ones, so misuse does not
//! compile:
//!
//! ```rust,compile_fail
//! use worm_core::{Address, ReadHandle};
//!
//! let handle = ReadHandle::open(std::process::id().into())?;
//! handle.write(Address::from(0x1000), &1u32)?; // no `write` on a read-only handle
//! # Ok::<(), worm_core::WormError>(())
//! ```
//!
//! ```rust,compile_fail
//! use worm_core::{Address, WriteHandle};
//!
//! let handle = WriteHandle::open(std::process::id().into())?;
//! let value: u32 = handle.read(Address::from(0x1000))?; // no `read` on a write-only handle
//! # Ok::<(), worm_core::WormError>(())
//! ```
//!
//! The platform binding behind a handle is not reachable from outside the
//! crate, so it cannot be used to sidestep the mode either:
//!
//! ```rust,compile_fail
//! use worm_core::{Address, ReadHandle};
//!
//! let handle = ReadHandle::open(std::process::id().into())?;
//! handle.as_native().write_from(Address::from(0x1000), &7u32.to_ne_bytes())?;
//! # Ok::<(), worm_core::WormError>(())
//! ```
//!
//! ## Ownership
//!
//! A handle owns its platform binding and releases it exactly once, when
//! dropped. It is deliberately not `Clone`; [`Handle::try_clone`] duplicates
//! the underlying OS resource explicitly.
//!
//! ## Concurrency
//!
//! Every operation is a single, self-contained system call (or, for
//! [`Handle::regions`], a single file read). A handle is `Send + Sync` and may
//! be shared between threads, but nothing makes a sequence of calls atomic.

use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;

use crate::error::{Result, Transfer, WormError};
use crate::mode::{Access, Mode, Read, ReadWrite, Readable, Writable, Write};
use crate::platform::{NativeProcess, ProcessMemory};
use crate::types::{Address, MemoryRegion, ProcessId};

/// Handle with read access only.
pub type ReadHandle = Handle<Read>;

/// Handle with write access only.
pub type WriteHandle = Handle<Write>;

/// Handle with read and write access.
pub type ReadWriteHandle = Handle<ReadWrite>;

/// Capability-typed binding to a target process
///
/// ## Example
///
/// ```rust
/// use worm_core::{Address, ReadWriteHandle};
///
/// let handle = ReadWriteHandle::open(std::process::id().into())?;
///
/// let local = Box::new(0u32);
/// let addr = Address::of(&*local);
/// handle.write(addr, &42u32)?;
/// assert_eq!(handle.read::<u32>(addr)?, 42);
/// # Ok::<(), worm_core::WormError>(())
/// ```
pub struct Handle<M: Mode>
{
    process: NativeProcess,
    mode: PhantomData<M>,
}

impl<M: Mode> Handle<M>
{
    /// Bind to the process `pid`
    ///
    /// ## Platform-specific behavior
    ///
    /// - **Linux**: only checks that the process exists. The kernel enforces
    ///   privilege on every transfer instead, so this never fails for lack of
    ///   privilege.
    /// - **Windows**: opens a process handle with the rights `M` needs and
    ///   fails if the OS refuses them.
    ///
    /// ## Errors
    ///
    /// - `Open`: the process does not exist, or (Windows) privilege is
    ///   insufficient for the requested mode
    pub fn open(pid: ProcessId) -> Result<Self>
    {
        Ok(Self {
            process: NativeProcess::open(pid, M::ACCESS)?,
            mode: PhantomData,
        })
    }

    /// Process this handle is bound to.
    pub fn pid(&self) -> ProcessId
    {
        self.process.pid()
    }

    /// Runtime view of the handle's mode.
    pub fn access(&self) -> Access
    {
        M::ACCESS
    }

    /// Bind a value of type `T` to `addr`
    ///
    /// Performs no I/O. The returned [`Bound`] borrows this handle, so it
    /// cannot outlive it.
    pub fn bind<T: Pod>(&self, addr: Address) -> Bound<'_, M, T>
    {
        Bound::new(self, addr)
    }

    /// Duplicate this handle, including its OS resource
    ///
    /// ## Errors
    ///
    /// - `Open`: the OS refused to duplicate the process handle (Windows)
    pub fn try_clone(&self) -> Result<Self>
    {
        Ok(Self {
            process: self.process.try_clone()?,
            mode: PhantomData,
        })
    }
}

impl<M: Readable> Handle<M>
{
    /// Snapshot of the target's memory regions
    ///
    /// Ordered by ascending start address, as the platform reports them.
    /// Nothing guarantees that two calls return the same list.
    ///
    /// On Linux every mapping is listed; on Windows only loaded modules are.
    ///
    /// ## Errors
    ///
    /// - `Enumeration`: the listing could not be obtained
    pub fn regions(&self) -> Result<Vec<MemoryRegion>>
    {
        self.process.regions()
    }

    /// The region containing `addr`, if any.
    ///
    /// ## Errors
    ///
    /// - `Enumeration`: the listing could not be obtained
    pub fn region_containing(&self, addr: Address) -> Result<Option<MemoryRegion>>
    {
        Ok(self.regions()?.into_iter().find(|region| region.contains(addr)))
    }

    /// Copy remote memory starting at `addr` into `dst`
    ///
    /// Returns the number of bytes copied, which is smaller than `dst.len()`
    /// when the range runs into inaccessible memory part way through.
    ///
    /// ## Errors
    ///
    /// - `Io`: the OS failed the transfer outright (e.g. the whole range is
    ///   unmapped, or the caller may not access the target)
    pub fn read_bytes(&self, addr: Address, dst: &mut [u8]) -> Result<usize>
    {
        self.process.read_into(addr, dst)
    }

    /// Read up to `len` bytes into a new buffer, truncated to what was copied.
    ///
    /// ## Errors
    ///
    /// - `Io`: as for [`read_bytes`](Self::read_bytes)
    pub fn read_vec(&self, addr: Address, len: usize) -> Result<Vec<u8>>
    {
        let mut buffer = vec![0u8; len];
        let copied = self.read_bytes(addr, &mut buffer)?;
        buffer.truncate(copied);
        Ok(buffer)
    }

    /// Read a `T` from `addr`
    ///
    /// Exactly `size_of::<T>()` bytes are transferred. The bytes are taken as
    /// they are: the caller is responsible for knowing that `addr` holds a `T`
    /// with the layout and byte order of this build.
    ///
    /// ## Errors
    ///
    /// - `Io`: the transfer failed, or copied fewer than `size_of::<T>()` bytes
    ///   (`UnexpectedEof`)
    pub fn read<T: Pod>(&self, addr: Address) -> Result<T>
    {
        let mut value: T = bytemuck::Zeroable::zeroed();
        let copied = self.read_bytes(addr, bytemuck::bytes_of_mut(&mut value))?;
        ensure_complete(addr, size_of::<T>(), copied)?;
        Ok(value)
    }
}

impl<M: Writable> Handle<M>
{
    /// Copy `src` into remote memory starting at `addr`
    ///
    /// Returns the number of bytes copied, which is smaller than `src.len()`
    /// when the range runs into inaccessible memory part way through.
    ///
    /// ## Errors
    ///
    /// - `Io`: the OS failed the transfer outright
    pub fn write_bytes(&self, addr: Address, src: &[u8]) -> Result<usize>
    {
        self.process.write_from(addr, src)
    }

    /// Write `value` to `addr`
    ///
    /// Transfers up to `size_of::<T>()` bytes and returns how many were
    /// copied. A count below `size_of::<T>()` means the range ran into
    /// inaccessible memory; the bytes before that point are already written.
    ///
    /// ## Errors
    ///
    /// - `Io`: the OS failed the transfer outright
    pub fn write<T: Pod>(&self, addr: Address, value: &T) -> Result<usize>
    {
        self.write_bytes(addr, bytemuck::bytes_of(value))
    }
}

impl<M: Mode> fmt::Debug for Handle<M>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Handle")
            .field("pid", &self.pid())
            .field("access", &M::ACCESS)
            .finish_non_exhaustive()
    }
}

/// A typed read is only meaningful when the whole value arrived.
fn ensure_complete(addr: Address, len: usize, copied: usize) -> Result<()>
{
    if copied == len {
        return Ok(());
    }

    Err(WormError::Io {
        op: Transfer::Read,
        addr,
        len,
        source: io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("short read: {copied} of {len} bytes transferred"),
        ),
    })
}

/// A value of type `T` at a fixed remote address
///
/// Pairs a borrowed [`Handle`] with an address for repeated typed access.
/// It holds no state besides the address: every [`read`](Bound::read) and
/// [`write`](Bound::write) goes to the target process again.
///
/// The borrow ties a `Bound` to its handle, so it cannot outlive it:
///
/// ```rust,compile_fail
/// use worm_core::{Address, ReadHandle};
///
/// let bound = {
///     let handle = ReadHandle::open(std::process::id().into())?;
///     handle.bind::<u32>(Address::from(0x1000))
/// };
/// # Ok::<(), worm_core::WormError>(())
/// ```
///
/// ## Example
///
/// ```rust
/// use worm_core::{Address, ReadWriteHandle};
///
/// let handle = ReadWriteHandle::open(std::process::id().into())?;
/// let local = Box::new(0i32);
///
/// let counter = handle.bind::<i32>(Address::of(&*local));
/// counter.write(&7)?;
/// assert_eq!(counter.read()?, 7);
/// # Ok::<(), worm_core::WormError>(())
/// ```
pub struct Bound<'h, M: Mode, T: Pod>
{
    handle: &'h Handle<M>,
    addr: Address,
    value: PhantomData<T>,
}

impl<'h, M: Mode, T: Pod> Bound<'h, M, T>
{
    /// Bind `T` at `addr` through `handle`.
    pub fn new(handle: &'h Handle<M>, addr: Address) -> Self
    {
        Self {
            handle,
            addr,
            value: PhantomData,
        }
    }

    /// Remote address of the value.
    pub fn address(&self) -> Address
    {
        self.addr
    }

    /// Handle this value is read and written through.
    pub fn handle(&self) -> &'h Handle<M>
    {
        self.handle
    }
}

impl<M: Readable, T: Pod> Bound<'_, M, T>
{
    /// Read the value.
    ///
    /// ## Errors
    ///
    /// Those of [`Handle::read`].
    pub fn read(&self) -> Result<T>
    {
        self.handle.read(self.addr)
    }
}

impl<M: Writable, T: Pod> Bound<'_, M, T>
{
    /// Write the value, returning the number of bytes copied.
    ///
    /// ## Errors
    ///
    /// Those of [`Handle::write`].
    pub fn write(&self, value: &T) -> Result<usize>
    {
        self.handle.write(self.addr, value)
    }
}

impl<M: Mode, T: Pod> Clone for Bound<'_, M, T>
{
    fn clone(&self) -> Self
    {
        *self
    }
}

impl<M: Mode, T: Pod> Copy for Bound<'_, M, T> {}

impl<M: Mode, T: Pod> fmt::Debug for Bound<'_, M, T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Bound")
            .field("pid", &self.handle.pid())
            .field("addr", &self.addr)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
