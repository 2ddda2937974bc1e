//! # Error Types
//!
//! Errors surfaced by handle operations.
//!
//! Every variant keeps the originating `std::io::Error`, so the raw OS error
//! code (`errno` on Linux, `GetLastError()` on Windows) is always available
//! for diagnosis next to the library-level [`ErrorKind`].
//!
//! Capability misuse (writing through a read-only handle, or reading through a
//! write-only one) has no variant here: it is rejected by the type system.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::types::{Address, ProcessId};

/// Direction of a byte transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transfer
{
    /// Remote memory into a local buffer
    Read,
    /// Local buffer into remote memory
    Write,
}

impl fmt::Display for Transfer
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Transfer::Read => f.write_str("read"),
            Transfer::Write => f.write_str("write"),
        }
    }
}

/// Library-level classification of a [`WormError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind
{
    /// Could not bind to the target process
    Open,
    /// A byte transfer failed outright
    Io,
    /// The region listing could not be obtained
    Enumeration,
}

/// Main error type for remote memory operations
///
/// ## Error Categories
///
/// 1. **Open**: the process does not exist, or (Windows) the caller lacks the
///    rights requested by the handle's mode
/// 2. **Io**: the OS rejected a transfer as a whole. Short transfers are *not*
///    errors, they are reported as a smaller byte count
/// 3. **Enumeration**: the listing mechanism could not be opened or read. A
///    malformed line in the listing ends the list and is not an error
#[derive(Error, Debug)]
pub enum WormError
{
    /// Failed to bind a handle to the target process
    ///
    /// On Linux this means the process does not exist. Privilege is only
    /// checked by the kernel when memory is actually transferred.
    ///
    /// On Windows this is `OpenProcess()` failing, typically with
    /// `ERROR_INVALID_PARAMETER` (no such process) or `ERROR_ACCESS_DENIED`.
    #[error("Failed to open process {pid}: {source}")]
    Open
    {
        /// Target process
        pid: ProcessId,
        /// OS-level cause
        #[source]
        source: io::Error,
    },

    /// A byte transfer failed outright
    ///
    /// Common causes:
    /// - The whole range is unmapped (`EFAULT`)
    /// - The caller may not trace the target (`EPERM`)
    /// - The target exited (`ESRCH`)
    /// - A typed transfer moved fewer than `size_of::<T>()` bytes
    ///   (`UnexpectedEof`, no OS code)
    #[error("Failed to {op} {len} bytes at {addr}: {source}")]
    Io
    {
        /// Direction of the failed transfer
        op: Transfer,
        /// Remote address the transfer started at
        addr: Address,
        /// Number of bytes requested
        len: usize,
        /// OS-level cause
        #[source]
        source: io::Error,
    },

    /// Failed to list the memory regions of the target process
    ///
    /// On Linux `/proc/<pid>/maps` could not be read. On Windows
    /// `EnumProcessModules()` failed.
    #[error("Failed to enumerate memory regions of process {pid}: {source}")]
    Enumeration
    {
        /// Target process
        pid: ProcessId,
        /// OS-level cause
        #[source]
        source: io::Error,
    },
}

impl WormError
{
    /// Library-level kind of this error.
    pub fn kind(&self) -> ErrorKind
    {
        match self {
            WormError::Open { .. } => ErrorKind::Open,
            WormError::Io { .. } => ErrorKind::Io,
            WormError::Enumeration { .. } => ErrorKind::Enumeration,
        }
    }

    /// The underlying OS error.
    pub fn io_error(&self) -> &io::Error
    {
        match self {
            WormError::Open { source, .. } | WormError::Io { source, .. } | WormError::Enumeration { source, .. } => {
                source
            }
        }
    }

    /// The raw OS error code, if the failure came from the OS.
    ///
    /// ```rust
    /// use worm_core::error::{ErrorKind, WormError};
    /// use worm_core::types::ProcessId;
    ///
    /// let err = WormError::Open {
    ///     pid: ProcessId(0),
    ///     source: std::io::Error::from_raw_os_error(3),
    /// };
    /// assert_eq!(err.kind(), ErrorKind::Open);
    /// assert_eq!(err.raw_os_error(), Some(3));
    /// ```
    pub fn raw_os_error(&self) -> Option<i32>
    {
        self.io_error().raw_os_error()
    }
}

/// Convenience type alias for `Result<T, WormError>`
///
/// ```rust
/// use worm_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, WormError>;
