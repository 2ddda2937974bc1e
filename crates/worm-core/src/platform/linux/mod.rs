//! # Linux Implementation
//!
//! Remote memory access through the vectored cross-process copy system calls.
//!
//! Unlike `ptrace(PTRACE_PEEKDATA)`, `process_vm_readv()` and
//! `process_vm_writev()` need no attachment and no stopped tracee: the kernel
//! copies directly between the two address spaces, addressed by PID, in a
//! single call. There is therefore no OS resource to hold between calls; the
//! binding is the PID itself.
//!
//! ## Permissions
//!
//! The kernel checks, on every call, that the caller may `ptrace` the target
//! (`PTRACE_MODE_ATTACH_REALCREDS`): same real UID, or `CAP_SYS_PTRACE`, and
//! whatever the Yama `ptrace_scope` setting demands. Binding never fails for
//! lack of privilege; the transfer does, with `EPERM`.
//!
//! ## Partial transfers
//!
//! A copy that runs from mapped into unmapped memory stops at the first page
//! it cannot access and returns the bytes copied so far. Only a copy that
//! cannot move a single byte fails, usually with `EFAULT`.
//!
//! ## References
//!
//! - [process_vm_readv(2)](https://man7.org/linux/man-pages/man2/process_vm_readv.2.html)
//! - [proc_pid_maps(5)](https://man7.org/linux/man-pages/man5/proc_pid_maps.5.html)

use std::ffi::c_void;
use std::{fs, io};

use tracing::{debug, trace};

use crate::error::{Result, Transfer, WormError};
use crate::maps;
use crate::mode::Access;
use crate::platform::ProcessMemory;
use crate::types::{Address, MemoryRegion, ProcessId};

/// Binding to a process on Linux
///
/// Holds the PID and nothing else, so dropping it releases nothing.
#[derive(Debug)]
pub struct LinuxProcess
{
    pid: ProcessId,
    raw: libc::pid_t,
    access: Access,
}

impl LinuxProcess
{
    /// Path of the mapping description for this process.
    pub fn maps_path(&self) -> String
    {
        format!("/proc/{}/maps", self.raw)
    }

    fn io_error(op: Transfer, addr: Address, len: usize, source: io::Error) -> WormError
    {
        WormError::Io { op, addr, len, source }
    }

    /// Remote address as a pointer-sized integer, or an `Io` error if it does not fit.
    fn remote_base(op: Transfer, addr: Address, len: usize) -> Result<usize>
    {
        addr.to_usize().ok_or_else(|| {
            Self::io_error(
                op,
                addr,
                len,
                io::Error::new(io::ErrorKind::InvalidInput, "address exceeds the host pointer width"),
            )
        })
    }
}

impl ProcessMemory for LinuxProcess
{
    /// Bind to `pid`
    ///
    /// Probes for the process with `kill(pid, 0)`, which delivers no signal.
    /// `EPERM` from the probe still proves the process exists, so it is
    /// accepted: privilege is the transfer calls' business.
    ///
    /// PID 0 and values above `i32::MAX` are rejected up front, because
    /// `kill()` would read them as "my process group" or a negated group.
    #[allow(unsafe_code)]
    fn open(pid: ProcessId, access: Access) -> Result<Self>
    {
        let raw = match libc::pid_t::try_from(pid.0) {
            Ok(raw) if raw > 0 => raw,
            _ => {
                return Err(WormError::Open {
                    pid,
                    source: io::Error::from_raw_os_error(libc::ESRCH),
                });
            }
        };

        // SAFETY: signal 0 performs the existence and permission checks only.
        let probe = unsafe { libc::kill(raw, 0) };
        if probe != 0 {
            let source = io::Error::last_os_error();
            if source.raw_os_error() != Some(libc::EPERM) {
                return Err(WormError::Open { pid, source });
            }
        }

        debug!(%pid, %access, "bound to process");
        Ok(Self { pid, raw, access })
    }

    fn pid(&self) -> ProcessId
    {
        self.pid
    }

    #[allow(unsafe_code)]
    fn read_into(&self, addr: Address, dst: &mut [u8]) -> Result<usize>
    {
        if dst.is_empty() {
            return Ok(0);
        }

        let len = dst.len();
        let base = Self::remote_base(Transfer::Read, addr, len)?;

        let local = libc::iovec {
            iov_base: dst.as_mut_ptr().cast::<c_void>(),
            iov_len: len,
        };
        let remote = libc::iovec {
            iov_base: base as *mut c_void,
            iov_len: len,
        };

        // SAFETY: `local` describes exactly `dst`, which is exclusively borrowed
        // for the duration of the call. `remote` is only interpreted by the
        // kernel in the target's address space.
        let copied = unsafe { libc::process_vm_readv(self.raw, &local, 1, &remote, 1, 0) };
        if copied < 0 {
            return Err(Self::io_error(Transfer::Read, addr, len, io::Error::last_os_error()));
        }

        trace!(pid = %self.pid, %addr, len, copied, "process_vm_readv");
        Ok(copied.unsigned_abs())
    }

    #[allow(unsafe_code)]
    fn write_from(&self, addr: Address, src: &[u8]) -> Result<usize>
    {
        if src.is_empty() {
            return Ok(0);
        }

        let len = src.len();
        let base = Self::remote_base(Transfer::Write, addr, len)?;

        // process_vm_writev never writes through the local iovec.
        let local = libc::iovec {
            iov_base: src.as_ptr().cast_mut().cast::<c_void>(),
            iov_len: len,
        };
        let remote = libc::iovec {
            iov_base: base as *mut c_void,
            iov_len: len,
        };

        // SAFETY: `local` describes exactly `src` and is only read from.
        let copied = unsafe { libc::process_vm_writev(self.raw, &local, 1, &remote, 1, 0) };
        if copied < 0 {
            return Err(Self::io_error(Transfer::Write, addr, len, io::Error::last_os_error()));
        }

        trace!(pid = %self.pid, %addr, len, copied, "process_vm_writev");
        Ok(copied.unsigned_abs())
    }

    /// Read and parse `/proc/<pid>/maps`
    ///
    /// The kernel emits the listing in ascending address order. The first line
    /// the parser does not recognise ends the list.
    fn regions(&self) -> Result<Vec<MemoryRegion>>
    {
        let path = self.maps_path();
        let bytes = fs::read(&path).map_err(|source| WormError::Enumeration { pid: self.pid, source })?;

        // Mapped file paths are arbitrary bytes
        let text = String::from_utf8_lossy(&bytes);
        let regions = maps::parse_maps(&text);
        debug!(pid = %self.pid, count = regions.len(), path = %path, "enumerated memory regions");
        Ok(regions)
    }

    fn try_clone(&self) -> Result<Self>
    {
        Ok(Self {
            pid: self.pid,
            raw: self.raw,
            access: self.access,
        })
    }
}
