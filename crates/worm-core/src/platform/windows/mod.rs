//! # Windows Implementation
//!
//! Remote memory access through the Win32 debugging and PSAPI functions.
//!
//! A process is bound by opening a process `HANDLE` with access rights that
//! match the handle's mode; every transfer goes through that `HANDLE`, and it
//! is closed exactly once when the binding is dropped.
//!
//! ## Access rights
//!
//! | mode     | rights |
//! |----------|--------|
//! | readable | `PROCESS_VM_READ \| PROCESS_QUERY_LIMITED_INFORMATION \| PROCESS_QUERY_INFORMATION` |
//! | writable | `PROCESS_VM_OPERATION \| PROCESS_VM_WRITE` |
//!
//! `PROCESS_QUERY_INFORMATION` is what `EnumProcessModules()` requires on top of
//! `PROCESS_VM_READ`.
//!
//! ## Regions
//!
//! Only loaded modules are reported, one region per module spanning
//! `[base, base + SizeOfImage)`. Heap, stack and other private memory is not
//! listed.
//!
//! ## References
//!
//! - [OpenProcess](https://learn.microsoft.com/en-us/windows/win32/api/processthreadsapi/nf-processthreadsapi-openprocess)
//! - [ReadProcessMemory](https://learn.microsoft.com/en-us/windows/win32/api/memoryapi/nf-memoryapi-readprocessmemory)
//! - [EnumProcessModules](https://learn.microsoft.com/en-us/windows/win32/api/psapi/nf-psapi-enumprocessmodules)

use std::ffi::c_void;
use std::io;
use std::mem::size_of;

use tracing::{debug, trace, warn};
use windows::Win32::Foundation::{
    CloseHandle, DuplicateHandle, DUPLICATE_SAME_ACCESS, ERROR_PARTIAL_COPY, HANDLE, HMODULE,
};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::ProcessStatus::{
    EnumProcessModules, GetModuleFileNameExW, GetModuleInformation, MODULEINFO,
};
use windows::Win32::System::Threading::{
    GetCurrentProcess, OpenProcess, PROCESS_ACCESS_RIGHTS, PROCESS_QUERY_INFORMATION,
    PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

use crate::error::{Result, Transfer, WormError};
use crate::mode::Access;
use crate::platform::ProcessMemory;
use crate::types::{Address, MemoryRegion, ProcessId};

/// Longest path `GetModuleFileNameExW()` can return, in UTF-16 units.
const MAX_MODULE_PATH: usize = 32_768;

/// Binding to a process on Windows
///
/// Owns the process `HANDLE`. Not `Clone`: use
/// [`try_clone`](ProcessMemory::try_clone), which duplicates the `HANDLE`.
#[derive(Debug)]
pub struct WindowsProcess
{
    pid: ProcessId,
    handle: HANDLE,
    access: Access,
}

// SAFETY: a process HANDLE is a kernel object reference that is valid from any
// thread, and ReadProcessMemory/WriteProcessMemory are safe to call
// concurrently on the same HANDLE.
#[allow(unsafe_code)]
unsafe impl Send for WindowsProcess {}
#[allow(unsafe_code)]
unsafe impl Sync for WindowsProcess {}

/// `OpenProcess()` rights for a given access.
pub fn access_rights(access: Access) -> PROCESS_ACCESS_RIGHTS
{
    let mut rights = PROCESS_ACCESS_RIGHTS(0);
    if access.readable {
        rights |= PROCESS_VM_READ | PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_QUERY_INFORMATION;
    }
    if access.writable {
        rights |= PROCESS_VM_OPERATION | PROCESS_VM_WRITE;
    }
    rights
}

/// Convert a `windows` error into an `io::Error` carrying the Win32 error code.
///
/// The `windows` crate wraps `GetLastError()` values as
/// `HRESULT_FROM_WIN32(code)`; unwrapping it keeps `raw_os_error()` comparable
/// with `ERROR_*` constants.
fn os_error(err: &windows::core::Error) -> io::Error
{
    let hresult = err.code().0 as u32;
    let code = if hresult & 0xFFFF_0000 == 0x8007_0000 {
        hresult & 0xFFFF
    } else {
        hresult
    };
    io::Error::from_raw_os_error(code as i32)
}

impl WindowsProcess
{
    /// Whether a failed transfer actually moved some bytes.
    fn is_partial_copy(err: &windows::core::Error, copied: usize) -> bool
    {
        copied > 0 && err.code() == ERROR_PARTIAL_COPY.to_hresult()
    }

    #[allow(unsafe_code)]
    fn module_name(&self, module: HMODULE, buffer: &mut [u16]) -> String
    {
        // SAFETY: the buffer is a valid, writable UTF-16 slice.
        let len = unsafe { GetModuleFileNameExW(self.handle, module, buffer) } as usize;
        String::from_utf16_lossy(&buffer[..len.min(buffer.len())])
    }
}

impl ProcessMemory for WindowsProcess
{
    #[allow(unsafe_code)]
    fn open(pid: ProcessId, access: Access) -> Result<Self>
    {
        let rights = access_rights(access);

        // SAFETY: OpenProcess has no memory-safety preconditions.
        let handle = unsafe { OpenProcess(rights, false, pid.0) }.map_err(|err| WormError::Open {
            pid,
            source: os_error(&err),
        })?;

        debug!(%pid, %access, rights = rights.0, "opened process handle");
        Ok(Self { pid, handle, access })
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
        let base = addr.to_usize().ok_or_else(|| WormError::Io {
            op: Transfer::Read,
            addr,
            len,
            source: io::Error::new(io::ErrorKind::InvalidInput, "address exceeds the host pointer width"),
        })?;

        let mut copied = 0usize;
        // SAFETY: `dst` is valid for `len` bytes of writes and `copied` outlives the call.
        let result = unsafe {
            ReadProcessMemory(
                self.handle,
                base as *const c_void,
                dst.as_mut_ptr().cast::<c_void>(),
                len,
                Some(std::ptr::addr_of_mut!(copied)),
            )
        };

        match result {
            Ok(()) => {}
            Err(err) if Self::is_partial_copy(&err, copied) => {}
            Err(err) => {
                return Err(WormError::Io {
                    op: Transfer::Read,
                    addr,
                    len,
                    source: os_error(&err),
                });
            }
        }

        trace!(pid = %self.pid, %addr, len, copied, "ReadProcessMemory");
        Ok(copied)
    }

    #[allow(unsafe_code)]
    fn write_from(&self, addr: Address, src: &[u8]) -> Result<usize>
    {
        if src.is_empty() {
            return Ok(0);
        }

        let len = src.len();
        let base = addr.to_usize().ok_or_else(|| WormError::Io {
            op: Transfer::Write,
            addr,
            len,
            source: io::Error::new(io::ErrorKind::InvalidInput, "address exceeds the host pointer width"),
        })?;

        let mut copied = 0usize;
        // SAFETY: `src` is valid for `len` bytes of reads and `copied` outlives the call.
        let result = unsafe {
            WriteProcessMemory(
                self.handle,
                base as *const c_void,
                src.as_ptr().cast::<c_void>(),
                len,
                Some(std::ptr::addr_of_mut!(copied)),
            )
        };

        match result {
            Ok(()) => {}
            Err(err) if Self::is_partial_copy(&err, copied) => {}
            Err(err) => {
                return Err(WormError::Io {
                    op: Transfer::Write,
                    addr,
                    len,
                    source: os_error(&err),
                });
            }
        }

        trace!(pid = %self.pid, %addr, len, copied, "WriteProcessMemory");
        Ok(copied)
    }

    /// List loaded modules
    ///
    /// `EnumProcessModules()` is called twice: once to learn how many bytes the
    /// module array needs, once to fill it. Modules loaded in between are
    /// dropped by the second call's size limit. A module whose information
    /// cannot be queried (typically because it was unloaded meanwhile) is
    /// skipped rather than ending the list (see the `platform` module docs).
    #[allow(unsafe_code)]
    fn regions(&self) -> Result<Vec<MemoryRegion>>
    {
        let enumeration_error = |err: windows::core::Error| WormError::Enumeration {
            pid: self.pid,
            source: os_error(&err),
        };

        let mut needed = 0u32;
        // SAFETY: a null array with a zero size only queries the required size.
        unsafe { EnumProcessModules(self.handle, std::ptr::null_mut(), 0, &mut needed) }
            .map_err(enumeration_error)?;

        let mut modules = vec![HMODULE::default(); needed as usize / size_of::<HMODULE>()];
        let capacity = u32::try_from(modules.len() * size_of::<HMODULE>()).unwrap_or(u32::MAX);
        // SAFETY: `modules` holds `capacity` bytes of writable HMODULE slots.
        unsafe { EnumProcessModules(self.handle, modules.as_mut_ptr(), capacity, &mut needed) }
            .map_err(enumeration_error)?;
        modules.truncate((needed as usize / size_of::<HMODULE>()).min(modules.len()));

        let mut path = vec![0u16; MAX_MODULE_PATH];
        let mut regions = Vec::with_capacity(modules.len());

        for module in modules {
            let mut info = MODULEINFO::default();
            // SAFETY: `info` is a valid MODULEINFO and its size is passed along.
            let queried = unsafe {
                GetModuleInformation(self.handle, module, &mut info, size_of::<MODULEINFO>() as u32)
            };
            if let Err(err) = queried {
                warn!(pid = %self.pid, "skipping module: GetModuleInformation failed: {err}");
                continue;
            }

            let start = Address::new(info.lpBaseOfDll as usize as u64);
            let end = start.saturating_add(u64::from(info.SizeOfImage));
            if let Some(region) = MemoryRegion::new(start, end, self.module_name(module, &mut path)) {
                regions.push(region);
            }
        }

        regions.sort_by_key(|region| region.start);
        debug!(pid = %self.pid, count = regions.len(), "enumerated process modules");
        Ok(regions)
    }

    #[allow(unsafe_code)]
    fn try_clone(&self) -> Result<Self>
    {
        let mut duplicate = HANDLE::default();
        // SAFETY: both process handles are valid and `duplicate` outlives the call.
        unsafe {
            let current = GetCurrentProcess();
            DuplicateHandle(current, self.handle, current, &mut duplicate, 0, false, DUPLICATE_SAME_ACCESS)
        }
        .map_err(|err| WormError::Open {
            pid: self.pid,
            source: os_error(&err),
        })?;

        Ok(Self {
            pid: self.pid,
            handle: duplicate,
            access: self.access,
        })
    }
}

impl Drop for WindowsProcess
{
    #[allow(unsafe_code)]
    fn drop(&mut self)
    {
        // SAFETY: the handle was returned by OpenProcess/DuplicateHandle and is
        // closed nowhere else.
        match unsafe { CloseHandle(self.handle) } {
            Ok(()) => debug!(pid = %self.pid, "closed process handle"),
            Err(err) => warn!(pid = %self.pid, "CloseHandle failed: {err}"),
        }
    }
}
