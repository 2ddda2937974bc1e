//! # Platform-Specific Implementations
//!
//! Each supported platform provides one implementation of [`ProcessMemory`],
//! and exactly one of them is compiled in, selected by `cfg` at build time.
//! [`NativeProcess`] names it so the rest of the crate never mentions a
//! platform directly.
//!
//! - **Linux**: `process_vm_readv(2)` / `process_vm_writev(2)` for
//!   transfers, `/proc/<pid>/maps` for regions
//!   - See: [process_vm_readv(2)](https://man7.org/linux/man-pages/man2/process_vm_readv.2.html)
//! - **Windows**: `OpenProcess`, `ReadProcessMemory` / `WriteProcessMemory` for
//!   transfers, PSAPI module enumeration for regions
//!   - See: [ReadProcessMemory](https://learn.microsoft.com/en-us/windows/win32/api/memoryapi/nf-memoryapi-readprocessmemory)
//!
//! ## Region listing divergence
//!
//! The two backends do not report the same set of regions. Linux lists every
//! mapping (heap, stack, anonymous memory, mapped files). Windows lists loaded
//! modules only, each spanning its image. Callers that need the same view on
//! both platforms must filter the Linux output themselves.
//!
//! ## Unreadable entries
//!
//! The backends also differ in how they treat an entry they cannot use. On
//! Linux the listing is one text stream, and the first line that does not
//! parse ends it: everything after that point is untrustworthy. On Windows
//! each module is queried separately, and a failed `GetModuleInformation()`
//! means that one module was unloaded between enumeration and query. The
//! remaining modules are unaffected, so that module is skipped (with a
//! `warn!` event) instead of ending the list.

use crate::error::Result;
use crate::mode::Access;
use crate::types::{Address, MemoryRegion, ProcessId};

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(windows)]
pub mod windows;

#[cfg(not(any(target_os = "linux", windows)))]
compile_error!("worm-core supports Linux and Windows targets only");

/// Backend for the compilation target.
#[cfg(target_os = "linux")]
pub type NativeProcess = linux::LinuxProcess;

/// Backend for the compilation target.
#[cfg(windows)]
pub type NativeProcess = windows::WindowsProcess;

/// Raw binding to one target process
///
/// Implementations own whatever OS resource the binding needs and release it
/// on drop. They perform no capability checks: [`Handle`](crate::Handle)
/// only calls the transfer methods its mode allows, and `access` is passed to
/// [`open`](ProcessMemory::open) so the OS resource can be requested with
/// matching rights.
pub trait ProcessMemory: Sized + Send + Sync
{
    /// Bind to `pid` with the given access.
    ///
    /// ## Errors
    ///
    /// - `Open`: the process does not exist, or the OS refused the requested rights
    fn open(pid: ProcessId, access: Access) -> Result<Self>;

    /// Process this binding refers to.
    fn pid(&self) -> ProcessId;

    /// Copy remote memory at `addr` into `dst`, returning the number of bytes copied.
    ///
    /// ## Errors
    ///
    /// - `Io`: the OS reported a hard failure; short copies are not errors
    fn read_into(&self, addr: Address, dst: &mut [u8]) -> Result<usize>;

    /// Copy `src` into remote memory at `addr`, returning the number of bytes copied.
    ///
    /// ## Errors
    ///
    /// - `Io`: the OS reported a hard failure; short copies are not errors
    fn write_from(&self, addr: Address, src: &[u8]) -> Result<usize>;

    /// Snapshot of the target's memory regions, ascending by start address.
    ///
    /// ## Errors
    ///
    /// - `Enumeration`: the listing could not be obtained
    fn regions(&self) -> Result<Vec<MemoryRegion>>;

    /// Duplicate the binding, including its OS resource.
    ///
    /// ## Errors
    ///
    /// - `Open`: the OS refused to duplicate the resource
    fn try_clone(&self) -> Result<Self>;
}
