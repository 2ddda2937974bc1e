//! # worm-core
//!
//! Read and write the memory of another, already running process.
//!
//! This crate provides:
//! - Capability-typed process handles ([`Handle`]), whose mode decides at
//!   compile time whether reads, writes or both are available
//! - Byte-level and typed transfers between local buffers and remote addresses
//! - Memory region enumeration
//! - Bound values ([`Bound`]) for repeated typed access at a fixed address
//!
//! ## Platform Support
//!
//! - **Linux**: `process_vm_readv` / `process_vm_writev`, `/proc/<pid>/maps`
//! - **Windows**: `OpenProcess`, `ReadProcessMemory` / `WriteProcessMemory`,
//!   PSAPI module enumeration
//!
//! The backend is chosen when the crate is compiled. It stays internal:
//! every access goes through a [`Handle`], whose mode decides what is allowed.
//!
//! ## Why unsafe code is needed
//!
//! Cross-process memory access goes through raw system calls that take
//! pointers and lengths. We wrap these calls in safe functions that derive
//! every pointer/length pair from a Rust slice, but the calls themselves
//! must be `unsafe`.
//!
//! ## Example
//!
//! ```rust
//! use worm_core::prelude::*;
//!
//! let handle = ReadHandle::open(ProcessId::current())?;
//! for region in handle.regions()?.iter().take(3) {
//!     println!("{region}");
//! }
//! # Ok::<(), WormError>(())
//! ```

#![allow(unsafe_code)] // Required for process_vm_readv, ReadProcessMemory, etc.

pub mod error;
pub mod handle;
pub mod maps;
pub mod memory;
pub mod mode;
mod platform;
pub mod prelude;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorKind, Result, Transfer, WormError};
pub use handle::{Bound, Handle, ReadHandle, ReadWriteHandle, WriteHandle};
pub use mode::{Access, Mode, Read, ReadWrite, Readable, Writable, Write};
pub use types::{Address, MemoryRegion, Permissions, ProcessId};
