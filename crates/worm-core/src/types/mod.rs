//! # Types
//!
//! Platform-agnostic types shared by the handle and both backends.
//!
//! These types keep the rest of the crate free of OS-specific integer types:
//! a `ProcessId` is a `pid_t` on Linux and a `DWORD` on Windows, but callers
//! only ever see the newtype.

pub mod address;
pub mod process;

// Re-export all public types
pub use address::Address;
pub use process::{MemoryRegion, Permissions, ProcessId};
