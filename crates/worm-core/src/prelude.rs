//! Common module for library exports

pub use crate::error::{ErrorKind, Result, WormError};
pub use crate::handle::{Bound, Handle, ReadHandle, ReadWriteHandle, WriteHandle};
pub use crate::memory::{find_pattern, format_hexdump};
pub use crate::mode::{Mode, Read, ReadWrite, Readable, Writable, Write};
pub use crate::types::{Address, MemoryRegion, Permissions, ProcessId};
