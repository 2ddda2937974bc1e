//! Process and memory region types.

use std::fmt;
use std::str::FromStr;

use super::Address;

/// Process identifier (PID)
///
/// Identifies the target process to the operating system. The value is opaque
/// to this crate: it is handed to the OS at bind time and never validated
/// beyond what the OS itself enforces.
///
/// Both supported platforms use 32-bit identifiers (`pid_t` on Linux,
/// `DWORD` on Windows).
///
/// ## Example
///
/// ```rust
/// use worm_core::types::ProcessId;
///
/// let pid = ProcessId::from(12345);
/// assert_eq!(pid.0, 12345);
/// assert_eq!(pid.to_string(), "12345");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

impl ProcessId
{
    /// Identifier of the calling process.
    pub fn current() -> Self
    {
        ProcessId(std::process::id())
    }
}

impl From<u32> for ProcessId
{
    fn from(pid: u32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Page protection of a mapped region
///
/// Only reported by backends that expose it. On Linux this is the `perms`
/// column of `/proc/<pid>/maps` (`r`, `w`, `x`, then `p` for private or `s`
/// for shared).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permissions
{
    /// Pages can be read.
    pub read: bool,
    /// Pages can be written.
    pub write: bool,
    /// Pages can be executed.
    pub execute: bool,
    /// Mapping is shared with other processes rather than copy-on-write.
    pub shared: bool,
}

impl FromStr for Permissions
{
    type Err = String;

    /// Parse a `maps` permission column such as `r-xp` or `rw-s`.
    ///
    /// ```rust
    /// use worm_core::types::Permissions;
    ///
    /// let perms: Permissions = "r-xp".parse().unwrap();
    /// assert!(perms.read && perms.execute);
    /// assert!(!perms.write && !perms.shared);
    /// assert!("rw".parse::<Permissions>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return Err(format!("Invalid permission string: {s}"));
        }

        let flag = |index: usize, set: u8| -> Result<bool, String> {
            match bytes[index] {
                b'-' => Ok(false),
                c if c == set => Ok(true),
                _ => Err(format!("Invalid permission string: {s}")),
            }
        };

        let shared = match bytes[3] {
            b's' => true,
            b'p' => false,
            _ => return Err(format!("Invalid permission string: {s}")),
        };

        Ok(Self {
            read: flag(0, b'r')?,
            write: flag(1, b'w')?,
            execute: flag(2, b'x')?,
            shared,
        })
    }
}

impl fmt::Display for Permissions
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let r = if self.read { 'r' } else { '-' };
        let w = if self.write { 'w' } else { '-' };
        let x = if self.execute { 'x' } else { '-' };
        let s = if self.shared { 's' } else { 'p' };
        write!(f, "{r}{w}{x}{s}")
    }
}

/// Memory region in a target process
///
/// A contiguous, half-open range `[start, end)` of the target's address space
/// with a uniform backing, plus a display name.
///
/// Regions are snapshots: two listings of the same process may differ because
/// the target is free to map and unmap memory in between.
///
/// ## Name
///
/// - **Linux**: the path of the mapped file, a pseudo-name such as `[heap]`
///   or `[stack]`, or empty for anonymous mappings.
/// - **Windows**: the full path of the loaded module.
///
/// ## Example
///
/// ```rust
/// use worm_core::types::{Address, MemoryRegion};
///
/// let region = MemoryRegion::new(Address::from(0x1000), Address::from(0x3000), "/usr/bin/example").unwrap();
/// assert_eq!(region.size(), 0x2000);
/// assert!(region.contains(Address::from(0x2fff)));
/// assert!(!region.contains(Address::from(0x3000)));
///
/// // Empty and inverted ranges are not regions
/// assert!(MemoryRegion::new(Address::from(0x1000), Address::from(0x1000), "").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion
{
    /// Start address of the memory region (inclusive)
    pub start: Address,

    /// End address of the memory region (exclusive)
    pub end: Address,

    /// Display name, empty for anonymous mappings
    pub name: String,

    /// Page protection, when the platform reports it
    pub permissions: Option<Permissions>,
}

impl MemoryRegion
{
    /// Create a region, returning `None` unless `start < end`.
    pub fn new(start: Address, end: Address, name: impl Into<String>) -> Option<Self>
    {
        (start < end).then(|| Self {
            start,
            end,
            name: name.into(),
            permissions: None,
        })
    }

    /// Attach page protection information.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Permissions) -> Self
    {
        self.permissions = Some(permissions);
        self
    }

    /// Size of the region in bytes
    pub fn size(&self) -> u64
    {
        self.end.value() - self.start.value()
    }

    /// Whether `addr` falls inside `[start, end)`.
    pub fn contains(&self, addr: Address) -> bool
    {
        self.start <= addr && addr < self.end
    }

    /// Whether the region has no backing name.
    pub fn is_anonymous(&self) -> bool
    {
        self.name.is_empty()
    }

    /// Whether the region is known to be readable.
    ///
    /// Regions without permission information (Windows modules) are assumed
    /// readable, since the loader maps every image with at least read access.
    pub fn is_readable(&self) -> bool
    {
        self.permissions.map_or(true, |perms| perms.read)
    }
}

impl fmt::Display for MemoryRegion
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{:016x}-{:016x}", self.start, self.end)?;
        if let Some(perms) = self.permissions {
            write!(f, " {perms}")?;
        }
        if !self.name.is_empty() {
            write!(f, " {}", self.name)?;
        }
        Ok(())
    }
}
