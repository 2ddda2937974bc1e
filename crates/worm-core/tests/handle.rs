//! Integration tests for process handles
//!
//! These tests open the test process itself, which needs no extra privilege:
//! every platform allows a process to read and write its own memory.

use worm_core::error::ErrorKind;
use worm_core::memory::find_pattern;
use worm_core::types::{Address, ProcessId};
use worm_core::{ReadHandle, ReadWriteHandle, WriteHandle};

fn self_handle() -> ReadWriteHandle
{
    ReadWriteHandle::open(ProcessId::current()).expect("opening our own process should succeed")
}

#[test]
fn test_write_then_read_typed()
{
    let handle = self_handle();
    let local = Box::new(0u32);
    let addr = Address::of(&*local);

    handle.write(addr, &42u32).unwrap();

    // SAFETY: `local` is live and the remote write went through the kernel.
    let seen = unsafe { std::ptr::read_volatile(&*local) };
    assert_eq!(seen, 42);
    assert_eq!(handle.read::<u32>(addr).unwrap(), 42);
}

#[test]
fn test_bound_value()
{
    let handle = self_handle();
    let local = Box::new(0i32);

    let counter = handle.bind::<i32>(Address::of(&*local));
    counter.write(&7).unwrap();
    assert_eq!(counter.read().unwrap(), 7);
    assert_eq!(counter.address(), Address::of(&*local));
}

#[test]
fn test_reads_are_idempotent()
{
    let handle = self_handle();
    let local = Box::new([0x5au8; 32]);
    let addr = Address::of(&*local);

    let first = handle.read_vec(addr, 32).unwrap();
    let second = handle.read_vec(addr, 32).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec![0x5a; 32]);
}

#[test]
fn test_read_bytes_and_write_bytes()
{
    let handle = self_handle();
    let local = Box::new(*b"hello, worm!");
    let addr = Address::of(&*local);

    assert_eq!(handle.write_bytes(addr + 7, b"WORM").unwrap(), 4);

    let mut buffer = [0u8; 12];
    assert_eq!(handle.read_bytes(addr, &mut buffer).unwrap(), 12);
    assert_eq!(&buffer, b"hello, WORM!");
}

#[test]
fn test_empty_transfers()
{
    let handle = self_handle();
    assert_eq!(handle.read_bytes(Address::ZERO, &mut []).unwrap(), 0);
    assert_eq!(handle.write_bytes(Address::ZERO, &[]).unwrap(), 0);
}

#[test]
fn test_read_unmapped_is_io_error()
{
    let handle = self_handle();
    let err = handle.read::<u64>(Address::ZERO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.raw_os_error().is_some());
}

#[test]
fn test_write_unmapped_is_io_error()
{
    let handle = self_handle();
    let err = handle.write(Address::ZERO, &1u64).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_mode_accessors()
{
    let read = ReadHandle::open(ProcessId::current()).unwrap();
    assert!(read.access().readable);
    assert!(!read.access().writable);
    assert_eq!(read.pid(), ProcessId::current());

    let write = WriteHandle::open(ProcessId::current()).unwrap();
    assert!(!write.access().readable);
    assert!(write.access().writable);
}

#[test]
fn test_write_only_handle_writes()
{
    let handle = WriteHandle::open(ProcessId::current()).unwrap();
    let local = Box::new(0u16);

    handle.write(Address::of(&*local), &0xbeefu16).unwrap();

    // SAFETY: `local` is live and the remote write went through the kernel.
    assert_eq!(unsafe { std::ptr::read_volatile(&*local) }, 0xbeef);
}

#[test]
fn test_regions_sorted_and_nonempty()
{
    let handle = self_handle();
    let regions = handle.regions().unwrap();

    assert!(!regions.is_empty());
    assert!(regions.iter().all(|region| region.start < region.end));
    assert!(regions.windows(2).all(|pair| pair[0].start <= pair[1].start));
}

#[test]
fn test_try_clone()
{
    let handle = self_handle();
    let clone = handle.try_clone().unwrap();
    drop(handle);

    let local = Box::new(99u64);
    assert_eq!(clone.read::<u64>(Address::of(&*local)).unwrap(), 99);
    assert_eq!(clone.pid(), ProcessId::current());
}

#[test]
fn test_find_pattern_local_buffer()
{
    let handle = self_handle();
    let mut local = vec![0u8; 4096];
    local[3000..3004].copy_from_slice(b"WORM");
    let addr = Address::of(&local[0]);

    let found = find_pattern(&handle, addr, local.len(), b"WORM").unwrap();
    assert_eq!(found, Some(addr + 3000));

    let missing = find_pattern(&handle, addr, local.len(), b"MROW").unwrap();
    assert_eq!(missing, None);
}

#[test]
fn test_debug_output()
{
    let handle = self_handle();
    let debug = format!("{handle:?}");
    assert!(debug.contains("Handle"));
    assert!(debug.contains(&std::process::id().to_string()));
}

#[cfg(target_os = "linux")]
mod linux
{
    use super::*;

    fn page_size() -> usize
    {
        // SAFETY: sysconf has no preconditions.
        unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
    }

    /// Map `len` bytes of anonymous memory followed by one unmapped page.
    ///
    /// `len` must be a multiple of the page size.
    fn mapping_followed_by_hole(len: usize) -> *mut u8
    {
        let page = page_size();

        // SAFETY: anonymous private mapping with no address hint.
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len + page,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        assert_ne!(base, libc::MAP_FAILED);

        // SAFETY: the last page belongs to the mapping created above.
        let rc = unsafe { libc::munmap(base.cast::<u8>().add(len).cast(), page) };
        assert_eq!(rc, 0);

        base.cast::<u8>()
    }

    /// One mapped page directly followed by a hole.
    fn page_followed_by_hole() -> (*mut u8, usize)
    {
        let page = page_size();
        (mapping_followed_by_hole(page), page)
    }

    fn release(base: *mut u8, len: usize)
    {
        // SAFETY: `base` is the start of a still-mapped range of `len` bytes.
        unsafe { libc::munmap(base.cast(), len) };
    }

    #[test]
    fn test_open_pid_zero_fails()
    {
        let err = ReadHandle::open(ProcessId(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Open);
        assert_eq!(err.raw_os_error(), Some(libc::ESRCH));
    }

    #[test]
    fn test_open_out_of_range_pid_fails()
    {
        let err = ReadHandle::open(ProcessId(u32::MAX)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Open);
    }

    #[test]
    fn test_open_nonexistent_pid_fails()
    {
        // Above the default pid_max of 4194304, so never allocated.
        let err = ReadWriteHandle::open(ProcessId(0x7fff_fff0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Open);
        assert_eq!(err.raw_os_error(), Some(libc::ESRCH));
    }

    #[test]
    fn test_partial_read_at_mapping_end()
    {
        let handle = self_handle();
        let (base, page) = page_followed_by_hole();
        let addr = Address::new(base as usize as u64) + (page as u64 - 8);

        let mut buffer = [0u8; 16];
        let copied = handle.read_bytes(addr, &mut buffer).unwrap();
        assert!(copied > 0 && copied < buffer.len());
        assert_eq!(copied, 8);

        // Typed reads must be complete
        let err = handle.read::<[u8; 16]>(addr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.io_error().kind(), std::io::ErrorKind::UnexpectedEof);

        release(base, page);
    }

    #[test]
    fn test_read_hole_is_efault()
    {
        let handle = self_handle();
        let (base, page) = page_followed_by_hole();
        let hole = Address::new(base as usize as u64) + page as u64;

        let err = handle.read::<u32>(hole).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.raw_os_error(), Some(libc::EFAULT));

        release(base, page);
    }

    #[test]
    fn test_region_containing_local_address()
    {
        let handle = self_handle();
        let local = Box::new(0u64);
        let addr = Address::of(&*local);

        let region = handle.region_containing(addr).unwrap().expect("heap allocation should be mapped");
        assert!(region.contains(addr));
        assert!(region.permissions.is_some_and(|perms| perms.read && perms.write));
    }

    #[test]
    fn test_find_pattern_stops_at_hole()
    {
        let handle = self_handle();
        let (base, page) = page_followed_by_hole();
        let addr = Address::new(base as usize as u64);

        let found = find_pattern(&handle, addr, page * 2, b"never present").unwrap();
        assert_eq!(found, None);

        release(base, page);
    }

    #[test]
    fn test_partial_write_at_mapping_end()
    {
        let handle = self_handle();
        let (base, page) = page_followed_by_hole();
        let addr = Address::new(base as usize as u64) + (page as u64 - 8);

        let written = handle.write_bytes(addr, &[0xaa; 16]).unwrap();
        assert!(written > 0 && written < 16);
        assert_eq!(written, 8);
        assert_eq!(handle.read_vec(addr, 8).unwrap(), vec![0xaa; 8]);

        release(base, page);
    }

    #[test]
    fn test_partial_typed_write_reports_count()
    {
        let handle = self_handle();
        let (base, page) = page_followed_by_hole();
        let addr = Address::new(base as usize as u64) + (page as u64 - 8);

        // The bytes before the hole land, and the count says how many
        assert_eq!(handle.write(addr, &[0xbbu8; 16]).unwrap(), 8);
        assert_eq!(handle.bind::<[u8; 4]>(addr).write(&[0xcc; 4]).unwrap(), 4);
        assert_eq!(handle.read_vec(addr, 8).unwrap(), vec![0xcc, 0xcc, 0xcc, 0xcc, 0xbb, 0xbb, 0xbb, 0xbb]);

        release(base, page);
    }

    #[test]
    fn test_regions_of_exited_process_fails()
    {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let handle = ReadHandle::open(ProcessId(child.id())).unwrap();

        child.kill().unwrap();
        child.wait().unwrap();

        let err = handle.regions().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Enumeration);
        assert!(err.raw_os_error().is_some());
    }

    #[test]
    fn test_regions_with_non_utf8_path()
    {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        use std::os::unix::io::AsRawFd;

        let page = page_size();
        let mut name = format!("worm-maps-{}-", std::process::id()).into_bytes();
        name.extend_from_slice(b"\xff\xfe.bin");
        let path = std::env::temp_dir().join(OsStr::from_bytes(&name));
        std::fs::write(&path, vec![0u8; page]).unwrap();
        let file = std::fs::File::open(&path).unwrap();

        // SAFETY: read-only shared mapping of a file we keep open.
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                page,
                libc::PROT_READ,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        assert_ne!(base, libc::MAP_FAILED);
        let addr = Address::new(base as usize as u64);

        let handle = self_handle();
        let regions = handle.regions().unwrap();
        let region = regions.iter().find(|region| region.contains(addr)).unwrap();
        assert!(region.name.ends_with("\u{fffd}\u{fffd}.bin"), "{}", region.name);

        release(base.cast(), page);
        drop(file);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_find_pattern_chunk_ends_at_hole()
    {
        let handle = self_handle();
        let len = worm_core::memory::PATTERN_SCAN_CHUNK;
        let base = mapping_followed_by_hole(len);
        let addr = Address::new(base as usize as u64);

        // The first chunk fills exactly; the second starts in the hole
        let found = find_pattern(&handle, addr, len + page_size(), &[0xab]).unwrap();
        assert_eq!(found, None);

        // SAFETY: the mapping is `len` bytes long and still live.
        unsafe { base.add(len - 1).write(0xab) };
        let found = find_pattern(&handle, addr, len + page_size(), &[0xab]).unwrap();
        assert_eq!(found, Some(addr + (len as u64 - 1)));

        release(base, len);
    }

    #[test]
    fn test_find_pattern_first_chunk_unmapped_fails()
    {
        let handle = self_handle();
        let (base, page) = page_followed_by_hole();
        let hole = Address::new(base as usize as u64) + page as u64;

        let err = find_pattern(&handle, hole, 16, b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);

        release(base, page);
    }
}

#[cfg(windows)]
mod windows
{
    use super::*;

    #[test]
    fn test_regions_are_modules()
    {
        let handle = self_handle();
        let regions = handle.regions().unwrap();

        // The executable itself is always a loaded module
        let exe = std::env::current_exe().unwrap();
        let exe_name = exe.file_name().unwrap().to_string_lossy().to_lowercase();
        assert!(regions.iter().any(|region| region.name.to_lowercase().ends_with(&exe_name)));
        assert!(regions.iter().all(|region| region.permissions.is_none()));
    }

    #[test]
    fn test_open_pid_zero_fails()
    {
        // The System Idle Process cannot be opened
        let err = ReadHandle::open(ProcessId(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Open);
    }
}
