//! Tests for error handling

use std::io;

use worm_core::error::{ErrorKind, Result, Transfer, WormError};
use worm_core::types::{Address, ProcessId};

#[test]
fn test_open_error_display()
{
    let error = WormError::Open {
        pid: ProcessId(12345),
        source: io::Error::from(io::ErrorKind::NotFound),
    };
    let message = format!("{}", error);
    assert!(message.contains("12345"));
    assert!(message.contains("open"));
    assert_eq!(error.kind(), ErrorKind::Open);
}

#[test]
fn test_io_error_display()
{
    let error = WormError::Io {
        op: Transfer::Write,
        addr: Address::from(0xdead_0000),
        len: 8,
        source: io::Error::from(io::ErrorKind::PermissionDenied),
    };
    let message = format!("{}", error);
    assert!(message.contains("write"));
    assert!(message.contains("8 bytes"));
    assert!(message.contains("0x00000000dead0000"));
    assert_eq!(error.kind(), ErrorKind::Io);
}

#[test]
fn test_enumeration_error_display()
{
    let error = WormError::Enumeration {
        pid: ProcessId(7),
        source: io::Error::from(io::ErrorKind::NotFound),
    };
    let message = format!("{}", error);
    assert!(message.contains("enumerate"));
    assert!(message.contains('7'));
    assert_eq!(error.kind(), ErrorKind::Enumeration);
}

#[test]
fn test_raw_os_error_preserved()
{
    let error = WormError::Io {
        op: Transfer::Read,
        addr: Address::ZERO,
        len: 4,
        source: io::Error::from_raw_os_error(14),
    };
    assert_eq!(error.raw_os_error(), Some(14));
}

#[test]
fn test_raw_os_error_absent()
{
    let error = WormError::Io {
        op: Transfer::Read,
        addr: Address::ZERO,
        len: 4,
        source: io::Error::new(io::ErrorKind::UnexpectedEof, "short read"),
    };
    assert_eq!(error.raw_os_error(), None);
    assert_eq!(error.io_error().kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn test_error_source_chain()
{
    use std::error::Error;

    let error = WormError::Enumeration {
        pid: ProcessId(1),
        source: io::Error::other("listing unavailable"),
    };
    let source = error.source().expect("source should be set");
    assert!(source.to_string().contains("listing unavailable"));
}

#[test]
fn test_result_type_alias()
{
    fn returns_result() -> Result<u32>
    {
        Ok(42)
    }

    assert_eq!(returns_result().unwrap(), 42);
}

#[test]
fn test_transfer_display()
{
    assert_eq!(Transfer::Read.to_string(), "read");
    assert_eq!(Transfer::Write.to_string(), "write");
}
