//! # Memory Helpers
//!
//! Conveniences layered on top of [`Handle`]: hexdump formatting and byte
//! pattern search. Neither interprets the memory it touches.

use std::cmp::min;
use std::fmt::Write as _;

use tracing::debug;

use crate::error::Result;
use crate::handle::Handle;
use crate::mode::Readable;
use crate::types::Address;

/// Bytes fetched per read while scanning for a pattern.
pub const PATTERN_SCAN_CHUNK: usize = 64 * 1024;

/// Formats bytes into a traditional hex + ASCII view.
///
/// `width` is the number of bytes per line, clamped to `8..=32`.
///
/// ```rust
/// use worm_core::memory::format_hexdump;
/// use worm_core::types::Address;
///
/// let dump = format_hexdump(Address::from(0x1000), b"worm\x00", 8);
/// assert!(dump.starts_with("0000000000001000: 77 6f 72 6d 00"));
/// assert!(dump.trim_end().ends_with("worm."));
/// ```
pub fn format_hexdump(base: Address, bytes: &[u8], width: usize) -> String
{
    let width = width.clamp(8, 32);
    let mut out = String::new();
    for (line, chunk) in bytes.chunks(width).enumerate() {
        let addr = base.saturating_add((line * width) as u64);
        let _ = write!(out, "{addr:016x}: ");

        for i in 0..width {
            match chunk.get(i) {
                Some(byte) => {
                    let _ = write!(out, "{byte:02x} ");
                }
                None => out.push_str("   "),
            }
        }

        out.push(' ');
        out.extend(chunk.iter().map(|&byte| {
            if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize>
{
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Search remote memory for a byte pattern
///
/// Scans `[start, start + len)` in chunks of [`PATTERN_SCAN_CHUNK`] bytes,
/// overlapping consecutive chunks by `pattern.len() - 1` so matches that
/// straddle a chunk boundary are found. The scan ends early when the range
/// runs into inaccessible memory: either a read comes back short, or a chunk
/// after the first fails outright because it starts exactly where the
/// accessible memory ended.
///
/// ## Returns
///
/// `Some(address)` of the first match, `None` if there is none.
///
/// ## Errors
///
/// - `Io`: the first read failed outright
pub fn find_pattern<M: Readable>(handle: &Handle<M>, start: Address, len: usize, pattern: &[u8]) -> Result<Option<Address>>
{
    if pattern.is_empty() {
        return Ok(Some(start));
    }

    let mut buffer = vec![0u8; min(PATTERN_SCAN_CHUNK, len).max(pattern.len())];
    let mut scanned = 0usize;
    while scanned < len {
        let chunk_len = min(buffer.len(), len - scanned);
        let addr = start.saturating_add(scanned as u64);
        let copied = match handle.read_bytes(addr, &mut buffer[..chunk_len]) {
            Ok(copied) => copied,
            Err(err) if scanned > 0 => {
                debug!(%addr, "pattern scan stopped: {err}");
                break;
            }
            Err(err) => return Err(err),
        };

        if let Some(pos) = find_subslice(&buffer[..copied], pattern) {
            return Ok(Some(addr.saturating_add(pos as u64)));
        }

        if copied < chunk_len || chunk_len < pattern.len() {
            break;
        }

        // Overlap by pattern length to catch boundary matches.
        let step = chunk_len - (pattern.len() - 1);
        scanned += step;
    }

    Ok(None)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_hexdump_pads_last_line()
    {
        let bytes: Vec<u8> = (0u8..12).collect();
        let dump = format_hexdump(Address::from(0x10), &bytes, 8);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000000000000010: 00 01 02 03 04 05 06 07 "));
        assert!(lines[1].starts_with("0000000000000018: 08 09 0a 0b             "));
    }

    #[test]
    fn test_hexdump_clamps_width()
    {
        let dump = format_hexdump(Address::ZERO, &[0u8; 4], 1);
        // 8 columns of "xx " regardless of the requested width of 1
        assert_eq!(dump.lines().next().unwrap().len(), 18 + 8 * 3 + 1 + 4);
    }

    #[test]
    fn test_hexdump_empty()
    {
        assert!(format_hexdump(Address::ZERO, &[], 16).is_empty());
    }

    #[test]
    fn test_find_subslice()
    {
        assert_eq!(find_subslice(b"hello worm", b"worm"), Some(6));
        assert_eq!(find_subslice(b"hello", b"worm"), None);
        assert_eq!(find_subslice(b"abc", b""), Some(0));
    }
}
