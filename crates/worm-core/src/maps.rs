//! # Mapping Description Parser
//!
//! Parser for the textual region listing Linux exposes at `/proc/<pid>/maps`:
//!
//! ```text
//! 00400000-00452000 r-xp 00000000 08:02 173521      /usr/bin/dbus-daemon
//! 00e03000-00e24000 rw-p 00000000 00:00 0           [heap]
//! 7f7d6f8e1000-7f7d6f8e4000 rw-p 00000000 00:00 0
//! ```
//!
//! One line per region, columns separated by spaces. The first column is the
//! range as two lowercase hexadecimal numbers joined by `-`. The name is the
//! text after the last separator; a line with only the five fixed columns has
//! no name (anonymous mapping).
//!
//! The first line that does not have this shape ends the listing. That is the
//! defined end-of-list condition, not an error, so a trailing blank or
//! truncated line is simply not reported.
//!
//! This module has no platform dependency so it can be exercised anywhere.

use crate::types::{Address, MemoryRegion, Permissions};

const COLUMN_DELIM: char = ' ';
const RANGE_DELIM: char = '-';

/// Number of columns before the optional path column.
const FIXED_COLUMNS: usize = 5;

/// Iterator over the regions of a mapping description
///
/// ```rust
/// use worm_core::maps::MapsParser;
///
/// let text = "1000-2000 r-xp 00000000 08:02 42 /bin/true\n3000-40";
/// let regions: Vec<_> = MapsParser::new(text).collect();
/// assert_eq!(regions.len(), 1);
/// assert_eq!(regions[0].name, "/bin/true");
/// ```
#[derive(Debug, Clone)]
pub struct MapsParser<'a>
{
    lines: std::str::Split<'a, char>,
    done: bool,
}

impl<'a> MapsParser<'a>
{
    /// Parse `text`, the full contents of a mapping description.
    pub fn new(text: &'a str) -> Self
    {
        Self {
            lines: text.split('\n'),
            done: false,
        }
    }
}

impl Iterator for MapsParser<'_>
{
    type Item = MemoryRegion;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.done {
            return None;
        }

        let region = self.lines.next().and_then(parse_line);
        if region.is_none() {
            self.done = true;
        }
        region
    }
}

impl std::iter::FusedIterator for MapsParser<'_> {}

/// Collect every region of a mapping description, in listing order.
pub fn parse_maps(text: &str) -> Vec<MemoryRegion>
{
    MapsParser::new(text).collect()
}

/// Parse a single line, or `None` if it is not a region descriptor.
pub fn parse_line(line: &str) -> Option<MemoryRegion>
{
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (range, rest) = line.split_once(COLUMN_DELIM)?;
    let (start, end) = range.split_once(RANGE_DELIM)?;

    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;

    let name = if rest.split(COLUMN_DELIM).filter(|c| !c.is_empty()).count() + 1 == FIXED_COLUMNS {
        ""
    } else {
        // Found above, so rfind cannot miss.
        line.rfind(COLUMN_DELIM).map_or("", |index| &line[index + 1..])
    };

    let region = MemoryRegion::new(Address::from(start), Address::from(end), name)?;

    let perms = rest.split(COLUMN_DELIM).next().and_then(|c| c.parse::<Permissions>().ok());
    Some(match perms {
        Some(perms) => region.with_permissions(perms),
        None => region,
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    const SAMPLE: &str = "\
00400000-00452000 r-xp 00000000 08:02 173521                             /usr/bin/dbus-daemon
00e03000-00e24000 rw-p 00000000 00:00 0                                  [heap]
7f7d6f8e1000-7f7d6f8e4000 rw-p 00000000 00:00 0
7fff43b5e000-7fff43b7f000 rw-p 00000000 00:00 0                          [stack]
";

    #[test]
    fn test_parse_sample()
    {
        let regions = parse_maps(SAMPLE);
        assert_eq!(regions.len(), 4);

        assert_eq!(regions[0].start, Address::from(0x0040_0000));
        assert_eq!(regions[0].end, Address::from(0x0045_2000));
        assert_eq!(regions[0].name, "/usr/bin/dbus-daemon");
        assert_eq!(regions[1].name, "[heap]");
        assert!(regions[2].is_anonymous());
        assert_eq!(regions[3].name, "[stack]");
    }

    #[test]
    fn test_parse_permissions()
    {
        let regions = parse_maps(SAMPLE);
        let code = regions[0].permissions.unwrap();
        assert!(code.read && code.execute && !code.write && !code.shared);

        let heap = regions[1].permissions.unwrap();
        assert!(heap.read && heap.write && !heap.execute);
    }

    #[test]
    fn test_anonymous_without_trailing_space()
    {
        let region = parse_line("7f7d6f8e1000-7f7d6f8e4000 rw-p 00000000 00:00 0").unwrap();
        assert_eq!(region.name, "");
    }

    #[test]
    fn test_name_is_after_last_separator()
    {
        let region = parse_line("1000-2000 name").unwrap();
        assert_eq!(region.name, "name");
        assert_eq!(region.permissions, None);
    }

    #[test]
    fn test_stops_at_truncated_line()
    {
        let text = "1000-2000 r--p 00000000 00:00 0 /a\n3000-4";
        let regions = parse_maps(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].name, "/a");
    }

    #[test]
    fn test_stops_at_blank_line()
    {
        let text = "1000-2000 r--p 00000000 00:00 0 /a\n\n3000-4000 r--p 00000000 00:00 0 /b\n";
        assert_eq!(parse_maps(text).len(), 1);
    }

    #[test]
    fn test_stops_at_bad_hex()
    {
        let text = "1000-2000 r--p 00000000 00:00 0 /a\nzzzz-4000 r--p 00000000 00:00 0 /b\n5000-6000 x\n";
        assert_eq!(parse_maps(text).len(), 1);
    }

    #[test]
    fn test_stops_at_empty_range()
    {
        let text = "2000-2000 r--p 00000000 00:00 0 /a\n3000-4000 r--p 00000000 00:00 0 /b\n";
        assert!(parse_maps(text).is_empty());
    }

    #[test]
    fn test_parser_is_fused()
    {
        let mut parser = MapsParser::new("x\n1000-2000 a\n");
        assert!(parser.next().is_none());
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_empty_input()
    {
        assert!(parse_maps("").is_empty());
    }
}
