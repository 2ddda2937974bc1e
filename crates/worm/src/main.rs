use std::error::Error;
use std::process;

use clap::{Parser, Subcommand};
use worm_core::memory::{find_pattern, format_hexdump};
use worm_core::types::{Address, MemoryRegion, ProcessId};
use worm_core::{ReadHandle, WriteHandle};
use worm_utils::{debug, info, init_logging_with, warn, LogConfig, LogFormat, LogLevel};

/// Inspect and patch the memory of running processes.
#[derive(Parser, Debug)]
#[command(name = "worm")]
#[command(version)]
#[command(about = "Inspect and patch the memory of running processes", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format: pretty or json (overrides WORM_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List the memory regions of a process
    Regions
    {
        /// Process ID (PID) of the target
        pid: u32,
    },
    /// Dump memory of a process as hex
    Read
    {
        /// Process ID (PID) of the target
        pid: u32,
        /// Address to read from (hex format: 0x1000 or decimal)
        #[arg(value_parser = parse_address)]
        address: Address,
        /// Number of bytes to read
        #[arg(short, long, default_value_t = 64)]
        length: usize,
        /// Bytes per hexdump line (8 to 32)
        #[arg(short, long, default_value_t = 16)]
        width: usize,
    },
    /// Write bytes into the memory of a process
    Write
    {
        /// Process ID (PID) of the target
        pid: u32,
        /// Address to write to (hex format: 0x1000 or decimal)
        #[arg(value_parser = parse_address)]
        address: Address,
        /// Bytes to write as hex, e.g. "90 90" or "deadbeef"
        #[arg(value_parser = parse_hex_bytes)]
        bytes: HexBytes,
    },
    /// Search the readable memory of a process for a byte pattern
    Find
    {
        /// Process ID (PID) of the target
        pid: u32,
        /// Pattern to search for as hex, e.g. "7f454c46"
        #[arg(value_parser = parse_hex_bytes)]
        pattern: HexBytes,
        /// Only search regions whose name contains this text
        #[arg(long)]
        region: Option<String>,
    },
}

/// Byte string given on the command line as hex.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HexBytes(Vec<u8>);

fn main()
{
    let cli = Cli::parse();

    let config = match LogConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };
    let config = apply_overrides(config, cli.log_level, cli.log_format);

    let guard = match init_logging_with(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {}", e);
        // process::exit skips destructors
        drop(guard);
        process::exit(1);
    }
}

fn apply_overrides(mut config: LogConfig, level: Option<LogLevel>, format: Option<LogFormat>) -> LogConfig
{
    if let Some(level) = level {
        config = config.with_level(level);
    }
    if let Some(format) = format {
        config = config.with_format(format);
    }
    config
}

fn run_command(command: Commands) -> Result<(), Box<dyn Error>>
{
    match command {
        Commands::Regions { pid } => {
            info!("Listing regions of process {}", pid);
            let handle = ReadHandle::open(ProcessId::from(pid))?;
            let regions = handle.regions()?;
            print_regions(&regions);
            Ok(())
        }
        Commands::Read {
            pid,
            address,
            length,
            width,
        } => {
            info!("Reading {} bytes at {} from process {}", length, address, pid);
            let handle = ReadHandle::open(ProcessId::from(pid))?;
            let bytes = handle.read_vec(address, length)?;
            print!("{}", format_hexdump(address, &bytes, width));
            if bytes.len() < length {
                eprintln!("Note: only {} of {} bytes were readable", bytes.len(), length);
            }
            Ok(())
        }
        Commands::Write {
            pid,
            address,
            bytes: HexBytes(bytes),
        } => {
            info!("Writing {} bytes at {} in process {}", bytes.len(), address, pid);
            let handle = WriteHandle::open(ProcessId::from(pid))?;
            let written = handle.write_bytes(address, &bytes)?;
            println!("Wrote {} of {} bytes at {}", written, bytes.len(), address);
            Ok(())
        }
        Commands::Find {
            pid,
            pattern: HexBytes(pattern),
            region,
        } => {
            info!("Searching process {} for {} byte pattern", pid, pattern.len());
            let handle = ReadHandle::open(ProcessId::from(pid))?;
            let regions = handle.regions()?;

            let mut matches = 0usize;
            for candidate in searchable(&regions, region.as_deref()) {
                let Ok(len) = usize::try_from(candidate.size()) else {
                    warn!("Skipping region {} larger than the address space", candidate);
                    continue;
                };

                match find_pattern(&handle, candidate.start, len, &pattern) {
                    Ok(Some(found)) => {
                        matches += 1;
                        println!("{}  {}", found, display_name(candidate));
                    }
                    Ok(None) => {}
                    // Guard pages and device mappings refuse reads; keep going
                    Err(e) => debug!("Skipping region {}: {}", candidate, e),
                }
            }

            println!("{} match(es)", matches);
            Ok(())
        }
    }
}

/// Readable regions, optionally restricted to names containing `filter`.
fn searchable<'a>(regions: &'a [MemoryRegion], filter: Option<&'a str>) -> impl Iterator<Item = &'a MemoryRegion>
{
    regions
        .iter()
        .filter(|region| region.is_readable())
        .filter(move |region| filter.map_or(true, |text| region.name.contains(text)))
}

fn display_name(region: &MemoryRegion) -> &str
{
    if region.is_anonymous() {
        "[anonymous]"
    } else {
        &region.name
    }
}

fn print_regions(regions: &[MemoryRegion])
{
    println!("{:<18} {:<18} {:<5} {:>12}  NAME", "START", "END", "PERMS", "SIZE");
    for region in regions {
        let perms = region.permissions.map_or_else(|| "----".to_string(), |perms| perms.to_string());
        println!(
            "{:<18} {:<18} {:<5} {:>12}  {}",
            format!("{:#x}", region.start),
            format!("{:#x}", region.end),
            perms,
            region.size(),
            display_name(region)
        );
    }
    println!("{} region(s)", regions.len());
}

/// Parse an address given as `0x`-prefixed hex or as decimal.
fn parse_address(s: &str) -> Result<Address, String>
{
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    value
        .map(Address::from)
        .map_err(|e| format!("Invalid address '{s}': {e}"))
}

/// Parse a hex byte string, ignoring whitespace and an optional `0x` prefix.
fn parse_hex_bytes(s: &str) -> Result<HexBytes, String>
{
    let trimmed = s.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = trimmed.bytes().filter(|b| !b.is_ascii_whitespace()).collect();

    if digits.is_empty() {
        return Err("Expected at least one byte of hex".to_string());
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in '{s}'"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("Invalid hex byte in '{s}'"))
        })
        .collect::<Result<Vec<u8>, String>>()
        .map(HexBytes)
}
