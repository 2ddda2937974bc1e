//! Build script for worm-core
//!
//! Checks requirements before compilation:
//! - Minimum Rust version
//! - Target operating system (Linux or Windows)
//!
//! ## Requirements
//!
//! - **Rust**: 1.76.0 or newer (`std::ptr::from_ref`)
//! - **Linux**: kernel 3.2+ for `process_vm_readv` / `process_vm_writev`
//! - **Windows**: any version with PSAPI (`EnumProcessModules`)

use std::env;

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 76, 0);

        if rustc_version < min_rust_version {
            panic!("worm-core requires Rust {min_rust_version} or newer, found {rustc_version}");
        }
    } else {
        // Some build environments hide the compiler version
        println!("cargo:warning=could not verify Rust version");
    }

    // Cross-compiling: the host cfg says nothing about the target
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    match target_os.as_str() {
        "linux" => check_linux_requirements(),
        "windows" => {}
        other => println!("cargo:warning=worm-core does not support target os `{other}`"),
    }
}

fn check_linux_requirements()
{
    // process_vm_readv(2) was added in Linux 3.2
    let min_kernel_version = (3, 2);

    if let Some(version) = get_linux_kernel_version() {
        if version < min_kernel_version {
            println!(
                "cargo:warning=worm-core needs Linux {}.{} or newer at runtime, build host runs {}.{}",
                min_kernel_version.0, min_kernel_version.1, version.0, version.1
            );
        }
    }
}

fn get_linux_kernel_version() -> Option<(u32, u32)>
{
    // Best effort: only meaningful when building on the machine that runs the code
    let release = std::fs::read_to_string("/proc/sys/kernel/osrelease").ok()?;
    let mut parts = release.trim().split(['.', '-']);

    let major = parts.next()?.parse::<u32>().ok()?;
    let minor = parts.next()?.parse::<u32>().ok()?;

    Some((major, minor))
}
