//! Build script for crtools-size
//!
//! Checks the toolchain before compilation:
//! - Minimum Rust version (1.77.0, for `f64::round_ties_even` used to round
//!   aggregate padding)

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 77, 0);

        if rustc_version < min_rust_version {
            panic!(
                "crtools-size requires Rust {} or newer, found {}",
                min_rust_version, rustc_version
            );
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }
}
