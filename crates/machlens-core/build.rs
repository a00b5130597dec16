//! Build script for machlens-core
//!
//! Checks the compiler version before compilation. The string decoders use
//! `<[u8]>::utf8_chunks`, stable since Rust 1.79.

fn main()
{
    let Ok(rustc_version) = rustc_version::version() else {
        // cross builds and some sandboxes cannot run rustc -V
        println!("cargo:warning=could not verify Rust version");
        return;
    };

    let min_rust_version = rustc_version::Version::new(1, 79, 0);
    if rustc_version < min_rust_version {
        panic!("machlens-core requires Rust {min_rust_version} or newer, found {rustc_version}");
    }
}
