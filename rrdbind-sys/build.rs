//! Build script for rrdbind-sys.
//!
//! The declarations in `src/lib.rs` are written by hand, so nothing is
//! generated here. With the `librrd` feature the script locates the system
//! library and emits the link directives; without it the crate compiles
//! without librrd installed and nothing may call into it.

fn main() {
    println!("cargo:rerun-if-env-changed=RRD_LIB_DIR");

    #[cfg(feature = "librrd")]
    link_librrd();
}

#[cfg(feature = "librrd")]
fn link_librrd() {
    // Try pkg-config first
    if pkg_config::Config::new()
        .atleast_version("1.4")
        .probe("librrd")
        .is_ok()
    {
        return;
    }

    // Fallback to an explicit directory, then standard locations
    println!("cargo:rustc-link-lib=rrd");

    if let Ok(dir) = std::env::var("RRD_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
        return;
    }

    let lib_paths = ["/usr/local/lib", "/usr/lib", "/usr/lib/x86_64-linux-gnu"];
    for path in lib_paths {
        if std::path::Path::new(path).join("librrd.so").exists()
            || std::path::Path::new(path).join("librrd.a").exists()
        {
            println!("cargo:rustc-link-search=native={path}");
            break;
        }
    }
}
