//! Embeds the application icon into the Windows executable with `winres`.

use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=icon.ico");

    // Only Windows executables carry resources.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }
    if !Path::new("icon.ico").exists() {
        println!("cargo:warning=icon.ico not found, building without an embedded icon");
        return;
    }

    let mut res = winres::WindowsResource::new();
    res.set_icon("icon.ico");
    res.compile()
        .expect("failed to compile Windows resources with winres");
}
