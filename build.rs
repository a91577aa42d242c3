//! Build script for auto-angler
//! Embeds the Windows manifest and application icon when present

fn main() {
    // Only run on Windows
    #[cfg(windows)]
    {
        embed_windows_resources();
    }
}

#[cfg(windows)]
fn embed_windows_resources() {
    let mut res = winres::WindowsResource::new();

    // Synthetic input into an elevated game client needs a matching manifest
    if std::path::Path::new("auto-angler.manifest").exists() {
        res.set_manifest_file("auto-angler.manifest");
    }

    if std::path::Path::new("icons/icon.ico").exists() {
        res.set_icon("icons/icon.ico");
    }

    if let Err(e) = res.compile() {
        eprintln!("Warning: Failed to compile Windows resources: {}", e);
    }
}
