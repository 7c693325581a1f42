//! Platform naming for release archives.

/// Operating system part of the archive name
pub fn os_label() -> &'static str {
    std::env::consts::OS
}

/// Architecture part of the archive name, in the vocabulary release pages use
pub fn arch_label() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        other => other,
    }
}

/// `<os>-<arch>`, e.g. `windows-x64` or `linux-arm64`
pub fn platform_label() -> String {
    format!("{}-{}", os_label(), arch_label())
}

/// Deterministic archive file name
pub fn archive_file_name(name: &str, version: &str) -> String {
    format!("{name}-{version}-{}.zip", platform_label())
}
