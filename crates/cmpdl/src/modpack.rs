//! Modpack archives: manifest, extraction and override merging

pub mod archive;
pub mod manifest;
pub mod overrides;

pub use archive::extract_archive;
pub use manifest::{Manifest, ManifestFile, MinecraftInfo, ModLoader};
pub use overrides::{merge_overrides, overrides_dir};

/// Replace characters that are not allowed in file names with `-`
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' => '-',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Better MC [FORGE] 1.18.2 v12"), "Better MC [FORGE] 1.18.2 v12");
        assert_eq!(sanitize_file_name("RLCraft 1.12.2 - Release v2.9.1c"), "RLCraft 1.12.2 - Release v2.9.1c");
        assert_eq!(sanitize_file_name("a/b\\c?d%e*f:g|h\"i<j>k"), "a-b-c-d-e-f-g-h-i-j-k");
        assert_eq!(sanitize_file_name("../escape"), "..-escape");
    }
}
