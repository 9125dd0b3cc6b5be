//! File filter (C2): decide which paths in a tree listing are worth
//! fetching and indexing.
//!
//! Pure and deterministic, applied before any body is fetched -- rejecting
//! a path here costs nothing but a string comparison.

const ALLOW_BASENAMES: &[&str] = &["license", "readme", "readme.md", ".gitignore", ".dockerignore"];

const ALLOW_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "java", "go", "rb", "rs", "cpp", "cc", "c", "h", "hpp", "cs",
    "php", "swift", "kt", "kts", "scala", "r", "m", "mm", "sh", "bash", "zsh", "html", "css", "scss",
    "less", "json", "yml", "yaml", "toml", "md", "txt", "env", "ini", "cfg", "conf", "sql",
];

const DENY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "ico", "pdf", "zip", "gz", "tar", "rar", "7z", "mp4", "mp3",
    "wav", "woff", "woff2", "ttf", "jar", "bin",
];

/// Basename of a path, lowercased (`"src/README.md"` -> `"readme.md"`).
fn basename_lower(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_lowercase()
}

/// Extension of a path, lowercased, without the leading dot.
fn extension_lower(path: &str) -> Option<String> {
    let base = path.rsplit('/').next().unwrap_or(path);
    base.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Decide whether a path is worth indexing.
///
/// A path is indexable iff its basename is a well-known text file, or its
/// extension is in the allow-list; any extension in the deny-list rejects
/// outright, taking precedence so e.g. `archive.tar.gz` is still skipped.
pub fn is_indexable(path: &str) -> bool {
    let base = basename_lower(path);
    if ALLOW_BASENAMES.contains(&base.as_str()) {
        return true;
    }

    match extension_lower(path) {
        Some(ext) if DENY_EXTENSIONS.contains(&ext.as_str()) => false,
        Some(ext) => ALLOW_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_basenames_are_indexable() {
        assert!(is_indexable("README.md"));
        assert!(is_indexable("LICENSE"));
        assert!(is_indexable(".gitignore"));
        assert!(is_indexable("sub/dir/.dockerignore"));
    }

    #[test]
    fn allow_extensions_are_indexable() {
        assert!(is_indexable("src/main.py"));
        assert!(is_indexable("lib/index.ts"));
        assert!(is_indexable("Dockerfile.yml"));
    }

    #[test]
    fn deny_extensions_are_rejected() {
        assert!(!is_indexable("logo.png"));
        assert!(!is_indexable("archive.zip"));
        assert!(!is_indexable("font.woff2"));
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        assert!(!is_indexable("data.xyz"));
        assert!(!is_indexable("no_extension_file"));
    }

    #[test]
    fn extensionless_non_allow_basename_is_rejected() {
        assert!(!is_indexable("Dockerfile"));
    }
}
