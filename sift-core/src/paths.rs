//! Path utilities: include-path search and relative-path computation

use std::path::{Path, PathBuf};

/// Locate `name` by trying it as given, then relative to each include path
/// in order. Returns the first existing candidate.
pub fn search(name: &str, include_paths: &[PathBuf]) -> Option<PathBuf> {
    let direct = PathBuf::from(name);
    if direct.exists() {
        return Some(direct);
    }
    for dir in include_paths {
        let candidate = dir.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// Path of `target` relative to `base`, falling back to `target` itself
/// when no relative form exists (e.g. different roots).
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    pathdiff::diff_paths(target, base).unwrap_or_else(|| target.to_path_buf())
}

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
}

/// Split a path into the pieces the predefined variables expose.
#[derive(Debug, Clone, PartialEq)]
pub struct FileParts {
    /// Full name as given.
    pub name: String,
    /// Parent directory ("" when none).
    pub path: String,
    /// File name without directories.
    pub base: String,
    /// Base without the extension.
    pub stem: String,
    /// Extension without the dot ("" when none).
    pub ext: String,
}

impl FileParts {
    pub fn of(file: &Path) -> Self {
        let os = |s: Option<&std::ffi::OsStr>| {
            s.map(|v| v.to_string_lossy().into_owned()).unwrap_or_default()
        };
        Self {
            name: file.to_string_lossy().into_owned(),
            path: file
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            base: os(file.file_name()),
            stem: os(file.file_stem()),
            ext: os(file.extension()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_parts() {
        let parts = FileParts::of(Path::new("docs/src/main.scad"));
        assert_eq!(parts.name, "docs/src/main.scad");
        assert_eq!(parts.path, "docs/src");
        assert_eq!(parts.base, "main.scad");
        assert_eq!(parts.stem, "main");
        assert_eq!(parts.ext, "scad");
    }

    #[test]
    fn file_parts_without_extension() {
        let parts = FileParts::of(Path::new("README"));
        assert_eq!(parts.base, "README");
        assert_eq!(parts.stem, "README");
        assert_eq!(parts.ext, "");
        assert_eq!(parts.path, "");
    }

    #[test]
    fn search_tries_include_paths_in_order() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        std::fs::write(dir_b.path().join("part.scad"), "x").unwrap();
        let paths = vec![dir_a.path().to_path_buf(), dir_b.path().to_path_buf()];
        let found = search("part.scad", &paths).unwrap();
        assert_eq!(found, dir_b.path().join("part.scad"));
        assert!(search("absent.scad", &paths).is_none());
    }

    #[test]
    fn relative_path() {
        let rel = relative_to(Path::new("/a/b/c.txt"), Path::new("/a"));
        assert_eq!(rel, PathBuf::from("b/c.txt"));
    }
}
