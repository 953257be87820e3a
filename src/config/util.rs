//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find `name` in `start` or the nearest ancestor directory.
///
/// Absolute names are returned as-is when they exist.
///
/// ```text
/// /home/user/site/pages/     ← start
/// /home/user/site/pageswap.toml  ← found
/// ```
pub fn find_config_file(start: &Path, name: &Path) -> Option<PathBuf> {
    if name.is_absolute() {
        return name.exists().then(|| name.to_path_buf());
    }
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("pages/blog");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("pageswap.toml"), "").unwrap();

        let found = find_config_file(&nested, Path::new("pageswap.toml")).unwrap();
        assert_eq!(found, dir.path().join("pageswap.toml"));
        assert!(find_config_file(&nested, Path::new("missing.toml")).is_none());
    }

    #[test]
    fn test_find_config_absolute() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        assert!(find_config_file(Path::new("/"), &path).is_none());
        std::fs::write(&path, "").unwrap();
        assert_eq!(find_config_file(Path::new("/"), &path), Some(path));
    }
}
