//! Plugin discovery from the commands and events directories.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    Error, Result,
    manifest::{PluginDescriptor, read_manifest},
};

/// List the `*.toml` manifests directly inside `dir`, sorted by file name.
///
/// A missing directory is not an error: it simply holds no plugins.
pub fn manifest_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "plugin directory does not exist, nothing to load");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| Error::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Read every manifest in `dir`.
///
/// Each entry is parsed independently; a bad file yields an `Err` in its
/// slot and does not affect the others.
pub fn scan(dir: &Path) -> Vec<Result<PluginDescriptor>> {
    let paths = match manifest_paths(dir) {
        Ok(paths) => paths,
        Err(e) => return vec![Err(e)],
    };
    debug!(dir = %dir.display(), count = paths.len(), "scanning plugin manifests");
    paths.iter().map(|path| read_manifest(path)).collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_reads_toml_files_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("b.toml"), "name = \"beta\"\nbuiltin = \"ping\"").unwrap();
        std::fs::write(tmp.path().join("a.toml"), "name = \"alpha\"\nbuiltin = \"ping\"").unwrap();
        std::fs::write(tmp.path().join("notes.md"), "not a plugin").unwrap();
        std::fs::create_dir(tmp.path().join("nested.toml")).unwrap();

        let names: Vec<String> = scan(tmp.path())
            .into_iter()
            .map(|r| r.unwrap().manifest.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn bad_manifest_does_not_stop_the_scan() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("1-nameless.toml"), "builtin = \"ping\"").unwrap();
        std::fs::write(tmp.path().join("2-broken.toml"), "name = [").unwrap();
        std::fs::write(tmp.path().join("3-good.toml"), "name = \"good\"\nbuiltin = \"ping\"").unwrap();

        let results = scan(tmp.path());
        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], Err(Error::MissingName { .. })));
        assert!(matches!(results[1], Err(Error::InvalidManifest { .. })));
        assert_eq!(results[2].as_ref().unwrap().name(), "good");
    }

    #[test]
    fn missing_directory_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(scan(&tmp.path().join("absent")).is_empty());
    }
}
