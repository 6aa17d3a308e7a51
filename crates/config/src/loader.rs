use std::path::{Path, PathBuf};

use {
    serde::de::DeserializeOwned,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::HeraldConfig,
};

/// Standard config file names, checked in order.
pub const CONFIG_FILENAMES: &[&str] = &["herald.toml", "herald.yaml", "herald.yml", "herald.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<HeraldConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./herald.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/herald/herald.{toml,yaml,yml,json}` (user-global)
///
/// Returns `HeraldConfig::default()` if no file is found or it fails to load.
pub fn discover_and_load() -> HeraldConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    HeraldConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(path) = find_in(Path::new(".")) {
        return Some(path);
    }
    config_dir().and_then(|dir| find_in(&dir))
}

/// Returns the user-global config directory (`~/.config/herald/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "herald").map(|d| d.config_dir().to_path_buf())
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Parse already-substituted config text, picking the format from the
/// file extension.
///
/// Validation parses into `serde_json::Value` first to walk keys before
/// deserializing into [`HeraldConfig`].
pub(crate) fn parse_config<T: DeserializeOwned>(raw: &str, path: &Path) -> Result<T> {
    match extension(path) {
        Some("toml") => toml::from_str(raw).map_err(|e| Error::parse(path, e.message())),
        Some("yaml" | "yml") => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        Some("json") => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let toml = write(dir.path(), "herald.toml", "[bot]\nprefix = \"/\"\n");
        let yaml = write(dir.path(), "herald.yaml", "bot:\n  prefix: \"/\"\n");
        let json = write(dir.path(), "herald.json", r#"{"bot": {"prefix": "/"}}"#);
        for path in [toml, yaml, json] {
            let config = load_config(&path).unwrap();
            assert_eq!(config.bot.prefix, "/", "{}", path.display());
            assert_eq!(config.bot.language, "en");
        }
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "herald.ini", "prefix=/");
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("herald.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(err.to_string().contains("herald.toml"));
    }

    #[test]
    fn type_errors_surface_as_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "herald.toml", "[stream]\nrefresh_interval_secs = \"soon\"\n");
        assert!(matches!(load_config(&path), Err(Error::Parse { .. })));
    }

    #[test]
    fn find_in_prefers_toml() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "herald.json", "{}");
        write(dir.path(), "herald.toml", "");
        assert_eq!(
            find_in(dir.path()).unwrap(),
            dir.path().join("herald.toml")
        );
    }
}
