use std::{error::Error as StdError, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read plugin manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plugin manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("plugin manifest {path} has no name")]
    MissingName { path: PathBuf },

    #[error("plugin manifest {path} references unknown builtin '{builtin}'")]
    UnknownBuiltin { path: PathBuf, builtin: String },

    #[error("plugin '{name}' failed to initialise: {reason}")]
    OnLoad { name: String, reason: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// The manifest this error is about, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Read { path, .. }
            | Self::InvalidManifest { path, .. }
            | Self::MissingName { path }
            | Self::UnknownBuiltin { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
