// Loader errors

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while resolving, loading or instantiating a formatter
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Identifier is neither a short code, a type, nor a well-formed type name
    #[error("Formatter '{identifier}' unknown - maybe you meant 'documentation' or 'progress'?")]
    UnknownFormatter { identifier: String },

    /// Well-formed type name that is still missing after loading its conventional path
    #[error("Formatter '{identifier}' not found (looked for '{path}')")]
    FormatterNotFound { identifier: String, path: String },

    /// The definitions at a derived path exist but could not be loaded
    #[error("Failed to load formatter definitions from '{path}'")]
    LoadFailed {
        path: String,
        #[source]
        source: BoxError,
    },

    /// An output path could not be created
    #[error("Failed to open formatter output '{}'", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to construct formatter {formatter}")]
    Construct {
        formatter: String,
        #[source]
        source: BoxError,
    },

    /// A ready-made instance whose type never registered any notifications
    #[error("{formatter} is not a registered formatter type")]
    UnregisteredInstance { formatter: String },
}

impl LoaderError {
    /// True for mistakes in the user's formatter configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LoaderError::UnknownFormatter { .. }
                | LoaderError::FormatterNotFound { .. }
                | LoaderError::UnregisteredInstance { .. }
        )
    }

    pub(crate) fn construct(formatter: &str, source: anyhow::Error) -> Self {
        LoaderError::Construct {
            formatter: formatter.to_string(),
            source: source.into(),
        }
    }
}
