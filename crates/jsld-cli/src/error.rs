use std::io;
use std::path::{Path, PathBuf};

use jsld_types::{ErrorCode, LinkError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    InvalidArguments(String),

    #[error("invalid config file '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Link(#[from] LinkError),
}

impl CliError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::READ_FAILED,
            Self::Write { .. } => ErrorCode::WRITE_FAILED,
            Self::InvalidArguments(_) => ErrorCode::INVALID_ARGUMENTS,
            Self::Config { .. } => ErrorCode::BAD_CONFIG,
            Self::Link(err) => err.code,
        }
    }

    /// The file a host error concerns.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Write { path, .. } | Self::Config { path, .. } => {
                Some(path)
            }
            Self::InvalidArguments(_) | Self::Link(_) => None,
        }
    }
}

impl From<CliError> for LinkError {
    fn from(err: CliError) -> Self {
        if let CliError::Link(inner) = err {
            return inner;
        }
        let mut link_error = LinkError::new(err.code(), err.to_string());
        link_error.file = err.path().map(|p| p.display().to_string());
        link_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_errors_keep_the_path() {
        let err = CliError::Read {
            path: PathBuf::from("missing.js"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        let link_error = LinkError::from(err);
        assert_eq!(link_error.code, ErrorCode::READ_FAILED);
        assert_eq!(link_error.file.as_deref(), Some("missing.js"));
        assert_eq!(link_error.message, "cannot read 'missing.js': not found");
    }

    #[test]
    fn link_errors_pass_through() {
        let inner = LinkError::new(ErrorCode::UNDEFINED_SYMBOL, "1 undefined symbol(s)")
            .with_items(["puts"]);
        assert_eq!(LinkError::from(CliError::from(inner.clone())), inner);
    }
}
