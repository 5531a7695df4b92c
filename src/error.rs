use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `remove` was called for a key that is not in the tree.
    #[error("key not found: {0:?}")]
    KeyNotFound(String),

    #[error("Could not find file {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Error::FileNotFound { path }
        } else {
            Error::Read { path, source }
        }
    }
}
