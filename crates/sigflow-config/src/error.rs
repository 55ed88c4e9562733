//! Error types for patch and settings files.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// File operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    /// Reading a patch or settings file.
    Read,
    /// Writing a patch or settings file.
    Write,
    /// Creating a parent directory.
    CreateDir,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileOp::Read => "read",
            FileOp::Write => "write",
            FileOp::CreateDir => "create directory",
        })
    }
}

/// Errors that can occur while loading or saving patches and engine settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file could not be read, written, or created.
    #[error("failed to {op} '{}': {source}", path.display())]
    File {
        /// What was being attempted.
        op: FileOp,
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML.
    #[error("invalid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value that TOML cannot represent.
    #[error("cannot write TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Malformed JSON, or a value JSON cannot represent.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::file(FileOp::Read, path, source)
    }

    pub(crate) fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::file(FileOp::Write, path, source)
    }

    pub(crate) fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::file(FileOp::CreateDir, path, source)
    }

    fn file(op: FileOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::File {
            op,
            path: path.into(),
            source,
        }
    }

    /// The file operation that failed, for [`ConfigError::File`].
    pub fn file_op(&self) -> Option<FileOp> {
        match self {
            ConfigError::File { op, .. } => Some(*op),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::ErrorKind;

    #[test]
    fn test_file_errors_name_the_operation() {
        let err = ConfigError::read_file("/a/b.toml", ErrorKind::NotFound.into());
        assert_eq!(err.file_op(), Some(FileOp::Read));
        let msg = err.to_string();
        assert!(msg.starts_with("failed to read '/a/b.toml'"), "got: {msg}");
        assert!(err.source().is_some());

        let err = ConfigError::create_dir("/a", ErrorKind::PermissionDenied.into());
        assert!(err.to_string().starts_with("failed to create directory '/a'"));
    }

    #[test]
    fn test_parse_errors_carry_no_file_op() {
        let err: ConfigError = toml::from_str::<toml::Value>("= nope").unwrap_err().into();
        assert_eq!(err.file_op(), None);
        assert!(err.to_string().starts_with("invalid TOML"));
    }
}
