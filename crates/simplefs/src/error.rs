use sfs_op_system::{Canceled, OpId, SystemError};

use std::{fmt, path::Path as StdPath};

use thiserror::Error;

use super::path::Path;

#[derive(Debug, Error)]
pub enum Error {
	#[error("no such handle <op_id='{0}'>")]
	NoSuchHandle(OpId),
	#[error("async result not found <op_id='{0}'>")]
	NoResult(OpId),
	#[error("an operation is already running <op_id='{0}'>")]
	OperationInProgress(OpId),
	#[error("invalid remote path <path='{0}'>")]
	InvalidRemotePath(String),
	#[error("only remote paths are supported for this operation <path='{0}'>")]
	OnlyRemotePathSupported(Path),
	#[error("bad argument: {0}")]
	BadArgument(String),
	#[error("handle has no file to read or write <op_id='{0}'>")]
	NotOpenForIo(OpId),
	#[error("not a file <path='{0}'>")]
	NotAFile(Path),
	#[error("not a directory <path='{0}'>")]
	NotADirectory(Path),
	#[error("top-level folders can't be deleted recursively <path='{0}'>")]
	CannotDeleteTlfRecursively(Path),
	#[error(transparent)]
	Canceled(#[from] Canceled),

	// Causes reported by the filesystems underneath
	#[error(transparent)]
	Remote(#[from] sfs_remote_fs::Error),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
}

impl From<SystemError> for Error {
	fn from(e: SystemError) -> Self {
		match e {
			SystemError::NoSuchHandle(id) => Self::NoSuchHandle(id),
			SystemError::NoResult(id) => Self::NoResult(id),
			SystemError::OperationInProgress(id) => Self::OperationInProgress(id),
		}
	}
}

/// Native file I/O error along with the path that caused it.
///
/// The `std::io::Error` is kept untouched as the source, so its kind can still tell
/// "not found" apart from "permission denied".
#[derive(Debug, Error)]
pub struct FileIOError {
	pub path: Box<StdPath>,
	#[source]
	pub source: std::io::Error,
	pub maybe_context: Option<&'static str>,
}

impl fmt::Display for FileIOError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "file I/O error")?;
		if let Some(context) = self.maybe_context {
			write!(f, " ({context})")?;
		}
		write!(f, ": {}; path: '{}'", self.source, self.path.display())
	}
}

impl<P: AsRef<StdPath>> From<(P, std::io::Error)> for FileIOError {
	fn from((path, source): (P, std::io::Error)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: None,
		}
	}
}

impl<P: AsRef<StdPath>> From<(P, std::io::Error, &'static str)> for FileIOError {
	fn from((path, source, context): (P, std::io::Error, &'static str)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: Some(context),
		}
	}
}

impl FileIOError {
	#[must_use]
	pub fn kind(&self) -> std::io::ErrorKind {
		self.source.kind()
	}
}
