use thiserror::Error;

use super::types::NodeId;

/// Failures reported by the distributed filesystem.
///
/// These are handed to protocol callers untouched, so each variant keeps enough
/// detail for a UI to tell "not found" apart from "permission denied" and friends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
	#[error("no such file or directory: <name='{0}'>")]
	NotFound(String),
	#[error("entry already exists: <name='{0}'>")]
	AlreadyExists(String),
	#[error("not a directory: <name='{0}'>")]
	NotADirectory(String),
	#[error("is a directory: <name='{0}'>")]
	IsADirectory(String),
	#[error("directory not empty: <name='{0}'>")]
	DirectoryNotEmpty(String),
	#[error("cannot move a directory below itself: <name='{0}'>")]
	MoveIntoItself(String),
	#[error("file would grow to {0} bytes, past what the filesystem can hold")]
	FileTooLarge(u64),
	#[error("invalid top-level folder name: <name='{0}'>")]
	InvalidTlfName(String),
	#[error("no user is logged in")]
	NotLoggedIn,
	#[error("node <id='{0}'> no longer exists")]
	StaleNode(NodeId),
}
