use std::sync::Arc;

use tokio::sync::Mutex;

use super::{
	dirent::{DirEntry, DirentType},
	io::PathIo,
	path::Path,
};

/// Something an operation id holds on to between calls: an open file or directory, or
/// a listing waiting to be read.
#[derive(Clone)]
pub(crate) struct Handle {
	pub(crate) path: Path,
	pub(crate) open: Option<OpenEntry>,
	pub(crate) listing: Option<Vec<DirEntry>>,
}

#[derive(Clone)]
pub(crate) struct OpenEntry {
	pub(crate) entry_type: DirentType,
	// Reads and writes hold the lock across awaits, the registry lock can't be used for it
	pub(crate) io: Arc<Mutex<Box<dyn PathIo>>>,
}

impl Handle {
	pub(crate) fn opened(path: Path, io: Box<dyn PathIo>) -> Self {
		Self {
			path,
			open: Some(OpenEntry {
				entry_type: io.entry_type(),
				io: Arc::new(Mutex::new(io)),
			}),
			listing: None,
		}
	}

	pub(crate) const fn listed(path: Path, entries: Vec<DirEntry>) -> Self {
		Self {
			path,
			open: None,
			listing: Some(entries),
		}
	}
}
