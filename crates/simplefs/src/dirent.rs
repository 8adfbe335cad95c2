use sfs_remote_fs::{EntryInfo, EntryType};

use std::fs::Metadata;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirentType {
	File,
	Exec,
	Dir,
	Sym,
}

impl DirentType {
	#[must_use]
	pub const fn is_dir(self) -> bool {
		matches!(self, Self::Dir)
	}

	#[must_use]
	pub const fn has_contents(self) -> bool {
		matches!(self, Self::File | Self::Exec)
	}
}

impl From<EntryType> for DirentType {
	fn from(entry_type: EntryType) -> Self {
		match entry_type {
			EntryType::File => Self::File,
			EntryType::Exec => Self::Exec,
			EntryType::Dir => Self::Dir,
			EntryType::Sym => Self::Sym,
		}
	}
}

impl From<&Metadata> for DirentType {
	fn from(metadata: &Metadata) -> Self {
		let file_type = metadata.file_type();
		if file_type.is_symlink() {
			Self::Sym
		} else if file_type.is_dir() {
			Self::Dir
		} else if is_executable(metadata) {
			Self::Exec
		} else {
			Self::File
		}
	}
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
	use std::os::unix::fs::PermissionsExt;

	metadata.permissions().mode() & 0o100 != 0
}

#[cfg(not(unix))]
const fn is_executable(_: &Metadata) -> bool {
	false
}

/// One entry as the protocol reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
	pub name: String,
	pub size: u64,
	pub modified: DateTime<Utc>,
	pub dirent_type: DirentType,
	pub writable: bool,
}

impl DirEntry {
	pub fn from_info(name: impl Into<String>, info: &EntryInfo) -> Self {
		Self {
			name: name.into(),
			size: info.size,
			modified: info.mtime,
			dirent_type: info.entry_type.into(),
			writable: info.writable,
		}
	}

	pub fn from_metadata(name: impl Into<String>, metadata: &Metadata) -> Self {
		Self {
			name: name.into(),
			size: metadata.len(),
			modified: metadata
				.modified()
				.map(DateTime::<Utc>::from)
				.unwrap_or_default(),
			dirent_type: metadata.into(),
			writable: !metadata.permissions().readonly(),
		}
	}

	/// A directory with no metadata of its own, like the visibility folders of `/`.
	pub(crate) fn synthetic_dir(name: impl Into<String>, writable: bool) -> Self {
		Self {
			name: name.into(),
			size: 0,
			modified: DateTime::default(),
			dirent_type: DirentType::Dir,
			writable,
		}
	}
}

/// Which children a listing leaves out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListFilter {
	#[default]
	NoFilter,
	/// Everything starting with a dot.
	FilterAllHidden,
	/// Only the clutter operating systems leave behind.
	FilterSystemHidden,
}

const SYSTEM_HIDDEN: [&str; 3] = [".Trashes", ".fseventsd", ".DS_Store"];

impl ListFilter {
	#[must_use]
	pub fn admits(self, name: &str) -> bool {
		match self {
			Self::NoFilter => true,
			Self::FilterAllHidden => !name.starts_with('.'),
			Self::FilterSystemHidden => !(SYSTEM_HIDDEN.contains(&name) || name.starts_with("._")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filters() {
		let names = [".git", ".DS_Store", "._resource", "notes.txt", ".fseventsd"];

		let admitted = |filter: ListFilter| {
			names
				.into_iter()
				.filter(|name| filter.admits(name))
				.collect::<Vec<_>>()
		};

		assert_eq!(admitted(ListFilter::NoFilter), names);
		assert_eq!(admitted(ListFilter::FilterAllHidden), ["notes.txt"]);
		assert_eq!(
			admitted(ListFilter::FilterSystemHidden),
			[".git", "notes.txt"]
		);
	}

	#[test]
	fn remote_info_keeps_its_metadata() {
		let mtime = Utc::now();
		let entry = DirEntry::from_info(
			"run.sh",
			&EntryInfo {
				entry_type: EntryType::Exec,
				size: 12,
				mtime,
				writable: true,
			},
		);

		assert_eq!(entry.name, "run.sh");
		assert_eq!(entry.size, 12);
		assert_eq!(entry.modified, mtime);
		assert_eq!(entry.dirent_type, DirentType::Exec);
		assert!(entry.writable);
	}
}
