use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier the filesystem hands out for every resolved entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A resolved entry of the distributed filesystem.
///
/// Nodes are cheap tokens: holding one does not pin any storage, and a node whose
/// entry was removed is reported as stale by every operation taking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node {
	id: NodeId,
}

impl Node {
	#[must_use]
	pub const fn new(id: NodeId) -> Self {
		Self { id }
	}

	#[must_use]
	pub const fn id(&self) -> NodeId {
		self.id
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
	File,
	Exec,
	Dir,
	Sym,
}

impl EntryType {
	#[must_use]
	pub const fn is_dir(self) -> bool {
		matches!(self, Self::Dir)
	}

	/// Regular files, executable or not, are the only entries with byte contents.
	#[must_use]
	pub const fn has_contents(self) -> bool {
		matches!(self, Self::File | Self::Exec)
	}
}

/// Metadata of a single entry as reported by the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
	pub entry_type: EntryType,
	pub size: u64,
	pub mtime: DateTime<Utc>,
	pub writable: bool,
}

/// Who a top-level folder is shared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TlfVisibility {
	Private,
	Public,
	Team,
}

impl TlfVisibility {
	pub const ALL: [Self; 3] = [Self::Private, Self::Public, Self::Team];

	/// The path segment naming this visibility, e.g. `private` in `/private/alice`.
	#[must_use]
	pub const fn as_segment(self) -> &'static str {
		match self {
			Self::Private => "private",
			Self::Public => "public",
			Self::Team => "team",
		}
	}

	#[must_use]
	pub fn from_segment(segment: &str) -> Option<Self> {
		Self::ALL
			.into_iter()
			.find(|visibility| visibility.as_segment() == segment)
	}
}

impl fmt::Display for TlfVisibility {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_segment())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Favorite {
	pub name: String,
	pub visibility: TlfVisibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	pub username: String,
}
