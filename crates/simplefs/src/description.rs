use sfs_op_system::OpId;

use serde::{Deserialize, Serialize};

use super::{dirent::ListFilter, path::Path};

/// What a pending operation is doing, as reported by `get_ops`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OpDescription {
	List {
		op_id: OpId,
		path: Path,
		filter: ListFilter,
	},
	ListRecursive {
		op_id: OpId,
		path: Path,
		filter: ListFilter,
		/// `None` when the whole tree is listed.
		depth: Option<usize>,
	},
	Copy {
		op_id: OpId,
		src: Path,
		dest: Path,
	},
	CopyRecursive {
		op_id: OpId,
		src: Path,
		dest: Path,
	},
	Move {
		op_id: OpId,
		src: Path,
		dest: Path,
	},
	Remove {
		op_id: OpId,
		path: Path,
		recursive: bool,
	},
	Read {
		op_id: OpId,
		path: Path,
		offset: u64,
		size: usize,
	},
	Write {
		op_id: OpId,
		path: Path,
		offset: u64,
	},
}

impl OpDescription {
	#[must_use]
	pub const fn op_id(&self) -> OpId {
		match self {
			Self::List { op_id, .. }
			| Self::ListRecursive { op_id, .. }
			| Self::Copy { op_id, .. }
			| Self::CopyRecursive { op_id, .. }
			| Self::Move { op_id, .. }
			| Self::Remove { op_id, .. }
			| Self::Read { op_id, .. }
			| Self::Write { op_id, .. } => *op_id,
		}
	}
}
