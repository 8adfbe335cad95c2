use sfs_remote_fs::{EntryInfo, Node, RemoteFs, Session, TlfVisibility};

use std::sync::Arc;

use tracing::trace;

use super::{
	dirent::DirEntry,
	error::Error,
	path::{Path, TlfPath},
};

/// Turns remote paths into nodes of the distributed filesystem.
#[derive(Clone)]
pub(crate) struct Resolver {
	fs: Arc<dyn RemoteFs>,
}

impl Resolver {
	pub(crate) fn new(fs: Arc<dyn RemoteFs>) -> Self {
		Self { fs }
	}

	pub(crate) fn fs(&self) -> &dyn RemoteFs {
		&*self.fs
	}

	pub(crate) async fn root(&self, tlf_path: &TlfPath) -> Result<Node, Error> {
		Ok(self
			.fs
			.root_node(&tlf_path.tlf, tlf_path.visibility)
			.await?)
	}

	async fn walk(&self, mut node: Node, segments: &[String]) -> Result<(Node, Option<EntryInfo>), Error> {
		let mut info = None;
		for name in segments {
			let (child, child_info) = self.fs.lookup(&node, name).await?;
			node = child;
			info = Some(child_info);
		}

		Ok((node, info))
	}

	/// The node `tlf_path` points to, along with its metadata.
	pub(crate) async fn node(&self, tlf_path: &TlfPath) -> Result<(Node, EntryInfo), Error> {
		let root = self.root(tlf_path).await?;
		match self.walk(root, &tlf_path.segments).await? {
			(node, Some(info)) => Ok((node, info)),
			(root, None) => Ok((root, self.fs.stat(&root).await?)),
		}
	}

	/// The directory holding the last segment of `path` and that segment's name.
	pub(crate) async fn parent_and_leaf(&self, path: &Path) -> Result<(Node, String), Error> {
		let tlf_path = path.tlf_path()?;
		let Some((leaf, parents)) = tlf_path.segments.split_last() else {
			return Err(Error::InvalidRemotePath(path.to_string()));
		};

		let root = self.root(&tlf_path).await?;
		let (parent, _) = self.walk(root, parents).await?;

		Ok((parent, leaf.clone()))
	}

	/// One directory per favorite folder of the given visibility.
	pub(crate) async fn favorites(&self, visibility: TlfVisibility) -> Result<Vec<DirEntry>, Error> {
		let Some(session) = self.fs.current_session().await? else {
			trace!("Nobody is logged in, so there are no favorites");
			return Ok(vec![]);
		};

		let mut entries = self
			.fs
			.favorites()
			.await?
			.into_iter()
			.filter(|favorite| favorite.visibility == visibility)
			.map(|favorite| {
				let writable = is_writer(&session, &favorite.name);
				DirEntry::synthetic_dir(favorite.name, writable)
			})
			.collect::<Vec<_>>();
		entries.sort_by(|a, b| a.name.cmp(&b.name));

		Ok(entries)
	}
}

/// The writers of a folder are the comma separated names before the `#` introducing
/// its readers.
fn is_writer(session: &Session, tlf_name: &str) -> bool {
	tlf_name
		.split('#')
		.next()
		.unwrap_or_default()
		.split(',')
		.any(|writer| writer == session.username)
}
