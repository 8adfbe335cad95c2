use std::collections::HashMap;

use async_trait::async_trait;

use super::{
	error::Error,
	types::{EntryInfo, Favorite, Node, Session, TlfVisibility},
};

/// The storage operations SimpleFS delegates to the distributed filesystem.
///
/// Encryption, chunking, replication and folder identity checks all happen behind
/// this trait; callers only ever see nodes, names and bytes.
#[async_trait]
pub trait RemoteFs: Send + Sync + 'static {
	/// The logged in user, if any.
	async fn current_session(&self) -> Result<Option<Session>, Error>;

	async fn favorites(&self) -> Result<Vec<Favorite>, Error>;

	async fn delete_favorite(&self, favorite: &Favorite) -> Result<(), Error>;

	/// Returns the root directory of a top-level folder, creating the folder if
	/// this is the first time anyone touches it.
	async fn root_node(&self, tlf_name: &str, visibility: TlfVisibility) -> Result<Node, Error>;

	async fn lookup(&self, parent: &Node, name: &str) -> Result<(Node, EntryInfo), Error>;

	async fn create_file(
		&self,
		parent: &Node,
		name: &str,
		executable: bool,
	) -> Result<(Node, EntryInfo), Error>;

	async fn create_dir(&self, parent: &Node, name: &str) -> Result<(Node, EntryInfo), Error>;

	async fn children(&self, dir: &Node) -> Result<HashMap<String, EntryInfo>, Error>;

	async fn stat(&self, node: &Node) -> Result<EntryInfo, Error>;

	/// Reads up to `buf.len()` bytes starting at `offset`, returning how many were
	/// read. Zero means end of file.
	async fn read(&self, file: &Node, buf: &mut [u8], offset: u64) -> Result<usize, Error>;

	async fn write(&self, file: &Node, data: &[u8], offset: u64) -> Result<(), Error>;

	async fn truncate(&self, file: &Node, size: u64) -> Result<(), Error>;

	async fn rename(
		&self,
		src_parent: &Node,
		src_name: &str,
		dest_parent: &Node,
		dest_name: &str,
	) -> Result<(), Error>;

	async fn remove_entry(&self, parent: &Node, name: &str) -> Result<(), Error>;

	async fn remove_dir(&self, parent: &Node, name: &str) -> Result<(), Error>;

	async fn set_executable(&self, file: &Node, executable: bool) -> Result<(), Error>;

	/// Flushes any buffered writes of `node` to storage.
	async fn sync(&self, node: &Node) -> Result<(), Error>;
}
