use std::{
	collections::{BTreeMap, HashMap},
	sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::trace;

use super::{
	error::Error,
	fs::RemoteFs,
	types::{EntryInfo, EntryType, Favorite, Node, NodeId, Session, TlfVisibility},
};

/// An in-process [`RemoteFs`] keeping every folder in memory.
///
/// It behaves like the real service where SimpleFS can observe it: folder roots
/// are created on first access and favorited, directories must be empty before
/// removal and nodes of removed entries turn stale.
#[derive(Debug, Default)]
pub struct MemoryFs {
	state: RwLock<State>,
	syncs: AtomicU64,
}

#[derive(Debug, Default)]
struct State {
	session: Option<Session>,
	next_id: u64,
	inodes: HashMap<NodeId, Inode>,
	roots: HashMap<(TlfVisibility, String), NodeId>,
	favorites: Vec<Favorite>,
}

#[derive(Debug)]
struct Inode {
	kind: InodeKind,
	mtime: DateTime<Utc>,
	writable: bool,
}

#[derive(Debug)]
enum InodeKind {
	Dir(BTreeMap<String, NodeId>),
	File { data: Vec<u8>, executable: bool },
}

impl Inode {
	fn info(&self) -> EntryInfo {
		let (entry_type, size) = match &self.kind {
			InodeKind::Dir(_) => (EntryType::Dir, 0),
			InodeKind::File { data, executable } => (
				if *executable {
					EntryType::Exec
				} else {
					EntryType::File
				},
				data.len() as u64,
			),
		};

		EntryInfo {
			entry_type,
			size,
			mtime: self.mtime,
			writable: self.writable,
		}
	}
}

impl MemoryFs {
	/// A filesystem with nobody logged in.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// A filesystem where `username` is the logged in user.
	#[must_use]
	pub fn with_user(username: impl Into<String>) -> Self {
		Self {
			state: RwLock::new(State {
				session: Some(Session {
					username: username.into(),
				}),
				..Default::default()
			}),
			syncs: AtomicU64::new(0),
		}
	}

	/// Files can't grow past this many bytes, writes and truncations beyond it fail with
	/// [`Error::FileTooLarge`].
	pub const MAX_FILE_SIZE: u64 = 1 << 30;

	/// How many times [`RemoteFs::sync`] succeeded so far.
	pub fn sync_count(&self) -> u64 {
		self.syncs.load(Ordering::Acquire)
	}
}

/// Writers of a folder are the comma separated names before an optional `#`,
/// which introduces the readers.
fn is_writer(session: Option<&Session>, tlf_name: &str) -> bool {
	session.is_some_and(|Session { username }| {
		tlf_name
			.split('#')
			.next()
			.unwrap_or_default()
			.split(',')
			.any(|writer| writer == username)
	})
}

fn checked_size(size: u64) -> Result<usize, Error> {
	if size > MemoryFs::MAX_FILE_SIZE {
		return Err(Error::FileTooLarge(size));
	}

	usize::try_from(size).map_err(|_| Error::FileTooLarge(size))
}

impl State {
	fn alloc(&mut self, kind: InodeKind, writable: bool) -> NodeId {
		self.next_id += 1;
		let id = NodeId(self.next_id);
		self.inodes.insert(
			id,
			Inode {
				kind,
				mtime: Utc::now(),
				writable,
			},
		);

		id
	}

	fn inode(&self, node: &Node) -> Result<&Inode, Error> {
		self.inodes
			.get(&node.id())
			.ok_or(Error::StaleNode(node.id()))
	}

	fn inode_mut(&mut self, node: &Node) -> Result<&mut Inode, Error> {
		self.inodes
			.get_mut(&node.id())
			.ok_or(Error::StaleNode(node.id()))
	}

	fn entries(&self, dir: &Node) -> Result<&BTreeMap<String, NodeId>, Error> {
		match &self.inode(dir)?.kind {
			InodeKind::Dir(entries) => Ok(entries),
			InodeKind::File { .. } => Err(Error::NotADirectory(dir.id().to_string())),
		}
	}

	fn entries_mut(&mut self, dir: &Node) -> Result<&mut BTreeMap<String, NodeId>, Error> {
		let inode = self.inode_mut(dir)?;
		inode.mtime = Utc::now();
		match &mut inode.kind {
			InodeKind::Dir(entries) => Ok(entries),
			InodeKind::File { .. } => Err(Error::NotADirectory(dir.id().to_string())),
		}
	}

	fn child(&self, parent: &Node, name: &str) -> Result<NodeId, Error> {
		self.entries(parent)?
			.get(name)
			.copied()
			.ok_or_else(|| Error::NotFound(name.to_string()))
	}

	fn create(&mut self, parent: &Node, name: &str, kind: InodeKind) -> Result<(Node, EntryInfo), Error> {
		let writable = self.inode(parent)?.writable;
		if self.entries(parent)?.contains_key(name) {
			return Err(Error::AlreadyExists(name.to_string()));
		}

		let id = self.alloc(kind, writable);
		self.entries_mut(parent)?.insert(name.to_string(), id);

		Ok((Node::new(id), self.inodes[&id].info()))
	}

	fn file_mut(&mut self, file: &Node) -> Result<(&mut Vec<u8>, &mut DateTime<Utc>), Error> {
		let inode = self.inode_mut(file)?;
		match &mut inode.kind {
			InodeKind::File { data, .. } => Ok((data, &mut inode.mtime)),
			InodeKind::Dir(_) => Err(Error::IsADirectory(file.id().to_string())),
		}
	}

	/// Whether `node` is `ancestor` or lies anywhere below it.
	fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
		let mut pending = vec![ancestor];
		while let Some(id) = pending.pop() {
			if id == node {
				return true;
			}
			if let Some(Inode {
				kind: InodeKind::Dir(entries),
				..
			}) = self.inodes.get(&id)
			{
				pending.extend(entries.values().copied());
			}
		}

		false
	}

	/// Drops `id` and, for directories, every inode below it.
	fn forget(&mut self, id: NodeId) {
		let mut pending = vec![id];
		while let Some(id) = pending.pop() {
			if let Some(Inode {
				kind: InodeKind::Dir(entries),
				..
			}) = self.inodes.remove(&id)
			{
				pending.extend(entries.into_values());
			}
		}
	}
}

#[async_trait]
impl RemoteFs for MemoryFs {
	async fn current_session(&self) -> Result<Option<Session>, Error> {
		Ok(self.state.read().await.session.clone())
	}

	async fn favorites(&self) -> Result<Vec<Favorite>, Error> {
		Ok(self.state.read().await.favorites.clone())
	}

	async fn delete_favorite(&self, favorite: &Favorite) -> Result<(), Error> {
		self.state
			.write()
			.await
			.favorites
			.retain(|existing| existing != favorite);

		Ok(())
	}

	async fn root_node(&self, tlf_name: &str, visibility: TlfVisibility) -> Result<Node, Error> {
		if tlf_name.is_empty() || tlf_name.contains('/') {
			return Err(Error::InvalidTlfName(tlf_name.to_string()));
		}

		let mut state = self.state.write().await;
		let key = (visibility, tlf_name.to_string());
		if let Some(id) = state.roots.get(&key) {
			return Ok(Node::new(*id));
		}

		trace!(%visibility, tlf_name, "Creating top-level folder");
		let writable = is_writer(state.session.as_ref(), tlf_name);
		let id = state.alloc(InodeKind::Dir(BTreeMap::new()), writable);
		state.roots.insert(key, id);
		state.favorites.push(Favorite {
			name: tlf_name.to_string(),
			visibility,
		});

		Ok(Node::new(id))
	}

	async fn lookup(&self, parent: &Node, name: &str) -> Result<(Node, EntryInfo), Error> {
		let state = self.state.read().await;
		let id = state.child(parent, name)?;

		Ok((Node::new(id), state.inodes[&id].info()))
	}

	async fn create_file(
		&self,
		parent: &Node,
		name: &str,
		executable: bool,
	) -> Result<(Node, EntryInfo), Error> {
		self.state.write().await.create(
			parent,
			name,
			InodeKind::File {
				data: Vec::new(),
				executable,
			},
		)
	}

	async fn create_dir(&self, parent: &Node, name: &str) -> Result<(Node, EntryInfo), Error> {
		self.state
			.write()
			.await
			.create(parent, name, InodeKind::Dir(BTreeMap::new()))
	}

	async fn children(&self, dir: &Node) -> Result<HashMap<String, EntryInfo>, Error> {
		let state = self.state.read().await;

		Ok(state
			.entries(dir)?
			.iter()
			.map(|(name, id)| (name.clone(), state.inodes[id].info()))
			.collect())
	}

	async fn stat(&self, node: &Node) -> Result<EntryInfo, Error> {
		Ok(self.state.read().await.inode(node)?.info())
	}

	async fn read(&self, file: &Node, buf: &mut [u8], offset: u64) -> Result<usize, Error> {
		let state = self.state.read().await;
		let InodeKind::File { data, .. } = &state.inode(file)?.kind else {
			return Err(Error::IsADirectory(file.id().to_string()));
		};

		let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
		let n = buf.len().min(data.len() - start);
		buf[..n].copy_from_slice(&data[start..start + n]);

		Ok(n)
	}

	async fn write(&self, file: &Node, bytes: &[u8], offset: u64) -> Result<(), Error> {
		let mut state = self.state.write().await;
		let (data, mtime) = state.file_mut(file)?;

		let end = checked_size(offset.saturating_add(bytes.len() as u64))?;
		let start = end - bytes.len();
		if data.len() < end {
			data.resize(end, 0);
		}
		data[start..end].copy_from_slice(bytes);
		*mtime = Utc::now();

		Ok(())
	}

	async fn truncate(&self, file: &Node, size: u64) -> Result<(), Error> {
		let mut state = self.state.write().await;
		let (data, mtime) = state.file_mut(file)?;
		data.resize(checked_size(size)?, 0);
		*mtime = Utc::now();

		Ok(())
	}

	async fn rename(
		&self,
		src_parent: &Node,
		src_name: &str,
		dest_parent: &Node,
		dest_name: &str,
	) -> Result<(), Error> {
		let mut state = self.state.write().await;
		let src_id = state.child(src_parent, src_name)?;
		if state.is_within(dest_parent.id(), src_id) {
			return Err(Error::MoveIntoItself(src_name.to_string()));
		}

		let existing = state.entries(dest_parent)?.get(dest_name).copied();
		if let Some(existing) = existing {
			if existing == src_id {
				return Ok(());
			}

			let src_is_dir = matches!(state.inodes[&src_id].kind, InodeKind::Dir(_));
			match &state.inodes[&existing].kind {
				InodeKind::Dir(entries) if !entries.is_empty() => {
					return Err(Error::DirectoryNotEmpty(dest_name.to_string()));
				}
				InodeKind::Dir(_) if !src_is_dir => {
					return Err(Error::IsADirectory(dest_name.to_string()));
				}
				InodeKind::File { .. } if src_is_dir => {
					return Err(Error::NotADirectory(dest_name.to_string()));
				}
				_ => {}
			}

			state.forget(existing);
		}

		state.entries_mut(src_parent)?.remove(src_name);
		state
			.entries_mut(dest_parent)?
			.insert(dest_name.to_string(), src_id);

		Ok(())
	}

	async fn remove_entry(&self, parent: &Node, name: &str) -> Result<(), Error> {
		let mut state = self.state.write().await;
		let id = state.child(parent, name)?;
		if matches!(state.inodes[&id].kind, InodeKind::Dir(_)) {
			return Err(Error::IsADirectory(name.to_string()));
		}

		state.entries_mut(parent)?.remove(name);
		state.forget(id);

		Ok(())
	}

	async fn remove_dir(&self, parent: &Node, name: &str) -> Result<(), Error> {
		let mut state = self.state.write().await;
		let id = state.child(parent, name)?;
		match &state.inodes[&id].kind {
			InodeKind::File { .. } => return Err(Error::NotADirectory(name.to_string())),
			InodeKind::Dir(entries) if !entries.is_empty() => {
				return Err(Error::DirectoryNotEmpty(name.to_string()));
			}
			InodeKind::Dir(_) => {}
		}

		state.entries_mut(parent)?.remove(name);
		state.forget(id);

		Ok(())
	}

	async fn set_executable(&self, file: &Node, executable: bool) -> Result<(), Error> {
		let mut state = self.state.write().await;
		let inode = state.inode_mut(file)?;
		match &mut inode.kind {
			InodeKind::File {
				executable: current,
				..
			} => {
				*current = executable;
				inode.mtime = Utc::now();
				Ok(())
			}
			InodeKind::Dir(_) => Err(Error::IsADirectory(file.id().to_string())),
		}
	}

	async fn sync(&self, node: &Node) -> Result<(), Error> {
		self.state.read().await.inode(node)?;
		self.syncs.fetch_add(1, Ordering::AcqRel);

		Ok(())
	}
}
