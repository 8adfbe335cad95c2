#![allow(dead_code)]

use sfs_core::{DirEntry, Error, ListFilter, OpenFlags, Path, SimpleFs, SimpleFsConfig};
use sfs_remote_fs::{EntryInfo, Favorite, MemoryFs, Node, RemoteFs, Session, TlfVisibility};

use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

pub const USER: &str = "alice";

/// A SimpleFS over an in-memory filesystem where [`USER`] is logged in.
pub fn simplefs() -> (SimpleFs, Arc<MemoryFs>) {
	simplefs_with(SimpleFsConfig::default())
}

pub fn simplefs_with(config: SimpleFsConfig) -> (SimpleFs, Arc<MemoryFs>) {
	let fs = Arc::new(MemoryFs::with_user(USER));
	let simplefs = SimpleFs::new(fs.clone(), config).unwrap();
	(simplefs, fs)
}

/// A SimpleFS whose writes can be held at a chosen point, see [`GatedFs::arm`].
pub fn gated_simplefs(config: SimpleFsConfig) -> (SimpleFs, Arc<GatedFs>) {
	let fs = Arc::new(GatedFs::new(MemoryFs::with_user(USER)));
	let simplefs = SimpleFs::new(fs.clone(), config).unwrap();
	(simplefs, fs)
}

/// An in-memory filesystem that can hold one write until the test lets it go.
pub struct GatedFs {
	inner: MemoryFs,
	writes: AtomicUsize,
	hold_at: AtomicUsize,
	holding: Notify,
	release: Semaphore,
}

impl GatedFs {
	fn new(inner: MemoryFs) -> Self {
		Self {
			inner,
			writes: AtomicUsize::new(0),
			hold_at: AtomicUsize::new(usize::MAX),
			holding: Notify::new(),
			release: Semaphore::new(0),
		}
	}

	/// Holds the `nth` write from now on, counting from 1.
	pub fn arm(&self, nth: usize) {
		let writes = self.writes.load(Ordering::SeqCst);
		self.hold_at.store(writes + nth, Ordering::SeqCst);
	}

	/// Resolves once the armed write is being held.
	pub async fn holding(&self) {
		self.holding.notified().await;
	}

	pub fn release(&self) {
		self.release.add_permits(1);
	}

	pub fn writes(&self) -> usize {
		self.writes.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl RemoteFs for GatedFs {
	async fn current_session(&self) -> Result<Option<Session>, sfs_remote_fs::Error> {
		self.inner.current_session().await
	}

	async fn favorites(&self) -> Result<Vec<Favorite>, sfs_remote_fs::Error> {
		self.inner.favorites().await
	}

	async fn delete_favorite(&self, favorite: &Favorite) -> Result<(), sfs_remote_fs::Error> {
		self.inner.delete_favorite(favorite).await
	}

	async fn root_node(
		&self,
		tlf_name: &str,
		visibility: TlfVisibility,
	) -> Result<Node, sfs_remote_fs::Error> {
		self.inner.root_node(tlf_name, visibility).await
	}

	async fn lookup(&self, parent: &Node, name: &str) -> Result<(Node, EntryInfo), sfs_remote_fs::Error> {
		self.inner.lookup(parent, name).await
	}

	async fn create_file(
		&self,
		parent: &Node,
		name: &str,
		executable: bool,
	) -> Result<(Node, EntryInfo), sfs_remote_fs::Error> {
		self.inner.create_file(parent, name, executable).await
	}

	async fn create_dir(
		&self,
		parent: &Node,
		name: &str,
	) -> Result<(Node, EntryInfo), sfs_remote_fs::Error> {
		self.inner.create_dir(parent, name).await
	}

	async fn children(&self, dir: &Node) -> Result<HashMap<String, EntryInfo>, sfs_remote_fs::Error> {
		self.inner.children(dir).await
	}

	async fn stat(&self, node: &Node) -> Result<EntryInfo, sfs_remote_fs::Error> {
		self.inner.stat(node).await
	}

	async fn read(&self, file: &Node, buf: &mut [u8], offset: u64) -> Result<usize, sfs_remote_fs::Error> {
		self.inner.read(file, buf, offset).await
	}

	async fn write(&self, file: &Node, data: &[u8], offset: u64) -> Result<(), sfs_remote_fs::Error> {
		let nth = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
		if nth == self.hold_at.load(Ordering::SeqCst) {
			self.holding.notify_one();
			self.release.acquire().await.unwrap().forget();
		}

		self.inner.write(file, data, offset).await
	}

	async fn truncate(&self, file: &Node, size: u64) -> Result<(), sfs_remote_fs::Error> {
		self.inner.truncate(file, size).await
	}

	async fn rename(
		&self,
		src_parent: &Node,
		src_name: &str,
		dest_parent: &Node,
		dest_name: &str,
	) -> Result<(), sfs_remote_fs::Error> {
		self.inner
			.rename(src_parent, src_name, dest_parent, dest_name)
			.await
	}

	async fn remove_entry(&self, parent: &Node, name: &str) -> Result<(), sfs_remote_fs::Error> {
		self.inner.remove_entry(parent, name).await
	}

	async fn remove_dir(&self, parent: &Node, name: &str) -> Result<(), sfs_remote_fs::Error> {
		self.inner.remove_dir(parent, name).await
	}

	async fn set_executable(&self, file: &Node, executable: bool) -> Result<(), sfs_remote_fs::Error> {
		self.inner.set_executable(file, executable).await
	}

	async fn sync(&self, node: &Node) -> Result<(), sfs_remote_fs::Error> {
		self.inner.sync(node).await
	}
}

pub fn home(rest: &str) -> Path {
	Path::remote(format!("/private/{USER}/{rest}"))
}

pub async fn mkdir(simplefs: &SimpleFs, path: Path) {
	let id = simplefs.make_op_id();
	simplefs
		.open(id, path, OpenFlags::WRITE | OpenFlags::DIRECTORY)
		.await
		.unwrap();
	simplefs.close(id).await.unwrap();
}

pub async fn write_file(simplefs: &SimpleFs, path: Path, data: &[u8]) {
	let id = simplefs.make_op_id();
	simplefs
		.open(id, path, OpenFlags::WRITE | OpenFlags::REPLACE)
		.await
		.unwrap();
	simplefs.write(id, 0, data).await.unwrap();
	simplefs.close(id).await.unwrap();
}

pub async fn read_file(simplefs: &SimpleFs, path: Path) -> Vec<u8> {
	let id = simplefs.make_op_id();
	simplefs
		.open(id, path, OpenFlags::READ | OpenFlags::EXISTING)
		.await
		.unwrap();

	let mut data = vec![];
	loop {
		let chunk = simplefs
			.read(id, data.len() as u64, 0)
			.await
			.unwrap();
		if chunk.is_empty() {
			break;
		}
		data.extend(chunk);
	}

	simplefs.close(id).await.unwrap();
	data
}

pub async fn list(simplefs: &SimpleFs, path: Path, filter: ListFilter) -> Result<Vec<DirEntry>, Error> {
	let id = simplefs.make_op_id();
	simplefs.list(id, path, filter)?;
	simplefs.wait(id).await?;
	let entries = simplefs.read_list(id)?;
	simplefs.close(id).await?;
	Ok(entries)
}

pub async fn list_recursive(simplefs: &SimpleFs, path: Path) -> Result<Vec<DirEntry>, Error> {
	let id = simplefs.make_op_id();
	simplefs.list_recursive(id, path, ListFilter::NoFilter)?;
	simplefs.wait(id).await?;
	let entries = simplefs.read_list(id)?;
	simplefs.close(id).await?;
	Ok(entries)
}

pub fn names(entries: &[DirEntry]) -> Vec<&str> {
	entries.iter().map(|entry| entry.name.as_str()).collect()
}
