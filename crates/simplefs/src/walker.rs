use sfs_op_system::{Interrupter, ProgressTracker};
use sfs_remote_fs::{Favorite, Node, TlfVisibility};

use std::sync::Arc;

use futures::future::try_join;
use tokio::fs;
use tracing::{debug, trace, warn};

use super::{
	config::SimpleFsConfig,
	dirent::{DirEntry, DirentType, ListFilter},
	error::{Error, FileIOError},
	io::{open_path, OpenFlags, PathIo},
	path::{Path, RemoteLocation},
	resolver::Resolver,
};

/// Runs the tree algorithms of a single operation.
///
/// Trees are walked with explicit stacks, never by recursing, and every popped entry is
/// a point where a cancellation is noticed.
pub(crate) struct Walker {
	resolver: Resolver,
	config: Arc<SimpleFsConfig>,
	interrupter: Interrupter,
	progress: ProgressTracker,
}

impl Walker {
	pub(crate) const fn new(
		resolver: Resolver,
		config: Arc<SimpleFsConfig>,
		interrupter: Interrupter,
		progress: ProgressTracker,
	) -> Self {
		Self {
			resolver,
			config,
			interrupter,
			progress,
		}
	}

	pub(crate) const fn progress(&self) -> &ProgressTracker {
		&self.progress
	}

	async fn open(
		&self,
		path: &Path,
		flags: OpenFlags,
		like: Option<DirentType>,
	) -> Result<Box<dyn PathIo>, Error> {
		open_path(&self.resolver, &self.config, path, flags, like).await
	}

	/// Opens `src` for reading and `dest` for writing an entry of the same type.
	async fn open_pair(
		&self,
		src: &Path,
		dest: &Path,
	) -> Result<(Box<dyn PathIo>, Box<dyn PathIo>), Error> {
		let mut src_io = self
			.open(src, OpenFlags::READ | OpenFlags::EXISTING, None)
			.await?;

		match self
			.open(
				dest,
				OpenFlags::WRITE | OpenFlags::REPLACE,
				Some(src_io.entry_type()),
			)
			.await
		{
			Ok(dest_io) => Ok((src_io, dest_io)),
			Err(e) => {
				if let Err(close_err) = src_io.close().await {
					warn!(%src, %close_err, "Failed to close copy source");
				}
				Err(e)
			}
		}
	}

	pub(crate) async fn stat(&self, path: &Path) -> Result<DirEntry, Error> {
		match path {
			Path::Local(local) => {
				let metadata = fs::metadata(local)
					.await
					.map_err(|e| FileIOError::from((local, e)))?;
				let name = local
					.file_name()
					.map(|name| name.to_string_lossy().into_owned())
					.unwrap_or_default();

				Ok(DirEntry::from_metadata(name, &metadata))
			}

			Path::Remote(_) => match path.remote_location()? {
				RemoteLocation::Root => Ok(DirEntry::synthetic_dir("/", false)),
				RemoteLocation::Favorites(visibility) => {
					Ok(DirEntry::synthetic_dir(visibility.as_segment(), false))
				}
				RemoteLocation::Tlf(tlf_path) => {
					let (_, info) = self.resolver.node(&tlf_path).await?;
					let name = tlf_path.segments.last().unwrap_or(&tlf_path.tlf);

					Ok(DirEntry::from_info(name.as_str(), &info))
				}
			},
		}
	}

	async fn children(&self, dir: &Path) -> Result<Vec<DirEntry>, Error> {
		let mut io = self
			.open(dir, OpenFlags::READ | OpenFlags::EXISTING, None)
			.await?;
		let res = io.children().await;
		let closed = io.close().await;

		let children = res?;
		closed?;

		Ok(children)
	}

	/// Lists `path`, expanding directories down to `depth` levels below it, or the whole
	/// tree with no depth.
	///
	/// Nested entries are named by their path relative to `path`. A path to anything but
	/// a directory lists just that entry.
	pub(crate) async fn list(
		&self,
		path: &Path,
		filter: ListFilter,
		depth: Option<usize>,
	) -> Result<Vec<DirEntry>, Error> {
		if path.is_remote() {
			match path.remote_location()? {
				RemoteLocation::Root => {
					return Ok(TlfVisibility::ALL
						.into_iter()
						.map(|visibility| DirEntry::synthetic_dir(visibility.as_segment(), false))
						.collect());
				}
				RemoteLocation::Favorites(visibility) => {
					return self.resolver.favorites(visibility).await;
				}
				RemoteLocation::Tlf(_) => {}
			}
		}

		let top = self.stat(path).await?;
		if !top.dirent_type.is_dir() {
			self.progress.add_read(0, 1);
			return Ok(vec![top]);
		}

		let mut entries = vec![];
		let mut pending = vec![(path.clone(), String::new(), 0)];

		while let Some((dir, prefix, level)) = pending.pop() {
			self.interrupter.check()?;

			let mut children = self.children(&dir).await?;
			children.retain(|child| filter.admits(&child.name));

			for mut child in children {
				let relative = if prefix.is_empty() {
					child.name.clone()
				} else {
					format!("{prefix}/{}", child.name)
				};

				if child.dirent_type.is_dir() && depth.map_or(true, |depth| level < depth) {
					pending.push((dir.join(&child.name), relative.clone(), level + 1));
				}

				child.name = relative;
				self.progress.add_read(0, 1);
				entries.push(child);
			}
		}

		entries.sort_by(|a, b| a.name.cmp(&b.name));

		Ok(entries)
	}

	async fn copy_stream(&self, src: &mut dyn PathIo, dest: &mut dyn PathIo) -> Result<(), Error> {
		let mut buf = vec![0; self.config.copy_buffer_size];

		loop {
			self.interrupter.check()?;

			let n = src.read(&mut buf).await?;
			if n == 0 {
				break;
			}
			self.progress.add_read(n as u64, 0);

			dest.write(&buf[..n]).await?;
			self.progress.add_written(n as u64, 0);
		}

		self.progress.add_read(0, 1);
		self.progress.add_written(0, 1);

		Ok(())
	}

	/// Copies a single entry, a directory source only creates the destination directory.
	pub(crate) async fn copy(&self, src: &Path, dest: &Path) -> Result<(), Error> {
		ensure_outside(src, dest)?;

		let (mut src_io, mut dest_io) = self.open_pair(src, dest).await?;
		self.progress.set_totals(src_io.size(), 1);

		let res = if src_io.entry_type().has_contents() {
			self.copy_stream(&mut *src_io, &mut *dest_io).await
		} else {
			Ok(())
		};

		close_pair(res, src_io, dest_io).await
	}

	pub(crate) async fn copy_recursive(&self, src: &Path, dest: &Path) -> Result<(), Error> {
		ensure_outside(src, dest)?;

		let (bytes, files) = self.count(src).await?;
		self.progress.set_totals(bytes, files);

		let mut pending = vec![(src.clone(), dest.clone())];

		while let Some((src, dest)) = pending.pop() {
			self.interrupter.check()?;

			let (mut src_io, mut dest_io) = self.open_pair(&src, &dest).await?;
			let entry_type = src_io.entry_type();

			let res = if entry_type.has_contents() {
				self.copy_stream(&mut *src_io, &mut *dest_io)
					.await
					.map(|()| vec![])
			} else if entry_type.is_dir() {
				src_io.children().await
			} else {
				debug!(%src, "Not copying symlink");
				Ok(vec![])
			};

			let mut children = close_pair(res, src_io, dest_io).await?;
			children.retain(|child| {
				if child.dirent_type == DirentType::Sym {
					debug!(%src, name = %child.name, "Not copying symlink");
					return false;
				}
				true
			});
			children.sort_by(|a, b| b.name.cmp(&a.name));

			pending.extend(
				children
					.into_iter()
					.map(|child| (src.join(&child.name), dest.join(&child.name))),
			);
		}

		Ok(())
	}

	/// Bytes and regular files below `path`, or of `path` itself if it's a file.
	async fn count(&self, path: &Path) -> Result<(u64, u64), Error> {
		let top = self.stat(path).await?;
		if !top.dirent_type.is_dir() {
			return Ok((top.size, u64::from(top.dirent_type.has_contents())));
		}

		let (mut bytes, mut files) = (0, 0);
		let mut pending = vec![path.clone()];

		while let Some(dir) = pending.pop() {
			self.interrupter.check()?;

			for child in self.children(&dir).await? {
				if child.dirent_type.is_dir() {
					pending.push(dir.join(&child.name));
				} else if child.dirent_type.has_contents() {
					bytes += child.size;
					files += 1;
				}
			}
		}

		trace!(%path, bytes, files, "Counted tree");

		Ok((bytes, files))
	}

	pub(crate) async fn remove(&self, path: &Path, recursive: bool) -> Result<(), Error> {
		match path {
			Path::Local(local) => {
				let metadata = fs::symlink_metadata(local)
					.await
					.map_err(|e| FileIOError::from((local, e)))?;

				let res = if !metadata.is_dir() {
					fs::remove_file(local).await
				} else if recursive {
					fs::remove_dir_all(local).await
				} else {
					fs::remove_dir(local).await
				};
				res.map_err(|e| FileIOError::from((local, e, "Failed to remove")))?;
				self.progress.add_written(0, 1);

				Ok(())
			}

			Path::Remote(_) => self.remove_remote(path, recursive).await,
		}
	}

	async fn remove_remote(&self, path: &Path, recursive: bool) -> Result<(), Error> {
		let tlf_path = path.tlf_path()?;
		let fs = self.resolver.fs();

		if tlf_path.is_tlf_root() {
			if recursive {
				return Err(Error::CannotDeleteTlfRecursively(path.clone()));
			}

			debug!(%path, "Removing top-level folder from favorites");
			return Ok(fs
				.delete_favorite(&Favorite {
					name: tlf_path.tlf,
					visibility: tlf_path.visibility,
				})
				.await?);
		}

		let (parent, leaf) = self.resolver.parent_and_leaf(path).await?;
		let (node, info) = fs.lookup(&parent, &leaf).await?;

		if !recursive || !info.entry_type.is_dir() {
			return self.remove_entry(&parent, &leaf, info.entry_type.is_dir()).await;
		}

		// Pre-order first, then removing in reverse takes children out before their parent
		let mut pending = vec![(node, parent, leaf, true)];
		let mut doomed = vec![];

		while let Some((node, parent, name, is_dir)) = pending.pop() {
			self.interrupter.check()?;

			if is_dir {
				for (child, child_info) in fs.children(&node).await? {
					let (child_node, _) = fs.lookup(&node, &child).await?;
					pending.push((child_node, node, child, child_info.entry_type.is_dir()));
				}
			}

			doomed.push((parent, name, is_dir));
		}

		while let Some((parent, name, is_dir)) = doomed.pop() {
			self.interrupter.check()?;
			self.remove_entry(&parent, &name, is_dir).await?;
		}

		Ok(())
	}

	async fn remove_entry(&self, parent: &Node, name: &str, is_dir: bool) -> Result<(), Error> {
		let fs = self.resolver.fs();
		if is_dir {
			fs.remove_dir(parent, name).await?;
		} else {
			fs.remove_entry(parent, name).await?;
		}
		self.progress.add_written(0, 1);

		Ok(())
	}

	/// Atomic rename between two entries of the distributed filesystem.
	pub(crate) async fn rename(&self, src: &Path, dest: &Path) -> Result<(), Error> {
		ensure_outside(src, dest)?;

		let ((src_parent, src_leaf), (dest_parent, dest_leaf)) = try_join(
			self.resolver.parent_and_leaf(src),
			self.resolver.parent_and_leaf(dest),
		)
		.await?;

		self.resolver
			.fs()
			.rename(&src_parent, &src_leaf, &dest_parent, &dest_leaf)
			.await?;

		Ok(())
	}

	/// Moves within one top-level folder are a rename. Anything else is a recursive copy
	/// followed by a recursive removal of the source, which is not atomic: if the process
	/// dies in between, both copies are left behind.
	pub(crate) async fn move_path(&self, src: &Path, dest: &Path) -> Result<(), Error> {
		ensure_outside(src, dest)?;

		if src.is_remote() && dest.is_remote() {
			let (src_tlf, dest_tlf) = (src.tlf_path()?, dest.tlf_path()?);
			if src_tlf.same_tlf(&dest_tlf) && !src_tlf.is_tlf_root() && !dest_tlf.is_tlf_root() {
				debug!(%src, %dest, "Moving inside one folder, renaming");
				self.progress.set_totals(0, 1);
				self.rename(src, dest).await?;
				self.progress.add_written(0, 1);
				return Ok(());
			}
		}

		self.copy_recursive(src, dest).await?;

		// A cancel arriving after the copy still leaves the source in place
		self.interrupter.check()?;

		self.remove(src, true).await
	}
}

/// Copying or moving a tree into itself never ends, or detaches it for good.
fn ensure_outside(src: &Path, dest: &Path) -> Result<(), Error> {
	if dest.is_within(src) {
		return Err(Error::BadArgument(format!(
			"destination {dest} is inside source {src}"
		)));
	}

	Ok(())
}

async fn close_pair<T>(
	res: Result<T, Error>,
	mut src: Box<dyn PathIo>,
	mut dest: Box<dyn PathIo>,
) -> Result<T, Error> {
	let src_closed = src.close().await;
	let dest_closed = dest.close().await;

	let out = res?;
	src_closed?;
	dest_closed?;

	Ok(out)
}
