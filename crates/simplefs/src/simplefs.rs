use sfs_op_system::{Interrupter, OpId, OpProgress, OpSystem, ProgressTracker};
use sfs_remote_fs::RemoteFs;

use std::{future::Future, sync::Arc};

use tracing::{debug, instrument, trace};

use super::{
	config::SimpleFsConfig,
	description::OpDescription,
	dirent::{DirEntry, DirentType, ListFilter},
	error::Error,
	handle::Handle,
	io::{open_path, OpenFlags},
	path::Path,
	resolver::Resolver,
	walker::Walker,
};

/// The SimpleFS request/response surface.
///
/// Long running requests (lists, copies, moves, removals) only register an operation and
/// return, the work goes on in the background until someone [`SimpleFs::wait`]s for it or
/// [`SimpleFs::cancel`]s it. Everything else runs on the caller's task.
///
/// Clones share the same registries.
#[derive(Clone)]
pub struct SimpleFs {
	resolver: Resolver,
	config: Arc<SimpleFsConfig>,
	ops: OpSystem<OpDescription, Handle, Error>,
}

impl SimpleFs {
	pub fn new(fs: Arc<dyn RemoteFs>, config: SimpleFsConfig) -> Result<Self, Error> {
		config.validate()?;

		Ok(Self {
			resolver: Resolver::new(fs),
			config: Arc::new(config),
			ops: OpSystem::new(),
		})
	}

	#[must_use]
	pub fn config(&self) -> &SimpleFsConfig {
		&self.config
	}

	fn walker(&self, interrupter: Interrupter, progress: ProgressTracker) -> Walker {
		Walker::new(
			self.resolver.clone(),
			Arc::clone(&self.config),
			interrupter,
			progress,
		)
	}

	/// A walker for requests answered right away, nothing can cancel it.
	fn inline_walker(&self) -> Walker {
		self.walker(Interrupter::never(), ProgressTracker::default())
	}

	fn start<W, Fut>(&self, description: OpDescription, work: W) -> Result<(), Error>
	where
		W: FnOnce(Walker) -> Fut,
		Fut: Future<Output = Result<(), Error>> + Send + 'static,
	{
		let id = description.op_id();
		let this = self.clone();

		self.ops.start(id, description, move |ctx| {
			work(this.walker(ctx.interrupter().clone(), ctx.progress().clone()))
		})?;

		Ok(())
	}

	#[must_use]
	pub fn make_op_id(&self) -> OpId {
		self.ops.make_op_id()
	}

	/// Starts listing the children of `path`, read them with [`SimpleFs::read_list`] once
	/// the operation is done.
	pub fn list(&self, id: OpId, path: Path, filter: ListFilter) -> Result<(), Error> {
		self.start_list(
			OpDescription::List {
				op_id: id,
				path: path.clone(),
				filter,
			},
			path,
			filter,
			Some(0),
		)
	}

	pub fn list_recursive(&self, id: OpId, path: Path, filter: ListFilter) -> Result<(), Error> {
		self.start_list(
			OpDescription::ListRecursive {
				op_id: id,
				path: path.clone(),
				filter,
				depth: None,
			},
			path,
			filter,
			None,
		)
	}

	/// Like [`SimpleFs::list_recursive`], but directories deeper than `depth` levels below
	/// `path` are listed and not expanded.
	pub fn list_recursive_to_depth(
		&self,
		id: OpId,
		path: Path,
		filter: ListFilter,
		depth: usize,
	) -> Result<(), Error> {
		self.start_list(
			OpDescription::ListRecursive {
				op_id: id,
				path: path.clone(),
				filter,
				depth: Some(depth),
			},
			path,
			filter,
			Some(depth),
		)
	}

	fn start_list(
		&self,
		description: OpDescription,
		path: Path,
		filter: ListFilter,
		depth: Option<usize>,
	) -> Result<(), Error> {
		let id = description.op_id();
		let ops = self.ops.clone();

		self.start(description, move |walker| async move {
			walker.progress().set_totals(0, 0);
			let entries = walker.list(&path, filter, depth).await?;
			trace!(%id, count = entries.len(), "Listing ready");
			ops.publish(id, Handle::listed(path, entries));

			Ok::<_, Error>(())
		})
	}

	/// Takes the listing a finished list operation left behind, only the first call gets it.
	pub fn read_list(&self, id: OpId) -> Result<Vec<DirEntry>, Error> {
		self.ops
			.with_handle(id, |handle| handle.listing.take())
			.ok()
			.flatten()
			.ok_or(Error::NoResult(id))
	}

	pub fn copy(&self, id: OpId, src: Path, dest: Path) -> Result<(), Error> {
		self.start(
			OpDescription::Copy {
				op_id: id,
				src: src.clone(),
				dest: dest.clone(),
			},
			move |walker| async move { walker.copy(&src, &dest).await },
		)
	}

	pub fn copy_recursive(&self, id: OpId, src: Path, dest: Path) -> Result<(), Error> {
		self.start(
			OpDescription::CopyRecursive {
				op_id: id,
				src: src.clone(),
				dest: dest.clone(),
			},
			move |walker| async move { walker.copy_recursive(&src, &dest).await },
		)
	}

	pub fn move_path(&self, id: OpId, src: Path, dest: Path) -> Result<(), Error> {
		self.start(
			OpDescription::Move {
				op_id: id,
				src: src.clone(),
				dest: dest.clone(),
			},
			move |walker| async move { walker.move_path(&src, &dest).await },
		)
	}

	pub fn remove(&self, id: OpId, path: Path, recursive: bool) -> Result<(), Error> {
		self.start(
			OpDescription::Remove {
				op_id: id,
				path: path.clone(),
				recursive,
			},
			move |walker| async move {
				walker.progress().set_totals(0, 0);
				walker.remove(&path, recursive).await
			},
		)
	}

	#[instrument(skip(self), err)]
	pub async fn rename(&self, src: Path, dest: Path) -> Result<(), Error> {
		self.inline_walker().rename(&src, &dest).await
	}

	/// Opens or creates `path` and keeps it open under `id` until [`SimpleFs::close`].
	#[instrument(skip(self), err)]
	pub async fn open(&self, id: OpId, path: Path, flags: OpenFlags) -> Result<(), Error> {
		let flags = flags.validated()?;
		let io = open_path(&self.resolver, &self.config, &path, flags, None).await?;

		if self.ops.insert_handle(id, Handle::opened(path, io)).is_some() {
			debug!(%id, "Replaced a handle that was never closed");
		}

		Ok(())
	}

	/// Sets the executable bit for [`DirentType::Exec`] and clears it for
	/// [`DirentType::File`], other types leave the entry alone.
	#[instrument(skip(self), err)]
	pub async fn set_stat(&self, path: Path, flag: DirentType) -> Result<(), Error> {
		let tlf_path = path.tlf_path()?;
		let (node, _) = self.resolver.node(&tlf_path).await?;

		let executable = match flag {
			DirentType::Exec => true,
			DirentType::File => false,
			DirentType::Dir | DirentType::Sym => {
				trace!(?flag, "Nothing to set");
				return Ok(());
			}
		};

		self.resolver
			.fs()
			.set_executable(&node, executable)
			.await
			.map_err(Into::into)
	}

	/// Reads at most `size` bytes at `offset` of the file open under `id`, fewer at the end
	/// of the file. A zero size reads up to the configured default.
	#[instrument(skip(self), err)]
	pub async fn read(&self, id: OpId, offset: u64, size: usize) -> Result<Vec<u8>, Error> {
		let handle = self.ops.handle(id)?;
		let open = handle
			.open
			.filter(|open| open.entry_type.has_contents())
			.ok_or(Error::NotOpenForIo(id))?;

		let size = if size == 0 {
			self.config.default_read_size
		} else {
			size
		};

		let tracked = self.ops.begin_tracked(
			id,
			OpDescription::Read {
				op_id: id,
				path: handle.path,
				offset,
				size,
			},
		)?;
		tracked.progress().set_totals(size as u64, 1);

		let res = async {
			let mut io = open.io.lock().await;
			io.seek(offset).await?;

			// Grows with what the file actually holds, not with what was asked for
			let mut chunk = vec![0; size.min(self.config.copy_buffer_size)];
			let mut buf = vec![];
			while buf.len() < size {
				tracked.interrupter().check()?;

				let wanted = chunk.len().min(size - buf.len());
				let n = io.read(&mut chunk[..wanted]).await?;
				if n == 0 {
					break;
				}
				buf.extend_from_slice(&chunk[..n]);
				tracked.progress().add_read(n as u64, 0);
			}
			tracked.progress().add_read(0, 1);

			Ok::<_, Error>(buf)
		}
		.await;

		tracked.finish(res)
	}

	/// Writes `data` at `offset` of the file open under `id`.
	#[instrument(skip(self, data), fields(len = data.len()), err)]
	pub async fn write(&self, id: OpId, offset: u64, data: &[u8]) -> Result<(), Error> {
		let handle = self.ops.handle(id)?;
		let open = handle
			.open
			.filter(|open| open.entry_type.has_contents())
			.ok_or(Error::NotOpenForIo(id))?;

		let tracked = self.ops.begin_tracked(
			id,
			OpDescription::Write {
				op_id: id,
				path: handle.path,
				offset,
			},
		)?;
		tracked.progress().set_totals(data.len() as u64, 1);

		let res = async {
			let mut io = open.io.lock().await;
			io.seek(offset).await?;
			io.write(data).await?;
			tracked.progress().add_written(data.len() as u64, 1);

			Ok::<_, Error>(())
		}
		.await;

		tracked.finish(res)
	}

	#[instrument(skip(self), err)]
	pub async fn stat(&self, path: Path) -> Result<DirEntry, Error> {
		self.inline_walker().stat(&path).await
	}

	/// Releases the handle of `id`, flushing it to storage, along with anything still
	/// pending under the same id.
	#[instrument(skip(self), err)]
	pub async fn close(&self, id: OpId) -> Result<(), Error> {
		let handle = self.ops.release(id).ok_or(Error::NoSuchHandle(id))?;

		if let Some(open) = handle.open {
			open.io.lock().await.close().await?;
		}

		Ok(())
	}

	/// Aborts whatever `id` is doing and drops its handle without waiting for the work to
	/// stop. Unknown ids are ignored.
	pub fn cancel(&self, id: OpId) {
		if self.ops.cancel(id).is_some() {
			trace!(%id, "Dropped handle of canceled operation");
		}
	}

	pub fn check(&self, id: OpId) -> Result<OpProgress, Error> {
		self.ops.check(id).map_err(Into::into)
	}

	#[must_use]
	pub fn get_ops(&self) -> Vec<OpDescription> {
		self.ops.ops()
	}

	/// Blocks until the operation of `id` is done, returning how it went.
	pub async fn wait(&self, id: OpId) -> Result<(), Error> {
		self.ops.wait(id).await
	}
}
