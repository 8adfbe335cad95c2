use sfs_remote_fs::{EntryType, Node};

use std::{
	fs::Metadata,
	io::{ErrorKind, SeekFrom},
	path::{Path as StdPath, PathBuf},
};

use async_trait::async_trait;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tokio::{
	fs::{self, DirBuilder, File, OpenOptions},
	io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::trace;

use super::{
	config::SimpleFsConfig,
	dirent::{DirEntry, DirentType},
	error::{Error, FileIOError},
	path::Path,
	resolver::Resolver,
};

bitflags! {
	/// How `open` treats the path it is given.
	///
	/// Without [`OpenFlags::EXISTING`] missing entries are created, as directories when
	/// [`OpenFlags::DIRECTORY`] is set.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
	pub struct OpenFlags: u32 {
		const REPLACE = 1;
		const EXISTING = 2;
		const WRITE = 4;
		const APPEND = 8;
		const DIRECTORY = 16;
	}
}

impl OpenFlags {
	pub const READ: Self = Self::empty();

	/// Parses flags coming from a client, rejecting unknown bits and contradictions.
	pub fn checked(bits: u32) -> Result<Self, Error> {
		Self::from_bits(bits)
			.ok_or_else(|| Error::BadArgument(format!("unknown open flags <bits='{bits:#x}'>")))
			.and_then(Self::validated)
	}

	pub(crate) fn validated(self) -> Result<Self, Error> {
		if self.contains(Self::APPEND | Self::REPLACE) {
			return Err(Error::BadArgument(
				"can't both append to and replace a file".to_string(),
			));
		}

		Ok(self)
	}

	fn wants_write(self) -> bool {
		self.intersects(Self::WRITE | Self::APPEND | Self::REPLACE) || !self.contains(Self::EXISTING)
	}
}

/// The same capabilities over a remote node or a local file, so copies don't care which
/// side of the boundary they are on.
#[async_trait]
pub(crate) trait PathIo: Send {
	fn entry_type(&self) -> DirentType;

	/// Size of the entry when it was opened.
	fn size(&self) -> u64;

	async fn seek(&mut self, offset: u64) -> Result<(), Error>;

	/// Reads from the current position, zero means end of file.
	async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

	/// Writes all of `data` at the current position.
	async fn write(&mut self, data: &[u8]) -> Result<usize, Error>;

	async fn children(&mut self) -> Result<Vec<DirEntry>, Error>;

	async fn close(&mut self) -> Result<(), Error>;
}

/// Opens `path` for I/O.
///
/// `like` is the type of the entry this one mirrors during a copy: a directory source
/// makes the destination a directory, an executable one keeps it executable.
pub(crate) async fn open_path(
	resolver: &Resolver,
	config: &SimpleFsConfig,
	path: &Path,
	flags: OpenFlags,
	like: Option<DirentType>,
) -> Result<Box<dyn PathIo>, Error> {
	let flags = if like.is_some_and(DirentType::is_dir) {
		flags | OpenFlags::DIRECTORY
	} else {
		flags
	};

	trace!(%path, ?flags, ?like, "Opening path");

	Ok(match path {
		Path::Remote(_) => Box::new(RemoteIo::open(resolver, path, flags, like).await?),
		Path::Local(local) => Box::new(LocalIo::open(config, local, flags, like).await?),
	})
}

pub(crate) struct RemoteIo {
	resolver: Resolver,
	path: Path,
	node: Node,
	offset: u64,
	size: u64,
	entry_type: DirentType,
}

impl RemoteIo {
	async fn open(
		resolver: &Resolver,
		path: &Path,
		flags: OpenFlags,
		like: Option<DirentType>,
	) -> Result<Self, Error> {
		let tlf_path = path.tlf_path()?;
		let fs = resolver.fs();
		let wants_dir = flags.contains(OpenFlags::DIRECTORY);
		let executable = like == Some(DirentType::Exec);

		let (node, info) = if flags.contains(OpenFlags::EXISTING) || tlf_path.is_tlf_root() {
			resolver.node(&tlf_path).await?
		} else {
			let (parent, leaf) = resolver.parent_and_leaf(path).await?;
			match fs.lookup(&parent, &leaf).await {
				Ok(found) => found,
				Err(sfs_remote_fs::Error::NotFound(_)) if wants_dir => {
					fs.create_dir(&parent, &leaf).await?
				}
				Err(sfs_remote_fs::Error::NotFound(_)) => {
					fs.create_file(&parent, &leaf, executable).await?
				}
				Err(e) => return Err(e.into()),
			}
		};

		if !flags.contains(OpenFlags::EXISTING) {
			match (wants_dir, info.entry_type.is_dir()) {
				(true, false) => return Err(Error::NotADirectory(path.clone())),
				(false, true) => return Err(Error::NotAFile(path.clone())),
				_ => {}
			}
		}

		let mut size = info.size;
		if flags.contains(OpenFlags::REPLACE) && info.entry_type.has_contents() {
			if size > 0 {
				fs.truncate(&node, 0).await?;
				size = 0;
			}

			if like.is_some_and(DirentType::has_contents)
				&& executable != (info.entry_type == EntryType::Exec)
			{
				fs.set_executable(&node, executable).await?;
			}
		}

		Ok(Self {
			resolver: resolver.clone(),
			path: path.clone(),
			node,
			offset: if flags.contains(OpenFlags::APPEND) { size } else { 0 },
			size,
			entry_type: info.entry_type.into(),
		})
	}

	fn ensure_contents(&self) -> Result<(), Error> {
		if self.entry_type.has_contents() {
			Ok(())
		} else {
			Err(Error::NotAFile(self.path.clone()))
		}
	}
}

#[async_trait]
impl PathIo for RemoteIo {
	fn entry_type(&self) -> DirentType {
		self.entry_type
	}

	fn size(&self) -> u64 {
		self.size
	}

	async fn seek(&mut self, offset: u64) -> Result<(), Error> {
		self.offset = offset;
		Ok(())
	}

	async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
		self.ensure_contents()?;
		let n = self
			.resolver
			.fs()
			.read(&self.node, buf, self.offset)
			.await?;
		self.offset = self.offset.saturating_add(n as u64);

		Ok(n)
	}

	async fn write(&mut self, data: &[u8]) -> Result<usize, Error> {
		self.ensure_contents()?;
		self.resolver
			.fs()
			.write(&self.node, data, self.offset)
			.await?;
		self.offset = self.offset.saturating_add(data.len() as u64);

		Ok(data.len())
	}

	async fn children(&mut self) -> Result<Vec<DirEntry>, Error> {
		if !self.entry_type.is_dir() {
			return Err(Error::NotADirectory(self.path.clone()));
		}

		Ok(self
			.resolver
			.fs()
			.children(&self.node)
			.await?
			.iter()
			.map(|(name, info)| DirEntry::from_info(name.as_str(), info))
			.collect())
	}

	async fn close(&mut self) -> Result<(), Error> {
		self.resolver.fs().sync(&self.node).await.map_err(Into::into)
	}
}

pub(crate) enum LocalIo {
	File {
		path: PathBuf,
		file: File,
		entry_type: DirentType,
		size: u64,
	},
	Dir {
		path: PathBuf,
	},
}

impl LocalIo {
	async fn open(
		config: &SimpleFsConfig,
		path: &StdPath,
		flags: OpenFlags,
		like: Option<DirentType>,
	) -> Result<Self, Error> {
		let wants_dir = flags.contains(OpenFlags::DIRECTORY);
		let must_exist = flags.contains(OpenFlags::EXISTING);

		if wants_dir && !must_exist {
			let mut builder = DirBuilder::new();
			#[cfg(unix)]
			builder.mode(config.local_dir_mode);

			match builder.create(path).await {
				Ok(()) => trace!(path = %path.display(), "Created local directory"),
				Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
				Err(e) => {
					return Err(FileIOError::from((path, e, "Failed to create directory")).into())
				}
			}
		}

		match fs::metadata(path).await {
			Ok(metadata) if metadata.is_dir() => {
				if !wants_dir && !must_exist {
					return Err(Error::NotAFile(Path::Local(path.to_path_buf())));
				}

				return Ok(Self::Dir {
					path: path.to_path_buf(),
				});
			}
			Ok(_) if wants_dir && !must_exist => {
				return Err(Error::NotADirectory(Path::Local(path.to_path_buf())));
			}
			Ok(_) => {}
			Err(e) if e.kind() == ErrorKind::NotFound && !must_exist => {}
			Err(e) => return Err(FileIOError::from((path, e)).into()),
		}

		let mut options = OpenOptions::new();
		options
			.read(true)
			.write(flags.wants_write())
			.create(!must_exist)
			.truncate(flags.contains(OpenFlags::REPLACE))
			.append(flags.contains(OpenFlags::APPEND));

		#[cfg(unix)]
		options.mode(if like == Some(DirentType::Exec) {
			config.local_file_mode | 0o111
		} else {
			config.local_file_mode
		});

		let file = options
			.open(path)
			.await
			.map_err(|e| FileIOError::from((path, e, "Failed to open file")))?;

		let metadata = file
			.metadata()
			.await
			.map_err(|e| FileIOError::from((path, e)))?;

		Ok(Self::File {
			path: path.to_path_buf(),
			entry_type: DirentType::from(&metadata),
			size: metadata.len(),
			file,
		})
	}

	fn file(&mut self) -> Result<(&StdPath, &mut File), Error> {
		match self {
			Self::File { path, file, .. } => Ok((path.as_path(), file)),
			Self::Dir { path } => Err(Error::NotAFile(Path::Local(path.clone()))),
		}
	}
}

#[async_trait]
impl PathIo for LocalIo {
	fn entry_type(&self) -> DirentType {
		match self {
			Self::File { entry_type, .. } => *entry_type,
			Self::Dir { .. } => DirentType::Dir,
		}
	}

	fn size(&self) -> u64 {
		match self {
			Self::File { size, .. } => *size,
			Self::Dir { .. } => 0,
		}
	}

	async fn seek(&mut self, offset: u64) -> Result<(), Error> {
		let (path, file) = self.file()?;
		file.seek(SeekFrom::Start(offset))
			.await
			.map_err(|e| FileIOError::from((path, e)))?;

		Ok(())
	}

	async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
		let (path, file) = self.file()?;
		file.read(buf)
			.await
			.map_err(|e| FileIOError::from((path, e)).into())
	}

	async fn write(&mut self, data: &[u8]) -> Result<usize, Error> {
		let (path, file) = self.file()?;
		file.write_all(data)
			.await
			.map_err(|e| FileIOError::from((path, e)))?;

		Ok(data.len())
	}

	async fn children(&mut self) -> Result<Vec<DirEntry>, Error> {
		let path = match self {
			Self::Dir { path } => path,
			Self::File { path, .. } => return Err(Error::NotADirectory(Path::Local(path.clone()))),
		};

		let mut read_dir = fs::read_dir(&*path)
			.await
			.map_err(|e| FileIOError::from((&*path, e, "Failed to read directory")))?;

		let mut entries = vec![];
		while let Some(entry) = read_dir
			.next_entry()
			.await
			.map_err(|e| FileIOError::from((&*path, e, "Failed to read directory entry")))?
		{
			let metadata: Metadata = entry
				.metadata()
				.await
				.map_err(|e| FileIOError::from((entry.path(), e)))?;

			entries.push(DirEntry::from_metadata(
				entry.file_name().to_string_lossy(),
				&metadata,
			));
		}

		Ok(entries)
	}

	async fn close(&mut self) -> Result<(), Error> {
		match self {
			// Writes of tokio files may still be in flight until flushed
			Self::File { path, file, .. } => file
				.flush()
				.await
				.map_err(|e| FileIOError::from((&*path, e)).into()),
			Self::Dir { .. } => Ok(()),
		}
	}
}
