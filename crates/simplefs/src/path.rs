use sfs_remote_fs::TlfVisibility;

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use super::error::Error;

/// A path on either side of a cross-boundary operation.
///
/// Remote paths look like `/private/alice/dir/file`: a visibility segment, the name of a
/// top-level folder, then the names to look up below its root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Path {
	Local(PathBuf),
	Remote(String),
}

impl Path {
	pub fn local(path: impl Into<PathBuf>) -> Self {
		Self::Local(path.into())
	}

	pub fn remote(path: impl Into<String>) -> Self {
		Self::Remote(path.into())
	}

	#[must_use]
	pub const fn is_remote(&self) -> bool {
		matches!(self, Self::Remote(_))
	}

	/// The path of child `leaf` below this one.
	#[must_use]
	pub fn join(&self, leaf: &str) -> Self {
		match self {
			Self::Local(path) => Self::Local(path.join(leaf)),
			Self::Remote(path) => Self::Remote(format!("{}/{leaf}", path.trim_end_matches('/'))),
		}
	}

	/// Whether this is `ancestor` itself or a path below it. Local paths are compared
	/// component by component, without touching the disk.
	#[must_use]
	pub fn is_within(&self, ancestor: &Self) -> bool {
		match (self, ancestor) {
			(Self::Local(path), Self::Local(ancestor)) => path.starts_with(ancestor),
			(Self::Remote(_), Self::Remote(_)) => {
				match (self.remote_location(), ancestor.remote_location()) {
					(Ok(_), Ok(RemoteLocation::Root)) => true,
					(
						Ok(RemoteLocation::Favorites(visibility)),
						Ok(RemoteLocation::Favorites(ancestor)),
					) => visibility == ancestor,
					(Ok(RemoteLocation::Tlf(path)), Ok(RemoteLocation::Favorites(ancestor))) => {
						path.visibility == ancestor
					}
					(Ok(RemoteLocation::Tlf(path)), Ok(RemoteLocation::Tlf(ancestor))) => {
						path.same_tlf(&ancestor) && path.segments.starts_with(&ancestor.segments)
					}
					_ => false,
				}
			}
			_ => false,
		}
	}

	pub(crate) fn remote_location(&self) -> Result<RemoteLocation, Error> {
		match self {
			Self::Remote(raw) => RemoteLocation::parse(raw),
			Self::Local(_) => Err(Error::OnlyRemotePathSupported(self.clone())),
		}
	}

	pub(crate) fn tlf_path(&self) -> Result<TlfPath, Error> {
		match self.remote_location()? {
			RemoteLocation::Tlf(tlf_path) => Ok(tlf_path),
			RemoteLocation::Root | RemoteLocation::Favorites(_) => {
				Err(Error::InvalidRemotePath(self.to_string()))
			}
		}
	}
}

impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Local(path) => write!(f, "{}", path.display()),
			Self::Remote(path) => write!(f, "remote:{path}"),
		}
	}
}

/// Where a remote path points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RemoteLocation {
	/// `/`, holding one directory per visibility.
	Root,
	/// `/private`, `/public` or `/team`, listing the user's favorite folders.
	Favorites(TlfVisibility),
	Tlf(TlfPath),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TlfPath {
	pub(crate) visibility: TlfVisibility,
	pub(crate) tlf: String,
	pub(crate) segments: Vec<String>,
}

impl TlfPath {
	/// Whether this is the root directory of its top-level folder.
	pub(crate) fn is_tlf_root(&self) -> bool {
		self.segments.is_empty()
	}

	pub(crate) fn same_tlf(&self, other: &Self) -> bool {
		self.visibility == other.visibility && self.tlf == other.tlf
	}
}

impl RemoteLocation {
	fn parse(raw: &str) -> Result<Self, Error> {
		let mut segments = Vec::new();
		for segment in raw.split('/') {
			match segment {
				"" | "." => {}
				".." => return Err(Error::InvalidRemotePath(raw.to_string())),
				segment => segments.push(segment.to_string()),
			}
		}

		let mut segments = segments.into_iter();
		let Some(visibility) = segments.next() else {
			return Ok(Self::Root);
		};

		let visibility = TlfVisibility::from_segment(&visibility)
			.ok_or_else(|| Error::InvalidRemotePath(raw.to_string()))?;

		Ok(match segments.next() {
			None => Self::Favorites(visibility),
			Some(tlf) => Self::Tlf(TlfPath {
				visibility,
				tlf,
				segments: segments.collect(),
			}),
		})
	}
}
