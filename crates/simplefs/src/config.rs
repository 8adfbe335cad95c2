use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use super::error::{Error, FileIOError};

const KIB: usize = 1024;

/// Tunables of a [`SimpleFs`](crate::SimpleFs) instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleFsConfig {
	/// Size of the chunks copies move at once, cancellation is checked between chunks.
	pub copy_buffer_size: usize,
	/// Permissions of local directories created by copies and `open`.
	pub local_dir_mode: u32,
	/// Permissions of local files created by copies and `open`.
	pub local_file_mode: u32,
	/// How much a `read` asking for zero bytes returns at most.
	pub default_read_size: usize,
}

impl Default for SimpleFsConfig {
	fn default() -> Self {
		Self {
			copy_buffer_size: 64 * KIB,
			local_dir_mode: 0o755,
			local_file_mode: 0o644,
			default_read_size: 64 * KIB,
		}
	}
}

impl SimpleFsConfig {
	/// Loads the config stored at `path`, writing the defaults there if there's none yet.
	pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
		let path = path.as_ref();

		match fs::read(path).await {
			Ok(data) => {
				let config = serde_json::from_slice::<Self>(&data)?;
				config.validate()?;
				debug!(path = %path.display(), "Loaded SimpleFS config");
				Ok(config)
			}

			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				warn!(path = %path.display(), "No SimpleFS config found, using defaults");
				let config = Self::default();
				config.save(path).await?;
				Ok(config)
			}

			Err(e) => Err(FileIOError::from((path, e, "Failed to read config")).into()),
		}
	}

	pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
		let path = path.as_ref();
		fs::write(path, serde_json::to_vec_pretty(self)?)
			.await
			.map_err(|e| FileIOError::from((path, e, "Failed to write config")))?;

		Ok(())
	}

	pub fn validate(&self) -> Result<(), Error> {
		if self.copy_buffer_size == 0 {
			return Err(Error::BadArgument(
				"copy buffer size must not be zero".to_string(),
			));
		}

		if self.default_read_size == 0 {
			return Err(Error::BadArgument(
				"default read size must not be zero".to_string(),
			));
		}

		Ok(())
	}
}
