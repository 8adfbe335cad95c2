//!
//! # SimpleFS
//!
//! A small request/response filesystem protocol for thin clients. Every request works on
//! either a local path or a path of the encrypted, distributed filesystem, so copying
//! between the two is a single operation.
//!
//! Long running requests (list, copy, move, remove) are asynchronous: the client mints an
//! operation id with [`SimpleFs::make_op_id`], starts the request under it and later calls
//! [`SimpleFs::wait`], [`SimpleFs::check`] or [`SimpleFs::cancel`]. Opened files and finished
//! listings stay around as handles under the same id until they are closed.
//!
//! ```
//! use sfs_core::{ListFilter, Path, SimpleFs, SimpleFsConfig};
//! use sfs_remote_fs::MemoryFs;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), sfs_core::Error> {
//! let simplefs = SimpleFs::new(Arc::new(MemoryFs::with_user("alice")), SimpleFsConfig::default())?;
//!
//! let id = simplefs.make_op_id();
//! simplefs.list(id, Path::remote("/private/alice"), ListFilter::NoFilter)?;
//! simplefs.wait(id).await?;
//!
//! assert!(simplefs.read_list(id)?.is_empty());
//! simplefs.close(id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod config;
mod description;
mod dirent;
mod error;
mod handle;
mod io;
mod path;
mod resolver;
mod simplefs;
mod walker;

pub use config::SimpleFsConfig;
pub use description::OpDescription;
pub use dirent::{DirEntry, DirentType, ListFilter};
pub use error::{Error, FileIOError};
pub use io::OpenFlags;
pub use path::Path;
pub use simplefs::SimpleFs;

pub use sfs_op_system::{OpId, OpProgress};
