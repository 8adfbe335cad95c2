//!
//! # Remote FS
//!
//! The interface SimpleFS uses to talk to the encrypted, distributed filesystem, along with
//! an in-memory implementation of it.
//!
//! The real service resolves top-level folders (TLFs) to cryptographic identities, encrypts
//! and replicates blocks, and keeps the favorites of every user. None of that is visible here:
//! SimpleFS only needs nodes, names and bytes, so [`RemoteFs`] is exactly that surface.

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

mod error;
mod fs;
mod memory;
mod types;

pub use error::Error;
pub use fs::RemoteFs;
pub use memory::MemoryFs;
pub use types::{EntryInfo, EntryType, Favorite, Node, NodeId, Session, TlfVisibility};
