//!
//! # Op System
//!
//! Bookkeeping for long-running, cancellable operations and the resources they leave behind.
//!
//! Every operation is named by a random [`OpId`] minted before it starts. The [`OpSystem`] keeps
//! two registries keyed by those ids, one for pending operations and one for handles (open
//! files, buffered results), and guards both with a single lock. On top of that:
//! - Operations run on their own tokio task and report their outcome exactly once;
//! - [`OpSystem::wait`] consumes that outcome, a second wait finds nothing;
//! - Cancellation is cooperative, the work polls its [`Interrupter`] at safe points;
//! - Progress counters can be read at any time through [`OpSystem::check`];
//! - Short calls running on the caller's task can still be tracked with [`OpSystem::begin_tracked`].
//!
//! Bring your own error type, it only has to be able to hold a [`SystemError`] and [`Canceled`].
//!
//! ## Basic example
//!
//! ```
//! use sfs_op_system::{Canceled, OpSystem, SystemError};
//! use thiserror::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum SampleError {
//!     #[error(transparent)]
//!     System(#[from] SystemError),
//!     #[error(transparent)]
//!     Canceled(#[from] Canceled),
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let system = OpSystem::<&'static str, (), SampleError>::new();
//!     let id = system.make_op_id();
//!
//!     system
//!         .start(id, "sample", |ctx| async move {
//!             ctx.interrupter().check()?;
//!             ctx.progress().add_read(42, 1);
//!             Ok::<_, SampleError>(())
//!         })
//!         .unwrap();
//!
//!     system.wait(id).await.unwrap();
//!     assert!(matches!(
//!         system.wait(id).await,
//!         Err(SampleError::System(SystemError::NoSuchHandle(_)))
//!     ));
//! }
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

mod error;
mod id;
mod interrupter;
mod progress;
mod system;

pub use error::{Canceled, RunError, SystemError};
pub use id::OpId;
pub use interrupter::Interrupter;
pub use progress::{OpProgress, ProgressTracker};
pub use system::{OpContext, OpSystem, TrackedOp};
