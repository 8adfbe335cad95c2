use std::{collections::HashMap, future::Future, sync::Arc};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::{spawn, sync::oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, Instrument};

use super::{
	error::{RunError, SystemError},
	id::OpId,
	interrupter::Interrupter,
	progress::{OpProgress, ProgressTracker},
};

type Done<E> = oneshot::Receiver<Result<(), E>>;

struct InProgress<D, E> {
	generation: u64,
	description: D,
	cancel: CancellationToken,
	done: Option<Done<E>>,
	progress: ProgressTracker,
}

struct Tables<D, H, E> {
	in_progress: HashMap<OpId, InProgress<D, E>>,
	handles: HashMap<OpId, H>,
	// Tells apart two registrations that reused the same id, so a late remover never
	// takes out an entry it doesn't own.
	next_generation: u64,
}

struct Registration<E> {
	generation: u64,
	done_tx: oneshot::Sender<Result<(), E>>,
	cancel: CancellationToken,
	progress: ProgressTracker,
}

impl<D, H, E> Tables<D, H, E> {
	fn register(&mut self, id: OpId, description: D) -> Result<Registration<E>, SystemError> {
		if self.in_progress.contains_key(&id) {
			return Err(SystemError::OperationInProgress(id));
		}

		let generation = self.next_generation;
		self.next_generation += 1;

		let (done_tx, done_rx) = oneshot::channel();
		let cancel = CancellationToken::new();
		let progress = ProgressTracker::default();

		self.in_progress.insert(
			id,
			InProgress {
				generation,
				description,
				cancel: cancel.clone(),
				done: Some(done_rx),
				progress: progress.clone(),
			},
		);

		Ok(Registration {
			generation,
			done_tx,
			cancel,
			progress,
		})
	}

	fn remove_generation(&mut self, id: OpId, generation: u64) -> bool {
		if self
			.in_progress
			.get(&id)
			.is_some_and(|entry| entry.generation == generation)
		{
			self.in_progress.remove(&id);
			true
		} else {
			false
		}
	}
}

/// What a running operation gets to see of the system.
#[derive(Debug, Clone)]
pub struct OpContext {
	id: OpId,
	interrupter: Interrupter,
	progress: ProgressTracker,
}

impl OpContext {
	#[must_use]
	pub const fn id(&self) -> OpId {
		self.id
	}

	#[must_use]
	pub const fn interrupter(&self) -> &Interrupter {
		&self.interrupter
	}

	#[must_use]
	pub const fn progress(&self) -> &ProgressTracker {
		&self.progress
	}
}

/// The operation registry and the handle registry, guarded by a single lock.
///
/// Both maps are keyed by [`OpId`] but are otherwise independent: an id can be pending,
/// own a handle, both or neither. Every registration, lookup and removal happens under the
/// same lock, so a cancel racing a natural completion always has exactly one winner, the
/// loser just finds nothing to act on.
///
/// `D` describes operations for introspection, `H` is whatever resource an id can own and
/// `E` is the error operations fail with.
pub struct OpSystem<D, H, E> {
	tables: Arc<Mutex<Tables<D, H, E>>>,
}

impl<D, H, E> Clone for OpSystem<D, H, E> {
	fn clone(&self) -> Self {
		Self {
			tables: Arc::clone(&self.tables),
		}
	}
}

impl<D, H, E> Default for OpSystem<D, H, E> {
	fn default() -> Self {
		Self {
			tables: Arc::new(Mutex::new(Tables {
				in_progress: HashMap::new(),
				handles: HashMap::new(),
				next_generation: 0,
			})),
		}
	}
}

impl<D, H, E> OpSystem<D, H, E>
where
	D: Clone + std::fmt::Debug + Send + 'static,
	H: Send + 'static,
	E: RunError,
{
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn make_op_id(&self) -> OpId {
		OpId::new_random()
	}

	/// Registers `id` as pending and runs `work` on its own task.
	///
	/// Returns as soon as the work is spawned, so it must be called from inside a tokio
	/// runtime. Whatever the work ends with is kept for a later [`OpSystem::wait`]; if the
	/// id was canceled in the meantime the outcome is discarded.
	pub fn start<W, Fut>(&self, id: OpId, description: D, work: W) -> Result<(), SystemError>
	where
		W: FnOnce(OpContext) -> Fut,
		Fut: Future<Output = Result<(), E>> + Send + 'static,
	{
		debug!(%id, ?description, "Starting async operation");

		let Registration {
			done_tx,
			cancel,
			progress,
			..
		} = self.tables.lock().register(id, description)?;

		let ctx = OpContext {
			id,
			interrupter: Interrupter::new(cancel),
			progress: progress.clone(),
		};

		let fut = work(ctx);

		spawn(
			async move {
				let res = fut.await;
				progress.finish();

				match &res {
					Ok(()) => debug!(%id, "done op"),
					Err(e) => debug!(%id, %e, "done op with error"),
				}

				if done_tx.send(res).is_err() {
					trace!(%id, "Nobody is left to receive the outcome, discarding it");
				}
			}
			.in_current_span(),
		);

		Ok(())
	}

	/// Blocks until the operation completes and consumes its pending entry.
	///
	/// A second wait on the same id finds nothing and fails with
	/// [`SystemError::NoSuchHandle`].
	pub async fn wait(&self, id: OpId) -> Result<(), E> {
		let (generation, done) = {
			let mut tables = self.tables.lock();
			let entry = tables
				.in_progress
				.get_mut(&id)
				.ok_or(SystemError::NoSuchHandle(id))?;

			// Someone else is already waiting
			let done = entry.done.take().ok_or(SystemError::NoResult(id))?;

			(entry.generation, done)
		};

		let res = done.await;

		self.tables.lock().remove_generation(id, generation);

		res.unwrap_or_else(|_| {
			trace!(%id, "Operation went away without an outcome");
			Err(SystemError::NoResult(id).into())
		})
	}

	/// Progress of a pending operation, an empty report if `id` only owns a handle.
	pub fn check(&self, id: OpId) -> Result<OpProgress, SystemError> {
		let tables = self.tables.lock();

		if let Some(entry) = tables.in_progress.get(&id) {
			return Ok(entry.progress.estimate(Utc::now()));
		}

		if tables.handles.contains_key(&id) {
			return Ok(OpProgress::default());
		}

		Err(SystemError::NoResult(id))
	}

	/// Drops both registry entries of `id` and signals cancellation to the work.
	///
	/// Never waits for the work to stop. Unknown ids are a no-op. The removed handle, if any,
	/// is handed back so the caller can release it outside of the lock.
	pub fn cancel(&self, id: OpId) -> Option<H> {
		let (entry, handle) = {
			let mut tables = self.tables.lock();
			(tables.in_progress.remove(&id), tables.handles.remove(&id))
		};

		if let Some(entry) = entry {
			debug!(%id, description = ?entry.description, "Canceling operation");
			entry.cancel.cancel();
		} else {
			trace!(%id, "Nothing pending to cancel");
		}

		handle
	}

	/// Drops both registry entries of `id` without signaling cancellation.
	pub fn release(&self, id: OpId) -> Option<H> {
		let mut tables = self.tables.lock();
		tables.in_progress.remove(&id);
		tables.handles.remove(&id)
	}

	/// Descriptions of everything currently pending.
	#[must_use]
	pub fn ops(&self) -> Vec<D> {
		self.tables
			.lock()
			.in_progress
			.values()
			.map(|entry| entry.description.clone())
			.collect()
	}

	#[must_use]
	pub fn is_pending(&self, id: OpId) -> bool {
		self.tables.lock().in_progress.contains_key(&id)
	}

	/// Stores `handle` for `id`, giving back the one it replaced.
	pub fn insert_handle(&self, id: OpId, handle: H) -> Option<H> {
		self.tables.lock().handles.insert(id, handle)
	}

	/// Stores the result of a still pending operation as its handle.
	///
	/// Returns `false`, dropping nothing from the tables, if the operation was canceled or
	/// released before its result was ready.
	pub fn publish(&self, id: OpId, handle: H) -> bool {
		let mut tables = self.tables.lock();
		if !tables.in_progress.contains_key(&id) {
			trace!(%id, "Operation is gone, not publishing its result");
			return false;
		}

		tables.handles.insert(id, handle);
		true
	}

	pub fn remove_handle(&self, id: OpId) -> Option<H> {
		self.tables.lock().handles.remove(&id)
	}

	/// Runs `f` on the handle of `id` while holding the lock, keep it short.
	pub fn with_handle<R>(&self, id: OpId, f: impl FnOnce(&mut H) -> R) -> Result<R, SystemError> {
		self.tables
			.lock()
			.handles
			.get_mut(&id)
			.map(f)
			.ok_or(SystemError::NoSuchHandle(id))
	}

	pub fn handle(&self, id: OpId) -> Result<H, SystemError>
	where
		H: Clone,
	{
		self.with_handle(id, |handle| handle.clone())
	}

	/// Registers a short-lived operation that runs on the caller's own task.
	///
	/// It is visible to [`OpSystem::check`], [`OpSystem::ops`] and [`OpSystem::wait`] until
	/// [`TrackedOp::finish`] is called or the returned value is dropped.
	pub fn begin_tracked(&self, id: OpId, description: D) -> Result<TrackedOp<D, H, E>, SystemError> {
		debug!(%id, ?description, "Starting tracked operation");

		let Registration {
			generation,
			done_tx,
			cancel,
			progress,
		} = self.tables.lock().register(id, description)?;

		Ok(TrackedOp {
			system: self.clone(),
			id,
			generation,
			done: Some(done_tx),
			interrupter: Interrupter::new(cancel),
			progress,
		})
	}
}

/// A pending entry owned by the code running the operation inline.
#[must_use = "dropping a tracked operation unregisters it"]
pub struct TrackedOp<D, H, E> {
	system: OpSystem<D, H, E>,
	id: OpId,
	generation: u64,
	done: Option<oneshot::Sender<Result<(), E>>>,
	interrupter: Interrupter,
	progress: ProgressTracker,
}

impl<D, H, E> TrackedOp<D, H, E> {
	#[must_use]
	pub const fn id(&self) -> OpId {
		self.id
	}

	#[must_use]
	pub const fn interrupter(&self) -> &Interrupter {
		&self.interrupter
	}

	#[must_use]
	pub const fn progress(&self) -> &ProgressTracker {
		&self.progress
	}

	/// Completes the operation exactly once and hands `res` back to the caller.
	///
	/// A concurrent waiter sees a success as such; a failure is only returned here, the
	/// waiter gets [`SystemError::NoResult`] for it.
	pub fn finish<T>(mut self, res: Result<T, E>) -> Result<T, E>
	where
		E: std::fmt::Display,
	{
		self.progress.finish();
		self.system
			.tables
			.lock()
			.remove_generation(self.id, self.generation);

		let id = self.id;
		if let Some(done) = self.done.take() {
			match &res {
				Ok(_) => {
					debug!(%id, "done op");
					// The waiter may be long gone
					done.send(Ok(())).ok();
				}
				Err(e) => debug!(%id, %e, "done op with error"),
			}
		}

		res
	}
}

impl<D, H, E> Drop for TrackedOp<D, H, E> {
	fn drop(&mut self) {
		if self.done.is_some() {
			trace!(id = %self.id, "Tracked operation dropped before finishing");
			self.system
				.tables
				.lock()
				.remove_generation(self.id, self.generation);
		}
	}
}
