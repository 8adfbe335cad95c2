use std::sync::{
	atomic::{AtomicI64, AtomicU64, Ordering},
	Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time view of how far an operation got.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpProgress {
	pub start: Option<DateTime<Utc>>,
	pub end_estimate: Option<DateTime<Utc>>,
	pub bytes_total: u64,
	pub bytes_read: u64,
	pub bytes_written: u64,
	pub files_total: u64,
	pub files_read: u64,
	pub files_written: u64,
}

/// Shared progress counters of a single operation.
///
/// The running work updates them without touching the registry lock, while `check`
/// takes snapshots.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
	counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
	// Milliseconds since the epoch, zero while unset.
	start: AtomicI64,
	end: AtomicI64,
	bytes_total: AtomicU64,
	bytes_read: AtomicU64,
	bytes_written: AtomicU64,
	files_total: AtomicU64,
	files_read: AtomicU64,
	files_written: AtomicU64,
}

fn millis_to_time(millis: i64) -> Option<DateTime<Utc>> {
	(millis != 0)
		.then_some(millis)
		.and_then(DateTime::from_timestamp_millis)
}

impl ProgressTracker {
	/// Declares how much work is expected and starts the clock.
	pub fn set_totals(&self, bytes: u64, files: u64) {
		let counters = &self.counters;
		counters.bytes_total.store(bytes, Ordering::Release);
		counters.files_total.store(files, Ordering::Release);
		counters
			.start
			.store(Utc::now().timestamp_millis(), Ordering::Release);
	}

	pub fn add_read(&self, bytes: u64, files: u64) {
		let counters = &self.counters;
		let bytes_read = counters.bytes_read.fetch_add(bytes, Ordering::AcqRel) + bytes;
		let files_read = counters.files_read.fetch_add(files, Ordering::AcqRel) + files;
		// A total that turns out too small, or was never given, follows the real count
		counters.bytes_total.fetch_max(bytes_read, Ordering::AcqRel);
		counters.files_total.fetch_max(files_read, Ordering::AcqRel);
	}

	pub fn add_written(&self, bytes: u64, files: u64) {
		let counters = &self.counters;
		let bytes_written = counters.bytes_written.fetch_add(bytes, Ordering::AcqRel) + bytes;
		let files_written = counters.files_written.fetch_add(files, Ordering::AcqRel) + files;
		counters.bytes_total.fetch_max(bytes_written, Ordering::AcqRel);
		counters.files_total.fetch_max(files_written, Ordering::AcqRel);
	}

	pub(crate) fn finish(&self) {
		self.counters
			.end
			.store(Utc::now().timestamp_millis(), Ordering::Release);
	}

	#[must_use]
	pub fn snapshot(&self) -> OpProgress {
		let counters = &self.counters;

		OpProgress {
			start: millis_to_time(counters.start.load(Ordering::Acquire)),
			end_estimate: millis_to_time(counters.end.load(Ordering::Acquire)),
			bytes_total: counters.bytes_total.load(Ordering::Acquire),
			bytes_read: counters.bytes_read.load(Ordering::Acquire),
			bytes_written: counters.bytes_written.load(Ordering::Acquire),
			files_total: counters.files_total.load(Ordering::Acquire),
			files_read: counters.files_read.load(Ordering::Acquire),
			files_written: counters.files_written.load(Ordering::Acquire),
		}
	}

	/// Like [`ProgressTracker::snapshot`], but a still running operation gets an end estimate
	/// assuming the remaining work goes as fast as what was read so far.
	#[must_use]
	pub fn estimate(&self, now: DateTime<Utc>) -> OpProgress {
		let mut progress = self.snapshot();

		let (done, total) = if progress.bytes_total > 0 {
			(progress.bytes_read, progress.bytes_total)
		} else {
			(progress.files_read, progress.files_total)
		};

		if let (Some(start), None, true) = (progress.start, progress.end_estimate, done > 0) {
			let elapsed = u128::try_from((now - start).num_milliseconds().max(0)).unwrap_or(0);
			let estimated_total = elapsed * u128::from(total) / u128::from(done);
			progress.end_estimate = i64::try_from(estimated_total)
				.ok()
				.and_then(|millis| start.timestamp_millis().checked_add(millis))
				.and_then(DateTime::from_timestamp_millis);
		}

		progress
	}
}
