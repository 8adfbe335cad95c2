use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::error::Canceled;

/// Lets a running operation find out whether it was canceled.
///
/// Cancellation is cooperative: nothing stops the operation for it, so long running loops
/// must call [`Interrupter::check`] at their own safe points (between chunks, between
/// tree entries) and bail out with the returned error.
#[derive(Debug, Clone)]
pub struct Interrupter {
	token: CancellationToken,
}

impl Interrupter {
	pub(crate) fn new(token: CancellationToken) -> Self {
		Self { token }
	}

	/// An interrupter nobody can trigger, for work that runs outside of the system.
	#[must_use]
	pub fn never() -> Self {
		Self::new(CancellationToken::new())
	}

	#[must_use]
	pub fn is_canceled(&self) -> bool {
		self.token.is_cancelled()
	}

	pub fn check(&self) -> Result<(), Canceled> {
		if self.token.is_cancelled() {
			trace!("Operation was canceled by the user");
			return Err(Canceled);
		}

		Ok(())
	}

	/// Resolves once the operation is canceled.
	pub async fn canceled(&self) {
		self.token.cancelled().await;
	}
}
