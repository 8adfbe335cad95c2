use thiserror::Error;

use super::id::OpId;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SystemError {
	#[error("no such handle <op_id='{0}'>")]
	NoSuchHandle(OpId),
	#[error("async result not found <op_id='{0}'>")]
	NoResult(OpId),
	#[error("an operation is already registered <op_id='{0}'>")]
	OperationInProgress(OpId),
}

/// Returned by [`Interrupter::check`](crate::Interrupter::check) once the operation was canceled.
#[derive(Debug, Error, Clone, Copy, Default, PartialEq, Eq)]
#[error("operation canceled")]
pub struct Canceled;

/// The error type every operation run by the system must use.
///
/// Registry failures and cancellation both have to fit in it, as they are reported through
/// the same completion signal as the operation's own failures.
pub trait RunError: std::error::Error + From<SystemError> + From<Canceled> + Send + 'static {}

impl<T: std::error::Error + From<SystemError> + From<Canceled> + Send + 'static> RunError for T {}
