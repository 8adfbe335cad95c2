use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque 128-bit random token naming one operation and, possibly, the handle it owns.
///
/// Ids are minted from 16 random bytes, uniqueness is left to the birthday bound.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(Uuid);

impl OpId {
	#[must_use]
	pub fn new_random() -> Self {
		Self(Uuid::from_bytes(rand::random()))
	}

	#[must_use]
	pub const fn from_bytes(bytes: [u8; 16]) -> Self {
		Self(Uuid::from_bytes(bytes))
	}

	#[must_use]
	pub const fn as_bytes(&self) -> &[u8; 16] {
		self.0.as_bytes()
	}
}

impl fmt::Display for OpId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.as_bytes()
			.iter()
			.try_for_each(|byte| write!(f, "{byte:02X}"))
	}
}

impl fmt::Debug for OpId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "OpId({self})")
	}
}
