//! Common aliases used throughout the relay.

use serde::{Deserialize, Serialize};

// Re-export the chain-facing identity types.
pub use alloy_primitives::{keccak256, Address, Bytes, B256, U256};

/// Hash identifying a signed order.
pub type OrderHash = B256;

/// Hash identifying a prepared ring submission, assigned by the submitter.
pub type RingHash = B256;

/// Transaction hash
pub type TxHash = B256;

/// Block number
pub type BlockNumber = u64;

/// A trading pair handled by one market. `(A, B)` and `(B, A)` describe the
/// same market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	pub token_a: Address,
	pub token_b: Address,
}

impl TokenPair {
	pub fn new(token_a: Address, token_b: Address) -> Self {
		Self { token_a, token_b }
	}

	/// Orientation-independent key, used to deduplicate `(A, B)` vs `(B, A)`.
	pub fn canonical(&self) -> (Address, Address) {
		if self.token_a <= self.token_b {
			(self.token_a, self.token_b)
		} else {
			(self.token_b, self.token_a)
		}
	}
}
