//! Two-order rings and their submission wrappers.

use num_bigint::BigInt;
use num_traits::Zero;

use crate::{Bytes, FilledOrder, RingHash, U256};

/// An ordered pair of fills whose token swaps cancel, enabling atomic
/// settlement. The evaluator fills in the fill amounts and `received`.
#[derive(Debug, Clone)]
pub struct Ring {
	pub orders: Vec<FilledOrder>,
	/// The miner's net payout in the fee token; signed, an unprofitable
	/// ring evaluates negative.
	pub received: BigInt,
}

impl Ring {
	pub fn new(orders: Vec<FilledOrder>) -> Self {
		Self {
			orders,
			received: BigInt::zero(),
		}
	}
}

/// A ring plus the transaction-construction metadata the submitter needs.
///
/// The matcher treats everything but `ring_hash` and `received` as opaque.
#[derive(Debug, Clone)]
pub struct RingSubmitInfo {
	pub ring: Ring,
	pub ring_hash: RingHash,
	pub received: BigInt,
	pub gas_limit: U256,
	pub submit_tx_data: Bytes,
}
