//! Orders and their mutable fill views.

use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::{keccak256, Address, OrderHash};

/// An immutable signed intent to trade `amount_s` of `token_s` for
/// `amount_b` of `token_b`, carrying an LRC fee budget for the miner.
///
/// Orders are referenced everywhere by their content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	pub hash: OrderHash,
	/// Protocol contract the order settles through.
	pub protocol: Address,
	pub owner: Address,
	pub token_s: Address,
	pub token_b: Address,
	pub amount_s: BigInt,
	pub amount_b: BigInt,
	pub lrc_fee: BigInt,
}

impl Order {
	/// Builds an order and stamps it with its content hash.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		protocol: Address,
		owner: Address,
		token_s: Address,
		token_b: Address,
		amount_s: BigInt,
		amount_b: BigInt,
		lrc_fee: BigInt,
	) -> Self {
		let mut order = Self {
			hash: OrderHash::ZERO,
			protocol,
			owner,
			token_s,
			token_b,
			amount_s,
			amount_b,
			lrc_fee,
		};
		order.hash = order.compute_hash();
		order
	}

	/// Keccak over the order's economic fields.
	pub fn compute_hash(&self) -> OrderHash {
		let mut buf = Vec::new();
		buf.extend_from_slice(self.protocol.as_slice());
		buf.extend_from_slice(self.owner.as_slice());
		buf.extend_from_slice(self.token_s.as_slice());
		buf.extend_from_slice(self.token_b.as_slice());
		buf.extend_from_slice(&self.amount_s.to_signed_bytes_be());
		buf.extend_from_slice(&self.amount_b.to_signed_bytes_be());
		buf.extend_from_slice(&self.lrc_fee.to_signed_bytes_be());
		keccak256(&buf)
	}

	/// The order's rational price, `amount_s / amount_b`.
	pub fn price(&self) -> BigRational {
		BigRational::new(self.amount_s.clone(), self.amount_b.clone())
	}
}

/// A mutable fill view layered on an [`Order`].
///
/// `dealt_amount_s`/`dealt_amount_b` track cumulative settled fills as the
/// order store knows them; the matcher layers its own in-flight adjustments
/// on top of an owned copy of this view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
	pub raw_order: Order,
	pub dealt_amount_s: BigInt,
	pub dealt_amount_b: BigInt,
}

impl OrderState {
	pub fn new(raw_order: Order) -> Self {
		Self {
			raw_order,
			dealt_amount_s: BigInt::zero(),
			dealt_amount_b: BigInt::zero(),
		}
	}

	/// Unfilled remainder on the sell side, floored at zero.
	pub fn available_amount_s(&self) -> BigInt {
		let remain = &self.raw_order.amount_s - &self.dealt_amount_s;
		if remain.sign() == Sign::Minus {
			BigInt::zero()
		} else {
			remain
		}
	}

	/// Unfilled remainder on the buy side, floored at zero.
	pub fn available_amount_b(&self) -> BigInt {
		let remain = &self.raw_order.amount_b - &self.dealt_amount_b;
		if remain.sign() == Sign::Minus {
			BigInt::zero()
		} else {
			remain
		}
	}
}

/// A per-round fill decision on one order: the proposed fill amounts and
/// the owner's spendable LRC and TokenS captured at evaluation time.
///
/// Fill amounts are exact rationals; they are truncated toward zero only
/// when they cross back into on-chain integer amounts.
#[derive(Debug, Clone)]
pub struct FilledOrder {
	pub order_state: OrderState,
	pub fill_amount_s: BigRational,
	pub fill_amount_b: BigRational,
	pub available_lrc_balance: BigRational,
	pub available_token_s_balance: BigRational,
}

impl FilledOrder {
	/// Projects an order state onto the owner's current LRC and TokenS
	/// spendability. Fill amounts start at zero and are set by the evaluator.
	pub fn from_order_state(
		order_state: OrderState,
		available_lrc_balance: BigRational,
		available_token_s_balance: BigRational,
	) -> Self {
		Self {
			order_state,
			fill_amount_s: BigRational::zero(),
			fill_amount_b: BigRational::zero(),
			available_lrc_balance,
			available_token_s_balance,
		}
	}
}
