//! Ring profitability evaluation interface and the pair feasibility
//! predicate.

use async_trait::async_trait;
use relay_types::{OrderState, Ring};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluateError {
	#[error("ring evaluation failed: {0}")]
	Evaluation(String),
}

/// Profitability math for a candidate ring: fills in each order's fill
/// amounts and the ring's `received`.
#[async_trait]
pub trait Evaluator: Send + Sync {
	async fn compute_ring(&self, ring: &mut Ring) -> Result<(), EvaluateError>;
}

/// Chain-side feasibility of pairing `a` against `b`: the product of the
/// two prices must not exceed one, otherwise the swaps cannot cancel.
///
/// Cross-multiplied so no division is involved:
/// `a.amount_s * b.amount_s >= a.amount_b * b.amount_b`.
pub fn price_valid(a: &OrderState, b: &OrderState) -> bool {
	let lhs = &a.raw_order.amount_s * &b.raw_order.amount_s;
	let rhs = &a.raw_order.amount_b * &b.raw_order.amount_b;
	lhs >= rhs
}

#[cfg(test)]
mod tests {
	use super::*;
	use num_bigint::BigInt;
	use relay_types::{Address, Order};

	fn order(amount_s: i64, amount_b: i64) -> OrderState {
		OrderState::new(Order::new(
			Address::repeat_byte(0xaa),
			Address::repeat_byte(1),
			Address::repeat_byte(2),
			Address::repeat_byte(3),
			BigInt::from(amount_s),
			BigInt::from(amount_b),
			BigInt::from(1),
		))
	}

	#[test]
	fn crossing_prices_are_valid() {
		// a: 100 S for 50 B, b: 60 S for 90 B; 100*60 >= 50*90.
		assert!(price_valid(&order(100, 50), &order(60, 90)));
	}

	#[test]
	fn non_crossing_prices_are_rejected() {
		assert!(!price_valid(&order(50, 100), &order(60, 90)));
	}

	#[test]
	fn exact_price_match_is_valid() {
		assert!(price_valid(&order(100, 50), &order(50, 100)));
	}
}
