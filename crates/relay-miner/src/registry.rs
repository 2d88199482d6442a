//! Process-wide bookkeeping of submitted-but-unsettled fills.

use std::collections::HashMap;
use std::sync::Mutex;

use relay_types::{BlockNumber, FilledOrder, OrderHash, OrderState, RingHash};
use num_rational::BigRational;
use tracing::debug;

/// One submitted-but-unsettled fill on one order.
#[derive(Debug, Clone)]
pub struct RoundState {
	/// Block height of the round that produced the fill.
	pub round: BlockNumber,
	pub ring_hash: RingHash,
	pub matched_amount_s: BigRational,
	pub matched_amount_b: BigRational,
}

/// All in-flight fills of one order, append-only until their rings
/// reconcile.
#[derive(Debug, Clone)]
pub struct OrderMatchState {
	pub order_state: OrderState,
	pub rounds: Vec<RoundState>,
}

/// Reverse index from a ring to the orders it fills.
#[derive(Debug, Clone)]
struct MinedRing {
	order_hashes: Vec<OrderHash>,
}

#[derive(Default)]
struct RegistryInner {
	matched_orders: HashMap<OrderHash, OrderMatchState>,
	mined_rings: HashMap<RingHash, MinedRing>,
}

/// In-flight match registry.
///
/// Markets record every submitted fill here; candidate selection reads the
/// rounds back to shrink availability; the settlement reconciler is the
/// only shrink path. A single mutex guards both maps so the mined-ring
/// index never references a round that is not present.
#[derive(Default)]
pub struct MatchRegistry {
	inner: Mutex<RegistryInner>,
}

impl MatchRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one order's fill under `ring_hash`, creating the order's
	/// entry on first sight and extending the ring's reverse index.
	pub fn add_matched_order(
		&self,
		filled_order: &FilledOrder,
		ring_hash: RingHash,
		round: BlockNumber,
	) {
		let order_hash = filled_order.order_state.raw_order.hash;
		let mut inner = self.inner.lock().unwrap();

		let match_state = inner
			.matched_orders
			.entry(order_hash)
			.or_insert_with(|| OrderMatchState {
				order_state: filled_order.order_state.clone(),
				rounds: Vec::new(),
			});
		match_state.rounds.push(RoundState {
			round,
			ring_hash,
			matched_amount_s: filled_order.fill_amount_s.clone(),
			matched_amount_b: filled_order.fill_amount_b.clone(),
		});

		inner
			.mined_rings
			.entry(ring_hash)
			.or_insert_with(|| MinedRing {
				order_hashes: Vec::new(),
			})
			.order_hashes
			.push(order_hash);
	}

	/// Snapshot of the in-flight rounds recorded for one order.
	pub fn rounds_for(&self, order_hash: &OrderHash) -> Vec<RoundState> {
		let inner = self.inner.lock().unwrap();
		inner
			.matched_orders
			.get(order_hash)
			.map(|state| state.rounds.clone())
			.unwrap_or_default()
	}

	/// Drops every round recorded under `ring_hash`, erasing orders whose
	/// round list empties. Unknown hashes are a no-op so re-delivered
	/// settlement events stay idempotent.
	pub fn remove_ring(&self, ring_hash: &RingHash) {
		let mut inner = self.inner.lock().unwrap();
		let Some(mined) = inner.mined_rings.remove(ring_hash) else {
			debug!(ring_hash = %ring_hash, "reconcile for untracked ring ignored");
			return;
		};
		for order_hash in mined.order_hashes {
			let emptied = match inner.matched_orders.get_mut(&order_hash) {
				Some(state) => {
					state.rounds.retain(|round| round.ring_hash != *ring_hash);
					state.rounds.is_empty()
				}
				None => false,
			};
			if emptied {
				inner.matched_orders.remove(&order_hash);
			}
		}
	}

	/// Number of orders with at least one in-flight round.
	pub fn tracked_orders(&self) -> usize {
		self.inner.lock().unwrap().matched_orders.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use num_bigint::BigInt;
	use relay_types::{Address, Order, B256};

	fn filled(owner_byte: u8, amount_s: i64, fill_s: i64, fill_b: i64) -> FilledOrder {
		let order = Order::new(
			Address::repeat_byte(0xaa),
			Address::repeat_byte(owner_byte),
			Address::repeat_byte(1),
			Address::repeat_byte(2),
			BigInt::from(amount_s),
			BigInt::from(amount_s / 2),
			BigInt::from(1),
		);
		let mut f = FilledOrder::from_order_state(
			OrderState::new(order),
			BigRational::from_integer(BigInt::from(1_000)),
			BigRational::from_integer(BigInt::from(1_000)),
		);
		f.fill_amount_s = BigRational::from_integer(BigInt::from(fill_s));
		f.fill_amount_b = BigRational::from_integer(BigInt::from(fill_b));
		f
	}

	#[test]
	fn submit_settle_round_trip() {
		let registry = MatchRegistry::new();
		let a = filled(1, 100, 90, 45);

		// Interleaved submits and settles leave #submits - #settles rounds.
		let rings: Vec<RingHash> = (0..4u8).map(B256::repeat_byte).collect();
		for (i, ring) in rings.iter().enumerate() {
			registry.add_matched_order(&a, *ring, 100 + i as u64);
		}
		assert_eq!(registry.rounds_for(&a.order_state.raw_order.hash).len(), 4);

		registry.remove_ring(&rings[0]);
		registry.remove_ring(&rings[2]);
		assert_eq!(registry.rounds_for(&a.order_state.raw_order.hash).len(), 2);

		registry.remove_ring(&rings[1]);
		registry.remove_ring(&rings[3]);
		assert_eq!(registry.rounds_for(&a.order_state.raw_order.hash).len(), 0);
		assert_eq!(registry.tracked_orders(), 0);
	}

	#[test]
	fn removal_erases_all_orders_of_the_ring() {
		// Rings R1 = {a, b} and R2 = {a, c}: settling R1 then failing R2
		// erases a, b and c without disturbing unrelated state.
		let registry = MatchRegistry::new();
		let a = filled(1, 100, 90, 45);
		let b = filled(2, 60, 45, 90);
		let c = filled(3, 80, 10, 5);
		let r1 = B256::repeat_byte(0xe1);
		let r2 = B256::repeat_byte(0xe2);

		registry.add_matched_order(&a, r1, 100);
		registry.add_matched_order(&b, r1, 100);
		registry.add_matched_order(&a, r2, 102);
		registry.add_matched_order(&c, r2, 102);
		assert_eq!(registry.tracked_orders(), 3);

		registry.remove_ring(&r1);
		assert_eq!(registry.rounds_for(&a.order_state.raw_order.hash).len(), 1);
		assert!(registry.rounds_for(&b.order_state.raw_order.hash).is_empty());

		registry.remove_ring(&r2);
		assert_eq!(registry.tracked_orders(), 0);

		// No round anywhere still references the removed rings.
		assert!(registry.rounds_for(&a.order_state.raw_order.hash).is_empty());
		assert!(registry.rounds_for(&c.order_state.raw_order.hash).is_empty());
	}

	#[test]
	fn removal_is_idempotent() {
		let registry = MatchRegistry::new();
		let a = filled(1, 100, 90, 45);
		let ring = B256::repeat_byte(0xe1);
		registry.add_matched_order(&a, ring, 100);

		registry.remove_ring(&ring);
		registry.remove_ring(&ring);
		registry.remove_ring(&B256::repeat_byte(0x99));
		assert_eq!(registry.tracked_orders(), 0);
	}

	#[test]
	fn rounds_accumulate_per_order() {
		let registry = MatchRegistry::new();
		let a = filled(1, 100, 50, 25);
		registry.add_matched_order(&a, B256::repeat_byte(0xe1), 100);
		registry.add_matched_order(&a, B256::repeat_byte(0xe2), 110);

		let rounds = registry.rounds_for(&a.order_state.raw_order.hash);
		assert_eq!(rounds.len(), 2);
		assert_eq!(rounds[0].round, 100);
		assert_eq!(rounds[1].round, 110);
		assert_eq!(
			rounds[0].matched_amount_s,
			BigRational::from_integer(BigInt::from(50))
		);
	}
}
