//! A single trading-pair matcher.

use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::sync::{Arc, Mutex};

use relay_account::AccountError;
use relay_order::{OrderError, OrderManager, OrderQuery};
use relay_types::{
	Address, BlockNumber, FilledOrder, NewRingsEvent, OrderHash, OrderState, RelayEvent, Ring,
	RingSubmitInfo, TokenPair,
};
use tracing::{debug, error, info, warn};

use crate::balance_cache::BalanceCache;
use crate::evaluate::{price_valid, Evaluator};
use crate::event_bus::EventBus;
use crate::registry::MatchRegistry;
use crate::submit::{ProtocolInfo, Submitter};

/// Per-round candidate orders of one side, keyed by order hash. A BTreeMap
/// keeps seed iteration deterministic.
type SideMap = BTreeMap<OrderHash, OrderState>;

/// Matcher for one `(protocol, token pair)`.
///
/// The side maps live only for a round; the exclusion sets carry over
/// between rounds. Collaborators are injected at construction, so a market
/// never reaches back into the scheduler.
pub struct Market {
	protocol_address: Address,
	lrc_address: Address,
	token_a: Address,
	token_b: Address,
	round_orders_count: usize,
	delayed_number: u64,
	order_manager: Arc<dyn OrderManager>,
	evaluator: Arc<dyn Evaluator>,
	submitter: Arc<dyn Submitter>,
	registry: Arc<MatchRegistry>,
	event_bus: EventBus,
	atob_exclude_next_round: Mutex<Vec<OrderHash>>,
	btoa_exclude_next_round: Mutex<Vec<OrderHash>>,
}

impl Market {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		protocol: ProtocolInfo,
		pair: TokenPair,
		round_orders_count: usize,
		delayed_number: u64,
		order_manager: Arc<dyn OrderManager>,
		evaluator: Arc<dyn Evaluator>,
		submitter: Arc<dyn Submitter>,
		registry: Arc<MatchRegistry>,
		event_bus: EventBus,
	) -> Self {
		Self {
			protocol_address: protocol.contract_address,
			lrc_address: protocol.lrc_token_address,
			token_a: pair.token_a,
			token_b: pair.token_b,
			round_orders_count,
			delayed_number,
			order_manager,
			evaluator,
			submitter,
			registry,
			event_bus,
			atob_exclude_next_round: Mutex::new(Vec::new()),
			btoa_exclude_next_round: Mutex::new(Vec::new()),
		}
	}

	pub fn token_a(&self) -> Address {
		self.token_a
	}

	pub fn token_b(&self) -> Address {
		self.token_b
	}

	/// Runs one matching round for this market and publishes the resulting
	/// batch on the bus.
	pub async fn match_round(
		&self,
		round: BlockNumber,
		balances: &BalanceCache,
	) -> Result<Vec<RingSubmitInfo>, OrderError> {
		let (mut atob_orders, mut btoa_orders) = self.fetch_candidates().await?;
		debug!(
			token_a = %self.token_a,
			token_b = %self.token_b,
			atob = atob_orders.len(),
			btoa = btoa_orders.len(),
			round,
			"round candidates"
		);

		// Value: whether the matched order is now fully consumed.
		let mut matched_order_hashes: HashMap<OrderHash, bool> = HashMap::new();
		let mut ring_candidates: Vec<RingSubmitInfo> = Vec::new();

		let seeds: Vec<OrderHash> = atob_orders.keys().copied().collect();
		for seed_hash in seeds {
			let mut best: Option<RingSubmitInfo> = None;
			let counterparties: Vec<OrderHash> = btoa_orders.keys().copied().collect();
			for candidate_hash in counterparties {
				let Some(seed) = atob_orders.get(&seed_hash) else {
					continue;
				};
				let Some(candidate) = btoa_orders.get(&candidate_hash) else {
					continue;
				};
				if !price_valid(seed, candidate) {
					continue;
				}

				let (filled_seed, filled_candidate) =
					match self.project_balances(seed, candidate, balances).await {
						Ok(pair) => pair,
						Err(err) => {
							warn!(%err, "pair skipped on balance lookup");
							continue;
						}
					};

				let mut ring = Ring::new(vec![filled_seed, filled_candidate]);
				if let Err(err) = self.evaluator.compute_ring(&mut ring).await {
					warn!(%err, "pair skipped on evaluation");
					continue;
				}

				match self.submitter.generate_ring_submit_info(ring).await {
					Ok(info) => {
						// Strict comparison: the first-seen candidate wins ties.
						if best.as_ref().map_or(true, |current| current.received < info.received) {
							best = Some(info);
						}
					}
					Err(err) => error!(%err, "submit info generation failed"),
				}
			}

			if let Some(info) = best {
				for filled_order in &info.ring.orders {
					let order_hash = filled_order.order_state.raw_order.hash;
					let finished = match self.reduce_amount_after_filled(
						&mut atob_orders,
						&mut btoa_orders,
						filled_order,
					) {
						Some(updated) => self.order_manager.is_fully_finished(&updated),
						None => true,
					};
					matched_order_hashes.insert(order_hash, finished);
					self.registry
						.add_matched_order(filled_order, info.ring_hash, round);
				}
				info!(ring_hash = %info.ring_hash, received = %info.received, "ring selected");
				ring_candidates.push(info);
			}
		}

		self.defer_unpaired_orders(&atob_orders, &btoa_orders, &matched_order_hashes);

		self.event_bus.publish(RelayEvent::NewRings(NewRingsEvent {
			rings: ring_candidates.clone(),
		}));

		Ok(ring_candidates)
	}

	/// Pulls up to `round_orders_count` orders per side, consuming the
	/// carried-over exclusion sets, and admits each order after layering
	/// the registry's in-flight fills onto its view.
	async fn fetch_candidates(&self) -> Result<(SideMap, SideMap), OrderError> {
		let atob_exclude = mem::take(&mut *self.atob_exclude_next_round.lock().unwrap());
		let btoa_exclude = mem::take(&mut *self.btoa_exclude_next_round.lock().unwrap());

		let atob_orders = self
			.order_manager
			.miner_orders(
				self.protocol_address,
				self.token_a,
				self.token_b,
				self.round_orders_count,
				&OrderQuery {
					exclude_hashes: atob_exclude,
					delayed_count: self.delayed_number,
				},
			)
			.await?;
		let btoa_orders = self
			.order_manager
			.miner_orders(
				self.protocol_address,
				self.token_b,
				self.token_a,
				self.round_orders_count,
				&OrderQuery {
					exclude_hashes: btoa_exclude,
					delayed_count: self.delayed_number,
				},
			)
			.await?;

		Ok((
			self.admit_side(atob_orders, &self.atob_exclude_next_round),
			self.admit_side(btoa_orders, &self.btoa_exclude_next_round),
		))
	}

	fn admit_side(&self, orders: Vec<OrderState>, exclude_next: &Mutex<Vec<OrderHash>>) -> SideMap {
		let mut side = SideMap::new();
		for mut order in orders {
			self.reduce_remained_amount_before_match(&mut order);
			if self.order_manager.is_fully_finished(&order) {
				// Consumed by confirmed plus in-flight fills; keep it out of
				// the next query until settlement reconciles.
				exclude_next.lock().unwrap().push(order.raw_order.hash);
			} else {
				side.insert(order.raw_order.hash, order);
			}
		}
		side
	}

	/// Layers every in-flight fill recorded for this order onto the round's
	/// owned view of it. The order store's record is untouched.
	fn reduce_remained_amount_before_match(&self, order: &mut OrderState) {
		for round_state in self.registry.rounds_for(&order.raw_order.hash) {
			order.dealt_amount_s += round_state.matched_amount_s.to_integer();
			order.dealt_amount_b += round_state.matched_amount_b.to_integer();
		}
	}

	/// Commits a selected fill onto the side map so later seeds in this
	/// round see the reduced availability. Returns the updated view.
	fn reduce_amount_after_filled(
		&self,
		atob_orders: &mut SideMap,
		btoa_orders: &mut SideMap,
		filled_order: &FilledOrder,
	) -> Option<OrderState> {
		let order_hash = filled_order.order_state.raw_order.hash;
		let side = if filled_order.order_state.raw_order.token_s == self.token_a {
			atob_orders
		} else {
			btoa_orders
		};
		let state = side.get_mut(&order_hash)?;
		state.dealt_amount_s += filled_order.fill_amount_s.to_integer();
		state.dealt_amount_b += filled_order.fill_amount_b.to_integer();
		Some(state.clone())
	}

	async fn project_balances(
		&self,
		seed: &OrderState,
		candidate: &OrderState,
		balances: &BalanceCache,
	) -> Result<(FilledOrder, FilledOrder), AccountError> {
		let seed_lrc = balances.get(seed.raw_order.owner, self.lrc_address).await?;
		let seed_token_s = balances
			.get(seed.raw_order.owner, seed.raw_order.token_s)
			.await?;
		let candidate_lrc = balances
			.get(candidate.raw_order.owner, self.lrc_address)
			.await?;
		let candidate_token_s = balances
			.get(candidate.raw_order.owner, candidate.raw_order.token_s)
			.await?;

		Ok((
			FilledOrder::from_order_state(
				seed.clone(),
				seed_lrc.available(),
				seed_token_s.available(),
			),
			FilledOrder::from_order_state(
				candidate.clone(),
				candidate_lrc.available(),
				candidate_token_s.available(),
			),
		))
	}

	/// Orders that went unmatched this round, or were matched to
	/// completion, are withheld from the next round's query.
	fn defer_unpaired_orders(
		&self,
		atob_orders: &SideMap,
		btoa_orders: &SideMap,
		matched_order_hashes: &HashMap<OrderHash, bool>,
	) {
		let defer = |hash: &OrderHash| match matched_order_hashes.get(hash) {
			None => true,
			Some(fully_finished) => *fully_finished,
		};

		let mut atob_exclude = self.atob_exclude_next_round.lock().unwrap();
		atob_exclude.extend(atob_orders.keys().copied().filter(|hash| defer(hash)));
		drop(atob_exclude);

		let mut btoa_exclude = self.btoa_exclude_next_round.lock().unwrap();
		btoa_exclude.extend(btoa_orders.keys().copied().filter(|hash| defer(hash)));
	}
}
